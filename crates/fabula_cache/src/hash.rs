//! Canonical content digests.

use sha2::{Digest, Sha256};

/// Normalise text so cosmetic differences do not change its digest.
///
/// Line endings become `\n`, trailing whitespace is stripped from every line
/// and leading/trailing blank space from the whole text.
///
/// # Examples
///
/// ```
/// use fabula_cache::canonicalize;
///
/// assert_eq!(canonicalize("  Hello  \r\nworld \r\n\r\n"), "  Hello\nworld");
/// ```
pub fn canonicalize(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.lines().map(str::trim_end).collect();
    lines
        .join("\n")
        .trim_start_matches('\n')
        .trim_end()
        .to_string()
}

/// Lowercase hex SHA-256 of the canonical form of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize(text).as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmetic_changes_keep_the_hash() {
        let a = content_hash("The caravan left at dawn.\nBy noon it was hot.");
        let b = content_hash("The caravan left at dawn.   \r\nBy noon it was hot.\r\n\r\n");
        assert_eq!(a, b);
    }

    #[test]
    fn edits_change_the_hash() {
        let a = content_hash("The caravan left at dawn.");
        let b = content_hash("The caravan left at dusk.");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn indentation_is_significant() {
        assert_ne!(content_hash("  indented"), content_hash("indented"));
    }
}
