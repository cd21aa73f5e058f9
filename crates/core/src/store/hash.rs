//! Content fingerprints for change detection.

use sha2::{Digest, Sha256};

/// Length in characters of every fingerprint.
pub const FINGERPRINT_LEN: usize = 64;

/// Compute a stable fingerprint of extracted text.
///
/// SHA-256 over the UTF-8 bytes, hex encoded. Only used to notice that a
/// page's content changed between crawls.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fingerprint_stability() {
        let hash1 = fingerprint("hello world");
        let hash2 = fingerprint("hello world");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_fingerprint_known_value() {
        assert_eq!(fingerprint(""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn test_fingerprint_format() {
        let hash = fingerprint("Привет, мир");
        assert_eq!(hash.len(), FINGERPRINT_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_no_collisions_in_corpus() {
        let corpus = [
            "",
            " ",
            "hello",
            "hello ",
            "Hello",
            "hello world",
            "hello\nworld",
            "héllo",
            "The quick brown fox jumps over the lazy dog",
            "The quick brown fox jumps over the lazy dog.",
            "日本語のテキスト",
        ];
        let hashes: HashSet<String> = corpus.iter().map(|t| fingerprint(t)).collect();
        assert_eq!(hashes.len(), corpus.len());
    }
}
