//! Chunk and path identity.
//!
//! Chunks are keyed by the SHA-256 of their UTF-8 bytes; files are keyed by
//! the SHA-256 of their normalized relative path. Both hashes are lowercase
//! hex and double as on-disk file/directory names.
use sha2::{Digest, Sha256};

/// SHA-256 of the UTF-8 bytes of `contents`, as lowercase hex.
pub fn checksum(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Normalize a relative path: POSIX separators, no leading `./`,
/// no trailing separator. Case-sensitive.
pub fn normalize_relative_path(rel: &str) -> String {
    let mut normalized = rel.replace('\\', "/");
    while let Some(stripped) = normalized.strip_prefix("./") {
        normalized = stripped.to_string();
    }
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Path hash scoping cache entries per source file.
pub fn path_checksum(rel: &str) -> String {
    checksum(&normalize_relative_path(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        // sha256 of the empty string
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(checksum("a").len(), 64);
        assert_ne!(checksum("a"), checksum("b"));
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_relative_path("./docs/intro.md"), "docs/intro.md");
        assert_eq!(normalize_relative_path("docs\\intro.md"), "docs/intro.md");
        assert_eq!(normalize_relative_path("docs/sub/"), "docs/sub");
        assert_eq!(normalize_relative_path("././a.tex"), "a.tex");
    }

    #[test]
    fn path_checksum_is_normalization_invariant() {
        assert_eq!(path_checksum("./docs/intro.md"), path_checksum("docs/intro.md"));
        assert_ne!(path_checksum("docs/intro.md"), path_checksum("docs/Intro.md"));
    }
}
