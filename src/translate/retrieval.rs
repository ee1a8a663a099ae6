/*! Similarity-based example retrieval.

For a chunk about to be translated, the best-matching cached source chunk of
the same file (same language, same path hash) and its paired translation can
be offered to the model as a few-shot example. Similarity is the classic
longest-common-subsequence ratio in `[0, 1]` over bytes; only the
source-language directory is ever scanned, so examples never cross files or
languages.
!*/
use std::fs;
use std::path::Path;

use log::warn;

/// `2·LCS(a, b) / (|a| + |b|)`, in `[0, 1]`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // two-row LCS table
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

/// Best-scoring blob in a cache directory: `(checksum, contents, score)`.
pub fn best_match_in_dir(dir: &Path, text: &str) -> Option<(String, String, f64)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return None,
    };

    let mut best: Option<(String, String, f64)> = None;
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("error reading cache dir {:?}: {}", dir, e);
                continue;
            }
        };
        if !entry.path().is_file() {
            continue;
        }
        let contents = match fs::read_to_string(entry.path()) {
            Ok(c) => c,
            Err(e) => {
                warn!("unreadable blob {:?}: {}", entry.path(), e);
                continue;
            }
        };
        let score = similarity_ratio(&contents, text);
        if best.as_ref().map(|(_, _, s)| score > *s).unwrap_or(true) {
            let digest = entry.file_name().to_string_lossy().into_owned();
            best = Some((digest, contents, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("", ""), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity_ratio("aaa", "bbb"), 0.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
    }

    #[test]
    fn near_matches_score_high() {
        let a = "Let $C$ be a positive constant such that the bound holds.";
        let b = "Let $C$ be a positive constant such that the bound fails.";
        assert!(similarity_ratio(a, b) > 0.9);
        assert!(similarity_ratio(a, "completely different") < 0.5);
    }

    #[test]
    fn best_match_scans_blob_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("aaa"), "The cat sleeps on the chair.").unwrap();
        std::fs::write(dir.path().join("bbb"), "Number theory is hard.").unwrap();

        let (digest, contents, score) =
            best_match_in_dir(dir.path(), "The cat sleeps on the mat.").unwrap();
        assert_eq!(digest, "aaa");
        assert_eq!(contents, "The cat sleeps on the chair.");
        assert!(score > 0.7);
    }

    #[test]
    fn missing_dir_yields_none() {
        assert!(best_match_in_dir(Path::new("/nonexistent/cache/dir"), "x").is_none());
    }
}
