//! Chunk blob storage, scoped per language and per path hash.
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::checksum::checksum;
use crate::error::Error;
use crate::lang::Lang;

use super::cache_dir;

pub fn ensure_cache_dir(root: &Path) -> Result<PathBuf, Error> {
    let dir = cache_dir(root);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn lang_dir(root: &Path, lang: Lang) -> PathBuf {
    cache_dir(root).join(lang.name())
}

pub fn lang_path_dir(root: &Path, lang: Lang, path_hash: &str) -> PathBuf {
    lang_dir(root, lang).join(path_hash)
}

/// Content-addressed write. A blob whose checksum file already exists is
/// left untouched; concurrent identical writes race harmlessly.
pub fn add_blob(root: &Path, contents: &str, lang: Lang, path_hash: &str) -> Result<String, Error> {
    let dir = lang_path_dir(root, lang, path_hash);
    fs::create_dir_all(&dir)?;
    let digest = checksum(contents);
    let blob_path = dir.join(&digest);
    if blob_path.exists() {
        return Ok(digest);
    }
    fs::write(&blob_path, contents)?;
    debug!("wrote blob {}/{}/{}", lang, path_hash, digest);
    Ok(digest)
}

/// Scoped read: `None` when the blob is absent.
pub fn read_blob(
    root: &Path,
    digest: &str,
    lang: Lang,
    path_hash: &str,
) -> Result<Option<String>, Error> {
    let blob_path = lang_path_dir(root, lang, path_hash).join(digest);
    if !blob_path.is_file() {
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(&blob_path)?))
}

pub fn blob_exists(root: &Path, digest: &str, lang_name: &str, path_hash: &str) -> bool {
    if digest.is_empty() {
        return false;
    }
    let lang_dir = cache_dir(root).join(lang_name);
    let path = if path_hash.is_empty() {
        lang_dir.join(digest)
    } else {
        lang_dir.join(path_hash).join(digest)
    };
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn blob_filename_is_its_checksum() {
        let root = tempdir().unwrap();
        let digest = add_blob(root.path(), "Bonjour", Lang::French, "abc").unwrap();
        assert_eq!(digest, checksum("Bonjour"));

        let path = lang_path_dir(root.path(), Lang::French, "abc").join(&digest);
        let on_disk = std::fs::read_to_string(path).unwrap();
        assert_eq!(checksum(&on_disk), digest);
    }

    #[test]
    fn rewrite_of_existing_blob_is_a_noop() {
        let root = tempdir().unwrap();
        let first = add_blob(root.path(), "same", Lang::English, "abc").unwrap();
        let second = add_blob(root.path(), "same", Lang::English, "abc").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn read_is_scoped_by_lang_and_path() {
        let root = tempdir().unwrap();
        let digest = add_blob(root.path(), "Hello", Lang::English, "p1").unwrap();

        assert_eq!(
            read_blob(root.path(), &digest, Lang::English, "p1").unwrap(),
            Some("Hello".to_string())
        );
        assert_eq!(
            read_blob(root.path(), &digest, Lang::English, "p2").unwrap(),
            None
        );
        assert_eq!(
            read_blob(root.path(), &digest, Lang::French, "p1").unwrap(),
            None
        );
    }
}
