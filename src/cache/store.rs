//! Store trait over the on-disk cache.
//!
//! The translator orchestrator only ever talks to [TranslationStore], which
//! keeps it testable with an in-memory stand-in and leaves the CSV layout an
//! implementation detail of [CsvStore].
use std::path::{Path, PathBuf};

use crate::checksum::checksum;
use crate::error::Error;
use crate::lang::Lang;
use crate::translate::retrieval::best_match_in_dir;

use super::{backend, correspondence, path_map};

pub trait TranslationStore {
    /// Cached target text for `(src_checksum, src_lang → tgt_lang)` under the
    /// given relative path, if the pair exists.
    fn lookup(
        &self,
        src_checksum: &str,
        src_lang: Lang,
        tgt_lang: Lang,
        relative_path: &str,
    ) -> Result<Option<String>, Error>;

    /// Write both blobs and record the correspondence row. Idempotent.
    fn persist_pair(
        &self,
        src_text: &str,
        tgt_text: &str,
        src_lang: Lang,
        tgt_lang: Lang,
        relative_path: &str,
    ) -> Result<(), Error>;

    fn contents_by_checksum(
        &self,
        digest: &str,
        lang: Lang,
        relative_path: &str,
    ) -> Result<Option<String>, Error>;

    /// Best `(src_example, tgt_example, score)` drawn from this path's
    /// source-language blobs; `None` when nothing is cached or the best
    /// match has no target.
    fn best_pair_example(
        &self,
        src_lang: Lang,
        tgt_lang: Lang,
        text: &str,
        relative_path: &str,
    ) -> Result<Option<(String, String, f64)>, Error>;

    /// true iff the persisted correspondent of `src_checksum` equals
    /// `checksum(tgt_text)`.
    fn translation_corresponds(
        &self,
        src_checksum: &str,
        src_lang: Lang,
        tgt_text: &str,
        tgt_lang: Lang,
        relative_path: &str,
    ) -> Result<bool, Error>;
}

/// The CSV + blob-directory store described in the cache module docs.
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn path_hash(&self, relative_path: &str) -> Result<String, Error> {
        path_map::register_path_hash(&self.root, relative_path)
    }
}

impl TranslationStore for CsvStore {
    fn lookup(
        &self,
        src_checksum: &str,
        src_lang: Lang,
        tgt_lang: Lang,
        relative_path: &str,
    ) -> Result<Option<String>, Error> {
        let path_hash = self.path_hash(relative_path)?;
        let Some(tgt_checksum) = correspondence::find_correspondent(
            &self.root,
            src_checksum,
            src_lang,
            tgt_lang,
            &path_hash,
        )?
        else {
            return Ok(None);
        };
        backend::read_blob(&self.root, &tgt_checksum, tgt_lang, &path_hash)
    }

    fn persist_pair(
        &self,
        src_text: &str,
        tgt_text: &str,
        src_lang: Lang,
        tgt_lang: Lang,
        relative_path: &str,
    ) -> Result<(), Error> {
        let path_hash = self.path_hash(relative_path)?;
        let src_checksum = backend::add_blob(&self.root, src_text, src_lang, &path_hash)?;
        let tgt_checksum = backend::add_blob(&self.root, tgt_text, tgt_lang, &path_hash)?;
        correspondence::set_pair(
            &self.root,
            &src_checksum,
            src_lang,
            &tgt_checksum,
            tgt_lang,
            &path_hash,
        )
    }

    fn contents_by_checksum(
        &self,
        digest: &str,
        lang: Lang,
        relative_path: &str,
    ) -> Result<Option<String>, Error> {
        let path_hash = self.path_hash(relative_path)?;
        backend::read_blob(&self.root, digest, lang, &path_hash)
    }

    fn best_pair_example(
        &self,
        src_lang: Lang,
        tgt_lang: Lang,
        text: &str,
        relative_path: &str,
    ) -> Result<Option<(String, String, f64)>, Error> {
        let path_hash = self.path_hash(relative_path)?;
        let dir = backend::lang_path_dir(&self.root, src_lang, &path_hash);
        let Some((src_checksum, src_example, score)) = best_match_in_dir(&dir, text) else {
            return Ok(None);
        };
        let Some(tgt_example) =
            self.lookup(&src_checksum, src_lang, tgt_lang, relative_path)?
        else {
            return Ok(None);
        };
        Ok(Some((src_example, tgt_example, score)))
    }

    fn translation_corresponds(
        &self,
        src_checksum: &str,
        src_lang: Lang,
        tgt_text: &str,
        tgt_lang: Lang,
        relative_path: &str,
    ) -> Result<bool, Error> {
        let path_hash = self.path_hash(relative_path)?;
        let Some(true_tgt) = correspondence::find_correspondent(
            &self.root,
            src_checksum,
            src_lang,
            tgt_lang,
            &path_hash,
        )?
        else {
            return Ok(false);
        };
        Ok(true_tgt == checksum(tgt_text))
    }
}
