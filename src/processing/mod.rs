//! Offline passes over translated artifacts: cache rebuild from files on
//! disk and ingestion of hand-corrected translations.
pub mod correct;
pub mod rebuild;
