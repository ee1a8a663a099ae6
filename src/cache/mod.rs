/*! Content-addressed translation cache.

On-disk layout under a project root:

```text
<root>/.transdir/cache/
  path_map.csv          path_checksum,relative_path
  correspondence.csv    path_checksum,<Lang>,<Lang>,…
  <Language>/<path_hash>/<checksum>   one file per chunk blob
```

Blobs are write-once and named by the SHA-256 of their contents; the
correspondence table maps a path hash to the per-language checksums of one
chunk. The table is rewritten whole on every mutation; concurrent writers
are unsupported.
!*/
use std::path::{Path, PathBuf};

pub mod backend;
pub mod cleaner;
pub mod correspondence;
pub mod path_map;
pub mod store;

pub const CONF_DIR: &str = ".transdir";
pub const CACHE_DIR_NAME: &str = "cache";
pub const CORRESPONDENCE_FILENAME: &str = "correspondence.csv";
pub const PATH_MAP_FILENAME: &str = "path_map.csv";
pub const PATH_CHECKSUM_COLUMN: &str = "path_checksum";

pub fn config_dir(root: &Path) -> PathBuf {
    root.join(CONF_DIR)
}

pub fn cache_dir(root: &Path) -> PathBuf {
    config_dir(root).join(CACHE_DIR_NAME)
}
