use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Xml(quick_xml::Error),
    UnknownLang(String),
    /// Two distinct relative paths hashed to the same path checksum.
    PathHashCollision {
        hash: String,
        existing: String,
        candidate: String,
    },
    /// Malformed cache artifact (bad CSV shape, checksum/file mismatch).
    CacheCorrupt(String),
    /// Transport signalled that the model is overloaded. Retried with backoff.
    ModelOverloaded(String),
    /// Any other transport failure. Not retried.
    ApiCall(String),
    /// A chunk exhausted its retries or hit a non-retryable transport error.
    /// Carries the source text so the file loop can write it back unchanged.
    ChunkTranslationFailed {
        text: String,
        cause: Box<Error>,
    },
    PathNotUnderSourceRoot(PathBuf),
    FileNotTranslatable(PathBuf),
    DocumentParse(String),
    Custom(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Error {
        Error::Csv(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Json(e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Error {
        Error::Xml(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}

impl Error {
    /// true if retrying the operation may succeed (overload signal).
    pub fn is_overloaded(&self) -> bool {
        matches!(self, Error::ModelOverloaded(_))
    }
}
