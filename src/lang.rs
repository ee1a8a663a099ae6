//! Language set and naming.
//!
//! The [Display] form of a [Lang] is the cache directory name and the
//! correspondence table column header, so it must stay stable across runs.
use std::fmt::Display;
use std::str::FromStr;

use crate::error::Error;

pub const LANG: [Lang; 5] = [
    Lang::English,
    Lang::French,
    Lang::German,
    Lang::Spanish,
    Lang::Ukrainian,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    English,
    French,
    German,
    Spanish,
    Ukrainian,
}

impl Lang {
    pub fn name(&self) -> &'static str {
        match self {
            Lang::English => "English",
            Lang::French => "French",
            Lang::German => "German",
            Lang::Spanish => "Spanish",
            Lang::Ukrainian => "Ukrainian",
        }
    }

    /// Suffix appended to per-language target directories (`docs_fr`, ...).
    pub fn dir_suffix(&self) -> &'static str {
        match self {
            Lang::English => "_en",
            Lang::French => "_fr",
            Lang::German => "_de",
            Lang::Spanish => "_es",
            Lang::Ukrainian => "_ua",
        }
    }
}

impl Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Lang {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Lang::English),
            "french" | "fr" => Ok(Lang::French),
            "german" | "de" => Ok(Lang::German),
            "spanish" | "es" => Ok(Lang::Spanish),
            "ukrainian" | "ua" | "uk" => Ok(Lang::Ukrainian),
            other => Err(Error::UnknownLang(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_accepts_names_and_codes() {
        assert_eq!(Lang::from_str("French").unwrap(), Lang::French);
        assert_eq!(Lang::from_str("french").unwrap(), Lang::French);
        assert_eq!(Lang::from_str("fr").unwrap(), Lang::French);
        assert!(Lang::from_str("klingon").is_err());
    }

    #[test]
    fn display_matches_cache_dir_name() {
        for lang in LANG {
            assert_eq!(lang.to_string(), lang.name());
        }
    }
}
