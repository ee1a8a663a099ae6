//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "transdir",
    about = "Structure-preserving translation of documentation trees"
)]
/// Holds every command that is callable by the `transdir` command.
pub enum Transdir {
    #[structopt(about = "Translate one file, reusing the cache")]
    Translate(Translate),
    #[structopt(about = "Rebuild the cache from a translated file pair")]
    Rebuild(Rebuild),
    #[structopt(about = "Clean the translation cache")]
    Clean(Clean),
    #[structopt(about = "Ingest hand-edited translations into the cache")]
    Correct(Correct),
}

#[derive(Debug, StructOpt)]
pub struct Translate {
    #[structopt(parse(from_os_str), help = "source file to translate")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "where to write the translated file")]
    pub dst: PathBuf,
    #[structopt(long = "from", help = "source language (name or code)")]
    pub src_lang: String,
    #[structopt(long = "to", help = "target language (name or code)")]
    pub tgt_lang: String,
    #[structopt(
        long,
        parse(from_os_str),
        default_value = ".",
        help = "project root holding the cache"
    )]
    pub root: PathBuf,
    #[structopt(long, help = "OpenAI-compatible chat completions endpoint")]
    pub endpoint: Option<String>,
    #[structopt(long, help = "model name sent to the endpoint")]
    pub model: Option<String>,
    #[structopt(
        long,
        help = "seconds to wait between chunk translations",
        default_value = "5"
    )]
    pub cooldown: u64,
    #[structopt(long, parse(from_os_str), help = "vocabulary CSV (one column per language)")]
    pub vocab: Option<PathBuf>,
    #[structopt(long, help = "one-line project description added to prompts")]
    pub description: Option<String>,
}

#[derive(Debug, StructOpt)]
pub struct Rebuild {
    #[structopt(parse(from_os_str), help = "source file")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "translated file carrying src_checksum metadata")]
    pub dst: PathBuf,
    #[structopt(long = "from", help = "source language (name or code)")]
    pub src_lang: String,
    #[structopt(long = "to", help = "target language (name or code)")]
    pub tgt_lang: String,
    #[structopt(
        long,
        parse(from_os_str),
        default_value = ".",
        help = "project root holding the cache"
    )]
    pub root: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct Clean {
    #[structopt(long = "source-lang", help = "the project's source language")]
    pub source_lang: String,
    #[structopt(
        long,
        help = "only drop rows and cells referencing blobs missing on disk"
    )]
    pub missing: bool,
    #[structopt(long, help = "restrict clearing to one language")]
    pub lang: Option<String>,
    #[structopt(long = "path", help = "restrict clearing to one relative path")]
    pub relative_path: Option<String>,
    #[structopt(
        long,
        help = "only rows whose source chunk contains this keyword (full clear only)"
    )]
    pub keyword: Option<String>,
    #[structopt(
        long,
        parse(from_os_str),
        default_value = ".",
        help = "project root holding the cache"
    )]
    pub root: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct Correct {
    #[structopt(parse(from_os_str), help = "hand-edited translated file")]
    pub dst: PathBuf,
    #[structopt(long = "from", help = "source language (name or code)")]
    pub src_lang: String,
    #[structopt(long = "to", help = "target language (name or code)")]
    pub tgt_lang: String,
    #[structopt(
        long = "rel",
        help = "relative path of the source file (defaults to the target's path under the root)"
    )]
    pub relative_path: Option<String>,
    #[structopt(
        long,
        parse(from_os_str),
        default_value = ".",
        help = "project root holding the cache"
    )]
    pub root: PathBuf,
}
