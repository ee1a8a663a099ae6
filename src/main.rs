use std::path::Path;

use log::LevelFilter;
use structopt::StructOpt;

use transdir::cache::cleaner;
use transdir::cli;
use transdir::error::Error;
use transdir::lang::Lang;
use transdir::pipelines::{self, TranslateContext};
use transdir::processing::{correct, rebuild};
use transdir::translate::chunk_translator::RetryPolicy;
use transdir::translate::model::{ChatCompletionsCaller, ModelCaller};
use transdir::vocab::VocabList;

#[macro_use]
extern crate log;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // set default log level to info
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_env("RUST_LOG");
    builder.init();

    let opt = cli::Transdir::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::Transdir::Translate(t) => {
            let src_lang: Lang = t.src_lang.parse()?;
            let tgt_lang: Lang = t.tgt_lang.parse()?;
            let relative_path = relative_to_root(&t.src, &t.root)?;

            let caller: Option<Box<dyn ModelCaller>> = match (&t.endpoint, &t.model) {
                (Some(endpoint), Some(model)) => Some(Box::new(ChatCompletionsCaller::new(
                    endpoint,
                    model,
                    std::env::var("LLM_API_KEY").ok(),
                    t.cooldown,
                ))),
                _ => {
                    warn!("no endpoint/model configured, running from the cache only");
                    None
                }
            };

            let vocab = match &t.vocab {
                Some(path) => {
                    let vocab = VocabList::from_csv(path, src_lang, tgt_lang)?;
                    (!vocab.is_empty()).then_some(vocab)
                }
                None => None,
            };

            let ctx = TranslateContext {
                root: &t.root,
                src_lang,
                tgt_lang,
                relative_path,
                vocab,
                caller: caller.as_deref(),
                project_description: t.description.clone().unwrap_or_default(),
                retry: RetryPolicy::default(),
            };
            pipelines::translate_file(&ctx, &t.src, &t.dst).await?;
            info!("translated {:?} -> {:?}", t.src, t.dst);
        }

        cli::Transdir::Rebuild(r) => {
            let src_lang: Lang = r.src_lang.parse()?;
            let tgt_lang: Lang = r.tgt_lang.parse()?;
            let relative_path = relative_to_root(&r.src, &r.root)?;
            let count = rebuild::rebuild_file_cache(
                &r.root,
                &r.src,
                &r.dst,
                &relative_path,
                src_lang,
                tgt_lang,
            )?;
            info!("recovered {} translation pairs", count);
        }

        cli::Transdir::Clean(c) => {
            let source_lang: Lang = c.source_lang.parse()?;
            if c.missing {
                let stats = cleaner::clear_missing_chunks(&c.root, source_lang)?;
                info!(
                    "removed {} rows, cleared {} fields, removed {} source chunks",
                    stats.rows_removed, stats.fields_cleared, stats.source_chunks_removed
                );
            } else {
                let lang = match c.lang.as_deref() {
                    Some(s) => Some(s.parse::<Lang>()?),
                    None => None,
                };
                let stats = cleaner::clear_all(
                    &c.root,
                    source_lang,
                    lang,
                    c.relative_path.as_deref(),
                    c.keyword.as_deref(),
                )?;
                info!(
                    "removed {} rows, cleared {} fields, removed {} chunk files",
                    stats.rows_removed, stats.fields_cleared, stats.chunk_files_removed
                );
            }
        }

        cli::Transdir::Correct(c) => {
            let src_lang: Lang = c.src_lang.parse()?;
            let tgt_lang: Lang = c.tgt_lang.parse()?;
            let relative_path = match &c.relative_path {
                Some(rel) => rel.clone(),
                None => relative_to_root(&c.dst, &c.root)?,
            };
            let changed =
                correct::correct_file(&c.root, &c.dst, src_lang, tgt_lang, &relative_path)?;
            if changed {
                info!("cache updated from {:?}", c.dst);
            } else {
                info!("nothing to correct in {:?}", c.dst);
            }
        }
    };
    Ok(())
}

/// Relative POSIX path of `file` under `root`; files outside the root are a
/// caller contract violation.
fn relative_to_root(file: &Path, root: &Path) -> Result<String, Error> {
    let canonical_root = root.canonicalize()?;
    let canonical_file = file.canonicalize()?;
    let rel = canonical_file
        .strip_prefix(&canonical_root)
        .map_err(|_| Error::PathNotUnderSourceRoot(file.to_path_buf()))?;
    Ok(rel.to_string_lossy().replace('\\', "/"))
}
