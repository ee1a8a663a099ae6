/*! Per-chunk translation orchestrator.

The decision ladder for one chunk: whitespace passes through untouched,
cache hits return the stored target, placeholder-only chunks persist
`(src, src)` without a model call, and everything else goes through the
strategy's prompt with overload retry. Only the model call and the backoff
sleeps suspend; chunks of a file are strictly sequential so the example
retriever sees earlier chunks already persisted.
!*/
use std::time::Duration;

use log::{debug, error, warn};

use crate::cache::store::TranslationStore;
use crate::checksum::checksum;
use crate::chunking::placeholder_only;
use crate::error::Error;
use crate::translate::model::ModelCaller;
use crate::translate::strategy::{self, Strategy};
use crate::translate::Meta;

/// Similarity gate for including a cached pair as a few-shot example.
const EXAMPLE_SCORE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

pub struct ChunkTranslator<'a> {
    store: &'a dyn TranslationStore,
    caller: Option<&'a dyn ModelCaller>,
    retry: RetryPolicy,
}

impl<'a> ChunkTranslator<'a> {
    pub fn new(store: &'a dyn TranslationStore, caller: Option<&'a dyn ModelCaller>) -> Self {
        Self {
            store,
            caller,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Translate a chunk or fetch its cached translation.
    ///
    /// Unrecoverable translation errors come back as
    /// [Error::ChunkTranslationFailed] carrying the source text, so the file
    /// loop can keep the chunk in place and continue.
    pub async fn translate_or_fetch(&self, mut meta: Meta) -> Result<String, Error> {
        if meta.text.trim().is_empty() {
            return Ok(meta.text);
        }

        let src_checksum = checksum(&meta.text);
        if let Some(cached) = self.store.lookup(
            &src_checksum,
            meta.src_lang,
            meta.tgt_lang,
            &meta.relative_path,
        )? {
            debug!("cache hit ({} -> {})", meta.src_lang, meta.tgt_lang);
            return Ok(cached);
        }

        if placeholder_only(&meta.text, meta.chunk_type) {
            debug!("placeholder-only chunk, persisting identity pair");
            self.store.persist_pair(
                &meta.text,
                &meta.text,
                meta.src_lang,
                meta.tgt_lang,
                &meta.relative_path,
            )?;
            return Ok(meta.text);
        }

        let strategy = strategy::select(meta.doc_type, meta.chunk_type);

        if strategy.calls_model() {
            match self.store.best_pair_example(
                meta.src_lang,
                meta.tgt_lang,
                &meta.text,
                &meta.relative_path,
            ) {
                Ok(Some((src_example, tgt_example, score)))
                    if score > EXAMPLE_SCORE_THRESHOLD =>
                {
                    debug!("found an example pair (score {:.2})", score);
                    meta.example = Some((src_example, tgt_example));
                }
                Ok(_) => {}
                Err(e) => warn!("example retrieval failed: {:?}", e),
            }
        }

        let translated = if strategy.calls_model() {
            match self.translate_with_retry(strategy, &meta).await {
                Ok(translated) => translated,
                Err(cause) => {
                    error!("chunk translation failed: {:?}", cause);
                    return Err(Error::ChunkTranslationFailed {
                        text: meta.text,
                        cause: Box::new(cause),
                    });
                }
            }
        } else {
            meta.text.clone()
        };

        self.store.persist_pair(
            &meta.text,
            &translated,
            meta.src_lang,
            meta.tgt_lang,
            &meta.relative_path,
        )?;
        Ok(translated)
    }

    /// Run the strategy, retrying only overload errors with exponential
    /// backoff capped at `max_delay`.
    async fn translate_with_retry(
        &self,
        strategy: Strategy,
        meta: &Meta,
    ) -> Result<String, Error> {
        let caller = self
            .caller
            .ok_or_else(|| Error::ApiCall("no model caller configured".to_string()))?;
        let attempts = self.retry.attempts.max(1);
        let mut delay = self.retry.initial_delay;

        let (prompt, _is_xml) = strategy.build_prompt(meta);
        for attempt in 1..=attempts {
            match caller.call(&prompt) {
                Ok(raw) => {
                    caller.wait_cooldown();
                    return Ok(strategy.postprocess(&raw));
                }
                Err(e) if e.is_overloaded() && attempt < attempts => {
                    let wait = delay.min(self.retry.max_delay);
                    warn!(
                        "model overloaded (attempt {}/{}), retrying in {:.2}s",
                        attempt,
                        attempts,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    delay = (delay * 2).min(self.retry.max_delay);
                }
                Err(e) => {
                    if e.is_overloaded() {
                        error!("model overloaded after {} attempts, giving up", attempt);
                    }
                    return Err(e);
                }
            }
        }
        unreachable!("retry loop always returns")
    }
}
