/*! Model transport.

The orchestrator only sees the [ModelCaller] trait: one blocking call, a
cooldown hook, and two error kinds ([Error::ModelOverloaded] is retried with
backoff, [Error::ApiCall] is not). The bundled implementation speaks an
OpenAI-compatible `/chat/completions` endpoint.
!*/
use std::time::Duration;

use log::{debug, error};
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;

pub trait ModelCaller: Send + Sync {
    /// Blocking round trip to the model.
    fn call(&self, prompt: &str) -> Result<String, Error>;

    /// Invoked after a successful call so the transport can enforce its own
    /// rate limit before the next chunk.
    fn wait_cooldown(&self) {}
}

/// Seconds to wait between chunk translations by default.
pub const DEFAULT_COOLDOWN_SECS: u64 = 5;

pub struct ChatCompletionsCaller {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    cooldown: Duration,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatCompletionsCaller {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        cooldown_secs: u64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            cooldown: Duration::from_secs(cooldown_secs),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl ModelCaller for ChatCompletionsCaller {
    fn call(&self, prompt: &str) -> Result<String, Error> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| Error::ApiCall(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 503 || status.as_u16() == 529 {
            return Err(Error::ModelOverloaded(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!("model endpoint returned {}: {}", status, body);
            return Err(Error::ApiCall(format!("HTTP {}", status)));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| Error::ApiCall(format!("unparseable response: {}", e)))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::ApiCall("response carried no choices".to_string()))?;
        debug!("model response received ({} chars)", content.len());
        Ok(content)
    }

    fn wait_cooldown(&self) {
        std::thread::sleep(self.cooldown);
    }
}
