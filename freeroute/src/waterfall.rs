//! Waterfall dispatcher: try ranked models in order, then the hard fallback, until one
//! answers.
//!
//! Per call: `Start → TryModel(0..n) → Success | Exhausted`. Candidates are tried strictly
//! in sequence; the first success returns immediately. A cache that cannot be populated
//! degrades to the fallback alone instead of aborting.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog::OpenRouterCatalog;
use crate::gateway::{ChatGateway, CompletionParams, OpenRouterGateway};
use crate::message::Message;
use crate::model_cache::{CacheStore, ModelCache};
use crate::outcome::{Outcome, OutcomeSink};

/// Token limit when neither the caller nor the environment sets one.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Temperature when neither the caller nor the environment sets one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Dispatcher settings. Built from [`env_config::Settings`] in production.
#[derive(Clone, Debug)]
pub struct WaterfallConfig {
    /// Checked before any network activity; the key itself is held by the gateway/catalog.
    pub api_key: Option<String>,
    /// Tried last, once, regardless of catalog contents.
    pub fallback_model: String,
    pub default_max_tokens: Option<u32>,
    pub default_temperature: Option<f32>,
}

impl From<&env_config::Settings> for WaterfallConfig {
    fn from(settings: &env_config::Settings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            fallback_model: settings.fallback_model.clone(),
            default_max_tokens: settings.default_max_tokens,
            default_temperature: settings.default_temperature,
        }
    }
}

/// Per-call overrides; `None` falls through to the environment, then the built-in default.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Reply text and the model that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

/// One failed candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptFailure {
    pub model: String,
    pub reason: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaterfallError {
    /// No credential configured; nothing was sent.
    #[error("missing credential: set {}", env_config::ENV_API_KEY)]
    MissingCredential,
    /// Every candidate failed.
    #[error("all {} models failed: {}", .attempts.len(), join_attempts(.attempts))]
    Exhausted { attempts: Vec<AttemptFailure> },
}

fn join_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Drives completions through the cached ranked list plus the hard fallback.
pub struct Waterfall {
    cache: ModelCache,
    gateway: Arc<dyn ChatGateway>,
    config: WaterfallConfig,
    sink: Option<Arc<dyn OutcomeSink>>,
}

impl Waterfall {
    pub fn new(cache: ModelCache, gateway: Arc<dyn ChatGateway>, config: WaterfallConfig) -> Self {
        Self {
            cache,
            gateway,
            config,
            sink: None,
        }
    }

    /// OpenRouter catalog + gateway and the disk cache, all from `settings`.
    pub fn from_settings(settings: &env_config::Settings) -> Self {
        let cache = ModelCache::new(
            Arc::new(OpenRouterCatalog::from_settings(settings)),
            CacheStore::new(&settings.cache_path),
            settings.category.clone(),
        );
        Self::new(
            cache,
            Arc::new(OpenRouterGateway::from_settings(settings)),
            WaterfallConfig::from(settings),
        )
    }

    /// Report each run's outcome to `sink`.
    pub fn with_outcome_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Caller override, then environment default, then built-in default.
    pub fn resolve_params(&self, options: &CompletionOptions) -> CompletionParams {
        CompletionParams {
            max_tokens: options
                .max_tokens
                .or(self.config.default_max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options
                .temperature
                .or(self.config.default_temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
        }
    }

    /// Ranked list (empty if the cache cannot be populated) followed by the fallback,
    /// without duplicates.
    pub async fn candidates(&self) -> Vec<String> {
        let ranked = match self.cache.models().await {
            Ok(models) => models,
            Err(e) => {
                warn!(error = %e, "ranked model list unavailable, trying fallback only");
                Vec::new()
            }
        };
        let mut out: Vec<String> = Vec::with_capacity(ranked.len() + 1);
        for id in ranked
            .into_iter()
            .chain(std::iter::once(self.config.fallback_model.clone()))
        {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    /// Runs one waterfall. Only a missing credential or full exhaustion is an error.
    pub async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, WaterfallError> {
        if self
            .config
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            return Err(WaterfallError::MissingCredential);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("waterfall", %run_id);
        let result = self.run(messages, options).instrument(span).await;

        let outcome = match &result {
            Ok(done) => Outcome::succeeded(done.model.clone()),
            Err(_) => Outcome::failed(),
        };
        self.notify(outcome);
        result
    }

    async fn run(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, WaterfallError> {
        let params = self.resolve_params(options);
        let candidates = self.candidates().await;
        debug!(candidates = ?candidates, ?params, "waterfall start");

        let mut attempts = Vec::new();
        for model in candidates {
            match self.gateway.complete(&model, messages, &params).await {
                Ok(text) => {
                    info!(model = %model, failed_before = attempts.len(), "waterfall succeeded");
                    return Ok(Completion { text, model });
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "model attempt failed");
                    attempts.push(AttemptFailure {
                        model,
                        reason: e.to_string(),
                    });
                }
            }
        }

        warn!(attempts = attempts.len(), "waterfall exhausted");
        Err(WaterfallError::Exhausted { attempts })
    }

    fn notify(&self, outcome: Outcome) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = sink.record(&outcome).await {
                warn!(error = %e, "outcome notification failed");
            }
        });
    }
}
