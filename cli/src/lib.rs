//! Command bodies for the `freeroute` binary.
//!
//! Each command writes its result to a caller-supplied writer so it can run against stub
//! catalogs and gateways in tests. Argument parsing and process setup live in `main.rs`.

use std::io::Write;
use std::time::Duration;

use freeroute::{
    CacheRefresher, CompletionOptions, Message, ModelCache, RefreshError, Waterfall,
    WaterfallError,
};
use serde_json::json;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Waterfall(#[from] WaterfallError),
    #[error("model list unavailable: {0}")]
    Refresh(#[from] RefreshError),
    #[error("write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inputs for `freeroute ask`.
#[derive(Clone, Debug, Default)]
pub struct AskOptions {
    pub message: String,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub json: bool,
}

impl AskOptions {
    fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(self.message.clone()));
        messages
    }
}

/// Runs one waterfall and prints the reply (or `{"model","text"}` with `json`).
pub async fn run_ask(
    waterfall: &Waterfall,
    opts: &AskOptions,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let options = CompletionOptions {
        max_tokens: opts.max_tokens,
        temperature: opts.temperature,
    };
    let done = waterfall.complete(&opts.messages(), &options).await?;
    if opts.json {
        let value = json!({ "model": done.model, "text": done.text });
        writeln!(out, "{}", serde_json::to_string(&value)?)?;
    } else {
        writeln!(out, "{}", done.text)?;
    }
    out.flush()?;
    Ok(())
}

/// Prints the ranked model ids, one per line (or a JSON array). `refresh` forces a refetch.
pub async fn run_models(
    cache: &ModelCache,
    refresh: bool,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let models = if refresh {
        cache.refresh().await?
    } else {
        cache.models().await?
    };
    if json {
        writeln!(out, "{}", serde_json::to_string(&models)?)?;
    } else {
        for id in &models {
            writeln!(out, "{}", id)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Forces one refresh and reports where the list was written.
pub async fn run_refresh(cache: &ModelCache, out: &mut impl Write) -> Result<(), CliError> {
    let models = cache.refresh().await?;
    writeln!(
        out,
        "refreshed {} models into {}",
        models.len(),
        cache.store().path().display()
    )?;
    out.flush()?;
    Ok(())
}

/// Refreshes every `interval` until `shutdown` resolves.
pub async fn run_daemon<F>(cache: ModelCache, interval: Duration, shutdown: F) -> Result<(), CliError>
where
    F: std::future::Future<Output = ()>,
{
    info!(interval_secs = interval.as_secs(), path = %cache.store().path().display(), "refresh daemon started");
    let handle = CacheRefresher::new(cache, interval).spawn();
    shutdown.await;
    handle.abort();
    let _ = handle.await;
    info!("refresh daemon stopped");
    Ok(())
}
