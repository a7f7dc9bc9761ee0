//! Outcome notifications for an external usage-analytics collaborator.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Result of one waterfall run: whether it succeeded and which model answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub model: Option<String>,
}

impl Outcome {
    pub fn succeeded(model: impl Into<String>) -> Self {
        Self {
            success: true,
            model: Some(model.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            model: None,
        }
    }
}

#[derive(Debug, Error)]
#[error("outcome sink: {0}")]
pub struct OutcomeError(pub String);

/// Receives one [`Outcome`] per waterfall run. Delivery is fire-and-forget: errors are
/// logged by the dispatcher and never change the run's result.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn record(&self, outcome: &Outcome) -> Result<(), OutcomeError>;
}

/// Sink that only emits a tracing event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingOutcomeSink;

#[async_trait]
impl OutcomeSink for TracingOutcomeSink {
    async fn record(&self, outcome: &Outcome) -> Result<(), OutcomeError> {
        info!(
            success = outcome.success,
            model = outcome.model.as_deref().unwrap_or("-"),
            "inference outcome"
        );
        Ok(())
    }
}
