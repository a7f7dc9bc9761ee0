//! Inference gateway: one chat completion against one model id.
//!
//! [`ChatGateway`] is the seam the waterfall drives; [`OpenRouterGateway`] is the HTTP
//! implementation for OpenAI-compatible `/chat/completions` endpoints.

mod openrouter;

pub use openrouter::OpenRouterGateway;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::Message;

/// Resolved sampling parameters for one request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Why a single completion attempt failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("credential is not configured")]
    MissingCredential,
    /// Transport failure, including timeouts.
    #[error("request failed: {0}")]
    Request(String),
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("response has no choices")]
    NoChoices,
    #[error("response text is empty")]
    EmptyReply,
}

/// Sends one chat completion to `model` and returns the reply text.
///
/// Implementations must reject responses without a first choice or whose text is blank
/// after trimming.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        params: &CompletionParams,
    ) -> Result<String, GatewayError>;
}
