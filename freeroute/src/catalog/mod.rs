//! Model catalog: descriptor types, the [`CatalogSource`] seam, the OpenRouter-style fetcher
//! and the free-model ranker.
//!
//! # Example
//!
//! ```ignore
//! use freeroute::catalog::*;
//! use std::collections::HashSet;
//!
//! let catalog = OpenRouterCatalog::new("https://openrouter.ai/api/v1", Some(key));
//! let tagged = catalog.list_models(Some("roleplay")).await?;
//! let all = catalog.list_models(None).await?;
//! let ids: HashSet<String> = tagged.iter().map(|m| m.id.clone()).collect();
//! let candidates: Vec<_> = tagged.into_iter().chain(all).collect();
//! let ranked = rank_models(&candidates, &ids)?;
//! ```

mod openrouter;
mod rank;

pub use openrouter::{HttpClient, OpenRouterCatalog, ReqwestHttpClient};
pub use rank::{rank_models, RankError, MAX_RANKED_MODELS};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors from a catalog listing call.
///
/// `Clone` because refresh results are shared between every caller awaiting the same fetch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No access credential configured; raised before any network call.
    #[error("catalog credential is not configured")]
    MissingCredential,
    /// Transport failure or non-2xx status.
    #[error("catalog request failed: {0}")]
    Request(String),
    /// Body did not match the `{ "data": [...] }` envelope.
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

/// Lists model descriptors, optionally filtered by a category tag.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_models(&self, category: Option<&str>)
        -> Result<Vec<ModelDescriptor>, CatalogError>;
}

/// One catalog entry. Only lives for the duration of a refresh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    #[serde(default)]
    pub id: String,
    /// Creation time, epoch seconds.
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub context_length: Option<u64>,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default)]
    pub architecture: Option<Architecture>,
}

/// Per-unit prices. The catalog sends decimal strings (`"0"`, `"0.000002"`); numbers are
/// accepted too. A missing or unparseable price is `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default, deserialize_with = "de_price")]
    pub prompt: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub completion: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    #[serde(default)]
    pub output_modalities: Vec<String>,
}

impl ModelDescriptor {
    /// Both prices present and exactly zero. Absent pricing is never free.
    pub fn is_free(&self) -> bool {
        matches!(
            &self.pricing,
            Some(Pricing {
                prompt: Some(p),
                completion: Some(c),
            }) if *p == 0.0 && *c == 0.0
        )
    }

    /// Output modalities are non-empty and all `"text"`.
    pub fn is_text_only(&self) -> bool {
        match &self.architecture {
            Some(arch) => {
                !arch.output_modalities.is_empty()
                    && arch.output_modalities.iter().all(|m| m == "text")
            }
            None => false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

fn de_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawPrice>::deserialize(deserializer)? {
        Some(RawPrice::Number(n)) => Some(n),
        Some(RawPrice::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
