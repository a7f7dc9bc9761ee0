//! # freeroute
//!
//! Routes chat completions across free OpenRouter models. A ranked list of free, text-only
//! models is fetched from the catalog, cached on disk for 24 hours, and tried in order
//! ("waterfall") until one returns a non-empty reply. A configured fallback model is always
//! the last candidate.
//!
//! ## Main modules
//!
//! - [`catalog`]: [`CatalogSource`] trait, [`OpenRouterCatalog`], [`rank_models`].
//! - [`model_cache`]: [`ModelCache`] (mirror, disk record, single-flight refresh), [`CacheStore`].
//! - [`gateway`]: [`ChatGateway`] trait and the HTTP [`OpenRouterGateway`].
//! - [`waterfall`]: [`Waterfall`], the public completion entry point.
//! - [`refresher`]: [`CacheRefresher`] for scheduled refreshes.
//! - [`outcome`]: [`OutcomeSink`] for per-run success notifications.
//! - [`message`]: [`Message`] (System / User / Assistant).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use freeroute::{CompletionOptions, Message, Waterfall};
//!
//! # async fn run() -> Result<(), freeroute::WaterfallError> {
//! let settings = env_config::Settings::from_env();
//! let waterfall = Waterfall::from_settings(&settings);
//! let done = waterfall
//!     .complete(&[Message::user("Say hi")], &CompletionOptions::default())
//!     .await?;
//! println!("{} answered: {}", done.model, done.text);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod gateway;
pub mod message;
pub mod model_cache;
pub mod outcome;
pub mod refresher;
pub mod waterfall;

pub use catalog::{
    rank_models, CatalogError, CatalogSource, ModelDescriptor, OpenRouterCatalog, RankError,
    MAX_RANKED_MODELS,
};
pub use gateway::{ChatGateway, CompletionParams, GatewayError, OpenRouterGateway};
pub use message::{Message, Role};
pub use model_cache::{CacheRecord, CacheStore, ModelCache, RefreshError, CACHE_TTL};
pub use outcome::{Outcome, OutcomeError, OutcomeSink, TracingOutcomeSink};
pub use refresher::{CacheRefresher, DAILY_REFRESH};
pub use waterfall::{
    AttemptFailure, Completion, CompletionOptions, Waterfall, WaterfallConfig, WaterfallError,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
