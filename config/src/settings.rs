//! Typed settings resolved from environment variables (after [`crate::load_and_apply`]).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_BASE_URL: &str = "OPENROUTER_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "FREEROUTE_TIMEOUT_SECS";
pub const ENV_MAX_TOKENS: &str = "FREEROUTE_MAX_TOKENS";
pub const ENV_TEMPERATURE: &str = "FREEROUTE_TEMPERATURE";
pub const ENV_FALLBACK_MODEL: &str = "FREEROUTE_FALLBACK_MODEL";
pub const ENV_CATEGORY: &str = "FREEROUTE_CATEGORY";
pub const ENV_CACHE_PATH: &str = "FREEROUTE_CACHE_PATH";

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FALLBACK_MODEL: &str = "meta-llama/llama-3.3-70b-instruct:free";
pub const DEFAULT_CATEGORY: &str = "roleplay";

/// Runtime settings for the catalog, cache and inference calls.
///
/// `default_max_tokens` / `default_temperature` stay `None` when the environment does not set
/// them; the dispatcher then applies its built-in defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Bearer credential. `None` when unset or blank.
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
    pub default_max_tokens: Option<u32>,
    pub default_temperature: Option<f32>,
    pub fallback_model: String,
    /// Category tag for the narrow catalog query; `None` skips that query.
    pub category: Option<String>,
    pub cache_path: PathBuf,
}

impl Settings {
    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup (tests pass a map here).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs = parse_or_warn::<u64>(ENV_TIMEOUT_SECS, get(ENV_TIMEOUT_SECS))
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let category = match lookup(ENV_CATEGORY) {
            // Explicitly empty disables the category query.
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => Some(DEFAULT_CATEGORY.to_string()),
        };

        Self {
            api_key: get(ENV_API_KEY),
            base_url: get(ENV_BASE_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            default_max_tokens: parse_or_warn(ENV_MAX_TOKENS, get(ENV_MAX_TOKENS)),
            default_temperature: parse_or_warn(ENV_TEMPERATURE, get(ENV_TEMPERATURE)),
            fallback_model: get(ENV_FALLBACK_MODEL)
                .unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string()),
            category,
            cache_path: get(ENV_CACHE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_path),
        }
    }

    /// True when a non-blank credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

/// `<user cache dir>/freeroute/models.json`, or `./.freeroute/models.json` when the platform
/// has no cache dir.
fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("freeroute"))
        .unwrap_or_else(|| PathBuf::from(".freeroute"))
        .join("models.json")
}

fn parse_or_warn<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
