//! Load configuration from XDG `config.toml` and project `.env`, apply it to the process
//! environment with priority **existing env > .env > XDG**, then resolve typed [`Settings`].
//!
//! ```ignore
//! config::load_and_apply("freeroute", None)?;
//! let settings = config::Settings::from_env();
//! ```

mod dotenv;
mod settings;
mod xdg_toml;

use std::path::Path;
use thiserror::Error;

pub use settings::{
    Settings, DEFAULT_BASE_URL, DEFAULT_CATEGORY, DEFAULT_FALLBACK_MODEL, DEFAULT_TIMEOUT_SECS,
    ENV_API_KEY, ENV_BASE_URL, ENV_CACHE_PATH, ENV_CATEGORY, ENV_FALLBACK_MODEL, ENV_MAX_TOKENS,
    ENV_TEMPERATURE, ENV_TIMEOUT_SECS,
};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(#[from] ::dotenv::Error),
}

/// Loads XDG `config.toml` and the optional project `.env`, then sets environment variables
/// only for keys that are **not** already set.
///
/// When a key is missing from the process environment:
/// 1. value from project `.env` (current directory or `override_dir`)
/// 2. value from `$XDG_CONFIG_HOME/<app_name>/config.toml` `[env]` table
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir)?;

    let mut keys: std::collections::HashSet<&String> = xdg_map.keys().collect();
    keys.extend(dotenv_map.keys());

    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
        }
    }

    Ok(())
}

/// Tests in this crate mutate process-wide env vars; they take this lock first.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
