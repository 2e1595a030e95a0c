//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for dispatch behaviour.
//!
//! ## Environment Variables
//!
//! ### `ROUTEBIND_SESSION_COOKIE`
//!
//! Name of the cookie carrying the session identifier that session-tagged
//! fields are looked up with.
//!
//! Default: `__routebind_session`
//!
//! ### `ROUTEBIND_AMBIGUITY`
//!
//! What the pattern matcher does when several patterns survive elimination:
//! - `specific`: pick the most specific pattern and log a warning (default)
//! - `reject`: answer 409 with the candidate templates
//!
//! Unknown values fall back to the default.
//!
//! ## Usage
//!
//! ```rust
//! use routebind::runtime_config::RuntimeConfig;
//! use routebind::dispatcher::Dispatcher;
//!
//! let config = RuntimeConfig::from_env();
//! let dispatcher = Dispatcher::with_config(config);
//! ```

use std::env;
use tracing::warn;

use crate::router::AmbiguityPolicy;

pub const SESSION_COOKIE_ENV: &str = "ROUTEBIND_SESSION_COOKIE";
pub const AMBIGUITY_ENV: &str = "ROUTEBIND_AMBIGUITY";
pub const DEFAULT_SESSION_COOKIE: &str = "__routebind_session";

/// Runtime configuration, passed explicitly to [`Dispatcher::with_config`](crate::dispatcher::Dispatcher::with_config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Cookie holding the session id (default: `__routebind_session`)
    pub session_cookie: String,
    /// Tie-break policy of the pattern matcher
    pub ambiguity: AmbiguityPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            ambiguity: AmbiguityPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(cookie) = lookup(SESSION_COOKIE_ENV) {
            let cookie = cookie.trim();
            if !cookie.is_empty() {
                config.session_cookie = cookie.to_string();
            }
        }
        if let Some(value) = lookup(AMBIGUITY_ENV) {
            match AmbiguityPolicy::parse(&value) {
                Some(policy) => config.ambiguity = policy,
                None => warn!(
                    variable = AMBIGUITY_ENV,
                    value = %value,
                    "Unknown ambiguity policy, using default"
                ),
            }
        }
        config
    }
}
