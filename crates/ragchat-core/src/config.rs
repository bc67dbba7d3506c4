//! Front end configuration.
//!
//! Settings come from the process environment. [`load_env_files`] puts
//! `.env` and then `local.env` into it first, the latter overriding the
//! former.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::error::RagchatError;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_TOP_K: u32 = 5;
const DEFAULT_MAX_TOP_K: u32 = 20;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TITLE: &str = "Corporate Training Assistant";
const DEFAULT_DESCRIPTION: &str = "Ask questions about your corporate training documents";

/// Which backend endpoint answers questions in this deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryTransport {
    /// `POST /api/query`
    #[default]
    Post,
    /// `GET /api/query`
    Get,
    /// `POST /api/query/stream`
    Stream,
}

impl FromStr for QueryTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "post" => Ok(QueryTransport::Post),
            "get" => Ok(QueryTransport::Get),
            "stream" | "streaming" | "sse" => Ok(QueryTransport::Stream),
            other => Err(format!("Unknown query transport '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub backend_url: String,
    pub default_top_k: u32,
    pub max_top_k: u32,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    pub app_title: String,
    pub app_description: String,
    pub environment: String,
    pub debug: bool,
    pub transport: QueryTransport,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            default_top_k: DEFAULT_TOP_K,
            max_top_k: DEFAULT_MAX_TOP_K,
            request_timeout: DEFAULT_TIMEOUT_SECS,
            app_title: DEFAULT_TITLE.to_string(),
            app_description: DEFAULT_DESCRIPTION.to_string(),
            environment: "development".to_string(),
            debug: false,
            transport: QueryTransport::default(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    ///
    /// Unparsable values fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut settings = Self {
            backend_url: lookup("BACKEND_URL").unwrap_or(defaults.backend_url),
            default_top_k: parse_or("DEFAULT_TOP_K", &lookup, defaults.default_top_k),
            max_top_k: parse_or("MAX_TOP_K", &lookup, defaults.max_top_k),
            request_timeout: parse_or("REQUEST_TIMEOUT", &lookup, defaults.request_timeout),
            app_title: lookup("APP_TITLE").unwrap_or(defaults.app_title),
            app_description: lookup("APP_DESCRIPTION").unwrap_or(defaults.app_description),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            debug: debug_enabled(&lookup),
            transport: parse_or("QUERY_TRANSPORT", &lookup, defaults.transport),
        };

        if settings.max_top_k == 0 {
            warn!("MAX_TOP_K must be positive, using {}", DEFAULT_MAX_TOP_K);
            settings.max_top_k = DEFAULT_MAX_TOP_K;
        }
        settings.default_top_k = settings.default_top_k.clamp(1, settings.max_top_k);
        settings
    }

    /// Backend base URL without a trailing slash.
    pub fn backend_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Loads `.env` and then `local.env` from `dir` into the process environment.
///
/// Missing files are skipped. Files that exist but cannot be read or parsed
/// are returned, since tracing is usually not installed yet at this point.
pub fn load_env_files(dir: &Path) -> Vec<RagchatError> {
    let mut failures = Vec::new();
    for (name, overrides) in [(".env", false), ("local.env", true)] {
        let path = dir.join(name);
        let loaded = if overrides {
            dotenvy::from_path_override(&path)
        } else {
            dotenvy::from_path(&path)
        };
        if let Err(err) = loaded {
            if !err.not_found() {
                failures.push(RagchatError::config(format!(
                    "Failed to load {}: {}",
                    path.display(),
                    err
                )));
            }
        }
    }
    failures
}

/// `DEBUG` is on only for `true`, in any case.
pub fn debug_enabled<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("DEBUG").is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        None => default,
    }
}
