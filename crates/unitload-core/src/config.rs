//! Loader configuration and the handoff values it is built from.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};
use crate::manifest::{ManifestFormat, PathRewrite};

/// Handoff key carrying the manifest location.
pub const MANIFEST_PATH_KEY: &str = "UNITLOAD_MANIFEST_PATH";
/// Handoff key carrying the base URL units are resolved against.
pub const BASE_URL_KEY: &str = "UNITLOAD_BASE_URL";
/// Handoff key overriding the concurrency limit.
pub const CONCURRENCY_KEY: &str = "UNITLOAD_CONCURRENCY";
/// Handoff key overriding the request timeout (seconds).
pub const TIMEOUT_KEY: &str = "UNITLOAD_TIMEOUT";
/// Handoff key selecting the load mode.
pub const MODE_KEY: &str = "UNITLOAD_MODE";

/// Default number of outstanding loads. Around 2000 concurrent requests the
/// host starts failing with resource exhaustion.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 500;

/// How units reach the execution environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Fetch and transform everything, then insert in manifest order.
    #[default]
    Buffered,
    /// Insert each unit as soon as all of its predecessors are inserted.
    Streaming,
    /// Let the environment fetch sources itself; append in manifest order.
    SequentialAppend,
    /// Sequential append with sources, then mocks, then tests.
    TestHarness,
}

impl LoadMode {
    /// Whether the loader fetches unit content itself in this mode.
    pub fn fetches_content(self) -> bool {
        matches!(self, Self::Buffered | Self::Streaming)
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buffered => "buffered",
            Self::Streaming => "streaming",
            Self::SequentialAppend => "sequential_append",
            Self::TestHarness => "test_harness",
        };
        f.write_str(name)
    }
}

impl FromStr for LoadMode {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "buffered" => Ok(Self::Buffered),
            "streaming" => Ok(Self::Streaming),
            "sequential_append" | "append" => Ok(Self::SequentialAppend),
            "test_harness" | "harness" => Ok(Self::TestHarness),
            other => Err(LoaderError::config(format!("unknown load mode: {}", other))),
        }
    }
}

/// Values handed to the loader by whatever embeds it.
///
/// The manifest location is taken out of the map when a configuration is
/// built from it, so it never leaks into the loaded application.
#[derive(Debug, Clone, Default)]
pub struct HandoffGlobals {
    values: HashMap<String, String>,
}

impl HandoffGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `UNITLOAD_*` variable from the process environment.
    pub fn from_env() -> Self {
        Self {
            values: std::env::vars()
                .filter(|(key, _)| key.starts_with("UNITLOAD_"))
                .collect(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Remove and return a value.
    pub fn take(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Base URL unit identifiers and the manifest are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Manifest location. Consumed by the first session built from this config.
    #[serde(default)]
    pub manifest_location: Option<String>,

    /// Maximum number of outstanding loads.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// How units are inserted.
    #[serde(default)]
    pub mode: LoadMode,

    /// Manifest encoding.
    #[serde(default)]
    pub manifest_format: ManifestFormat,

    /// Rewrite applied to every manifest identifier.
    #[serde(default)]
    pub path_rewrite: PathRewrite,
}

fn default_base_url() -> String {
    "http://localhost:8080/".to_string()
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_timeout() -> u64 {
    30
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            manifest_location: None,
            concurrency_limit: default_concurrency_limit(),
            timeout_secs: default_timeout(),
            mode: LoadMode::default(),
            manifest_format: ManifestFormat::default(),
            path_rewrite: PathRewrite::default(),
        }
    }
}

impl LoaderConfig {
    /// Build a config from handoff values, taking the manifest location out
    /// of `globals`.
    ///
    /// | Key | Description |
    /// |-----|-------------|
    /// | `UNITLOAD_MANIFEST_PATH` | Manifest location (removed after reading) |
    /// | `UNITLOAD_BASE_URL` | Base URL for units and manifest |
    /// | `UNITLOAD_CONCURRENCY` | Maximum outstanding loads |
    /// | `UNITLOAD_TIMEOUT` | Request timeout in seconds |
    /// | `UNITLOAD_MODE` | `buffered`, `streaming`, `append` or `harness` |
    pub fn from_globals(globals: &mut HandoffGlobals) -> LoaderResult<Self> {
        let defaults = Self::default();
        let concurrency_limit = match globals.get(CONCURRENCY_KEY) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                LoaderError::config(format!("invalid {}: {}", CONCURRENCY_KEY, raw))
            })?,
            None => defaults.concurrency_limit,
        };
        let timeout_secs = match globals.get(TIMEOUT_KEY) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                LoaderError::config(format!("invalid {}: {}", TIMEOUT_KEY, raw))
            })?,
            None => defaults.timeout_secs,
        };
        let mode = match globals.get(MODE_KEY) {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };

        let config = Self {
            base_url: globals
                .get(BASE_URL_KEY)
                .map(String::from)
                .unwrap_or(defaults.base_url),
            manifest_location: globals.take(MANIFEST_PATH_KEY),
            concurrency_limit,
            timeout_secs,
            mode,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config from `UNITLOAD_*` environment variables.
    ///
    /// `UNITLOAD_MANIFEST_PATH` is removed from the process environment once
    /// read, so child processes and later calls never see it.
    pub fn from_env() -> LoaderResult<Self> {
        let mut globals = HandoffGlobals::from_env();
        if globals.contains(MANIFEST_PATH_KEY) {
            std::env::remove_var(MANIFEST_PATH_KEY);
        }
        Self::from_globals(&mut globals)
    }

    /// Reject values the loader cannot run with.
    pub fn validate(&self) -> LoaderResult<()> {
        if self.concurrency_limit == 0 {
            return Err(LoaderError::config("concurrency limit must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(LoaderError::config("timeout must be at least 1 second"));
        }
        Ok(())
    }

    /// Take the manifest location, leaving `None` behind.
    pub fn take_manifest_location(&mut self) -> LoaderResult<String> {
        self.manifest_location
            .take()
            .filter(|location| !location.trim().is_empty())
            .ok_or_else(|| LoaderError::manifest("<unset>", "manifest location was not provided"))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_manifest(mut self, location: impl Into<String>) -> Self {
        self.manifest_location = Some(location.into());
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_manifest_format(mut self, format: ManifestFormat) -> Self {
        self.manifest_format = format;
        self
    }

    pub fn with_path_rewrite(mut self, rewrite: PathRewrite) -> Self {
        self.path_rewrite = rewrite;
        self
    }
}
