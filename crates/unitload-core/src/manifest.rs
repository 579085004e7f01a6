//! Manifest loading.
//!
//! A manifest is the ordered list of unit identifiers to load. It arrives
//! either as a JSON array of strings or as newline-delimited text; both
//! normalize to [`Manifest`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::fetch::UnitFetcher;

/// Manifest encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    /// JSON when the payload starts with `[`, text otherwise.
    #[default]
    Auto,
    /// JSON array of strings.
    Json,
    /// One identifier per line, blank lines ignored.
    Text,
}

/// Rewrite applied uniformly to every identifier.
///
/// `strip_prefix` rebases absolute build paths against a workspace root,
/// `prepend` adds the prefix the units are served under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRewrite {
    #[serde(default)]
    pub strip_prefix: Option<String>,
    #[serde(default)]
    pub prepend: Option<String>,
}

impl PathRewrite {
    /// Rebase identifiers under `root` so they become root-relative.
    pub fn rebase(root: impl Into<String>) -> Self {
        Self {
            strip_prefix: Some(root.into()),
            prepend: None,
        }
    }

    pub fn with_prepend(mut self, prefix: impl Into<String>) -> Self {
        self.prepend = Some(prefix.into());
        self
    }

    pub fn is_identity(&self) -> bool {
        self.strip_prefix.is_none() && self.prepend.is_none()
    }

    pub fn apply(&self, identifier: &str) -> String {
        let rest = match self.strip_prefix.as_deref() {
            Some(root) => strip_root(identifier, root).unwrap_or(identifier),
            None => identifier,
        };
        match self.prepend.as_deref() {
            Some(prefix) => format!("{}{}", prefix, rest),
            None => rest.to_string(),
        }
    }
}

/// Strip `root` only at a path-segment boundary.
fn strip_root<'a>(identifier: &'a str, root: &str) -> Option<&'a str> {
    let rest = identifier.strip_prefix(root)?;
    if root.ends_with('/') || rest.is_empty() || rest.starts_with('/') {
        Some(rest.trim_start_matches('/'))
    } else {
        None
    }
}

/// Immutable, ordered, non-empty list of unit identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    location: String,
    identifiers: Vec<String>,
}

impl Manifest {
    pub fn new(location: impl Into<String>, identifiers: Vec<String>) -> LoaderResult<Self> {
        let location = location.into();
        if identifiers.is_empty() {
            return Err(LoaderError::manifest(location, "manifest lists no units"));
        }
        Ok(Self {
            location,
            identifiers,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Always false; an empty manifest is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.identifiers.get(index).map(String::as_str)
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.identifiers.iter().map(String::as_str)
    }

    pub(crate) fn into_identifiers(self) -> Vec<String> {
        self.identifiers
    }
}

/// Resolves a manifest location into a [`Manifest`].
#[derive(Debug, Clone, Default)]
pub struct ManifestSource {
    format: ManifestFormat,
    rewrite: PathRewrite,
}

impl ManifestSource {
    pub fn new(format: ManifestFormat, rewrite: PathRewrite) -> Self {
        Self { format, rewrite }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.manifest_format, config.path_rewrite.clone())
    }

    /// Fetch and parse the manifest at `location`.
    pub async fn load(&self, fetcher: &dyn UnitFetcher, location: &str) -> LoaderResult<Manifest> {
        debug!(location = %location, format = ?self.format, "loading manifest");
        let payload = fetcher.fetch_manifest(location).await?;
        self.parse(location, &payload)
    }

    /// Parse a manifest payload.
    pub fn parse(&self, location: &str, payload: &str) -> LoaderResult<Manifest> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Err(LoaderError::manifest(
                location,
                "empty/unexpected response",
            ));
        }

        let format = match self.format {
            ManifestFormat::Auto if trimmed.starts_with('[') => ManifestFormat::Json,
            ManifestFormat::Auto => ManifestFormat::Text,
            explicit => explicit,
        };

        let raw = match format {
            ManifestFormat::Json => parse_json(location, trimmed)?,
            _ => parse_text(trimmed),
        };

        let identifiers = if self.rewrite.is_identity() {
            raw
        } else {
            raw.iter().map(|id| self.rewrite.apply(id)).collect()
        };
        let manifest = Manifest::new(location, identifiers)?;
        debug!(location = %location, units = manifest.len(), "manifest loaded");
        Ok(manifest)
    }
}

fn parse_json(location: &str, payload: &str) -> LoaderResult<Vec<String>> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| LoaderError::manifest(location, format!("invalid JSON: {}", e)))?;

    let Value::Array(entries) = value else {
        return Err(LoaderError::manifest(location, "manifest is not a JSON array"));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::String(s) if !s.trim().is_empty() => Ok(s),
            Value::String(_) => Err(LoaderError::manifest(
                location,
                format!("entry {} is an empty string", i),
            )),
            other => Err(LoaderError::manifest(
                location,
                format!("entry {} is not a string: {}", i, other),
            )),
        })
        .collect()
}

fn parse_text(payload: &str) -> Vec<String> {
    payload
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
