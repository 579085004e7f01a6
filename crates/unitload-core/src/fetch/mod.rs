//! Unit fetchers.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;
use url::Url;

use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};

mod http;

use http::{BodyOutcome, HttpBackend};

/// User agent sent with every request.
pub const LOADER_USER_AGENT: &str = concat!("unitload/", env!("CARGO_PKG_VERSION"));

const EMPTY_RESPONSE: &str = "empty/unexpected response";

/// Fetches the raw text of one unit.
///
/// Implementations never retry: an error ends the session.
#[async_trait]
pub trait UnitFetcher: Send + Sync {
    /// Fetch the content of `identifier`. An empty body is an error.
    async fn fetch(&self, identifier: &str) -> LoaderResult<String>;

    /// Fetch a manifest payload. Failures are reported as manifest errors.
    async fn fetch_manifest(&self, location: &str) -> LoaderResult<String> {
        self.fetch(location).await.map_err(|err| match err {
            LoaderError::Fetch {
                identifier,
                status,
                cause,
            } => LoaderError::Manifest {
                location: identifier,
                status,
                reason: cause,
            },
            other => other,
        })
    }
}

/// Fetches units over HTTP(S), resolving identifiers against a base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: HttpBackend,
}

impl HttpFetcher {
    pub fn new(config: &LoaderConfig) -> LoaderResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(LOADER_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| LoaderError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http: HttpBackend {
                client,
                base_url: parse_base_url(&config.base_url)?,
            },
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.http.base_url
    }

    fn resolve(&self, identifier: &str) -> LoaderResult<Url> {
        self.http.resolve(identifier).map_err(|e| LoaderError::Fetch {
            identifier: identifier.to_string(),
            status: None,
            cause: format!("invalid unit location: {}", e),
        })
    }
}

#[async_trait]
impl UnitFetcher for HttpFetcher {
    async fn fetch(&self, identifier: &str) -> LoaderResult<String> {
        let url = self.resolve(identifier)?;
        debug!(url = %url, "fetching unit");

        match self.http.get_text(&url).await {
            Ok(BodyOutcome::Body(text)) => Ok(text),
            Ok(BodyOutcome::Empty(status)) => Err(LoaderError::Fetch {
                identifier: identifier.to_string(),
                status: Some(status.as_u16()),
                cause: EMPTY_RESPONSE.to_string(),
            }),
            Err(failure) => Err(LoaderError::Fetch {
                identifier: identifier.to_string(),
                status: failure.status,
                cause: failure.cause,
            }),
        }
    }
}

/// Base URLs always get a trailing slash so relative identifiers join below them.
fn parse_base_url(raw: &str) -> LoaderResult<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| LoaderError::config(format!("invalid base URL {}: {}", raw, e)))
}

/// Reads units from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, identifier: &str) -> LoaderResult<PathBuf> {
        let relative = Path::new(identifier.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(LoaderError::Fetch {
                identifier: identifier.to_string(),
                status: None,
                cause: "path escapes the unit root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl UnitFetcher for FileFetcher {
    async fn fetch(&self, identifier: &str) -> LoaderResult<String> {
        let path = self.resolve(identifier)?;
        debug!(path = %path.display(), "reading unit");

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LoaderError::Fetch {
                identifier: identifier.to_string(),
                status: None,
                cause: format!("failed to read {}: {}", path.display(), e),
            })?;

        if text.is_empty() {
            return Err(LoaderError::Fetch {
                identifier: identifier.to_string(),
                status: None,
                cause: EMPTY_RESPONSE.to_string(),
            });
        }
        Ok(text)
    }
}
