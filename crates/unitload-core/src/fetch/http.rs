//! HTTP layer: the only place that interprets status codes.

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

/// Outcome of a successful GET.
#[derive(Debug)]
pub(crate) enum BodyOutcome {
    Body(String),
    /// 2xx with an empty body. Callers treat this as a broken response.
    Empty(StatusCode),
}

/// Transport failure or non-success status.
#[derive(Debug)]
pub(crate) struct HttpFailure {
    pub status: Option<u16>,
    pub cause: String,
}

/// HTTP backend (holds the reqwest client and base URL).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: Url,
}

impl HttpBackend {
    /// Resolve an identifier against the base URL. Absolute URLs pass through.
    pub(crate) fn resolve(&self, identifier: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(identifier)
    }

    /// GET `url` and read its body as text. No retries.
    pub(crate) async fn get_text(&self, url: &Url) -> Result<BodyOutcome, HttpFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| HttpFailure {
                status: e.status().map(|s| s.as_u16()),
                cause: format!("request failed: {}", e),
            })?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.trim().chars().take(200).collect();
            let cause = if detail.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), detail)
            };
            return Err(HttpFailure {
                status: Some(status.as_u16()),
                cause,
            });
        }

        let text = response.text().await.map_err(|e| HttpFailure {
            status: Some(status.as_u16()),
            cause: format!("failed to read response body: {}", e),
        })?;

        if text.is_empty() {
            debug!(url = %url, "empty response body");
            return Ok(BodyOutcome::Empty(status));
        }

        Ok(BodyOutcome::Body(text))
    }
}
