//! HTTP client shared by the version resolver and the archive fetcher.
//!
//! # Design
//! - One client per run; the connect timeout applies to every request.
//! - Page fetches carry a whole-request timeout, downloads only an idle timeout
//!   so large archives are not cut off while bytes keep arriving.

use std::time::Duration;

use reqwest::Client;

use crate::error::{FetchError, FetchResult};

const USER_AGENT: &str = concat!("appstage/", env!("CARGO_PKG_VERSION"));

/// Timeouts applied to network operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// Connect timeout and whole-request timeout for version pages.
    pub http_timeout: Duration,
    /// Maximum silence between two body chunks of an archive download.
    pub download_idle_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            download_idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Thin wrapper over [`reqwest::Client`] carrying the run's timeouts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    pub(crate) client: Client,
    pub(crate) settings: FetchSettings,
}

impl HttpFetcher {
    /// Build a fetcher with the supplied timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] when the TLS backend cannot be initialised.
    pub fn new(settings: FetchSettings) -> FetchResult<Self> {
        let client = Client::builder()
            .connect_timeout(settings.http_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| FetchError::Client { source })?;
        Ok(Self { client, settings })
    }

    /// Fetch a page body as text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::PageRequest`] on transport failure and
    /// [`FetchError::PageStatus`] when the server answers with a non-success code.
    pub async fn get_text(&self, url: &str) -> FetchResult<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.settings.http_timeout)
            .send()
            .await
            .map_err(|source| FetchError::PageRequest {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::PageStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|source| FetchError::PageRequest {
                url: url.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn get_text_returns_body_on_success() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200).body("hello");
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let body = fetcher.get_text(&server.url("/page")).await?;
        assert_eq!(body, "hello");
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn get_text_rejects_error_status() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404);
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let err = fetcher.get_text(&server.url("/gone")).await;
        assert!(matches!(err, Err(FetchError::PageStatus { status: 404, .. })));
        Ok(())
    }
}
