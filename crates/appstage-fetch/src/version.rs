//! Version resolution.
//!
//! # Design
//! - Precedence: caller override, then explicit descriptor version, then the
//!   remote version page.
//! - With an explicit version the remote check is informational; its failures
//!   are logged and ignored unless `use_latest_version` asks for the remote value.
//! - The pattern must declare a capture group; this is checked before any request.

use regex::Regex;
use tracing::{debug, info, warn};

use appstage_config::{AppDescriptor, VersionCheck};

use crate::client::HttpFetcher;
use crate::error::{FetchError, FetchResult};

/// Where the resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// Supplied by the caller for this run.
    Override,
    /// Pinned in the descriptor.
    Explicit,
    /// Scraped from the version page.
    Remote,
}

impl VersionSource {
    /// Stable label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Explicit => "explicit",
            Self::Remote => "remote",
        }
    }
}

/// Version chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Trimmed version string.
    pub version: String,
    /// Origin of the version.
    pub source: VersionSource,
}

impl ResolvedVersion {
    fn new(version: impl Into<String>, source: VersionSource) -> Self {
        Self {
            version: version.into(),
            source,
        }
    }
}

/// Compile a version pattern and make sure it captures something.
///
/// # Errors
///
/// Returns [`FetchError::PatternSyntax`] for invalid expressions and
/// [`FetchError::MissingCaptureGroup`] when the expression has no group 1.
pub fn compile_version_pattern(pattern: &str) -> FetchResult<Regex> {
    let regex = Regex::new(pattern).map_err(|source| FetchError::PatternSyntax {
        pattern: pattern.to_string(),
        source,
    })?;
    if regex.captures_len() < 2 {
        return Err(FetchError::MissingCaptureGroup {
            pattern: pattern.to_string(),
        });
    }
    Ok(regex)
}

/// Capture group 1 of the first match in `body`, trimmed.
#[must_use]
pub fn extract_version(body: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|group| group.as_str().trim().to_string())
}

/// Fetch the version page and extract the version it advertises.
///
/// # Errors
///
/// Propagates pattern errors, page request failures, and
/// [`FetchError::PatternNotFound`] when nothing matches.
pub async fn scrape_version(fetcher: &HttpFetcher, check: &VersionCheck) -> FetchResult<String> {
    let pattern = compile_version_pattern(&check.pattern)?;
    let body = fetcher.get_text(&check.url).await?;
    debug!(url = %check.url, bytes = body.len(), "fetched version page");
    extract_version(&body, &pattern).ok_or_else(|| FetchError::PatternNotFound {
        url: check.url.clone(),
        pattern: check.pattern.clone(),
    })
}

/// Determine the version to stage.
///
/// # Errors
///
/// Fails when no version source is configured or when the remote lookup is the
/// only source and it fails.
pub async fn resolve_version(
    fetcher: &HttpFetcher,
    descriptor: &AppDescriptor,
    version_override: Option<&str>,
) -> FetchResult<ResolvedVersion> {
    if let Some(version) = version_override.map(str::trim).filter(|v| !v.is_empty()) {
        info!(version, "using version override");
        return Ok(ResolvedVersion::new(version, VersionSource::Override));
    }

    if let Some(explicit) = descriptor.explicit_version.as_deref() {
        let Some(check) = descriptor.version_check.as_ref() else {
            return Ok(ResolvedVersion::new(explicit, VersionSource::Explicit));
        };
        return Ok(match scrape_version(fetcher, check).await {
            Ok(remote) if remote == explicit => {
                debug!(version = explicit, "explicit version matches remote");
                ResolvedVersion::new(explicit, VersionSource::Explicit)
            }
            Ok(remote) if check.use_latest_version => {
                info!(explicit, remote = %remote, "remote version preferred over explicit version");
                ResolvedVersion::new(remote, VersionSource::Remote)
            }
            Ok(remote) => {
                info!(explicit, remote = %remote, "remote version differs; keeping explicit version");
                ResolvedVersion::new(explicit, VersionSource::Explicit)
            }
            Err(err) => {
                warn!(explicit, error = %err, url = %check.url, "version check failed; keeping explicit version");
                ResolvedVersion::new(explicit, VersionSource::Explicit)
            }
        });
    }

    let check = descriptor
        .version_check
        .as_ref()
        .ok_or(FetchError::NoVersionSource)?;
    let version = scrape_version(fetcher, check).await?;
    info!(version = %version, url = %check.url, "resolved remote version");
    Ok(ResolvedVersion::new(version, VersionSource::Remote))
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use crate::client::FetchSettings;
    use anyhow::Result;
    use appstage_test_support::fixtures::zip_descriptor;
    use httpmock::prelude::*;

    fn remote_descriptor(url: String, pattern: &str) -> AppDescriptor {
        let mut descriptor = zip_descriptor("Tool", "", "https://example.invalid/t.zip");
        descriptor.explicit_version = None;
        descriptor.version_check = Some(VersionCheck {
            url,
            pattern: pattern.to_string(),
            use_latest_version: false,
        });
        descriptor
    }

    #[test]
    fn extract_version_takes_first_match_group_one() -> Result<()> {
        let pattern = compile_version_pattern(r"v([0-9.]+ )")?;
        let body = "old v1.0 here, new v2.0 later";
        assert_eq!(extract_version(body, &pattern).as_deref(), Some("1.0"));
        Ok(())
    }

    #[test]
    fn compile_rejects_pattern_without_group() {
        assert!(matches!(
            compile_version_pattern("v[0-9]+"),
            Err(FetchError::MissingCaptureGroup { .. })
        ));
        assert!(matches!(
            compile_version_pattern("v([0-9]+"),
            Err(FetchError::PatternSyntax { .. })
        ));
    }

    #[tokio::test]
    async fn remote_version_is_scraped_from_page() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/download");
            then.status(200)
                .body("<p>Current Version: 8.6.9</p><p>Current Version: 8.6.8</p>");
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let descriptor = remote_descriptor(
            server.url("/download"),
            r"Current Version:\s*([0-9.]+)",
        );
        let resolved = resolve_version(&fetcher, &descriptor, None).await?;
        assert_eq!(resolved, ResolvedVersion::new("8.6.9", VersionSource::Remote));
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn pattern_without_group_fails_before_request() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/download");
            then.status(200).body("v1.2");
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let descriptor = remote_descriptor(server.url("/download"), r"v[0-9.]+");
        let err = resolve_version(&fetcher, &descriptor, None).await;
        assert!(matches!(err, Err(FetchError::MissingCaptureGroup { .. })));
        mock.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn unmatched_page_is_pattern_not_found() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/download");
            then.status(200).body("nothing to see");
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let descriptor = remote_descriptor(server.url("/download"), r"v([0-9.]+)");
        let err = resolve_version(&fetcher, &descriptor, None).await;
        assert!(matches!(err, Err(FetchError::PatternNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn explicit_version_survives_remote_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/download");
            then.status(500);
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let mut descriptor = remote_descriptor(server.url("/download"), r"v([0-9.]+)");
        descriptor.explicit_version = Some("1.0".to_string());
        let resolved = resolve_version(&fetcher, &descriptor, None).await?;
        assert_eq!(resolved, ResolvedVersion::new("1.0", VersionSource::Explicit));
        Ok(())
    }

    #[tokio::test]
    async fn use_latest_version_prefers_remote_match() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/download");
            then.status(200).body("latest v2.5");
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let mut descriptor = remote_descriptor(server.url("/download"), r"v([0-9.]+)");
        descriptor.explicit_version = Some("1.0".to_string());

        let kept = resolve_version(&fetcher, &descriptor, None).await?;
        assert_eq!(kept.version, "1.0");

        if let Some(check) = descriptor.version_check.as_mut() {
            check.use_latest_version = true;
        }
        let latest = resolve_version(&fetcher, &descriptor, None).await?;
        assert_eq!(latest, ResolvedVersion::new("2.5", VersionSource::Remote));
        Ok(())
    }

    #[tokio::test]
    async fn override_skips_remote_lookup() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/download");
            then.status(200).body("v9");
        });

        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let descriptor = remote_descriptor(server.url("/download"), r"v([0-9.]+)");
        let resolved = resolve_version(&fetcher, &descriptor, Some(" 3.1 ")).await?;
        assert_eq!(resolved, ResolvedVersion::new("3.1", VersionSource::Override));
        mock.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_sources_are_rejected() -> Result<()> {
        let fetcher = HttpFetcher::new(FetchSettings::default())?;
        let mut descriptor = zip_descriptor("Tool", "", "https://example.invalid/t.zip");
        descriptor.explicit_version = None;
        descriptor.version_check = None;
        let err = resolve_version(&fetcher, &descriptor, None).await;
        assert!(matches!(err, Err(FetchError::NoVersionSource)));
        Ok(())
    }
}
