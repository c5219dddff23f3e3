//! Archive download.
//!
//! # Design
//! - An archive already present on disk is reused unless a download is forced.
//! - The response status is checked before the destination file is touched.
//! - Each body chunk must arrive within the idle timeout; partial files are left
//!   in place for inspection.

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::client::HttpFetcher;
use crate::error::{FetchError, FetchResult};

/// Result of [`ensure_local_archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Bytes written to disk during this call.
    pub bytes: u64,
    /// Whether an existing archive was reused without a request.
    pub reused: bool,
}

/// Make sure `path` holds the archive published at `url`.
///
/// When the file exists and `force_download` is false nothing is fetched and
/// the outcome reports zero bytes.
///
/// # Errors
///
/// Returns transport, status, and stall errors from the download and
/// [`FetchError::Io`] when the destination cannot be written.
pub async fn ensure_local_archive(
    fetcher: &HttpFetcher,
    url: &str,
    path: &Path,
    force_download: bool,
) -> FetchResult<DownloadOutcome> {
    if !force_download && path.is_file() {
        info!(path = %path.display(), "reusing existing archive");
        return Ok(DownloadOutcome {
            bytes: 0,
            reused: true,
        });
    }

    let response = fetcher
        .client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::DownloadRequest {
            url: url.to_string(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::DownloadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = File::create(path)
        .await
        .map_err(|err| FetchError::io("download.create", path, err))?;
    let idle = fetcher.settings.download_idle_timeout;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    loop {
        let next = tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| FetchError::DownloadStalled {
                url: url.to_string(),
                idle_secs: idle.as_secs(),
            })?;
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|source| FetchError::DownloadRequest {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|err| FetchError::io("download.write", path, err))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|err| FetchError::io("download.flush", path, err))?;
    debug!(url, path = %path.display(), bytes = written, "archive downloaded");
    Ok(DownloadOutcome {
        bytes: written,
        reused: false,
    })
}
