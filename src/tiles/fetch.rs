use std::path::PathBuf;
use std::time::Duration;

use crate::foundation::error::FetchError;

/// Source of encoded tile bytes, addressed by URL.
///
/// Caching, if any, is the fetcher's business.
pub trait TileFetcher: Send + Sync {
    /// Fetch the body behind `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP(S) fetcher with a global per-request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::StatusCode(status) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            other => FetchError::Transport {
                url: url.to_string(),
                message: other.to_string(),
            },
        })?;
        resp.into_body()
            .read_to_vec()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// Reads tiles from the local filesystem; `file://` prefixes are stripped and relative paths
/// resolve against `root`.
#[derive(Clone, Debug, Default)]
pub struct FsFetcher {
    root: Option<PathBuf>,
}

impl FsFetcher {
    /// Fetcher resolving relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

impl TileFetcher for FsFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(url);
        std::fs::read(&path).map_err(|e| FetchError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Routes `http://`/`https://` URLs to [`HttpFetcher`] and everything else to [`FsFetcher`].
#[derive(Debug)]
pub struct SchemeFetcher {
    http: HttpFetcher,
    fs: FsFetcher,
}

impl SchemeFetcher {
    /// Combine an HTTP and a filesystem fetcher.
    pub fn new(http: HttpFetcher, fs: FsFetcher) -> Self {
        Self { http, fs }
    }
}

impl TileFetcher for SchemeFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.fetch(url)
        } else {
            self.fs.fetch(url)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tiles/fetch.rs"]
mod tests;
