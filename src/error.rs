use std::path::PathBuf;
use thiserror::Error;

/// Why a single HTTP request (or browser navigation) did not produce a body.
#[derive(Error, Debug)]
pub enum RequestFailure {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connect(String),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("renderer error: {0}")]
    Render(String),

    #[error("{0}")]
    Other(String),
}

impl RequestFailure {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_timeout() {
            Self::Timeout
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// The page itself could not be acquired. Always fatal for the run.
#[derive(Error, Debug)]
#[error("failed to fetch {url}: {failure}")]
pub struct FetchError {
    pub url: String,
    pub failure: RequestFailure,
}

impl FetchError {
    pub fn new(url: impl Into<String>, failure: RequestFailure) -> Self {
        Self {
            url: url.into(),
            failure,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.failure.status()
    }
}

/// One image could not be downloaded. Recorded and skipped by the orchestrator.
#[derive(Error, Debug)]
#[error("failed to download {url}: {failure}")]
pub struct DownloadError {
    pub url: String,
    pub failure: RequestFailure,
}

impl DownloadError {
    pub fn new(url: impl Into<String>, failure: RequestFailure) -> Self {
        Self {
            url: url.into(),
            failure,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.failure.status()
    }
}

/// Why a run ended before every candidate had an outcome.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("interrupted by user")]
    Interrupted,
}

/// Errors that can occur when preparing the output directory or saving an image
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("path exists but is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotADirectory { path } | Self::Io { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_only_reported_for_http_failures() {
        let err = FetchError::new("https://example.com", RequestFailure::Status(404));
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "failed to fetch https://example.com: HTTP 404");

        let err = DownloadError::new("https://example.com/a.png", RequestFailure::Timeout);
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn run_error_is_transparent_over_fetch_errors() {
        let err: RunError = FetchError::new("https://example.com", RequestFailure::Timeout).into();
        assert_eq!(err.to_string(), "failed to fetch https://example.com: timed out");
        assert_eq!(RunError::Interrupted.to_string(), "interrupted by user");
    }

    #[test]
    fn write_error_keeps_the_offending_path() {
        let err = WriteError::NotADirectory {
            path: PathBuf::from("/tmp/out"),
        };
        assert_eq!(err.path(), std::path::Path::new("/tmp/out"));
        assert!(err.to_string().contains("not a directory"));
    }
}
