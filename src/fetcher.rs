use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::error::{DownloadError, FetchError, RequestFailure};
use crate::source::PageFetcher;

/// Some sites refuse the default reqwest agent for the page itself.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Blocking HTTP client for static mode. One request at a time, no retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<Response, RequestFailure> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| RequestFailure::from_reqwest(&e))?;

        let status = resp.status();
        debug!("GET {} status={}", url, status.as_u16());
        if !status.is_success() {
            return Err(RequestFailure::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)
            .and_then(|resp| resp.text().map_err(|e| RequestFailure::from_reqwest(&e)))
            .map_err(|failure| FetchError::new(url, failure))
    }

    fn download_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let resp = self
            .get(url)
            .map_err(|failure| DownloadError::new(url, failure))?;

        if let Some(problem) = content_type_warning(content_type(&resp).as_deref()) {
            warn!("{} for URL: {}", problem, url);
        }

        let bytes = resp
            .bytes()
            .map_err(|e| DownloadError::new(url, RequestFailure::from_reqwest(&e)))?;
        Ok(bytes.to_vec())
    }
}

fn content_type(resp: &Response) -> Option<String> {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
}

/// Describe what is off about a response's Content-Type, if anything.
/// Advisory only: the download is saved either way.
fn content_type_warning(content_type: Option<&str>) -> Option<String> {
    match content_type {
        None | Some("") => Some("No Content-Type header".to_string()),
        Some(ct) if !ct.starts_with("image/") => Some(format!("Unexpected Content-Type '{}'", ct)),
        Some(_) => None,
    }
}
