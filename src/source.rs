use tracing::info;

use crate::config::AcquisitionMode;
use crate::dimensions::Dimensions;
use crate::error::{DownloadError, FetchError};
use crate::parser;

/// An image already captured by the renderer; no further network access needed.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub source_url: String,
    pub bytes: Vec<u8>,
    /// `None` when neither the element attributes nor the raster gave a size.
    pub dimensions: Option<Dimensions>,
    pub filename: String,
}

/// One unit of work for the orchestrator
#[derive(Debug, Clone)]
pub enum CandidateImage {
    /// Static mode: only the URL is known, bytes are downloaded later.
    Remote { source_url: String },
    /// Rendered mode: bytes were captured during acquisition.
    Captured(CapturedImage),
}

impl CandidateImage {
    pub fn remote(source_url: impl Into<String>) -> Self {
        Self::Remote {
            source_url: source_url.into(),
        }
    }

    pub fn source_url(&self) -> &str {
        match self {
            Self::Remote { source_url } => source_url,
            Self::Captured(img) => &img.source_url,
        }
    }
}

/// Plain HTTP access used by static mode
pub trait PageFetcher {
    /// Fetch the page body. Failure is fatal for the run.
    fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
    /// Download one image. Failure only affects that image.
    fn download_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Browser-backed capture used by rendered mode
pub trait PageRenderer {
    /// Load `url` and screenshot each image element.
    ///
    /// Only page-level navigation errors are returned; elements that fail to
    /// capture are left out of the list.
    fn capture_images(&self, url: &str) -> Result<Vec<CapturedImage>, FetchError>;
}

/// Produce the candidate list for one run.
pub fn acquire(
    mode: AcquisitionMode,
    url: &str,
    fetcher: &dyn PageFetcher,
    renderer: &dyn PageRenderer,
) -> Result<Vec<CandidateImage>, FetchError> {
    match mode {
        AcquisitionMode::Static => acquire_static(url, fetcher),
        AcquisitionMode::Rendered => acquire_rendered(url, renderer),
    }
}

pub fn acquire_static(url: &str, fetcher: &dyn PageFetcher) -> Result<Vec<CandidateImage>, FetchError> {
    info!("Fetching HTML from {}", url);
    let html = fetcher.fetch_html(url)?;

    info!("Parsing HTML for image URLs");
    Ok(parser::extract_image_urls(&html, url)
        .into_iter()
        .map(CandidateImage::remote)
        .collect())
}

pub fn acquire_rendered(
    url: &str,
    renderer: &dyn PageRenderer,
) -> Result<Vec<CandidateImage>, FetchError> {
    info!("Rendering {} in headless browser", url);
    Ok(renderer
        .capture_images(url)?
        .into_iter()
        .map(CandidateImage::Captured)
        .collect())
}
