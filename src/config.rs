use std::path::PathBuf;
use std::time::Duration;

use crate::dimensions::SizeBounds;

/// Default per-request timeout for page fetches, downloads and captures.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How the candidate list is produced. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// Fetch the HTML, parse `<img>` URLs, download each one.
    Static,
    /// Render the page in headless Chrome and screenshot each image element.
    Rendered,
}

/// Everything one run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Page whose images are downloaded.
    pub url: String,
    /// Directory the images are written into.
    pub output_dir: PathBuf,
    /// Optional pixel bounds; all unset disables filtering.
    pub bounds: SizeBounds,
    pub mode: AcquisitionMode,
    /// Timeout handed to the fetch and render collaborators.
    pub timeout: Duration,
    pub verbose: bool,
}

impl RunConfig {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            bounds: SizeBounds::default(),
            mode: AcquisitionMode::Static,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verbose: false,
        }
    }
}
