use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::dimensions::{probe_dimensions, Dimensions};
use crate::error::RunError;
use crate::source::{self, CandidateImage, PageFetcher, PageRenderer};
use crate::storage;
use crate::summary::{DownloadOutcome, ItemReport, RunSummary};

/// Run the whole workflow: acquire candidates, then process each in order.
///
/// Only a failure to acquire the page itself is returned as an error, plus
/// `Interrupted` once `running` is cleared. Every per-image problem becomes a
/// `Failed` outcome and the loop carries on. `progress` is called once per
/// candidate after its outcome is known.
pub fn run_download(
    config: &RunConfig,
    fetcher: &dyn PageFetcher,
    renderer: &dyn PageRenderer,
    running: &AtomicBool,
    progress: &mut dyn FnMut(&ItemReport),
) -> Result<RunSummary, RunError> {
    let candidates = source::acquire(config.mode, &config.url, fetcher, renderer)?;
    process_all(&candidates, config, fetcher, running, progress)
}

/// Process `candidates` strictly left to right and tally the outcomes.
///
/// `running` is checked before each candidate. The candidate in flight is
/// always finished.
pub fn process_all(
    candidates: &[CandidateImage],
    config: &RunConfig,
    fetcher: &dyn PageFetcher,
    running: &AtomicBool,
    progress: &mut dyn FnMut(&ItemReport),
) -> Result<RunSummary, RunError> {
    let total = candidates.len();
    info!("Found {} image(s)", total);

    if total == 0 {
        return Ok(RunSummary::default());
    }

    let mut outcomes = Vec::with_capacity(total);

    for (i, candidate) in candidates.iter().enumerate() {
        if !running.load(Ordering::SeqCst) {
            return Err(RunError::Interrupted);
        }

        let index = i + 1;
        let url = candidate.source_url();
        info!("Processing {}/{}: {}", index, total, url);

        let outcome = process_one(candidate, index, config, fetcher);
        log_outcome(url, &outcome, config);

        progress(&ItemReport {
            index,
            total,
            source_url: url.to_string(),
            outcome: outcome.clone(),
        });
        outcomes.push(outcome);
    }

    let summary = RunSummary::tally(&outcomes);
    info!("{}", summary);
    Ok(summary)
}

/// Download (or reuse captured bytes), filter, name and save one candidate.
///
/// Never fails: download and write errors are folded into `Failed`.
pub fn process_one(
    candidate: &CandidateImage,
    index: usize,
    config: &RunConfig,
    fetcher: &dyn PageFetcher,
) -> DownloadOutcome {
    let (bytes, declared, filename): (Cow<'_, [u8]>, Option<Option<Dimensions>>, Cow<'_, str>) =
        match candidate {
            CandidateImage::Remote { source_url } => match fetcher.download_bytes(source_url) {
                Ok(bytes) => (
                    Cow::Owned(bytes),
                    None,
                    Cow::Owned(storage::filename_from_url(source_url, index)),
                ),
                Err(e) => {
                    if let Some(status) = e.status() {
                        debug!("{} answered HTTP {}", e.url, status);
                    }
                    return DownloadOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            },
            CandidateImage::Captured(img) => (
                Cow::Borrowed(img.bytes.as_slice()),
                Some(img.dimensions),
                Cow::Borrowed(img.filename.as_str()),
            ),
        };

    // Decoding is skipped entirely unless something needs the size.
    let dimensions = match declared {
        Some(dims) => dims,
        None if config.bounds.is_active() || config.verbose => probe_dimensions(&bytes),
        None => None,
    };

    if !config.bounds.passes(dimensions) {
        return DownloadOutcome::Filtered { dimensions };
    }

    let path = storage::unique_path(&config.output_dir, &filename);
    match storage::save_image(&path, &bytes) {
        Ok(()) => DownloadOutcome::Success {
            saved_path: path,
            dimensions,
        },
        Err(e) => DownloadOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

fn log_outcome(url: &str, outcome: &DownloadOutcome, config: &RunConfig) {
    let line = outcome_line(url, outcome, config);
    match outcome {
        DownloadOutcome::Failed { .. } => warn!("{}", line),
        _ => info!("{}", line),
    }
}

fn outcome_line(url: &str, outcome: &DownloadOutcome, config: &RunConfig) -> String {
    match outcome {
        DownloadOutcome::Success {
            saved_path,
            dimensions,
        } => {
            if config.verbose {
                match dimensions {
                    Some(dims) => format!("Success: {} -> {} ({})", url, saved_path.display(), dims),
                    None => format!("Success: {} -> {}", url, saved_path.display()),
                }
            } else {
                let name = saved_path
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                format!("Downloaded: {}", name)
            }
        }
        DownloadOutcome::Failed { reason } => format!("Failed to download: {} - {}", url, reason),
        DownloadOutcome::Filtered {
            dimensions: Some(dims),
        } => format!(
            "Filtered out: {} (size: {}, required: {})",
            url,
            dims,
            config.bounds.describe()
        ),
        DownloadOutcome::Filtered { dimensions: None } => {
            format!("Filtered out: {} (unable to determine size)", url)
        }
    }
}
