use std::fmt;
use std::path::PathBuf;

use crate::dimensions::Dimensions;

/// Terminal classification of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success {
        saved_path: PathBuf,
        dimensions: Option<Dimensions>,
    },
    Failed {
        reason: String,
    },
    /// Rejected by the size bounds; `None` when the size could not be determined.
    Filtered {
        dimensions: Option<Dimensions>,
    },
}

/// What the orchestrator reports for each candidate as it finishes.
#[derive(Debug, Clone)]
pub struct ItemReport {
    /// 1-based position in the candidate list.
    pub index: usize,
    pub total: usize,
    pub source_url: String,
    pub outcome: DownloadOutcome,
}

/// Counts for one completed run.
///
/// Built only through [`RunSummary::tally`], so
/// `success + failed + filtered == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    success_count: usize,
    failed_count: usize,
    filtered_count: usize,
    total_count: usize,
}

impl RunSummary {
    pub fn tally<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a DownloadOutcome>,
    {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                DownloadOutcome::Success { .. } => summary.success_count += 1,
                DownloadOutcome::Failed { .. } => summary.failed_count += 1,
                DownloadOutcome::Filtered { .. } => summary.filtered_count += 1,
            }
            summary.total_count += 1;
        }
        summary
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered_count
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Download complete: {} succeeded, {} failed, {} filtered",
            self.success_count, self.failed_count, self.filtered_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_each_variant() {
        let outcomes = vec![
            DownloadOutcome::Success {
                saved_path: PathBuf::from("a.jpg"),
                dimensions: None,
            },
            DownloadOutcome::Failed {
                reason: "HTTP 404".into(),
            },
            DownloadOutcome::Filtered {
                dimensions: Some(Dimensions::new(10, 10)),
            },
            DownloadOutcome::Filtered { dimensions: None },
        ];

        let summary = RunSummary::tally(&outcomes);
        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.filtered_count(), 2);
        assert_eq!(summary.total_count(), 4);
        assert_eq!(
            summary.to_string(),
            "Download complete: 1 succeeded, 1 failed, 2 filtered"
        );
    }

    #[test]
    fn empty_tally_is_all_zero() {
        let summary = RunSummary::tally(&Vec::<DownloadOutcome>::new());
        assert_eq!(summary, RunSummary::default());
        assert_eq!(summary.total_count(), 0);
    }
}
