//! Sequential session runner: one subject per iteration, failures recorded
//! and never fatal, randomized backoff between iterations.

use rand::Rng;

use crate::config::BackoffPolicy;
use crate::error::ProbeError;
use crate::telemetry::{TelemetryCollection, TelemetryRecord};

/// Why an iteration did not complete. The record's `error` string carries the
/// full message; this is the coarse classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NavigationTimeout,
    ElementNotFound,
    PanelNeverVisible,
    InterstitialUnhandled,
    Skipped,
}

impl FailureReason {
    pub fn label(self) -> &'static str {
        match self {
            FailureReason::NavigationTimeout => "navigation-timeout",
            FailureReason::ElementNotFound => "required-element-not-found",
            FailureReason::PanelNeverVisible => "panel-never-visible",
            FailureReason::InterstitialUnhandled => "interstitial-unhandled",
            FailureReason::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&ProbeError> for FailureReason {
    fn from(error: &ProbeError) -> Self {
        match error {
            ProbeError::NavigationTimeout(_) | ProbeError::NavigationFailed(_) => {
                FailureReason::NavigationTimeout
            }
            ProbeError::PanelNeverVisible(_) => FailureReason::PanelNeverVisible,
            ProbeError::InterstitialUnhandled(_) => FailureReason::InterstitialUnhandled,
            ProbeError::Skipped(_) => FailureReason::Skipped,
            _ => FailureReason::ElementNotFound,
        }
    }
}

/// Tagged result of one iteration. A failed iteration still carries whatever
/// partial record it built up.
#[derive(Debug, Clone)]
pub enum IterationOutcome {
    Completed(TelemetryRecord),
    Failed {
        reason: FailureReason,
        partial: TelemetryRecord,
    },
}

impl IterationOutcome {
    /// Finalize into (record, failed?). A failed record is guaranteed to have
    /// its `error` field set.
    pub fn finalize(self) -> (TelemetryRecord, bool) {
        match self {
            IterationOutcome::Completed(record) => (record, false),
            IterationOutcome::Failed {
                reason,
                mut partial,
            } => {
                if partial.error.is_none() {
                    partial.error = Some(reason.label().to_string());
                }
                (partial, true)
            }
        }
    }
}

/// One monitored subject per call. Site drivers and test fakes implement
/// this; the runner never sees a site-specific type.
#[allow(async_fn_in_trait)]
pub trait SubjectDriver {
    async fn run_iteration(&mut self, iteration: usize) -> IterationOutcome;
}

/// Drive `iterations` subjects sequentially. Every iteration appends exactly
/// one finalized record; failures only lengthen the backoff before the next
/// subject.
pub async fn run_session<D, R>(
    driver: &mut D,
    iterations: usize,
    backoff: &BackoffPolicy,
    rng: &mut R,
) -> TelemetryCollection
where
    D: SubjectDriver,
    R: Rng,
{
    let mut collection = TelemetryCollection::new();

    for iteration in 1..=iterations {
        log::info!("--- subject {}/{} ---", iteration, iterations);

        let outcome = driver.run_iteration(iteration).await;
        let (record, failed) = outcome.finalize();

        if failed {
            log::warn!(
                "iteration {} failed: {}",
                iteration,
                record.error.as_deref().unwrap_or("unknown")
            );
        } else {
            log::info!(
                "iteration {} collected {} samples",
                iteration,
                record.samples.len()
            );
        }

        collection.push(record);

        if iteration < iterations {
            let delay = backoff.delay(rng, failed);
            log::debug!("backing off for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    collection
}
