//! Fixed-cadence sampling loop over a live stats panel.
//!
//! The loop is generic over where the stats come from (`StatsSource`) and
//! what, if anything, happens before each tick (`TickHook`), so the same
//! loop drives both site flows and the in-process tests.

use std::time::{Duration, Instant};

use crate::telemetry::{Sample, StatsValue};

/// How long the loop runs: a fixed number of samples or a wall-clock budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleBudget {
    Count(u32),
    Duration(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePlan {
    pub budget: SampleBudget,
    pub interval: Duration,
}

impl SamplePlan {
    /// Collect exactly `n` samples, one per second.
    pub fn count(n: u32) -> Self {
        Self {
            budget: SampleBudget::Count(n),
            interval: Duration::from_secs(1),
        }
    }

    /// Sample once per second until `budget` has elapsed.
    pub fn duration(budget: Duration) -> Self {
        Self {
            budget: SampleBudget::Duration(budget),
            interval: Duration::from_secs(1),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// A readable stats panel. `None` means the panel had nothing readable on
/// this tick; the loop records the unavailable marker and keeps going.
#[allow(async_fn_in_trait)]
pub trait StatsSource {
    async fn read_stats(&mut self) -> Option<StatsValue>;
}

/// Side action executed before a tick's sample is taken. Time spent here is
/// charged against the tick's interval.
#[allow(async_fn_in_trait)]
pub trait TickHook {
    async fn before_sample(&mut self, tick: u32);
}

/// Hook that does nothing.
pub struct NoHook;

impl TickHook for NoHook {
    async fn before_sample(&mut self, _tick: u32) {}
}

/// Run the sampling loop to completion and return the chronological samples.
///
/// Per tick: run the hook, sleep whatever is left of the interval (never a
/// negative sleep; for a duration budget the sleep is clamped so the loop
/// cannot overshoot the total), then take one sample stamped with elapsed
/// seconds. A `Count(n)` plan yields exactly `n` samples; a `Duration(d)`
/// plan stops on the first sample at or past `d`.
pub async fn collect_samples<S, H>(source: &mut S, hook: &mut H, plan: &SamplePlan) -> Vec<Sample>
where
    S: StatsSource,
    H: TickHook,
{
    match plan.budget {
        SampleBudget::Count(0) => return Vec::new(),
        SampleBudget::Duration(d) if d.is_zero() => return Vec::new(),
        _ => {}
    }

    let start = Instant::now();
    let mut samples = Vec::new();
    let mut tick: u32 = 0;

    loop {
        tick += 1;
        let tick_start = Instant::now();

        hook.before_sample(tick).await;

        let spent = tick_start.elapsed();
        let mut sleep_for = plan.interval.saturating_sub(spent);
        if let SampleBudget::Duration(total) = plan.budget {
            sleep_for = sleep_for.min(total.saturating_sub(start.elapsed()));
        }
        if !sleep_for.is_zero() {
            tokio::time::sleep(sleep_for).await;
        }

        let stats = match source.read_stats().await {
            Some(stats) => stats,
            None => {
                log::debug!("stats unavailable on tick {}", tick);
                StatsValue::unavailable()
            }
        };
        samples.push(Sample {
            timestamp: start.elapsed().as_secs_f64(),
            stats,
        });

        match plan.budget {
            SampleBudget::Count(n) => {
                if samples.len() >= n as usize {
                    break;
                }
            }
            SampleBudget::Duration(total) => {
                if start.elapsed() >= total {
                    break;
                }
            }
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedSource(Vec<Option<StatsValue>>);

    impl StatsSource for CannedSource {
        async fn read_stats(&mut self) -> Option<StatsValue> {
            if self.0.is_empty() {
                None
            } else {
                self.0.remove(0)
            }
        }
    }

    #[tokio::test]
    async fn zero_count_yields_no_samples() {
        let mut source = CannedSource(vec![]);
        let plan = SamplePlan::count(0).with_interval(Duration::from_millis(5));
        let samples = collect_samples(&mut source, &mut NoHook, &plan).await;
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn missing_reads_become_unavailable_markers() {
        let mut source = CannedSource(vec![Some(StatsValue::Text("ok".into())), None]);
        let plan = SamplePlan::count(2).with_interval(Duration::from_millis(5));
        let samples = collect_samples(&mut source, &mut NoHook, &plan).await;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].stats, StatsValue::Text("ok".into()));
        assert!(samples[1].stats.is_unavailable());
    }
}
