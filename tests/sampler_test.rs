//! Timing and termination properties of the sampling loop, run at
//! millisecond intervals so the suite stays fast.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use vidprobe::{collect_samples, NoHook, SamplePlan, StatsSource, StatsValue, TickHook};

struct SteadySource;

impl StatsSource for SteadySource {
    async fn read_stats(&mut self) -> Option<StatsValue> {
        let mut fields = BTreeMap::new();
        fields.insert("Buffer Health".to_string(), "3.00 s".to_string());
        Some(StatsValue::Fields(fields))
    }
}

struct NeverSource;

impl StatsSource for NeverSource {
    async fn read_stats(&mut self) -> Option<StatsValue> {
        None
    }
}

struct SlowHook {
    delay: Duration,
}

impl TickHook for SlowHook {
    async fn before_sample(&mut self, _tick: u32) {
        tokio::time::sleep(self.delay).await;
    }
}

fn assert_monotone(samples: &[vidprobe::Sample]) {
    for pair in samples.windows(2) {
        assert!(
            pair[1].timestamp >= pair[0].timestamp,
            "timestamps went backwards: {} then {}",
            pair[0].timestamp,
            pair[1].timestamp
        );
    }
}

#[tokio::test]
async fn count_plan_yields_exactly_that_many_samples() {
    let plan = SamplePlan::count(5).with_interval(Duration::from_millis(20));
    let samples = collect_samples(&mut SteadySource, &mut NoHook, &plan).await;

    assert_eq!(samples.len(), 5);
    assert_monotone(&samples);
    assert!(samples[0].timestamp > 0.0);
}

#[tokio::test]
async fn duration_plan_stays_within_one_interval_of_its_budget() {
    let interval = Duration::from_millis(50);
    let budget = Duration::from_millis(300);
    let plan = SamplePlan::duration(budget).with_interval(interval);

    let started = Instant::now();
    let samples = collect_samples(&mut SteadySource, &mut NoHook, &plan).await;
    let span = started.elapsed();

    assert!(!samples.is_empty());
    assert_monotone(&samples);

    // The loop must reach the budget and stop within one interval past it
    // (plus scheduler slack).
    let last = samples.last().unwrap().timestamp;
    assert!(last >= budget.as_secs_f64(), "stopped early at {}s", last);
    assert!(
        span <= budget + interval + Duration::from_millis(50),
        "overshot the budget: ran {:?}",
        span
    );
}

#[tokio::test]
async fn duration_plan_samples_roughly_once_per_interval() {
    let plan = SamplePlan::duration(Duration::from_millis(250))
        .with_interval(Duration::from_millis(50));
    let samples = collect_samples(&mut SteadySource, &mut NoHook, &plan).await;

    // ~5 ticks; allow one tick of scheduler jitter either way.
    assert!(
        (4..=6).contains(&samples.len()),
        "expected about 5 samples, got {}",
        samples.len()
    );
}

#[tokio::test]
async fn unreadable_panel_yields_unavailable_markers_not_failures() {
    let plan = SamplePlan::count(3).with_interval(Duration::from_millis(10));
    let samples = collect_samples(&mut NeverSource, &mut NoHook, &plan).await;

    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s.stats.is_unavailable()));
}

#[tokio::test]
async fn slow_hook_does_not_change_the_sample_count() {
    let interval = Duration::from_millis(20);
    let plan = SamplePlan::count(4).with_interval(interval);
    let mut hook = SlowHook {
        delay: interval * 2,
    };

    let samples = collect_samples(&mut SteadySource, &mut hook, &plan).await;

    // The hook eats the whole interval budget; the loop samples immediately
    // instead of sleeping a negative amount.
    assert_eq!(samples.len(), 4);
    assert_monotone(&samples);
}

#[tokio::test]
async fn slow_hook_cannot_push_a_duration_plan_far_past_its_budget() {
    let interval = Duration::from_millis(20);
    let budget = Duration::from_millis(100);
    let plan = SamplePlan::duration(budget).with_interval(interval);
    let mut hook = SlowHook {
        delay: Duration::from_millis(45),
    };

    let started = Instant::now();
    let samples = collect_samples(&mut SteadySource, &mut hook, &plan).await;
    let span = started.elapsed();

    assert!(!samples.is_empty());
    // One in-flight tick (hook + sample) may straddle the deadline, but the
    // loop must not start a fresh tick after it.
    assert!(
        span <= budget + Duration::from_millis(45) + interval + Duration::from_millis(50),
        "ran {:?} against a {:?} budget",
        span,
        budget
    );
}
