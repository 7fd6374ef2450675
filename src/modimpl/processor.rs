use std::time::Duration;
use async_trait::async_trait;
use log::{error, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, interval_at, sleep, Instant, MissedTickBehavior};

use crate::modimpl::error::ProcessingTickError;
use crate::modimpl::healthstatus::{FailureKind, HealthTracker};

pub const SUCCESS_LOG_EVERY: u64 = 50;
pub const INVALID_LOG_EVERY: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub tick_every: Duration,
    pub summary_every: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick_every: Duration::from_millis(60_000),
            summary_every: Duration::from_millis(600_000),
        }
    }
}

/// One unit of work per tick, yielding the raw value to classify.
#[async_trait]
pub trait Workload: Send {
    async fn produce(&mut self) -> Result<f64, ProcessingTickError>;
}

/// Stand-in for I/O bound work: waits 50..200 ms, then draws a value in 0..100.
#[derive(Debug)]
pub struct SyntheticWorkload {
    rng: StdRng,
}

impl SyntheticWorkload {
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

#[async_trait]
impl Workload for SyntheticWorkload {
    async fn produce(&mut self) -> Result<f64, ProcessingTickError> {
        let delay = self.rng.gen_range(50..200);
        sleep(Duration::from_millis(delay)).await;
        Ok(self.rng.gen_range(0.0..100.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Processed,
    Invalid,
    Failed,
}

/// Doubles the value; only results above 50 count as processed.
pub fn classify(value: f64) -> (f64, bool) {
    let doubled = value * 2.0;
    (doubled, doubled > 50.0)
}

pub struct Processor<W> {
    workload: W,
    health: HealthTracker,
}

impl<W: Workload> Processor<W> {
    pub fn new(workload: W, health: HealthTracker) -> Self {
        Self { workload, health }
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let value = match self.workload.produce().await {
            Ok(value) => value,
            Err(e) => {
                self.health.record_failure(FailureKind::Fatal).await;
                error!("🗷  Processing tick failed: {}", e);
                return TickOutcome::Failed;
            }
        };

        let (doubled, valid) = classify(value);
        if valid {
            let health = self.health.record_success().await;
            if health.processed_count % SUCCESS_LOG_EVERY == 0 {
                info!("🗹  Processed {} items (latest result {:.2})", health.processed_count, doubled);
            }
            TickOutcome::Processed
        } else {
            let health = self.health.record_failure(FailureKind::Invalid).await;
            if health.error_count % INVALID_LOG_EVERY == 0 {
                warn!("⚠️  {} errors so far (latest result {:.2} below threshold)", health.error_count, doubled);
            }
            trace!("Discarded value {:.2}", value);
            TickOutcome::Invalid
        }
    }

    /// Ticks right away, then once per `every`, for as long as the task lives.
    ///
    /// Ticks run one after another, so a slow tick delays the next one and any
    /// interval boundaries it overran are skipped rather than replayed.
    pub async fn run(mut self, every: Duration) {
        let mut interval = interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}

/// Logs the health snapshot once per `every`, starting one period from now.
pub async fn report_health(health: HealthTracker, every: Duration) {
    let mut interval = interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let snapshot = health.snapshot().await;
        info!(
            "💓 Health check - Status: {:?}, Processed: {}, Errors: {}, Last processed: {}",
            snapshot.status,
            snapshot.processed_count,
            snapshot.error_count,
            snapshot
                .last_processed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modimpl::healthstatus::HealthState;
    use std::collections::VecDeque;

    struct ScriptedWorkload {
        values: VecDeque<Result<f64, ProcessingTickError>>,
    }

    impl ScriptedWorkload {
        fn new(values: Vec<Result<f64, ProcessingTickError>>) -> Self {
            Self { values: values.into() }
        }
    }

    #[async_trait]
    impl Workload for ScriptedWorkload {
        async fn produce(&mut self) -> Result<f64, ProcessingTickError> {
            self.values.pop_front().unwrap_or(Ok(40.0))
        }
    }

    #[test]
    fn test_classify_threshold() {
        assert_eq!(classify(40.0), (80.0, true));
        assert_eq!(classify(25.0), (50.0, false));
        assert_eq!(classify(25.5), (51.0, true));
        assert_eq!(classify(0.0), (0.0, false));
    }

    #[tokio::test]
    async fn test_valid_tick_counts_as_processed() {
        let health = HealthTracker::new();
        let mut processor = Processor::new(ScriptedWorkload::new(vec![Ok(30.0)]), health.clone());

        assert_eq!(processor.tick().await, TickOutcome::Processed);
        let snapshot = health.snapshot().await;
        assert_eq!(snapshot.processed_count, 1);
        assert_eq!(snapshot.error_count, 0);
        assert!(snapshot.last_processed_at.is_some());
        assert_eq!(snapshot.status, HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_invalid_tick_keeps_service_healthy() {
        let health = HealthTracker::new();
        let mut processor = Processor::new(ScriptedWorkload::new(vec![Ok(10.0)]), health.clone());

        assert_eq!(processor.tick().await, TickOutcome::Invalid);
        let snapshot = health.snapshot().await;
        assert_eq!(snapshot.processed_count, 0);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.status, HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_discarded_values_log_below_the_http_tier() {
        use crate::modimpl::config::Environment;
        use crate::modimpl::logger::{capture, env_filter};

        let health = HealthTracker::new();
        let mut processor = Processor::new(ScriptedWorkload::new(vec![Ok(10.0), Ok(12.0)]), health.clone());

        let (http_tier, guard) = capture::scoped(env_filter(Environment::Production, Some("debug")));
        processor.tick().await;
        drop(guard);
        assert!(!http_tier.text().contains("Discarded value"));

        let (debug_tier, _guard) = capture::scoped(env_filter(Environment::Production, Some("trace")));
        processor.tick().await;
        let output = debug_tier.text();
        assert!(output.contains("TRACE"));
        assert!(output.contains("Discarded value 12.00"));
    }

    #[tokio::test]
    async fn test_error_warning_counts_fatal_and_invalid_failures() {
        use crate::modimpl::config::Environment;
        use crate::modimpl::logger::{capture, env_filter};

        let mut script: Vec<Result<f64, ProcessingTickError>> =
            (0..19).map(|n| Err(ProcessingTickError::Work(format!("failure {}", n)))).collect();
        script.push(Ok(5.0));
        let health = HealthTracker::new();
        let mut processor = Processor::new(ScriptedWorkload::new(script), health.clone());

        let (output, _guard) = capture::scoped(env_filter(Environment::Production, None));
        for _ in 0..19 {
            processor.tick().await;
        }
        assert!(!output.text().contains("errors so far"));

        assert_eq!(processor.tick().await, TickOutcome::Invalid);
        assert_eq!(health.snapshot().await.error_count, 20);
        assert_eq!(output.text().matches("20 errors so far").count(), 1);
    }

    #[tokio::test]
    async fn test_failed_tick_marks_unhealthy_and_loop_recovers() {
        let health = HealthTracker::new();
        let script = vec![Err(ProcessingTickError::Work("disk gone".to_string())), Ok(99.0)];
        let mut processor = Processor::new(ScriptedWorkload::new(script), health.clone());

        assert_eq!(processor.tick().await, TickOutcome::Failed);
        let snapshot = health.snapshot().await;
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.status, HealthState::Unhealthy);

        assert_eq!(processor.tick().await, TickOutcome::Processed);
        assert_eq!(health.snapshot().await.status, HealthState::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_workload_stays_in_range() {
        let mut workload = SyntheticWorkload::seeded(7);
        for _ in 0..100 {
            let started = Instant::now();
            let value = workload.produce().await.unwrap();
            let waited = started.elapsed();

            assert!((0.0..100.0).contains(&value));
            assert!(waited >= Duration::from_millis(50) && waited <= Duration::from_millis(200));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_ticks_update_exactly_one_counter() {
        let health = HealthTracker::new();
        let mut processor = Processor::new(SyntheticWorkload::seeded(42), health.clone());

        for n in 1..=30u64 {
            processor.tick().await;
            let snapshot = health.snapshot().await;
            assert_eq!(snapshot.processed_count + snapshot.error_count, n);
            assert_eq!(snapshot.status, HealthState::Healthy);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_immediately_then_on_interval() {
        let health = HealthTracker::new();
        let processor = Processor::new(ScriptedWorkload::new(vec![]), health.clone());
        let task = tokio::spawn(processor.run(Duration::from_secs(60)));

        sleep(Duration::from_millis(10)).await;
        assert_eq!(health.snapshot().await.processed_count, 1);

        sleep(Duration::from_secs(125)).await;
        assert_eq!(health.snapshot().await.processed_count, 3);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_report_only_reads_state() {
        let health = HealthTracker::new();
        health.record_success().await;
        let before = health.snapshot().await;

        let task = tokio::spawn(report_health(health.clone(), Duration::from_secs(600)));
        sleep(Duration::from_secs(1_300)).await;
        task.abort();

        assert_eq!(health.snapshot().await, before);
    }
}
