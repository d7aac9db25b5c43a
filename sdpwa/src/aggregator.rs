use tracing::{debug, warn};

use crate::accumulator::RawAccumulator;
use crate::bounder::ContributionBounder;
use crate::config::AggregatorConfig;
use crate::error::{Result, SdpwaError};
use crate::ledger::{LedgerEntry, PrivacyLedger, PrivacyLedgerSnapshot};
use crate::model::{Admission, Event, PrivacyLoss, ReleaseSnapshot, WindowId};
use crate::noise::{Metric, NoiseEngine};
use crate::window::WindowManager;

/// Single-owner streaming aggregator. One logical caller drives `ingest` and
/// `release`; the observable release sequence is a function of the config,
/// the seed, the ordered events, and the `up_to_ms` sequence alone.
pub struct Aggregator {
    config: AggregatorConfig,
    windows: WindowManager,
    bounder: ContributionBounder,
    accumulator: RawAccumulator,
    noise: NoiseEngine,
    ledger: PrivacyLedger,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig, seed: &[u8]) -> Result<Self> {
        config.validate()?;
        let noise = NoiseEngine::new(seed)?;
        let windows = WindowManager::new(&config.window);
        let bounder = ContributionBounder::new(config.bounds.clone());
        let ledger = PrivacyLedger::new(
            config.dp.target_delta,
            config.dp.ledger_delta_tolerance,
            config.dp.epsilon_cap,
        );
        Ok(Self {
            config,
            windows,
            bounder,
            accumulator: RawAccumulator::new(),
            noise,
            ledger,
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Admits the event into every covering window that still has room for
    /// this identity. Per-event failures leave the aggregator untouched.
    pub fn ingest(&mut self, event: Event) -> Result<Admission> {
        if !(event.value == 0.0 || event.value.is_normal()) {
            return Err(SdpwaError::InvalidEvent(
                "value must be zero or a normal finite number".into(),
            ));
        }
        if event.timestamp_ms < 0 {
            return Err(SdpwaError::InvalidEvent("timestamp is negative".into()));
        }
        if event.timestamp_ms < self.config.window.origin_ms {
            return Err(SdpwaError::InvalidEvent(
                "timestamp precedes the window origin".into(),
            ));
        }
        let candidates = self.windows.admissible_windows(event.timestamp_ms);
        if candidates.is_empty() {
            return Err(SdpwaError::LateEvent {
                timestamp_ms: event.timestamp_ms,
                watermark_ms: self.windows.watermark_ms(),
            });
        }
        let mut admission = Admission::default();
        for window in candidates {
            match self.bounder.admit(window, &event.identity, event.value) {
                Some(clamped) => {
                    self.windows.observe(window);
                    self.accumulator.record(window, clamped);
                    admission.admitted.push(window);
                }
                None => admission.capped.push(window),
            }
        }
        if admission.admitted.is_empty() {
            return Err(SdpwaError::ContributionCapped);
        }
        Ok(admission)
    }

    /// Seals every open window ending at or before `up_to_ms`, then noises,
    /// ledgers, and emits them in window end order. The budget check covers
    /// the whole batch up front: a failure releases nothing and keeps every
    /// sealed window drainable.
    pub fn release(&mut self, up_to_ms: i64) -> Result<Vec<ReleaseSnapshot>> {
        let sealed = self.windows.seal_up_to(up_to_ms);
        if sealed.is_empty() {
            return Ok(Vec::new());
        }
        let pending: Vec<LedgerEntry> = sealed
            .iter()
            .map(|window| LedgerEntry {
                window_start_ms: window.window_start_ms,
                window_end_ms: window.window_end_ms,
                epsilons: vec![self.config.dp.epsilon_count, self.config.dp.epsilon_sum],
                delta: self.config.dp.delta_per_window,
            })
            .collect();
        if let Err(err) = self.ledger.check_budget(&pending) {
            warn!(
                sealed_windows = sealed.len(),
                up_to_ms, "release blocked by privacy budget"
            );
            return Err(err);
        }
        let count_scale = self.config.bounds.count_sensitivity() / self.config.dp.epsilon_count;
        let sum_scale = self.config.bounds.sum_sensitivity() / self.config.dp.epsilon_sum;
        let mut snapshots = Vec::with_capacity(sealed.len());
        for (window, entry) in sealed.into_iter().zip(pending) {
            let snapshot = self.release_window(window, entry, count_scale, sum_scale)?;
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }

    fn release_window(
        &mut self,
        window: WindowId,
        entry: LedgerEntry,
        count_scale: f64,
        sum_scale: f64,
    ) -> Result<ReleaseSnapshot> {
        let totals = self.accumulator.take(&window).ok_or_else(|| {
            SdpwaError::InternalInvariant(format!(
                "open window [{}, {}) has no accumulator state",
                window.window_start_ms, window.window_end_ms
            ))
        })?;
        let raw_count = totals.count();
        let raw_sum = totals.sum();
        let noisy_count = raw_count as f64
            + self
                .noise
                .laplace(count_scale, window.window_start_ms, Metric::Count);
        let noisy_sum = raw_sum
            + self
                .noise
                .laplace(sum_scale, window.window_start_ms, Metric::Sum);
        let privacy: PrivacyLoss = self.ledger.record(entry);
        self.bounder.retire(&window);
        self.windows.retire(&window);
        debug!(
            window_start_ms = window.window_start_ms,
            window_end_ms = window.window_end_ms,
            raw_count,
            cumulative_epsilon = privacy.cumulative_epsilon,
            "released window"
        );
        Ok(ReleaseSnapshot {
            window_start_ms: window.window_start_ms,
            window_end_ms: window.window_end_ms,
            noisy_count,
            noisy_sum,
            raw_count,
            raw_sum,
            privacy,
        })
    }

    pub fn ledger(&self) -> PrivacyLedgerSnapshot {
        self.ledger.snapshot()
    }

    /// Raises the overall delta budget so releases blocked by
    /// `BudgetExhausted` can drain.
    pub fn widen_target_delta(&mut self, new_target: f64) -> Result<()> {
        self.ledger.widen_target_delta(new_target)
    }

    pub fn open_window_count(&self) -> usize {
        self.windows.open_count()
    }
}
