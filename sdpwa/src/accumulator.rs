use std::collections::BTreeMap;

use crate::model::WindowId;

/// Compensated (Kahan) summation so the accumulated rounding error stays
/// bounded regardless of ingest order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowTotals {
    count: u64,
    sum: KahanSum,
}

impl WindowTotals {
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum.value()
    }
}

/// Exact pre-noise totals per open window.
#[derive(Clone, Debug, Default)]
pub struct RawAccumulator {
    totals: BTreeMap<WindowId, WindowTotals>,
}

impl RawAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, window: WindowId, value: f64) {
        let totals = self.totals.entry(window).or_default();
        totals.count = totals.count.saturating_add(1);
        totals.sum.add(value);
    }

    pub fn get(&self, window: &WindowId) -> Option<&WindowTotals> {
        self.totals.get(window)
    }

    /// Removes and returns the totals; the caller retires the window in the
    /// same release step so removal stays atomic with the ledger append.
    pub fn take(&mut self, window: &WindowId) -> Option<WindowTotals> {
        self.totals.remove(window)
    }

    pub fn tracked_windows(&self) -> usize {
        self.totals.len()
    }
}
