use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub identity: String,
    pub value: f64,
    pub timestamp_ms: i64,
}

impl Event {
    pub fn new(identity: impl Into<String>, value: f64, timestamp_ms: i64) -> Self {
        Self {
            identity: identity.into(),
            value,
            timestamp_ms,
        }
    }
}

/// Window coordinates. All windows share one size, so ordering by start is
/// ordering by end; sealed windows drain in this order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId {
    pub window_start_ms: i64,
    pub window_end_ms: i64,
}

impl WindowId {
    pub fn new(window_start_ms: i64, window_end_ms: i64) -> Self {
        Self {
            window_start_ms,
            window_end_ms,
        }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.window_start_ms <= timestamp_ms && timestamp_ms < self.window_end_ms
    }
}

/// Per-window outcome of a single ingest. An event covering several sliding
/// windows can be admitted to some and capped in others.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Admission {
    pub admitted: Vec<WindowId>,
    pub capped: Vec<WindowId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrivacyLoss {
    pub per_release_epsilons: Vec<f64>,
    pub release_delta: f64,
    pub cumulative_epsilon: f64,
    pub cumulative_delta: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReleaseSnapshot {
    pub window_start_ms: i64,
    pub window_end_ms: i64,
    pub noisy_count: f64,
    pub noisy_sum: f64,
    pub raw_count: u64,
    pub raw_sum: f64,
    pub privacy: PrivacyLoss,
}
