use std::time::Duration;

use serde::Deserialize;

use sdpwa::config::duration_ms;
use sdpwa::{AggregatorConfig, ContributionBounds, DpParameters, Event, WindowConfig};

/// Host-facing configuration. Keys may be snake_case or camelCase, durations
/// may be integer millis or strings with a unit suffix; unknown fields are
/// rejected at the boundary so host and core cannot drift silently.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireConfig {
    pub dp: WireDpParameters,
    pub bounds: WireBounds,
    pub window: WireWindow,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireDpParameters {
    #[serde(alias = "epsilonCount")]
    pub epsilon_count: f64,
    #[serde(alias = "epsilonSum")]
    pub epsilon_sum: f64,
    #[serde(alias = "deltaPerWindow")]
    pub delta_per_window: f64,
    #[serde(alias = "targetDelta")]
    pub target_delta: f64,
    #[serde(alias = "ledgerDeltaTolerance")]
    pub ledger_delta_tolerance: f64,
    #[serde(default, alias = "epsilonCap")]
    pub epsilon_cap: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireBounds {
    #[serde(alias = "maxContributionsPerWindow")]
    pub max_contributions_per_window: u32,
    #[serde(alias = "minValue")]
    pub min_value: f64,
    #[serde(alias = "maxValue")]
    pub max_value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireWindow {
    #[serde(with = "duration_ms", alias = "windowSize")]
    pub window_size: Duration,
    #[serde(with = "duration_ms", alias = "windowStride")]
    pub window_stride: Duration,
    #[serde(default, alias = "originMs")]
    pub origin_ms: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireEvent {
    pub identity: String,
    pub value: f64,
    #[serde(alias = "timestampMs")]
    pub timestamp_ms: i64,
}

impl From<WireConfig> for AggregatorConfig {
    fn from(wire: WireConfig) -> Self {
        AggregatorConfig {
            dp: DpParameters {
                epsilon_count: wire.dp.epsilon_count,
                epsilon_sum: wire.dp.epsilon_sum,
                delta_per_window: wire.dp.delta_per_window,
                target_delta: wire.dp.target_delta,
                ledger_delta_tolerance: wire.dp.ledger_delta_tolerance,
                epsilon_cap: wire.dp.epsilon_cap,
            },
            bounds: ContributionBounds {
                max_contributions_per_window: wire.bounds.max_contributions_per_window,
                min_value: wire.bounds.min_value,
                max_value: wire.bounds.max_value,
            },
            window: WindowConfig {
                window_size: wire.window.window_size,
                window_stride: wire.window.window_stride,
                origin_ms: wire.window.origin_ms,
            },
        }
    }
}

impl From<WireEvent> for Event {
    fn from(wire: WireEvent) -> Self {
        Event {
            identity: wire.identity,
            value: wire.value,
            timestamp_ms: wire.timestamp_ms,
        }
    }
}
