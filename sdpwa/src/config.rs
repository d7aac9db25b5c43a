use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdpwaError};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DpParameters {
    pub epsilon_count: f64,
    pub epsilon_sum: f64,
    pub delta_per_window: f64,
    pub target_delta: f64,
    pub ledger_delta_tolerance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon_cap: Option<f64>,
}

impl DpParameters {
    fn validate(&self) -> Result<()> {
        if !(self.epsilon_count.is_finite() && self.epsilon_count > 0.0) {
            return Err(SdpwaError::InvalidConfig(
                "dp.epsilon_count must be finite and positive".into(),
            ));
        }
        if !(self.epsilon_sum.is_finite() && self.epsilon_sum > 0.0) {
            return Err(SdpwaError::InvalidConfig(
                "dp.epsilon_sum must be finite and positive".into(),
            ));
        }
        if !(self.delta_per_window.is_finite() && self.delta_per_window >= 0.0) {
            return Err(SdpwaError::InvalidConfig(
                "dp.delta_per_window must be finite and non-negative".into(),
            ));
        }
        if !(self.target_delta.is_finite() && self.target_delta >= 0.0) {
            return Err(SdpwaError::InvalidConfig(
                "dp.target_delta must be finite and non-negative".into(),
            ));
        }
        if !(self.ledger_delta_tolerance.is_finite() && self.ledger_delta_tolerance >= 0.0) {
            return Err(SdpwaError::InvalidConfig(
                "dp.ledger_delta_tolerance must be finite and non-negative".into(),
            ));
        }
        if let Some(cap) = self.epsilon_cap {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(SdpwaError::InvalidConfig(
                    "dp.epsilon_cap must be finite and positive when set".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContributionBounds {
    pub max_contributions_per_window: u32,
    pub min_value: f64,
    pub max_value: f64,
}

impl ContributionBounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_value, self.max_value)
    }

    pub fn max_abs_value(&self) -> f64 {
        self.min_value.abs().max(self.max_value.abs())
    }

    pub fn count_sensitivity(&self) -> f64 {
        f64::from(self.max_contributions_per_window)
    }

    pub fn sum_sensitivity(&self) -> f64 {
        self.count_sensitivity() * self.max_abs_value()
    }

    fn validate(&self) -> Result<()> {
        if self.max_contributions_per_window == 0 {
            return Err(SdpwaError::InvalidConfig(
                "bounds.max_contributions_per_window must be at least 1".into(),
            ));
        }
        if !self.min_value.is_finite() || !self.max_value.is_finite() {
            return Err(SdpwaError::InvalidConfig(
                "bounds.min_value and bounds.max_value must be finite".into(),
            ));
        }
        if self.min_value > self.max_value {
            return Err(SdpwaError::InvalidConfig(
                "bounds.min_value must not exceed bounds.max_value".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    #[serde(with = "duration_ms")]
    pub window_size: Duration,
    #[serde(with = "duration_ms")]
    pub window_stride: Duration,
    #[serde(default)]
    pub origin_ms: i64,
}

impl WindowConfig {
    pub fn size_ms(&self) -> i64 {
        self.window_size.as_millis() as i64
    }

    pub fn stride_ms(&self) -> i64 {
        self.window_stride.as_millis() as i64
    }

    pub fn is_tumbling(&self) -> bool {
        self.size_ms() == self.stride_ms()
    }

    fn validate(&self) -> Result<()> {
        if self.window_size.is_zero() {
            return Err(SdpwaError::InvalidConfig(
                "window.window_size must be positive".into(),
            ));
        }
        if self.window_stride.is_zero() {
            return Err(SdpwaError::InvalidConfig(
                "window.window_stride must be positive".into(),
            ));
        }
        if self.window_stride > self.window_size {
            return Err(SdpwaError::InvalidConfig(
                "window.window_stride must not exceed window.window_size".into(),
            ));
        }
        if self.origin_ms < 0 {
            return Err(SdpwaError::InvalidConfig(
                "window.origin_ms must be non-negative".into(),
            ));
        }
        if self.window_size.as_millis() > i64::MAX as u128 {
            return Err(SdpwaError::InvalidConfig(
                "window.window_size exceeds the representable range".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AggregatorConfig {
    pub dp: DpParameters,
    pub bounds: ContributionBounds,
    pub window: WindowConfig,
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<()> {
        self.dp.validate()?;
        self.bounds.validate()?;
        self.window.validate()
    }
}

/// Durations cross the host boundary either as integer milliseconds or as
/// humantime strings ("250ms", "1s"). The persisted form is integer millis.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Millis(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Millis(ms) => Ok(Duration::from_millis(ms)),
            Repr::Text(text) => humantime::parse_duration(&text).map_err(de::Error::custom),
        }
    }
}
