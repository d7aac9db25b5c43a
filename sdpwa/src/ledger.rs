use serde::{Deserialize, Serialize};

use crate::error::{Result, SdpwaError};
use crate::model::PrivacyLoss;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub window_start_ms: i64,
    pub window_end_ms: i64,
    pub epsilons: Vec<f64>,
    pub delta: f64,
}

/// By-value form handed to auditors; serializes to the stable snake_case
/// wire shape.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrivacyLedgerSnapshot {
    pub target_delta: f64,
    pub entries: Vec<LedgerEntry>,
    pub cumulative_epsilon: f64,
}

/// Composition rule shared by ledger and auditor. With `k` entries the bound
/// homogenizes at `eps_max`, applies advanced composition against the overall
/// delta budget, and floors the result with basic summation. A zero
/// `target_delta` makes the advanced term undefined, so accounting falls back
/// to basic composition.
pub fn compose_epsilon(entries: &[LedgerEntry], target_delta: f64) -> f64 {
    let mut basic = 0.0f64;
    let mut eps_max = 0.0f64;
    for entry in entries {
        for &epsilon in &entry.epsilons {
            basic += epsilon;
            eps_max = eps_max.max(epsilon);
        }
    }
    if entries.is_empty() {
        return 0.0;
    }
    if target_delta <= 0.0 {
        return basic;
    }
    let k = entries.len() as f64;
    let log_term = (1.0 / target_delta).ln();
    let advanced = eps_max * (2.0 * k * log_term).sqrt() + k * eps_max * (eps_max.exp() - 1.0);
    basic.min(advanced)
}

/// Append-only record of per-release privacy loss. Entries arrive in window
/// end order and are immutable once recorded.
#[derive(Clone, Debug)]
pub struct PrivacyLedger {
    target_delta: f64,
    delta_tolerance: f64,
    epsilon_cap: Option<f64>,
    entries: Vec<LedgerEntry>,
    cumulative_epsilon: f64,
}

impl PrivacyLedger {
    pub fn new(target_delta: f64, delta_tolerance: f64, epsilon_cap: Option<f64>) -> Self {
        Self {
            target_delta,
            delta_tolerance,
            epsilon_cap,
            entries: Vec::new(),
            cumulative_epsilon: 0.0,
        }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn cumulative_epsilon(&self) -> f64 {
        self.cumulative_epsilon
    }

    pub fn cumulative_delta(&self) -> f64 {
        self.entries.iter().map(|entry| entry.delta).sum()
    }

    pub fn delta_bound(&self) -> f64 {
        self.target_delta * (1.0 + self.delta_tolerance)
    }

    /// Admits or rejects a batch of prospective entries without recording
    /// anything. A rejection leaves the ledger byte-identical, so a failed
    /// release can be retried after the budget is widened.
    pub fn check_budget(&self, pending: &[LedgerEntry]) -> Result<()> {
        let pending_delta: f64 = pending.iter().map(|entry| entry.delta).sum();
        let required = self.cumulative_delta() + pending_delta;
        if required > self.delta_bound() {
            return Err(SdpwaError::BudgetExhausted(format!(
                "cumulative delta {required:e} would exceed bound {:e}",
                self.delta_bound()
            )));
        }
        if let Some(cap) = self.epsilon_cap {
            let mut prospective = self.entries.clone();
            prospective.extend_from_slice(pending);
            let epsilon = compose_epsilon(&prospective, self.target_delta);
            if epsilon > cap {
                return Err(SdpwaError::BudgetExhausted(format!(
                    "cumulative epsilon {epsilon} would exceed cap {cap}"
                )));
            }
        }
        Ok(())
    }

    pub fn record(&mut self, entry: LedgerEntry) -> PrivacyLoss {
        let per_release_epsilons = entry.epsilons.clone();
        let release_delta = entry.delta;
        self.entries.push(entry);
        self.cumulative_epsilon = compose_epsilon(&self.entries, self.target_delta);
        PrivacyLoss {
            per_release_epsilons,
            release_delta,
            cumulative_epsilon: self.cumulative_epsilon,
            cumulative_delta: self.cumulative_delta(),
        }
    }

    /// Raises the overall delta budget so sealed windows can drain after a
    /// `BudgetExhausted` release. The budget never shrinks below what has
    /// already been consumed.
    pub fn widen_target_delta(&mut self, new_target: f64) -> Result<()> {
        if !new_target.is_finite() || new_target < 0.0 {
            return Err(SdpwaError::InvalidConfig(
                "target_delta must be finite and non-negative".into(),
            ));
        }
        if new_target < self.cumulative_delta() {
            return Err(SdpwaError::InvalidConfig(
                "target_delta must not drop below the delta already consumed".into(),
            ));
        }
        self.target_delta = new_target;
        self.cumulative_epsilon = compose_epsilon(&self.entries, self.target_delta);
        Ok(())
    }

    pub fn snapshot(&self) -> PrivacyLedgerSnapshot {
        PrivacyLedgerSnapshot {
            target_delta: self.target_delta,
            entries: self.entries.clone(),
            cumulative_epsilon: self.cumulative_epsilon,
        }
    }
}
