use serde::{Deserialize, Serialize};

use crate::ledger::{compose_epsilon, PrivacyLedgerSnapshot};

pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditCheck {
    CumulativeEpsilon,
    DeltaBudget,
    EntryOrder,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuditFinding {
    pub check: AuditCheck,
    pub expected: f64,
    pub observed: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum AuditOutcome {
    Verified,
    Mismatch(Vec<AuditFinding>),
}

impl AuditOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, AuditOutcome::Verified)
    }
}

/// Read-only companion that re-verifies a ledger snapshot: it recomputes the
/// cumulative epsilon with the ledger's own composition rule, re-checks the
/// delta budget, and confirms entries are ordered by window end.
#[derive(Clone, Debug)]
pub struct Auditor {
    delta_tolerance: f64,
    relative_tolerance: f64,
}

impl Auditor {
    pub fn new(delta_tolerance: f64) -> Self {
        Self {
            delta_tolerance,
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
        }
    }

    pub fn with_relative_tolerance(mut self, relative_tolerance: f64) -> Self {
        self.relative_tolerance = relative_tolerance;
        self
    }

    pub fn audit(&self, snapshot: &PrivacyLedgerSnapshot) -> AuditOutcome {
        let mut findings = Vec::new();

        let recomputed = compose_epsilon(&snapshot.entries, snapshot.target_delta);
        let tolerance = self.relative_tolerance * recomputed.abs().max(1.0);
        if (snapshot.cumulative_epsilon - recomputed).abs() > tolerance {
            findings.push(AuditFinding {
                check: AuditCheck::CumulativeEpsilon,
                expected: recomputed,
                observed: snapshot.cumulative_epsilon,
            });
        }

        let consumed: f64 = snapshot.entries.iter().map(|entry| entry.delta).sum();
        let bound = snapshot.target_delta * (1.0 + self.delta_tolerance);
        if consumed > bound {
            findings.push(AuditFinding {
                check: AuditCheck::DeltaBudget,
                expected: bound,
                observed: consumed,
            });
        }

        for pair in snapshot.entries.windows(2) {
            if pair[0].window_end_ms > pair[1].window_end_ms {
                findings.push(AuditFinding {
                    check: AuditCheck::EntryOrder,
                    expected: pair[0].window_end_ms as f64,
                    observed: pair[1].window_end_ms as f64,
                });
            }
        }

        if findings.is_empty() {
            AuditOutcome::Verified
        } else {
            AuditOutcome::Mismatch(findings)
        }
    }
}
