pub mod accumulator;
pub mod aggregator;
pub mod audit;
pub mod bounder;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod noise;
pub mod window;

pub use accumulator::{KahanSum, RawAccumulator, WindowTotals};
pub use aggregator::Aggregator;
pub use audit::{AuditCheck, AuditFinding, AuditOutcome, Auditor};
pub use bounder::ContributionBounder;
pub use config::{AggregatorConfig, ContributionBounds, DpParameters, WindowConfig};
pub use error::{Result, SdpwaError};
pub use ledger::{compose_epsilon, LedgerEntry, PrivacyLedger, PrivacyLedgerSnapshot};
pub use model::{Admission, Event, PrivacyLoss, ReleaseSnapshot, WindowId};
pub use noise::{Metric, NoiseEngine};
pub use window::WindowManager;
