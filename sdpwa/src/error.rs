use thiserror::Error;

pub type Result<T> = std::result::Result<T, SdpwaError>;

/// Error policy: configuration errors are fatal to the aggregator, per-event
/// errors leave its state untouched, budget errors halt releases but keep raw
/// window state intact. Messages never carry identities or raw event values.
#[derive(Debug, Error)]
pub enum SdpwaError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("late event: timestamp {timestamp_ms} is behind the release watermark {watermark_ms}")]
    LateEvent { timestamp_ms: i64, watermark_ms: i64 },
    #[error("contribution cap reached in every window covering the event")]
    ContributionCapped,
    #[error("privacy budget exhausted: {0}")]
    BudgetExhausted(String),
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}
