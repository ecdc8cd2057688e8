use std::time::Duration;

/// Errors surfaced by plan execution and report generation.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// A report or accessor was used before `run()` produced a run response.
    #[error("plan has not been run yet; call run() first")]
    NotRun,

    #[error("plan has already been submitted")]
    AlreadySubmitted,

    /// The run response did not name the related allocation market.
    #[error("plan market {0} has no related allocation market")]
    MissingAllocationMarket(String),

    #[error("plan market {market} did not succeed after {attempts} polls ({elapsed:?})")]
    Timeout {
        market: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("waiting for plan market {0} was cancelled")]
    Cancelled(String),

    /// Any failure reported by the remote client, passed through as-is.
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;
