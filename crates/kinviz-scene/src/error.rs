//! Error types surfaced to the hosting shell

use kinviz_core::EnvironmentError;

/// Recoverable precondition failures of scene operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("No model loaded")]
    NotLoaded,

    #[error("Length mismatch: {points} points but {scalars} scalars")]
    LengthMismatch { points: usize, scalars: usize },

    #[error("Environment has no contact manager")]
    ContactManagerAbsent,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid sampling range [{lo}, {hi}]")]
    InvalidSamplingRange { lo: f64, hi: f64 },

    #[error("Sampling worker stopped without a result")]
    WorkerFailed,

    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),
}
