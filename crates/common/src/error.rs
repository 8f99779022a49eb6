use crate::types::TxKey;
use thiserror::Error;

/// Synchronous admission failures surfaced by CheckTx, plus the errors the
/// update path can return when the application bridge dies.
///
/// A transaction the application rejects (non-zero code) is *not* an error
/// here: that outcome travels through the check callback.
#[derive(Error, Debug)]
pub enum MempoolError {
    /// Transaction exceeds the configured per-transaction byte limit.
    #[error("transaction of {actual} bytes exceeds the maximum of {max} bytes")]
    TxTooLarge { max: usize, actual: usize },

    /// The user-supplied pre-check hook rejected the transaction.
    #[error("pre-check rejected transaction: {0}")]
    PreCheck(String),

    /// The fingerprint is already in the recent-tx cache.
    #[error("transaction {0} was already received")]
    AlreadySeen(TxKey),

    /// Admitting the transaction would exceed the count or byte capacity.
    #[error("mempool is full: {size} transactions ({bytes} bytes)")]
    Full { size: usize, bytes: u64 },

    /// The caller cancelled before the validator was dispatched.
    #[error("check cancelled before dispatch")]
    Cancelled,

    /// The application bridge itself failed.
    #[error("application bridge: {0}")]
    App(#[from] AppError),
}

/// Failures of the external application connection, as opposed to
/// transactions the application deliberately rejects.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("application connection failed: {0}")]
    Connection(String),

    #[error("application check timed out after {0} ms")]
    Timeout(u64),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MempoolError>;
