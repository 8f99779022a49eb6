pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, MempoolError, Result};
pub use types::{PeerId, Tx, TxInfo, TxKey};
