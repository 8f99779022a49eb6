use async_trait::async_trait;
use tidepool_common::error::AppError;
use tidepool_common::types::Tx;

/// Response code meaning the application accepted the transaction.
pub const CODE_TYPE_OK: u32 = 0;

/// What the application reports back for a candidate transaction.
#[derive(Debug, Clone, Default)]
pub struct CheckTxResponse {
    /// 0 = OK, anything else is a rejection
    pub code: u32,
    pub data: Vec<u8>,
    pub log: String,
    /// Gas the transaction would consume; never negative by construction
    pub gas_wanted: i64,
    /// Higher priority is reaped first
    pub priority: i64,
    /// Sender identifier, empty when the application does not track one
    pub sender: String,
}

impl CheckTxResponse {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_TYPE_OK
    }

    pub fn accept(priority: i64) -> Self {
        Self {
            priority,
            gas_wanted: 1,
            ..Default::default()
        }
    }

    pub fn reject(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
            ..Default::default()
        }
    }
}

/// Result of executing a committed transaction, delivered to `update`.
#[derive(Debug, Clone, Default)]
pub struct DeliverTxResponse {
    pub code: u32,
    pub data: Vec<u8>,
    pub log: String,
}

impl DeliverTxResponse {
    pub fn ok(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_TYPE_OK
    }
}

/// Bridge to the external application that owns transaction validity.
///
/// Implementations may be arbitrarily slow; the mempool bounds every call
/// with its configured grace window.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    async fn check_tx(&self, tx: &Tx) -> Result<CheckTxResponse, AppError>;
}

/// Accept-all application assigning every transaction gas 1 and priority 0.
/// Used by tests and examples where validity is not the point.
#[derive(Debug, Default, Clone)]
pub struct EchoApp;

#[async_trait]
impl Application for EchoApp {
    async fn check_tx(&self, tx: &Tx) -> Result<CheckTxResponse, AppError> {
        Ok(CheckTxResponse {
            data: tx.as_bytes().to_vec(),
            gas_wanted: 1,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_app_accepts_everything() {
        let app = EchoApp;
        let tx = Tx::new(vec![1, 2, 3]);
        let res = app.check_tx(&tx).await.unwrap();
        assert!(res.is_ok());
        assert_eq!(res.data, vec![1, 2, 3]);
        assert_eq!(res.gas_wanted, 1);
    }

    #[test]
    fn test_response_helpers() {
        assert!(CheckTxResponse::accept(5).is_ok());
        assert_eq!(CheckTxResponse::accept(5).priority, 5);
        let rejected = CheckTxResponse::reject(2, "bad tx");
        assert!(!rejected.is_ok());
        assert_eq!(rejected.log, "bad tx");
    }
}
