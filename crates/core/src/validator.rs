use crate::app::{Application, CheckTxResponse};
use std::sync::Arc;
use std::time::Duration;
use tidepool_common::error::AppError;
use tidepool_common::types::Tx;
use tracing::warn;

/// Asynchronous bridge to the application's check operation.
///
/// Every call is bounded by the configured grace window; a check that
/// outlives it is reported as `AppError::Timeout` and handled by the caller
/// like any other rejection. Used both for first-time checks and for
/// update-time rechecks.
#[derive(Clone)]
pub struct Validator {
    app: Arc<dyn Application>,
    timeout: Duration,
}

impl Validator {
    pub fn new(app: Arc<dyn Application>, timeout: Duration) -> Self {
        Self { app, timeout }
    }

    pub async fn check(&self, tx: &Tx) -> Result<CheckTxResponse, AppError> {
        match tokio::time::timeout(self.timeout, self.app.check_tx(tx)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Application check timed out for tx {}", tx.key());
                Err(AppError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::EchoApp;
    use async_trait::async_trait;

    struct StallingApp;

    #[async_trait]
    impl Application for StallingApp {
        async fn check_tx(&self, _tx: &Tx) -> Result<CheckTxResponse, AppError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CheckTxResponse::default())
        }
    }

    #[tokio::test]
    async fn test_check_passes_response_through() {
        let validator = Validator::new(Arc::new(EchoApp), Duration::from_secs(1));
        let res = validator.check(&Tx::new(vec![1])).await.unwrap();
        assert!(res.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_times_out() {
        let validator = Validator::new(Arc::new(StallingApp), Duration::from_millis(50));
        let err = validator.check(&Tx::new(vec![1])).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(50)));
    }
}
