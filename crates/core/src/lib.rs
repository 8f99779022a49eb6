pub mod app;
pub mod cache;
pub mod config;
pub mod gossip;
pub mod mempool;
pub mod metrics;
pub mod priority;
pub mod store;
pub mod validator;

// Re-export commonly used types
pub use app::{Application, CheckTxResponse, DeliverTxResponse, EchoApp, CODE_TYPE_OK};
pub use config::MempoolConfig;
pub use mempool::{CheckTxCallback, PostCheckFn, PreCheckFn, TxMempool};
