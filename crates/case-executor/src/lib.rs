pub mod batch;
pub mod config;
pub mod dlq;
pub mod error;
pub mod executor;
pub mod retry;

pub use config::ExecutorConfig;
pub use dlq::DeadLetterSink;
pub use error::ExecutorError;
pub use executor::{ExecutionOutcome, ProposalExecutor};
pub use retry::RetryStrategy;
