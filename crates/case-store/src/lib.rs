pub mod error;
pub mod lock;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use lock::{DistributedLock, LockGuard};
pub use memory::InMemoryCaseStore;
pub use store::{
    CaseStore, CaseTransaction, CreateRunOutcome, LedgerInsertOutcome, NewExecution, NewMessage,
    NewProposal,
};
