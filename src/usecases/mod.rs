//! Application use cases. Orchestrate domain logic via ports.

pub mod ledger_service;
pub mod record_repository;
pub mod write_dispatcher;

pub use ledger_service::LedgerService;
pub use record_repository::RecordRepository;
pub use write_dispatcher::{PendingWrite, RetryPolicy, WriteDispatcher, WriteOp};
