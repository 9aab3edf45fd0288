//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod split;

pub use entities::{
    EXPENSES_PATH, Expense, ExpenseRecord, Intent, LedgerView, Notice, Owed, RecordId, Snapshot,
    TRAVELERS_PATH, Traveler, TravelerRecord, TravelerView,
};
pub use errors::DomainError;
pub use split::{OwedByTraveler, compute_owed, total_amount};
