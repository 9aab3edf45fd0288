//! Realtime store adapters. Implement StorePort.
//!
//! Firebase REST/event-stream client plus an in-memory store with the same
//! contract.

pub mod firebase;
pub mod memory;
pub mod mirror;
pub mod push_id;
pub mod sse;

pub use firebase::FirebaseStore;
pub use memory::InMemoryStore;
