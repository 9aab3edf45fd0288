//! Infrastructure adapters. Implement outbound ports.
//!
//! Realtime store clients and the terminal UI. Map errors to DomainError.

pub mod store;
pub mod ui;
