//! Domain entities. Pure data structures for the core business.
//!
//! No store/HTTP types here: adapters hand over snapshots of plain JSON and
//! the repository maps them into these.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store path holding expense records keyed by generated id.
pub const EXPENSES_PATH: &str = "expenses";
/// Store path holding traveler records keyed by generated id.
pub const TRAVELERS_PATH: &str = "travelers";

/// Opaque record identifier. Always the key the store assigned on creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shared expense as held in memory (persisted fields + store key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: RecordId,
    pub category: String,
    pub amount: u64,
}

/// A traveler as held in memory (persisted fields + store key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traveler {
    pub id: RecordId,
    pub name: String,
}

/// Persisted body of an expense: `expenses/<id> = {"category", "amount"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub category: String,
    pub amount: u64,
}

impl ExpenseRecord {
    pub fn into_expense(self, id: RecordId) -> Expense {
        Expense {
            id,
            category: self.category,
            amount: self.amount,
        }
    }
}

/// Persisted body of a traveler: `travelers/<id> = {"name"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelerRecord {
    pub name: String,
}

impl TravelerRecord {
    pub fn into_traveler(self, id: RecordId) -> Traveler {
        Traveler {
            id,
            name: self.name,
        }
    }
}

/// Amount owed by one traveler, kept as whole cents so the two-decimal
/// rounding is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Owed {
    cents: u64,
}

impl Owed {
    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }
}

impl fmt::Display for Owed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// Read-only projection of a traveler with the derived split attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelerView {
    pub id: RecordId,
    pub name: String,
    /// `None` while no split is defined (no travelers).
    pub amount_owed: Option<Owed>,
}

/// Everything the presentation layer needs for one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerView {
    pub expenses: Vec<Expense>,
    pub travelers: Vec<TravelerView>,
    pub total: u64,
}

/// Point-in-time ordered view of all children under a subscribed path.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    pub children: Vec<(String, serde_json::Value)>,
}

impl Snapshot {
    pub fn new(path: impl Into<String>, children: Vec<(String, serde_json::Value)>) -> Self {
        Self {
            path: path.into(),
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// User-visible message about something that went wrong outside a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// User intent emitted by the input adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SubmitExpense { category: String, amount: u64 },
    SubmitTraveler { name: String },
    DeleteExpense(RecordId),
    RemoveTraveler(RecordId),
    Quit,
}
