//! Lending enums shared by the ledger, the stores and the API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// TransactionKind
// ---------------------------------------------------------------------------

/// Kind of a lending event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    CheckOut,
    CheckIn,
}

impl TransactionKind {
    /// Value stored in the `transactions.transaction_type` column
    pub fn as_db_str(self) -> &'static str {
        match self {
            TransactionKind::CheckOut => "check out",
            TransactionKind::CheckIn => "check in",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value.trim() {
            "check out" | "check_out" => Some(TransactionKind::CheckOut),
            "check in" | "check_in" => Some(TransactionKind::CheckIn),
            _ => None,
        }
    }

    /// Status an item is in right after an event of this kind
    pub fn resulting_status(self) -> LendingStatus {
        match self {
            TransactionKind::CheckOut => LendingStatus::CheckedOut,
            TransactionKind::CheckIn => LendingStatus::CheckedIn,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ---------------------------------------------------------------------------
// LendingStatus
// ---------------------------------------------------------------------------

/// Current lending status of an item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LendingStatus {
    #[default]
    CheckedIn,
    CheckedOut,
}

impl LendingStatus {
    /// Value stored in the `book_status.status` column
    pub fn as_db_str(self) -> &'static str {
        match self {
            LendingStatus::CheckedIn => "checked in",
            LendingStatus::CheckedOut => "checked out",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value.trim() {
            "checked in" | "checked_in" => Some(LendingStatus::CheckedIn),
            "checked out" | "checked_out" => Some(LendingStatus::CheckedOut),
            _ => None,
        }
    }

    /// Event that moves an item into this status
    pub fn entering_kind(self) -> TransactionKind {
        match self {
            LendingStatus::CheckedIn => TransactionKind::CheckIn,
            LendingStatus::CheckedOut => TransactionKind::CheckOut,
        }
    }

    /// Event that is legal from this status
    pub fn next_kind(self) -> TransactionKind {
        match self {
            LendingStatus::CheckedIn => TransactionKind::CheckOut,
            LendingStatus::CheckedOut => TransactionKind::CheckIn,
        }
    }
}

impl std::fmt::Display for LendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}
