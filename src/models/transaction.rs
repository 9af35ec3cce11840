//! Transaction records and the lending state derived from them

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enums::{LendingStatus, TransactionKind};
use crate::error::{AppError, AppResult};

/// Identifier assigned by the durable store when a record is appended
pub type RecordId = i64;

/// Wire and storage format for timestamps (second resolution, naive local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Immutable lending event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    pub id: RecordId,
    pub isbn: String,
    pub kind: TransactionKind,
    #[schema(value_type = String, example = "2024-01-01T10:00:00")]
    pub timestamp: NaiveDateTime,
    /// User who performed the transaction, empty when unknown
    #[serde(default)]
    pub actor: String,
}

/// A record that has been computed but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    pub isbn: String,
    pub kind: TransactionKind,
    pub timestamp: NaiveDateTime,
    pub actor: String,
}

impl PendingRecord {
    pub fn into_record(self, id: RecordId) -> TransactionRecord {
        TransactionRecord {
            id,
            isbn: self.isbn,
            kind: self.kind,
            timestamp: self.timestamp,
            actor: self.actor,
        }
    }
}

/// Current status of an item, redundant with the tail of its history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LendingState {
    pub status: LendingStatus,
    #[schema(value_type = Option<String>, example = "2024-01-01T10:00:00")]
    pub last_transaction: Option<NaiveDateTime>,
}

impl LendingState {
    /// State right after `record` was applied
    pub fn after(kind: TransactionKind, timestamp: NaiveDateTime) -> Self {
        Self {
            status: kind.resulting_status(),
            last_transaction: Some(timestamp),
        }
    }

    /// Derive the state from a history, if it has any records
    pub fn from_history(history: &[TransactionRecord]) -> Option<Self> {
        history
            .last()
            .map(|latest| Self::after(latest.kind, latest.timestamp))
    }
}

/// Current local time truncated to whole seconds
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Accepts `T` or space as the date/time separator and drops fractional
/// seconds, since rows written by older versions are not uniform.
pub fn parse_timestamp(value: &str) -> AppResult<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts.trunc_subsecs(0));
        }
    }
    Err(AppError::Persistence(format!("malformed timestamp '{}'", value)))
}
