//! Usage statistics returned by the stats engine

use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

/// Statistics response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Number of catalogued items
    pub total_items: usize,
    /// Items currently checked out
    pub checked_out: usize,
    /// Items with the most transactions
    pub busiest: BusiestItems,
    /// Longest completed checkout, if any item has one
    pub longest_session: Option<LongestSession>,
    /// Title / transaction count pairs for charting
    pub transaction_counts: Vec<StatEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ItemRef {
    pub isbn: String,
    pub title: String,
}

/// Every item sharing the highest transaction count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BusiestItems {
    pub count: usize,
    pub items: Vec<ItemRef>,
}

/// A checkout followed by its checkin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub started: NaiveDateTime,
    pub ended: NaiveDateTime,
}

impl Session {
    pub fn duration(&self) -> chrono::Duration {
        self.ended - self.started
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LongestSession {
    pub item: ItemRef,
    #[schema(value_type = String)]
    pub started: NaiveDateTime,
    #[schema(value_type = String)]
    pub ended: NaiveDateTime,
    pub duration_seconds: i64,
    /// Human readable duration, e.g. `3 days, 4:05:00`
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatEntry {
    /// Label
    pub label: String,
    /// Value
    pub value: i64,
}
