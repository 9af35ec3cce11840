//! Statistics service
//!
//! Everything here reads a copy of the cache taken under a short read lock;
//! the aggregation itself runs without holding any lock and never writes.

use std::sync::Arc;

use crate::{
    ledger::{CacheSnapshot, Ledger, LedgerEntry},
    models::{
        enums::{LendingStatus, TransactionKind},
        stats::{BusiestItems, ItemRef, LongestSession, Session, StatEntry, StatsResponse},
        transaction::TransactionRecord,
    },
};

#[derive(Clone)]
pub struct StatsService {
    ledger: Arc<Ledger>,
}

impl StatsService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn get_stats(&self) -> StatsResponse {
        let snapshot = self.ledger.cache().snapshot();
        compute(&snapshot)
    }
}

pub fn compute(snapshot: &CacheSnapshot) -> StatsResponse {
    StatsResponse {
        total_items: snapshot.len(),
        checked_out: snapshot
            .values()
            .filter(|entry| entry.state.status == LendingStatus::CheckedOut)
            .count(),
        busiest: busiest_items(snapshot),
        longest_session: longest_session(snapshot),
        transaction_counts: transaction_counts(snapshot),
    }
}

fn item_ref(entry: &LedgerEntry) -> ItemRef {
    ItemRef {
        isbn: entry.item.isbn.clone(),
        title: entry.item.metadata.title.clone(),
    }
}

/// All items sharing the highest transaction count. Ties keep every item.
pub fn busiest_items(snapshot: &CacheSnapshot) -> BusiestItems {
    let mut busiest = BusiestItems::default();
    for entry in snapshot.values() {
        let count = entry.history.len();
        if count == 0 {
            continue;
        }
        if count > busiest.count {
            busiest.count = count;
            busiest.items.clear();
        }
        if count == busiest.count {
            busiest.items.push(item_ref(entry));
        }
    }
    busiest
}

/// Completed sessions of one history, in log order.
///
/// A checkout pairs with the checkin that immediately follows it. A trailing
/// checkout is an open session and yields nothing.
pub fn completed_sessions(history: &[TransactionRecord]) -> Vec<Session> {
    let mut sessions = Vec::new();
    let mut open: Option<&TransactionRecord> = None;
    for record in history {
        match record.kind {
            TransactionKind::CheckOut => open = Some(record),
            TransactionKind::CheckIn => {
                if let Some(start) = open.take() {
                    sessions.push(Session {
                        started: start.timestamp,
                        ended: record.timestamp,
                    });
                }
            }
        }
    }
    sessions
}

/// Longest completed session over all items.
///
/// Items are visited in ascending ISBN order and sessions chronologically;
/// the first maximum found wins a tie. Sessions that end before they start
/// (clock changes) are ignored.
pub fn longest_session(snapshot: &CacheSnapshot) -> Option<LongestSession> {
    let mut longest: Option<(&LedgerEntry, Session)> = None;
    for entry in snapshot.values() {
        for session in completed_sessions(&entry.history) {
            if session.duration() < chrono::Duration::zero() {
                continue;
            }
            let is_longer = match &longest {
                Some((_, best)) => session.duration() > best.duration(),
                None => true,
            };
            if is_longer {
                longest = Some((entry, session));
            }
        }
    }

    longest.map(|(entry, session)| {
        let duration = session.duration();
        LongestSession {
            item: item_ref(entry),
            started: session.started,
            ended: session.ended,
            duration_seconds: duration.num_seconds(),
            duration: format_duration(duration),
        }
    })
}

/// Title and transaction count of every item, in cache order
pub fn transaction_counts(snapshot: &CacheSnapshot) -> Vec<StatEntry> {
    snapshot
        .values()
        .map(|entry| StatEntry {
            label: entry.item.metadata.title.clone(),
            value: entry.history.len() as i64,
        })
        .collect()
}

/// `H:MM:SS`, prefixed with `N day(s), ` when longer than a day
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let rest = total % 86_400;
    let clock = format!("{}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}
