//! Lending state machine
//!
//! Two states, `checked in` and `checked out`, and one legal event from each.
//! Every function here is pure: it computes the record to append and the state
//! that results from it, and leaves applying them to the caller.

use chrono::NaiveDateTime;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{LendingStatus, TransactionKind},
        transaction::{LendingState, PendingRecord},
    },
};

/// Scratch result of a legal transition, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: PendingRecord,
    pub state: LendingState,
}

impl Transition {
    fn new(isbn: &str, kind: TransactionKind, actor: &str, now: NaiveDateTime) -> Self {
        Self {
            record: PendingRecord {
                isbn: isbn.to_string(),
                kind,
                timestamp: now,
                actor: actor.to_string(),
            },
            state: LendingState::after(kind, now),
        }
    }
}

/// Request a specific event. Fails if it is not legal from `current`.
pub fn request(
    isbn: &str,
    current: &LendingState,
    kind: TransactionKind,
    actor: &str,
    now: NaiveDateTime,
) -> AppResult<Transition> {
    if current.status.next_kind() != kind {
        return Err(AppError::InvalidTransition {
            isbn: isbn.to_string(),
            status: current.status,
            requested: kind,
        });
    }
    Ok(Transition::new(isbn, kind, actor, now))
}

/// Whichever event is legal from `current`
pub fn toggle(isbn: &str, current: &LendingState, actor: &str, now: NaiveDateTime) -> Transition {
    Transition::new(isbn, current.status.next_kind(), actor, now)
}

/// Seeding record for a new item, so its history is never empty
pub fn seed(isbn: &str, initial: LendingStatus, actor: &str, now: NaiveDateTime) -> Transition {
    Transition::new(isbn, initial.entering_kind(), actor, now)
}
