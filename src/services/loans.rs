//! Checkout / checkin service

use std::sync::Arc;

use crate::{
    error::AppResult,
    ledger::{Ledger, LendingOutcome},
    models::transaction,
};

#[derive(Clone)]
pub struct LoansService {
    ledger: Arc<Ledger>,
}

impl LoansService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Check the item out if it is on the shelf, otherwise check it in
    pub async fn checkout_or_checkin(
        &self,
        isbn: &str,
        username: &str,
    ) -> AppResult<LendingOutcome> {
        self.ledger.toggle(isbn, username, transaction::now()).await
    }

    pub async fn check_out(&self, isbn: &str, username: &str) -> AppResult<LendingOutcome> {
        self.ledger.check_out(isbn, username, transaction::now()).await
    }

    pub async fn check_in(&self, isbn: &str, username: &str) -> AppResult<LendingOutcome> {
        self.ledger.check_in(isbn, username, transaction::now()).await
    }
}
