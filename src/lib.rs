//! Home library tracker
//!
//! A catalog of books keyed by ISBN, a checkout/checkin ledger kept in sync
//! with a durable store, and usage statistics derived from that ledger,
//! served as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
