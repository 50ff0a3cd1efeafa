//! Stock Ledger
//!
//! Per-product stock ledger and reservation state machine for order
//! fulfillment: available units are locked against pending orders,
//! confirmed into sales, and every mutation leaves an audit record.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod queries;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared handles wired up at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub ledger_service: services::LedgerService,
    pub reservation_service: services::ReservationService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let ledger_service = services::LedgerService::new(db.clone(), event_sender.clone());
        let reservation_service =
            services::ReservationService::new(db.clone(), event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            ledger_service,
            reservation_service,
        }
    }
}
