//! # tutora-store
//!
//! Persistent storage for the Tutora marketplace, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed operations for accounts,
//! weekly availability slots and bookings. Operations whose correctness
//! depends on a read (booking conflicts, review rollup, status changes) run
//! their read and write inside one transaction.

pub mod accounts;
pub mod availability;
pub mod bookings;
pub mod database;
pub mod migrations;
pub mod models;
pub mod stats;

mod convert;
mod error;
#[cfg(test)]
mod testing;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
