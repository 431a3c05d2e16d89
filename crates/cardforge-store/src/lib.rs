//! # cardforge-store
//!
//! Local persistence for the card generator backend, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  Schema migrations run automatically on open.

pub mod attempts;
pub mod cards;
pub mod database;
pub mod generated_images;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
