// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Outdial campaign dialer.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the durable call queue and
//! campaign registry behind the core collaborator traits.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::{SqliteCallQueue, SqliteRegistry};
pub use database::Database;

use outdial_config::model::StorageConfig;
use outdial_core::OutdialError;

/// Open the database described by the storage section.
pub async fn open_from_config(config: &StorageConfig) -> Result<Database, OutdialError> {
    Database::open_with(&config.database_path, config.wal_mode).await
}
