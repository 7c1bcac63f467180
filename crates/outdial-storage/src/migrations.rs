// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary via `embed_migrations!`
//! and run on every [`Database::open`](crate::Database::open).

use outdial_core::OutdialError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), OutdialError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| OutdialError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
