// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call queue operations.
//!
//! Pending rows have `dialing = 0`. Popping flips a row to `dialing = 1` (the
//! used set) instead of deleting it, so the customer keeps counting toward
//! depth and keeps blocking re-insertion until its outcome is written back.

use outdial_core::OutdialError;
use outdial_core::types::QueueItem;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Atomically take the oldest pending item of a campaign and mark it dialing.
pub async fn pop_next(db: &Database, campaign_id: &str) -> Result<Option<QueueItem>, OutdialError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueItem>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let item = tx
                .query_row(
                    "SELECT campaign_id, customer_id, member_name, phone, description, description2
                     FROM call_queue
                     WHERE campaign_id = ?1 AND dialing = 0
                     ORDER BY seq ASC
                     LIMIT 1",
                    params![campaign_id],
                    |row| {
                        Ok(QueueItem {
                            campaign_id: row.get(0)?,
                            customer_id: row.get(1)?,
                            member_name: row.get(2)?,
                            phone: row.get(3)?,
                            description: row.get(4)?,
                            description2: row.get(5)?,
                        })
                    },
                )
                .optional()?;

            if let Some(item) = &item {
                tx.execute(
                    "UPDATE call_queue
                     SET dialing = 1, dialing_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE campaign_id = ?1 AND customer_id = ?2",
                    params![item.campaign_id, item.customer_id],
                )?;
            }
            tx.commit()?;
            Ok(item)
        })
        .await
        .map_err(map_tr_err)
}

/// Pending plus dialing rows of a campaign.
pub async fn count(db: &Database, campaign_id: &str) -> Result<usize, OutdialError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM call_queue WHERE campaign_id = ?1",
                params![campaign_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn exists(db: &Database, campaign_id: &str, customer_id: &str) -> Result<bool, OutdialError> {
    let campaign_id = campaign_id.to_string();
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM call_queue WHERE campaign_id = ?1 AND customer_id = ?2)",
                params![campaign_id, customer_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Insert items in order, skipping duplicates, until each campaign's depth reaches `cap`.
pub async fn insert_distinct(
    db: &Database,
    items: Vec<QueueItem>,
    cap: usize,
) -> Result<usize, OutdialError> {
    if items.is_empty() {
        return Ok(0);
    }
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut depth_stmt =
                    tx.prepare("SELECT COUNT(*) FROM call_queue WHERE campaign_id = ?1")?;
                let mut insert_stmt = tx.prepare(
                    "INSERT OR IGNORE INTO call_queue
                     (campaign_id, customer_id, member_name, phone, description, description2, seq)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                             (SELECT COALESCE(MAX(seq), 0) + 1 FROM call_queue WHERE campaign_id = ?1))",
                )?;
                for item in &items {
                    let depth: i64 =
                        depth_stmt.query_row(params![item.campaign_id], |row| row.get(0))?;
                    if depth as usize >= cap {
                        continue;
                    }
                    inserted += insert_stmt.execute(params![
                        item.campaign_id,
                        item.customer_id,
                        item.member_name,
                        item.phone,
                        item.description,
                        item.description2,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)
}

/// Retire a dialing entry after its outcome was handled.
pub async fn remove_used(db: &Database, campaign_id: &str, customer_id: &str) -> Result<(), OutdialError> {
    let campaign_id = campaign_id.to_string();
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM call_queue WHERE campaign_id = ?1 AND customer_id = ?2 AND dialing = 1",
                params![campaign_id, customer_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn clear(db: &Database, campaign_id: &str) -> Result<usize, OutdialError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM call_queue WHERE campaign_id = ?1",
                params![campaign_id],
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn clear_all(db: &Database) -> Result<usize, OutdialError> {
    db.connection()
        .call(|conn| -> Result<usize, rusqlite::Error> { conn.execute("DELETE FROM call_queue", []) })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn item(campaign: &str, customer: &str) -> QueueItem {
        QueueItem {
            campaign_id: campaign.into(),
            customer_id: customer.into(),
            member_name: format!("member {customer}"),
            phone: format!("0900{customer}"),
            description: String::new(),
            description2: String::new(),
        }
    }

    #[tokio::test]
    async fn pop_is_fifo_and_keeps_used_entry() {
        let (db, _dir) = setup_db().await;
        let inserted = insert_distinct(&db, vec![item("p1", "c1"), item("p1", "c2")], 10)
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let first = pop_next(&db, "p1").await.unwrap().unwrap();
        assert_eq!(first.customer_id, "c1");

        // Popped entry still counts and still exists.
        assert_eq!(count(&db, "p1").await.unwrap(), 2);
        assert!(exists(&db, "p1", "c1").await.unwrap());

        let second = pop_next(&db, "p1").await.unwrap().unwrap();
        assert_eq!(second.customer_id, "c2");
        assert!(pop_next(&db, "p1").await.unwrap().is_none());

        remove_used(&db, "p1", "c1").await.unwrap();
        assert_eq!(count(&db, "p1").await.unwrap(), 1);
        assert!(!exists(&db, "p1", "c1").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_skips_duplicates_and_respects_cap() {
        let (db, _dir) = setup_db().await;
        insert_distinct(&db, vec![item("p1", "c1")], 3).await.unwrap();

        let inserted = insert_distinct(
            &db,
            vec![item("p1", "c1"), item("p1", "c2"), item("p1", "c3"), item("p1", "c4")],
            3,
        )
        .await
        .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(count(&db, "p1").await.unwrap(), 3);
        assert!(!exists(&db, "p1", "c4").await.unwrap());
    }

    #[tokio::test]
    async fn remove_used_ignores_pending_entries() {
        let (db, _dir) = setup_db().await;
        insert_distinct(&db, vec![item("p1", "c1")], 3).await.unwrap();
        remove_used(&db, "p1", "c1").await.unwrap();
        assert!(exists(&db, "p1", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn clear_is_scoped_to_campaign() {
        let (db, _dir) = setup_db().await;
        insert_distinct(&db, vec![item("p1", "c1"), item("p2", "c1")], 3)
            .await
            .unwrap();
        assert_eq!(clear(&db, "p1").await.unwrap(), 1);
        assert_eq!(count(&db, "p2").await.unwrap(), 1);
        assert_eq!(clear_all(&db).await.unwrap(), 1);
        assert_eq!(count(&db, "p2").await.unwrap(), 0);
    }
}
