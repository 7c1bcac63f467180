// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign registry operations. Snapshots are stored as JSON.

use outdial_core::OutdialError;
use outdial_core::types::{CampaignField, CampaignSnapshot};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn decode(json: &str) -> Result<CampaignSnapshot, OutdialError> {
    serde_json::from_str(json).map_err(|e| OutdialError::Storage {
        source: Box::new(e),
    })
}

fn encode(snapshot: &CampaignSnapshot) -> Result<String, OutdialError> {
    serde_json::to_string(snapshot).map_err(|e| OutdialError::Storage {
        source: Box::new(e),
    })
}

pub async fn get(db: &Database, campaign_id: &str) -> Result<Option<CampaignSnapshot>, OutdialError> {
    let campaign_id = campaign_id.to_string();
    let json = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT snapshot FROM campaigns WHERE campaign_id = ?1",
                params![campaign_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    json.as_deref().map(decode).transpose()
}

/// Insert or replace a snapshot.
pub async fn save(db: &Database, snapshot: &CampaignSnapshot) -> Result<(), OutdialError> {
    let campaign_id = snapshot.campaign_id.clone();
    let state = snapshot.state.to_string();
    let json = encode(snapshot)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO campaigns (campaign_id, state, snapshot)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(campaign_id) DO UPDATE SET
                     state = excluded.state,
                     snapshot = excluded.snapshot,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![campaign_id, state, json],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Read-modify-write a single field inside one transaction.
///
/// Returns `false` when no entry exists for the campaign.
pub async fn update_field(
    db: &Database,
    campaign_id: &str,
    field: CampaignField,
) -> Result<bool, OutdialError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let json: Option<String> = tx
                .query_row(
                    "SELECT snapshot FROM campaigns WHERE campaign_id = ?1",
                    params![campaign_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(json) = json else {
                tx.commit()?;
                return Ok(false);
            };

            let mut snapshot: CampaignSnapshot = serde_json::from_str(&json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e)))?;
            field.apply(&mut snapshot);
            snapshot.updated_at = chrono::Utc::now();
            let json = serde_json::to_string(&snapshot)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            tx.execute(
                "UPDATE campaigns
                 SET state = ?2, snapshot = ?3, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE campaign_id = ?1",
                params![campaign_id, snapshot.state.to_string(), json],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn remove(db: &Database, campaign_id: &str) -> Result<bool, OutdialError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM campaigns WHERE campaign_id = ?1",
                params![campaign_id],
            )
        })
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

/// All snapshots, optionally filtered by state, ordered by campaign id.
pub async fn list(db: &Database, state: Option<&str>) -> Result<Vec<CampaignSnapshot>, OutdialError> {
    let state = state.map(str::to_string);
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT snapshot FROM campaigns
                 WHERE ?1 IS NULL OR state = ?1
                 ORDER BY campaign_id ASC",
            )?;
            let rows = stmt.query_map(params![state], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    rows.iter().map(|json| decode(json)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use outdial_core::CampaignState;
    use outdial_core::types::Advisory;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn snapshot(id: &str, state: CampaignState) -> CampaignSnapshot {
        CampaignSnapshot {
            campaign_id: id.into(),
            call_flow_id: "flow-1".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            state,
            agents: vec![],
            advisory: Advisory::default(),
            recurrence: None,
            call_restrictions: vec![],
            access_token: None,
            current_calls: vec![],
            last_execution: Default::default(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_get_and_overwrite() {
        let (db, _dir) = setup_db().await;
        save(&db, &snapshot("p1", CampaignState::Active)).await.unwrap();
        save(&db, &snapshot("p1", CampaignState::Stopping)).await.unwrap();

        let loaded = get(&db, "p1").await.unwrap().unwrap();
        assert_eq!(loaded.state, CampaignState::Stopping);
        assert_eq!(loaded.client_secret, "secret");
        assert!(get(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_field_changes_state_column() {
        let (db, _dir) = setup_db().await;
        save(&db, &snapshot("p1", CampaignState::Active)).await.unwrap();
        save(&db, &snapshot("p2", CampaignState::Active)).await.unwrap();

        let updated = update_field(&db, "p1", CampaignField::State(CampaignState::Stopping))
            .await
            .unwrap();
        assert!(updated);

        let active = list(&db, Some("active")).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].campaign_id, "p2");
        assert_eq!(list(&db, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_missing_entry_is_noop() {
        let (db, _dir) = setup_db().await;
        let updated = update_field(
            &db,
            "ghost",
            CampaignField::Advisory(Advisory {
                error: Some("x".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn remove_deletes_entry() {
        let (db, _dir) = setup_db().await;
        save(&db, &snapshot("p1", CampaignState::Active)).await.unwrap();
        assert!(remove(&db, "p1").await.unwrap());
        assert!(!remove(&db, "p1").await.unwrap());
    }
}
