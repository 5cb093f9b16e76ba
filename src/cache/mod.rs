pub mod queries;

use crate::model::AppState;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;

const STATE_SNAPSHOT: &str = "state";

#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub saved_at: i64,
    pub state: AppState,
}

/// Last known good state, read back when the backend cannot be reached.
pub struct SnapshotCache {
    conn: Connection,
}

impl SnapshotCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open snapshot cache: {}", path.display()))?;

        let cache = Self { conn };
        cache.init_schema()?;

        Ok(cache)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize cache schema")
                    .map(|_| ())
            })
    }

    pub fn save(&self, state: &AppState) -> Result<()> {
        let body = serde_json::to_string(state).context("Failed to serialize state snapshot")?;

        self.conn
            .execute(
                queries::UPSERT_SNAPSHOT,
                params![STATE_SNAPSHOT, Utc::now().timestamp(), body],
            )
            .context("Failed to upsert state snapshot")?;

        Ok(())
    }

    pub fn load(&self) -> Result<Option<CachedSnapshot>> {
        let row = self
            .conn
            .query_row(queries::SELECT_SNAPSHOT, params![STATE_SNAPSHOT], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .optional()
            .context("Failed to query state snapshot")?;

        row.map(|(saved_at, body)| {
            serde_json::from_str::<AppState>(&body)
                .context("Failed to parse cached state snapshot")
                .map(|state| CachedSnapshot {
                    saved_at,
                    state: state.normalized(),
                })
        })
        .transpose()
    }
}
