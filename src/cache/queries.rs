pub const CREATE_SNAPSHOTS: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  name       TEXT NOT NULL UNIQUE,
  saved_at   INTEGER NOT NULL,
  body       TEXT NOT NULL
);
"#;

pub const INDEX_SNAPSHOTS_NAME: &str =
    "CREATE INDEX IF NOT EXISTS idx_snapshots_name ON snapshots(name);";

pub const UPSERT_SNAPSHOT: &str = "INSERT INTO snapshots (name, saved_at, body)
 VALUES (?1, ?2, ?3)
 ON CONFLICT(name)
 DO UPDATE SET saved_at=excluded.saved_at, body=excluded.body";

pub const SELECT_SNAPSHOT: &str = "SELECT saved_at, body FROM snapshots WHERE name = ?1";

pub fn schema_statements() -> Vec<&'static str> {
    vec![CREATE_SNAPSHOTS, INDEX_SNAPSHOTS_NAME]
}
