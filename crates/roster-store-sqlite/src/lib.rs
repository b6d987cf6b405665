//! SQLite persistence for the alumni roster: the record source the report
//! engine reads from, and the generated-artifact store it writes into.
//!
//! Access per report build is short-lived: one query per record set, no
//! transaction spanning the render phase. Artifact writes upsert by report
//! name, so regeneration never accumulates duplicate rows.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use roster_core::{Graduate, MemoriamEntry, TrackedEntry};
use roster_report::ArtifactSink;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS graduates (
  id INTEGER PRIMARY KEY,
  roll_no TEXT NOT NULL UNIQUE,
  name TEXT,
  branch TEXT,
  hostel TEXT,
  dob TEXT,
  wad TEXT,
  spouse_name TEXT,
  lives_in TEXT,
  state TEXT,
  country TEXT,
  email TEXT,
  phone TEXT,
  photo_1966 BLOB,
  photo_current BLOB
);

CREATE TABLE IF NOT EXISTS memoriam (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  roll_no TEXT NOT NULL,
  name TEXT,
  branch TEXT,
  photo BLOB
);

CREATE TABLE IF NOT EXISTS tracked (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  roll_no TEXT NOT NULL,
  name TEXT,
  branch TEXT,
  photo BLOB
);

CREATE TABLE IF NOT EXISTS posts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  roll_no TEXT NOT NULL,
  title TEXT NOT NULL,
  body TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS generated_reports (
  report_name TEXT PRIMARY KEY,
  file_data BLOB NOT NULL,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_graduates_branch ON graduates(branch);
";

const GRADUATE_COLUMNS: &str = "id, roll_no, name, branch, hostel, dob, wad, spouse_name,
     lives_in, state, country, email, phone, photo_1966, photo_current";

pub struct SqliteStore {
    conn: Connection,
}

/// One row of the artifact table, without the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub report_name: String,
    pub created_at: String,
    pub size_bytes: usize,
}

impl SqliteStore {
    /// Open the roster database and configure the runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas
    /// cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;
        Ok(Self { conn })
    }

    /// Current schema version, `0` before the first migration.
    ///
    /// # Errors
    /// Returns an error when migration metadata cannot be read.
    pub fn schema_version(&self) -> Result<i64> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;
        let version: Option<i64> = self
            .conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .context("failed to read schema version")?;
        Ok(version.unwrap_or(0))
    }

    /// Apply all forward migrations up to the latest supported version.
    ///
    /// # Errors
    /// Returns an error when any migration step fails or the database
    /// reports an unsupported version.
    pub fn migrate(&mut self) -> Result<()> {
        let mut version = self.schema_version()?;
        if version < 1 {
            self.conn.execute_batch(MIGRATION_001_SQL).context("failed to apply migration v1")?;
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
                    params![1_i64, now_rfc3339()?],
                )
                .context("failed to record migration version 1")?;
            version = 1;
        }
        if version != LATEST_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported schema version {version}; expected {LATEST_SCHEMA_VERSION}"
            ));
        }
        Ok(())
    }

    /// All graduate records, ordered by branch then name — the order the
    /// report builders expect rows in.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or fail boundary
    /// validation.
    pub fn list_graduates(&self) -> Result<Vec<Graduate>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {GRADUATE_COLUMNS} FROM graduates ORDER BY branch ASC, name ASC"
            ))
            .context("failed to prepare graduates query")?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let record = Graduate {
                id: row.get(0)?,
                roll_no: row.get(1)?,
                name: row.get(2)?,
                branch: row.get(3)?,
                hostel: row.get(4)?,
                dob: row.get(5)?,
                wad: row.get(6)?,
                spouse_name: row.get(7)?,
                lives_in: row.get(8)?,
                state: row.get(9)?,
                country: row.get(10)?,
                email: row.get(11)?,
                phone: row.get(12)?,
                photo_1966: row.get(13)?,
                photo_current: row.get(14)?,
            };
            record
                .validate()
                .map_err(|err| anyhow!("graduate row failed validation: {err}"))?;
            records.push(record);
        }
        Ok(records)
    }

    /// # Errors
    /// Returns an error when rows cannot be read or fail validation.
    pub fn list_memoriam(&self) -> Result<Vec<MemoriamEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT roll_no, name, branch, photo FROM memoriam ORDER BY name ASC")
            .context("failed to prepare memoriam query")?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let entry = MemoriamEntry {
                roll_no: row.get(0)?,
                name: row.get(1)?,
                branch: row.get(2)?,
                photo: row.get(3)?,
            };
            entry.validate().map_err(|err| anyhow!("memoriam row failed validation: {err}"))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// # Errors
    /// Returns an error when rows cannot be read or fail validation.
    pub fn list_tracked(&self) -> Result<Vec<TrackedEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT roll_no, name, branch, photo FROM tracked ORDER BY name ASC")
            .context("failed to prepare tracked query")?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let entry = TrackedEntry {
                roll_no: row.get(0)?,
                name: row.get(1)?,
                branch: row.get(2)?,
                photo: row.get(3)?,
            };
            entry.validate().map_err(|err| anyhow!("tracked row failed validation: {err}"))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Insert one graduate row (data migration and seeding path; records
    /// are otherwise created outside this engine).
    ///
    /// # Errors
    /// Returns an error when validation or the insert fails.
    pub fn insert_graduate(&self, record: &Graduate) -> Result<()> {
        record.validate().map_err(|err| anyhow!("refusing invalid graduate: {err}"))?;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO graduates({GRADUATE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                params![
                    record.id,
                    record.roll_no,
                    record.name,
                    record.branch,
                    record.hostel,
                    record.dob,
                    record.wad,
                    record.spouse_name,
                    record.lives_in,
                    record.state,
                    record.country,
                    record.email,
                    record.phone,
                    record.photo_1966,
                    record.photo_current,
                ],
            )
            .context("failed to insert graduate")?;
        Ok(())
    }

    /// # Errors
    /// Returns an error when validation or the insert fails.
    pub fn insert_memoriam(&self, entry: &MemoriamEntry) -> Result<()> {
        entry.validate().map_err(|err| anyhow!("refusing invalid memoriam entry: {err}"))?;
        self.conn
            .execute(
                "INSERT INTO memoriam(roll_no, name, branch, photo) VALUES (?1, ?2, ?3, ?4)",
                params![entry.roll_no, entry.name, entry.branch, entry.photo],
            )
            .context("failed to insert memoriam entry")?;
        Ok(())
    }

    /// # Errors
    /// Returns an error when validation or the insert fails.
    pub fn insert_tracked(&self, entry: &TrackedEntry) -> Result<()> {
        entry.validate().map_err(|err| anyhow!("refusing invalid tracked entry: {err}"))?;
        self.conn
            .execute(
                "INSERT INTO tracked(roll_no, name, branch, photo) VALUES (?1, ?2, ?3, ?4)",
                params![entry.roll_no, entry.name, entry.branch, entry.photo],
            )
            .context("failed to insert tracked entry")?;
        Ok(())
    }

    /// Persist a generated document, replacing any previous version under
    /// the same name and refreshing its timestamp.
    ///
    /// # Errors
    /// Returns an error when the upsert fails.
    pub fn save_report(&self, report_name: &str, file_data: &[u8]) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO generated_reports(report_name, file_data, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(report_name) DO UPDATE SET
                   file_data = excluded.file_data,
                   created_at = excluded.created_at",
                params![report_name, file_data, now_rfc3339()?],
            )
            .context("failed to upsert generated report")?;
        info!(report = report_name, bytes = file_data.len(), "artifact stored");
        Ok(())
    }

    /// Latest stored bytes for `report_name`, if any.
    ///
    /// # Errors
    /// Returns an error when the lookup fails.
    pub fn fetch_report(&self, report_name: &str) -> Result<Option<Vec<u8>>> {
        self.conn
            .query_row(
                "SELECT file_data FROM generated_reports WHERE report_name = ?1",
                params![report_name],
                |row| row.get(0),
            )
            .optional()
            .context("failed to fetch generated report")
    }

    /// Every stored artifact, newest first.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read.
    pub fn list_reports(&self) -> Result<Vec<ArtifactSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT report_name, created_at, LENGTH(file_data)
                 FROM generated_reports
                 ORDER BY created_at DESC, report_name ASC",
            )
            .context("failed to prepare report listing")?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            let size: i64 = row.get(2)?;
            summaries.push(ArtifactSummary {
                report_name: row.get(0)?,
                created_at: row.get(1)?,
                size_bytes: usize::try_from(size).unwrap_or(0),
            });
        }
        Ok(summaries)
    }
}

impl ArtifactSink for SqliteStore {
    fn save_artifact(&mut self, name: &str, bytes: &[u8]) -> Result<bool> {
        self.save_report(name, bytes)?;
        Ok(true)
    }
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).context("failed to format timestamp")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(&dir.path().join("roster.sqlite3")).unwrap();
        store.migrate().unwrap();
        (dir, store)
    }

    fn grad(id: i64, roll: &str, name: &str, branch: Option<&str>) -> Graduate {
        Graduate {
            id,
            roll_no: roll.to_string(),
            name: Some(name.to_string()),
            branch: branch.map(str::to_string),
            ..Graduate::default()
        }
    }

    #[test]
    fn migrate_is_idempotent_and_versioned() {
        let (_dir, mut store) = open_store();
        assert_eq!(store.schema_version().unwrap(), LATEST_SCHEMA_VERSION);
        store.migrate().unwrap();
        assert_eq!(store.schema_version().unwrap(), LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn graduates_list_in_branch_then_name_order() {
        let (_dir, store) = open_store();
        store.insert_graduate(&grad(1, "E1", "Zafar", Some("EE"))).unwrap();
        store.insert_graduate(&grad(2, "C1", "Mohan", Some("CE"))).unwrap();
        store.insert_graduate(&grad(3, "C2", "Anand", Some("CE"))).unwrap();

        let names: Vec<String> = store
            .list_graduates()
            .unwrap()
            .into_iter()
            .map(|g| g.display_name().to_string())
            .collect();
        assert_eq!(names, ["Anand", "Mohan", "Zafar"]);
    }

    #[test]
    fn duplicate_roll_numbers_are_rejected() {
        let (_dir, store) = open_store();
        store.insert_graduate(&grad(1, "C1", "Mohan", None)).unwrap();
        assert!(store.insert_graduate(&grad(2, "C1", "Other", None)).is_err());
    }

    #[test]
    fn invalid_rows_fail_at_the_fetch_boundary() {
        let (_dir, store) = open_store();
        store
            .conn
            .execute(
                "INSERT INTO graduates(id, roll_no, name) VALUES (1, '   ', 'Ghost')",
                [],
            )
            .unwrap();
        assert!(store.list_graduates().is_err());
    }

    #[test]
    fn photos_round_trip_as_blobs() {
        let (_dir, store) = open_store();
        let mut record = grad(1, "C1", "Mohan", Some("CE"));
        record.photo_1966 = Some(vec![1, 2, 3, 4]);
        store.insert_graduate(&record).unwrap();
        let loaded = store.list_graduates().unwrap();
        assert_eq!(loaded[0].photo_1966.as_deref(), Some(&[1_u8, 2, 3, 4][..]));
        assert_eq!(loaded[0].photo_current, None);
    }

    #[test]
    fn memoriam_and_tracked_round_trip() {
        let (_dir, store) = open_store();
        store
            .insert_memoriam(&MemoriamEntry {
                roll_no: "M1".to_string(),
                name: Some("Dinesh".to_string()),
                branch: Some("ME".to_string()),
                photo: None,
            })
            .unwrap();
        store
            .insert_tracked(&TrackedEntry {
                roll_no: "T1".to_string(),
                name: None,
                branch: None,
                photo: Some(vec![9, 9]),
            })
            .unwrap();
        assert_eq!(store.list_memoriam().unwrap().len(), 1);
        let tracked = store.list_tracked().unwrap();
        assert_eq!(tracked[0].photo.as_deref(), Some(&[9_u8, 9][..]));
    }

    #[test]
    fn saving_the_same_report_twice_keeps_one_row_with_latest_bytes() {
        let (_dir, store) = open_store();
        store.save_report("roster.pdf", b"first version").unwrap();
        // Age the stored row so the refresh is observable.
        store
            .conn
            .execute(
                "UPDATE generated_reports SET created_at = '2000-01-01T00:00:00Z'",
                [],
            )
            .unwrap();
        store.save_report("roster.pdf", b"second version").unwrap();

        let reports = store.list_reports().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].created_at.as_str() > "2000-01-01T00:00:00Z");
        assert_eq!(
            store.fetch_report("roster.pdf").unwrap().as_deref(),
            Some(&b"second version"[..])
        );
    }

    #[test]
    fn fetch_of_unknown_report_is_none() {
        let (_dir, store) = open_store();
        assert_eq!(store.fetch_report("nope.pdf").unwrap(), None);
    }

    #[test]
    fn artifact_sink_writes_through_to_the_report_table() {
        let (_dir, mut store) = open_store();
        assert!(ArtifactSink::save_artifact(&mut store, "sink.pdf", b"bytes").unwrap());
        assert_eq!(store.fetch_report("sink.pdf").unwrap().as_deref(), Some(&b"bytes"[..]));
    }
}
