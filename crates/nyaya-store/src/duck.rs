//! DuckDB case store.

use std::path::Path;
use std::sync::Mutex;

use duckdb::{Connection, params};
use nyaya_core::CaseRecord;
use tracing::info;

use crate::{CaseStore, StoreError, apply_update};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cases (
    case_id         VARCHAR PRIMARY KEY,
    analysis_status VARCHAR NOT NULL,
    last_updated    VARCHAR,
    record          VARCHAR NOT NULL
);
";

/// Case store backed by a DuckDB database.
///
/// Each case is one row: the full record as JSON text, plus the analysis
/// status and update time as plain columns for ad-hoc queries. Use
/// [`open`](Self::open) for an ephemeral in-memory database and
/// [`open_persistent`](Self::open_persistent) for a file that survives
/// restarts.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened case store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored cases.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let n: i64 = conn.query_row("SELECT count(*) FROM cases", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Case ids whose analysis is in `status`, ordered by id.
    pub fn case_ids_with_status(&self, status: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt =
            conn.prepare("SELECT case_id FROM cases WHERE analysis_status = ? ORDER BY case_id")?;
        let ids = stmt
            .query_map([status], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn read(conn: &Connection, case_id: &str) -> Result<CaseRecord, StoreError> {
    let json = conn.query_row(
        "SELECT record FROM cases WHERE case_id = ?",
        [case_id],
        |row| row.get::<_, String>(0),
    );
    match json {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(duckdb::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(case_id.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn write(conn: &Connection, record: &CaseRecord) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)?;
    conn.execute(
        "INSERT OR REPLACE INTO cases VALUES (?, ?, ?, ?)",
        params![
            record.case_id,
            record.analysis_status.as_str(),
            record.last_updated,
            json
        ],
    )?;
    Ok(())
}

impl CaseStore for DuckStore {
    fn get(&self, case_id: &str) -> Result<CaseRecord, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        read(&conn, case_id)
    }

    fn insert(&self, record: CaseRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        match read(&conn, &record.case_id) {
            Ok(_) => return Err(StoreError::AlreadyExists(record.case_id)),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        write(&conn, &record)
    }

    fn list(&self) -> Result<Vec<CaseRecord>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare("SELECT record FROM cases ORDER BY case_id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    fn update(
        &self,
        case_id: &str,
        apply: &mut dyn FnMut(&mut CaseRecord) -> Result<(), StoreError>,
    ) -> Result<CaseRecord, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let current = read(&conn, case_id)?;
        let updated = apply_update(&current, apply)?;
        write(&conn, &updated)?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyaya_core::AnalysisStatus;
    use serde_json::json;

    #[test]
    fn open_in_memory() {
        let store = DuckStore::open().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(matches!(store.get("c1"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn insert_get_list() {
        let store = DuckStore::open().unwrap();
        let mut rec = CaseRecord::new("c2", "State v. Rao");
        rec.category = Some("criminal".into());
        store.insert(rec.clone()).unwrap();
        store.insert(CaseRecord::new("c1", "Sharma v. Gupta")).unwrap();

        assert_eq!(store.get("c2").unwrap(), rec);
        assert!(matches!(
            store.insert(CaseRecord::new("c1", "dup")),
            Err(StoreError::AlreadyExists(_))
        ));
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|c| c.case_id).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn status_column_tracks_updates() {
        let store = DuckStore::open().unwrap();
        store.insert(CaseRecord::new("c1", "t")).unwrap();
        store.insert(CaseRecord::new("c2", "t")).unwrap();
        store.mark_processing("c1", false).unwrap();
        store.update_evidence("c1", json!({"x": 1}), 0.4).unwrap();

        assert_eq!(store.case_ids_with_status("processing").unwrap(), vec!["c1"]);
        assert_eq!(store.case_ids_with_status("pending").unwrap(), vec!["c2"]);
        let rec = store.mark_analysis_failed("c1", "boom").unwrap();
        assert_eq!(rec.analysis_status, AnalysisStatus::Failed);
        assert_eq!(store.case_ids_with_status("failed").unwrap(), vec!["c1"]);
    }

    #[test]
    fn persistent_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cases.duckdb");
        {
            let store = DuckStore::open_persistent(&path).unwrap();
            store.insert(CaseRecord::new("c1", "Sharma v. Gupta")).unwrap();
            store.mark_processing("c1", false).unwrap();
            store.update_summary("c1", json!({"summary": "ok"}), 0.7).unwrap();
        }
        assert!(path.exists());

        let store = DuckStore::open_persistent(&path).unwrap();
        let rec = store.get("c1").unwrap();
        assert_eq!(rec.analysis_status, AnalysisStatus::Processing);
        assert_eq!(rec.summary_confidence, Some(0.7));
        assert_eq!(rec.summary_data, Some(json!({"summary": "ok"})));
    }
}
