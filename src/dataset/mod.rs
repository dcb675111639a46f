//! Read-only probe of a registered SQLite dataset: table names and row
//! counts, shown after access is granted and offered to the analysis
//! context. A probe failure on a registered dataset is a startup error.

use rusqlite::{Connection, OpenFlags};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to inspect dataset {path}: {source}")]
    Inspect {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub rows: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub tables: Vec<TableSummary>,
}

impl DatasetSummary {
    /// One-line description for startup output and task context.
    pub fn describe(&self) -> String {
        if self.tables.is_empty() {
            return "0 tables".to_string();
        }
        let listing = self
            .tables
            .iter()
            .map(|t| format!("{} ({} rows)", t.name, t.rows))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} tables: {listing}", self.tables.len())
    }
}

pub fn probe(path: &Path) -> Result<DatasetSummary, DatasetError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
        |source| DatasetError::Open {
            path: path.display().to_string(),
            source,
        },
    )?;

    let inspect_error = |source: rusqlite::Error| DatasetError::Inspect {
        path: path.display().to_string(),
        source,
    };

    let mut statement = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .map_err(inspect_error)?;
    let names = statement
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(inspect_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(inspect_error)?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let quoted = name.replace('"', "\"\"");
        let rows: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{quoted}\""), [], |row| {
                row.get(0)
            })
            .map_err(inspect_error)?;
        tables.push(TableSummary { name, rows });
    }

    Ok(DatasetSummary { tables })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn probe_lists_user_tables_with_row_counts() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("probe.db");
        let conn = Connection::open(&db_path).expect("create db");
        conn.execute_batch(
            "CREATE TABLE albums (id INTEGER PRIMARY KEY, title TEXT);
             CREATE TABLE artists (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO albums (title) VALUES ('one'), ('two');",
        )
        .expect("seed");
        drop(conn);

        let summary = probe(&db_path).expect("probe");
        assert_eq!(summary.tables.len(), 2);
        assert_eq!(summary.tables[0].name, "albums");
        assert_eq!(summary.tables[0].rows, 2);
        assert!(summary.describe().starts_with("2 tables:"));
    }

    #[test]
    fn probe_fails_on_missing_file() {
        let dir = tempdir().expect("tempdir");
        assert!(probe(&dir.path().join("absent.db")).is_err());
    }
}
