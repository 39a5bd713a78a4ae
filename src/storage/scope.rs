//! Connection scope
//!
//! One connection and one transaction per call. The transaction is committed
//! only when the enclosed operation returns `Ok`; an `Err` or an unwind drops
//! it uncommitted. The connection is closed when the scope returns.

use std::fs::OpenOptions;
use std::path::Path;
use rusqlite::{Connection, Transaction};
use crate::Result;

/// Run `op` against a fresh connection to the database at `path`.
pub fn with_scope<T, F>(path: &Path, op: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let mut conn = Connection::open(path)?;
    let tx = conn.transaction()?;

    match op(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            tracing::debug!("Discarding uncommitted writes on {}: {}", path.display(), e);
            if let Err(rollback_err) = tx.rollback() {
                tracing::warn!("Rollback on {} failed: {}", path.display(), rollback_err);
            }
            Err(e)
        }
    }
}

/// Create the database file (and missing parent directories) if it isn't there.
pub fn ensure_database_file(path: &Path) -> Result<()> {
    if path.exists() {
        tracing::debug!("{} exists", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().append(true).create(true).open(path)?;
    tracing::info!("Created database file {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::TempDir;

    fn scratch() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scope.db");
        with_scope(&path, |conn| {
            conn.execute("CREATE TABLE items (id INTEGER PRIMARY KEY)", [])?;
            Ok(())
        })
        .unwrap();
        (dir, path)
    }

    fn count(path: &Path) -> i64 {
        with_scope(path, |conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn test_commit_on_ok() {
        let (_dir, path) = scratch();
        with_scope(&path, |conn| {
            conn.execute("INSERT INTO items (id) VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(count(&path), 1);
    }

    #[test]
    fn test_discard_on_err() {
        let (_dir, path) = scratch();
        let result: Result<()> = with_scope(&path, |conn| {
            conn.execute("INSERT INTO items (id) VALUES (1)", [])?;
            Err(Error::InvalidInput("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(count(&path), 0);
    }

    #[test]
    fn test_discard_on_panic() {
        let (_dir, path) = scratch();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = with_scope(&path, |conn| -> Result<()> {
                conn.execute("INSERT INTO items (id) VALUES (7)", [])?;
                panic!("boom");
            });
        }));
        assert!(outcome.is_err());
        assert_eq!(count(&path), 0);
    }

    #[test]
    fn test_ensure_database_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("data.db");
        ensure_database_file(&path).unwrap();
        assert!(path.exists());

        // Existing files are left alone
        std::fs::write(&path, b"").unwrap();
        ensure_database_file(&path).unwrap();
        assert!(path.exists());
    }
}
