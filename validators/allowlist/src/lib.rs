//! Direct authorization-database validation.
//!
//! The upload gateway records every legitimately uploaded content
//! identifier in a small redb database. This validator answers batches by
//! reading that database directly. The database handle is opened at the
//! start of each batch and dropped at the end, so the gateway side never
//! competes with a long-lived reader and the per-run connection scoping of
//! the validation contract holds by construction.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use pinion_core::{ContentId, Validator};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};

const AUTHORIZED: TableDefinition<&str, ()> = TableDefinition::new("authorized");

/// Batch validator backed by the gateway's authorization database.
#[derive(Debug, Clone)]
pub struct AllowlistValidator {
    db_path: PathBuf,
}

impl AllowlistValidator {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

#[async_trait]
impl Validator for AllowlistValidator {
    async fn validate_batch(&self, ids: &[ContentId]) -> Result<Vec<bool>> {
        let path = self.db_path.clone();
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        tokio::task::spawn_blocking(move || -> Result<Vec<bool>> {
            // Scoped to this batch: opened here, dropped on return.
            let db = Database::open(&path)?;
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(AUTHORIZED)?;
            let mut verdicts = Vec::with_capacity(ids.len());
            for id in &ids {
                verdicts.push(table.get(id.as_str())?.is_some());
            }
            Ok(verdicts)
        })
        .await
        .map_err(|e| anyhow!("allowlist read task failed: {}", e))?
    }
}

/// Writer-side handle for the authorization database, used by the upload
/// gateway and by tests.
pub struct Allowlist {
    db: Database,
}

impl Allowlist {
    /// Creates the database and the `authorized` table if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Database::create(path.as_ref())?;
        {
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(AUTHORIZED)?;
            }
            write_txn.commit()?;
        }
        Ok(Self { db })
    }

    pub fn insert(&self, id: &ContentId) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUTHORIZED)?;
            table.insert(id.as_str(), ())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn remove(&self, id: &ContentId) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(AUTHORIZED)?;
            table.remove(id.as_str())?.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn verdicts_follow_the_authorization_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authorized.redb");

        let good: ContentId = "Qmgood".parse().unwrap();
        let bad: ContentId = "Qmbad".parse().unwrap();
        {
            let allowlist = Allowlist::open(&path).unwrap();
            allowlist.insert(&good).unwrap();
        }

        let validator = AllowlistValidator::new(&path);
        let verdicts = validator
            .validate_batch(&[good.clone(), bad.clone(), good.clone()])
            .await
            .unwrap();
        assert_eq!(verdicts, vec![true, false, true]);
    }

    #[tokio::test]
    async fn revoked_identifiers_turn_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authorized.redb");

        let id: ContentId = "Qm123".parse().unwrap();
        {
            let allowlist = Allowlist::open(&path).unwrap();
            allowlist.insert(&id).unwrap();
            assert!(allowlist.remove(&id).unwrap());
        }

        let validator = AllowlistValidator::new(&path);
        let verdicts = validator.validate_batch(&[id]).await.unwrap();
        assert_eq!(verdicts, vec![false]);
    }
}
