use super::slot::PersistenceSlot;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const WORKFLOWS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("workflows");

/// Persistence slot backed by a redb file
#[derive(Clone)]
pub struct RedbSlot {
    db: Arc<Database>,
}

impl RedbSlot {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(redb::Error::from)?;

        // Create the table up front so reads never see it missing
        let write_txn = db.begin_write().map_err(redb::Error::from)?;
        {
            let _workflows = write_txn
                .open_table(WORKFLOWS_TABLE)
                .map_err(redb::Error::from)?;
        }
        write_txn.commit().map_err(redb::Error::from)?;

        tracing::debug!("Opened workflow slot at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl PersistenceSlot for RedbSlot {
    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = write_txn
                .open_table(WORKFLOWS_TABLE)
                .map_err(redb::Error::from)?;
            table
                .insert(key, &value[..])
                .map_err(redb::Error::from)?;
        }
        write_txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let read_txn = self.db.begin_read().map_err(redb::Error::from)?;
        let table = read_txn
            .open_table(WORKFLOWS_TABLE)
            .map_err(redb::Error::from)?;

        let value = table.get(key).map_err(redb::Error::from)?;
        Ok(value.map(|guard| Bytes::copy_from_slice(guard.value())))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = write_txn
                .open_table(WORKFLOWS_TABLE)
                .map_err(redb::Error::from)?;
            table.remove(key).map_err(redb::Error::from)?;
        }
        write_txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NodeCatalog;
    use crate::storage::{load_workflow, save_workflow};
    use crate::store::WorkflowStore;
    use crate::types::Point;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let slot = RedbSlot::new(temp_dir.path().join("slots.redb")).unwrap();

        assert!(slot.get("missing").await.unwrap().is_none());

        slot.put("a", Bytes::from_static(b"first")).await.unwrap();
        slot.put("a", Bytes::from_static(b"second")).await.unwrap();
        assert_eq!(slot.get("a").await.unwrap().unwrap(), Bytes::from_static(b"second"));

        slot.remove("a").await.unwrap();
        assert!(slot.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_workflow_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("workflows.redb");
        let catalog = NodeCatalog::builtin().unwrap();

        let mut store = WorkflowStore::new();
        let trigger = store
            .add_node(catalog.get("schedule-trigger").unwrap(), Point::new(0.0, 0.0))
            .id;
        let backup = store
            .add_node(catalog.get("postgresql").unwrap(), Point::new(250.0, 0.0))
            .id;
        store.add_connection(&trigger, 0, &backup, 0);

        {
            let slot = RedbSlot::new(&path).unwrap();
            save_workflow(&slot, &store).await.unwrap();
        }

        let slot = RedbSlot::new(&path).unwrap();
        let snapshot = load_workflow(&slot, Some(&catalog)).await.unwrap().unwrap();
        assert_eq!(snapshot.nodes, store.nodes());
        assert_eq!(snapshot.connections, store.connections());
    }
}
