use crate::catalog::NodeCatalog;
use crate::error::Result;
use crate::store::WorkflowStore;
use crate::types::WorkflowSnapshot;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key the editor saves its single workflow under
pub const WORKFLOW_KEY: &str = "opsflow.workflow";

/// Keyed byte storage for saved workflows
#[async_trait]
pub trait PersistenceSlot: Send + Sync {
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// Slot that lives only as long as the process
#[derive(Default)]
pub struct MemorySlot {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceSlot for MemorySlot {
    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Save the store's nodes and connections as a JSON snapshot
pub async fn save_workflow(
    slot: &dyn PersistenceSlot,
    store: &WorkflowStore,
) -> Result<WorkflowSnapshot> {
    let snapshot = store.snapshot();
    let bytes = serde_json::to_vec(&snapshot)?;
    slot.put(WORKFLOW_KEY, Bytes::from(bytes)).await?;

    tracing::info!(
        "Saved workflow: {} nodes, {} connections",
        snapshot.nodes.len(),
        snapshot.connections.len()
    );
    Ok(snapshot)
}

/// Load the saved snapshot, if any
///
/// With a catalog, nodes whose embedded type matches a catalog entry are
/// relinked to the shared catalog descriptor.
pub async fn load_workflow(
    slot: &dyn PersistenceSlot,
    catalog: Option<&NodeCatalog>,
) -> Result<Option<WorkflowSnapshot>> {
    let Some(bytes) = slot.get(WORKFLOW_KEY).await? else {
        tracing::debug!("No saved workflow under {}", WORKFLOW_KEY);
        return Ok(None);
    };

    let mut snapshot: WorkflowSnapshot = serde_json::from_slice(&bytes)?;
    if let Some(catalog) = catalog {
        catalog.share_types(&mut snapshot.nodes);
    }

    tracing::info!(
        "Loaded workflow saved at {}: {} nodes",
        snapshot.saved_at,
        snapshot.nodes.len()
    );
    Ok(Some(snapshot))
}
