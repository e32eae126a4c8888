pub mod redb_slot;
pub mod slot;

pub use redb_slot::RedbSlot;
pub use slot::{load_workflow, save_workflow, MemorySlot, PersistenceSlot, WORKFLOW_KEY};
