use crate::config::AppState;
use anyhow::{Context, Result};
use opsflow_core::catalog::NodeCatalog;
use opsflow_core::document::WorkflowDocument;
use opsflow_core::storage::{load_workflow, save_workflow, PersistenceSlot};
use opsflow_core::store::{SharedStore, WorkflowStore};
use opsflow_core::workflow::{validate, RunReport, ValidationIssue};
use opsflow_core::{NodeCategory, NodeStatus, NodeType};
use std::path::Path;
use std::sync::Arc;

/// clap value parser for `--category`
pub fn parse_category(value: &str) -> std::result::Result<NodeCategory, String> {
    let wanted = value.trim().to_lowercase();
    NodeCategory::ALL
        .into_iter()
        .find(|c| c.as_str() == wanted)
        .ok_or_else(|| {
            let known: Vec<&str> = NodeCategory::ALL.iter().map(|c| c.as_str()).collect();
            format!("unknown category '{}', expected one of: {}", value, known.join(", "))
        })
}

pub fn status_label(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Idle => "idle",
        NodeStatus::Running => "running",
        NodeStatus::Success => "success",
        NodeStatus::Error => "error",
    }
}

/// Catalog entries matching both filters
pub fn catalog_listing(
    catalog: &NodeCatalog,
    category: Option<NodeCategory>,
    search: Option<&str>,
) -> Vec<Arc<NodeType>> {
    catalog
        .search(search.unwrap_or_default())
        .into_iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .collect()
}

pub fn read_workflow(path: &Path, catalog: &NodeCatalog) -> Result<WorkflowStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
    let document = WorkflowDocument::from_json(&content).context("Failed to parse workflow file")?;
    document
        .into_store(catalog)
        .context("Failed to import workflow")
}

/// Simulate a workflow file; Ctrl-C stops the run and resets every node
pub async fn run_workflow(state: &AppState, path: &Path) -> Result<(RunReport, SharedStore)> {
    let store = read_workflow(path, &state.catalog)?.into_shared();

    let result = {
        let run = state.simulator.run(&store);
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping workflow execution");
                state.simulator.stop(&store);
                run.await
            }
        }
    };
    let report = result.context("Workflow execution failed")?;

    Ok((report, store))
}

pub fn validate_workflow(path: &Path, catalog: &NodeCatalog) -> Result<Vec<ValidationIssue>> {
    let store = read_workflow(path, catalog)?;
    Ok(validate(&store))
}

pub async fn save(state: &AppState, slot: &dyn PersistenceSlot, path: &Path) -> Result<usize> {
    let store = read_workflow(path, &state.catalog)?;
    let snapshot = save_workflow(slot, &store)
        .await
        .context("Failed to save workflow")?;
    Ok(snapshot.nodes.len())
}

/// Saved workflow as a document, if one was saved
pub async fn load(state: &AppState, slot: &dyn PersistenceSlot) -> Result<Option<WorkflowDocument>> {
    let Some(snapshot) = load_workflow(slot, Some(state.catalog.as_ref()))
        .await
        .context("Failed to load workflow")?
    else {
        return Ok(None);
    };

    let mut store = WorkflowStore::new();
    store.restore(snapshot);
    Ok(Some(WorkflowDocument::from_store(&store)))
}
