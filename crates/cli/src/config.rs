use anyhow::{Context, Result};
use opsflow_core::catalog::NodeCatalog;
use opsflow_core::events::MemoryEventLog;
use opsflow_core::storage::RedbSlot;
use opsflow_core::workflow::{ExecutionSimulator, SimulatorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsflowConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_slot_file")]
    pub slot_file: String,
}

fn default_slot_file() -> String {
    "workflows.redb".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            slot_file: default_slot_file(),
        }
    }
}

impl OpsflowConfig {
    pub fn load(config_path: &Path, data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        // Load config file if it exists, otherwise use defaults
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self {
                data_dir: data_dir.clone(),
                simulator: SimulatorConfig::default(),
                storage: StorageConfig::default(),
            }
        };

        config.data_dir = data_dir;

        Ok(config)
    }

    /// Get the workflow slot file path
    pub fn slot_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.slot_file)
    }
}

/// Everything a command needs, built once from the configuration
pub struct AppState {
    pub catalog: Arc<NodeCatalog>,
    pub events: Arc<MemoryEventLog>,
    pub simulator: Arc<ExecutionSimulator>,
    config: OpsflowConfig,
}

impl AppState {
    pub fn new(config: OpsflowConfig) -> Result<Self> {
        let catalog =
            Arc::new(NodeCatalog::builtin().context("Failed to load built-in node catalog")?);
        let events = Arc::new(MemoryEventLog::new());
        let simulator = Arc::new(ExecutionSimulator::new(&config.simulator, events.clone()));

        Ok(Self {
            catalog,
            events,
            simulator,
            config,
        })
    }

    /// Open the persistent slot; only commands that save or load need it
    pub fn open_slot(&self) -> Result<RedbSlot> {
        RedbSlot::new(self.config.slot_path()).context("Failed to open workflow slot")
    }
}
