use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use opsflow_core::NodeCategory;
use std::path::PathBuf;

mod commands;
mod config;

use config::{AppState, OpsflowConfig};

#[derive(Parser, Debug)]
#[command(name = "opsflow")]
#[command(about = "Design and dry-run operations workflows", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "OPSFLOW_CONFIG", default_value = "opsflow.toml")]
    config: PathBuf,

    /// Data directory for storage
    #[arg(short, long, env = "OPSFLOW_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available node types
    Catalog {
        #[arg(long, value_parser = commands::parse_category)]
        category: Option<NodeCategory>,

        /// Case-insensitive match on name, description or category
        #[arg(long)]
        search: Option<String>,
    },

    /// Simulate a workflow file
    Run { workflow: PathBuf },

    /// Report structural and configuration problems in a workflow file
    Validate { workflow: PathBuf },

    /// Store a workflow file in the persistent slot
    Save { workflow: PathBuf },

    /// Print the saved workflow
    Load {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsflow=info,opsflow_core=info".into()),
        )
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::debug!("Data directory: {}", args.data_dir.display());

    let config = OpsflowConfig::load(&args.config, args.data_dir)?;
    let state = AppState::new(config)?;

    match args.command {
        Command::Catalog { category, search } => {
            for node_type in commands::catalog_listing(&state.catalog, category, search.as_deref())
            {
                println!(
                    "{:<18} {:<22} {:<11} in={} out={}",
                    node_type.id,
                    node_type.name,
                    node_type.category.as_str(),
                    node_type.inputs,
                    node_type.outputs
                );
            }
        }

        Command::Run { workflow } => {
            let (report, store) = commands::run_workflow(&state, &workflow).await?;

            for line in state.events.log_lines().await {
                println!("{}", line);
            }
            for node in store.lock().nodes() {
                println!(
                    "  {:<24} {:<18} {}",
                    node.id.to_string(),
                    node.node_type.id,
                    commands::status_label(node.status)
                );
            }

            if report.no_trigger {
                println!("No trigger node found, nothing was executed");
            } else {
                println!(
                    "{} succeeded, {} failed{}",
                    report.succeeded(),
                    report.failed(),
                    if report.cancelled { " (stopped)" } else { "" }
                );
            }
        }

        Command::Validate { workflow } => {
            let issues = commands::validate_workflow(&workflow, &state.catalog)?;
            if issues.is_empty() {
                println!("No problems found");
            }
            for issue in &issues {
                println!("- {}", issue);
            }
            if issues.iter().any(|i| i.is_blocking()) {
                bail!("Workflow cannot run");
            }
        }

        Command::Save { workflow } => {
            let slot = state.open_slot()?;
            let count = commands::save(&state, &slot, &workflow).await?;
            println!("Saved {} nodes from {}", count, workflow.display());
        }

        Command::Load { output } => {
            let slot = state.open_slot()?;
            let Some(document) = commands::load(&state, &slot).await? else {
                bail!("No saved workflow");
            };

            let json = document.to_json_pretty()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
