pub mod graph;
pub mod simulator;
pub mod sources;
pub mod validate;

pub use graph::WorkflowGraph;
pub use simulator::{ExecutionSimulator, RunReport, SimulatorConfig};
pub use sources::{
    DelaySource, FixedDelay, Outcome, OutcomeSource, RandomOutcome, ScriptedOutcomes, UniformDelay,
};
pub use validate::{validate, ValidationIssue};
