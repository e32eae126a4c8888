// Core graph model, canvas interaction and execution simulation for Opsflow

pub mod types;
pub mod error;
pub mod catalog;
pub mod store;
pub mod geometry;
pub mod canvas;
pub mod document;
pub mod events;
pub mod storage;
pub mod workflow;

pub use error::{OpsflowError, Result};
pub use types::*;
