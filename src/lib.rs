// Library exports for stack-orchestrator
// This allows the modules to be imported in tests and external code

pub mod config;
pub mod error;
pub mod stack;
pub mod workflow;

pub use error::{OrchestratorError, OrchestratorResult};
