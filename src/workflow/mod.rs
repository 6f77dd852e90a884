//! Workflow Orchestration
//!
//! Executes hierarchical plans of long-running stack operations:
//! - Action: submitted to an external executor, completed later by token
//! - Serial: children one at a time, stopping at the first failure
//! - Parallel: children up to a concurrency bound, all of them run
//! - NoOp: succeeds immediately
//!
//! The orchestrator:
//! 1. Parses or receives a plan tree and validates it up front
//! 2. Routes every node through the dispatcher
//! 3. Suspends action branches in the callback registry until completed
//! 4. Aggregates child results into a tree mirroring the plan

pub mod dispatcher;
pub mod executor_trait;
pub mod executors;
pub mod orchestrator;
pub mod parser;
pub mod registry;
pub mod runner;
pub mod token;
pub mod types;

pub use dispatcher::{Dispatch, Dispatcher, GroupMode};
pub use executor_trait::*;
pub use orchestrator::Orchestrator;
pub use parser::PlanParser;
pub use registry::{CallbackHandle, CallbackRegistry, Waiter};
pub use runner::Runner;
pub use token::InvocationToken;
pub use types::*;
