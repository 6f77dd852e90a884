//! Integration tests for stack-orchestrator
//!
//! These tests drive whole plans through the orchestrator with an executor
//! the test controls, and exercise the CLI end to end.

// Test utilities and common setup
mod common;

mod cli_tests;
mod registry_tests;

// Re-export common utilities for use by test modules
pub use common::*;
