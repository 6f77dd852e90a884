//! Structural errors raised by the workflow orchestrator.
//!
//! Action failures are never errors: they travel up the tree as
//! [`ExecutionResult`](crate::workflow::ExecutionResult) data. Only defects in
//! the submitted plan or in the orchestrator itself end up here.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// Unknown node kind or an invariant violation in the input tree
    #[error("malformed plan at {path}: {reason}")]
    MalformedPlan { path: String, reason: String },

    /// Two in-flight waits were minted with the same token
    #[error("duplicate invocation token: {0}")]
    DuplicateToken(String),
}

impl OrchestratorError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::MalformedPlan {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error points at the caller's plan rather than the orchestrator
    pub fn is_plan_error(&self) -> bool {
        matches!(self, OrchestratorError::MalformedPlan { .. })
    }
}

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
