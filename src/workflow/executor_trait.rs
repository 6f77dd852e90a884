//! Action Executor Interface
//!
//! Defines the `ActionExecutor` trait the orchestrator submits action leaves
//! to. Implementations start the long-running stack operation and, whenever
//! it finishes, complete the submission's token through its callback handle.

use anyhow::Result;
use async_trait::async_trait;

use crate::stack::{CallbackContext, StackAction};

use super::registry::CallbackHandle;
use super::token::InvocationToken;

/// Everything an executor gets for one action leaf
#[derive(Debug, Clone)]
pub struct ActionSubmission {
    /// Token the orchestrator is waiting on
    pub token: InvocationToken,
    /// The action descriptor, unmodified from the plan
    pub action: StackAction,
    /// Where the outcome should be recorded, if the plan says
    pub callback_context: Option<CallbackContext>,
    /// Completes `token`
    pub callback: CallbackHandle,
}

impl ActionSubmission {
    pub fn stack_name(&self) -> &str {
        &self.action.stack_name
    }
}

/// The external side that actually performs stack operations.
///
/// `submit` is fire-and-forget: it should return as soon as the operation has
/// been started. The executor is expected to complete the token exactly once,
/// but the orchestrator tolerates it never calling back or calling back
/// repeatedly.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Get the executor's name (for logging/display)
    fn name(&self) -> &str;

    /// Begin the operation described by `submission`.
    ///
    /// An error here means the operation never started; the orchestrator
    /// resolves the leaf as failed without waiting for a callback.
    async fn submit(&self, submission: ActionSubmission) -> Result<()>;
}
