//! Workflow Orchestrator
//!
//! Recursively interprets a plan tree:
//! 1. Validate the whole tree before anything is dispatched
//! 2. Route each node through the dispatcher
//! 3. Submit action leaves and suspend on their invocation token
//! 4. Fan groups out through the runner, recursing into every child
//! 5. Emit events throughout and fold results back up the tree

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::OrchestratorResult;

use super::dispatcher::{Dispatch, Dispatcher, GroupMode};
use super::executor_trait::{ActionExecutor, ActionSubmission};
use super::registry::CallbackRegistry;
use super::runner::Runner;
use super::token::InvocationToken;
use super::types::{
    child_path, ActionNode, ActionOutcome, ExecutionResult, PlanNode, WorkflowEvent,
};

/// Drives plan trees against one executor.
///
/// Each instance owns its own callback registry, so independent orchestrators
/// never see each other's tokens.
pub struct Orchestrator {
    executor: Arc<dyn ActionExecutor>,
    registry: Arc<CallbackRegistry>,
    event_tx: Option<UnboundedSender<WorkflowEvent>>,
}

impl Orchestrator {
    /// Create an orchestrator with a fresh registry
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            executor,
            registry: Arc::new(CallbackRegistry::new()),
            event_tx: None,
        }
    }

    /// Use an existing registry, e.g. one the executor was built around
    pub fn with_registry(mut self, registry: Arc<CallbackRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Send workflow events to `tx`
    pub fn with_events(mut self, tx: UnboundedSender<WorkflowEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Deliver an executor's completion for `token`.
    ///
    /// Late, duplicate and unknown tokens are ignored and return `false`.
    pub fn complete(&self, token: &InvocationToken, outcome: ActionOutcome) -> bool {
        self.registry.complete(token, outcome)
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Execute a whole plan and return its result tree.
    ///
    /// Only structural problems (a malformed plan, a token collision) are
    /// errors; failed actions come back inside the result.
    pub async fn execute(&self, root: &PlanNode) -> OrchestratorResult<ExecutionResult> {
        root.validate()?;

        let total_actions = root.action_count();
        tracing::info!(
            "Starting workflow: {} actions, depth {}, executor {}",
            total_actions,
            root.depth(),
            self.executor.name()
        );
        self.emit(WorkflowEvent::WorkflowStarted {
            total_actions,
            at: chrono::Utc::now(),
        });

        let result = self.execute_node(root, "$".to_string()).await?;

        self.finish(&result);
        Ok(result)
    }

    /// Execute with an outer deadline.
    ///
    /// On expiry the whole tree resolves as failed. Outstanding waits are
    /// abandoned and their tokens cancelled, so callbacks arriving afterwards
    /// are absorbed. Actions already submitted are not rolled back.
    pub async fn execute_with_deadline(
        &self,
        root: &PlanNode,
        deadline: Duration,
    ) -> OrchestratorResult<ExecutionResult> {
        root.validate()?;
        let start = Instant::now();

        match tokio::time::timeout(deadline, self.execute(root)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Workflow deadline of {}s exceeded, abandoning {} pending callbacks",
                    deadline.as_secs(),
                    self.registry.pending_count()
                );
                let result = ExecutionResult::failed(
                    root.kind(),
                    format!("workflow deadline of {}s exceeded", deadline.as_secs()),
                )
                .with_duration(start.elapsed().as_millis() as u64);
                self.finish(&result);
                Ok(result)
            }
        }
    }

    fn finish(&self, result: &ExecutionResult) {
        let summary = result.summary();
        tracing::info!("Workflow finished: {}", summary);
        self.emit(WorkflowEvent::WorkflowCompleted {
            status: result.status,
            summary,
            at: chrono::Utc::now(),
        });
    }

    /// Execute one node; recursion point for nested groups
    fn execute_node<'a>(
        &'a self,
        node: &'a PlanNode,
        path: String,
    ) -> BoxFuture<'a, OrchestratorResult<ExecutionResult>> {
        async move {
            match Dispatcher::dispatch(node) {
                Dispatch::Resolve => Ok(ExecutionResult::noop()),
                Dispatch::Submit(action) => self.execute_action(action, &path).await,
                Dispatch::Fan {
                    children,
                    bound,
                    mode,
                } => self.execute_group(children, bound, mode, &path).await,
            }
        }
        .boxed()
    }

    async fn execute_action(
        &self,
        node: &ActionNode,
        path: &str,
    ) -> OrchestratorResult<ExecutionResult> {
        let start = Instant::now();
        let stack_name = node.stack_name().to_string();

        // Register before submitting so a fast executor can't complete first
        let token = InvocationToken::mint();
        let waiter = self.registry.register(token.clone())?;

        let submission = ActionSubmission {
            token: token.clone(),
            action: node.action.clone(),
            callback_context: node.callback.clone(),
            callback: self.registry.handle(token.clone()),
        };

        tracing::debug!(
            "Submitting {} of {} at {} (token {})",
            node.action.operation,
            stack_name,
            path,
            token
        );
        self.emit(WorkflowEvent::ActionSubmitted {
            path: path.to_string(),
            stack_name: stack_name.clone(),
            token: token.to_string(),
            at: chrono::Utc::now(),
        });

        let outcome = match self.executor.submit(submission).await {
            Ok(()) => match waiter.wait().await {
                Some(outcome) => outcome,
                None => ActionOutcome::failed("callback cancelled before completion"),
            },
            Err(e) => {
                drop(waiter);
                tracing::warn!("Submitting {} failed: {:#}", stack_name, e);
                ActionOutcome::failed(format!("submit failed: {:#}", e))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let result = ExecutionResult::action(stack_name.clone(), Some(token.to_string()), outcome)
            .with_duration(duration_ms);

        tracing::debug!("Action {} at {} resolved {}", stack_name, path, result.status);
        self.emit(WorkflowEvent::ActionCompleted {
            path: path.to_string(),
            stack_name,
            status: result.status,
            duration_ms,
            at: chrono::Utc::now(),
        });

        Ok(result)
    }

    async fn execute_group<'a>(
        &'a self,
        children: &'a [PlanNode],
        bound: usize,
        mode: GroupMode,
        path: &str,
    ) -> OrchestratorResult<ExecutionResult> {
        self.emit(WorkflowEvent::GroupStarted {
            path: path.to_string(),
            kind: mode.kind(),
            child_count: children.len(),
            max_concurrency: bound,
            at: chrono::Utc::now(),
        });

        let result = Runner::run_all(children, bound, mode, |i, child| {
            self.execute_node(child, child_path(path, i))
        })
        .await?;

        self.emit(WorkflowEvent::GroupCompleted {
            path: path.to_string(),
            kind: mode.kind(),
            status: result.status,
            at: chrono::Utc::now(),
        });

        Ok(result)
    }
}
