use anyhow::Result;
use async_trait::async_trait;
use stack_orchestrator::stack::{StackAction, StackOperation};
use stack_orchestrator::workflow::{
    ActionExecutor, ActionSubmission, CallbackRegistry, ExecutionResult, Orchestrator, PlanNode,
};
use stack_orchestrator::OrchestratorResult;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Executor that hands every submission to the test.
///
/// Nothing completes until the test calls back through the submission's
/// handle, so completion order is fully under test control.
pub struct ManualExecutor {
    registry: Arc<CallbackRegistry>,
    tx: mpsc::UnboundedSender<ActionSubmission>,
    submitted: AtomicUsize,
    max_pending: AtomicUsize,
    rejected: Mutex<HashSet<String>>,
}

impl ManualExecutor {
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Highest number of outstanding tokens seen at any submission
    pub fn max_pending(&self) -> usize {
        self.max_pending.load(Ordering::SeqCst)
    }

    /// Make `submit` return an error for `stack_name`
    pub fn reject(&self, stack_name: &str) {
        self.rejected.lock().unwrap().insert(stack_name.to_string());
    }
}

#[async_trait]
impl ActionExecutor for ManualExecutor {
    fn name(&self) -> &str {
        "manual"
    }

    async fn submit(&self, submission: ActionSubmission) -> Result<()> {
        if self.rejected.lock().unwrap().contains(submission.stack_name()) {
            anyhow::bail!("stack {} rejected", submission.stack_name());
        }

        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.max_pending
            .fetch_max(self.registry.pending_count(), Ordering::SeqCst);
        self.tx.send(submission)?;
        Ok(())
    }
}

/// Orchestrator wired to a manual executor, plus the submission feed
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub executor: Arc<ManualExecutor>,
    pub registry: Arc<CallbackRegistry>,
    pub submissions: mpsc::UnboundedReceiver<ActionSubmission>,
}

impl Harness {
    pub fn new() -> Self {
        let registry = Arc::new(CallbackRegistry::new());
        let (tx, submissions) = mpsc::unbounded_channel();
        let executor = Arc::new(ManualExecutor {
            registry: registry.clone(),
            tx,
            submitted: AtomicUsize::new(0),
            max_pending: AtomicUsize::new(0),
            rejected: Mutex::new(HashSet::new()),
        });
        let orchestrator = Arc::new(
            Orchestrator::new(executor.clone() as Arc<dyn ActionExecutor>)
                .with_registry(registry.clone()),
        );

        Self {
            orchestrator,
            executor,
            registry,
            submissions,
        }
    }

    /// Start executing `plan` in the background
    pub fn spawn(&self, plan: PlanNode) -> JoinHandle<OrchestratorResult<ExecutionResult>> {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move { orchestrator.execute(&plan).await })
    }

    /// Wait for the next submission, failing the test if none arrives
    pub async fn next_submission(&mut self) -> ActionSubmission {
        tokio::time::timeout(Duration::from_secs(2), self.submissions.recv())
            .await
            .expect("timed out waiting for a submission")
            .expect("submission channel closed")
    }

    /// Assert nothing else has been submitted after letting the plan settle
    pub async fn assert_no_submission(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(submission) = self.submissions.try_recv() {
            panic!("unexpected submission of {}", submission.stack_name());
        }
    }
}

/// Create-action leaf for `name`
pub fn stack(name: &str) -> PlanNode {
    PlanNode::action(StackAction::new(StackOperation::Create, name))
}

/// Path to the built CLI binary
pub fn orchestrator_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stack-orchestrator"))
}

/// Convert command output to string for easier testing
pub fn output_to_string(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_to_string(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
