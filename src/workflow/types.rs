//! Workflow Types
//!
//! The plan tree handed to the orchestrator, the result tree it hands back,
//! and the events emitted while a plan runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::stack::{CallbackContext, StackAction};

/// Default bound for parallel groups that don't specify one
pub const DEFAULT_MAX_CONCURRENCY: usize = 40;

/// Kind of a plan node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Action,
    Serial,
    Parallel,
    NoOp,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Action => write!(f, "Action"),
            NodeKind::Serial => write!(f, "Serial"),
            NodeKind::Parallel => write!(f, "Parallel"),
            NodeKind::NoOp => write!(f, "NoOp"),
        }
    }
}

/// A single action leaf: what to run and where its outcome goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionNode {
    pub action: StackAction,
    pub callback: Option<CallbackContext>,
}

impl ActionNode {
    pub fn new(action: StackAction) -> Self {
        Self {
            action,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: CallbackContext) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn stack_name(&self) -> &str {
        &self.action.stack_name
    }
}

/// One node of an execution plan.
///
/// Trees may nest arbitrarily: a parallel group of serial groups of actions,
/// and so on. The orchestrator only ever reads a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    Action(ActionNode),
    Serial(Vec<PlanNode>),
    Parallel {
        children: Vec<PlanNode>,
        max_concurrency: usize,
    },
    NoOp,
}

impl PlanNode {
    /// Action leaf without a callback destination
    pub fn action(action: StackAction) -> Self {
        PlanNode::Action(ActionNode::new(action))
    }

    /// Action leaf reporting to a callback destination
    pub fn action_with_callback(action: StackAction, callback: CallbackContext) -> Self {
        PlanNode::Action(ActionNode::new(action).with_callback(callback))
    }

    pub fn serial(children: Vec<PlanNode>) -> Self {
        PlanNode::Serial(children)
    }

    pub fn parallel(children: Vec<PlanNode>, max_concurrency: usize) -> Self {
        PlanNode::Parallel {
            children,
            max_concurrency,
        }
    }

    pub fn noop() -> Self {
        PlanNode::NoOp
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            PlanNode::Action(_) => NodeKind::Action,
            PlanNode::Serial(_) => NodeKind::Serial,
            PlanNode::Parallel { .. } => NodeKind::Parallel,
            PlanNode::NoOp => NodeKind::NoOp,
        }
    }

    /// Direct children (empty for leaves)
    pub fn children(&self) -> &[PlanNode] {
        match self {
            PlanNode::Serial(children) | PlanNode::Parallel { children, .. } => children,
            PlanNode::Action(_) | PlanNode::NoOp => &[],
        }
    }

    /// Number of action leaves in the tree
    pub fn action_count(&self) -> usize {
        match self {
            PlanNode::Action(_) => 1,
            PlanNode::NoOp => 0,
            _ => self.children().iter().map(PlanNode::action_count).sum(),
        }
    }

    /// Depth of the tree, a lone leaf being 1
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(PlanNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Check the structural invariants of the whole tree.
    ///
    /// Run before anything is dispatched so a bad plan never starts partially.
    pub fn validate(&self) -> OrchestratorResult<()> {
        self.validate_at("$")
    }

    fn validate_at(&self, path: &str) -> OrchestratorResult<()> {
        match self {
            PlanNode::Action(node) => {
                if node.stack_name().trim().is_empty() {
                    return Err(OrchestratorError::malformed(
                        path,
                        "action has an empty stack name",
                    ));
                }
                Ok(())
            }
            PlanNode::NoOp => Ok(()),
            PlanNode::Serial(children) | PlanNode::Parallel { children, .. } => {
                for (i, child) in children.iter().enumerate() {
                    child.validate_at(&child_path(path, i))?;
                }
                Ok(())
            }
        }
    }
}

/// Location of the `index`th child under `parent`, in plan document notation
pub fn child_path(parent: &str, index: usize) -> String {
    format!("{}.Data[{}]", parent, index)
}

/// Terminal status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ExecutionStatus::Succeeded => "✓",
            ExecutionStatus::Failed => "✗",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Succeeded => write!(f, "Succeeded"),
            ExecutionStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// What an executor reports when it completes a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub status: ExecutionStatus,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn succeeded() -> Self {
        Self {
            status: ExecutionStatus::Succeeded,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Outcome of one node, with child outcomes for groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Kind of node this result belongs to
    pub kind: NodeKind,
    /// Whether the subtree succeeded
    pub status: ExecutionStatus,
    /// Stack name for actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Invocation token the action waited on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Error detail if failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Child results in plan order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExecutionResult>,
    /// Wall-clock time spent on the subtree
    #[serde(default)]
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Result of a no-op node
    pub fn noop() -> Self {
        Self {
            kind: NodeKind::NoOp,
            status: ExecutionStatus::Succeeded,
            label: None,
            token: None,
            error: None,
            children: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Result of an action leaf from the outcome delivered for its token
    pub fn action(label: impl Into<String>, token: Option<String>, outcome: ActionOutcome) -> Self {
        Self {
            kind: NodeKind::Action,
            status: outcome.status,
            label: Some(label.into()),
            token,
            error: outcome.error,
            children: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Aggregate of a group: failed if any child failed.
    ///
    /// `total` is the planned child count; fewer results means a serial group
    /// stopped early.
    pub fn group(kind: NodeKind, children: Vec<ExecutionResult>, total: usize) -> Self {
        let failed = children.iter().filter(|c| !c.is_success()).count();
        let status = if failed == 0 {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Failed
        };
        let error = if failed == 0 {
            None
        } else if children.len() < total {
            Some(format!(
                "stopped after {} of {} children; {} failed",
                children.len(),
                total,
                failed
            ))
        } else {
            Some(format!("{} of {} children failed", failed, total))
        };

        Self {
            kind,
            status,
            label: None,
            token: None,
            error,
            children,
            duration_ms: 0,
        }
    }

    /// Whole-tree failure, e.g. when the outer deadline expires
    pub fn failed(kind: NodeKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            status: ExecutionStatus::Failed,
            label: None,
            token: None,
            error: Some(error.into()),
            children: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Statuses of the direct children, in plan order
    pub fn child_statuses(&self) -> Vec<ExecutionStatus> {
        self.children.iter().map(|c| c.status).collect()
    }

    /// All action results in the tree, depth first
    pub fn actions(&self) -> Vec<&ExecutionResult> {
        let mut out = Vec::new();
        self.collect_actions(&mut out);
        out
    }

    fn collect_actions<'a>(&'a self, out: &mut Vec<&'a ExecutionResult>) {
        if self.kind == NodeKind::Action {
            out.push(self);
        }
        for child in &self.children {
            child.collect_actions(out);
        }
    }

    /// Stack names of failed actions
    pub fn failed_stacks(&self) -> Vec<&str> {
        self.actions()
            .into_iter()
            .filter(|r| !r.is_success())
            .filter_map(|r| r.label.as_deref())
            .collect()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let actions = self.actions();
        let failed = actions.iter().filter(|r| !r.is_success()).count();
        format!(
            "{} {}: {}/{} actions succeeded ({} failed) in {}ms",
            self.status.icon(),
            self.status,
            actions.len() - failed,
            actions.len(),
            failed,
            self.duration_ms
        )
    }
}

/// Events emitted while a plan executes
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// Root execution started
    WorkflowStarted {
        total_actions: usize,
        at: DateTime<Utc>,
    },
    /// A group started running its children
    GroupStarted {
        path: String,
        kind: NodeKind,
        child_count: usize,
        max_concurrency: usize,
        at: DateTime<Utc>,
    },
    /// An action was handed to the executor
    ActionSubmitted {
        path: String,
        stack_name: String,
        token: String,
        at: DateTime<Utc>,
    },
    /// An action's token was completed (or its submission failed)
    ActionCompleted {
        path: String,
        stack_name: String,
        status: ExecutionStatus,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    /// A group resolved
    GroupCompleted {
        path: String,
        kind: NodeKind,
        status: ExecutionStatus,
        at: DateTime<Utc>,
    },
    /// Root execution resolved
    WorkflowCompleted {
        status: ExecutionStatus,
        summary: String,
        at: DateTime<Utc>,
    },
}
