//! Node classification
//!
//! Keeps the orchestrator's recursion uniform: every node is first turned
//! into one of three routes, and only the route decides what happens next.

use super::types::{ActionNode, NodeKind, PlanNode};

/// How a group's children are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// One at a time, stop at the first failure
    Serial,
    /// Up to the bound at a time, every child runs
    Parallel,
}

impl GroupMode {
    pub fn kind(&self) -> NodeKind {
        match self {
            GroupMode::Serial => NodeKind::Serial,
            GroupMode::Parallel => NodeKind::Parallel,
        }
    }
}

/// Route chosen for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch<'a> {
    /// Hand the action to the executor and wait for its token
    Submit(&'a ActionNode),
    /// Run the children through the runner
    Fan {
        children: &'a [PlanNode],
        bound: usize,
        mode: GroupMode,
    },
    /// Nothing to do, succeed immediately
    Resolve,
}

pub struct Dispatcher;

impl Dispatcher {
    pub fn dispatch(node: &PlanNode) -> Dispatch<'_> {
        match node {
            PlanNode::Action(action) => Dispatch::Submit(action),
            PlanNode::Serial(children) => Dispatch::Fan {
                children,
                bound: 1,
                mode: GroupMode::Serial,
            },
            PlanNode::Parallel {
                children,
                max_concurrency,
            } => Dispatch::Fan {
                children,
                bound: (*max_concurrency).max(1),
                mode: GroupMode::Parallel,
            },
            PlanNode::NoOp => Dispatch::Resolve,
        }
    }
}
