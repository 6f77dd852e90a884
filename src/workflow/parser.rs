//! Plan document parsing
//!
//! Turns the JSON plans produced by the pipeline service into [`PlanNode`]
//! trees. Every error names the offending node as a path like
//! `$.Data[1].Data[0]`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::stack::{CallbackContext, StackAction};

use super::types::{child_path, ActionNode, PlanNode, DEFAULT_MAX_CONCURRENCY};

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Data", default)]
    data: Value,
    #[serde(rename = "MaxConcurrency", default)]
    max_concurrency: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawStack {
    #[serde(rename = "Input")]
    input: StackAction,
    #[serde(rename = "Callback", default)]
    callback: Option<CallbackContext>,
}

/// Parser for plan documents
#[derive(Debug, Clone, Copy)]
pub struct PlanParser {
    default_max_concurrency: usize,
}

impl Default for PlanParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl PlanParser {
    /// `default_max_concurrency` applies to parallel groups without a bound
    pub fn new(default_max_concurrency: usize) -> Self {
        Self {
            default_max_concurrency: default_max_concurrency.max(1),
        }
    }

    pub fn parse_str(&self, json: &str) -> OrchestratorResult<PlanNode> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| OrchestratorError::malformed("$", format!("invalid JSON: {}", e)))?;
        self.parse_value(value)
    }

    /// Parse and validate a whole plan
    pub fn parse_value(&self, value: Value) -> OrchestratorResult<PlanNode> {
        let plan = self.parse_node(value, "$")?;
        plan.validate()?;
        Ok(plan)
    }

    fn parse_node(&self, value: Value, path: &str) -> OrchestratorResult<PlanNode> {
        let raw: RawNode = serde_json::from_value(value)
            .map_err(|e| OrchestratorError::malformed(path, e.to_string()))?;

        match raw.kind.as_str() {
            "Stack" => {
                let stack: RawStack = serde_json::from_value(raw.data)
                    .map_err(|e| OrchestratorError::malformed(path, format!("invalid stack data: {}", e)))?;
                let mut node = ActionNode::new(stack.input);
                node.callback = stack.callback;
                Ok(PlanNode::Action(node))
            }
            "Serial" => Ok(PlanNode::serial(self.parse_children(raw.data, path)?)),
            "Parallel" => {
                let max_concurrency = match raw.max_concurrency {
                    Some(n) if n <= 0 => 1,
                    Some(n) => n as usize,
                    None => self.default_max_concurrency,
                };
                Ok(PlanNode::parallel(
                    self.parse_children(raw.data, path)?,
                    max_concurrency,
                ))
            }
            "Pass" => Ok(PlanNode::noop()),
            other => Err(OrchestratorError::malformed(
                path,
                format!("unknown node type '{}'", other),
            )),
        }
    }

    fn parse_children(&self, data: Value, path: &str) -> OrchestratorResult<Vec<PlanNode>> {
        match data {
            // A group with no Data is an empty group
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| self.parse_node(item, &child_path(path, i)))
                .collect(),
            _ => Err(OrchestratorError::malformed(
                path,
                "group Data must be an array of nodes",
            )),
        }
    }
}

impl PlanNode {
    /// Parse a plan document using the default parallel bound
    pub fn from_json_str(json: &str) -> OrchestratorResult<Self> {
        PlanParser::default().parse_str(json)
    }
}
