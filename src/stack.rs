//! Stack action descriptors
//!
//! These are the payloads an action leaf hands to the executor. The
//! orchestrator never looks inside them beyond the stack name it uses for
//! labels and logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation to perform on a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StackOperation {
    #[default]
    Create,
    Update,
    Delete,
    Upgrade,
}

impl fmt::Display for StackOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackOperation::Create => write!(f, "create"),
            StackOperation::Update => write!(f, "update"),
            StackOperation::Delete => write!(f, "delete"),
            StackOperation::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// A single template parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackParameter {
    #[serde(rename = "ParameterKey")]
    pub key: String,
    #[serde(rename = "ParameterValue")]
    pub value: String,
}

impl StackParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Target stack identity, desired operation and parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackAction {
    #[serde(rename = "Action", default)]
    pub operation: StackOperation,
    #[serde(rename = "StackName")]
    pub stack_name: String,
    #[serde(rename = "TemplateURL", default)]
    pub template_url: String,
    #[serde(rename = "Parameters", default)]
    pub parameters: Vec<StackParameter>,
}

impl StackAction {
    /// Create an action for a stack
    pub fn new(operation: StackOperation, stack_name: impl Into<String>) -> Self {
        Self {
            operation,
            stack_name: stack_name.into(),
            template_url: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Set the template URL
    pub fn with_template(mut self, url: impl Into<String>) -> Self {
        self.template_url = url.into();
        self
    }

    /// Add a template parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(StackParameter::new(key, value));
        self
    }

    /// Look up a parameter value by key
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

/// Where the stack outcome should be recorded once the action completes.
///
/// Opaque to the orchestrator; durability of in-flight plans is layered on
/// top of this by the pipeline service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CallbackContext {
    #[serde(rename = "TableName", default)]
    pub table_name: String,
    #[serde(rename = "ProjectId", default)]
    pub project_id: String,
    #[serde(rename = "Type", default)]
    pub record_type: String,
    #[serde(rename = "AttributeName", default)]
    pub attribute_name: String,
}
