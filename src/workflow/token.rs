//! Invocation tokens
//!
//! A token is minted right before an action is submitted and consumed by the
//! one completion that resumes the waiting branch.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationToken(String);

impl InvocationToken {
    /// Mint a fresh, globally unique token
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvocationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tokens echoed back by an external system arrive as plain strings
impl From<String> for InvocationToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for InvocationToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
