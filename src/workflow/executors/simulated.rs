//! Simulated Executor
//!
//! Pretends to run stack operations: every submission completes after a
//! fixed delay, failing for stacks on the configured failure list. Used for
//! dry runs of plan documents.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::SimulatorConfig;
use crate::workflow::{ActionExecutor, ActionSubmission};

pub struct SimulatedExecutor {
    /// How long each operation "takes"
    delay: Duration,
    /// Stacks whose operation reports failure
    fail_stacks: HashSet<String>,
}

impl SimulatedExecutor {
    /// Executor that succeeds everything after 100ms
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(100),
            fail_stacks: HashSet::new(),
        }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new()
            .with_delay(Duration::from_millis(config.completion_delay_ms))
            .with_failures(config.fail_stacks.iter().cloned())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_failures(mut self, stacks: impl IntoIterator<Item = String>) -> Self {
        self.fail_stacks.extend(stacks);
        self
    }

    pub fn will_fail(&self, stack_name: &str) -> bool {
        self.fail_stacks.contains(stack_name)
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for SimulatedExecutor {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn submit(&self, submission: ActionSubmission) -> Result<()> {
        let delay = self.delay;
        let fail = self.will_fail(submission.stack_name());

        tracing::info!(
            "[simulated] {} {} ({} parameters)",
            submission.action.operation,
            submission.stack_name(),
            submission.action.parameters.len()
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let stack_name = submission.stack_name().to_string();
            let delivered = if fail {
                submission
                    .callback
                    .fail(format!("simulated failure for stack {}", stack_name))
            } else {
                submission.callback.succeed()
            };
            if !delivered {
                tracing::debug!("[simulated] completion for {} was not awaited", stack_name);
            }
        });

        Ok(())
    }
}
