//! Group Runner
//!
//! Drives the children of a serial or parallel group and folds their results
//! into one. Children are run through a caller-supplied function, which is how
//! the orchestrator recurses into nested groups.
//!
//! - Serial: strictly in order, stopping at the first failed child
//! - Parallel: at most `bound` children in flight; a failure never cancels
//!   siblings and queued children still start
//!
//! Results always come back in plan order.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::time::Instant;

use crate::error::OrchestratorResult;

use super::dispatcher::GroupMode;
use super::types::{ExecutionResult, PlanNode};

pub struct Runner;

impl Runner {
    /// Run `children` under `bound` and aggregate their results.
    ///
    /// A `bound` of zero is treated as one. Structural errors from a child
    /// abort the group; any children still in flight are dropped.
    pub async fn run_all<'a, F>(
        children: &'a [PlanNode],
        bound: usize,
        mode: GroupMode,
        run_child: F,
    ) -> OrchestratorResult<ExecutionResult>
    where
        F: Fn(usize, &'a PlanNode) -> BoxFuture<'a, OrchestratorResult<ExecutionResult>> + Sync,
    {
        let start = Instant::now();

        let result = match mode {
            GroupMode::Serial => Self::run_serial(children, &run_child).await?,
            GroupMode::Parallel => Self::run_parallel(children, bound.max(1), &run_child).await?,
        };

        Ok(result.with_duration(start.elapsed().as_millis() as u64))
    }

    async fn run_serial<'a, F>(
        children: &'a [PlanNode],
        run_child: &F,
    ) -> OrchestratorResult<ExecutionResult>
    where
        F: Fn(usize, &'a PlanNode) -> BoxFuture<'a, OrchestratorResult<ExecutionResult>> + Sync,
    {
        let mut results = Vec::with_capacity(children.len());

        for (i, child) in children.iter().enumerate() {
            let result = run_child(i, child).await?;
            let failed = !result.is_success();
            results.push(result);

            if failed {
                tracing::debug!(
                    "serial child {} failed, skipping {} remaining",
                    i,
                    children.len() - i - 1
                );
                break;
            }
        }

        Ok(ExecutionResult::group(
            GroupMode::Serial.kind(),
            results,
            children.len(),
        ))
    }

    async fn run_parallel<'a, F>(
        children: &'a [PlanNode],
        bound: usize,
        run_child: &F,
    ) -> OrchestratorResult<ExecutionResult>
    where
        F: Fn(usize, &'a PlanNode) -> BoxFuture<'a, OrchestratorResult<ExecutionResult>> + Sync,
    {
        let mut slots: Vec<Option<ExecutionResult>> = (0..children.len()).map(|_| None).collect();

        // buffer_unordered only polls `bound` futures at a time, and a child
        // future does nothing (dispatches nothing) until it is polled
        let mut in_flight = stream::iter(children.iter().enumerate())
            .map(|(i, child)| {
                let fut = run_child(i, child);
                async move { (i, fut.await) }
            })
            .buffer_unordered(bound)
            .boxed();

        while let Some((i, result)) = in_flight.next().await {
            slots[i] = Some(result?);
        }

        let results: Vec<ExecutionResult> = slots.into_iter().flatten().collect();
        Ok(ExecutionResult::group(
            GroupMode::Parallel.kind(),
            results,
            children.len(),
        ))
    }
}
