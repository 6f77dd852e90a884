//! Callback Registry
//!
//! Maps each in-flight invocation token to the branch waiting on it. A token
//! resumes its waiter at most once: the entry is removed on the first
//! completion, and later or unknown completions are dropped silently.
//!
//! Entries never outlive their waiter. Dropping a [`Waiter`] (because its
//! branch was abandoned on a deadline, say) removes the entry, so the table
//! is empty whenever no work is outstanding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::oneshot;

use crate::error::{OrchestratorError, OrchestratorResult};

use super::token::InvocationToken;
use super::types::ActionOutcome;

type PendingMap = HashMap<InvocationToken, oneshot::Sender<ActionOutcome>>;

/// Token table owned by one orchestrator instance
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    pending: Mutex<PendingMap>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PendingMap> {
        // The map stays consistent even if a holder panicked mid-insert
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a pending entry for `token` and return the handle to wait on it
    pub fn register(self: &Arc<Self>, token: InvocationToken) -> OrchestratorResult<Waiter> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.lock();
            if pending.contains_key(&token) {
                return Err(OrchestratorError::DuplicateToken(token.to_string()));
            }
            pending.insert(token.clone(), tx);
        }

        tracing::trace!(token = %token, "registered callback");

        Ok(Waiter {
            token,
            rx,
            registry: Arc::downgrade(self),
        })
    }

    /// Deliver the outcome for `token`.
    ///
    /// Returns `true` if a waiter was resumed. Unknown, late and duplicate
    /// completions return `false` and have no other effect.
    pub fn complete(&self, token: &InvocationToken, outcome: ActionOutcome) -> bool {
        let sender = self.lock().remove(token);
        match sender {
            Some(tx) => {
                let delivered = tx.send(outcome).is_ok();
                if !delivered {
                    tracing::debug!(token = %token, "waiter dropped before completion arrived");
                }
                delivered
            }
            None => {
                tracing::debug!(token = %token, "ignoring completion for unknown token");
                false
            }
        }
    }

    /// Drop the entry for `token` without an outcome; its waiter resumes with `None`
    pub fn cancel(&self, token: &InvocationToken) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Handle an executor can use to complete `token` later
    pub fn handle(self: &Arc<Self>, token: InvocationToken) -> CallbackHandle {
        CallbackHandle {
            token,
            registry: Arc::downgrade(self),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_pending(&self, token: &InvocationToken) -> bool {
        self.lock().contains_key(token)
    }

    /// Tokens currently waiting, in no particular order
    pub fn pending_tokens(&self) -> Vec<InvocationToken> {
        self.lock().keys().cloned().collect()
    }
}

/// The suspended side of a registered token
#[derive(Debug)]
pub struct Waiter {
    token: InvocationToken,
    rx: oneshot::Receiver<ActionOutcome>,
    registry: Weak<CallbackRegistry>,
}

impl Waiter {
    pub fn token(&self) -> &InvocationToken {
        &self.token
    }

    /// Suspend until the token is completed.
    ///
    /// Resolves to `None` if the entry was cancelled instead.
    pub async fn wait(mut self) -> Option<ActionOutcome> {
        (&mut self.rx).await.ok()
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.cancel(&self.token) {
                tracing::debug!(token = %self.token, "abandoned wait, callback cancelled");
            }
        }
    }
}

/// Completion side of a token, handed to the executor with each submission.
///
/// Cloneable so an executor may retry delivery; only the first call counts.
#[derive(Debug, Clone)]
pub struct CallbackHandle {
    token: InvocationToken,
    registry: Weak<CallbackRegistry>,
}

impl CallbackHandle {
    pub fn token(&self) -> &InvocationToken {
        &self.token
    }

    /// Complete the token; `false` if it was already completed or abandoned
    pub fn complete(&self, outcome: ActionOutcome) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.complete(&self.token, outcome),
            None => false,
        }
    }

    pub fn succeed(&self) -> bool {
        self.complete(ActionOutcome::succeeded())
    }

    pub fn fail(&self, error: impl Into<String>) -> bool {
        self.complete(ActionOutcome::failed(error))
    }
}
