use stack_orchestrator::workflow::{
    ActionOutcome, CallbackRegistry, ExecutionStatus, InvocationToken,
};
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_completions_resume_exactly_once() {
    let registry = Arc::new(CallbackRegistry::new());
    let token = InvocationToken::mint();
    let waiter = registry.register(token.clone()).unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let handle = registry.handle(token.clone());
        tasks.push(tokio::spawn(async move {
            handle.fail(format!("attempt {}", i))
        }));
    }

    let mut delivered = 0;
    for task in tasks {
        if task.await.unwrap() {
            delivered += 1;
        }
    }

    assert_eq!(delivered, 1);
    let outcome = waiter.wait().await.unwrap();
    assert_eq!(outcome.status, ExecutionStatus::Failed);
    assert!(outcome.error.unwrap().starts_with("attempt "));
    assert_eq!(registry.pending_count(), 0);
}

#[tokio::test]
async fn test_completion_from_plain_thread() {
    let registry = Arc::new(CallbackRegistry::new());
    let token = InvocationToken::mint();
    let waiter = registry.register(token.clone()).unwrap();

    let handle = registry.handle(token);
    let completer = std::thread::spawn(move || handle.succeed());

    let outcome = waiter.wait().await.unwrap();
    assert!(completer.join().unwrap());
    assert_eq!(outcome, ActionOutcome::succeeded());
}

#[tokio::test]
async fn test_abandoned_waits_leave_no_entries() {
    let registry = Arc::new(CallbackRegistry::new());
    let tokens: Vec<_> = (0..5).map(|_| InvocationToken::mint()).collect();

    let waiters: Vec<_> = tokens
        .iter()
        .map(|t| registry.register(t.clone()).unwrap())
        .collect();
    assert_eq!(registry.pending_count(), 5);

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        futures::future::join_all(waiters.into_iter().map(|w| w.wait())),
    )
    .await;

    assert!(timed_out.is_err());
    assert_eq!(registry.pending_count(), 0);
    for token in &tokens {
        assert!(!registry.complete(token, ActionOutcome::succeeded()));
    }
}
