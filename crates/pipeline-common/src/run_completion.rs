use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::CancellationToken;

/// Errors a stage can fail with.
pub trait StageError: std::error::Error + Send + Sync + 'static {
    /// True when the stage stopped because it observed cancellation rather
    /// than because something went wrong.
    fn is_cancellation(&self) -> bool;
}

/// Unified completion error for a set of stage tasks.
#[derive(Debug)]
pub enum RunCompletionError<E> {
    /// A stage failed on its own; this is the root cause of the run's failure.
    Stage { stage: &'static str, source: E },
    /// A stage task panicked.
    Panicked { stage: &'static str, message: String },
    /// Every failing stage stopped because of cancellation.
    Cancelled,
}

impl<E: std::fmt::Display> std::fmt::Display for RunCompletionError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stage { stage, source } => write!(f, "stage `{stage}` failed: {source}"),
            Self::Panicked { stage, message } => write!(f, "stage `{stage}` panicked: {message}"),
            Self::Cancelled => write!(f, "run cancelled"),
        }
    }
}

/// A spawned stage together with its name.
pub struct StageHandle<T, E> {
    pub stage: &'static str,
    handle: JoinHandle<Result<T, E>>,
}

/// Spawn a stage on the current runtime.
///
/// A stage that fails for any reason other than cancellation cancels `token`
/// so its sibling stages unwind instead of waiting on queues that will never
/// be fed or drained again. A panicking stage cancels it too.
pub fn spawn_stage<T, E, F>(
    stage: &'static str,
    token: CancellationToken,
    fut: F,
) -> StageHandle<T, E>
where
    T: Send + 'static,
    E: StageError,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        // Fires only if `fut` unwinds.
        let guard = token.clone().drop_guard();
        let result = fut.await;
        let _ = guard.disarm();
        if let Err(e) = &result {
            if e.is_cancellation() {
                debug!(stage, "Stage stopped on cancellation");
            } else {
                error!(stage, error = %e, "Stage failed, cancelling run");
                token.cancel();
            }
        }
        result
    });
    StageHandle { stage, handle }
}

/// Wait for all stages and resolve the run outcome deterministically.
///
/// Semantics:
/// - If every stage succeeded, return their outputs in spawn order.
/// - Otherwise return the first stage failure that is not a cancellation.
/// - A panic counts as a failure.
/// - If all failures were cancellations, return `Cancelled`.
pub async fn settle_run<T, E: StageError>(
    stages: Vec<StageHandle<T, E>>,
) -> Result<Vec<(&'static str, T)>, RunCompletionError<E>> {
    let mut outputs = Vec::with_capacity(stages.len());
    let mut first_failure: Option<RunCompletionError<E>> = None;
    let mut cancelled = false;

    for StageHandle { stage, handle } in stages {
        match handle.await {
            Ok(Ok(output)) => outputs.push((stage, output)),
            Ok(Err(err)) if err.is_cancellation() => cancelled = true,
            Ok(Err(err)) => {
                if first_failure.is_none() {
                    first_failure = Some(RunCompletionError::Stage { stage, source: err });
                }
            }
            Err(join_error) if join_error.is_cancelled() => cancelled = true,
            Err(join_error) => {
                if first_failure.is_none() {
                    first_failure = Some(RunCompletionError::Panicked {
                        stage,
                        message: join_error.to_string(),
                    });
                }
            }
        }
    }

    match (first_failure, cancelled) {
        (Some(failure), _) => Err(failure),
        (None, true) => Err(RunCompletionError::Cancelled),
        (None, false) => Ok(outputs),
    }
}

#[cfg(test)]
mod tests {
    use super::{RunCompletionError, StageError, settle_run, spawn_stage};
    use crate::{CancellationToken, WorkQueue};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("cancelled")]
        Cancelled,
        #[error("{0}")]
        Failed(String),
    }

    impl StageError for TestError {
        fn is_cancellation(&self) -> bool {
            matches!(self, Self::Cancelled)
        }
    }

    async fn buggy_producer() -> Result<u32, TestError> {
        panic!("producer bug")
    }

    fn failure(msg: &str) -> TestError {
        TestError::Failed(msg.to_string())
    }

    #[tokio::test]
    async fn settle_run_returns_outputs_in_order() {
        let token = CancellationToken::new();
        let stages = vec![
            spawn_stage("a", token.clone(), async { Ok::<_, TestError>(1) }),
            spawn_stage("b", token.clone(), async { Ok::<_, TestError>(2) }),
        ];
        let outputs = settle_run(stages).await.unwrap();
        assert_eq!(outputs, vec![("a", 1), ("b", 2)]);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn settle_run_prefers_root_cause_over_cancellation() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let stages = vec![
            spawn_stage("waiter", token.clone(), async move {
                waiter.cancelled().await;
                Err::<u32, _>(TestError::Cancelled)
            }),
            spawn_stage("failing", token.clone(), async { Err(failure("boom")) }),
        ];

        match settle_run(stages).await {
            Err(RunCompletionError::Stage { stage, source }) => {
                assert_eq!(stage, "failing");
                assert!(source.to_string().contains("boom"));
            }
            other => panic!("expected stage error, got {:?}", other.map(|_| ())),
        }
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn settle_run_reports_cancelled_when_only_cancellations() {
        let token = CancellationToken::new();
        token.cancel();
        let stages = vec![spawn_stage("a", token.clone(), async {
            Err::<u32, _>(TestError::Cancelled)
        })];
        assert!(matches!(
            settle_run(stages).await,
            Err(RunCompletionError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn panicking_stage_cancels_siblings() {
        let token = CancellationToken::new();
        let queue: Arc<WorkQueue<u32>> = Arc::new(WorkQueue::new("items", "test"));
        let consumer = {
            let queue = queue.clone();
            let token = token.clone();
            async move {
                tokio::select! {
                    _ = token.cancelled() => Err(TestError::Cancelled),
                    item = queue.dequeue() => Ok(item.map(|i| i.into_payload()).unwrap_or(0)),
                }
            }
        };
        let stages = vec![
            spawn_stage("consumer", token.clone(), consumer),
            spawn_stage("producer", token.clone(), buggy_producer()),
        ];

        let outcome = tokio::time::timeout(Duration::from_secs(2), settle_run(stages))
            .await
            .expect("run should settle after a panic");
        match outcome {
            Err(RunCompletionError::Panicked { stage, message }) => {
                assert_eq!(stage, "producer");
                assert!(message.contains("panic"));
            }
            other => panic!("expected panic error, got {:?}", other.map(|_| ())),
        }
        assert!(token.is_cancelled());
        // The queue itself is untouched.
        queue.enqueue(1).unwrap();
    }
}
