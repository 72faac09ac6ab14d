//! Per-run controls shared by every stage of a pipeline.
//!
//! A `RuntimeControls` bundles the cancellation token, the pause token and the
//! progress sink for one crawl run. Stages call [`RuntimeControls::checkpoint`]
//! before starting each unit of work.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::pause::PauseToken;
use crate::progress::{NoProgress, ProgressEvent, ProgressSink};
use crate::{CancellationToken, PipelineError};

#[derive(Clone)]
pub struct RuntimeControls {
    /// Name of the target being crawled
    pub name: Arc<str>,
    /// The cancellation token
    pub token: CancellationToken,
    /// The pause token
    pub pause: PauseToken,
    progress: Arc<dyn ProgressSink>,
}

impl fmt::Debug for RuntimeControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeControls")
            .field("name", &self.name)
            .field("cancelled", &self.token.is_cancelled())
            .field("paused", &self.pause.is_paused())
            .finish()
    }
}

impl RuntimeControls {
    pub fn new(
        token: CancellationToken,
        pause: PauseToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            name: Arc::from("default"),
            token,
            pause,
            progress,
        }
    }

    /// Controls that are never paused and discard progress.
    pub fn detached(token: CancellationToken) -> Self {
        Self::new(token, PauseToken::never(), Arc::new(NoProgress))
    }

    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Derive controls for one pipeline run.
    ///
    /// The child token is cancelled with the parent, and can additionally be
    /// cancelled on its own when the run hits a fatal error without touching
    /// the caller's token.
    pub fn child(&self, name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            token: self.token.child_token(),
            pause: self.pause.clone(),
            progress: self.progress.clone(),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[inline]
    pub fn report(&self, event: ProgressEvent) {
        self.progress.report(event);
    }

    /// Gate for starting the next unit of work.
    ///
    /// Fails with [`PipelineError::Cancelled`] once cancellation is observed,
    /// and blocks while paused. Cancellation wins over pause.
    pub async fn checkpoint(&self, stage: &'static str) -> Result<(), PipelineError> {
        if self.token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        if self.pause.is_paused() {
            debug!(target_name = %self.name, stage, "Paused, waiting for resume");
            self.report(ProgressEvent::Paused {
                target: self.name.clone(),
                stage,
            });
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(PipelineError::Cancelled),
                _ = self.pause.wait_while_paused() => {}
            }
        }

        if self.token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PauseController;
    use crate::test_utils::init_tracing;
    use std::time::Duration;

    #[tokio::test]
    async fn test_checkpoint_passes_when_idle() {
        init_tracing();
        let controls = RuntimeControls::detached(CancellationToken::new());
        controls.checkpoint("test").await.unwrap();
    }

    #[tokio::test]
    async fn test_checkpoint_fails_after_cancel() {
        let token = CancellationToken::new();
        let controls = RuntimeControls::detached(token.clone());
        token.cancel();
        assert!(matches!(
            controls.checkpoint("test").await,
            Err(PipelineError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pause() {
        let token = CancellationToken::new();
        let pause = PauseController::new();
        pause.pause();
        let controls = RuntimeControls::new(token.clone(), pause.token(), Arc::new(NoProgress));

        let waiter = tokio::spawn(async move { controls.checkpoint("test").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancel should interrupt pause")
            .unwrap();
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_cancel_does_not_cancel_parent() {
        let parent = RuntimeControls::detached(CancellationToken::new());
        let child = parent.child("blog");
        child.token.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.child("blog");
        parent.token.cancel();
        assert!(child.is_cancelled());
    }
}
