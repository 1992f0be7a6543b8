//! Concurrent-build lifecycle tracking.
//!
//! Multiple build invocations may be in flight in one process. The session
//! owns the concurrency counter and the set of live backend handles; when
//! the counter returns to zero, every handle accumulated since the last
//! idle period is closed, exactly once.

use parking_lot::Mutex;

use crate::backend::SharedHandle;

/// Process-wide state shared by concurrently issued builds.
#[derive(Default)]
pub struct BuildSession {
    inner: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    active: usize,
    handles: Vec<SharedHandle>,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one build invocation as entered.
    pub fn enter(&self) {
        self.inner.lock().active += 1;
    }

    /// Track a backend handle created by an in-flight invocation.
    pub fn register(&self, handle: SharedHandle) {
        self.inner.lock().handles.push(handle);
    }

    /// Invocations currently in flight.
    pub fn active(&self) -> usize {
        self.inner.lock().active
    }

    /// Handles accumulated since the last idle period.
    pub fn live_handles(&self) -> usize {
        self.inner.lock().handles.len()
    }

    /// Mark one invocation as exited. Runs on every exit path, success or
    /// failure. On the return to zero, drains and closes every live
    /// handle; while other invocations remain in flight, handles stay
    /// open.
    pub async fn exit(&self) {
        let drained = {
            let mut state = self.inner.lock();
            debug_assert!(state.active > 0, "exit without matching enter");
            state.active = state.active.saturating_sub(1);
            if state.active == 0 {
                std::mem::take(&mut state.handles)
            } else {
                Vec::new()
            }
        };

        for handle in drained {
            if let Err(err) = handle.close().await {
                tracing::debug!(error = %err, "closing backend handle failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        BackendError, BackendHandle, GeneratedBundle, OutputOptions,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TrackedHandle {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BackendHandle for TrackedHandle {
        async fn write(&self, _options: &OutputOptions) -> Result<(), BackendError> {
            Ok(())
        }

        async fn generate(&self, _options: &OutputOptions) -> Result<GeneratedBundle, BackendError> {
            Ok(GeneratedBundle::default())
        }

        async fn close(&self) -> Result<(), BackendError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn tracked() -> (SharedHandle, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        (
            Arc::new(TrackedHandle {
                closed: Arc::clone(&closed),
            }),
            closed,
        )
    }

    #[tokio::test]
    async fn handles_close_when_the_last_invocation_exits() {
        let session = BuildSession::new();
        let (handle, closed) = tracked();

        session.enter();
        session.register(handle);
        assert_eq!(session.live_handles(), 1);

        session.exit().await;
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(session.live_handles(), 0);
    }

    #[tokio::test]
    async fn handles_stay_open_while_builds_overlap() {
        let session = BuildSession::new();
        let (first, first_closed) = tracked();
        let (second, second_closed) = tracked();

        session.enter();
        session.enter();
        session.register(first);
        session.register(second);

        session.exit().await;
        // One invocation is still in flight; nothing may close yet.
        assert!(!first_closed.load(Ordering::SeqCst));
        assert!(!second_closed.load(Ordering::SeqCst));
        assert_eq!(session.live_handles(), 2);

        session.exit().await;
        assert!(first_closed.load(Ordering::SeqCst));
        assert!(second_closed.load(Ordering::SeqCst));
        assert_eq!(session.live_handles(), 0);
    }

    #[tokio::test]
    async fn idle_periods_tear_down_independently() {
        let session = BuildSession::new();

        let (first, first_closed) = tracked();
        session.enter();
        session.register(first);
        session.exit().await;
        assert!(first_closed.load(Ordering::SeqCst));

        // A fresh invocation after idle starts a new accumulation.
        let (second, second_closed) = tracked();
        session.enter();
        session.register(second);
        assert_eq!(session.live_handles(), 1);
        session.exit().await;
        assert!(second_closed.load(Ordering::SeqCst));
    }
}
