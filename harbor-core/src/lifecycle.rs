//! Host lifecycle: the before-start event and supervised background tasks.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::notifications::ResourceNotifications;

/// Default time each background task gets to finish once shutdown starts.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Reacts to the host's before-start event. Hooks run once, in registration
/// order, and may spawn long-running work through
/// [`StartupContext::spawn`].
#[async_trait]
pub trait BeforeStartHook: Send + Sync {
    fn name(&self) -> &str;

    async fn before_start(&self, context: &StartupContext) -> Result<()>;
}

/// Handles of background tasks owned by the host. Every spawned task is
/// retained so shutdown can join it instead of orphaning it.
#[derive(Default)]
pub struct BackgroundTasks {
    handles: Mutex<Vec<(String, JoinHandle<Result<()>>)>>,
}

impl fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .handles
            .try_lock()
            .map(|guard| guard.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();
        f.debug_struct("BackgroundTasks")
            .field("tasks", &names)
            .finish()
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        debug!(target: "harbor::host", task = %name, "spawning background task");
        let handle = tokio::spawn(task);
        self.handles.lock().push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for every task, giving each up to `timeout`. Callers cancel the
    /// tasks' token first; a task that overruns is aborted.
    pub async fn join_all(&self, timeout: Duration) {
        let handles = std::mem::take(&mut *self.handles.lock());

        for (name, mut handle) in handles {
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(Ok(()))) => {
                    debug!(target: "harbor::host", task = %name, "background task finished")
                }
                Ok(Ok(Err(err))) => {
                    warn!(target: "harbor::host", task = %name, error = %err, "background task failed")
                }
                Ok(Err(err)) => {
                    warn!(target: "harbor::host", task = %name, error = %err, "background task panicked or was aborted")
                }
                Err(_) => {
                    warn!(target: "harbor::host", task = %name, "background task timed out during shutdown");
                    handle.abort();
                }
            }
        }
    }
}

/// What a [`BeforeStartHook`] gets to work with.
pub struct StartupContext {
    notifications: Arc<dyn ResourceNotifications>,
    tasks: Arc<BackgroundTasks>,
    shutdown: CancellationToken,
}

impl fmt::Debug for StartupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupContext")
            .field("tasks", &self.tasks)
            .field("shutdown_cancelled", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl StartupContext {
    pub fn new(
        notifications: Arc<dyn ResourceNotifications>,
        tasks: Arc<BackgroundTasks>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            notifications,
            tasks,
            shutdown,
        }
    }

    pub fn notifications(&self) -> Arc<dyn ResourceNotifications> {
        Arc::clone(&self.notifications)
    }

    /// Token cancelled when the host shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns a supervised background task owned by the host.
    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(name, task);
    }
}

/// Runs every hook for the before-start event, stopping at the first error.
pub async fn raise_before_start(
    hooks: &[Arc<dyn BeforeStartHook>],
    context: &StartupContext,
) -> Result<()> {
    for hook in hooks {
        info!(target: "harbor::host", hook = hook.name(), "running before-start hook");
        hook.before_start(context).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarborError;
    use crate::notifications::InProcResourceNotifications;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook {
        label: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl BeforeStartHook for CountingHook {
        fn name(&self) -> &str {
            self.label
        }

        async fn before_start(&self, context: &StartupContext) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HarborError::Internal("hook failed".into()));
            }
            let token = context.shutdown_token();
            context.spawn(self.label, async move {
                token.cancelled().await;
                Ok(())
            });
            Ok(())
        }
    }

    fn context(tasks: Arc<BackgroundTasks>, token: CancellationToken) -> StartupContext {
        StartupContext::new(
            Arc::new(InProcResourceNotifications::default()),
            tasks,
            token,
        )
    }

    #[tokio::test]
    async fn hooks_spawn_tasks_that_join_on_shutdown() {
        let tasks = Arc::new(BackgroundTasks::new());
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let hooks: Vec<Arc<dyn BeforeStartHook>> = vec![
            Arc::new(CountingHook { label: "first", calls: Arc::clone(&calls), fail: false }),
            Arc::new(CountingHook { label: "second", calls: Arc::clone(&calls), fail: false }),
        ];

        raise_before_start(&hooks, &context(Arc::clone(&tasks), token.clone()))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(tasks.len(), 2);

        token.cancel();
        tasks.join_all(Duration::from_secs(1)).await;
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn first_failing_hook_stops_the_event() {
        let tasks = Arc::new(BackgroundTasks::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let hooks: Vec<Arc<dyn BeforeStartHook>> = vec![
            Arc::new(CountingHook { label: "broken", calls: Arc::clone(&calls), fail: true }),
            Arc::new(CountingHook { label: "never", calls: Arc::clone(&calls), fail: false }),
        ];

        let result =
            raise_before_start(&hooks, &context(Arc::clone(&tasks), CancellationToken::new())).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_tasks_are_aborted_after_the_timeout() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("stuck", async {
            std::future::pending::<()>().await;
            Ok(())
        });

        tasks.join_all(Duration::from_millis(50)).await;
        assert!(tasks.is_empty());
    }
}
