use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Follow-up work started from synchronous listeners.
///
/// Each task gets its own cancellation token; [`abort_all`](Self::abort_all)
/// cancels them so the work unwinds through its normal completion path.
/// Clones share the same set.
#[derive(Clone, Default)]
pub struct TaskSet {
    inner: Arc<TaskSetInner>,
}

#[derive(Default)]
struct TaskSetInner {
    tasks: Mutex<HashMap<u64, CancellationToken>>,
    next_id: AtomicU64,
    idle: Notify,
}

impl TaskSetInner {
    fn finish(&self, id: u64) {
        let idle = {
            let mut tasks = self.tasks.lock();
            tasks.remove(&id);
            tasks.is_empty()
        };
        if idle {
            self.idle.notify_waiters();
        }
    }
}

/// Removes the task from its set even when the task panics or is dropped.
struct Finish {
    inner: Arc<TaskSetInner>,
    id: u64,
}

impl Drop for Finish {
    fn drop(&mut self) {
        self.inner.finish(self.id);
    }
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current tokio runtime. Returns false, dropping the
    /// task, when called outside a runtime.
    pub fn spawn<F, Fut>(&self, task: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime available; follow-up task dropped");
            return false;
        };

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let future = task(token.clone());
        let finish = Finish {
            inner: Arc::clone(&self.inner),
            id,
        };

        // Tracked before spawning so a fast task cannot finish untracked. The
        // lock is released first: a shutting-down runtime drops the future
        // inside `spawn`, and `Finish` takes the lock again.
        self.inner.tasks.lock().insert(id, token);
        runtime.spawn(async move {
            let _finish = finish;
            future.await;
        });
        true
    }

    /// Cancel every running task.
    pub fn abort_all(&self) {
        for token in self.inner.tasks.lock().values() {
            token.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }

    /// Wait until no task is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}
