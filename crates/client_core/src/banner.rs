//! Single-slot scheduler for banner dismissals.

use std::{future::Future, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::trace;

/// Holds at most one pending dismissal. Arming again aborts the previous one,
/// so only the newest revision can ever fire.
#[derive(Default)]
pub struct DismissTimer {
    pending: Option<(u64, JoinHandle<()>)>,
}

impl DismissTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fire` after `after`, keyed to `revision`.
    pub fn arm<F>(&mut self, runtime: &Handle, revision: u64, after: Duration, fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        trace!(revision, after_ms = after.as_millis() as u64, "arming banner dismissal");
        let task = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            fire.await;
        });
        self.pending = Some((revision, task));
    }

    pub fn cancel(&mut self) {
        if let Some((revision, task)) = self.pending.take() {
            if !task.is_finished() {
                trace!(revision, "superseding pending banner dismissal");
                task.abort();
            }
        }
    }

    pub fn pending_revision(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .filter(|(_, task)| !task.is_finished())
            .map(|(revision, _)| *revision)
    }
}

impl Drop for DismissTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rearming_supersedes_the_pending_dismissal() {
        let fired = Arc::new(AtomicU64::new(0));
        let mut timer = DismissTimer::new();
        let runtime = Handle::current();

        for revision in [1_u64, 2] {
            let fired = Arc::clone(&fired);
            timer.arm(&runtime, revision, Duration::from_secs(5), async move {
                fired.store(revision, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.pending_revision(), Some(2));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(timer.pending_revision(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_the_dismissal() {
        let fired = Arc::new(AtomicU64::new(0));
        let mut timer = DismissTimer::new();
        let flag = Arc::clone(&fired);
        timer.arm(&Handle::current(), 7, Duration::from_secs(5), async move {
            flag.store(7, Ordering::SeqCst);
        });
        drop(timer);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
