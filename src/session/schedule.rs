//! Cancellable recurring tasks.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_std::task::{self, JoinHandle};

/// Cancels a [`ScheduledTask`].
///
/// Cancellation is cooperative: the task checks the handle before each call
/// of its callback and ends once it sees it cancelled.
#[derive(Debug, Default, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Callback invoked at a fixed period on the async-std executor.
///
/// The first call happens one period after the task is created. The task
/// ends when it is cancelled, dropped, or when the callback returns `false`.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: CancelHandle,
    task: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn every<F>(period: Duration, mut f: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = CancelHandle::new();
        let flag = handle.clone();

        let task = task::spawn(async move {
            loop {
                task::sleep(period).await;
                if flag.is_cancelled() || !f() {
                    break;
                }
            }
        });

        Self {
            handle,
            task: Some(task),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    pub fn cancel(&self) {
        self.handle.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Cancels the task and waits for it to end.
    pub async fn join(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            task.await
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.cancel()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() -> bool + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    #[async_std::test]
    async fn runs_until_cancelled() {
        let (count, f) = counter();
        let scheduled = ScheduledTask::every(Duration::from_millis(5), f);

        task::sleep(Duration::from_millis(60)).await;
        scheduled.cancel();
        assert!(scheduled.is_cancelled());

        scheduled.join().await;
        let after_cancel = count.load(Ordering::SeqCst);
        assert!(after_cancel >= 2);

        task::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[async_std::test]
    async fn callback_can_end_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let scheduled = ScheduledTask::every(Duration::from_millis(1), move || {
            c.fetch_add(1, Ordering::SeqCst) < 2
        });

        task::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!scheduled.cancel_handle().is_cancelled());
    }

    #[async_std::test]
    async fn dropping_cancels() {
        let (count, f) = counter();
        drop(ScheduledTask::every(Duration::from_millis(5), f));

        task::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
