use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::error;

/// A fixed number of concurrency slots shared by every spawned task.
///
/// Each task waits for a slot before its work starts and keeps it until the
/// [`Slot`] handed to it is dropped. [`TaskPool::join`] is the barrier that
/// waits for all of them.
pub struct TaskPool {
    sem: Arc<Semaphore>,
    tasks: JoinSet<()>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Proof that a task holds one of the pool's slots.
pub struct Slot {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TaskPool {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            sem: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: JoinSet::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue `work`; it starts once a slot is free.
    pub fn spawn<F, Fut>(&mut self, work: F)
    where
        F: FnOnce(Slot) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let sem = Arc::clone(&self.sem);
        let in_flight = Arc::clone(&self.in_flight);
        let peak = Arc::clone(&self.peak);

        self.tasks.spawn(async move {
            let permit = match sem.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    error!("Task pool closed before a slot was acquired");
                    return;
                }
            };
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            work(Slot {
                _permit: permit,
                in_flight,
            })
            .await;
        });
    }

    /// Wait for every spawned task. Returns how many finished without panicking.
    pub async fn join(mut self) -> usize {
        let mut completed = 0;
        while let Some(res) = self.tasks.join_next().await {
            match res {
                Ok(()) => completed += 1,
                Err(e) => error!(error = %e, "Scan task did not complete"),
            }
        }
        completed
    }

    /// A handle that reports the peak after the pool itself is consumed by `join`.
    pub fn peak_handle(&self) -> PeakHandle {
        PeakHandle(Arc::clone(&self.peak))
    }
}

#[derive(Clone)]
pub struct PeakHandle(Arc<AtomicUsize>);

impl PeakHandle {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_pool_bounds_concurrency() {
        let mut pool = TaskPool::new(3);
        let peak = pool.peak_handle();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.spawn(move |_slot| async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(pool.join().await, 10);
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(peak.get(), 3);
    }

    #[tokio::test]
    async fn test_single_slot_serializes() {
        let mut pool = TaskPool::new(1);
        let peak = pool.peak_handle();
        for _ in 0..4 {
            pool.spawn(|_slot| async {
                tokio::task::yield_now().await;
            });
        }
        assert_eq!(pool.join().await, 4);
        assert_eq!(peak.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_is_treated_as_one() {
        let mut pool = TaskPool::new(0);
        pool.spawn(|_slot| async {});
        assert_eq!(pool.join().await, 1);
    }

    #[tokio::test]
    async fn test_released_slot_lets_next_task_run() {
        let mut pool = TaskPool::new(1);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        pool.spawn(move |slot| async move {
            drop(slot);
            // still running, but the slot is free
            let _ = rx.await;
        });
        pool.spawn(move |_slot| async move {
            let _ = tx.send(());
        });
        assert_eq!(pool.join().await, 2);
    }

    #[tokio::test]
    async fn test_empty_pool_has_no_peak() {
        let pool = TaskPool::new(4);
        let peak = pool.peak_handle();
        assert_eq!(pool.join().await, 0);
        assert_eq!(peak.get(), 0);
    }
}
