//! Ordered bulkhead over spawned tokio tasks.
//!
//! Results come back in spawn order no matter which task finishes first,
//! and a panicking task only costs its own slot. Dropping the group, or a
//! pending `join`, aborts whatever is still running.

use std::future::Future;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

pub struct OrderedTaskGroup<T> {
    handles: Vec<JoinHandle<T>>,
}

impl<T: Send + 'static> OrderedTaskGroup<T> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.handles.push(tokio::spawn(task));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task; `result[i]` belongs to the i-th spawn
    pub async fn join(mut self) -> Vec<Result<T, JoinError>> {
        // Handles stay in the group so a cancelled join still aborts them
        futures::future::join_all(self.handles.iter_mut()).await
    }

    /// Like [`join`](Self::join), replacing failed slots with `recover(index, error)`
    pub async fn join_or_else<R>(self, mut recover: R) -> Vec<T>
    where
        R: FnMut(usize, JoinError) -> T,
    {
        self.join()
            .await
            .into_iter()
            .enumerate()
            .map(|(i, result)| result.unwrap_or_else(|e| recover(i, e)))
            .collect()
    }
}

impl<T: Send + 'static> Default for OrderedTaskGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for OrderedTaskGroup<T> {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Aborts a spawned task when dropped
pub struct AbortOnDrop(AbortHandle);

impl AbortOnDrop {
    pub fn new<T>(handle: &JoinHandle<T>) -> Self {
        Self(handle.abort_handle())
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
