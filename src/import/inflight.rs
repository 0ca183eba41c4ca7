use std::future::Future;
use tokio::task::{JoinError, JoinSet};

/// A `JoinSet` that never holds more than `max` running tasks.
///
/// `spawn` waits for a free slot first and hands back whatever finished to
/// make room; `join_next` drains the remainder.
pub struct InFlight<T> {
    set: JoinSet<T>,
    max: usize,
}

impl<T: Send + 'static> InFlight<T> {
    pub fn new(max: usize) -> Self {
        Self {
            set: JoinSet::new(),
            max: max.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub async fn spawn<F>(&mut self, task: F) -> Option<Result<T, JoinError>>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let freed = if self.set.len() >= self.max {
            self.set.join_next().await
        } else {
            None
        };
        self.set.spawn(task);
        freed
    }

    pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
        self.set.join_next().await
    }
}
