use crate::frontier::{Frontier, FrontierError, FrontierState, RetryDecision};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, thread-safe handle to the one frontier of a crawl
///
/// Every method takes the lock exactly once, so each operation is atomic
/// with respect to all workers. A poisoned lock is recovered: frontier
/// methods never leave the structure half-updated across a panic point.
#[derive(Debug, Clone)]
pub struct SharedFrontier {
    inner: Arc<Mutex<Frontier>>,
}

impl SharedFrontier {
    pub fn new(frontier: Frontier) -> Self {
        Self {
            inner: Arc::new(Mutex::new(frontier)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Frontier> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn take(&self) -> Option<String> {
        self.lock().take()
    }

    pub fn enqueue(&self, url: &str) -> bool {
        self.lock().enqueue(url)
    }

    pub fn mark_processed(&self, url: &str) {
        self.lock().mark_processed(url);
    }

    pub fn retry_or_skip(&self, url: &str) -> RetryDecision {
        self.lock().retry_or_skip(url)
    }

    pub fn lookup_category(&self, url: &str) -> Result<String, FrontierError> {
        self.lock().lookup_category(url).map(str::to_string)
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().is_exhausted()
    }

    pub fn queued_len(&self) -> usize {
        self.lock().queued_len()
    }

    pub fn processed_len(&self) -> usize {
        self.lock().processed_len()
    }

    pub fn skipped_len(&self) -> usize {
        self.lock().skipped_len()
    }

    pub fn products_count(&self) -> u64 {
        self.lock().products_count()
    }

    /// Takes a consistent snapshot; the lock is released before returning
    pub fn snapshot(&self) -> FrontierState {
        self.lock().snapshot()
    }

    /// Runs `f` with exclusive access to the frontier
    pub fn with<R>(&self, f: impl FnOnce(&mut Frontier) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_concurrent_takes_hand_out_each_url_once() {
        let mut frontier = Frontier::new("https://example.com/", 3).unwrap();
        for i in 0..500 {
            frontier.enqueue(&format!("https://example.com/p{}", i));
        }
        let shared = SharedFrontier::new(frontier);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(url) = shared.take() {
                        shared.mark_processed(&url);
                        taken.push(url);
                    }
                    taken
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for url in handle.join().unwrap() {
                assert!(seen.insert(url), "URL handed out twice");
            }
        }

        assert_eq!(seen.len(), 500);
        assert_eq!(shared.processed_len(), 500);
        assert!(shared.is_exhausted());
    }

    #[test]
    fn test_concurrent_products_are_counted_once_each() {
        let shared = SharedFrontier::new(Frontier::new("https://example.com/", 3).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let url = format!("https://example.com/w{}/p{}", worker, i);
                        shared.with(|frontier| frontier.record_product(&url));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.products_count(), 100);
        assert_eq!(shared.processed_len(), 100);
    }
}
