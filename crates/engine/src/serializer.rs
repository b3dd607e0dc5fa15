//! The process-wide mutation token.
//!
//! Every create, update, delete and assign runs while holding the single
//! [`MutationToken`]; reads never take it. Releasing happens in `Drop`, so an
//! early `?` return, a panic or a dropped future all give the token back.
//!
//! A process builds one [`MutationSerializer`] and hands the same `Arc` to
//! every [`Orchestrator`](crate::Orchestrator), whatever collection or store
//! each one serves.

use std::sync::atomic::{AtomicU64, Ordering};

use andor_core::Operation;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MutationSerializer {
    lock: Mutex<()>,
    acquired: AtomicU64,
}

/// Proof that the holder is the only mutation in flight.
#[must_use = "the token is released as soon as it is dropped"]
#[derive(Debug)]
pub struct MutationToken<'a> {
    operation: Operation,
    _guard: MutexGuard<'a, ()>,
}

impl MutationToken<'_> {
    /// The operation the token was taken for.
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl MutationSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the token to perform `operation`. Waiters are served in FIFO
    /// order; there is no timeout.
    ///
    /// `operation` must be a mutation; reads never serialize.
    pub async fn acquire(&self, operation: Operation) -> MutationToken<'_> {
        debug_assert!(operation.is_mutation(), "{operation} does not take the token");
        let guard = self.lock.lock().await;
        let n = self.acquired.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(mutation = n, %operation, "mutation token acquired");
        MutationToken {
            operation,
            _guard: guard,
        }
    }

    /// Take the token only if nobody holds it.
    pub fn try_acquire(&self, operation: Operation) -> Option<MutationToken<'_>> {
        debug_assert!(operation.is_mutation(), "{operation} does not take the token");
        let guard = self.lock.try_lock().ok()?;
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Some(MutationToken {
            operation,
            _guard: guard,
        })
    }

    /// Number of times the token has been handed out.
    pub fn mutations(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn token_is_exclusive_until_dropped() {
        let s = MutationSerializer::new();
        let token = s.acquire(Operation::Assign).await;
        assert_eq!(token.operation(), Operation::Assign);
        assert!(s.try_acquire(Operation::Update).is_none());
        drop(token);
        assert!(s.try_acquire(Operation::Update).is_some());
        assert_eq!(s.mutations(), 2);
    }

    #[tokio::test]
    async fn token_released_on_early_return() {
        async fn fails(s: &MutationSerializer) -> Result<(), &'static str> {
            let _token = s.acquire(Operation::Update).await;
            let step: Result<(), &'static str> = Err("boom");
            step?;
            Ok(())
        }
        let s = MutationSerializer::new();
        assert!(fails(&s).await.is_err());
        assert!(s.try_acquire(Operation::Update).is_some());
    }

    #[tokio::test]
    async fn token_released_when_future_is_cancelled() {
        let s = Arc::new(MutationSerializer::new());
        let holder = {
            let s = s.clone();
            tokio::spawn(async move {
                let _token = s.acquire(Operation::Update).await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
        };
        while s.mutations() == 0 {
            tokio::task::yield_now().await;
        }
        holder.abort();
        let _ = holder.await;
        let token =
            tokio::time::timeout(Duration::from_secs(5), s.acquire(Operation::Update)).await;
        assert!(token.is_ok());
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "read does not take the token")]
    async fn reads_never_take_the_token() {
        let s = MutationSerializer::new();
        let _token = s.acquire(Operation::Read).await;
    }
}
