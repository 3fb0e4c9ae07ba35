//! Single-flight token refresh.
//!
//! A *refresh episode* runs from the first 401 that finds no refresh in
//! progress until that refresh settles. The caller that opens the episode
//! holds a [`RefreshLease`] and performs the exchange; every caller arriving
//! while the lease is alive gets a [`RefreshWaiter`] and is fulfilled, in
//! enqueue order, with the leader's outcome.
//!
//! The lease settles on `Drop` as well, so a cancelled leader can never leave
//! the coordinator stuck in the refreshing state or strand a waiter.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::types::AccessToken;

/// Cloneable outcome of a failed refresh, fanned out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RefreshError {
    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("refresh rejected with HTTP {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("refresh response did not contain an access token")]
    Malformed,

    #[error("refresh transport failure: {0}")]
    Transport(String),

    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),

    #[error("could not persist refreshed token: {0}")]
    Store(String),

    /// The leader was dropped before the exchange finished. The session is
    /// untouched, so a waiter receiving this may open the next episode itself.
    #[error("refresh abandoned before completion")]
    Abandoned,
}

pub type RefreshOutcome = Result<AccessToken, RefreshError>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Owns the refreshing flag and the queue of callers waiting on it.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Result of [`RefreshCoordinator::acquire`].
pub enum RefreshTicket<'a> {
    /// This caller opened the episode and must perform the exchange.
    Leader(RefreshLease<'a>),
    /// An episode is already running; wait for its outcome.
    Follower(RefreshWaiter),
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current episode, or open a new one if none is running.
    pub fn acquire(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.queue.push(tx);
            tracing::debug!(queued = state.queue.len(), "Refresh in progress; request queued");
            RefreshTicket::Follower(RefreshWaiter { rx })
        } else {
            state.refreshing = true;
            RefreshTicket::Leader(RefreshLease {
                coordinator: self,
                settled: false,
            })
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn finish(&self, outcome: &RefreshOutcome) {
        // Flag and queue reset together under the lock; senders fire after it is released.
        let waiters = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.queue)
        };

        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose caller went away is not an error.
            let _ = waiter.send(outcome.clone());
        }
        if count > 0 {
            tracing::debug!(waiters = count, ok = outcome.is_ok(), "Refresh outcome fanned out");
        }
    }
}

/// Exclusive right to perform the refresh exchange for one episode.
#[must_use = "dropping the lease abandons the refresh episode"]
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    /// End the episode and hand `outcome` to every queued caller.
    pub fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.finish(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh leader dropped before settling; releasing queued requests");
            self.coordinator.finish(&Err(RefreshError::Abandoned));
        }
    }
}

/// Pending result for a caller queued behind an in-flight refresh.
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    /// Wait for the episode to settle.
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn leader(coordinator: &RefreshCoordinator) -> RefreshLease<'_> {
        match coordinator.acquire() {
            RefreshTicket::Leader(lease) => lease,
            RefreshTicket::Follower(_) => panic!("expected to lead the episode"),
        }
    }

    fn follower(coordinator: &RefreshCoordinator) -> RefreshWaiter {
        match coordinator.acquire() {
            RefreshTicket::Follower(waiter) => waiter,
            RefreshTicket::Leader(_) => panic!("expected to join the running episode"),
        }
    }

    #[tokio::test]
    async fn only_first_caller_leads() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let w1 = follower(&coordinator);
        let w2 = follower(&coordinator);

        assert!(coordinator.is_refreshing());
        assert_eq!(coordinator.queued(), 2);

        lease.settle(&Ok(AccessToken::new("A2")));

        assert_eq!(w1.wait().await, Ok(AccessToken::new("A2")));
        assert_eq!(w2.wait().await, Ok(AccessToken::new("A2")));
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let waiters: Vec<_> = (0..3).map(|_| follower(&coordinator)).collect();

        lease.settle(&Err(RefreshError::Malformed));

        for waiter in waiters {
            assert_eq!(waiter.wait().await, Err(RefreshError::Malformed));
        }
    }

    #[test]
    fn settling_resets_state_for_next_episode() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let _waiter = follower(&coordinator);
        lease.settle(&Err(RefreshError::NoRefreshToken));

        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.queued(), 0);

        // A new 401 opens a brand-new episode rather than joining the settled one.
        let next = leader(&coordinator);
        assert!(coordinator.is_refreshing());
        next.settle(&Ok(AccessToken::new("A3")));
    }

    #[tokio::test]
    async fn dropped_leader_abandons_episode() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let waiter = follower(&coordinator);

        drop(lease);

        assert!(!coordinator.is_refreshing());
        assert_eq!(waiter.wait().await, Err(RefreshError::Abandoned));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn waiters_are_released_in_enqueue_order() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let order = Arc::new(Mutex::new(Vec::new()));
        let parked = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let waiter = follower(&coordinator);
                let order = order.clone();
                let parked = parked.clone();
                tokio::spawn(async move {
                    parked.fetch_add(1, Ordering::SeqCst);
                    waiter.wait().await.unwrap();
                    order.lock().push(i);
                })
            })
            .collect();

        // Every task must be parked on its waiter before the outcome fires.
        while parked.load(Ordering::SeqCst) < 4 {
            tokio::task::yield_now().await;
        }
        lease.settle(&Ok(AccessToken::new("A2")));
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn queue_keeps_arrival_order() {
        let coordinator = RefreshCoordinator::new();
        let _lease = leader(&coordinator);
        let mut waiters: Vec<_> = (0..3).map(|_| follower(&coordinator)).collect();

        // Dropping the second waiter closes exactly the second queued sender.
        drop(waiters.remove(1));

        let state = coordinator.state.lock();
        let closed: Vec<_> = state.queue.iter().map(oneshot::Sender::is_closed).collect();
        assert_eq!(closed, vec![false, true, false]);
    }
}
