//! Shutdown signaling for logspray.
//!
//! The run lifecycle has exactly one phase change we care about: the moment
//! shutdown begins, whether because the run duration elapsed or because the
//! operator interrupted the process. This crate provides the mechanism that
//! announces that phase change and lets the announcer wait until every
//! participant has acknowledged it.
//!
//! There are two halves, a [`Broadcaster`] and a [`Watcher`]. The
//! `Broadcaster` fires the signal exactly once -- its `signal` functions
//! consume `self`, so a second teardown cannot be expressed. Each `Watcher`
//! blocks in [`Watcher::recv`] until the signal arrives. A `Watcher` counts
//! as a peer of the `Broadcaster` from creation until it either receives the
//! signal or is dropped, whichever comes first.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use tokio::sync::{
    Notify,
    broadcast::{self, error::RecvError},
};
use tracing::debug;

/// Construct a connected [`Watcher`] and [`Broadcaster`] pair.
///
/// The returned `Watcher` is the first peer. Additional peers are made by
/// cloning any live `Watcher`.
#[must_use]
pub fn signal() -> (Watcher, Broadcaster) {
    // The broadcast channel is used purely for its close semantics: dropping
    // the sender wakes every receiver exactly once, no payload required.
    let (sender, receiver) = broadcast::channel(1);
    let peers = Arc::new(AtomicU32::new(1));
    let notify = Arc::new(Notify::new());

    let watcher = Watcher {
        peers: Arc::clone(&peers),
        receiver,
        notify: Arc::clone(&notify),
        released: false,
    };

    let broadcaster = Broadcaster {
        peers,
        sender,
        notify,
    };

    (watcher, broadcaster)
}

/// Announces the shutdown phase change to all [`Watcher`] peers.
#[derive(Debug)]
pub struct Broadcaster {
    /// Number of live peers that have not yet acknowledged the signal.
    peers: Arc<AtomicU32>,
    /// Held only so that dropping it closes the channel, waking watchers.
    sender: broadcast::Sender<()>,
    /// Watchers ping this when they log off.
    notify: Arc<Notify>,
}

impl Broadcaster {
    /// Fire the signal without waiting for acknowledgement.
    pub fn signal(self) {
        drop(self.sender);
    }

    /// Fire the signal and block until every peer has acknowledged it,
    /// either by returning from [`Watcher::recv`] or by dropping.
    pub async fn signal_and_wait(self) {
        drop(self.sender);

        // Register interest in the notification BEFORE checking the peer
        // count. In the other order a peer could decrement and notify in the
        // gap between the check and the await, and the wakeup would be lost.
        loop {
            let notified = self.notify.notified();

            let remaining = self.peers.load(Ordering::SeqCst);
            if remaining == 0 {
                break;
            }
            debug!("waiting on {remaining} shutdown peers");

            notified.await;
        }
    }
}

/// Waits for the shutdown phase change fired by the [`Broadcaster`].
#[derive(Debug)]
pub struct Watcher {
    /// Shared peer count, see [`Broadcaster`].
    peers: Arc<AtomicU32>,
    /// Receive half; woken when the broadcaster's sender drops.
    receiver: broadcast::Receiver<()>,
    /// Pinged when this watcher logs off.
    notify: Arc<Notify>,
    /// Whether this watcher has already been removed from the peer count.
    released: bool,
}

impl Watcher {
    /// Block until the signal has been fired. Returns immediately if it
    /// already has been.
    pub async fn recv(mut self) {
        match self.receiver.recv().await {
            Ok(()) | Err(RecvError::Closed) => {}
            Err(RecvError::Lagged(_)) => {
                // Only one value ever transits the channel so receivers
                // cannot lag.
                unreachable!("shutdown channel lagged");
            }
        }
        self.release();
    }

    /// Remove this watcher from the peer count and wake the broadcaster.
    fn release(&mut self) {
        if self.released {
            return;
        }

        // fetch_sub wraps at zero, so decrement by compare-exchange instead.
        let mut old = self.peers.load(Ordering::Relaxed);
        while old > 0 {
            match self
                .peers
                .compare_exchange_weak(old, old - 1, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => {
                    self.notify.notify_waiters();
                    break;
                }
                Err(actual) => old = actual,
            }
        }
        self.released = true;
    }
}

impl Clone for Watcher {
    fn clone(&self) -> Self {
        self.peers.fetch_add(1, Ordering::SeqCst);
        Self {
            peers: Arc::clone(&self.peers),
            receiver: self.receiver.resubscribe(),
            notify: Arc::clone(&self.notify),
            // The clone is a fresh peer regardless of the source's state.
            released: false,
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::signal;

    #[tokio::test]
    async fn watcher_unblocks_on_signal() {
        let (watcher, broadcaster) = signal();

        let handle = tokio::spawn(watcher.recv());
        broadcaster.signal_and_wait().await;
        handle.await.expect("watcher task panicked");
    }

    #[tokio::test]
    async fn all_clones_observe_signal() {
        let (watcher, broadcaster) = signal();
        let second = watcher.clone();
        let third = watcher.clone();

        let h1 = tokio::spawn(watcher.recv());
        let h2 = tokio::spawn(second.recv());
        let h3 = tokio::spawn(third.recv());

        broadcaster.signal_and_wait().await;

        h1.await.expect("watcher task panicked");
        h2.await.expect("watcher task panicked");
        h3.await.expect("watcher task panicked");
    }

    #[tokio::test]
    async fn dropped_watcher_does_not_block_broadcaster() {
        let (watcher, broadcaster) = signal();
        let survivor = watcher.clone();
        drop(watcher);

        let handle = tokio::spawn(survivor.recv());
        broadcaster.signal_and_wait().await;
        handle.await.expect("watcher task panicked");
    }

    #[tokio::test]
    async fn recv_after_signal_returns_immediately() {
        let (watcher, broadcaster) = signal();
        broadcaster.signal();

        // recv must not hang even though the signal fired before we listened.
        tokio::time::timeout(Duration::from_secs(1), watcher.recv())
            .await
            .expect("recv did not return after signal");
    }

    #[tokio::test]
    async fn signal_without_watchers_is_fine() {
        let (watcher, broadcaster) = signal();
        drop(watcher);
        broadcaster.signal_and_wait().await;
    }
}
