//! Live station observers.
//!
//! ```text
//!  controller ──broadcast()──▶ RwLock(read) ──try_send──▶ [sub-0 buffer] ──▶ observer
//!                                           └─try_send──▶ [sub-1 buffer] ──▶ observer
//!  subscribe() / drop / prune ──▶ RwLock(write) insert / remove
//! ```
//!
//! Each subscriber owns a buffer of [`SUBSCRIBER_DEPTH`] snapshots.  A
//! broadcast never waits: when a buffer is full the oldest snapshot is
//! dropped to make room.  A dropped [`Subscription`] removes its own entry.
//! Entries whose cancel token fired are skipped by broadcasts at once and
//! pruned on the next `subscribe`, `broadcast` or `close`.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use futures_lite::future;
use log::{info, warn};

use crate::cancel::CancelToken;
use crate::model::Station;

/// Snapshots buffered per subscriber before the oldest is dropped.
pub const SUBSCRIBER_DEPTH: usize = 4;

type SnapshotChannel = Channel<CriticalSectionRawMutex, Station, SUBSCRIBER_DEPTH>;

/// Registry-unique subscriber key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber {
    channel: Arc<SnapshotChannel>,
    caller: CancelToken,
    local: CancelToken,
}

impl Subscriber {
    fn is_cancelled(&self) -> bool {
        self.caller.is_cancelled() || self.local.is_cancelled()
    }
}

// ───────────────────────────────────────────────────────────────
// Registry
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct SubscriptionRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SubscriberId, Subscriber>> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SubscriberId, Subscriber>> {
        self.subscribers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer.  It stays registered until `cancel` fires or
    /// the returned [`Subscription`] is cancelled or dropped.
    pub fn subscribe(self: &Arc<Self>, cancel: CancelToken) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = Arc::new(Channel::new());
        let local = CancelToken::new();

        {
            let mut subscribers = self.write();
            prune(&mut subscribers);
            subscribers.insert(
                id,
                Subscriber {
                    channel: Arc::clone(&channel),
                    caller: cancel.clone(),
                    local: local.clone(),
                },
            );
        }
        info!("Subscriber {} added", id);

        Subscription {
            id,
            channel,
            caller: cancel,
            local,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: SubscriberId) {
        if self.write().remove(&id).is_some() {
            info!("Subscriber {} removed", id);
        }
    }

    fn prune_cancelled(&self) {
        prune(&mut self.write());
    }

    /// Hand `station` to every live subscriber.  Returns how many got it.
    pub fn broadcast(&self, station: &Station) -> usize {
        let subscribers = self.read();
        let mut delivered = 0;
        let mut stale = false;

        for (id, sub) in subscribers.iter() {
            if sub.is_cancelled() {
                stale = true;
                continue;
            }
            let mut snapshot = station.clone();
            loop {
                match sub.channel.try_send(snapshot) {
                    Ok(()) => {
                        delivered += 1;
                        break;
                    }
                    Err(TrySendError::Full(rejected)) => {
                        if sub.channel.try_receive().is_ok() {
                            warn!("Subscriber {} lagging, dropped oldest snapshot", id);
                        }
                        snapshot = rejected;
                    }
                }
            }
        }
        drop(subscribers);

        if stale {
            self.prune_cancelled();
        }
        delivered
    }

    /// Cancel every subscription.  Observers drain what is buffered and
    /// then see the end of their stream.
    pub fn close(&self) {
        let mut subscribers = self.write();
        for sub in subscribers.values() {
            sub.local.cancel();
        }
        prune(&mut subscribers);
    }

    /// Live registrations.
    pub fn len(&self) -> usize {
        self.read().values().filter(|sub| !sub.is_cancelled()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries still held in the map, cancelled or not.
    #[cfg(test)]
    fn entries(&self) -> usize {
        self.read().len()
    }
}

fn prune(subscribers: &mut HashMap<SubscriberId, Subscriber>) {
    subscribers.retain(|id, sub| {
        let keep = !sub.is_cancelled();
        if !keep {
            info!("Subscriber {} removed", id);
        }
        keep
    });
}

// ───────────────────────────────────────────────────────────────
// Subscription
// ───────────────────────────────────────────────────────────────

/// Receiving end of one registration.
///
/// Iterating yields snapshots until the subscription is cancelled and its
/// buffer is empty.
pub struct Subscription {
    id: SubscriberId,
    channel: Arc<SnapshotChannel>,
    caller: CancelToken,
    local: CancelToken,
    registry: Weak<SubscriptionRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.caller.is_cancelled() || self.local.is_cancelled()
    }

    /// Next buffered snapshot, without waiting.
    pub fn try_recv(&self) -> Option<Station> {
        self.channel.try_receive().ok()
    }

    /// Wait for the next snapshot.  `None` once closed and drained.
    pub fn recv(&self) -> Option<Station> {
        if let Some(station) = self.try_recv() {
            return Some(station);
        }
        if self.is_closed() {
            return None;
        }
        future::block_on(future::or(
            async { Some(self.channel.receive().await) },
            async {
                future::or(self.caller.cancelled(), self.local.cancelled()).await;
                None
            },
        ))
        .or_else(|| self.try_recv())
    }

    /// Leave the registry.  Buffered snapshots remain readable.
    pub fn cancel(&self) {
        self.local.cancel();
    }
}

impl Iterator for Subscription {
    type Item = Station;

    fn next(&mut self) -> Option<Station> {
        self.recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.local.cancel();
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
