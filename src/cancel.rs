//! Cooperative cancellation signal.
//!
//! A [`CancelToken`] is a cloneable one-shot flag.  Cancelling any clone
//! cancels all of them and wakes every task awaiting
//! [`cancelled`](CancelToken::cancelled).  Nothing is interrupted: loops
//! observe the flag at their own suspension points.
//!
//! ```text
//!  station.shutdown() ──cancel()──▶ token ──wake──▶ worker send / controller receive
//!  observer hang-up   ──cancel()──▶ token ──wake──▶ blocked Subscription::recv
//! ```
//!
//! Any number of tasks may wait on one token.  Each pending [`Cancelled`]
//! future holds its own waker slot and frees it when dropped, so idle
//! waiters are never woken before the signal fires.

use core::cell::RefCell;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll, Waker};
use std::collections::HashMap;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

#[derive(Default)]
struct Waiters {
    next_slot: u64,
    wakers: HashMap<u64, Waker>,
}

struct Inner {
    cancelled: AtomicBool,
    waiters: Mutex<CriticalSectionRawMutex, RefCell<Waiters>>,
}

/// Shared cancellation flag with async wake-up.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                waiters: Mutex::new(RefCell::new(Waiters::default())),
            }),
        }
    }

    /// Fire the signal.  Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        let wakers = self
            .inner
            .waiters
            .lock(|w| core::mem::take(&mut w.borrow_mut().wakers));
        for waker in wakers.into_values() {
            waker.wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token has been cancelled.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled { token: self, slot: None }
    }

    /// Block the calling thread until the token is cancelled.
    pub fn wait(&self) {
        futures_lite::future::block_on(self.cancelled());
    }

    #[cfg(test)]
    fn pending_waiters(&self) -> usize {
        self.inner.waiters.lock(|w| w.borrow().wakers.len())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Future returned by [`CancelToken::cancelled`].
#[must_use = "futures do nothing unless polled"]
pub struct Cancelled<'a> {
    token: &'a CancelToken,
    slot: Option<u64>,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }
        let slot = self.slot;
        let slot = self.token.inner.waiters.lock(|w| {
            let mut w = w.borrow_mut();
            if let Some(s) = slot {
                if let Some(waker) = w.wakers.get_mut(&s) {
                    if !waker.will_wake(cx.waker()) {
                        waker.clone_from(cx.waker());
                    }
                    return s;
                }
            }
            let s = w.next_slot;
            w.next_slot += 1;
            w.wakers.insert(s, cx.waker().clone());
            s
        });
        self.slot = Some(slot);
        // Re-check after registering so a concurrent cancel() is not lost.
        if self.token.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Drop for Cancelled<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.token
                .inner
                .waiters
                .lock(|w| w.borrow_mut().wakers.remove(&slot));
        }
    }
}
