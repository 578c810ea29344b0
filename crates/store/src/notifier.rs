//! Synchronous, single-threaded change notification.
//!
//! A [`Notifier<T>`] keeps an ordered list of callbacks and invokes them
//! directly on [`emit`](Notifier::emit). By the time the outermost `emit`
//! returns, every subscriber has seen the value.
//!
//! # Invariants
//!
//! 1. Subscribers are invoked in registration order.
//! 2. A subscriber only sees values emitted after it subscribed.
//! 3. Every subscriber sees values in emit order. An `emit` made from inside a
//!    callback is queued and delivered once the running round has reached
//!    every subscriber, so the last value a subscriber sees is the latest.
//! 4. Cancelling or dropping a [`Subscription`] takes effect immediately, even
//!    in the middle of a round. Registrations made during a round take effect
//!    from the next emit.
//! 5. A panicking subscriber is isolated: the remaining subscribers still run
//!    and the failure is reported in the [`EmitReport`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::error::{MessagingError, SubscriberFailureSnafu};

type Callback<T> = Rc<dyn Fn(&T)>;

struct Subscriber<T> {
    id: u64,
    callback: Callback<T>,
}

/// A value waiting for the running round to finish.
struct Pending<T> {
    value: T,
    // Only subscribers with an id below this were registered at emit time.
    audience: u64,
}

struct NotifierInner<T> {
    channel: &'static str,
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
    emitting: bool,
    pending: VecDeque<Pending<T>>,
}

/// Typed publish/subscribe channel for one observable value.
pub struct Notifier<T> {
    inner: Rc<RefCell<NotifierInner<T>>>,
}

impl<T> fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Notifier")
            .field("channel", &inner.channel)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Outcome of one [`Notifier::emit`] call.
///
/// The outermost call reports every round it ran, including values queued
/// by subscribers. A call made from inside a callback only queues its value
/// and comes back with `deferred` set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub delivered: usize,
    pub rounds: usize,
    pub deferred: bool,
    pub failures: Vec<MessagingError>,
}

impl EmitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<T: 'static> Notifier<T> {
    /// Creates a notifier; `channel` names it in log output.
    pub fn new(channel: &'static str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NotifierInner {
                channel,
                next_id: 0,
                subscribers: Vec::new(),
                emitting: false,
                pending: VecDeque::new(),
            })),
        }
    }

    pub fn channel(&self) -> &'static str {
        self.inner.borrow().channel
    }

    /// Registers `callback` for every future emit.
    ///
    /// The returned handle unsubscribes when cancelled or dropped. Call
    /// [`Subscription::detach`] to keep the callback for the notifier's
    /// whole lifetime.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push(Subscriber {
                id,
                callback: Rc::new(callback),
            });
            tracing::debug!(
                channel = inner.channel,
                subscriber = id,
                total = inner.subscribers.len(),
                "subscriber registered"
            );
            id
        };

        let weak_inner: Weak<RefCell<NotifierInner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            id,
            remove: Some(Box::new(move || {
                if let Some(inner) = weak_inner.upgrade() {
                    // Callbacks may own subscriptions of their own; drop them unborrowed.
                    let removed: Vec<Subscriber<T>> = {
                        let mut inner = inner.borrow_mut();
                        let (removed, kept) = std::mem::take(&mut inner.subscribers)
                            .into_iter()
                            .partition(|subscriber| subscriber.id == id);
                        inner.subscribers = kept;
                        tracing::debug!(
                            channel = inner.channel,
                            subscriber = id,
                            total = inner.subscribers.len(),
                            "subscriber removed"
                        );
                        removed
                    };
                    drop(removed);
                }
            })),
        }
    }

    /// Delivers `value` to every registered callback, in registration order.
    ///
    /// Called from inside a callback of this notifier, the value is queued
    /// behind the running round instead of interleaving with it.
    pub fn emit(&self, value: T) -> EmitReport {
        let first = {
            let mut inner = self.inner.borrow_mut();
            let audience = inner.next_id;
            if inner.emitting {
                inner.pending.push_back(Pending { value, audience });
                tracing::debug!(
                    channel = inner.channel,
                    queued = inner.pending.len(),
                    "emit queued behind running round"
                );
                return EmitReport {
                    deferred: true,
                    ..EmitReport::default()
                };
            }
            inner.emitting = true;
            Pending { value, audience }
        };

        let mut report = EmitReport::default();
        let mut next = Some(first);
        while let Some(pending) = next {
            self.deliver(&pending, &mut report);
            report.rounds += 1;

            let mut inner = self.inner.borrow_mut();
            next = inner.pending.pop_front();
            if next.is_none() {
                inner.emitting = false;
            }
        }

        report
    }

    fn deliver(&self, pending: &Pending<T>, report: &mut EmitReport) {
        // Release the borrow before calling out so callbacks may re-enter.
        let (channel, snapshot) = {
            let inner = self.inner.borrow();
            let snapshot = inner
                .subscribers
                .iter()
                .filter(|subscriber| subscriber.id < pending.audience)
                .map(|subscriber| (subscriber.id, Rc::clone(&subscriber.callback)))
                .collect::<Vec<_>>();
            (inner.channel, snapshot)
        };

        for (id, callback) in snapshot {
            if !self.is_registered(id) {
                continue;
            }

            match panic::catch_unwind(AssertUnwindSafe(|| callback(&pending.value))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    let details = panic_details(payload.as_ref());
                    tracing::error!(
                        channel,
                        subscriber = id,
                        "subscriber panicked during emit: {}",
                        details
                    );
                    report.failures.push(
                        SubscriberFailureSnafu {
                            stage: channel,
                            subscriber: id,
                            details,
                        }
                        .build(),
                    );
                }
            }
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .any(|subscriber| subscriber.id == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

fn panic_details(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle to one registered callback.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the callback now.
    pub fn cancel(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Keeps the callback registered until the notifier itself is dropped.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.remove.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}
