//! Single-threaded event bus used to wire the interaction layer.
//!
//! Two kinds of values flow through it:
//! - [`EventStream`]: discrete events delivered to subscribers in subscription order.
//! - [`Signal`]: a latest value plus the stream of its changes.
//!
//! The composition operators the session relies on are [`combine_latest`]
//! (recompute whenever any input changes, using the cached latest value of the
//! others) and [`switch_latest`] (follow only the newest inner stream,
//! unsubscribing the previous one before subscribing the new one).
//!
//! Derived streams own their sources and their upstream subscriptions and
//! observe themselves weakly. A chain such as `s.filter(..).map(..)` stays
//! live through its last link, and dropping that link tears the chain down.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Registry<T> {
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
    upstream: Vec<Subscription>,
    // Dropped after `upstream` so unsubscribing still finds the source alive.
    sources: Vec<Box<dyn Any>>,
}

/// Handle to one subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(self) {}

    /// Keep the subscription alive for as long as the stream lives.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

pub struct EventStream<T> {
    registry: Rc<RefCell<Registry<T>>>,
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T: 'static> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WeakStream<T> {
    registry: Weak<RefCell<Registry<T>>>,
}

impl<T> Clone for WeakStream<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T> WeakStream<T> {
    pub fn upgrade(&self) -> Option<EventStream<T>> {
        self.registry
            .upgrade()
            .map(|registry| EventStream { registry })
    }
}

impl<T: 'static> EventStream<T> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                subscribers: Vec::new(),
                upstream: Vec::new(),
                sources: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, f: impl FnMut(&T) + 'static) -> Subscription {
        let callback: Callback<T> = Rc::new(RefCell::new(f));
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id;
            reg.next_id += 1;
            reg.subscribers.push((id, callback));
            id
        };
        let weak = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(reg) = weak.upgrade() {
                // Drop the callback after the borrow ends; it may own other subscriptions.
                let removed = {
                    let mut reg = reg.borrow_mut();
                    reg.subscribers
                        .iter()
                        .position(|(i, _)| *i == id)
                        .map(|pos| reg.subscribers.remove(pos))
                };
                drop(removed);
            }
        })
    }

    /// Deliver `value` to every current subscriber.
    ///
    /// Subscribers removed by an earlier subscriber during the same emit are
    /// skipped. A subscriber that re-enters itself is skipped with a warning.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(u64, Callback<T>)> = self
            .registry
            .borrow()
            .subscribers
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();
        for (id, callback) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(value),
                Err(_) => log::warn!("[signal] skipped re-entrant delivery to subscriber {}", id),
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().subscribers.len()
    }

    pub fn downgrade(&self) -> WeakStream<T> {
        WeakStream {
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn map<U: 'static>(&self, f: impl Fn(&T) -> U + 'static) -> EventStream<U> {
        let out = EventStream::new();
        let weak = out.downgrade();
        let sub = self.subscribe(move |v| {
            if let Some(out) = weak.upgrade() {
                out.emit(&f(v));
            }
        });
        out.hold(sub);
        out.keep(self.clone());
        out
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool + 'static) -> EventStream<T> {
        let out = EventStream::new();
        let weak = out.downgrade();
        let sub = self.subscribe(move |v| {
            if pred(v) {
                if let Some(out) = weak.upgrade() {
                    out.emit(v);
                }
            }
        });
        out.hold(sub);
        out.keep(self.clone());
        out
    }

    fn hold(&self, sub: Subscription) {
        self.registry.borrow_mut().upstream.push(sub);
    }

    fn keep(&self, source: impl Any) {
        self.registry.borrow_mut().sources.push(Box::new(source));
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.registry
            .borrow()
            .subscribers
            .iter()
            .any(|(i, _)| *i == id)
    }
}

/// Follow the newest inner stream emitted by `outer`.
///
/// When a new inner stream arrives the subscription to the previous one is
/// cancelled before the new one is subscribed, so late events from an
/// abandoned inner stream never reach the output.
pub fn switch_latest<T: 'static>(outer: &EventStream<EventStream<T>>) -> EventStream<T> {
    let out = EventStream::new();
    let weak = out.downgrade();
    let current: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let sub = outer.subscribe(move |inner: &EventStream<T>| {
        let previous = current.borrow_mut().take();
        drop(previous);
        let weak = weak.clone();
        let next = inner.subscribe(move |v| {
            if let Some(out) = weak.upgrade() {
                out.emit(v);
            }
        });
        *current.borrow_mut() = Some(next);
    });
    out.hold(sub);
    out.keep(outer.clone());
    out
}

/// Latest value plus a stream of changes.
pub struct Signal<T> {
    value: Rc<RefCell<T>>,
    changes: EventStream<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            changes: self.changes.clone(),
        }
    }
}

struct WeakSignal<T> {
    value: Weak<RefCell<T>>,
    changes: WeakStream<T>,
}

impl<T> Clone for WeakSignal<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            changes: self.changes.clone(),
        }
    }
}

impl<T> WeakSignal<T> {
    fn upgrade(&self) -> Option<Signal<T>> {
        Some(Signal {
            value: self.value.upgrade()?,
            changes: self.changes.upgrade()?,
        })
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(initial)),
            changes: EventStream::new(),
        }
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value.clone();
        self.changes.emit(&value);
    }

    pub fn subscribe(&self, f: impl FnMut(&T) + 'static) -> Subscription {
        self.changes.subscribe(f)
    }

    pub fn changes(&self) -> &EventStream<T> {
        &self.changes
    }

    pub fn map<U: Clone + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Signal<U> {
        let out = Signal::new(self.with(|v| f(v)));
        let weak = out.downgrade();
        let sub = self.subscribe(move |v| {
            if let Some(out) = weak.upgrade() {
                out.set(f(v));
            }
        });
        out.changes.hold(sub);
        out.changes.keep(self.clone());
        out
    }

    fn downgrade(&self) -> WeakSignal<T> {
        WeakSignal {
            value: Rc::downgrade(&self.value),
            changes: self.changes.downgrade(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Store and announce `value` only when it differs from the current one.
    pub fn set_if_changed(&self, value: T) -> bool {
        if *self.value.borrow() == value {
            return false;
        }
        self.set(value);
        true
    }
}

/// Join two signals: the output is recomputed whenever either input changes,
/// using the latest cached value of the other.
pub fn combine_latest<A, B, C>(
    a: &Signal<A>,
    b: &Signal<B>,
    f: impl Fn(&A, &B) -> C + 'static,
) -> Signal<C>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    let out = Signal::new(f(&*a.value.borrow(), &*b.value.borrow()));
    let f = Rc::new(f);

    let sub_a = {
        let f = f.clone();
        let latest_b = b.value.clone();
        let weak = out.downgrade();
        a.subscribe(move |va| {
            if let Some(out) = weak.upgrade() {
                let next = f(va, &*latest_b.borrow());
                out.set(next);
            }
        })
    };
    let sub_b = {
        let latest_a = a.value.clone();
        let weak = out.downgrade();
        b.subscribe(move |vb| {
            if let Some(out) = weak.upgrade() {
                let next = f(&*latest_a.borrow(), vb);
                out.set(next);
            }
        })
    };
    out.changes.hold(sub_a);
    out.changes.hold(sub_b);
    out.changes.keep((a.clone(), b.clone()));
    out
}
