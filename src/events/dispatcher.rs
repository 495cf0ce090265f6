//! In-process event bus fed by webhook deliveries.
//!
//! Listeners are kept per event name in insertion order. Dispatch works on a
//! snapshot of that list, so registration may race with delivery. Every
//! callback runs on its own task and a panicking listener is logged and
//! otherwise ignored.

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::events::types::{EngineEvent, EngineEventName, EngineEventPayload};
use crate::observability::metrics;

/// Predicate deciding whether a payload reaches a listener.
pub type EventFilter<P> = Box<dyn Fn(&P) -> bool + Send + Sync>;

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Whether a listener survives its first delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerMode {
    Persistent,
    Once,
}

struct Listener {
    id: ListenerId,
    mode: ListenerMode,
    /// Set when a once listener has been claimed by a dispatch.
    spent: AtomicBool,
    accepts: Box<dyn Fn(&EngineEvent) -> bool + Send + Sync>,
    invoke: Box<dyn Fn(&EngineEvent) -> Option<BoxFuture<'static, ()>> + Send + Sync>,
}

impl Listener {
    /// Claim this listener for one delivery.
    fn claim(&self) -> bool {
        match self.mode {
            ListenerMode::Persistent => true,
            ListenerMode::Once => !self.spent.swap(true, Ordering::SeqCst),
        }
    }

    fn is_spent(&self) -> bool {
        self.mode == ListenerMode::Once && self.spent.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct DispatcherInner {
    listeners: DashMap<EngineEventName, Vec<Arc<Listener>>>,
    next_id: AtomicU64,
}

/// Shared handle to the listener registry.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events carrying payload `P`.
    pub fn attach<P, F, Fut>(
        &self,
        mode: ListenerMode,
        callback: F,
        filter: Option<EventFilter<P>>,
    ) -> ListenerId
    where
        P: EngineEventPayload,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let accepts = move |event: &EngineEvent| match P::from_event(event) {
            Some(payload) => filter.as_ref().map_or(true, |filter| filter(payload)),
            None => false,
        };
        let invoke = move |event: &EngineEvent| {
            P::from_event(event)
                .cloned()
                .map(|payload| callback(payload).boxed())
        };

        let listener = Arc::new(Listener {
            id,
            mode,
            spent: AtomicBool::new(false),
            accepts: Box::new(accepts),
            invoke: Box::new(invoke),
        });
        self.inner.listeners.entry(P::EVENT).or_default().push(listener);

        tracing::debug!(event = %P::EVENT, listener = %id, mode = ?mode, "Listener attached");
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn detach(&self, event: EngineEventName, id: ListenerId) -> bool {
        let Some(mut listeners) = self.inner.listeners.get_mut(&event) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        before != listeners.len()
    }

    /// Number of live listeners for `event`.
    pub fn listener_count(&self, event: EngineEventName) -> usize {
        self.inner
            .listeners
            .get(&event)
            .map(|listeners| listeners.iter().filter(|l| !l.is_spent()).count())
            .unwrap_or(0)
    }

    /// Deliver `event` to every accepting listener, in registration order.
    ///
    /// Returns how many listeners were invoked. Callbacks run on spawned
    /// tasks, so this must be called from within a Tokio runtime.
    pub fn dispatch(&self, event: EngineEvent) -> usize {
        let name = event.name();
        let snapshot: Vec<Arc<Listener>> = match self.inner.listeners.get(&name) {
            Some(listeners) => listeners.value().clone(),
            None => Vec::new(),
        };
        let delivery = Uuid::new_v4();

        let mut delivered = 0;
        let mut consumed_once = false;

        for listener in snapshot {
            if !(listener.accepts)(&event) {
                tracing::trace!(event = %name, listener = %listener.id, "Filtered out");
                continue;
            }
            if !listener.claim() {
                continue;
            }
            consumed_once |= listener.mode == ListenerMode::Once;
            delivered += 1;

            match panic::catch_unwind(AssertUnwindSafe(|| (listener.invoke)(&event))) {
                Ok(Some(task)) => {
                    tokio::spawn(run_isolated(task, name, listener.id, delivery));
                }
                Ok(None) => {}
                Err(_) => {
                    tracing::error!(event = %name, listener = %listener.id, %delivery, "Listener panicked");
                }
            }
        }

        if consumed_once {
            if let Some(mut listeners) = self.inner.listeners.get_mut(&name) {
                listeners.retain(|listener| !listener.is_spent());
            }
        }

        tracing::debug!(event = %name, %delivery, delivered, "Event dispatched");
        metrics::record_dispatch(name, delivered);
        delivered
    }
}

async fn run_isolated(task: BoxFuture<'static, ()>, event: EngineEventName, id: ListenerId, delivery: Uuid) {
    if AssertUnwindSafe(task).catch_unwind().await.is_err() {
        tracing::error!(event = %event, listener = %id, %delivery, "Listener panicked");
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("EventDispatcher");
        for name in EngineEventName::ALL {
            debug.field(name.as_str(), &self.listener_count(name));
        }
        debug.finish()
    }
}
