// Event bus — the single fan-out point between the engine adapter and
// host listeners

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::event::{EngineEvent, EventName};

type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

struct Registration {
    id: u64,
    callback: Callback,
}

/// Returned by [`EventBus::subscribe`]; pass back to `unsubscribe` to
/// drop a single listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerHandle {
    event: EventName,
    id: u64,
}

impl ListenerHandle {
    pub fn event(&self) -> EventName {
        self.event
    }
}

/// All engine notifications flow through one `publish` call, which
/// converts the typed event to its wire payload once and fans it out to
/// every listener registered for that name.
///
/// Registration and removal are synchronous and safe to call at any
/// time, including before `initialize`.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    listeners: Mutex<HashMap<EventName, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        event: EventName,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .entry(event)
            .or_default()
            .push(Registration {
                id,
                callback: Arc::new(callback),
            });
        ListenerHandle { event, id }
    }

    pub fn unsubscribe(&self, handle: &ListenerHandle) {
        let mut listeners = self.inner.listeners.lock();
        if let Some(registrations) = listeners.get_mut(&handle.event) {
            registrations.retain(|registration| registration.id != handle.id);
        }
    }

    /// Drop every registered listener, for every event.
    pub fn unsubscribe_all(&self) {
        self.inner.listeners.lock().clear();
    }

    pub fn listener_count(&self, event: EventName) -> usize {
        self.inner
            .listeners
            .lock()
            .get(&event)
            .map_or(0, Vec::len)
    }

    pub fn publish(&self, event: &EngineEvent) {
        let name = event.name();
        // Snapshot the callbacks before invoking any of them, so a
        // listener that subscribes or unsubscribes from inside its own
        // callback does not deadlock the registry lock.
        let callbacks: Vec<Callback> = {
            let listeners = self.inner.listeners.lock();
            listeners
                .get(&name)
                .map(|registrations| {
                    registrations
                        .iter()
                        .map(|registration| Arc::clone(&registration.callback))
                        .collect()
                })
                .unwrap_or_default()
        };

        if callbacks.is_empty() {
            tracing::trace!(event = %name, "no listeners registered");
            return;
        }

        let payload = event.to_wire();
        tracing::debug!(event = %name, listeners = callbacks.len(), "dispatching event");
        for callback in &callbacks {
            callback(&payload);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.inner.listeners.lock();
        let total: usize = listeners.values().map(Vec::len).sum();
        write!(f, "EventBus({} listeners)", total)
    }
}
