//! Registry of live terminals, keyed by id.
//!
//! Lock order is registry -> entry state -> entry listeners. Listeners are
//! cloned out under the locks and invoked after every lock is released, so a
//! listener may freely call back into the bridge.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use termbridge_common::mutex_lock_or_recover;
use termbridge_common::rwlock_read_or_recover;
use termbridge_common::rwlock_write_or_recover;
use termbridge_protocol::EngineEvent;
use termbridge_protocol::EngineNotification;
use termbridge_protocol::EventKind;
use termbridge_protocol::TerminalOptions;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::error::BridgeError;
use crate::listeners::Delivery;
use crate::listeners::TerminalEvents;

/// Outcome of routing one engine notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A listener ran.
    Delivered,
    /// The terminal is live but has no listener for this event kind.
    Unhandled,
    /// Held until the terminal's first-render notification has fired.
    Deferred,
    /// No live terminal has this id, or its early-event buffer is full.
    Dropped,
}

enum EntryState {
    /// Registered locally, engine acknowledgement outstanding.
    Pending(Vec<EngineEvent>),
    Live,
    Disposed,
}

pub(crate) struct TerminalEntry {
    id: String,
    options: TerminalOptions,
    state: Mutex<EntryState>,
    events: Mutex<TerminalEvents>,
    acknowledged: AtomicBool,
    max_pending_events: usize,
}

impl TerminalEntry {
    /// `max_pending_events` bounds the events held before registration is
    /// acknowledged; later ones are dropped.
    pub(crate) fn new(
        id: String,
        options: TerminalOptions,
        events: TerminalEvents,
        max_pending_events: usize,
    ) -> Self {
        Self {
            id,
            options,
            state: Mutex::new(EntryState::Pending(Vec::new())),
            events: Mutex::new(events),
            acknowledged: AtomicBool::new(false),
            max_pending_events,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn options(&self) -> &TerminalOptions {
        &self.options
    }

    pub(crate) fn is_disposed(&self) -> bool {
        matches!(*mutex_lock_or_recover(&self.state), EntryState::Disposed)
    }

    /// Acknowledged by the engine and not disposed.
    pub(crate) fn is_live(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst) && !self.is_disposed()
    }

    /// Returns false if the entry was already disposed.
    pub(crate) fn mark_disposed(&self) -> bool {
        let mut state = mutex_lock_or_recover(&self.state);
        if matches!(*state, EntryState::Disposed) {
            return false;
        }
        *state = EntryState::Disposed;
        true
    }

    pub(crate) fn update_events(&self, f: impl FnOnce(&mut TerminalEvents)) {
        let mut events = mutex_lock_or_recover(&self.events);
        f(&mut events);
    }

    pub(crate) fn has_listener(&self, kind: EventKind) -> bool {
        mutex_lock_or_recover(&self.events).has_listener(kind)
    }

    /// Fires the first-render listener, then drains events that arrived while
    /// registration was pending, in arrival order. Events dispatched during
    /// the drain are queued behind it; the entry turns live once the queue is
    /// empty.
    pub(crate) fn go_live(&self) {
        self.acknowledged.store(true, Ordering::SeqCst);
        let first_render = mutex_lock_or_recover(&self.events).first_render_delivery();
        if let Some(deliver) = first_render {
            deliver();
        }

        loop {
            let batch = {
                let mut state = mutex_lock_or_recover(&self.state);
                let batch = match &mut *state {
                    EntryState::Pending(queued) => std::mem::take(queued),
                    EntryState::Live | EntryState::Disposed => return,
                };
                if batch.is_empty() {
                    *state = EntryState::Live;
                    return;
                }
                batch
            };
            trace!(terminal_id = %self.id, count = batch.len(), "Replaying early events");
            for event in batch {
                if let Some(deliver) = mutex_lock_or_recover(&self.events).delivery(event) {
                    deliver();
                }
            }
        }
    }

    fn route(&self, event: EngineEvent) -> Result<Option<Delivery>, Dispatch> {
        {
            let mut state = mutex_lock_or_recover(&self.state);
            match &mut *state {
                EntryState::Pending(queued) if queued.len() >= self.max_pending_events => {
                    warn!(
                        terminal_id = %self.id,
                        event = %event.kind(),
                        limit = self.max_pending_events,
                        "Early event buffer full; dropping event"
                    );
                    return Err(Dispatch::Dropped);
                }
                EntryState::Pending(queued) => {
                    queued.push(event);
                    return Err(Dispatch::Deferred);
                }
                EntryState::Disposed => return Err(Dispatch::Dropped),
                EntryState::Live => {}
            }
        }
        Ok(mutex_lock_or_recover(&self.events).delivery(event))
    }
}

pub(crate) struct TerminalRegistry {
    entries: RwLock<HashMap<String, Arc<TerminalEntry>>>,
    max_terminals: usize,
}

impl TerminalRegistry {
    pub(crate) fn new(max_terminals: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_terminals,
        }
    }

    pub(crate) fn register(&self, entry: Arc<TerminalEntry>) -> Result<(), BridgeError> {
        let mut entries = rwlock_write_or_recover(&self.entries);
        if entries.contains_key(entry.id()) {
            return Err(BridgeError::AlreadyExists(entry.id().to_string()));
        }
        if entries.len() >= self.max_terminals {
            return Err(BridgeError::LimitReached(self.max_terminals));
        }
        entries.insert(entry.id().to_string(), entry);
        Ok(())
    }

    /// Removes `entry` only if it is still the registration for its id, so a
    /// stale handle cannot unregister a newer terminal that reused the id.
    pub(crate) fn remove(&self, entry: &Arc<TerminalEntry>) -> bool {
        let mut entries = rwlock_write_or_recover(&self.entries);
        match entries.get(entry.id()) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(entry.id());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<TerminalEntry>> {
        rwlock_read_or_recover(&self.entries).get(id).cloned()
    }

    pub(crate) fn contains(&self, entry: &Arc<TerminalEntry>) -> bool {
        rwlock_read_or_recover(&self.entries)
            .get(entry.id())
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = rwlock_read_or_recover(&self.entries).keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn len(&self) -> usize {
        rwlock_read_or_recover(&self.entries).len()
    }

    /// Routes a notification to the listener of the terminal registered under
    /// its id. The lookup and the listener capture happen under the registry
    /// read lock, so removal and routing are mutually atomic.
    pub(crate) fn dispatch(&self, notification: EngineNotification) -> Dispatch {
        let EngineNotification { terminal_id, event } = notification;
        let kind = event.kind();

        let routed = {
            let entries = rwlock_read_or_recover(&self.entries);
            match entries.get(&terminal_id) {
                Some(entry) => entry.route(event),
                None => Err(Dispatch::Dropped),
            }
        };

        match routed {
            Ok(Some(deliver)) => {
                trace!(terminal_id = %terminal_id, event = %kind, "Delivering event");
                deliver();
                Dispatch::Delivered
            }
            Ok(None) => Dispatch::Unhandled,
            Err(Dispatch::Dropped) => {
                debug!(terminal_id = %terminal_id, event = %kind, "Dropping event for terminal that is not live");
                Dispatch::Dropped
            }
            Err(outcome) => outcome,
        }
    }
}
