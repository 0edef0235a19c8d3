use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{NetworkInfo, ReadyState};
use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    ReadyStateChange,
    Connect,
    Disconnect,
    AccountChange,
    NetworkChange,
    Error,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadyStateChange => "readyStateChange",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::AccountChange => "accountChange",
            Self::NetworkChange => "networkChange",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    ReadyStateChange(ReadyState),
    Connect(String),
    Disconnect,
    AccountChange(String),
    NetworkChange(NetworkInfo),
    Error(WalletError),
}

impl WalletEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::ReadyStateChange(_) => EventName::ReadyStateChange,
            Self::Connect(_) => EventName::Connect,
            Self::Disconnect => EventName::Disconnect,
            Self::AccountChange(_) => EventName::AccountChange,
            Self::NetworkChange(_) => EventName::NetworkChange,
            Self::Error(_) => EventName::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&WalletEvent) + Send + Sync>;

struct Registration {
    id: ListenerId,
    filter: Option<EventName>,
    once: bool,
    listener: Listener,
}

impl Registration {
    fn accepts(&self, name: EventName) -> bool {
        self.filter.map_or(true, |f| f == name)
    }
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    registrations: Vec<Registration>,
}

/// Publish-subscribe channel shared by an adapter and its consumers.
///
/// Clones share the same listener set. Listeners run synchronously inside `emit`, on a
/// snapshot of the registrations, so a listener may register or remove listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusState>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.state().registrations.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, filter: Option<EventName>, once: bool, listener: Listener) -> ListenerId {
        let mut g = self.state();
        g.next_id = g.next_id.saturating_add(1);
        let id = ListenerId(g.next_id);
        g.registrations.push(Registration {
            id,
            filter,
            once,
            listener,
        });
        id
    }

    pub fn on<F>(&self, name: EventName, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        self.register(Some(name), false, Arc::new(listener))
    }

    /// Receives every event regardless of name.
    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        self.register(None, false, Arc::new(listener))
    }

    /// Removed after the first matching event.
    pub fn once<F>(&self, name: EventName, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        self.register(Some(name), true, Arc::new(listener))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut g = self.state();
        let before = g.registrations.len();
        g.registrations.retain(|r| r.id != id);
        g.registrations.len() != before
    }

    pub fn listener_count(&self, name: EventName) -> usize {
        self.state()
            .registrations
            .iter()
            .filter(|r| r.accepts(name))
            .count()
    }

    /// Returns how many listeners received the event.
    pub fn emit(&self, event: &WalletEvent) -> usize {
        let name = event.name();
        let targets: Vec<Listener> = {
            let mut g = self.state();
            let targets = g
                .registrations
                .iter()
                .filter(|r| r.accepts(name))
                .map(|r| Arc::clone(&r.listener))
                .collect();
            g.registrations.retain(|r| !(r.once && r.accepts(name)));
            targets
        };
        for listener in &targets {
            listener(event);
        }
        targets.len()
    }
}
