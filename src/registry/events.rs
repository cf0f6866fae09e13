//! Registry lifecycle events and their listeners.

use super::document::{Fields, SessionRecord};

/// Something that happened to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    /// The registry was read from disk (or defaulted because the file is missing).
    Loaded { session_count: usize },
    Saved { session_count: usize },
    Registered {
        session_id: String,
        session: SessionRecord,
    },
    Unregistered { session_id: String },
    Updated { session_id: String, changes: Fields },
}

impl RegistryEvent {
    /// Short event name.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::Loaded { .. } => "loaded",
            RegistryEvent::Saved { .. } => "saved",
            RegistryEvent::Registered { .. } => "registered",
            RegistryEvent::Unregistered { .. } => "unregistered",
            RegistryEvent::Updated { .. } => "updated",
        }
    }

    /// The session this event concerns, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            RegistryEvent::Registered { session_id, .. }
            | RegistryEvent::Unregistered { session_id }
            | RegistryEvent::Updated { session_id, .. } => Some(session_id),
            RegistryEvent::Loaded { .. } | RegistryEvent::Saved { .. } => None,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&RegistryEvent) + Send>;

/// Listeners called synchronously, in subscription order.
#[derive(Default)]
pub(crate) struct Listeners {
    next: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub(crate) fn subscribe(&mut self, listener: impl FnMut(&RegistryEvent) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: &RegistryEvent) {
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
