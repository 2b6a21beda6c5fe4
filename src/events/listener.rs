use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::event::{EventPhase, FederatedEvent};

pub type Listener = Rc<dyn Fn(&mut FederatedEvent)>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerOptions {
    /// Fire during the capture phase instead of the bubble phase
    pub capture: bool,
    /// Remove after the first call
    pub once: bool,
    /// `prevent_default` is ignored
    pub passive: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }

    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    pub fn passive() -> Self {
        Self {
            passive: true,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub callback: Listener,
    pub options: ListenerOptions,
}

/// Listeners attached to one element, keyed by event type.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    entries: Vec<(String, ListenerEntry)>,
}

impl ListenerRegistry {
    pub fn add(&mut self, event_type: &str, callback: Listener, options: ListenerOptions) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.push((
            event_type.to_string(),
            ListenerEntry {
                id,
                callback,
                options,
            },
        ));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, e)| e.id != id);
        self.entries.len() != before
    }

    pub fn remove_type(&mut self, event_type: &str) {
        self.entries.retain(|(t, _)| t != event_type);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn has(&self, event_type: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == event_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listeners for `event_type` that fire in `phase`, in registration order.
    ///
    /// The returned list is a snapshot: listeners added or removed while it
    /// runs do not change it.
    pub(crate) fn snapshot(&self, event_type: &str, phase: EventPhase) -> Vec<ListenerEntry> {
        self.entries
            .iter()
            .filter(|(t, _)| t == event_type)
            .filter(|(_, e)| match phase {
                EventPhase::Capturing => e.options.capture,
                EventPhase::Bubbling => !e.options.capture,
                EventPhase::AtTarget | EventPhase::None => true,
            })
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Rc::new(|_: &mut FederatedEvent| {})
    }

    #[test]
    fn test_snapshot_by_phase() {
        let mut registry = ListenerRegistry::default();
        let capture = registry.add("click", noop(), ListenerOptions::capture());
        let bubble = registry.add("click", noop(), ListenerOptions::default());
        registry.add("wheel", noop(), ListenerOptions::passive());

        let ids = |phase| {
            registry
                .snapshot("click", phase)
                .iter()
                .map(|e| e.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(EventPhase::Capturing), vec![capture]);
        assert_eq!(ids(EventPhase::Bubbling), vec![bubble]);
        assert_eq!(ids(EventPhase::AtTarget), vec![capture, bubble]);
    }

    #[test]
    fn test_remove() {
        let mut registry = ListenerRegistry::default();
        let id = registry.add("click", noop(), ListenerOptions::once());
        assert!(registry.has("click"));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }
}
