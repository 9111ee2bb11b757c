use crate::protocol::ServerEvent;
use std::collections::VecDeque;

/// The events received during one realtime session, newest first.
///
/// The panel looks at both ends: [`EventLog::oldest`] to detect session
/// creation and [`EventLog::newest`] to pick up the latest completed response.
/// A bounded log keeps the first event and drops the oldest of the rest.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: VecDeque<ServerEvent>,
    capacity: Option<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding at most `capacity` events (never fewer than two).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.max(2)),
            capacity: Some(capacity.max(2)),
        }
    }

    /// Records a newly received event in front of all earlier ones.
    pub fn push(&mut self, event: ServerEvent) {
        self.events.push_front(event);
        if let Some(capacity) = self.capacity {
            if self.events.len() > capacity {
                // The back holds the first event; evict the one after it.
                self.events.remove(self.events.len() - 2);
            }
        }
    }

    /// The most recently received event.
    pub fn newest(&self) -> Option<&ServerEvent> {
        self.events.front()
    }

    /// The first event received in the session.
    pub fn oldest(&self) -> Option<&ServerEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Iterates from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &ServerEvent> {
        self.events.iter()
    }
}

impl FromIterator<ServerEvent> for EventLog {
    /// Builds a log from events in arrival order.
    fn from_iter<I: IntoIterator<Item = ServerEvent>>(iter: I) -> Self {
        let mut log = EventLog::new();
        for event in iter {
            log.push(event);
        }
        log
    }
}
