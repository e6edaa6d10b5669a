use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::event::{EventState, EventTarget, WorldEvent};
use crate::error::SimError;
use crate::model::{MAX_SUPPORTED_DATE, WorldDate};

/// Heap entry ordered by `(trigger_date, id)`.
#[derive(Debug)]
struct OrderedEvent(WorldEvent);

impl PartialEq for OrderedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.0.order_key() == other.0.order_key()
    }
}

impl Eq for OrderedEvent {}

impl PartialOrd for OrderedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.order_key().cmp(&other.0.order_key())
    }
}

/// Pending events, popped in `(trigger_date, id)` order.
///
/// There is no removal by reference. An event whose target has gone away
/// stays queued until it is popped and fails its validity check.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<OrderedEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event. Dates at or before `current_date` are rejected unless
    /// `allow_past` is set (world setup and snapshot resolve).
    pub fn insert(
        &mut self,
        mut event: WorldEvent,
        current_date: WorldDate,
        allow_past: bool,
    ) -> Result<(), SimError> {
        if event.trigger_date > MAX_SUPPORTED_DATE {
            return Err(SimError::UnsupportedDate {
                event_id: event.id,
                trigger_date: event.trigger_date,
            });
        }
        if !allow_past && event.trigger_date <= current_date {
            return Err(SimError::EventInPast {
                event_id: event.id,
                trigger_date: event.trigger_date,
                current_date,
            });
        }
        event.state = EventState::Queued;
        self.heap.push(Reverse(OrderedEvent(event)));
        Ok(())
    }

    pub fn pop_next(&mut self) -> Option<WorldEvent> {
        self.heap.pop().map(|Reverse(OrderedEvent(e))| e)
    }

    pub fn peek(&self) -> Option<&WorldEvent> {
        self.heap.peek().map(|Reverse(OrderedEvent(e))| e)
    }

    pub fn peek_date(&self) -> Option<WorldDate> {
        self.peek().map(|e| e.trigger_date)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Pending events in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &WorldEvent> {
        self.heap.iter().map(|Reverse(OrderedEvent(e))| e)
    }

    /// Queued events aimed at `target`, stale ones included, in pop order.
    pub fn pending_for(&self, target: EventTarget) -> Vec<&WorldEvent> {
        let mut events: Vec<&WorldEvent> = self.iter().filter(|e| e.target() == target).collect();
        events.sort_by_key(|e| e.order_key());
        events
    }
}
