//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted while the [`crate::star::Star`] runs its production,
//! requisition, dispatch and freight phases, and delivered in batch during
//! the post-tick phase. Each event kind has its own [`EventBuffer`] ring
//! buffer with a configurable capacity.
//!
//! Listeners are read-only observers (status panels, audio, analytics);
//! they cannot mutate the simulation. Event kinds can be suppressed via
//! [`EventBus::suppress`], which prevents any allocation or recording for
//! that kind.

use crate::fixed::Ticks;
use crate::id::*;
use crate::industry::StallReason;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Production --
    CycleStarted {
        node: NodeId,
        tick: Ticks,
    },
    CycleCompleted {
        node: NodeId,
        tick: Ticks,
    },
    ResourceConsumed {
        node: NodeId,
        resource_type: ResourceType,
        amount: u32,
        tick: Ticks,
    },
    ResourceProduced {
        node: NodeId,
        resource_type: ResourceType,
        amount: u32,
        tick: Ticks,
    },
    NodeStalled {
        node: NodeId,
        reason: StallReason,
        tick: Ticks,
    },

    // -- Contracts --
    ContractPosted {
        contract: ContractId,
        issuer: CompanyId,
        tick: Ticks,
    },
    ContractAccepted {
        contract: ContractId,
        owner: CompanyId,
        employee: EmployeeId,
        tick: Ticks,
    },
    ContractCompleted {
        contract: ContractId,
        tick: Ticks,
    },
    ContractFailed {
        contract: ContractId,
        attempts: u32,
        tick: Ticks,
    },
    ContractWithdrawn {
        contract: ContractId,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CycleStarted,
    CycleCompleted,
    ResourceConsumed,
    ResourceProduced,
    NodeStalled,
    ContractPosted,
    ContractAccepted,
    ContractCompleted,
    ContractFailed,
    ContractWithdrawn,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 10;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CycleStarted { .. } => EventKind::CycleStarted,
            Event::CycleCompleted { .. } => EventKind::CycleCompleted,
            Event::ResourceConsumed { .. } => EventKind::ResourceConsumed,
            Event::ResourceProduced { .. } => EventKind::ResourceProduced,
            Event::NodeStalled { .. } => EventKind::NodeStalled,
            Event::ContractPosted { .. } => EventKind::ContractPosted,
            Event::ContractAccepted { .. } => EventKind::ContractAccepted,
            Event::ContractCompleted { .. } => EventKind::ContractCompleted,
            Event::ContractFailed { .. } => EventKind::ContractFailed,
            Event::ContractWithdrawn { .. } => EventKind::ContractWithdrawn,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer — pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |i| self.events[(start + i) % self.capacity()].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A listener receives events read-only.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Priority level for listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct ListenerEntry {
    listener: Listener,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// The central event bus. Holds one ring buffer per event kind, listener
/// lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Record an event for delivery at the end of the step. No-ops if the
    /// kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener with normal priority and no filter.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.on_filtered(kind, ListenerPriority::Normal, None, listener);
    }

    /// Register a listener with explicit priority and optional filter.
    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let entries = &mut self.listeners[kind.index()];
        entries.push(ListenerEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
        entries.sort_by_key(|e| (e.priority, e.insertion_order));
    }

    /// Deliver all buffered events to listeners, then clear the buffers.
    ///
    /// Kinds are delivered in declaration order; within a kind, each
    /// listener (by priority, then registration order) sees the events
    /// oldest to newest.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.iter().cloned().collect();
            buffer.clear();

            for entry in &mut self.listeners[idx] {
                for event in &events {
                    if let Some(filter) = &entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
        }
    }

    /// Count of events currently buffered for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear all buffers. Listeners and suppression settings stay.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn node() -> NodeId {
        let mut map = SlotMap::<NodeId, ()>::with_key();
        map.insert(())
    }

    fn started(tick: Ticks) -> Event {
        Event::CycleStarted { node: node(), tick }
    }

    #[test]
    fn ring_buffer_drops_oldest() {
        let mut buf = EventBuffer::new(2);
        buf.push(started(1));
        buf.push(started(2));
        buf.push(started(3));
        let ticks: Vec<Ticks> = buf
            .iter()
            .map(|e| match e {
                Event::CycleStarted { tick, .. } => *tick,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ticks, vec![2, 3]);
        assert_eq!(buf.total_written(), 3);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn suppressed_events_are_not_buffered() {
        let mut bus = EventBus::new(8);
        bus.suppress(EventKind::CycleStarted);
        bus.emit(started(0));
        assert!(bus.is_suppressed(EventKind::CycleStarted));
        assert_eq!(bus.buffered_count(EventKind::CycleStarted), 0);
        assert_eq!(bus.total_emitted(EventKind::CycleStarted), 0);
    }

    #[test]
    fn deliver_calls_listeners_once_and_clears() {
        let mut bus = EventBus::new(8);
        let seen = Rc::new(RefCell::new(0));
        let s = seen.clone();
        bus.on(EventKind::CycleStarted, Box::new(move |_| *s.borrow_mut() += 1));

        bus.emit(started(0));
        bus.emit(started(0));
        bus.deliver();
        assert_eq!(*seen.borrow(), 2);
        assert_eq!(bus.buffered_count(EventKind::CycleStarted), 0);

        // Nothing new: no double delivery.
        bus.deliver();
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn priorities_order_listeners() {
        let mut bus = EventBus::new(8);
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        bus.on_filtered(
            EventKind::CycleStarted,
            ListenerPriority::Post,
            None,
            Box::new(move |_| o.borrow_mut().push("post")),
        );
        let o = order.clone();
        bus.on_filtered(
            EventKind::CycleStarted,
            ListenerPriority::Pre,
            None,
            Box::new(move |_| o.borrow_mut().push("pre")),
        );

        bus.emit(started(0));
        bus.deliver();
        assert_eq!(*order.borrow(), vec!["pre", "post"]);
    }

    #[test]
    fn filters_skip_events() {
        let mut bus = EventBus::new(8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        bus.on_filtered(
            EventKind::CycleStarted,
            ListenerPriority::Normal,
            Some(Box::new(|e| matches!(e, Event::CycleStarted { tick, .. } if *tick > 1))),
            Box::new(move |e| s.borrow_mut().push(e.clone())),
        );
        bus.emit(started(1));
        bus.emit(started(2));
        bus.deliver();
        assert_eq!(seen.borrow().len(), 1);
    }
}
