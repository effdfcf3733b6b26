//! Deferred event bus.
//!
//! Producers (behavior-tree leaves, host systems) push immutable records into
//! an [`EventQueue`]. Nothing happens until the owner of the [`EventBus`]
//! calls [`EventBus::dispatch`], which drains the queue in FIFO order and
//! hands each record to every consumer registered for its type, in
//! registration order. Consumers are where world state actually changes.
//!
//! Dispatch works on a snapshot of the queue taken when it starts. Consumers
//! receive the live queue and may enqueue follow-up events; those land in the
//! next dispatch cycle, never the current one.
//!
//! # Example
//!
//! ```
//! use magick_ecs::prelude::*;
//!
//! #[derive(Debug)]
//! struct Ping(u32);
//! impl Event for Ping {
//!     const KIND: &'static str = "ping";
//! }
//!
//! let mut world = World::new();
//! let mut bus = EventBus::new();
//! bus.register_consumer("pong", |ping: &Ping, _world, queue| {
//!     if ping.0 < 2 {
//!         queue.enqueue(Ping(ping.0 + 1));
//!     }
//!     Ok(())
//! });
//!
//! bus.enqueue(Ping(0));
//! assert_eq!(bus.dispatch(&mut world).delivered, 1);
//! assert_eq!(bus.queue().len(), 1); // Ping(1) waits for the next cycle
//! ```

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::{debug, trace, warn};

use crate::world::World;

/// An immutable record that can travel through the [`EventBus`].
pub trait Event: Any + Send + Sync + fmt::Debug {
    /// Short, stable name used in logs and reports.
    const KIND: &'static str;
}

/// An event waiting in the queue.
struct QueuedEvent {
    seq: u64,
    kind: &'static str,
    type_id: TypeId,
    payload: Box<dyn Any + Send + Sync>,
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// The FIFO of pending events. Producers only ever see this half of the bus.
#[derive(Default)]
pub struct EventQueue {
    pending: VecDeque<QueuedEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Never blocks and never runs consumers.
    pub fn enqueue<E: Event>(&mut self, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(kind = E::KIND, seq, ?event, "event enqueued");
        self.pending.push_back(QueuedEvent {
            seq,
            kind: E::KIND,
            type_id: TypeId::of::<E>(),
            payload: Box::new(event),
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Kinds of the pending events, oldest first.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.pending.iter().map(|e| e.kind).collect()
    }

    /// Pending events of type `E`, oldest first.
    pub fn pending<E: Event>(&self) -> impl Iterator<Item = &E> + '_ {
        self.pending
            .iter()
            .filter_map(|queued| queued.payload.downcast_ref::<E>())
    }

    /// Take every pending event, leaving the queue empty.
    fn drain_all(&mut self) -> VecDeque<QueuedEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.kinds())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Consumers
// ---------------------------------------------------------------------------

type ConsumerFn =
    Box<dyn FnMut(&(dyn Any + Send + Sync), &mut World, &mut EventQueue) -> anyhow::Result<()>>;

struct RegisteredConsumer {
    name: String,
    func: ConsumerFn,
}

/// Summary of one [`EventBus::dispatch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events taken off the queue.
    pub delivered: usize,
    /// Consumer invocations that ran.
    pub consumer_calls: usize,
    /// Consumer invocations that returned an error.
    pub failed: usize,
    /// Events with no registered consumer.
    pub unhandled: usize,
    /// Events enqueued by consumers, waiting for the next cycle.
    pub deferred: usize,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Queue plus consumer table. Owned by the control loop.
#[derive(Default)]
pub struct EventBus {
    queue: EventQueue,
    consumers: HashMap<TypeId, Vec<RegisteredConsumer>>,
    last_report: DispatchReport,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer for events of type `E`. Consumers of the same type
    /// run in registration order.
    pub fn register_consumer<E, F>(&mut self, name: &str, mut consumer: F)
    where
        E: Event,
        F: FnMut(&E, &mut World, &mut EventQueue) -> anyhow::Result<()> + 'static,
    {
        let func: ConsumerFn = Box::new(
            move |payload: &(dyn Any + Send + Sync), world: &mut World, queue: &mut EventQueue| {
                match payload.downcast_ref::<E>() {
                    Some(event) => consumer(event, world, queue),
                    None => Ok(()),
                }
            },
        );
        self.consumers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(RegisteredConsumer {
                name: name.to_owned(),
                func,
            });
        debug!(kind = E::KIND, consumer = name, "registered event consumer");
    }

    /// Number of consumers registered for `E`.
    pub fn consumer_count<E: Event>(&self) -> usize {
        self.consumers.get(&TypeId::of::<E>()).map_or(0, Vec::len)
    }

    /// Shorthand for `queue_mut().enqueue(event)`.
    pub fn enqueue<E: Event>(&mut self, event: E) {
        self.queue.enqueue(event);
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    /// Deliver every event that was pending when the call started.
    ///
    /// Each event is fully handled (all consumers run) before the next one.
    /// A consumer error is logged and counted; the remaining consumers and
    /// events still run.
    pub fn dispatch(&mut self, world: &mut World) -> DispatchReport {
        let batch = self.queue.drain_all();
        let mut report = DispatchReport::default();

        for event in batch {
            report.delivered += 1;
            let Some(consumers) = self.consumers.get_mut(&event.type_id) else {
                debug!(kind = event.kind, seq = event.seq, "no consumer for event");
                report.unhandled += 1;
                continue;
            };
            for consumer in consumers.iter_mut() {
                report.consumer_calls += 1;
                if let Err(error) = (consumer.func)(&*event.payload, world, &mut self.queue) {
                    report.failed += 1;
                    warn!(
                        kind = event.kind,
                        seq = event.seq,
                        consumer = %consumer.name,
                        error = %error,
                        "event consumer failed"
                    );
                }
            }
        }

        report.deferred = self.queue.len();
        if report.delivered > 0 {
            debug!(
                delivered = report.delivered,
                failed = report.failed,
                deferred = report.deferred,
                "dispatched events"
            );
        }
        self.last_report = report.clone();
        report
    }

    /// Report from the last [`dispatch`](Self::dispatch), all zero before the
    /// first one.
    pub fn last_dispatch_report(&self) -> &DispatchReport {
        &self.last_report
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("queue", &self.queue)
            .field("consumer_types", &self.consumers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
