//! Behavior trees: per-entity decision making with three-valued outcomes.
//!
//! A tree is a fixed shape of boxed [`TreeNode`]s evaluated once per tick
//! for the entity that owns it. Nodes see the world read-only through a
//! [`TickContext`]; the only way a node causes an effect is by enqueueing an
//! event, which is applied at the next dispatch point after the tick.
//!
//! `RUNNING` is a plain value. A composite that sees a running child records
//! that child's index and resumes there on the next tick; no stack frames or
//! coroutines are kept alive between ticks.
//!
//! # Example
//!
//! ```
//! use magick_engine::prelude::*;
//!
//! let mut world = World::new();
//! let root = world.spawn_empty();
//! let mut events = EventQueue::new();
//!
//! let mut tree = Sequence::new()
//!     .with(Condition::new(|ctx| ctx.world.is_alive(ctx.root)))
//!     .with(Condition::new(|ctx| ctx.tick > 0));
//!
//! let mut ctx = TickContext::new(root, &world, &mut events, 0);
//! assert_eq!(tree.act(&mut ctx), CompletionState::Fail);
//! ```

mod composite;
mod decorator;
mod leaf;
mod system;

pub use composite::{Parallel, Selector, Sequence};
pub use decorator::{Inverter, Succeeder};
pub use leaf::{Action, Condition, DropItem};
pub use system::{BehaviorTrees, TreeRunReport};

use serde::{Deserialize, Serialize};

use magick_ecs::entity::EntityId;
use magick_ecs::event::{Event, EventQueue};
use magick_ecs::world::World;

/// Outcome of evaluating a node for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionState {
    Success,
    Fail,
    Running,
}

impl CompletionState {
    pub fn is_done(self) -> bool {
        self != CompletionState::Running
    }
}

/// Everything a node may touch during one evaluation.
pub struct TickContext<'a> {
    /// The entity whose tree is being evaluated.
    pub root: EntityId,
    pub world: &'a World,
    pub events: &'a mut EventQueue,
    /// Index of the tick being evaluated, starting at 0.
    pub tick: u64,
}

impl<'a> TickContext<'a> {
    pub fn new(root: EntityId, world: &'a World, events: &'a mut EventQueue, tick: u64) -> Self {
        Self {
            root,
            world,
            events,
            tick,
        }
    }

    /// Shorthand for `self.events.enqueue(event)`.
    pub fn emit<E: Event>(&mut self, event: E) {
        self.events.enqueue(event);
    }
}

/// A behavior-tree node.
pub trait TreeNode {
    /// Evaluate this node for `ctx.root`.
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState;

    /// Forget any `RUNNING` bookkeeping. Called on nodes that were running
    /// when an ancestor finished early.
    fn reset(&mut self) {}
}

pub type BoxedNode = Box<dyn TreeNode>;

impl<N: TreeNode + ?Sized> TreeNode for Box<N> {
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        (**self).act(ctx)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
