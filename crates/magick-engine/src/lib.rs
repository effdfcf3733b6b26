//! Magick Engine -- behavior trees, attachment and the control loop.
//!
//! This crate builds on [`magick_ecs`] to provide the decision side of the
//! runtime: behavior trees that let entities choose actions each tick, the
//! hardpoint attachment relation and its event consumers, and a fixed-step
//! [`TickLoop`](tick::TickLoop) that evaluates trees and then dispatches the
//! events they produced.
//!
//! # Quick Start
//!
//! ```
//! use magick_engine::prelude::*;
//!
//! let mut tick_loop = TickLoop::new(World::new(), TickConfig::default());
//! let hardpoint = tick_loop.register_attachment().unwrap();
//!
//! let world = tick_loop.world_mut();
//! let item = world.spawn_empty();
//! let holding = ComponentDescriptor::with_init(hardpoint, move |h: &mut Hardpoint| {
//!     h.attached = Some(item);
//! });
//! let holder = factory::build(world, [holding]).unwrap();
//! tick_loop.trees_mut().insert(holder, DropItem);
//!
//! tick_loop.tick();
//! assert_eq!(tick_loop.world().get::<Hardpoint>(holder).unwrap().attached, None);
//! ```

#![deny(unsafe_code)]

pub mod ai;
pub mod attachment;
pub mod error;
pub mod events;
pub mod logging;
pub mod tick;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use magick_ecs;

pub use error::EngineError;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use magick_ecs::prelude::*;

    // Engine-specific exports.
    pub use crate::ai::{
        Action, BehaviorTrees, BoxedNode, CompletionState, Condition, DropItem, Inverter, Parallel,
        Selector, Sequence, Succeeder, TickContext, TreeNode, TreeRunReport,
    };
    pub use crate::attachment::{find_host, register_attachment, Hardpoint, HARDPOINT_KIND};
    pub use crate::error::EngineError;
    pub use crate::events::{Attach, Detach, Interact, Use};
    pub use crate::logging::init_logging;
    pub use crate::tick::{SystemFn, TickConfig, TickDiagnostics, TickLoop};
}
