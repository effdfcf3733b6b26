//! Magick ECS -- component composition, live entities and deferred events.
//!
//! This crate provides the composition core of the Magick runtime:
//!
//! - a [`KindRegistry`](component::KindRegistry) describing component kinds
//!   and their single-inheritance hierarchy,
//! - [`Archetype`](archetype::Archetype) values, immutable descriptor lists
//!   edited through a hierarchy-aware set algebra,
//! - the [`factory`] that turns descriptor lists into live entities in a
//!   [`World`](world::World),
//! - the [`EventBus`](event::EventBus), a FIFO of immutable records drained at
//!   an explicit dispatch point.
//!
//! # Quick Start
//!
//! ```
//! use magick_ecs::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Body;
//!
//! #[derive(Debug, Default)]
//! struct Grip { strength: u32 }
//!
//! let mut world = World::new();
//! let body = world.register_kind::<Body>("body").unwrap();
//! let grip = world.register_kind::<Grip>("grip").unwrap();
//!
//! let base = Archetype::build(world.registry(), [body.into()]).unwrap();
//! let grabber = base
//!     .add(
//!         world.registry(),
//!         [ComponentDescriptor::with_init(grip, |g: &mut Grip| g.strength = 3)],
//!     )
//!     .unwrap();
//! assert_eq!(base.len(), 1);
//!
//! let entity = factory::instantiate(&mut world, &grabber).unwrap();
//! assert_eq!(world.get::<Grip>(entity).map(|g| g.strength), Some(3));
//! ```

#![deny(unsafe_code)]

pub mod archetype;
pub mod component;
pub mod descriptor;
pub mod entity;
pub mod event;
pub mod factory;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by composition and world operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// A candidate's kind equals, or is an ancestor of, a kind already kept.
    #[error("component of kind '{kind}', or a more specific one ('{existing}'), is already present")]
    DuplicateComponent { kind: String, existing: String },

    /// A candidate tried to take the place of its more general supertype.
    #[error("kind '{kind}' would override its supertype '{ancestor}'; use replace instead")]
    ConflictingOverride { kind: String, ancestor: String },

    /// A remove key matched no descriptor.
    #[error("no component related to kind '{kind}' found, cannot remove")]
    NothingToRemove { kind: String },

    /// A replace candidate matched no descriptor.
    #[error("no component of kind '{kind}' or a subkind found, cannot replace")]
    NothingToReplace { kind: String },

    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A kind id not issued by this registry.
    #[error("unknown component kind {kind:?}")]
    UnknownKind { kind: component::KindId },

    /// A Rust type that was never registered as a kind.
    #[error("type '{type_name}' is not registered as a component kind")]
    UnregisteredType { type_name: &'static str },

    /// The kind name is already taken by another type.
    #[error("component kind name '{name}' is already registered for a different type")]
    DuplicateKind { name: String },

    /// The supertype given at registration does not exist.
    #[error("cannot register '{name}': parent kind {parent:?} is not registered")]
    UnknownParent { name: String, parent: component::KindId },

    /// An initializer expects a different type than the kind's instances.
    #[error("initializer for kind '{kind}' expects type '{expected}'")]
    KindTypeMismatch { kind: String, expected: &'static str },

    /// Parenting would make an entity its own ancestor.
    #[error("parenting {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle {
        child: entity::EntityId,
        parent: entity::EntityId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::archetype::Archetype;
    pub use crate::component::{ComponentBox, KindId, KindInfo, KindRegistry};
    pub use crate::descriptor::{ComponentDescriptor, Initializer};
    pub use crate::entity::EntityId;
    pub use crate::event::{DispatchReport, Event, EventBus, EventQueue};
    pub use crate::factory;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
