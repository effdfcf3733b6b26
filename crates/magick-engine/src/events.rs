//! Event records produced by behavior trees and host systems.
//!
//! Records are plain immutable values carrying the entities involved. Only
//! [`Detach`] and [`Attach`] have engine-provided consumers (see
//! [`attachment`](crate::attachment)); consumers for [`Interact`] and [`Use`]
//! are registered by the host.

use magick_ecs::entity::EntityId;
use magick_ecs::event::Event;
use serde::{Deserialize, Serialize};

/// Break the hardpoint connection holding `child` and unparent it.
///
/// `child` must have been connected by an [`Attach`] before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detach {
    pub child: EntityId,
}

impl Event for Detach {
    const KIND: &'static str = "detach";
}

/// Connect `child` to the hardpoint on `host` and parent it under `host`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attach {
    pub host: EntityId,
    pub child: EntityId,
}

impl Event for Attach {
    const KIND: &'static str = "attach";
}

/// `actor` interacts with `object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interact {
    pub actor: EntityId,
    pub object: EntityId,
}

impl Event for Interact {
    const KIND: &'static str = "interact";
}

/// `actor` uses `object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Use {
    pub actor: EntityId,
    pub object: EntityId,
}

impl Event for Use {
    const KIND: &'static str = "use";
}
