//! Entity factory: turns descriptor lists into live entities or archetypes.
//!
//! Validation always happens before the entity is allocated, so a failed
//! build leaves the world exactly as it was.
//!
//! # Example
//!
//! ```
//! use magick_ecs::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Fuel(u32);
//!
//! let mut world = World::new();
//! let fuel = world.register_kind::<Fuel>("fuel").unwrap();
//!
//! let template = factory::build_archetype(
//!     world.registry(),
//!     [ComponentDescriptor::with_init(fuel, |f: &mut Fuel| f.0 = 10)],
//! )
//! .unwrap();
//! let entity = factory::instantiate(&mut world, &template).unwrap();
//! assert_eq!(world.get::<Fuel>(entity).map(|f| f.0), Some(10));
//! ```

use tracing::debug;

use crate::archetype::{resolve, Archetype};
use crate::component::KindRegistry;
use crate::descriptor::ComponentDescriptor;
use crate::entity::EntityId;
use crate::world::World;
use crate::EcsError;

/// Validate `candidates` and spawn an entity from the kept list, attaching
/// each kind in order and running its initializer right after attaching it.
pub fn build<I>(world: &mut World, candidates: I) -> Result<EntityId, EcsError>
where
    I: IntoIterator<Item = ComponentDescriptor>,
{
    let kept = resolve(world.registry(), candidates)?;
    spawn_resolved(world, &kept)
}

/// Validate `candidates` and return the reusable template form.
pub fn build_archetype<I>(registry: &KindRegistry, candidates: I) -> Result<Archetype, EcsError>
where
    I: IntoIterator<Item = ComponentDescriptor>,
{
    Archetype::build(registry, candidates)
}

/// Spawn an entity from a published archetype.
pub fn instantiate(world: &mut World, archetype: &Archetype) -> Result<EntityId, EcsError> {
    // Re-checked against this world's registry; the archetype may come from
    // a different one.
    let kept = resolve(world.registry(), archetype.descriptors().iter().cloned())?;
    spawn_resolved(world, &kept)
}

fn spawn_resolved(world: &mut World, kept: &[ComponentDescriptor]) -> Result<EntityId, EcsError> {
    let entity = world.spawn_empty();
    for descriptor in kept {
        if let Err(e) = attach_initialized(world, entity, descriptor) {
            world.despawn(entity)?;
            return Err(e);
        }
    }
    debug!(%entity, components = kept.len(), "built entity");
    Ok(entity)
}

fn attach_initialized(
    world: &mut World,
    entity: EntityId,
    descriptor: &ComponentDescriptor,
) -> Result<(), EcsError> {
    let instance = world.attach(entity, descriptor.kind())?;
    match descriptor.initializer() {
        Some(init) if !init.apply(instance) => Err(EcsError::KindTypeMismatch {
            kind: world.registry().name(descriptor.kind()).to_owned(),
            expected: init.target_name(),
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
