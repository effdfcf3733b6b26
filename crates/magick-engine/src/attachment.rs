//! Hardpoints and the consumers that connect and disconnect them.
//!
//! A [`Hardpoint`] records which entity is currently held. Behavior-tree
//! leaves only read it; the [`Attach`] and [`Detach`] consumers registered by
//! [`register_attachment`] are the only code that changes it. Each consumer
//! also keeps the world's parent/child relation in step: an attached child
//! is parented under its host and unparented when detached.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use magick_ecs::prelude::*;

use crate::error::EngineError;
use crate::events::{Attach, Detach};

/// Registered kind name of [`Hardpoint`].
pub const HARDPOINT_KIND: &str = "hardpoint";

/// A point at which one attachable entity may be held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hardpoint {
    /// Offset from the host's origin. Defaults to right-middle for a host of
    /// unit diameter.
    pub local_offset: [f32; 2],
    pub attached: Option<EntityId>,
}

impl Default for Hardpoint {
    fn default() -> Self {
        Self {
            local_offset: [1.0, 0.0],
            attached: None,
        }
    }
}

/// Register the [`Hardpoint`] kind and the attach/detach consumers.
///
/// Call once per bus; calling it again registers the consumers twice.
///
/// Only the exact [`Hardpoint`] type is read by the consumers, [`find_host`]
/// and [`DropItem`](crate::ai::DropItem). A kind registered as a subkind of
/// the returned one has its own Rust type and is not treated as a hardpoint.
pub fn register_attachment(world: &mut World, bus: &mut EventBus) -> Result<KindId, EngineError> {
    let kind = world.register_kind::<Hardpoint>(HARDPOINT_KIND)?;
    bus.register_consumer("attachment::attach", apply_attach);
    bus.register_consumer("attachment::detach", apply_detach);
    Ok(kind)
}

/// The entity whose hardpoint currently holds `child`.
///
/// The parent link is tried first; hosts are otherwise scanned in spawn order,
/// which still finds the host after `child` itself has been despawned.
pub fn find_host(world: &World, child: EntityId) -> Option<EntityId> {
    let holds = |host: EntityId| {
        world
            .get::<Hardpoint>(host)
            .is_some_and(|hp| hp.attached == Some(child))
    };
    if let Some(parent) = world.parent_of(child).filter(|p| holds(*p)) {
        return Some(parent);
    }
    world.entities().find(|e| holds(*e))
}

fn apply_attach(ev: &Attach, world: &mut World, _queue: &mut EventQueue) -> anyhow::Result<()> {
    if let Some(host) = find_host(world, ev.child) {
        return Err(EngineError::AlreadyAttached {
            child: ev.child,
            host,
        }
        .into());
    }
    match world.get::<Hardpoint>(ev.host) {
        None => return Err(EngineError::NoHardpoint { host: ev.host }.into()),
        Some(Hardpoint {
            attached: Some(held),
            ..
        }) => {
            return Err(EngineError::HardpointOccupied {
                host: ev.host,
                held: *held,
            }
            .into())
        }
        Some(_) => {}
    }

    world
        .set_parent(ev.child, ev.host)
        .with_context(|| format!("cannot parent {} under {}", ev.child, ev.host))?;
    if let Some(hardpoint) = world.get_mut::<Hardpoint>(ev.host) {
        hardpoint.attached = Some(ev.child);
    }
    debug!(host = %ev.host, child = %ev.child, "attached");
    Ok(())
}

fn apply_detach(ev: &Detach, world: &mut World, _queue: &mut EventQueue) -> anyhow::Result<()> {
    let host = find_host(world, ev.child).ok_or(EngineError::NotAttached { child: ev.child })?;
    if let Some(hardpoint) = world.get_mut::<Hardpoint>(host) {
        hardpoint.attached = None;
    }
    if world.parent_of(ev.child) == Some(host) {
        world.clear_parent(ev.child);
    }
    debug!(%host, child = %ev.child, "detached");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (World, EventBus, EntityId, EntityId) {
        let mut world = World::new();
        let mut bus = EventBus::new();
        let kind = register_attachment(&mut world, &mut bus).unwrap();
        let host = factory::build(&mut world, [kind.into()]).unwrap();
        let item = world.spawn_empty();
        (world, bus, host, item)
    }

    #[test]
    fn default_offset_is_right_middle() {
        let hp = Hardpoint::default();
        assert_eq!(hp.local_offset, [1.0, 0.0]);
        assert_eq!(hp.attached, None);
    }

    #[test]
    fn attach_then_detach() {
        let (mut world, mut bus, host, item) = setup();

        bus.enqueue(Attach { host, child: item });
        let report = bus.dispatch(&mut world);
        assert_eq!(report.failed, 0);
        assert_eq!(world.get::<Hardpoint>(host).unwrap().attached, Some(item));
        assert_eq!(world.parent_of(item), Some(host));
        assert_eq!(find_host(&world, item), Some(host));

        bus.enqueue(Detach { child: item });
        let report = bus.dispatch(&mut world);
        assert_eq!(report.failed, 0);
        assert_eq!(world.get::<Hardpoint>(host).unwrap().attached, None);
        assert_eq!(world.parent_of(item), None);
    }

    #[test]
    fn attach_to_occupied_hardpoint_fails() {
        let (mut world, mut bus, host, item) = setup();
        let other = world.spawn_empty();
        bus.enqueue(Attach { host, child: item });
        bus.enqueue(Attach { host, child: other });
        let report = bus.dispatch(&mut world);
        assert_eq!(report.failed, 1);
        assert_eq!(world.get::<Hardpoint>(host).unwrap().attached, Some(item));
        assert_eq!(world.parent_of(other), None);
    }

    #[test]
    fn attach_without_hardpoint_fails() {
        let (mut world, mut bus, _, item) = setup();
        let bare = world.spawn_empty();
        bus.enqueue(Attach { host: bare, child: item });
        assert_eq!(bus.dispatch(&mut world).failed, 1);
        assert_eq!(world.parent_of(item), None);
    }

    #[test]
    fn detach_of_unattached_entity_fails() {
        let (mut world, mut bus, _, item) = setup();
        bus.enqueue(Detach { child: item });
        assert_eq!(bus.dispatch(&mut world).failed, 1);
    }

    #[test]
    fn detach_finds_host_of_despawned_child() {
        let (mut world, mut bus, host, item) = setup();
        bus.enqueue(Attach { host, child: item });
        bus.dispatch(&mut world);
        world.despawn(item).unwrap();

        bus.enqueue(Detach { child: item });
        assert_eq!(bus.dispatch(&mut world).failed, 0);
        assert_eq!(world.get::<Hardpoint>(host).unwrap().attached, None);
    }
}
