//! The [`World`] is the top-level container for live entities. It owns the
//! kind registry, the entity allocator, every entity's component instances
//! and the parent/child relation between entities.

use std::any::Any;
use std::collections::HashMap;

use tracing::debug;

use crate::component::{ComponentBox, KindId, KindRegistry};
use crate::entity::{EntityAllocator, EntityId};
use crate::EcsError;

/// Component instances held by one entity, in attachment order.
#[derive(Default)]
struct EntityRecord {
    components: Vec<(KindId, ComponentBox)>,
}

impl EntityRecord {
    fn find(&self, kind: KindId) -> Option<&ComponentBox> {
        self.components
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, c)| c)
    }

    fn find_mut(&mut self, kind: KindId) -> Option<&mut ComponentBox> {
        self.components
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .map(|(_, c)| c)
    }
}

/// The live-entity container.
///
/// Each entity owns at most one instance per kind, and the kinds it owns form
/// an antichain in the kind hierarchy, exactly like the archetype it was
/// built from.
#[derive(Default)]
pub struct World {
    registry: KindRegistry,
    allocator: EntityAllocator,
    records: HashMap<EntityId, EntityRecord>,
    /// Alive entities in spawn order; gives deterministic iteration.
    order: Vec<EntityId>,
    /// child -> parent
    parents: HashMap<EntityId, EntityId>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.records.len())
            .field("kind_count", &self.registry.len())
            .field("parent_links", &self.parents.len())
            .finish()
    }
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the kind registry.
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Register a root component kind.
    pub fn register_kind<T>(&mut self, name: &str) -> Result<KindId, EcsError>
    where
        T: Default + Send + Sync + 'static,
    {
        self.registry.register::<T>(name)
    }

    /// Register a component kind whose direct supertype is `parent`.
    pub fn register_subkind<T>(&mut self, name: &str, parent: KindId) -> Result<KindId, EcsError>
    where
        T: Default + Send + Sync + 'static,
    {
        self.registry.register_child::<T>(name, parent)
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity with no components.
    pub fn spawn_empty(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        self.records.insert(entity, EntityRecord::default());
        self.order.push(entity);
        entity
    }

    /// Destroy an entity. Its own parent link and the links of its children
    /// are dropped; the children stay alive as roots.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        self.records.remove(&entity);
        self.order.retain(|e| *e != entity);
        self.parents.remove(&entity);
        self.parents.retain(|_, parent| *parent != entity);
        self.allocator.deallocate(entity);
        debug!(%entity, "despawned entity");
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    /// Alive entities in spawn order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    // -- component storage --------------------------------------------------

    /// Attach a default instance of `kind` and return it for initialization.
    ///
    /// Fails if the entity already owns a kind related to `kind` by is-a.
    pub(crate) fn attach(
        &mut self,
        entity: EntityId,
        kind: KindId,
    ) -> Result<&mut (dyn Any + Send + Sync), EcsError> {
        let instance = self
            .registry
            .construct(kind)
            .ok_or(EcsError::UnknownKind { kind })?;
        let registry = &self.registry;
        let record = self
            .records
            .get_mut(&entity)
            .ok_or(EcsError::StaleEntity { entity })?;

        let components = &record.components;
        if let Some((existing, _)) = components.iter().find(|(k, _)| registry.is_a(*k, kind)) {
            return Err(EcsError::DuplicateComponent {
                kind: registry.name(kind).to_owned(),
                existing: registry.name(*existing).to_owned(),
            });
        }
        if let Some((ancestor, _)) = components.iter().find(|(k, _)| registry.is_a(kind, *k)) {
            return Err(EcsError::ConflictingOverride {
                kind: registry.name(kind).to_owned(),
                ancestor: registry.name(*ancestor).to_owned(),
            });
        }

        record.components.push((kind, instance));
        let (_, slot) = record
            .components
            .last_mut()
            .ok_or(EcsError::StaleEntity { entity })?;
        Ok(&mut **slot)
    }

    /// Get a component by its concrete type.
    pub fn get<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        let kind = self.registry.lookup::<T>()?;
        self.records.get(&entity)?.find(kind)?.downcast_ref::<T>()
    }

    /// Get a component mutably by its concrete type.
    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        let kind = self.registry.lookup::<T>()?;
        self.records.get_mut(&entity)?.find_mut(kind)?.downcast_mut::<T>()
    }

    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Look up the instance whose kind is-a `kind`, returning the concrete
    /// kind found alongside it.
    pub fn try_get(
        &self,
        entity: EntityId,
        kind: KindId,
    ) -> Option<(KindId, &(dyn Any + Send + Sync))> {
        self.records
            .get(&entity)?
            .components
            .iter()
            .find(|(k, _)| self.registry.is_a(*k, kind))
            .map(|(k, c)| (*k, &**c))
    }

    /// Kinds attached to `entity`, in attachment order.
    pub fn kinds(&self, entity: EntityId) -> Vec<KindId> {
        self.records
            .get(&entity)
            .map(|r| r.components.iter().map(|(k, _)| *k).collect())
            .unwrap_or_default()
    }

    // -- parent/child relation ----------------------------------------------

    /// Make `parent` the parent of `child`, replacing any previous parent.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> Result<(), EcsError> {
        for entity in [child, parent] {
            if !self.is_alive(entity) {
                return Err(EcsError::StaleEntity { entity });
            }
        }
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(EcsError::HierarchyCycle { child, parent });
            }
            cursor = self.parents.get(&current).copied();
        }
        self.parents.insert(child, parent);
        Ok(())
    }

    /// Remove `child`'s parent link, returning the former parent.
    pub fn clear_parent(&mut self, child: EntityId) -> Option<EntityId> {
        self.parents.remove(&child)
    }

    pub fn parent_of(&self, child: EntityId) -> Option<EntityId> {
        self.parents.get(&child).copied()
    }

    /// Children of `parent`, in spawn order.
    pub fn children_of(&self, parent: EntityId) -> Vec<EntityId> {
        self.order
            .iter()
            .copied()
            .filter(|e| self.parents.get(e) == Some(&parent))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
