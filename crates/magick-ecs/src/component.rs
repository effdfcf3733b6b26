//! Component kind registration and the kind hierarchy.
//!
//! Every component type used by the ECS must be registered in a
//! [`KindRegistry`] before it can appear in a descriptor. Registration assigns
//! a [`KindId`] and records the kind's direct supertype, if any. Parents must
//! be registered before their children, so the hierarchy is always a finite
//! forest and "is-a" checks are a walk up a parent chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::EcsError;

/// A type-erased component instance as stored on an entity.
pub type ComponentBox = Box<dyn Any + Send + Sync>;

// ---------------------------------------------------------------------------
// KindId
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a registered component kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(pub(crate) u32);

impl fmt::Debug for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KindId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// KindInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component kind.
#[derive(Clone)]
pub struct KindInfo {
    /// Unique ID assigned at registration time.
    pub id: KindId,
    /// Human-readable name (supplied by the caller).
    pub name: String,
    /// Direct supertype, `None` for a root kind.
    pub parent: Option<KindId>,
    /// Rust `TypeId` of the instance type.
    pub type_id: TypeId,
    /// Builds a default instance when the kind is attached to an entity.
    pub(crate) construct: fn() -> ComponentBox,
}

impl fmt::Debug for KindInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .finish()
    }
}

fn construct_default<T>() -> ComponentBox
where
    T: Default + Send + Sync + 'static,
{
    Box::new(T::default())
}

// ---------------------------------------------------------------------------
// KindRegistry
// ---------------------------------------------------------------------------

/// Registry mapping Rust types to [`KindId`]s, their names and their parents.
///
/// A Rust type can only be registered once; registering it again returns the
/// existing [`KindId`] and ignores the new name and parent.
#[derive(Debug, Default)]
pub struct KindRegistry {
    by_type: HashMap<TypeId, KindId>,
    by_name: HashMap<String, KindId>,
    /// Indexed by `KindId.0`.
    infos: Vec<KindInfo>,
}

impl KindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root kind (no supertype).
    pub fn register<T>(&mut self, name: &str) -> Result<KindId, EcsError>
    where
        T: Default + Send + Sync + 'static,
    {
        self.insert::<T>(name, None)
    }

    /// Register a kind whose direct supertype is `parent`.
    pub fn register_child<T>(&mut self, name: &str, parent: KindId) -> Result<KindId, EcsError>
    where
        T: Default + Send + Sync + 'static,
    {
        if self.get_info(parent).is_none() {
            return Err(EcsError::UnknownParent {
                name: name.to_owned(),
                parent,
            });
        }
        self.insert::<T>(name, Some(parent))
    }

    fn insert<T>(&mut self, name: &str, parent: Option<KindId>) -> Result<KindId, EcsError>
    where
        T: Default + Send + Sync + 'static,
    {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return Ok(existing);
        }
        if self.by_name.contains_key(name) {
            return Err(EcsError::DuplicateKind {
                name: name.to_owned(),
            });
        }

        let id = KindId(self.infos.len() as u32);
        self.infos.push(KindInfo {
            id,
            name: name.to_owned(),
            parent,
            type_id: rust_type_id,
            construct: construct_default::<T>,
        });
        self.by_type.insert(rust_type_id, id);
        self.by_name.insert(name.to_owned(), id);
        tracing::debug!(kind = name, ?parent, "registered component kind");
        Ok(id)
    }

    /// Look up a kind by its Rust type.
    pub fn lookup<T: 'static>(&self) -> Option<KindId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Look up a kind by its registered name.
    pub fn lookup_by_name(&self, name: &str) -> Option<KindId> {
        self.by_name.get(name).copied()
    }

    /// Get the [`KindInfo`] for a kind.
    pub fn get_info(&self, id: KindId) -> Option<&KindInfo> {
        self.infos.get(id.0 as usize)
    }

    /// Whether `id` was issued by this registry.
    pub fn contains(&self, id: KindId) -> bool {
        (id.0 as usize) < self.infos.len()
    }

    /// Registered name of a kind, or `"<unknown>"`.
    pub fn name(&self, id: KindId) -> &str {
        self.get_info(id).map_or("<unknown>", |info| info.name.as_str())
    }

    /// Direct supertype of a kind.
    pub fn parent(&self, id: KindId) -> Option<KindId> {
        self.get_info(id).and_then(|info| info.parent)
    }

    /// `kind` followed by each of its ancestors, nearest first.
    pub fn lineage(&self, kind: KindId) -> Lineage<'_> {
        Lineage {
            registry: self,
            next: self.contains(kind).then_some(kind),
        }
    }

    /// Reflexive-transitive subtype check: `true` when `kind == ancestor` or
    /// `kind` descends from `ancestor`.
    pub fn is_a(&self, kind: KindId, ancestor: KindId) -> bool {
        self.lineage(kind).any(|k| k == ancestor)
    }

    /// Whether the two kinds are related by is-a in either direction.
    pub fn related(&self, a: KindId, b: KindId) -> bool {
        self.is_a(a, b) || self.is_a(b, a)
    }

    /// Total number of registered kinds.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether any kinds have been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered kinds, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Build a fresh default instance of `kind`.
    pub(crate) fn construct(&self, kind: KindId) -> Option<ComponentBox> {
        self.get_info(kind).map(|info| (info.construct)())
    }
}

/// Iterator over a kind and its ancestors. See [`KindRegistry::lineage`].
pub struct Lineage<'a> {
    registry: &'a KindRegistry,
    next: Option<KindId>,
}

impl Iterator for Lineage<'_> {
    type Item = KindId;

    fn next(&mut self) -> Option<KindId> {
        let current = self.next?;
        self.next = self.registry.parent(current);
        Some(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
