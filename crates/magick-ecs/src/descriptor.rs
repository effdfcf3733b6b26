//! Component descriptors: the atomic unit of the archetype algebra.
//!
//! A [`ComponentDescriptor`] pairs a [`KindId`] with an optional initializer
//! that runs on the freshly attached instance. Initializers are typed closures
//! stored behind a type-erased wrapper; the concrete type they expect is
//! checked against the kind's registered type before any entity is built.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::component::{KindId, KindRegistry};
use crate::EcsError;

type InitFn = dyn Fn(&mut (dyn Any + Send + Sync)) -> bool + Send + Sync;

/// A type-erased initializer for a component instance.
#[derive(Clone)]
pub struct Initializer {
    /// Rust type the closure expects.
    target: TypeId,
    target_name: &'static str,
    call: Arc<InitFn>,
}

impl Initializer {
    /// Wrap a typed closure.
    pub fn new<T, F>(f: F) -> Self
    where
        T: 'static,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self {
            target: TypeId::of::<T>(),
            target_name: std::any::type_name::<T>(),
            call: Arc::new(move |instance: &mut (dyn Any + Send + Sync)| {
                match instance.downcast_mut::<T>() {
                    Some(typed) => {
                        f(typed);
                        true
                    }
                    None => false,
                }
            }),
        }
    }

    /// Run the initializer. Returns `false` if the instance is not of the
    /// expected type.
    pub(crate) fn apply(&self, instance: &mut (dyn Any + Send + Sync)) -> bool {
        (self.call)(instance)
    }

    pub(crate) fn target_name(&self) -> &'static str {
        self.target_name
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Initializer<{}>", self.target_name)
    }
}

/// A component kind plus an optional initializer. Immutable once built.
#[derive(Clone, Debug)]
pub struct ComponentDescriptor {
    kind: KindId,
    init: Option<Initializer>,
}

impl ComponentDescriptor {
    /// A descriptor with no initializer.
    pub fn new(kind: KindId) -> Self {
        Self { kind, init: None }
    }

    /// A descriptor whose initializer receives the attached `T` instance.
    pub fn with_init<T, F>(kind: KindId, f: F) -> Self
    where
        T: 'static,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self {
            kind,
            init: Some(Initializer::new(f)),
        }
    }

    /// Descriptor for the kind registered for `T`.
    pub fn of<T: 'static>(registry: &KindRegistry) -> Result<Self, EcsError> {
        registry
            .lookup::<T>()
            .map(Self::new)
            .ok_or_else(|| EcsError::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Like [`of`](Self::of), with an initializer.
    pub fn of_with<T, F>(registry: &KindRegistry, f: F) -> Result<Self, EcsError>
    where
        T: 'static,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let kind = Self::of::<T>(registry)?.kind;
        Ok(Self::with_init(kind, f))
    }

    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn initializer(&self) -> Option<&Initializer> {
        self.init.as_ref()
    }

    /// Check that the kind is registered and that the initializer, if any,
    /// targets the kind's registered type.
    pub(crate) fn validate(&self, registry: &KindRegistry) -> Result<(), EcsError> {
        let info = registry
            .get_info(self.kind)
            .ok_or(EcsError::UnknownKind { kind: self.kind })?;
        if let Some(init) = &self.init {
            if init.target != info.type_id {
                return Err(EcsError::KindTypeMismatch {
                    kind: info.name.clone(),
                    expected: init.target_name,
                });
            }
        }
        Ok(())
    }
}

impl From<KindId> for ComponentDescriptor {
    fn from(kind: KindId) -> Self {
        Self::new(kind)
    }
}
