//! Archetypes: immutable, validated templates of component descriptors.
//!
//! An [`Archetype`] is an ordered descriptor list whose kinds form an
//! antichain in the kind hierarchy: no kept kind is-a another kept kind.
//! Archetypes are values. [`add`](Archetype::add), [`remove`](Archetype::remove)
//! and [`replace`](Archetype::replace) return a new archetype and never touch
//! `self`; the descriptor list is shared between clones.
//!
//! # Uniqueness rule
//!
//! Candidates are processed in order against a kept list:
//!
//! 1. If a kept kind is-a the candidate's kind (equal or more specific), the
//!    candidate fails with [`EcsError::DuplicateComponent`].
//! 2. Otherwise, if the candidate's kind is-a a kept kind (a strict ancestor),
//!    the candidate fails with [`EcsError::ConflictingOverride`]. A subtype
//!    never silently replaces its supertype; use [`Archetype::replace`].
//! 3. Otherwise the candidate is kept.
//!
//! Every edit re-runs this rule on the combined list, so an edit either yields
//! a fully valid archetype or nothing.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::component::{KindId, KindRegistry};
use crate::descriptor::ComponentDescriptor;
use crate::EcsError;

/// Apply the uniqueness rule to `candidates`, returning the kept list in input
/// order.
pub fn resolve<I>(
    registry: &KindRegistry,
    candidates: I,
) -> Result<Vec<ComponentDescriptor>, EcsError>
where
    I: IntoIterator<Item = ComponentDescriptor>,
{
    let mut kept: Vec<ComponentDescriptor> = Vec::new();
    for candidate in candidates {
        candidate.validate(registry)?;
        let kind = candidate.kind();

        if let Some(existing) = kept.iter().find(|k| registry.is_a(k.kind(), kind)) {
            return Err(EcsError::DuplicateComponent {
                kind: registry.name(kind).to_owned(),
                existing: registry.name(existing.kind()).to_owned(),
            });
        }
        if let Some(ancestor) = kept.iter().find(|k| registry.is_a(kind, k.kind())) {
            return Err(EcsError::ConflictingOverride {
                kind: registry.name(kind).to_owned(),
                ancestor: registry.name(ancestor.kind()).to_owned(),
            });
        }
        kept.push(candidate);
    }
    Ok(kept)
}

/// An immutable, validated descriptor list.
#[derive(Clone, Debug)]
pub struct Archetype {
    descriptors: Arc<[ComponentDescriptor]>,
}

impl Archetype {
    /// Validate `candidates` and build an archetype from the kept list.
    pub fn build<I>(registry: &KindRegistry, candidates: I) -> Result<Self, EcsError>
    where
        I: IntoIterator<Item = ComponentDescriptor>,
    {
        let kept = resolve(registry, candidates)?;
        Ok(Self {
            descriptors: kept.into(),
        })
    }

    /// An archetype with no descriptors.
    pub fn empty() -> Self {
        Self {
            descriptors: Arc::from(Vec::new()),
        }
    }

    /// Append `candidates`.
    ///
    /// A candidate is rejected with [`EcsError::DuplicateComponent`] when an
    /// existing descriptor is-a its kind. The combined list is then checked
    /// again by the full uniqueness rule, which also rejects a candidate that
    /// is more specific than an existing kind.
    pub fn add<I>(&self, registry: &KindRegistry, candidates: I) -> Result<Self, EcsError>
    where
        I: IntoIterator<Item = ComponentDescriptor>,
    {
        let mut list = self.descriptors.to_vec();
        for candidate in candidates {
            let kind = candidate.kind();
            if let Some(existing) = list.iter().find(|d| registry.is_a(d.kind(), kind)) {
                warn!(kind = registry.name(kind), "archetype add rejected: already present");
                return Err(EcsError::DuplicateComponent {
                    kind: registry.name(kind).to_owned(),
                    existing: registry.name(existing.kind()).to_owned(),
                });
            }
            list.push(candidate);
        }
        let result = Self::build(registry, list)?;
        debug!(from = self.len(), to = result.len(), "archetype add");
        Ok(result)
    }

    /// Drop every descriptor whose kind is related to a key's kind by is-a,
    /// in either direction. A key therefore removes an exact match, any
    /// ancestor it is an instance of, and any more specific descriptor that
    /// is an instance of it. Only the keys' kinds are consulted; their
    /// initializers are ignored.
    pub fn remove<I>(&self, registry: &KindRegistry, keys: I) -> Result<Self, EcsError>
    where
        I: IntoIterator<Item = ComponentDescriptor>,
    {
        let mut list = self.descriptors.to_vec();
        for key in keys {
            let kind = key.kind();
            let before = list.len();
            list.retain(|d| !registry.related(kind, d.kind()));
            if list.len() == before {
                warn!(kind = registry.name(kind), "archetype remove matched nothing");
                return Err(EcsError::NothingToRemove {
                    kind: registry.name(kind).to_owned(),
                });
            }
        }
        let result = Self::build(registry, list)?;
        debug!(from = self.len(), to = result.len(), "archetype remove");
        Ok(result)
    }

    /// Swap each candidate in for every existing descriptor that is-a the
    /// candidate's kind. Several specific descriptors collapse into the one
    /// candidate, which is appended at the end.
    pub fn replace<I>(&self, registry: &KindRegistry, candidates: I) -> Result<Self, EcsError>
    where
        I: IntoIterator<Item = ComponentDescriptor>,
    {
        let mut list = self.descriptors.to_vec();
        for candidate in candidates {
            let kind = candidate.kind();
            let before = list.len();
            list.retain(|d| !registry.is_a(d.kind(), kind));
            if list.len() == before {
                warn!(kind = registry.name(kind), "archetype replace matched nothing");
                return Err(EcsError::NothingToReplace {
                    kind: registry.name(kind).to_owned(),
                });
            }
            list.push(candidate);
        }
        let result = Self::build(registry, list)?;
        debug!(from = self.len(), to = result.len(), "archetype replace");
        Ok(result)
    }

    /// The kept descriptors, in order.
    pub fn descriptors(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    /// The kept kinds, in order.
    pub fn kinds(&self) -> impl Iterator<Item = KindId> + '_ {
        self.descriptors.iter().map(ComponentDescriptor::kind)
    }

    /// Whether `kind` is present exactly (not via a subtype).
    pub fn contains(&self, kind: KindId) -> bool {
        self.kinds().any(|k| k == kind)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for Archetype {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Body;
    #[derive(Debug, Default)]
    struct Hardpoint;
    #[derive(Debug, Default)]
    struct Grip;
    #[derive(Debug, Default)]
    struct PowerGrip;
    #[derive(Debug, Default)]
    struct Brain;

    struct Kinds {
        reg: KindRegistry,
        body: KindId,
        hardpoint: KindId,
        grip: KindId,
        power_grip: KindId,
        brain: KindId,
    }

    /// hardpoint > grip > power_grip; body and brain unrelated roots.
    fn kinds() -> Kinds {
        let mut reg = KindRegistry::new();
        let body = reg.register::<Body>("body").unwrap();
        let hardpoint = reg.register::<Hardpoint>("hardpoint").unwrap();
        let grip = reg.register_child::<Grip>("grip", hardpoint).unwrap();
        let power_grip = reg.register_child::<PowerGrip>("power_grip", grip).unwrap();
        let brain = reg.register::<Brain>("brain").unwrap();
        Kinds {
            reg,
            body,
            hardpoint,
            grip,
            power_grip,
            brain,
        }
    }

    fn d(kind: KindId) -> ComponentDescriptor {
        ComponentDescriptor::new(kind)
    }

    #[test]
    fn build_keeps_unrelated_kinds_in_order() {
        let k = kinds();
        let arch = Archetype::build(&k.reg, [d(k.brain), d(k.body), d(k.grip)]).unwrap();
        assert_eq!(arch.kinds().collect::<Vec<_>>(), vec![k.brain, k.body, k.grip]);
    }

    #[test]
    fn build_rejects_same_kind_twice() {
        let k = kinds();
        let err = Archetype::build(&k.reg, [d(k.body), d(k.body)]).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
    }

    #[test]
    fn build_rejects_related_pair_in_either_order() {
        let k = kinds();
        let err = Archetype::build(&k.reg, [d(k.hardpoint), d(k.grip)]).unwrap_err();
        assert!(matches!(err, EcsError::ConflictingOverride { .. }));
        let err = Archetype::build(&k.reg, [d(k.grip), d(k.hardpoint)]).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
    }

    #[test]
    fn add_appends_and_leaves_input_untouched() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body)]).unwrap();
        let grown = base.add(&k.reg, [d(k.brain)]).unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(grown.kinds().collect::<Vec<_>>(), vec![k.body, k.brain]);
    }

    #[test]
    fn add_rejects_same_kind() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body)]).unwrap();
        let err = base.add(&k.reg, [d(k.body)]).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));

        let err = base.add(&k.reg, [d(k.brain), d(k.brain)]).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(base.kinds().collect::<Vec<_>>(), vec![k.body]);
    }

    #[test]
    fn add_rejects_kind_already_covered_by_subtype() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.grip)]).unwrap();
        let err = base.add(&k.reg, [d(k.hardpoint)]).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
    }

    #[test]
    fn add_of_more_specific_kind_fails_revalidation() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.hardpoint)]).unwrap();
        let err = base.add(&k.reg, [d(k.grip)]).unwrap_err();
        assert!(matches!(err, EcsError::ConflictingOverride { .. }));
        assert_eq!(base.kinds().collect::<Vec<_>>(), vec![k.hardpoint]);
    }

    #[test]
    fn remove_by_ancestor_key_drops_descendant() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body), d(k.grip)]).unwrap();
        let trimmed = base.remove(&k.reg, [d(k.hardpoint)]).unwrap();
        assert_eq!(trimmed.kinds().collect::<Vec<_>>(), vec![k.body]);
    }

    #[test]
    fn remove_by_descendant_key_drops_ancestor() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body), d(k.grip)]).unwrap();
        let trimmed = base.remove(&k.reg, [d(k.power_grip)]).unwrap();
        assert_eq!(trimmed.kinds().collect::<Vec<_>>(), vec![k.body]);
    }

    #[test]
    fn remove_unrelated_kind_fails() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body), d(k.grip)]).unwrap();
        let err = base.remove(&k.reg, [d(k.brain)]).unwrap_err();
        assert!(matches!(err, EcsError::NothingToRemove { .. }));
    }

    #[test]
    fn remove_exact_kind() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body), d(k.grip)]).unwrap();
        let trimmed = base.remove(&k.reg, [d(k.grip)]).unwrap();
        assert_eq!(trimmed.kinds().collect::<Vec<_>>(), vec![k.body]);
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn remove_twice_fails_second_time() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body), d(k.brain)]).unwrap();
        let once = base.remove(&k.reg, [d(k.brain)]).unwrap();
        let err = once.remove(&k.reg, [d(k.brain)]).unwrap_err();
        assert!(matches!(err, EcsError::NothingToRemove { .. }));
    }

    #[test]
    fn remove_ignores_initializers_on_keys() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.body)]).unwrap();
        let key = ComponentDescriptor::with_init(k.body, |_: &mut Body| {});
        assert!(base.remove(&k.reg, [key]).unwrap().is_empty());
    }

    #[test]
    fn replace_collapses_descendants_into_candidate() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.power_grip), d(k.body)]).unwrap();
        let replaced = base.replace(&k.reg, [d(k.hardpoint)]).unwrap();
        assert_eq!(replaced.kinds().collect::<Vec<_>>(), vec![k.body, k.hardpoint]);
        assert!(base.contains(k.power_grip));
    }

    #[test]
    fn replace_unrelated_kind_fails() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.grip)]).unwrap();
        let err = base.replace(&k.reg, [d(k.brain)]).unwrap_err();
        assert!(matches!(err, EcsError::NothingToReplace { .. }));
    }

    #[test]
    fn replace_with_subtype_of_existing_fails() {
        let k = kinds();
        let base = Archetype::build(&k.reg, [d(k.hardpoint)]).unwrap();
        let err = base.replace(&k.reg, [d(k.grip)]).unwrap_err();
        assert!(matches!(err, EcsError::NothingToReplace { .. }));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let k = kinds();
        let err = Archetype::build(&k.reg, [d(KindId(42))]).unwrap_err();
        assert!(matches!(err, EcsError::UnknownKind { .. }));
    }
}
