//! Property tests for the archetype algebra.
//!
//! Random candidate lists are drawn from a small fixed hierarchy so that
//! related pairs come up often:
//!
//! ```text
//! mount            sensor        tag
//! └─ grip          └─ eye
//!    └─ clamp
//! ```

use magick_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Default)]
struct Mount;
#[derive(Debug, Default)]
struct Grip;
#[derive(Debug, Default)]
struct Clamp;
#[derive(Debug, Default)]
struct Sensor;
#[derive(Debug, Default)]
struct Eye;
#[derive(Debug, Default)]
struct Tag;

fn hierarchy() -> (KindRegistry, Vec<KindId>) {
    let mut reg = KindRegistry::new();
    let mount = reg.register::<Mount>("mount").unwrap();
    let grip = reg.register_child::<Grip>("grip", mount).unwrap();
    let clamp = reg.register_child::<Clamp>("clamp", grip).unwrap();
    let sensor = reg.register::<Sensor>("sensor").unwrap();
    let eye = reg.register_child::<Eye>("eye", sensor).unwrap();
    let tag = reg.register::<Tag>("tag").unwrap();
    (reg, vec![mount, grip, clamp, sensor, eye, tag])
}

fn descriptors(kinds: &[KindId], picks: &[usize]) -> Vec<ComponentDescriptor> {
    picks.iter().map(|&i| ComponentDescriptor::new(kinds[i])).collect()
}

fn pairwise_unrelated(reg: &KindRegistry, kinds: &[KindId]) -> bool {
    kinds.iter().enumerate().all(|(i, a)| {
        kinds
            .iter()
            .enumerate()
            .all(|(j, b)| i == j || !reg.related(*a, *b))
    })
}

fn picks() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..6usize, 0..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    /// Building succeeds exactly when the input is already an antichain, and
    /// then keeps the input order untouched.
    #[test]
    fn build_accepts_only_antichains(picks in picks()) {
        let (reg, kinds) = hierarchy();
        let input: Vec<KindId> = picks.iter().map(|&i| kinds[i]).collect();
        match Archetype::build(&reg, descriptors(&kinds, &picks)) {
            Ok(arch) => {
                prop_assert!(pairwise_unrelated(&reg, &input));
                prop_assert_eq!(arch.kinds().collect::<Vec<_>>(), input);
            }
            Err(e) => {
                prop_assert!(!pairwise_unrelated(&reg, &input));
                let is_uniqueness_error = matches!(
                    e,
                    EcsError::DuplicateComponent { .. } | EcsError::ConflictingOverride { .. }
                );
                prop_assert!(is_uniqueness_error);
            }
        }
    }

    /// Every successful edit yields an antichain and leaves the source intact.
    #[test]
    fn edits_preserve_antichain_and_purity(
        base in picks(),
        edit in 0..3u8,
        arg in prop::collection::vec(0..6usize, 1..3),
    ) {
        let (reg, kinds) = hierarchy();
        let Ok(arch) = Archetype::build(&reg, descriptors(&kinds, &base)) else {
            return Ok(());
        };
        let before: Vec<KindId> = arch.kinds().collect();

        let result = match edit {
            0 => arch.add(&reg, descriptors(&kinds, &arg)),
            1 => arch.remove(&reg, descriptors(&kinds, &arg)),
            _ => arch.replace(&reg, descriptors(&kinds, &arg)),
        };

        prop_assert_eq!(arch.kinds().collect::<Vec<_>>(), before);
        if let Ok(next) = result {
            let after: Vec<KindId> = next.kinds().collect();
            prop_assert!(pairwise_unrelated(&reg, &after));
        }
    }

    /// After removing a key nothing related to it survives, so a second
    /// removal with the same key always fails.
    #[test]
    fn remove_clears_key_and_is_not_repeatable(base in picks(), key in 0..6usize) {
        let (reg, kinds) = hierarchy();
        let Ok(arch) = Archetype::build(&reg, descriptors(&kinds, &base)) else {
            return Ok(());
        };
        let key_kind = kinds[key];
        match arch.remove(&reg, [ComponentDescriptor::new(key_kind)]) {
            Ok(next) => {
                prop_assert!(next.kinds().all(|k| !reg.related(k, key_kind)));
                prop_assert!(next.len() < arch.len());
                let again = next.remove(&reg, [ComponentDescriptor::new(key_kind)]);
                prop_assert!(matches!(again, Err(EcsError::NothingToRemove { .. })), "expected NothingToRemove");
            }
            Err(e) => {
                prop_assert!(arch.kinds().all(|k| !reg.related(k, key_kind)));
                prop_assert!(matches!(e, EcsError::NothingToRemove { .. }), "unexpected error: {e}");
            }
        }
    }

    /// A successful replace ends with the candidate and keeps no subkind of it.
    #[test]
    fn replace_collapses_subkinds(base in picks(), cand in 0..6usize) {
        let (reg, kinds) = hierarchy();
        let Ok(arch) = Archetype::build(&reg, descriptors(&kinds, &base)) else {
            return Ok(());
        };
        let cand_kind = kinds[cand];
        if let Ok(next) = arch.replace(&reg, [ComponentDescriptor::new(cand_kind)]) {
            let after: Vec<KindId> = next.kinds().collect();
            prop_assert_eq!(after.last().copied(), Some(cand_kind));
            prop_assert_eq!(after.iter().filter(|k| reg.is_a(**k, cand_kind)).count(), 1);
        }
    }

    /// Instantiating any valid archetype attaches exactly its kinds.
    #[test]
    fn instantiate_matches_archetype(base in picks()) {
        let mut world = World::new();
        let mount = world.register_kind::<Mount>("mount").unwrap();
        let grip = world.register_subkind::<Grip>("grip", mount).unwrap();
        let clamp = world.register_subkind::<Clamp>("clamp", grip).unwrap();
        let sensor = world.register_kind::<Sensor>("sensor").unwrap();
        let eye = world.register_subkind::<Eye>("eye", sensor).unwrap();
        let tag = world.register_kind::<Tag>("tag").unwrap();
        let kinds = [mount, grip, clamp, sensor, eye, tag];

        let Ok(arch) = Archetype::build(world.registry(), descriptors(&kinds, &base)) else {
            return Ok(());
        };
        let entity = factory::instantiate(&mut world, &arch).unwrap();
        prop_assert_eq!(world.kinds(entity), arch.kinds().collect::<Vec<_>>());
    }
}
