//! Per-entity tree hosting.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use magick_ecs::entity::EntityId;
use magick_ecs::event::EventQueue;
use magick_ecs::world::World;

use super::{BoxedNode, CompletionState, TickContext, TreeNode};

/// Outcome counts from one [`BehaviorTrees::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeRunReport {
    pub evaluated: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub running: usize,
    /// Trees dropped because their entity was despawned.
    pub pruned: usize,
}

impl TreeRunReport {
    fn record(&mut self, state: CompletionState) {
        self.evaluated += 1;
        match state {
            CompletionState::Success => self.succeeded += 1,
            CompletionState::Fail => self.failed += 1,
            CompletionState::Running => self.running += 1,
        }
    }
}

/// Maps entities to the root node of their behavior tree.
#[derive(Default)]
pub struct BehaviorTrees {
    trees: HashMap<EntityId, BoxedNode>,
    trace_results: bool,
}

impl BehaviorTrees {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `entity` a tree, returning the one it replaces.
    pub fn insert(&mut self, entity: EntityId, root: impl TreeNode + 'static) -> Option<BoxedNode> {
        self.trees.insert(entity, Box::new(root))
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<BoxedNode> {
        self.trees.remove(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.trees.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Emit a `trace!` line per evaluated tree.
    pub fn set_trace_results(&mut self, enabled: bool) {
        self.trace_results = enabled;
    }

    /// Evaluate every tree once, in the world's spawn order.
    ///
    /// Trees of despawned entities are dropped first. Nodes only read `world`;
    /// everything they decide to do goes into `events`.
    pub fn run(&mut self, world: &World, events: &mut EventQueue, tick: u64) -> TreeRunReport {
        let mut report = TreeRunReport::default();

        let before = self.trees.len();
        self.trees.retain(|entity, _| world.is_alive(*entity));
        report.pruned = before - self.trees.len();
        if report.pruned > 0 {
            debug!(pruned = report.pruned, "dropped trees of despawned entities");
        }

        for entity in world.entities() {
            let Some(tree) = self.trees.get_mut(&entity) else {
                continue;
            };
            let state = tree.act(&mut TickContext::new(entity, world, events, tick));
            if self.trace_results {
                trace!(%entity, tick, ?state, "tree evaluated");
            }
            report.record(state);
        }
        report
    }
}

impl std::fmt::Debug for BehaviorTrees {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTrees")
            .field("trees", &self.trees.len())
            .field("trace_results", &self.trace_results)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Action;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn trees_run_in_spawn_order() {
        let mut world = World::new();
        let a = world.spawn_empty();
        let b = world.spawn_empty();
        let order = Rc::new(RefCell::new(Vec::new()));

        let mut trees = BehaviorTrees::new();
        for entity in [b, a] {
            let order = Rc::clone(&order);
            trees.insert(
                entity,
                Action::new(move |ctx| {
                    order.borrow_mut().push(ctx.root);
                    CompletionState::Success
                }),
            );
        }

        let mut events = EventQueue::new();
        let report = trees.run(&world, &mut events, 0);
        assert_eq!(*order.borrow(), vec![a, b]);
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.succeeded, 2);
    }

    #[test]
    fn despawned_entities_lose_their_tree() {
        let mut world = World::new();
        let a = world.spawn_empty();
        let mut trees = BehaviorTrees::new();
        trees.insert(a, Action::new(|_ctx| CompletionState::Fail));
        world.despawn(a).unwrap();

        let report = trees.run(&world, &mut EventQueue::new(), 0);
        assert_eq!(report.pruned, 1);
        assert_eq!(report.evaluated, 0);
        assert!(trees.is_empty());
    }
}
