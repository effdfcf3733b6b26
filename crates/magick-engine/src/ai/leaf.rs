//! Leaf nodes.

use tracing::trace;

use super::{CompletionState, TickContext, TreeNode};
use crate::attachment::Hardpoint;
use crate::events::Detach;

/// `SUCCESS` when the predicate holds, `FAIL` otherwise.
pub struct Condition<F> {
    predicate: F,
}

impl<F> Condition<F> {
    pub fn new(predicate: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> bool,
    {
        Self { predicate }
    }
}

impl<F> TreeNode for Condition<F>
where
    F: FnMut(&TickContext<'_>) -> bool,
{
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        if (self.predicate)(ctx) {
            CompletionState::Success
        } else {
            CompletionState::Fail
        }
    }
}

/// Runs a closure that may read the world and emit events.
pub struct Action<F> {
    run: F,
}

impl<F> Action<F> {
    pub fn new(run: F) -> Self
    where
        F: FnMut(&mut TickContext<'_>) -> CompletionState,
    {
        Self { run }
    }
}

impl<F> TreeNode for Action<F>
where
    F: FnMut(&mut TickContext<'_>) -> CompletionState,
{
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        (self.run)(ctx)
    }
}

/// Drop whatever the acting entity is holding.
///
/// If the root has a [`Hardpoint`] with something attached, a [`Detach`] for
/// that entity is enqueued and the node succeeds; otherwise it fails and
/// nothing is enqueued. The hardpoint itself is left alone: the detach
/// consumer clears it when the event is dispatched.
///
/// The lookup is by the exact [`Hardpoint`] type. A root whose only holder is
/// a registered subkind of the hardpoint kind fails like a root with none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropItem;

impl TreeNode for DropItem {
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        let held = ctx
            .world
            .get::<Hardpoint>(ctx.root)
            .and_then(|hardpoint| hardpoint.attached);
        match held {
            Some(child) => {
                trace!(root = %ctx.root, %child, "drop: detaching held entity");
                ctx.emit(Detach { child });
                CompletionState::Success
            }
            None => CompletionState::Fail,
        }
    }
}
