//! Single-child decorators. `RUNNING` always passes through unchanged.

use super::{BoxedNode, CompletionState, TickContext, TreeNode};

/// Swaps `SUCCESS` and `FAIL`.
pub struct Inverter {
    child: BoxedNode,
}

impl Inverter {
    pub fn new(child: impl TreeNode + 'static) -> Self {
        Self {
            child: Box::new(child),
        }
    }
}

impl TreeNode for Inverter {
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        match self.child.act(ctx) {
            CompletionState::Success => CompletionState::Fail,
            CompletionState::Fail => CompletionState::Success,
            CompletionState::Running => CompletionState::Running,
        }
    }

    fn reset(&mut self) {
        self.child.reset();
    }
}

/// Reports `SUCCESS` whenever the child finishes.
pub struct Succeeder {
    child: BoxedNode,
}

impl Succeeder {
    pub fn new(child: impl TreeNode + 'static) -> Self {
        Self {
            child: Box::new(child),
        }
    }
}

impl TreeNode for Succeeder {
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        match self.child.act(ctx) {
            CompletionState::Running => CompletionState::Running,
            _ => CompletionState::Success,
        }
    }

    fn reset(&mut self) {
        self.child.reset();
    }
}
