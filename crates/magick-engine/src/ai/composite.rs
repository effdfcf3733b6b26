//! Composite nodes.

use super::{BoxedNode, CompletionState, TickContext, TreeNode};

/// Run `children` in order from the remembered running index, skipping past
/// every child that returns `keep_going`. Any other result ends the pass.
fn run_in_order(
    children: &mut [BoxedNode],
    running: &mut Option<usize>,
    ctx: &mut TickContext<'_>,
    keep_going: CompletionState,
) -> CompletionState {
    let start = running.take().unwrap_or(0);
    for (index, child) in children.iter_mut().enumerate().skip(start) {
        match child.act(ctx) {
            state if state == keep_going => continue,
            CompletionState::Running => {
                *running = Some(index);
                return CompletionState::Running;
            }
            other => return other,
        }
    }
    keep_going
}

fn reset_running(children: &mut [BoxedNode], running: &mut Option<usize>) {
    if let Some(index) = running.take() {
        if let Some(child) = children.get_mut(index) {
            child.reset();
        }
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// Succeeds when every child succeeds; stops at the first child that fails
/// or is still running. An empty sequence succeeds.
#[derive(Default)]
pub struct Sequence {
    children: Vec<BoxedNode>,
    running: Option<usize>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(children: Vec<BoxedNode>) -> Self {
        Self {
            children,
            running: None,
        }
    }

    /// Append a child.
    pub fn with(mut self, node: impl TreeNode + 'static) -> Self {
        self.children.push(Box::new(node));
        self
    }

    /// Index of the child that will be resumed on the next tick.
    pub fn running_child(&self) -> Option<usize> {
        self.running
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl TreeNode for Sequence {
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        run_in_order(
            &mut self.children,
            &mut self.running,
            ctx,
            CompletionState::Success,
        )
    }

    fn reset(&mut self) {
        reset_running(&mut self.children, &mut self.running);
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Succeeds at the first child that succeeds; stops at the first child that
/// succeeds or is still running. An empty selector fails.
#[derive(Default)]
pub struct Selector {
    children: Vec<BoxedNode>,
    running: Option<usize>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(children: Vec<BoxedNode>) -> Self {
        Self {
            children,
            running: None,
        }
    }

    pub fn with(mut self, node: impl TreeNode + 'static) -> Self {
        self.children.push(Box::new(node));
        self
    }

    pub fn running_child(&self) -> Option<usize> {
        self.running
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl TreeNode for Selector {
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        run_in_order(
            &mut self.children,
            &mut self.running,
            ctx,
            CompletionState::Fail,
        )
    }

    fn reset(&mut self) {
        reset_running(&mut self.children, &mut self.running);
    }
}

// ---------------------------------------------------------------------------
// Parallel
// ---------------------------------------------------------------------------

/// Ticks every unfinished child each tick.
///
/// Finished results are kept until the node completes, so a child that
/// succeeded is not re-run while its siblings are still running. The node
/// succeeds once `success_threshold` children have succeeded, fails once
/// `failure_threshold` have failed (success is checked first), and fails if
/// every child finished without reaching either threshold. Thresholds are
/// clamped to `1..=len`. An empty parallel succeeds.
pub struct Parallel {
    children: Vec<BoxedNode>,
    results: Vec<Option<CompletionState>>,
    success_threshold: usize,
    failure_threshold: usize,
}

impl Parallel {
    pub fn new(success_threshold: usize, failure_threshold: usize) -> Self {
        Self {
            children: Vec::new(),
            results: Vec::new(),
            success_threshold,
            failure_threshold,
        }
    }

    /// Succeed when all children succeed, fail on the first failure.
    pub fn all() -> Self {
        Self::new(usize::MAX, 1)
    }

    /// Succeed on the first success, fail when all children fail.
    pub fn any() -> Self {
        Self::new(1, usize::MAX)
    }

    pub fn with(mut self, node: impl TreeNode + 'static) -> Self {
        self.children.push(Box::new(node));
        self.results.push(None);
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn count(&self, state: CompletionState) -> usize {
        self.results.iter().filter(|r| **r == Some(state)).count()
    }

    /// Reset children that were still running and forget cached results.
    fn finish(&mut self) {
        for (child, result) in self.children.iter_mut().zip(self.results.iter_mut()) {
            if result.is_none() {
                child.reset();
            }
            *result = None;
        }
    }
}

impl TreeNode for Parallel {
    fn act(&mut self, ctx: &mut TickContext<'_>) -> CompletionState {
        let len = self.children.len();
        if len == 0 {
            return CompletionState::Success;
        }
        for (child, result) in self.children.iter_mut().zip(self.results.iter_mut()) {
            if result.is_none() {
                let state = child.act(ctx);
                if state.is_done() {
                    *result = Some(state);
                }
            }
        }

        let needed = self.success_threshold.clamp(1, len);
        let outcome = if self.count(CompletionState::Success) >= needed {
            CompletionState::Success
        } else if self.count(CompletionState::Fail) >= self.failure_threshold.clamp(1, len) {
            CompletionState::Fail
        } else if self.results.iter().all(Option::is_some) {
            CompletionState::Fail
        } else {
            return CompletionState::Running;
        };
        self.finish();
        outcome
    }

    fn reset(&mut self) {
        self.finish();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Action, Condition};
    use magick_ecs::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    /// A leaf that replays `script` one result per call, repeating the last
    /// one, and logs `name` each time it runs.
    fn scripted(name: &'static str, script: Vec<CompletionState>, log: &Log) -> impl TreeNode {
        let log = Rc::clone(log);
        let mut step = 0;
        Action::new(move |_ctx| {
            log.borrow_mut().push(name);
            let state = script[step.min(script.len() - 1)];
            step += 1;
            state
        })
    }

    fn run(node: &mut impl TreeNode, ticks: u64) -> Vec<CompletionState> {
        let mut world = World::new();
        let root = world.spawn_empty();
        let mut events = EventQueue::new();
        (0..ticks)
            .map(|tick| node.act(&mut TickContext::new(root, &world, &mut events, tick)))
            .collect()
    }

    use CompletionState::{Fail, Running, Success};

    #[test]
    fn sequence_stops_at_first_failure() {
        let log = Log::default();
        let mut seq = Sequence::new()
            .with(scripted("a", vec![Success], &log))
            .with(scripted("b", vec![Fail], &log))
            .with(scripted("c", vec![Success], &log));
        assert_eq!(run(&mut seq, 1), vec![Fail]);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn sequence_resumes_at_running_child() {
        let log = Log::default();
        let mut seq = Sequence::new()
            .with(scripted("a", vec![Success], &log))
            .with(scripted("b", vec![Running, Running, Success], &log))
            .with(scripted("c", vec![Success], &log));

        assert_eq!(run(&mut seq, 3), vec![Running, Running, Success]);
        assert_eq!(*log.borrow(), vec!["a", "b", "b", "b", "c"]);
        assert_eq!(seq.running_child(), None);
    }

    #[test]
    fn empty_composites() {
        assert_eq!(run(&mut Sequence::new(), 1), vec![Success]);
        assert_eq!(run(&mut Selector::new(), 1), vec![Fail]);
        assert_eq!(run(&mut Parallel::all(), 1), vec![Success]);
    }

    #[test]
    fn selector_stops_at_first_success() {
        let log = Log::default();
        let mut sel = Selector::new()
            .with(scripted("a", vec![Fail], &log))
            .with(scripted("b", vec![Success], &log))
            .with(scripted("c", vec![Success], &log));
        assert_eq!(run(&mut sel, 1), vec![Success]);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn selector_resumes_and_falls_through() {
        let log = Log::default();
        let mut sel = Selector::new()
            .with(scripted("a", vec![Fail], &log))
            .with(scripted("b", vec![Running, Fail], &log))
            .with(scripted("c", vec![Fail], &log));

        assert_eq!(run(&mut sel, 2), vec![Running, Fail]);
        assert_eq!(*log.borrow(), vec!["a", "b", "b", "c"]);
    }

    #[test]
    fn reset_forgets_running_child() {
        let log = Log::default();
        let mut seq = Sequence::new()
            .with(scripted("a", vec![Success], &log))
            .with(scripted("b", vec![Running], &log));
        run(&mut seq, 1);
        assert_eq!(seq.running_child(), Some(1));
        seq.reset();
        assert_eq!(seq.running_child(), None);
        run(&mut seq, 1);
        assert_eq!(*log.borrow(), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn parallel_all_waits_for_every_child() {
        let log = Log::default();
        let mut par = Parallel::all()
            .with(scripted("a", vec![Success], &log))
            .with(scripted("b", vec![Running, Success], &log));

        assert_eq!(run(&mut par, 2), vec![Running, Success]);
        // "a" finished on the first tick and is not re-run.
        assert_eq!(*log.borrow(), vec!["a", "b", "b"]);
    }

    #[test]
    fn parallel_all_fails_fast() {
        let log = Log::default();
        let mut par = Parallel::all()
            .with(scripted("a", vec![Fail], &log))
            .with(scripted("b", vec![Running], &log));
        assert_eq!(run(&mut par, 1), vec![Fail]);
    }

    #[test]
    fn parallel_any_succeeds_on_first_success() {
        let log = Log::default();
        let mut par = Parallel::any()
            .with(scripted("a", vec![Fail], &log))
            .with(scripted("b", vec![Running, Success], &log));
        assert_eq!(run(&mut par, 2), vec![Running, Success]);
    }

    #[test]
    fn parallel_unreachable_thresholds_fail() {
        let log = Log::default();
        let mut par = Parallel::new(3, 3)
            .with(scripted("a", vec![Success], &log))
            .with(scripted("b", vec![Success], &log))
            .with(scripted("c", vec![Fail], &log))
            .with(scripted("d", vec![Fail], &log));
        assert_eq!(run(&mut par, 1), vec![Fail]);
    }

    #[test]
    fn condition_maps_to_success_or_fail() {
        let mut yes = Condition::new(|ctx| ctx.world.is_alive(ctx.root));
        let mut late = Condition::new(|ctx| ctx.tick >= 1);
        assert_eq!(run(&mut yes, 1), vec![Success]);
        assert_eq!(run(&mut late, 2), vec![Fail, Success]);
    }
}
