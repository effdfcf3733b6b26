//! Fixed-timestep control loop.
//!
//! The [`TickLoop`] owns the [`World`], the [`EventBus`] and the per-entity
//! [`BehaviorTrees`]. Each tick:
//!
//! 1. Host systems run in registration order. They read the world and may
//!    enqueue events.
//! 2. Every entity's behavior tree is evaluated once, in spawn order. Trees
//!    read the world and enqueue events.
//! 3. The bus is dispatched: everything enqueued so far is delivered in FIFO
//!    order and consumers apply the actual state changes. Events that
//!    consumers enqueue wait for the next tick.
//! 4. The tick counter advances.
//!
//! Nothing mutates the world before step 3, so every decision made in a tick
//! sees the same state.
//!
//! # Example
//!
//! ```
//! use magick_engine::prelude::*;
//!
//! let config = TickConfig { fixed_dt: 1.0 / 30.0, ..Default::default() };
//! let mut tick_loop = TickLoop::new(World::new(), config);
//! tick_loop.add_system("noop", |_world, _events| {});
//!
//! tick_loop.run_ticks(10);
//! assert_eq!(tick_loop.tick_count(), 10);
//! ```

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use magick_ecs::component::KindId;
use magick_ecs::event::{DispatchReport, Event, EventBus, EventQueue};
use magick_ecs::world::World;

use crate::ai::{BehaviorTrees, TreeRunReport};
use crate::attachment;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the tick loop.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Warn when more than this many events are waiting at dispatch time.
    /// Must be at least 1.
    pub queue_warn_depth: usize,
    /// Emit a `trace!` line for every evaluated behavior tree.
    pub trace_trees: bool,
}

impl Default for TickConfig {
    /// 60 Hz, warn above 1024 queued events, no per-tree tracing.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            queue_warn_depth: 1024,
            trace_trees: false,
        }
    }
}

impl TickConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidConfig {
                reason: format!("fixed_dt must be positive and finite, got {}", self.fixed_dt),
            });
        }
        if self.queue_warn_depth == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "queue_warn_depth must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing and outcome counts for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system (in order of execution).
    pub system_times: Vec<(String, Duration)>,
    pub tree_time: Duration,
    pub dispatch_time: Duration,
    /// Total time for the tick.
    pub total_time: Duration,
    /// Events waiting when dispatch started.
    pub queued_at_dispatch: usize,
    pub trees: TreeRunReport,
    pub dispatch: DispatchReport,
}

// ---------------------------------------------------------------------------
// SystemFn
// ---------------------------------------------------------------------------

/// A host system run once per tick, before behavior trees.
///
/// Systems see the world read-only; any change they want goes through an
/// event.
pub type SystemFn = fn(&World, &mut EventQueue);

struct RegisteredSystem {
    name: String,
    func: SystemFn,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The fixed-timestep control loop.
///
/// Given the same initial world, systems, trees and consumers, every run
/// produces the same sequence of states: systems run in registration order,
/// trees in spawn order, and the bus delivers in FIFO order.
pub struct TickLoop {
    world: World,
    bus: EventBus,
    trees: BehaviorTrees,
    systems: Vec<RegisteredSystem>,
    tick_counter: u64,
    config: TickConfig,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Create a tick loop around `world`.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not validate; use [`try_new`](Self::try_new)
    /// for configs that come from outside the program.
    pub fn new(world: World, config: TickConfig) -> Self {
        match Self::try_new(world, config) {
            Ok(tick_loop) => tick_loop,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_new(world: World, config: TickConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut trees = BehaviorTrees::new();
        trees.set_trace_results(config.trace_trees);
        info!(
            fixed_dt = config.fixed_dt,
            queue_warn_depth = config.queue_warn_depth,
            entities = world.entity_count(),
            "tick loop created"
        );
        Ok(Self {
            world,
            bus: EventBus::new(),
            trees,
            systems: Vec::new(),
            tick_counter: 0,
            config,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    /// Register the hardpoint kind and the attach/detach consumers on this
    /// loop's world and bus.
    pub fn register_attachment(&mut self) -> Result<KindId, EngineError> {
        attachment::register_attachment(&mut self.world, &mut self.bus)
    }

    /// Register a system to run each tick, after those already registered.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &str, func: SystemFn) {
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
        });
    }

    /// Enqueue an event from outside the loop. It is delivered at the next
    /// dispatch.
    pub fn enqueue<E: Event>(&mut self, event: E) {
        self.bus.enqueue(event);
    }

    /// Execute one tick and return what the dispatch delivered.
    pub fn tick(&mut self) -> DispatchReport {
        let tick_start = Instant::now();
        let tick = self.tick_counter;
        let mut system_times = Vec::with_capacity(self.systems.len());

        // Phase 1: host systems.
        for system in &self.systems {
            let sys_start = Instant::now();
            (system.func)(&self.world, self.bus.queue_mut());
            system_times.push((system.name.clone(), sys_start.elapsed()));
        }

        // Phase 2: behavior trees.
        let tree_start = Instant::now();
        let trees = self.trees.run(&self.world, self.bus.queue_mut(), tick);
        let tree_time = tree_start.elapsed();

        // Phase 3: dispatch.
        let queued_at_dispatch = self.bus.queue().len();
        if queued_at_dispatch > self.config.queue_warn_depth {
            warn!(
                tick,
                queued = queued_at_dispatch,
                threshold = self.config.queue_warn_depth,
                "event queue above warning depth"
            );
        }
        let dispatch_start = Instant::now();
        let dispatch = self.bus.dispatch(&mut self.world);
        let dispatch_time = dispatch_start.elapsed();

        // Phase 4: advance.
        self.tick_counter += 1;

        self.last_diagnostics = TickDiagnostics {
            system_times,
            tree_time,
            dispatch_time,
            total_time: tick_start.elapsed(),
            queued_at_dispatch,
            trees,
            dispatch: dispatch.clone(),
        };
        dispatch
    }

    /// Run `count` ticks. Returns the total number of events delivered.
    pub fn run_ticks(&mut self, count: u64) -> u64 {
        let mut delivered = 0u64;
        for _ in 0..count {
            delivered += self.tick().delivered as u64;
        }
        delivered
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulation time in seconds, computed as `tick_count * fixed_dt` to
    /// avoid drift from repeated addition.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, for setup between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Mutable access to the bus, for registering consumers.
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn trees(&self) -> &BehaviorTrees {
        &self.trees
    }

    pub fn trees_mut(&mut self) -> &mut BehaviorTrees {
        &mut self.trees
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// The names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
