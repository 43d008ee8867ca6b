//! Public API for the simulation.
//!
//! [`SimWorld`] owns the bevy `World` holding the game state and its
//! resources, plus the tick schedule. Renderers and input layers talk to the
//! simulation only through this type.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 30 Hz). When `step(dt)` is called,
//! the simulation accumulates time and runs fixed updates as needed. This ensures deterministic
//! behavior regardless of frame rate.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::{ConfigError, StoreError};
use crate::map::{NavMap, NavResource};
use crate::spawn::{self, UnitTemplate};
use crate::state::GameState;
use crate::systems::{self, DeltaTime, FogOfWar};
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use tracing::{debug, warn};

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Stepping the simulation forward
/// - Extracting state snapshots
/// - Issuing orders and managing selection
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a simulation over `map` with the default configuration.
    pub fn new(map: impl NavMap + 'static) -> Self {
        Self::build(SimConfig::default(), NavResource::new(map))
    }

    /// Create a simulation with a custom configuration.
    pub fn with_config(config: SimConfig, map: impl NavMap + 'static) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, NavResource::new(map)))
    }

    fn build(config: SimConfig, nav: NavResource) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(GameState::new(config.max_entities));
        world.insert_resource(FogOfWar::new(nav.map().width(), nav.map().height()));
        world.insert_resource(nav);
        world.insert_resource(config);

        Self {
            world,
            schedule: systems::build_tick_schedule(),
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
        }
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Uses fixed timestep internally - accumulates time and runs fixed updates
    /// as needed. Returns the number of fixed updates run.
    pub fn step(&mut self, dt: f32) -> u32 {
        let fixed_dt = self.config().fixed_timestep;
        self.time_accumulator += dt.max(0.0);

        let mut ticks = 0;
        while self.time_accumulator >= fixed_dt {
            self.tick_once(fixed_dt);
            self.time_accumulator -= fixed_dt;
            ticks += 1;
        }
        ticks
    }

    /// Run every system once with an explicit delta time.
    pub fn tick_once(&mut self, dt: f32) {
        self.world.resource_mut::<DeltaTime>().0 = dt;
        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.state(), self.fog(), self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&self) -> String {
        self.snapshot().to_json().unwrap_or_else(|error| {
            warn!(error = %error, "snapshot_serialize_failed");
            "{}".to_string()
        })
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn state(&self) -> &GameState {
        self.world.resource::<GameState>()
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        self.world.resource_mut::<GameState>().into_inner()
    }

    pub fn fog(&self) -> &FogOfWar {
        self.world.resource::<FogOfWar>()
    }

    pub fn fog_mut(&mut self) -> &mut FogOfWar {
        self.world.resource_mut::<FogOfWar>().into_inner()
    }

    pub fn map(&self) -> &dyn NavMap {
        self.world.resource::<NavResource>().map()
    }

    /// Spawn a unit from a template.
    pub fn spawn_unit(&mut self, template: &UnitTemplate, player: u32, x: f32, y: f32) -> Result<EntityId, StoreError> {
        spawn::spawn_unit(self.state_mut(), template, player, x, y)
    }

    /// Spawn a static structure.
    pub fn spawn_structure(&mut self, player: u32, max_hp: f32, x: f32, y: f32) -> Result<EntityId, StoreError> {
        spawn::spawn_structure(self.state_mut(), player, max_hp, x, y)
    }

    /// Order a unit to move to `(x, y)`. Drops its attack target.
    ///
    /// Returns `false` if the unit cannot move or the goal is unreachable.
    pub fn order_move(&mut self, id: EntityId, x: f32, y: f32) -> bool {
        let nav = self.world.resource::<NavResource>().clone();
        let state = self.state_mut();
        if let Some(attack) = state.get_component_mut::<Attack>(id) {
            attack.target = None;
        }
        systems::set_move_target(state, nav.map(), id, x, y)
    }

    /// Order a unit to attack `target`. Combat handles the chase.
    pub fn order_attack(&mut self, id: EntityId, target: EntityId) -> bool {
        let state = self.state_mut();
        if !state.contains(target) || state.has_component::<Dead>(target) {
            debug!(entity = %id, target = %target, "attack_order_rejected");
            return false;
        }
        match state.get_component_mut::<Attack>(id) {
            Some(attack) => {
                attack.target = Some(target);
                true
            }
            None => false,
        }
    }

    /// Stop moving and drop any attack target.
    pub fn order_stop(&mut self, id: EntityId) {
        let state = self.state_mut();
        systems::halt(state, id);
        if let Some(attack) = state.get_component_mut::<Attack>(id) {
            attack.target = None;
        }
    }

    /// Replace the selection with the selectable entities among `ids`.
    /// Returns how many ended up selected.
    pub fn select(&mut self, ids: impl IntoIterator<Item = EntityId>) -> usize {
        self.clear_selection();
        let state = self.state_mut();
        let mut count = 0;
        for id in ids {
            if let Some(selectable) = state.get_component_mut::<Selectable>(id) {
                if !selectable.is_selected {
                    selectable.is_selected = true;
                    count += 1;
                }
            }
        }
        count
    }

    pub fn clear_selection(&mut self) {
        let state = self.state_mut();
        for id in state.collect_ids::<Selectable>() {
            if let Some(selectable) = state.get_component_mut::<Selectable>(id) {
                selectable.is_selected = false;
            }
        }
    }

    /// Currently selected entities, ascending id.
    pub fn selected(&self) -> Vec<EntityId> {
        let state = self.state();
        state
            .get_entities_with_component::<Selectable>()
            .iter()
            .copied()
            .filter(|&id| {
                state
                    .get_component::<Selectable>(id)
                    .is_some_and(|s| s.is_selected)
            })
            .collect()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
