//! Corpse removal - clears dead entities after their grace period.

use crate::components::*;
use crate::config::SimConfig;
use crate::state::GameState;
use crate::systems::DeltaTime;
use bevy_ecs::prelude::*;
use tracing::debug;

/// Age every corpse by `dt` and remove those older than `corpse_lifetime`.
pub fn update(state: &mut GameState, dt: f32, corpse_lifetime: f32) {
    for id in state.collect_ids::<Dead>() {
        let Some(dead) = state.get_component_mut::<Dead>(id) else {
            continue;
        };
        dead.timer += dt;
        if dead.timer >= corpse_lifetime {
            state.remove_entity(id);
            debug!(entity = %id, "corpse_removed");
        }
    }
}

/// System wrapper that runs [`update`] with the configured lifetime.
pub fn corpse_system(dt: Res<DeltaTime>, config: Res<SimConfig>, mut state: ResMut<GameState>) {
    update(&mut state, dt.0, config.corpse_lifetime);
}
