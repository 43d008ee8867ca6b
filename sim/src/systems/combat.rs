//! Combat system - target acquisition, damage and chasing.
//!
//! Per attacker, each tick:
//!
//! 1. Tick the cooldown down by `dt` (it may go negative; `<= 0` is ready).
//! 2. Acquire the closest visible enemy that can be attacked when no target
//!    is set and the unit is not fleeing.
//! 3. Drop targets that no longer exist, are corpses, or are out of hp.
//! 4. In range (inclusive): stop moving, strike when ready.
//! 5. Out of range: chase through the regular move-order entry point.
//!
//! Damage is a plain subtraction. Nothing here clamps `hp` or kills; the
//! Health system handles that at the start of the next tick.

use crate::components::*;
use crate::map::{NavMap, NavResource};
use crate::state::GameState;
use crate::systems::movement::{halt, set_move_target};
use crate::systems::DeltaTime;
use crate::targeting::closest_enemy_of_where;
use bevy_ecs::prelude::*;
use tracing::{debug, trace};

/// Whether `id` can still be attacked.
fn is_valid_target(state: &GameState, id: EntityId) -> bool {
    state.contains(id)
        && !state.has_component::<Dead>(id)
        && state.has_component::<Position>(id)
        && state
            .get_component::<Health>(id)
            .is_some_and(|health| health.hp > 0.0)
}

fn is_fleeing(state: &GameState, id: EntityId) -> bool {
    state
        .get_component::<Flee>(id)
        .is_some_and(|flee| flee.is_fleeing)
}

/// Move toward `enemy`, re-issuing the order only when the enemy's cell
/// differs from the one already targeted.
fn chase(state: &mut GameState, map: &dyn NavMap, id: EntityId, enemy: Position) {
    let Some(movable) = state.get_component::<Movable>(id) else {
        return;
    };
    let current = movable.target().map(|(x, y)| GameState::cell_of(x, y));
    if current == Some(enemy.cell()) {
        return;
    }
    set_move_target(state, map, id, enemy.x, enemy.y);
}

/// Run one combat tick for every entity with `Attack`.
pub fn update(state: &mut GameState, map: &dyn NavMap, dt: f32) {
    for id in state.collect_ids::<Attack>() {
        let fleeing = is_fleeing(state, id);
        let Some(attack) = state.get_component_mut::<Attack>(id) else {
            continue;
        };
        attack.cooldown -= dt;
        let current_target = attack.target;

        let target = match current_target {
            Some(target) => Some(target),
            None if !fleeing => closest_enemy_of_where(state, id, |other| is_valid_target(state, other)),
            None => None,
        };
        let Some(target) = target else {
            continue;
        };

        if !is_valid_target(state, target) {
            trace!(entity = %id, target = %target, "attack_target_cleared");
            if let Some(attack) = state.get_component_mut::<Attack>(id) {
                attack.target = None;
            }
            continue;
        }
        if current_target.is_none() {
            debug!(entity = %id, target = %target, "attack_target_acquired");
        }

        let (Some(&pos), Some(&enemy_pos)) = (
            state.get_component::<Position>(id),
            state.get_component::<Position>(target),
        ) else {
            continue;
        };
        let Some(attack) = state.get_component_mut::<Attack>(id) else {
            continue;
        };
        attack.target = Some(target);

        if pos.distance_to(&enemy_pos) > attack.range {
            chase(state, map, id, enemy_pos);
            continue;
        }

        let strike = match attack.interval() {
            Some(interval) if attack.is_ready() && attack.damage > 0 => {
                attack.cooldown = interval;
                Some(attack.damage)
            }
            _ => None,
        };
        halt(state, id);

        if let Some(damage) = strike {
            if let Some(health) = state.get_component_mut::<Health>(target) {
                health.hp -= damage as f32;
                trace!(entity = %id, target = %target, damage, hp = health.hp, "attack_hit");
            }
        }
    }
}

/// System wrapper that runs [`update`] with the tick's delta time.
pub fn combat_system(dt: Res<DeltaTime>, nav: Res<NavResource>, mut state: ResMut<GameState>) {
    update(&mut state, nav.map(), dt.0);
}
