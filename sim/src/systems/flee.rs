//! Flee system - calm/fleeing transitions and repulsion targets.
//!
//! A unit only starts fleeing while an enemy is in vision, either because
//! it is at or below its health threshold or because it flees from enemies
//! outright. It calms down once no enemy is visible and its health is back
//! above the threshold. Low health alone keeps a fleeing unit fleeing.

use crate::components::*;
use crate::config::SimConfig;
use crate::map::{NavMap, NavResource};
use crate::state::GameState;
use crate::systems::movement::set_direct_target;
use crate::targeting::closest_enemy_of;
use bevy_ecs::prelude::*;
use tracing::trace;

/// Point `distance` units from `from`, directly away from `threat`, kept
/// inside the map.
fn flee_point(from: Position, threat: Position, distance: f32, map: &dyn NavMap) -> (f32, f32) {
    let dx = from.x - threat.x;
    let dy = from.y - threat.y;
    let len = (dx * dx + dy * dy).sqrt();
    // Standing on top of the threat: any direction will do.
    let (ux, uy) = if len > f32::EPSILON { (dx / len, dy / len) } else { (1.0, 0.0) };

    let max_x = (map.width() as f32 - 0.5).max(0.5);
    let max_y = (map.height() as f32 - 0.5).max(0.5);
    (
        (from.x + ux * distance).clamp(0.5, max_x),
        (from.y + uy * distance).clamp(0.5, max_y),
    )
}

/// Update every entity with `Flee`.
pub fn update(state: &mut GameState, map: &dyn NavMap, flee_distance: f32) {
    for id in state.collect_ids::<Flee>() {
        let Some(&flee) = state.get_component::<Flee>(id) else {
            continue;
        };
        let Some(&pos) = state.get_component::<Position>(id) else {
            continue;
        };
        let enemy = closest_enemy_of(state, id);
        let low_health = state
            .get_component::<Health>(id)
            .is_some_and(|health| flee.is_low_health(health));

        let fleeing = match enemy {
            Some(_) if low_health || flee.flees_from_enemies => true,
            Some(_) => flee.is_fleeing,
            None => flee.is_fleeing && low_health,
        };
        if fleeing != flee.is_fleeing {
            trace!(entity = %id, fleeing, "flee_state_changed");
        }
        if let Some(flee) = state.get_component_mut::<Flee>(id) {
            flee.is_fleeing = fleeing;
        }
        if !fleeing {
            continue;
        }

        if let Some(attack) = state.get_component_mut::<Attack>(id) {
            attack.target = None;
        }
        let threat = enemy.and_then(|enemy| state.get_component::<Position>(enemy).copied());
        if let Some(threat) = threat {
            let (x, y) = flee_point(pos, threat, flee_distance, map);
            set_direct_target(state, id, x, y);
        }
    }
}

/// System wrapper that runs [`update`] with the configured flee distance.
pub fn flee_system(nav: Res<NavResource>, config: Res<SimConfig>, mut state: ResMut<GameState>) {
    update(&mut state, nav.map(), config.flee_distance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GridMap;

    fn unit(state: &mut GameState, player: u32, x: f32, y: f32) -> EntityId {
        let id = state.create_entity().unwrap();
        state.add_component(id, Position::new(x, y)).unwrap();
        state.add_component(id, Player::new(player)).unwrap();
        state.add_component(id, Vision::new(4)).unwrap();
        state.add_component(id, Health::new(10.0)).unwrap();
        id
    }

    fn is_fleeing(state: &GameState, id: EntityId) -> bool {
        state.get_component::<Flee>(id).unwrap().is_fleeing
    }

    #[test]
    fn test_flee_hysteresis() {
        let map = GridMap::new(40, 40);
        let mut state = GameState::default();
        let runner = unit(&mut state, 1, 20.5, 20.5);
        state.add_component(runner, Flee::below_health(0.5)).unwrap();
        state.add_component(runner, Movable::new(1.0)).unwrap();
        state.get_component_mut::<Health>(runner).unwrap().hp = 4.0;
        let enemy = unit(&mut state, 2, 22.5, 20.5);

        update(&mut state, &map, 5.0);
        assert!(is_fleeing(&state, runner));
        let target = state.get_component::<Movable>(runner).unwrap().target().unwrap();
        assert!((target.0 - 15.5).abs() < 1e-4);
        assert!((target.1 - 20.5).abs() < 1e-4);

        // Enemy gone but still hurt: keep running.
        state.update_entity_position(enemy, 39.5, 39.5);
        update(&mut state, &map, 5.0);
        assert!(is_fleeing(&state, runner));

        state.get_component_mut::<Health>(runner).unwrap().hp = 6.0;
        update(&mut state, &map, 5.0);
        assert!(!is_fleeing(&state, runner));
    }

    #[test]
    fn test_healthy_unit_with_threshold_stays_calm() {
        let map = GridMap::new(20, 20);
        let mut state = GameState::default();
        let id = unit(&mut state, 1, 5.5, 5.5);
        state.add_component(id, Flee::below_health(0.5)).unwrap();
        unit(&mut state, 2, 6.5, 5.5);

        update(&mut state, &map, 5.0);
        assert!(!is_fleeing(&state, id));
    }

    #[test]
    fn test_flees_from_enemies_clears_attack_target() {
        let map = GridMap::new(20, 20);
        let mut state = GameState::default();
        let id = unit(&mut state, 1, 5.5, 5.5);
        state.add_component(id, Flee::from_enemies()).unwrap();
        state.add_component(id, Movable::new(1.0)).unwrap();
        let enemy = unit(&mut state, 2, 5.5, 7.5);
        let mut attack = Attack::new(1, 1.0, 1.0);
        attack.target = Some(enemy);
        state.add_component(id, attack).unwrap();

        update(&mut state, &map, 5.0);
        assert!(is_fleeing(&state, id));
        assert_eq!(state.get_component::<Attack>(id).unwrap().target, None);
        let (_, ty) = state.get_component::<Movable>(id).unwrap().target().unwrap();
        assert!(ty < 5.5);

        state.remove_entity(enemy);
        update(&mut state, &map, 5.0);
        assert!(!is_fleeing(&state, id));
    }

    #[test]
    fn test_flee_target_clamped_to_map() {
        let map = GridMap::new(10, 10);
        let mut state = GameState::default();
        let id = unit(&mut state, 1, 1.5, 1.5);
        state.add_component(id, Flee::from_enemies()).unwrap();
        state.add_component(id, Movable::new(1.0)).unwrap();
        unit(&mut state, 2, 3.5, 3.5);

        update(&mut state, &map, 5.0);
        assert_eq!(state.get_component::<Movable>(id).unwrap().target(), Some((0.5, 0.5)));
    }

    #[test]
    fn test_friendly_units_do_not_scare() {
        let map = GridMap::new(10, 10);
        let mut state = GameState::default();
        let id = unit(&mut state, 1, 4.5, 4.5);
        state.add_component(id, Flee::from_enemies()).unwrap();
        unit(&mut state, 1, 5.5, 4.5);

        update(&mut state, &map, 5.0);
        assert!(!is_fleeing(&state, id));
    }
}
