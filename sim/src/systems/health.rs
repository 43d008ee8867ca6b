//! Health system - regeneration and the alive → dead transition.

use crate::components::*;
use crate::state::GameState;
use crate::systems::DeltaTime;
use bevy_ecs::prelude::*;
use tracing::debug;

/// Regenerate living entities and turn depleted ones into corpses.
///
/// An entity at `hp <= 0` gains `Dead` and loses `Movable`, `Attack`,
/// `Selectable` and `Flee`. Corpses are skipped entirely.
pub fn update(state: &mut GameState, dt: f32) {
    for id in state.collect_ids::<Health>() {
        if state.has_component::<Dead>(id) {
            continue;
        }
        let Some(health) = state.get_component_mut::<Health>(id) else {
            continue;
        };

        if health.hp > 0.0 {
            health.regenerate(dt);
            continue;
        }
        kill(state, id);
    }
}

fn kill(state: &mut GameState, id: EntityId) {
    if let Err(error) = state.add_component(id, Dead::default()) {
        debug!(entity = %id, %error, "mark_dead_failed");
        return;
    }
    state.remove_component::<Movable>(id);
    state.remove_component::<Attack>(id);
    state.remove_component::<Selectable>(id);
    state.remove_component::<Flee>(id);
    debug!(entity = %id, "entity_died");
}

/// System wrapper that runs [`update`] with the tick's delta time.
pub fn health_system(dt: Res<DeltaTime>, mut state: ResMut<GameState>) {
    update(&mut state, dt.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_health(state: &mut GameState, health: Health) -> EntityId {
        let id = state.create_entity().unwrap();
        state.add_component(id, health).unwrap();
        id
    }

    #[test]
    fn test_regen_clamps_to_max() {
        let mut state = GameState::default();
        let id = with_health(&mut state, Health { hp: 8.0, max_hp: 10.0, regen_rate: 5.0 });

        update(&mut state, 1.0);
        assert_eq!(state.get_component::<Health>(id).unwrap().hp, 10.0);
    }

    #[test]
    fn test_regen_at_cap_is_idempotent() {
        let mut state = GameState::default();
        let id = with_health(&mut state, Health::new(40.0).with_regen(3.0));
        for _ in 0..5 {
            update(&mut state, 0.5);
        }
        assert_eq!(state.get_component::<Health>(id).unwrap().hp, 40.0);
    }

    #[test]
    fn test_death_strips_components() {
        let mut state = GameState::default();
        let id = with_health(&mut state, Health { hp: -5.0, max_hp: 10.0, regen_rate: 1.0 });
        state.add_component(id, Position::new(1.0, 1.0)).unwrap();
        state.add_component(id, Movable::new(1.0)).unwrap();
        state.add_component(id, Attack::new(3, 1.0, 1.0)).unwrap();
        state.add_component(id, Selectable { is_selected: true }).unwrap();
        state.add_component(id, Flee::from_enemies()).unwrap();

        update(&mut state, 0.1);

        let entity = state.entity(id).unwrap();
        assert!(entity.has::<Dead>());
        assert!(!entity.has::<Movable>());
        assert!(!entity.has::<Attack>());
        assert!(!entity.has::<Selectable>());
        assert!(!entity.has::<Flee>());
        assert!(entity.has::<Position>());
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_death_without_optional_components() {
        let mut state = GameState::default();
        let id = with_health(&mut state, Health { hp: 0.0, max_hp: 10.0, regen_rate: 0.0 });
        update(&mut state, 0.1);
        assert_eq!(state.get_component::<Dead>(id), Some(&Dead { timer: 0.0 }));
    }

    #[test]
    fn test_corpses_do_not_regenerate() {
        let mut state = GameState::default();
        let id = with_health(&mut state, Health { hp: 0.0, max_hp: 10.0, regen_rate: 100.0 });
        update(&mut state, 1.0);
        update(&mut state, 1.0);
        assert_eq!(state.get_component::<Health>(id).unwrap().hp, 0.0);
    }

    #[test]
    fn test_health_system_runs_in_schedule() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        let mut state = GameState::default();
        let id = with_health(&mut state, Health { hp: 1.0, max_hp: 10.0, regen_rate: 2.0 });
        world.insert_resource(state);

        let mut schedule = Schedule::default();
        schedule.add_systems(health_system);
        schedule.run(&mut world);

        let hp = world.resource::<GameState>().get_component::<Health>(id).unwrap().hp;
        assert_eq!(hp, 3.0);
    }
}
