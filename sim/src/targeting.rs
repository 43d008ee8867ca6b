//! Nearest-enemy query shared by combat and flee logic.

use crate::components::*;
use crate::state::GameState;

/// Find the closest hostile entity within `vision.range` of `self_pos`.
///
/// Candidates are entities with both `Player` and `Position`, excluding
/// `self_id`, same-faction entities, and corpses. Entities are scanned in
/// ascending id order and a candidate only replaces the current best when
/// strictly closer, so ties go to the lowest id.
pub fn find_closest_enemy(
    self_id: EntityId,
    self_pos: &Position,
    self_player: &Player,
    vision: &Vision,
    state: &GameState,
) -> Option<EntityId> {
    find_closest_enemy_where(self_id, self_pos, self_player, vision, state, |_| true)
}

/// [`find_closest_enemy`] restricted to candidates accepted by `accept`.
/// Rejected candidates never shadow farther ones that pass.
pub fn find_closest_enemy_where(
    self_id: EntityId,
    self_pos: &Position,
    self_player: &Player,
    vision: &Vision,
    state: &GameState,
    accept: impl Fn(EntityId) -> bool,
) -> Option<EntityId> {
    let max_range = vision.range as f32;
    let mut best: Option<(EntityId, f32)> = None;

    for &other in state.get_entities_with_component::<Player>() {
        if other == self_id || state.has_component::<Dead>(other) {
            continue;
        }
        let Some(player) = state.get_component::<Player>(other) else {
            continue;
        };
        if !self_player.is_hostile_to(player) {
            continue;
        }
        let Some(pos) = state.get_component::<Position>(other) else {
            continue;
        };

        let dist = self_pos.distance_to(pos);
        if dist > max_range || !accept(other) {
            continue;
        }
        if best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((other, dist));
        }
    }

    best.map(|(entity, _)| entity)
}

/// [`find_closest_enemy`] for an entity already in the store. `None` if it
/// lacks `Position`, `Player`, or `Vision`.
pub fn closest_enemy_of(state: &GameState, id: EntityId) -> Option<EntityId> {
    let pos = state.get_component::<Position>(id)?;
    let player = state.get_component::<Player>(id)?;
    let vision = state.get_component::<Vision>(id)?;
    find_closest_enemy(id, pos, player, vision, state)
}

/// [`closest_enemy_of`] with a candidate filter.
pub fn closest_enemy_of_where(
    state: &GameState,
    id: EntityId,
    accept: impl Fn(EntityId) -> bool,
) -> Option<EntityId> {
    let pos = state.get_component::<Position>(id)?;
    let player = state.get_component::<Player>(id)?;
    let vision = state.get_component::<Vision>(id)?;
    find_closest_enemy_where(id, pos, player, vision, state, accept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(state: &mut GameState, player: u32, x: f32, y: f32) -> EntityId {
        let id = state.create_entity().unwrap();
        state.add_component(id, Position::new(x, y)).unwrap();
        state.add_component(id, Player::new(player)).unwrap();
        state.add_component(id, Vision::new(5)).unwrap();
        id
    }

    #[test]
    fn test_nearest_hostile_within_range() {
        let mut state = GameState::default();
        let me = unit(&mut state, 1, 0.0, 0.0);
        let _friend = unit(&mut state, 1, 1.0, 0.0);
        let far = unit(&mut state, 2, 4.0, 0.0);
        let near = unit(&mut state, 3, 0.0, 2.0);
        let _outside = unit(&mut state, 2, 9.0, 0.0);

        assert_eq!(closest_enemy_of(&state, me), Some(near));
        state.remove_entity(near);
        assert_eq!(closest_enemy_of(&state, me), Some(far));
    }

    #[test]
    fn test_range_is_inclusive() {
        let mut state = GameState::default();
        let me = unit(&mut state, 1, 0.0, 0.0);
        let edge = unit(&mut state, 2, 5.0, 0.0);
        assert_eq!(closest_enemy_of(&state, me), Some(edge));

        state.update_entity_position(edge, 5.01, 0.0);
        assert_eq!(closest_enemy_of(&state, me), None);
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let mut state = GameState::default();
        let me = unit(&mut state, 1, 0.0, 0.0);
        let first = unit(&mut state, 2, 3.0, 0.0);
        let _second = unit(&mut state, 2, -3.0, 0.0);
        assert_eq!(closest_enemy_of(&state, me), Some(first));
    }

    #[test]
    fn test_corpses_are_ignored() {
        let mut state = GameState::default();
        let me = unit(&mut state, 1, 0.0, 0.0);
        let corpse = unit(&mut state, 2, 1.0, 0.0);
        state.add_component(corpse, Dead::default()).unwrap();
        assert_eq!(closest_enemy_of(&state, me), None);
    }

    #[test]
    fn test_filter_skips_rejected_candidates() {
        let mut state = GameState::default();
        let me = unit(&mut state, 1, 0.0, 0.0);
        let rejected = unit(&mut state, 2, 1.0, 0.0);
        let accepted = unit(&mut state, 2, 3.0, 0.0);

        assert_eq!(closest_enemy_of(&state, me), Some(rejected));
        assert_eq!(closest_enemy_of_where(&state, me, |id| id != rejected), Some(accepted));
        assert_eq!(closest_enemy_of_where(&state, me, |_| false), None);
    }

    #[test]
    fn test_missing_vision_sees_nothing() {
        let mut state = GameState::default();
        let me = unit(&mut state, 1, 0.0, 0.0);
        unit(&mut state, 2, 1.0, 0.0);
        state.remove_component::<Vision>(me);
        assert_eq!(closest_enemy_of(&state, me), None);
    }
}
