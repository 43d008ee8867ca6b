//! Movement system - advances entities along paths or straight lines.
//!
//! Move orders enter through [`set_move_target`]. Intelligent movers ask the
//! map for a route once, when the order is issued; the per-tick update only
//! consumes that route. Anything moving without a route (straight-line
//! movers, fleeing units) walks straight at its target and stops advancing
//! while any cell the step would cross is blocked.

use crate::components::*;
use crate::map::{NavMap, NavResource};
use crate::state::GameState;
use crate::systems::DeltaTime;
use bevy_ecs::prelude::*;
use tracing::{debug, trace};

/// Distance under which a waypoint or target counts as reached.
pub const ARRIVAL_EPSILON: f32 = 1e-3;

/// Issue a move order. Intelligent movers are routed through
/// `map.find_path`; an unreachable goal cancels the order.
///
/// Returns `false` when the entity cannot move or the goal is unreachable.
pub fn set_move_target(state: &mut GameState, map: &dyn NavMap, id: EntityId, x: f32, y: f32) -> bool {
    let Some(start) = state.get_component::<Position>(id).map(Position::cell) else {
        return false;
    };
    let Some(movable) = state.get_component_mut::<Movable>(id) else {
        return false;
    };

    movable.path.clear();
    if movable.intelligent {
        let goal = GameState::cell_of(x, y);
        let path = map.find_path(start, goal, movable.can_fly);
        if path.is_empty() && start != goal {
            debug!(entity = %id, ?start, ?goal, "move_target_unreachable");
            movable.clear_target();
            return false;
        }
        movable.path.extend(path.into_iter().filter(|&cell| cell != start));
    }
    movable.set_target(x, y);
    true
}

/// Point the mover straight at `(x, y)`, bypassing the pathfinder.
pub fn set_direct_target(state: &mut GameState, id: EntityId, x: f32, y: f32) -> bool {
    let Some(movable) = state.get_component_mut::<Movable>(id) else {
        return false;
    };
    movable.path.clear();
    movable.set_target(x, y);
    true
}

/// Cancel in-flight movement by snapping the target to the current position.
pub fn halt(state: &mut GameState, id: EntityId) {
    let Some(pos) = state.get_component::<Position>(id).copied() else {
        return;
    };
    if let Some(movable) = state.get_component_mut::<Movable>(id) {
        movable.path.clear();
        movable.set_target(pos.x, pos.y);
    }
}

/// Move `from` toward `to` by at most `step`, never overshooting.
fn step_toward(from: Position, to: (f32, f32), step: f32) -> Position {
    let dx = to.0 - from.x;
    let dy = to.1 - from.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist <= step || dist < ARRIVAL_EPSILON {
        Position::new(to.0, to.1)
    } else {
        Position::new(from.x + dx / dist * step, from.y + dy / dist * step)
    }
}

/// Cells entered by the segment `from → to`, in order, excluding the start
/// cell. Consecutive cells share an edge, so a step never skips a cell.
fn crossed_cells(from: Position, to: Position) -> Vec<(i32, i32)> {
    let (mut cx, mut cy) = from.cell();
    let (ex, ey) = to.cell();
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let step_x = (ex - cx).signum();
    let step_y = (ey - cy).signum();

    let t_delta_x = if dx != 0.0 { (1.0 / dx).abs() } else { f32::INFINITY };
    let t_delta_y = if dy != 0.0 { (1.0 / dy).abs() } else { f32::INFINITY };
    let mut t_max_x = match step_x {
        1 => ((cx + 1) as f32 - from.x) / dx,
        -1 => (cx as f32 - from.x) / dx,
        _ => f32::INFINITY,
    };
    let mut t_max_y = match step_y {
        1 => ((cy + 1) as f32 - from.y) / dy,
        -1 => (cy as f32 - from.y) / dy,
        _ => f32::INFINITY,
    };

    let count = ((ex - cx).unsigned_abs() + (ey - cy).unsigned_abs()) as usize;
    let mut cells = Vec::with_capacity(count);
    for _ in 0..count {
        let advance_x = cy == ey || (cx != ex && t_max_x < t_max_y);
        if advance_x {
            cx += step_x;
            t_max_x += t_delta_x;
        } else {
            cy += step_y;
            t_max_y += t_delta_y;
        }
        cells.push((cx, cy));
    }
    cells
}

/// Whether a straight-line mover is stopped by any cell it would cross on
/// the way from `from` to `next`.
fn is_blocked(state: &GameState, map: &dyn NavMap, id: EntityId, from: Position, next: Position, can_fly: bool) -> bool {
    crossed_cells(from, next).into_iter().any(|(cx, cy)| {
        (!can_fly && !map.is_walkable(cx, cy)) || state.is_position_occupied(cx, cy, Some(id))
    })
}

/// Advance every entity with `Position` and `Movable` by one tick.
pub fn update(state: &mut GameState, map: &dyn NavMap, dt: f32) {
    for id in state.collect_ids::<Movable>() {
        let Some(pos) = state.get_component::<Position>(id).copied() else {
            continue;
        };
        let Some(movable) = state.get_component::<Movable>(id) else {
            continue;
        };

        let (goal, following_path) = if let Some(&(cx, cy)) = movable.path.front() {
            ((cx as f32 + 0.5, cy as f32 + 0.5), true)
        } else if let Some(target) = movable.target() {
            (target, false)
        } else {
            continue;
        };

        let next = step_toward(pos, goal, movable.speed * dt);
        if !following_path && is_blocked(state, map, id, pos, next, movable.can_fly) {
            trace!(entity = %id, x = pos.x, y = pos.y, "move_blocked");
            continue;
        }

        let arrived = (next.x - goal.0).hypot(next.y - goal.1) < ARRIVAL_EPSILON;
        if arrived {
            if let Some(movable) = state.get_component_mut::<Movable>(id) {
                if following_path {
                    movable.path.pop_front();
                } else {
                    movable.target_x = None;
                    movable.target_y = None;
                }
            }
        }
        state.update_entity_position(id, next.x, next.y);
    }
}

/// System wrapper that runs [`update`] with the tick's delta time.
pub fn movement_system(dt: Res<DeltaTime>, nav: Res<NavResource>, mut state: ResMut<GameState>) {
    update(&mut state, nav.map(), dt.0);
}
