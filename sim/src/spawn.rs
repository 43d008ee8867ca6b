//! Unit factories.
//!
//! A [`UnitTemplate`] describes which components a unit starts with.
//! [`spawn_unit`] either attaches all of them or leaves no entity behind.

use crate::components::*;
use crate::error::StoreError;
use crate::state::{GameComponent, GameState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Attack parameters for a template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackProfile {
    pub damage: i32,
    pub range: f32,
    pub speed: f32,
}

/// Starting components for a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub name: String,
    pub max_hp: f32,
    pub regen_rate: f32,
    pub speed: f32,
    pub intelligent: bool,
    pub can_fly: bool,
    pub vision: u32,
    pub attack: Option<AttackProfile>,
    pub flee: Option<Flee>,
}

impl UnitTemplate {
    /// Melee line unit.
    pub fn infantry() -> Self {
        Self {
            name: "infantry".into(),
            max_hp: 60.0,
            regen_rate: 0.5,
            speed: 2.0,
            intelligent: true,
            can_fly: false,
            vision: 6,
            attack: Some(AttackProfile { damage: 8, range: 1.5, speed: 1.0 }),
            flee: None,
        }
    }

    /// Ranged unit that backs off when badly hurt.
    pub fn archer() -> Self {
        Self {
            name: "archer".into(),
            max_hp: 35.0,
            regen_rate: 0.25,
            speed: 2.0,
            intelligent: true,
            can_fly: false,
            vision: 9,
            attack: Some(AttackProfile { damage: 6, range: 6.0, speed: 0.75 }),
            flee: Some(Flee::below_health(0.3)),
        }
    }

    /// Fast, fragile, far-seeing.
    pub fn scout() -> Self {
        Self {
            name: "scout".into(),
            max_hp: 25.0,
            regen_rate: 1.0,
            speed: 4.0,
            intelligent: true,
            can_fly: false,
            vision: 12,
            attack: Some(AttackProfile { damage: 3, range: 1.5, speed: 1.5 }),
            flee: Some(Flee::below_health(0.5)),
        }
    }

    /// Flier: ignores walls, moves in straight lines.
    pub fn drake() -> Self {
        Self {
            name: "drake".into(),
            max_hp: 120.0,
            regen_rate: 0.0,
            speed: 3.0,
            intelligent: false,
            can_fly: true,
            vision: 8,
            attack: Some(AttackProfile { damage: 20, range: 2.0, speed: 0.5 }),
            flee: None,
        }
    }

    /// Unarmed; runs from anything hostile.
    pub fn peasant() -> Self {
        Self {
            name: "peasant".into(),
            max_hp: 20.0,
            regen_rate: 0.5,
            speed: 1.5,
            intelligent: false,
            can_fly: false,
            vision: 5,
            attack: None,
            flee: Some(Flee::from_enemies()),
        }
    }
}

fn attach<C: GameComponent>(state: &mut GameState, id: EntityId, component: C) -> Result<(), StoreError> {
    state.add_component(id, component).map(|_| ())
}

fn attach_unit(state: &mut GameState, id: EntityId, template: &UnitTemplate, player: u32, x: f32, y: f32) -> Result<(), StoreError> {
    attach(state, id, Position::new(x, y))?;
    attach(state, id, Player::new(player))?;
    attach(state, id, Health::new(template.max_hp).with_regen(template.regen_rate))?;
    attach(state, id, Vision::new(template.vision))?;
    attach(state, id, Selectable::default())?;

    let mut movable = Movable::new(template.speed);
    if template.intelligent {
        movable = movable.intelligent();
    }
    if template.can_fly {
        movable = movable.flying();
    }
    attach(state, id, movable)?;

    if let Some(profile) = template.attack {
        attach(state, id, Attack::new(profile.damage, profile.range, profile.speed))?;
    }
    if let Some(flee) = template.flee {
        attach(state, id, flee)?;
    }
    Ok(())
}

fn attach_structure(state: &mut GameState, id: EntityId, player: u32, max_hp: f32, x: f32, y: f32) -> Result<(), StoreError> {
    attach(state, id, Position::new(x, y))?;
    attach(state, id, Player::new(player))?;
    attach(state, id, Health::new(max_hp))
}

/// Spawn a unit from `template` for `player` at `(x, y)`.
pub fn spawn_unit(state: &mut GameState, template: &UnitTemplate, player: u32, x: f32, y: f32) -> Result<EntityId, StoreError> {
    let id = state.create_entity()?;
    if let Err(error) = attach_unit(state, id, template, player, x, y) {
        state.remove_entity(id);
        return Err(error);
    }
    debug!(entity = %id, unit = %template.name, player, x, y, "unit_spawned");
    Ok(id)
}

/// Spawn a static, owned, damageable object such as a wall or tower.
pub fn spawn_structure(state: &mut GameState, player: u32, max_hp: f32, x: f32, y: f32) -> Result<EntityId, StoreError> {
    let id = state.create_entity()?;
    if let Err(error) = attach_structure(state, id, player, max_hp, x, y) {
        state.remove_entity(id);
        return Err(error);
    }
    debug!(entity = %id, player, x, y, "structure_spawned");
    Ok(id)
}
