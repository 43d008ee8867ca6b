//! Basic demonstration of the tactics simulation.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=tactics_sim=debug to see deaths and corpse removal.

use tactics_sim::{GridMap, SimWorld, UnitTemplate};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    init_tracing();
    println!("=== Tactics Sim - Simulation Demo ===\n");

    // 40x24 field with a wall down the middle, open at the top and bottom
    let map = GridMap::with_wall(40, 24, 19..=20, 4..=19);
    let mut sim = SimWorld::new(map);

    let mut blue = Vec::new();
    for i in 0..4 {
        let y = 6.5 + i as f32 * 3.0;
        let template = if i % 2 == 0 { UnitTemplate::infantry() } else { UnitTemplate::archer() };
        blue.extend(sim.spawn_unit(&template, 1, 4.5, y).ok());
    }
    blue.extend(sim.spawn_unit(&UnitTemplate::drake(), 1, 2.5, 12.5).ok());

    for i in 0..4 {
        let y = 6.5 + i as f32 * 3.0;
        sim.spawn_unit(&UnitTemplate::infantry(), 2, 34.5, y).ok();
    }
    sim.spawn_unit(&UnitTemplate::peasant(), 2, 30.5, 12.5).ok();
    sim.spawn_structure(2, 150.0, 37.5, 12.5).ok();

    println!("Initial state:");
    print_snapshot(&sim);

    println!("\n--- Ordering Blue across the field ---\n");
    let selected = sim.select(blue.iter().copied());
    println!("  selected {selected} units");
    for id in sim.selected() {
        sim.order_move(id, 33.5, 12.5);
    }

    println!("Running simulation for 600 frames (20 seconds at 30 frames/sec)...\n");
    for frame in 0..600 {
        sim.step(1.0 / 30.0);

        if (frame + 1) % 90 == 0 {
            println!("--- Tick {} (t={:.1}s) ---", sim.current_tick(), sim.current_time());
            print_snapshot(&sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(error) => eprintln!("snapshot serialization failed: {error}"),
    }
}

fn print_snapshot(sim: &SimWorld) {
    let snapshot = sim.snapshot();
    let fog = sim.fog().counts();

    for player in [1, 2] {
        println!("  Player {player}:");
        for unit in snapshot.entities.iter().filter(|e| e.player == Some(player)) {
            let status = if unit.dead {
                "dead"
            } else if unit.fleeing {
                "fleeing"
            } else if unit.attack_target.is_some() {
                "fighting"
            } else if unit.moving {
                "moving"
            } else {
                "idle"
            };
            println!(
                "    {}: pos=({:.1}, {:.1}) hp={:.0}/{:.0} [{}]{}",
                unit.id,
                unit.x,
                unit.y,
                unit.health.unwrap_or(0.0),
                unit.health_max.unwrap_or(0.0),
                status,
                if unit.visible { "" } else { " (fogged)" },
            );
        }
    }
    println!(
        "  Fog: {} visible, {} explored, {} hidden",
        fog.visible, fog.explored, fog.hidden
    );
}
