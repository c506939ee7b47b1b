//! Headless Atlas simulation server.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p atlas-server -- --ticks 600 --regions-x 4` to simulate
//! a smaller map for twenty seconds; a JSON run report is printed on exit.

mod scenario;

use atlas_config::{CliArgs, Config, ConfigError, default_config_dir};
use atlas_world::{EntityId, TriggerEdge, World};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

/// Totals printed after the run.
#[derive(Debug, Default, Serialize)]
struct RunReport {
    ticks: u32,
    tick_delta_s: f32,
    regions_loaded: usize,
    entities_spawned: usize,
    entities_remaining: usize,
    regenerated: usize,
    moved: usize,
    blocked: usize,
    truncated_walks: usize,
    triggers_fired: usize,
    released: Vec<EntityId>,
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let Some(config_dir) = args.config.clone().or_else(default_config_dir) else {
        eprintln!("{}", ConfigError::NoConfigDir);
        std::process::exit(1);
    };

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    atlas_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let delta = config.simulation.tick_delta_s();
    info!(
        "Atlas server: {}x{} regions of {} tiles, {} ticks at {:.4}s",
        config.world.regions_x,
        config.world.regions_y,
        config.world.region_size,
        args.ticks,
        delta
    );

    let mut world = World::new(scenario::world_settings(&config));
    let scenario = match scenario::populate(&mut world) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!("Failed to populate world: {e}");
            std::process::exit(1);
        }
    };

    let mut report = RunReport {
        ticks: args.ticks,
        tick_delta_s: delta,
        regions_loaded: world.grid().loaded_count(),
        entities_spawned: scenario.spawned,
        ..RunReport::default()
    };

    for tick in 0..args.ticks {
        world.set_ambient_light(scenario::ambient_at(world.elapsed()));
        if tick % scenario::STEER_INTERVAL == 0 {
            scenario::steer(&mut world, &scenario);
        }

        let stats = world.tick(delta, |event| match event.edge {
            TriggerEdge::On => info!("Tick {tick}: trigger {:?} pressed", event.trigger),
            TriggerEdge::Off => info!("Tick {tick}: trigger {:?} released", event.trigger),
        });

        report.regenerated += stats.regenerated;
        report.moved += stats.moved;
        report.blocked += stats.blocked;
        report.truncated_walks += stats.truncated_walks;
        report.triggers_fired += stats.triggers_fired;
        report.released.extend(stats.released);
    }
    report.entities_remaining = world.entity_count();

    info!(
        "Finished {} ticks: {} moves, {} blocked, {} released",
        report.ticks,
        report.moved,
        report.blocked,
        report.released.len()
    );
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize run report: {e}"),
    }
}
