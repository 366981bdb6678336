use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use sigil::{
    scene::SceneLoader,
    systems::{CollisionSystem, DamageSystem, LifetimeSystem, MovementSystem},
    EventBus, Registry, Scheduler,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless scene runner")]
struct Cli {
    /// Path to the scene YAML file
    #[arg(long, default_value = "scenes/playground.yaml")]
    scene: PathBuf,

    /// Override tick count (uses the scene default when omitted)
    #[arg(long)]
    ticks: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let loader = SceneLoader::new(".");
    let scene = loader.load(&cli.scene)?;
    let ticks = scene.ticks(cli.ticks);

    let mut registry = Registry::new();
    let mut bus = EventBus::new();

    let movement = MovementSystem::new(registry.types_mut())?;
    let collision = CollisionSystem::new(registry.types_mut())?;
    let damage = DamageSystem::new(registry.types_mut())?;
    let lifetime = LifetimeSystem::new(registry.types_mut())?;
    registry.add_system(movement)?;
    registry.add_system(collision)?;
    registry.add_system(damage)?;
    registry.add_system(lifetime)?;

    scene.populate(&mut registry)?;

    let mut scheduler = Scheduler::new(scene.dt);
    scheduler.run(&mut registry, &mut bus, ticks);
    // apply the last tick's queued kills before reporting
    registry.flush();

    println!(
        "Scene '{}' completed for {} ticks. {} entities remain (avg tick {:?}).",
        scene.name,
        ticks,
        registry.entity_count(),
        scheduler.average_tick_time().unwrap_or_default()
    );
    Ok(())
}
