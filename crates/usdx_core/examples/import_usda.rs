//! Example: Import a USDA file into an empty level and print what was built.
//!
//! Run with: cargo run --example import_usda -- level.usda [settings.json]

use std::env;

use anyhow::Context;
use usdx_core::{import_stage, ConversionSettings, Registry, Stage, World};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: import_usda <path-to-usda-file> [settings.json]");
        println!("\nExample:");
        println!("  cargo run --example import_usda -- level.usda");
        return Ok(());
    }

    let settings = match args.get(2) {
        Some(path) => ConversionSettings::load(path)
            .with_context(|| format!("reading settings {}", path))?,
        None => ConversionSettings::default(),
    };

    let path = &args[1];
    println!("Importing USDA file: {}", path);
    let stage = Stage::open(path).with_context(|| format!("opening {}", path))?;
    println!(
        "Stage: {} prims, up axis {}, {} m/unit (export default {})",
        stage.prim_count(),
        stage.axes().up_axis.token(),
        stage.axes().meters_per_unit,
        settings.stage.up_axis.token()
    );

    let mut world = World::new(settings.root_prim_name.as_str());
    let report = import_stage(&stage, &mut world, &Registry::default());

    println!("\n=== Level: {} ===", world.level_name());
    println!("Visited prims: {}", report.visited);
    println!("Actors: {}", world.actor_count());
    println!("Components: {}", world.component_count());

    println!("\n--- Actors ---");
    for (id, actor) in world.actors() {
        let folder = if actor.folder_path.is_empty() {
            "/"
        } else {
            actor.folder_path.as_str()
        };
        println!(
            "  {} [{}] in {} - {} components",
            world.actor_path_name(id),
            actor.class_path,
            folder,
            actor.components.len()
        );
        let root = world.world_transform(actor.root);
        println!(
            "       at ({:.2}, {:.2}, {:.2})",
            root.translation.x, root.translation.y, root.translation.z
        );
    }

    if !report.failures.is_empty() {
        println!("\n--- Failures ---");
        for failure in &report.failures {
            println!("  {}: {}", failure.path, failure.error);
        }
    }
    Ok(())
}
