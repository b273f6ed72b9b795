//! # lens_demo
//!
//! Spawns entities, opens several live views over the same entity, writes
//! through one of them, and logs the bus traffic that results.
//!
//! ```text
//! RUST_LOG=lens_view=trace lens_demo --debug --views 3 --writes 2
//! ```

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use lens_view::{
    CHANGE, CHANGE_DETECTED, CHANGE_RESOLVED, EngineConfig, Instrumentation, View, World,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lens_demo", about = "Live query views over an entity store")]
struct Args {
    /// Emit changeDetected / changeResolved for writes through views
    #[arg(short, long)]
    debug: bool,

    /// Number of entities to spawn
    #[arg(short, long, default_value_t = 5)]
    entities: usize,

    /// Number of views opened over the first tagged entity
    #[arg(short, long, default_value_t = 2)]
    views: usize,

    /// Number of writes made through the first view
    #[arg(short, long, default_value_t = 1)]
    writes: usize,

    /// Spawn silently and flush a single change event afterwards
    #[arg(long)]
    no_emit_changes: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let config = if args.debug {
        EngineConfig::debug()
    } else {
        EngineConfig::from_env()
    };
    let world = World::new(config);
    info!(config = ?world.config(), "world created");

    let counts = subscribe_counters(&world);

    world.set_emit_changes(!args.no_emit_changes)?;
    let mut ids = Vec::with_capacity(args.entities);
    for _ in 0..args.entities {
        ids.push(world.spawn(None)?);
    }
    world.set_emit_changes(true)?;

    // Tag every other entity.
    for id in ids.iter().step_by(2) {
        world.set_component(*id, "tag", json!(true))?;
    }

    let first = *ids.first().context("need at least one entity")?;
    let tagged = world.query("tag");
    info!(ids = ?tagged.ids(), "tagged view resolved");

    let mut views: Vec<View> = Vec::with_capacity(args.views);
    for _ in 1..args.views {
        views.push(world.entity(first)?.query("pos"));
    }
    views.insert(0, tagged);

    let writer = views[0].handle(first).context("first entity is tagged")?;
    for i in 0..args.writes {
        writer.set("pos", json!({ "x": i, "y": i * 2 }))?;
    }

    for view in &views {
        if let Some(handle) = view.handle(first) {
            info!(view = %view.id(), pos = ?handle.get("pos"), "read back");
        }
    }

    let instrumented = world.config().instrumentation == Instrumentation::On;
    info!(
        instrumented,
        changes = counts.change.get(),
        detected = counts.detected.get(),
        resolved = counts.resolved.get(),
        live_views = world.view_count(),
        "done"
    );
    Ok(())
}

#[derive(Default)]
struct Counts {
    change: Cell<usize>,
    detected: Cell<usize>,
    resolved: Cell<usize>,
}

fn subscribe_counters(world: &World) -> Rc<Counts> {
    let counts = Rc::new(Counts::default());

    let c = Rc::clone(&counts);
    world.on(CHANGE, move |payload| {
        c.change.set(c.change.get() + 1);
        info!(entity = ?payload, "change");
        Ok(())
    });
    let c = Rc::clone(&counts);
    world.on(CHANGE_DETECTED, move |_| {
        c.detected.set(c.detected.get() + 1);
        Ok(())
    });
    let c = Rc::clone(&counts);
    world.on(CHANGE_RESOLVED, move |_| {
        c.resolved.set(c.resolved.get() + 1);
        Ok(())
    });
    counts
}
