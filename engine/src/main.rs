use std::{error::Error, time::Duration};

use log::{LevelFilter, info};
use morph_engine::{
    core::log::init_channel,
    define_stage,
    ecs::{
        Storage,
        schedule::{Dependency, Scheduler, System, SystemError, SystemFuture, SystemResult},
        storage::graph,
    },
};
use morph_macros::Component;
use tokio::sync::mpsc;

define_stage!(Input, Update);

#[derive(Component, Debug)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component, Debug)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Component, Debug)]
struct Signal(u32);

struct Demo {
    storage: Storage,
    tick: u32,
    signals_tx: mpsc::UnboundedSender<u32>,
    signals_rx: mpsc::UnboundedReceiver<u32>,
}

/// Pretend to poll something slow; the reading arrives over a channel.
fn poll_signal(demo: &mut Demo, delay: &Duration) -> SystemFuture {
    let tx = demo.signals_tx.clone();
    let tick = demo.tick;
    let delay = *delay;
    Box::pin(async move {
        tokio::time::sleep(delay).await;
        tx.send(tick)
            .map_err(|err| SystemError::Failed(err.to_string()))
    })
}

fn movement(demo: &mut Demo, _: &Duration) -> SystemResult {
    let position = demo.storage.register::<Position>();
    let velocity = demo.storage.register::<Velocity>();
    let moving = demo
        .storage
        .query_entities(|state| state.has_component(position) && state.has_component(velocity));
    for entity in moving {
        let (dx, dy) = {
            let v = demo.storage.require_component::<Velocity>(entity)?;
            (v.dx, v.dy)
        };
        demo.storage
            .update_component_with::<Position>(entity, |p| {
                p.x += dx;
                p.y += dy;
            })?;
    }
    Ok(())
}

fn apply_signal(demo: &mut Demo, _: &Duration) -> SystemResult {
    let position = demo.storage.register::<Position>();
    while let Ok(reading) = demo.signals_rx.try_recv() {
        for entity in demo.storage.query_entities(|state| state.has_component(position)) {
            demo.storage.set_component(entity, Signal(reading))?;
        }
    }
    Ok(())
}

fn cull(demo: &mut Demo, _: &Duration) -> SystemResult {
    let position = demo.storage.register::<Position>();
    for entity in demo.storage.query_entities(|state| state.has_component(position)) {
        let x = demo.storage.require_component::<Position>(entity)?.x;
        if x > 2.5 {
            let signal = demo.storage.find_component::<Signal>(entity).map(|s| s.0);
            info!("Culling {entity} at x = {x}, last signal {signal:?}");
            demo.storage.destroy_entity(entity)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let logs = init_channel(LevelFilter::Debug)?;

    let (signals_tx, signals_rx) = mpsc::unbounded_channel();
    let mut demo = Demo {
        storage: Storage::new(),
        tick: 0,
        signals_tx,
        signals_rx,
    };
    demo.storage
        .create_entity((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.5 }))?;
    demo.storage.create_entity(Position { x: 1.0, y: 1.0 })?;

    let delay = Duration::from_millis(5);
    let mut scheduler = Scheduler::new();
    scheduler.add_system(System::asynchronous(Input, poll_signal, delay));
    scheduler.add_system(System::sync(Update, movement, delay));
    scheduler.add_system(System::sync(Update, apply_signal, delay));
    scheduler.add_system(System::sync(Update, cull, delay));
    scheduler.add_dependency(Dependency::new(Update).then(movement).then(cull));
    if let Err(errors) = scheduler.update() {
        let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(errors.join("; ").into());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        for tick in 0..4 {
            demo.tick = tick;
            scheduler.execute_systems(&mut demo).await?;
            info!("Tick {tick}: {:?}", demo.storage.stats());
            demo.storage.reset()?;
        }
        Ok::<_, SystemError>(())
    })?;

    println!("{scheduler}");
    println!("{}", graph::to_dot(&demo.storage));
    for message in logs.try_iter() {
        println!("[{:<5} {}] {}", message.level, message.target, message.message);
    }
    Ok(())
}
