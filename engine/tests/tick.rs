use std::time::Duration;

use morph_engine::{
    define_stage,
    ecs::{
        Entity, Error, Storage,
        component::Flags,
        schedule::{Dependency, Scheduler, System, SystemError, SystemFuture, SystemResult},
    },
};
use morph_macros::Component;
use tokio::sync::mpsc;

define_stage!(Fetch, Simulate);

#[derive(Component, Debug, Clone, PartialEq)]
struct Health(i32);

#[derive(Component, Debug, Clone, PartialEq)]
struct Damage(i32);

struct Game {
    storage: Storage,
    hits_tx: mpsc::UnboundedSender<i32>,
    hits_rx: mpsc::UnboundedReceiver<i32>,
    dead: Vec<Entity>,
}

impl Game {
    fn new() -> Self {
        let (hits_tx, hits_rx) = mpsc::unbounded_channel();
        Self {
            storage: Storage::new(),
            hits_tx,
            hits_rx,
            dead: Vec::new(),
        }
    }
}

/// Delivers one hit of `amount` after a short delay.
fn fetch_hits(game: &mut Game, amount: &i32) -> SystemFuture {
    let tx = game.hits_tx.clone();
    let amount = *amount;
    Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        tx.send(amount)
            .map_err(|err| SystemError::Failed(err.to_string()))
    })
}

fn apply_hits(game: &mut Game, _: &i32) -> SystemResult {
    let health = game.storage.register::<Health>();
    while let Ok(amount) = game.hits_rx.try_recv() {
        for entity in game.storage.query_entities(|s| s.has_component(health)) {
            game.storage.set_component(entity, Damage(amount))?;
        }
    }
    Ok(())
}

fn resolve_damage(game: &mut Game, _: &i32) -> SystemResult {
    let damage = game.storage.register::<Damage>();
    let hit = game
        .storage
        .query_entities(|s| s.has_component_flags(damage, Flags::UPDATED));
    for entity in hit {
        let amount = game.storage.require_component::<Damage>(entity)?.0;
        game.storage
            .update_component_with::<Health>(entity, |h| h.0 -= amount)?;
        game.storage.delete_component::<Damage>(entity)?;
    }
    Ok(())
}

fn reap(game: &mut Game, _: &i32) -> SystemResult {
    let health = game.storage.register::<Health>();
    for entity in game.storage.query_entities(|s| s.has_component(health)) {
        if game.storage.require_component::<Health>(entity)?.0 <= 0 {
            game.storage.destroy_entity(entity)?;
            game.dead.push(entity);
        }
    }
    Ok(())
}

fn scheduler() -> Scheduler<Game, i32> {
    let mut scheduler = Scheduler::new();
    scheduler.add_system(System::asynchronous(Fetch, fetch_hits, 4));
    scheduler.add_system(System::sync(Simulate, reap, 0));
    scheduler.add_system(System::sync(Simulate, resolve_damage, 0));
    scheduler.add_system(System::sync(Simulate, apply_hits, 0));
    scheduler.add_dependency(
        Dependency::new(Simulate)
            .then(apply_hits)
            .then(resolve_damage)
            .then(reap),
    );
    scheduler
}

#[tokio::test]
async fn ticks_apply_async_hits_and_reap() {
    // Given
    let mut game = Game::new();
    let weak = game.storage.create_entity(Health(5)).unwrap();
    let strong = game.storage.create_entity(Health(100)).unwrap();
    let mut scheduler = scheduler();
    scheduler.update().unwrap();
    game.storage.reset().unwrap();

    // When: two ticks of 4 damage each
    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(5), scheduler.execute_systems(&mut game))
            .await
            .expect("tick timed out")
            .unwrap();
        if game.dead.is_empty() {
            let health = game.storage.component_id::<Health>().unwrap();
            assert!(
                game.storage
                    .has_component_flags(weak, health, Flags::UPDATED)
                    .unwrap()
            );
        }
        game.storage.reset().unwrap();
    }

    // Then
    assert_eq!(game.dead, vec![weak]);
    assert_eq!(game.storage.has_component::<Health>(weak), Err(Error::EntityNotFound(weak)));
    assert_eq!(game.storage.get_component::<Health>(strong), Ok(Some(&Health(92))));
    assert_eq!(game.storage.has_component::<Damage>(strong), Ok(false));
    let health = game.storage.component_id::<Health>().unwrap();
    assert!(
        !game
            .storage
            .has_component_flags(strong, health, Flags::UPDATED)
            .unwrap()
    );
    assert_eq!(game.storage.len(), 1);
}

#[tokio::test]
async fn steady_state_ticks_stop_growing_storage() {
    // Given
    let mut game = Game::new();
    for i in 0..8 {
        game.storage.create_entity(Health(1_000 + i)).unwrap();
    }
    let mut scheduler = scheduler();
    scheduler.update().unwrap();

    // When
    scheduler.execute_systems(&mut game).await.unwrap();
    game.storage.reset().unwrap();
    scheduler.execute_systems(&mut game).await.unwrap();
    game.storage.reset().unwrap();
    let settled = game.storage.stats();
    for _ in 0..3 {
        scheduler.execute_systems(&mut game).await.unwrap();
        game.storage.reset().unwrap();
    }

    // Then
    let stats = game.storage.stats();
    assert_eq!(stats.states, settled.states);
    assert_eq!(stats.sets, settled.sets);
    assert_eq!(stats.tables, settled.tables);
    assert_eq!(stats.entities, 8);
    assert!(game.storage.sets().iter().all(|set| set.slots() == set.len()));
    assert!(game.storage.tables().iter().all(|table| table.rows() == table.len()));
}

#[tokio::test]
async fn storage_errors_fail_the_tick() {
    // Given
    fn poke_dead(game: &mut Game, _: &i32) -> SystemResult {
        let entity = game.storage.create_entity(Health(1))?;
        game.storage.destroy_entity(entity)?;
        game.storage.update_component::<Health>(entity)?;
        Ok(())
    }
    let mut scheduler: Scheduler<Game, i32> = Scheduler::new();
    scheduler.add_system(System::sync(Simulate, poke_dead, 0));
    scheduler.update().unwrap();
    let mut game = Game::new();

    // When
    let result = scheduler.execute_systems(&mut game).await;

    // Then
    assert!(matches!(
        result,
        Err(SystemError::Storage(Error::EntityNotFound(_)))
    ));
}
