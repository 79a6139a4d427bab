//! An in-process entity/component runtime.
//!
//! The [`ecs::storage`] module groups entities by their current component shape, tracks the
//! per-tick change state of every component, and answers shape-filtered queries. The
//! [`ecs::schedule`] module orders update functions under declared dependencies and executes
//! them against that storage, mixing synchronous and asynchronous systems in one cooperative
//! control flow.

// Allows `#[derive(Component)]` to refer to `::morph_engine` from inside this crate.
extern crate self as morph_engine;

pub mod core;
pub mod ecs;
