//! Entity/component storage and system scheduling.
//!
//! - [`storage`]: the [`Storage`] facade, its state graph, sets and tables.
//! - [`query`]: shape-filtered iteration over storage.
//! - [`schedule`]: the [`Scheduler`] running sync and async systems in dependency order.
//! - [`component`] and [`entity`]: identifiers, flags and registries shared by the above.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod schedule;
pub mod storage;
pub(crate) mod util;

pub use component::Component;
pub use entity::Entity;
pub use error::{Error, Result};
pub use schedule::Scheduler;
pub use storage::Storage;
