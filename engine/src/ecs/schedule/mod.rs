//! Ordering and running systems.
//!
//! A [`Scheduler`] groups [`System`]s into stages identified by [`Label`] types. Within a stage,
//! [`Dependency`] chains declare which systems must run before which; [`Scheduler::update`]
//! resolves them and builds a linear order per stage with Kahn's algorithm, and
//! [`Scheduler::execute_systems`] runs every stage in the order its label was first used.
//!
//! ```text
//! Scheduler
//!   ├── Stage "Input"  ─► [read_keys, poll_network*]
//!   ├── Stage "Update" ─► [movement, collide, apply_network ◄── poll_network*]
//!   └── Stage "Render" ─► [draw]
//!                                   * async
//! ```
//!
//! # Sync and async systems
//!
//! Every system is called inline, one at a time, with exclusive access to the context. A sync
//! system does all its work in that call. An async system starts some external work and returns
//! a `'static` future for it; the future is spawned on the ambient tokio runtime and the
//! scheduler moves straight on. Only systems that declared a dependency on the async system
//! wait for its future before running. Independent systems keep going, so the order is a
//! partial one with soft barriers:
//!
//! ```text
//! seq [a, b*, c]   d independent
//!
//! a ──► b* ─ spawn ─────────────┐
//!        d ──► (runs meanwhile)  ▼
//!                         await b* ──► c
//! ```
//!
//! Once a future has been awaited it is remembered as finished, so every later dependent sees it
//! done. Futures nobody waited for are awaited when their stage ends, so their errors surface in
//! the same tick.
//!
//! # Example
//!
//! ```
//! use morph_engine::{define_stage, ecs::schedule::{Dependency, Scheduler, System, SystemResult}};
//!
//! define_stage!(Update);
//!
//! fn first(log: &mut Vec<&'static str>, _: &()) -> SystemResult {
//!     log.push("first");
//!     Ok(())
//! }
//!
//! fn second(log: &mut Vec<&'static str>, _: &()) -> SystemResult {
//!     log.push("second");
//!     Ok(())
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut scheduler = Scheduler::new();
//! scheduler.add_system(System::sync(Update, second, ()));
//! scheduler.add_system(System::sync(Update, first, ()));
//! scheduler.add_dependency(Dependency::new(Update).then(first).then(second));
//! scheduler.update().unwrap();
//!
//! let mut log = Vec::new();
//! scheduler.execute_systems(&mut log).await.unwrap();
//! assert_eq!(log, vec!["first", "second"]);
//! # });
//! ```

use std::fmt;

use log::{debug, error, warn};
use tokio::task::JoinHandle;

mod error;
pub mod plan;
mod stage;
mod system;

pub use error::{Error, SystemError, SystemResult};
pub use stage::{Id, Label};
pub use system::{Dependency, Mode, System, SystemFuture};

use plan::{Graph, Plan};
use system::Invocation;

/// The state of an async entry's future during a stage run.
enum Flight {
    /// Not started, or a sync entry.
    Idle,
    Running(JoinHandle<SystemResult>),
    Finished,
}

impl Flight {
    /// Wait for the future, if one is running. Later calls return immediately.
    async fn land(&mut self) -> SystemResult {
        if let Flight::Running(handle) = self {
            let result = handle.await;
            *self = Flight::Finished;
            result??;
        }
        Ok(())
    }
}

/// The systems, dependencies and built order of one stage.
struct Stage<C, A> {
    id: Id,
    name: &'static str,
    systems: Vec<System<C, A>>,
    dependencies: Vec<Dependency>,
    plan: Option<Plan>,
}

impl<C, A> Stage<C, A> {
    fn new(id: Id, name: &'static str) -> Self {
        Self {
            id,
            name,
            systems: Vec::new(),
            dependencies: Vec::new(),
            plan: None,
        }
    }

    /// Resolve every dependency and sort. Nothing is modified.
    fn build(&self) -> Result<Plan, Vec<Error>> {
        let mut graph = Graph::new(self.systems.len());
        let mut errors = Vec::new();

        for dependency in &self.dependencies {
            let mut chain = Vec::with_capacity(dependency.len());
            let mut resolved = true;
            for member in dependency.members() {
                let matches: Vec<usize> = self
                    .systems
                    .iter()
                    .enumerate()
                    .filter(|(_, system)| system.id() == member.id)
                    .map(|(index, _)| index)
                    .collect();
                match matches.as_slice() {
                    [index] => chain.push(*index),
                    [] if dependency.is_optional() => {
                        debug!(
                            "Stage {}: skipping optional dependency on {}",
                            self.name, member.name
                        );
                    }
                    [] => {
                        resolved = false;
                        errors.push(Error::MissingDependency {
                            stage: self.name,
                            system: member.name,
                        });
                    }
                    _ => {
                        resolved = false;
                        errors.push(Error::AmbiguousDependency {
                            stage: self.name,
                            system: member.name,
                            matches: matches.len(),
                        });
                    }
                }
            }
            if resolved {
                for pair in chain.windows(2) {
                    graph.add_edge(pair[0], pair[1]);
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        plan::sort(graph, |index| self.systems[index].is_async()).map_err(|stuck| {
            vec![Error::CyclicDependency {
                stage: self.name,
                systems: stuck.iter().map(|i| self.systems[*i].name()).collect(),
            }]
        })
    }

    async fn execute(&mut self, ctx: &mut C) -> SystemResult {
        let Some(plan) = &self.plan else {
            warn!("Stage {} has not been built, skipping", self.name);
            return Ok(());
        };

        let mut flights: Vec<Flight> = plan.entries().iter().map(|_| Flight::Idle).collect();
        for (position, entry) in plan.entries().iter().enumerate() {
            for dep in &entry.deps_async {
                flights[*dep].land().await?;
            }
            match self.systems[entry.system].invoke(ctx) {
                Invocation::Done(result) => result?,
                Invocation::Pending(future) => {
                    flights[position] = Flight::Running(tokio::spawn(future));
                }
            }
        }

        for flight in flights.iter_mut() {
            flight.land().await?;
        }
        Ok(())
    }
}

/// Orders and runs systems over a context `C`. Each system carries arguments of type `A`.
pub struct Scheduler<C, A = ()> {
    stages: Vec<Stage<C, A>>,
}

impl<C, A> Default for Scheduler<C, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A> Scheduler<C, A> {
    /// Creates a new empty scheduler.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a system to its stage, creating the stage if this is its first use. The stage order
    /// is not rebuilt until [`update`](Self::update).
    pub fn add_system(&mut self, system: System<C, A>) {
        let (id, name) = system.stage();
        self.get_or_create_stage(id, name).systems.push(system);
    }

    /// Add an ordering constraint, creating its stage if this is its first use.
    pub fn add_dependency(&mut self, dependency: Dependency) {
        let (id, name) = dependency.stage();
        self.get_or_create_stage(id, name)
            .dependencies
            .push(dependency);
    }

    /// Rebuild the order of every stage.
    ///
    /// If any stage fails to build, every error is logged and returned and no stage changes:
    /// the previous orders stay in effect.
    pub fn update(&mut self) -> Result<(), Vec<Error>> {
        let mut plans = Vec::with_capacity(self.stages.len());
        let mut errors = Vec::new();
        for stage in &self.stages {
            match stage.build() {
                Ok(plan) => plans.push(plan),
                Err(mut stage_errors) => errors.append(&mut stage_errors),
            }
        }

        if !errors.is_empty() {
            for err in &errors {
                error!("{err}");
            }
            return Err(errors);
        }

        for (stage, plan) in self.stages.iter_mut().zip(plans) {
            debug!("Built stage {} with {} systems", stage.name, plan.len());
            stage.plan = Some(plan);
        }
        Ok(())
    }

    /// Run every stage once, in first-use order.
    ///
    /// The first failing system stops the tick. Must be called within a tokio runtime.
    pub async fn execute_systems(&mut self, ctx: &mut C) -> SystemResult {
        for stage in self.stages.iter_mut() {
            stage.execute(ctx).await?;
        }
        Ok(())
    }

    /// Run a single stage. Returns `false` if the stage has never been used.
    pub async fn execute_stage<L: Label>(
        &mut self,
        label: L,
        ctx: &mut C,
    ) -> Result<bool, SystemError> {
        let id = label.id();
        match self.stages.iter_mut().find(|stage| stage.id == id) {
            Some(stage) => {
                stage.execute(ctx).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns `true` if a system or dependency has been added to the stage.
    pub fn has_stage<L: Label>(&self, label: L) -> bool {
        let id = label.id();
        self.stages.iter().any(|stage| stage.id == id)
    }

    /// Returns the number of stages in the scheduler.
    #[inline]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the number of systems across all stages.
    pub fn system_count(&self) -> usize {
        self.stages.iter().map(|stage| stage.systems.len()).sum()
    }

    fn get_or_create_stage(&mut self, id: Id, name: &'static str) -> &mut Stage<C, A> {
        let index = match self.stages.iter().position(|stage| stage.id == id) {
            Some(index) => index,
            None => {
                self.stages.push(Stage::new(id, name));
                self.stages.len() - 1
            }
        };
        &mut self.stages[index]
    }
}

impl<C, A> fmt::Display for Scheduler<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in &self.stages {
            writeln!(f, "{}:", stage.name)?;
            let Some(plan) = &stage.plan else {
                writeln!(f, "  (not built)")?;
                continue;
            };
            for (position, entry) in plan.entries().iter().enumerate() {
                let system = &stage.systems[entry.system];
                write!(f, "  {position}: {} [{}]", system.name(), system.mode())?;
                if !entry.deps_async.is_empty() {
                    let waits: Vec<&str> = entry
                        .deps_async
                        .iter()
                        .map(|dep| stage.systems[plan.entries()[*dep].system].name())
                        .collect();
                    write!(f, " after {}", waits.join(", "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
