//! System nodes.
//!
//! A system is a function run once per tick against a shared context `C`, with per-system
//! arguments `A`. Its identity is the Rust type of the function item or closure it was built
//! from, which is what dependencies refer to.

use std::{
    any::{TypeId, type_name},
    fmt,
    future::Future,
    pin::Pin,
};

use crate::ecs::{
    schedule::{
        error::SystemResult,
        stage::{self, Label},
    },
    util::short_name,
};

/// A boxed, `'static` future produced by an async system.
pub type SystemFuture = Pin<Box<dyn Future<Output = SystemResult> + Send + 'static>>;

/// How a system runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Runs to completion inline.
    Sync,
    /// Returns a future that is spawned and awaited only by its dependents.
    Async,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sync => f.write_str("sync"),
            Mode::Async => f.write_str("async"),
        }
    }
}

/// The result of calling a system.
pub(crate) enum Invocation {
    Done(SystemResult),
    Pending(SystemFuture),
}

type Run<C, A> = Box<dyn FnMut(&mut C, &A) -> Invocation + Send>;

/// A system ready to be added to a [`Scheduler`](super::Scheduler).
pub struct System<C, A = ()> {
    id: TypeId,
    name: &'static str,
    stage: stage::Id,
    stage_name: &'static str,
    mode: Mode,
    args: A,
    run: Run<C, A>,
}

impl<C: 'static, A: 'static> System<C, A> {
    /// A system that runs to completion when called.
    pub fn sync<L, F>(stage: L, f: F, args: A) -> Self
    where
        L: Label,
        F: FnMut(&mut C, &A) -> SystemResult + Send + 'static,
    {
        let mut f = f;
        Self::new::<L, F>(
            stage,
            Mode::Sync,
            args,
            Box::new(move |ctx, args| Invocation::Done(f(ctx, args))),
        )
    }

    /// A system that starts external work and returns a future for its completion.
    ///
    /// The call itself runs inline with exclusive access to the context. The returned future
    /// must not borrow it; results flow back through channels.
    pub fn asynchronous<L, F, Fut>(stage: L, f: F, args: A) -> Self
    where
        L: Label,
        F: FnMut(&mut C, &A) -> Fut + Send + 'static,
        Fut: Future<Output = SystemResult> + Send + 'static,
    {
        let mut f = f;
        Self::new::<L, F>(
            stage,
            Mode::Async,
            args,
            Box::new(move |ctx, args| Invocation::Pending(Box::pin(f(ctx, args)))),
        )
    }

    fn new<L: Label, F: 'static>(stage: L, mode: Mode, args: A, run: Run<C, A>) -> Self {
        Self {
            id: TypeId::of::<F>(),
            name: short_name(type_name::<F>()),
            stage: stage.id(),
            stage_name: L::name(),
            mode,
            args,
            run,
        }
    }
}

impl<C, A> System<C, A> {
    /// The identity of the function this system was built from.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn is_async(&self) -> bool {
        self.mode == Mode::Async
    }

    #[inline]
    pub fn args(&self) -> &A {
        &self.args
    }

    #[inline]
    pub(crate) fn stage(&self) -> (stage::Id, &'static str) {
        (self.stage, self.stage_name)
    }

    #[inline]
    pub(crate) fn invoke(&mut self, ctx: &mut C) -> Invocation {
        (self.run)(ctx, &self.args)
    }
}

/// One member of a [`Dependency`] chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Member {
    pub id: TypeId,
    pub name: &'static str,
}

/// An ordering constraint between systems of one stage: each member runs after the one before
/// it.
///
/// ```
/// use morph_engine::{define_stage, ecs::schedule::{Dependency, SystemResult}};
///
/// define_stage!(Update);
///
/// fn input(_: &mut (), _: &()) -> SystemResult { Ok(()) }
/// fn movement(_: &mut (), _: &()) -> SystemResult { Ok(()) }
///
/// let dependency = Dependency::new(Update).then(input).then(movement);
/// assert_eq!(dependency.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Dependency {
    stage: stage::Id,
    stage_name: &'static str,
    members: Vec<Member>,
    optional: bool,
}

impl Dependency {
    /// Start an empty chain in a stage.
    pub fn new<L: Label>(stage: L) -> Self {
        Self {
            stage: stage.id(),
            stage_name: L::name(),
            members: Vec::new(),
            optional: false,
        }
    }

    /// Append a system to the chain. Only the function's type is used.
    pub fn then<F: 'static>(mut self, _system: F) -> Self {
        self.members.push(Member {
            id: TypeId::of::<F>(),
            name: short_name(type_name::<F>()),
        });
        self
    }

    /// Members missing from the stage are skipped, and their neighbours chained directly,
    /// instead of failing the build.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline]
    pub(crate) fn stage(&self) -> (stage::Id, &'static str) {
        (self.stage, self.stage_name)
    }

    #[inline]
    pub(crate) fn members(&self) -> &[Member] {
        &self.members
    }
}
