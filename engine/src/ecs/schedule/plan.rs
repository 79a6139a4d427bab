//! Kahn ordering of a stage's systems.
//!
//! Dependencies form a directed graph over system indices. [`sort`] linearizes it with a FIFO
//! queue seeded in registration order, so systems with no ordering constraint between them keep
//! the order they were added in. While emitting, every edge leaving an async system is recorded
//! on the receiving entry: those are the in-flight futures the entry has to wait for.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

/// The dependency graph of one stage, as adjacency bitsets.
#[derive(Debug, Clone)]
pub struct Graph {
    deps_in: Vec<FixedBitSet>,
    deps_out: Vec<FixedBitSet>,
}

impl Graph {
    /// A graph of `len` nodes and no edges.
    pub fn new(len: usize) -> Self {
        Self {
            deps_in: vec![FixedBitSet::with_capacity(len); len],
            deps_out: vec![FixedBitSet::with_capacity(len); len],
        }
    }

    /// Require `from` to run before `to`.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.deps_out[from].insert(to);
        self.deps_in[to].insert(from);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deps_in.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deps_in.is_empty()
    }
}

/// One emitted system invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Index of the system within its stage.
    pub system: usize,

    /// Positions, within the plan, of async entries that must finish before this one runs.
    pub deps_async: Vec<usize>,
}

/// The linear order of a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    entries: Vec<Entry>,
}

impl Plan {
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Linearize `graph`. On a cycle, returns the nodes that could not be emitted.
pub fn sort(mut graph: Graph, is_async: impl Fn(usize) -> bool) -> Result<Plan, Vec<usize>> {
    let len = graph.len();
    let mut queue: VecDeque<usize> = (0..len).filter(|n| graph.deps_in[*n].is_clear()).collect();
    let mut waiting: Vec<Vec<usize>> = vec![Vec::new(); len];
    let mut emitted = FixedBitSet::with_capacity(len);
    let mut entries = Vec::with_capacity(len);

    while let Some(node) = queue.pop_front() {
        let position = entries.len();
        entries.push(Entry {
            system: node,
            deps_async: std::mem::take(&mut waiting[node]),
        });
        emitted.insert(node);

        let targets: Vec<usize> = graph.deps_out[node].ones().collect();
        for target in targets {
            graph.deps_out[node].remove(target);
            graph.deps_in[target].remove(node);
            if is_async(node) {
                waiting[target].push(position);
            }
            if graph.deps_in[target].is_clear() {
                queue.push_back(target);
            }
        }
    }

    if entries.len() < len {
        return Err(emitted.zeroes().collect());
    }
    Ok(Plan { entries })
}
