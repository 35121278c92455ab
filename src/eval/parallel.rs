//! Fork-join evaluation over cached ancestor orders.
//!
//! The engines here walk the same orders as the sequential passes but spawn
//! entries onto the rayon pool in waves. A wave never contains an entry
//! together with one of its producers or consumers, and every wave joins
//! before the next begins, so payload access stays exclusive without locks.
//! The `&mut self` receivers keep graph mutators out for the whole pass.
//!
//! # Synchronization
//!
//! Version and cursor cells are relaxed atomics. The join at each wave
//! boundary is the only ordering the engines rely on: everything written
//! during a wave is visible to every entry of the next one. Structural
//! errors raised by in-flight entries are collected under a mutex and the
//! first one is returned after the join.

use hashbrown::HashSet;
use parking_lot::Mutex;

use crate::error::GraphError;
use crate::eval::{ParentView, parent_views, persist_cursors};
use crate::graph::bounds::{NodeKey, PayloadLike};
use crate::graph::store::DepGraph;

impl<K, T> DepGraph<K, T>
where
    K: NodeKey + Send + Sync,
    T: PayloadLike + Send + Sync,
{
    /// Parallel [`DepGraph::evaluate`]: invokes `callback` on the rayon pool
    /// for every entry of `target`'s evaluation order with at least one
    /// stale producer, bumping each fired entry's version.
    ///
    /// Cursors are not persisted, so a later pass re-fires the same entries.
    /// Entries linked by an edge never run concurrently. A root target is a
    /// no-op.
    pub fn evaluate_mt<F>(&mut self, target: K, callback: F) -> Result<(), GraphError>
    where
        F: Fn(K, &mut T, &[ParentView<K, T>]) + Send + Sync,
    {
        run_target(&*self, target, false, &callback)
    }

    /// Parallel [`DepGraph::clean`]: like [`DepGraph::evaluate_mt`], but
    /// marks each fired entry caught up to all of its producers before
    /// invoking `callback`, so a write-free second pass invokes nothing.
    pub fn clean_mt<F>(&mut self, target: K, callback: F) -> Result<(), GraphError>
    where
        F: Fn(K, &mut T, &[ParentView<K, T>]) + Send + Sync,
    {
        run_target(&*self, target, true, &callback)
    }

    /// Cleans a batch of targets, driving the provably independent ones
    /// concurrently and the rest sequentially afterwards, in slice order.
    ///
    /// Classification comes from [`DepGraph::independent_graphs`]. A missing
    /// target fails the whole batch before any callback runs; structural
    /// errors found mid-run surface after the in-flight entries join, so
    /// entries already spawned may have fired.
    pub fn clean_many_mt<F>(&mut self, targets: &[K], callback: F) -> Result<(), GraphError>
    where
        F: Fn(K, &mut T, &[ParentView<K, T>]) + Send + Sync,
    {
        let split = self.independent_graphs(targets)?;
        let graph: &Self = &*self;
        let failures: Mutex<Vec<GraphError>> = Mutex::new(Vec::new());
        rayon::scope(|scope| {
            for &target in &split.independent {
                let failures = &failures;
                let callback = &callback;
                scope.spawn(move |_| {
                    if let Err(e) = run_target(graph, target, true, callback) {
                        failures.lock().push(e);
                    }
                });
            }
        });
        if let Some(e) = first_failure(&failures) {
            return Err(e);
        }
        for &target in &split.dependent {
            run_target(graph, target, true, &callback)?;
        }
        Ok(())
    }
}

/// Drives one target: fetch (or build) its order, then fire it in waves.
fn run_target<K, T, F>(
    graph: &DepGraph<K, T>,
    target: K,
    persist: bool,
    callback: &F,
) -> Result<(), GraphError>
where
    K: NodeKey + Send + Sync,
    T: PayloadLike + Send + Sync,
    F: Fn(K, &mut T, &[ParentView<K, T>]) + Send + Sync,
{
    if graph.node(target)?.is_root() {
        return Ok(());
    }
    let order = graph.evaluation_graph(target)?;
    run_waves(graph, order, persist, callback)
}

/// Splits `order` into waves of mutually unrelated entries and joins each
/// wave before accumulating the next.
fn run_waves<K, T, F>(
    graph: &DepGraph<K, T>,
    order: &[K],
    persist: bool,
    callback: &F,
) -> Result<(), GraphError>
where
    K: NodeKey + Send + Sync,
    T: PayloadLike + Send + Sync,
    F: Fn(K, &mut T, &[ParentView<K, T>]) + Send + Sync,
{
    let failures: Mutex<Vec<GraphError>> = Mutex::new(Vec::new());
    let mut wave: Vec<K> = Vec::new();
    // Entries the current wave writes, and parent ids it reads.
    let mut writes: HashSet<K> = HashSet::new();
    let mut reads: HashSet<K> = HashSet::new();
    for &entry in order {
        let node = match graph.node(entry) {
            Ok(node) => node,
            // A cached order can outlive one of its nodes. Flush what is
            // already accumulated, then report the dangling id.
            Err(lookup) => {
                flush_wave(graph, &mut wave, persist, callback, &failures);
                return Err(first_failure(&failures).unwrap_or(lookup));
            }
        };
        if node.is_root() {
            continue;
        }
        // An entry may not share a wave with its producers or consumers.
        // The `reads` test never fires on a fresh order; a stale cached
        // order can place an entry ahead of one of its producers.
        let overlaps = reads.contains(&entry)
            || node.parents.iter().any(|parent| writes.contains(parent));
        if overlaps {
            flush_wave(graph, &mut wave, persist, callback, &failures);
            if let Some(e) = first_failure(&failures) {
                return Err(e);
            }
            writes.clear();
            reads.clear();
        }
        writes.insert(entry);
        reads.extend(node.parents.iter().copied());
        wave.push(entry);
    }
    flush_wave(graph, &mut wave, persist, callback, &failures);
    match first_failure(&failures) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Spawns every accumulated entry onto the pool and joins them.
fn flush_wave<K, T, F>(
    graph: &DepGraph<K, T>,
    wave: &mut Vec<K>,
    persist: bool,
    callback: &F,
    failures: &Mutex<Vec<GraphError>>,
) where
    K: NodeKey + Send + Sync,
    T: PayloadLike + Send + Sync,
    F: Fn(K, &mut T, &[ParentView<K, T>]) + Send + Sync,
{
    if wave.is_empty() {
        return;
    }
    rayon::scope(|scope| {
        for &entry in wave.iter() {
            scope.spawn(move |_| {
                if let Err(e) = exec_entry(graph, entry, persist, callback) {
                    failures.lock().push(e);
                }
            });
        }
    });
    wave.clear();
}

/// The per-entry body: gather producer snapshots, skip settled entries,
/// fire the callback, bump the entry's version.
fn exec_entry<K, T, F>(
    graph: &DepGraph<K, T>,
    entry: K,
    persist: bool,
    callback: &F,
) -> Result<(), GraphError>
where
    K: NodeKey + Send + Sync,
    T: PayloadLike + Send + Sync,
    F: Fn(K, &mut T, &[ParentView<K, T>]) + Send + Sync,
{
    let node = graph.node(entry)?;
    let views = parent_views(graph, entry, node)?;
    if !views.iter().any(|v| v.stale) {
        return Ok(());
    }
    if persist {
        persist_cursors(graph, entry, node)?;
    }
    // SAFETY: wave scheduling keeps `entry`'s producers and consumers out
    // of its wave, `entry` itself appears at most once per pass, and the
    // `&mut self` entry points keep mutators and other passes out. No one
    // else touches this payload until the wave joins.
    let payload = unsafe { &mut *node.payload.get() };
    callback(entry, payload, &views);
    node.bump_version(entry);
    Ok(())
}

fn first_failure(failures: &Mutex<Vec<GraphError>>) -> Option<GraphError> {
    failures.lock().first().cloned()
}
