// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The on-the-fly call graph every points-to solver builds as it
//! discovers reachable code. Generic over the
//! call-graph node type so the same structure serves both the
//! context-insensitive graph (nodes are bare [`MethodId`]s) and the
//! context-sensitive graph (nodes are `(Context, MethodId)` pairs).

use std::collections::HashMap;
use std::hash::Hash;

use crate::ir::method::{MethodId, StmtLoc};
use crate::util::chunked_queue::ChunkedQueue;

/// A call-graph node: something that can be asked which method it runs.
pub trait CallGraphNode: Copy + Eq + Hash + 'static {
    fn method(&self) -> MethodId;
}

impl CallGraphNode for MethodId {
    fn method(&self) -> MethodId {
        *self
    }
}

/// How a call-graph edge's callee(s) were resolved, per spec §3's edge
/// triple `(kind, callSite, callee)`. A single call site resolves under
/// exactly one kind, shared by every callee it reaches.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CallEdgeKind {
    Static,
    Special,
    Virtual,
    Interface,
    Dynamic,
    Other,
}

/// Call graph over nodes of type `N`, built incrementally as the owning
/// solver discovers reachability. `N = MethodId` for CHA and the
/// context-insensitive solver; `N = (Context, MethodId)` for the
/// context-sensitive solver.
pub struct CallGraph<N: CallGraphNode> {
    reachable: ChunkedQueue<N>,
    reachable_set: std::collections::HashSet<N>,
    /// Edges out of a call site, keyed by the call site's location (the
    /// caller's identity is implied: `StmtLoc::method` plus whichever
    /// context the caller node carried, tracked by the solver itself).
    edges: HashMap<StmtLoc, (CallEdgeKind, Vec<N>)>,
}

impl<N: CallGraphNode> Default for CallGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: CallGraphNode> CallGraph<N> {
    pub fn new() -> Self {
        CallGraph { reachable: ChunkedQueue::new(), reachable_set: Default::default(), edges: HashMap::new() }
    }

    /// Adds `node` to the reachable set. Returns `true` if it was not
    /// already known, i.e. the caller should process it.
    pub fn add_reachable(&mut self, node: N) -> bool {
        if self.reachable_set.insert(node) {
            self.reachable.push(node);
            true
        } else {
            false
        }
    }

    /// Adds a call edge from `site` to `target`, resolved under `kind`.
    /// Returns `true` if this edge is new.
    pub fn add_edge(&mut self, site: StmtLoc, kind: CallEdgeKind, target: N) -> bool {
        let (_, targets) = self.edges.entry(site).or_insert_with(|| (kind, Vec::new()));
        if targets.contains(&target) {
            false
        } else {
            targets.push(target);
            true
        }
    }

    pub fn callees_at(&self, site: StmtLoc) -> &[N] {
        self.edges.get(&site).map(|(_, targets)| targets.as_slice()).unwrap_or(&[])
    }

    pub fn edge_kind_at(&self, site: StmtLoc) -> Option<CallEdgeKind> {
        self.edges.get(&site).map(|(kind, _)| *kind)
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        let mut seen = std::collections::HashSet::new();
        self.reachable.iter().filter_map(move |n| {
            let m = n.method();
            seen.insert(m).then_some(m)
        })
    }

    pub fn reachable_nodes(&self) -> impl Iterator<Item = &N> {
        self.reachable.iter()
    }

    pub fn num_reachable(&self) -> usize {
        self.reachable.len()
    }
}
