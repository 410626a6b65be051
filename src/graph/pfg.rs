// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The pointer-flow graph: nodes are pointers (local
//! variables or instance/static/array "fields"), edges carry points-to
//! sets from one pointer to another. Both the context-insensitive and
//! context-sensitive solvers share this shape, parameterized over the
//! pointer node type (`Pointer` for CI, `CSPointer` for CS).

use std::collections::HashMap;
use std::hash::Hash;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::ir::class_hierarchy::ClassId;
use crate::ir::method::VarId;
use crate::ir::stmt::FieldId;

/// A context-insensitive pointer: something that can hold a points-to
/// set in the CI solver.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Pointer {
    Var(VarId),
    /// An instance field slot on a specific abstract object.
    InstanceField(crate::ir::heap::ObjId, FieldId),
    StaticField(ClassId, FieldId),
    /// All array elements of a given abstract object are collapsed to a
    /// single pointer, the standard field-insensitive array model.
    ArrayElem(crate::ir::heap::ObjId),
}

/// Why a PFG edge exists; only used for diagnostics/statistics, never
/// branched on during propagation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PfgEdgeKind {
    /// Direct assignment, e.g. `a = b`.
    Assign,
    /// Load from a field/array into a variable.
    Load,
    /// Store from a variable into a field/array.
    Store,
}

/// Pointer-flow graph over pointer nodes `P`. Edges mean "points-to
/// facts added to the source propagate to the target."
pub struct PointerFlowGraph<P: Copy + Eq + Hash> {
    graph: DiGraph<P, PfgEdgeKind>,
    index: HashMap<P, NodeIndex>,
}

impl<P: Copy + Eq + Hash> Default for PointerFlowGraph<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy + Eq + Hash> PointerFlowGraph<P> {
    pub fn new() -> Self {
        PointerFlowGraph { graph: DiGraph::new(), index: HashMap::new() }
    }

    pub fn node(&mut self, pointer: P) -> NodeIndex {
        *self.index.entry(pointer).or_insert_with(|| self.graph.add_node(pointer))
    }

    /// Adds an edge `from -> to`. Returns `true` if the edge is new.
    pub fn add_edge(&mut self, from: P, to: P, kind: PfgEdgeKind) -> bool {
        let from_idx = self.node(from);
        let to_idx = self.node(to);
        if self.graph.edges_connecting(from_idx, to_idx).any(|e| *e.weight() == kind) {
            return false;
        }
        self.graph.add_edge(from_idx, to_idx, kind);
        true
    }

    pub fn successors(&self, pointer: P) -> impl Iterator<Item = P> + '_ {
        let idx = self.index.get(&pointer).copied();
        idx.into_iter().flat_map(move |idx| {
            self.graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| self.graph[e.target()])
        })
    }

    pub fn pointers(&self) -> impl Iterator<Item = P> + '_ {
        self.graph.node_indices().map(|i| self.graph[i])
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }
}
