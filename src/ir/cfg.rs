// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Per-method control-flow graph, built once from a
//! [`Method`]'s statement list and reused by every intra-procedural
//! dataflow run against that method.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::ir::method::{Method, MethodId, StmtLoc};
use crate::ir::stmt::Stmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CfgEdgeKind {
    FallThrough,
    IfTrue,
    IfFalse,
    SwitchCase(i32),
    SwitchDefault,
    Goto,
}

/// Control-flow graph over one method's statement indices. Node `i`
/// corresponds to `stmts[i]`; edges follow branch/fallthrough semantics.
pub struct Cfg {
    pub method: MethodId,
    graph: DiGraph<u32, CfgEdgeKind>,
    nodes: Vec<NodeIndex>,
}

impl Cfg {
    pub fn build(method: &Method) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..method.stmts.len() as u32)
            .map(|i| graph.add_node(i))
            .collect();

        for (i, stmt) in method.stmts.iter().enumerate() {
            let i = i as u32;
            match stmt {
                Stmt::If { target, .. } => {
                    if let Some(&next) = nodes.get(i as usize + 1) {
                        graph.add_edge(nodes[i as usize], next, CfgEdgeKind::IfFalse);
                    }
                    graph.add_edge(nodes[i as usize], nodes[*target as usize], CfgEdgeKind::IfTrue);
                }
                Stmt::Goto { target } => {
                    graph.add_edge(nodes[i as usize], nodes[*target as usize], CfgEdgeKind::Goto);
                }
                Stmt::Switch { cases, default, .. } => {
                    for &(val, target) in cases {
                        graph.add_edge(
                            nodes[i as usize],
                            nodes[target as usize],
                            CfgEdgeKind::SwitchCase(val),
                        );
                    }
                    graph.add_edge(nodes[i as usize], nodes[*default as usize], CfgEdgeKind::SwitchDefault);
                }
                Stmt::Return(_) => {}
                _ => {
                    if let Some(&next) = nodes.get(i as usize + 1) {
                        graph.add_edge(nodes[i as usize], next, CfgEdgeKind::FallThrough);
                    }
                }
            }
        }

        Cfg { method: method.id, graph, nodes }
    }

    pub fn num_stmts(&self) -> usize {
        self.nodes.len()
    }

    pub fn entry(&self) -> StmtLoc {
        StmtLoc::new(self.method, 0)
    }

    pub fn successors(&self, index: u32) -> impl Iterator<Item = (u32, CfgEdgeKind)> + '_ {
        self.graph
            .edges_directed(self.nodes[index as usize], Direction::Outgoing)
            .map(|e| (self.graph[e.target()], *e.weight()))
    }

    pub fn predecessors(&self, index: u32) -> impl Iterator<Item = (u32, CfgEdgeKind)> + '_ {
        self.graph
            .edges_directed(self.nodes[index as usize], Direction::Incoming)
            .map(|e| (self.graph[e.source()], *e.weight()))
    }
}
