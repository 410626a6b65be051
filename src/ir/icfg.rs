// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Interprocedural control-flow graph: each method's CFG
//! stitched to its callees' CFGs through call/call-to-return/return
//! edges, the graph the interprocedural constant-propagation pass walks.

use std::collections::HashMap;

use crate::graph::call_graph::CallGraph;
use crate::ir::cfg::Cfg;
use crate::ir::method::{MethodId, Program, StmtLoc};
use crate::ir::stmt::Stmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum IcfgEdgeKind {
    /// An ordinary intraprocedural edge, carried over from the CFG.
    Normal,
    /// From a call site to the entry of (one of) its callee(s).
    Call,
    /// From a call site directly to its own successor, modeling the
    /// "skip the call" path used to propagate facts that aren't
    /// affected by the callee (the call-to-return edge).
    CallToReturn,
    /// From a callee's return statement back to the call site's
    /// successor.
    Return,
}

/// Per-method CFGs plus the call/return stitching between them. Built
/// once from a completed call graph and reused by the interprocedural
/// solver.
pub struct Icfg {
    cfgs: HashMap<MethodId, Cfg>,
}

impl Icfg {
    pub fn build(program: &Program, call_graph: &CallGraph<MethodId>) -> Self {
        let mut cfgs = HashMap::new();
        for method in call_graph.reachable_methods() {
            let m = program.method(method);
            if !m.is_abstract && !m.is_external {
                cfgs.insert(method, Cfg::build(m));
            }
        }
        Icfg { cfgs }
    }

    pub fn cfg(&self, method: MethodId) -> Option<&Cfg> {
        self.cfgs.get(&method)
    }

    /// Call sites within `method`, paired with the statement's callees
    /// as resolved by the call graph.
    pub fn call_sites<'a>(
        &'a self,
        program: &'a Program,
        call_graph: &'a CallGraph<MethodId>,
        method: MethodId,
    ) -> impl Iterator<Item = (StmtLoc, Vec<MethodId>)> + 'a {
        let m = program.method(method);
        m.stmts.iter().enumerate().filter_map(move |(i, stmt)| {
            if stmt.call().is_some() {
                let loc = StmtLoc::new(method, i as u32);
                Some((loc, call_graph.callees_at(loc).to_vec()))
            } else {
                None
            }
        })
    }

    /// The successor statement of a call site, i.e. where control
    /// returns to once the call(s) complete. `None` if the call is the
    /// method's last statement (falls through to nothing, e.g. a call
    /// immediately followed by an implicit return).
    pub fn return_site(&self, program: &Program, loc: StmtLoc) -> Option<StmtLoc> {
        let m = program.method(loc.method);
        let next = loc.index + 1;
        if (next as usize) < m.stmts.len() {
            Some(StmtLoc::new(loc.method, next))
        } else {
            None
        }
    }

    pub fn entry(&self, method: MethodId) -> StmtLoc {
        StmtLoc::new(method, 0)
    }

    /// Every `Return` statement in `method`.
    pub fn exits<'a>(&'a self, program: &'a Program, method: MethodId) -> impl Iterator<Item = StmtLoc> + 'a {
        let m = program.method(method);
        m.stmts.iter().enumerate().filter_map(move |(i, stmt)| {
            matches!(stmt, Stmt::Return(_)).then(|| StmtLoc::new(method, i as u32))
        })
    }
}
