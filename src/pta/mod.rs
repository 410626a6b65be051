// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Andersen-style points-to analysis, co-computing a
//! pointer-flow graph and an on-the-fly call graph. `andersen` is the
//! context-insensitive variant; `context_sensitive` refines it with a
//! pluggable [`context_selector::ContextSelector`].

pub mod andersen;
pub mod context_selector;
pub mod context_sensitive;
pub mod cs_manager;

use crate::graph::call_graph::{CallGraph, CallGraphNode};
use crate::ir::heap::ObjId;
use crate::ir::method::VarId;
use crate::pts_set::points_to::HybridPointsToSet;

/// Common surface both the CI and CS solvers expose once they've run to
/// a fixpoint: a variable's points-to set, collapsed to plain `ObjId`s
/// (a CS result collapses away context), and the call graph discovered
/// along the way. The call graph's node type differs between the two
/// solvers (bare `MethodId` for CI, `(Context, MethodId)` for CS), so
/// it is an associated type rather than fixed in the trait.
pub trait PointerAnalysisResult {
    type Node: CallGraphNode;

    fn pts_of_var(&self, var: VarId) -> HybridPointsToSet<ObjId>;
    fn call_graph(&self) -> &CallGraph<Self::Node>;
}
