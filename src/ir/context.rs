// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context abstraction for context-sensitive points-to analysis. A
//! context is a bounded sequence of context elements, each
//! either the call site that pushed it (k-call-site sensitivity) or the
//! receiver object in scope at the time (k-object sensitivity). The
//! hybrid selector mixes both kinds in one sequence, truncating each
//! kind independently to its own depth.

use std::collections::HashMap;
use std::fmt;

use crate::ir::heap::ObjId;
use crate::ir::method::StmtLoc;
use crate::util::bit_vec::Idx;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CtxElem {
    CallSite(StmtLoc),
    Object(ObjId),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl Idx for ContextId {
    fn new(idx: usize) -> Self {
        ContextId(u32::new(idx))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ctx{}", self.0)
    }
}

/// Interns context element sequences so that structurally equal
/// contexts always collapse to the same `ContextId`, the same
/// "at-most-one instance" guarantee `CSManager` gives CS pointers and
/// objects.
#[derive(Default)]
pub struct ContextCache {
    contexts: Vec<Vec<CtxElem>>,
    index: HashMap<Vec<CtxElem>, ContextId>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elems(&self, id: ContextId) -> &[CtxElem] {
        &self.contexts[id.index()]
    }

    fn intern(&mut self, elems: Vec<CtxElem>) -> ContextId {
        if let Some(&id) = self.index.get(&elems) {
            return id;
        }
        let id = ContextId::new(self.contexts.len());
        self.index.insert(elems.clone(), id);
        self.contexts.push(elems);
        id
    }

    pub fn empty_context(&mut self) -> ContextId {
        self.intern(Vec::new())
    }

    /// Appends `elem` to `ctx`, keeping only the most recent `k`
    /// elements of `elem`'s kind (call-site or object), per k-limiting.
    pub fn extend(&mut self, ctx: ContextId, elem: CtxElem, k: usize) -> ContextId {
        if k == 0 {
            return ctx;
        }
        let mut elems: Vec<CtxElem> = self.elems(ctx).to_vec();
        elems.push(elem);
        let same_kind_count = elems.iter().rev().take_while(|e| same_kind(e, &elem)).count();
        if same_kind_count > k {
            let drop_at = elems.len() - same_kind_count;
            elems.remove(drop_at);
        }
        self.intern(elems)
    }
}

fn same_kind(a: &CtxElem, b: &CtxElem) -> bool {
    matches!(
        (a, b),
        (CtxElem::CallSite(_), CtxElem::CallSite(_)) | (CtxElem::Object(_), CtxElem::Object(_))
    )
}
