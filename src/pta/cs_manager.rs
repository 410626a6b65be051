// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Interns context-qualified variables and objects so the
//! context-sensitive solver works over small integer handles instead of
//! repeatedly hashing `(Context, base)` pairs, and so two occurrences of
//! the same `(context, base)` always collapse to the same handle.

use std::collections::HashMap;
use std::fmt;

use crate::ir::context::ContextId;
use crate::ir::heap::ObjId;
use crate::ir::method::VarId;
use crate::util::bit_vec::Idx;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CSVarId(u32);

impl Idx for CSVarId {
    fn new(idx: usize) -> Self {
        CSVarId(u32::new(idx))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CSVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSV{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CSObjId(u32);

impl Idx for CSObjId {
    fn new(idx: usize) -> Self {
        CSObjId(u32::new(idx))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CSObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSO{}", self.0)
    }
}

/// Guarantees at most one `CSVarId`/`CSObjId` per `(context, base)` pair.
#[derive(Default)]
pub struct CSManager {
    vars: Vec<(ContextId, VarId)>,
    var_index: HashMap<(ContextId, VarId), CSVarId>,
    by_base_var: HashMap<VarId, Vec<CSVarId>>,
    objs: Vec<(ContextId, ObjId)>,
    obj_index: HashMap<(ContextId, ObjId), CSObjId>,
}

impl CSManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cs_var(&mut self, ctx: ContextId, var: VarId) -> CSVarId {
        if let Some(&id) = self.var_index.get(&(ctx, var)) {
            return id;
        }
        let id = CSVarId::new(self.vars.len());
        self.vars.push((ctx, var));
        self.var_index.insert((ctx, var), id);
        self.by_base_var.entry(var).or_default().push(id);
        id
    }

    /// Every context-qualified variable interned for `var`, across all
    /// contexts it was ever analyzed under.
    pub fn vars_for(&self, var: VarId) -> &[CSVarId] {
        self.by_base_var.get(&var).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cs_obj(&mut self, ctx: ContextId, obj: ObjId) -> CSObjId {
        if let Some(&id) = self.obj_index.get(&(ctx, obj)) {
            return id;
        }
        let id = CSObjId::new(self.objs.len());
        self.objs.push((ctx, obj));
        self.obj_index.insert((ctx, obj), id);
        id
    }

    pub fn base_var(&self, cs_var: CSVarId) -> (ContextId, VarId) {
        self.vars[cs_var.index()]
    }

    pub fn base_obj(&self, cs_obj: CSObjId) -> (ContextId, ObjId) {
        self.objs[cs_obj.index()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_pair_interns_to_same_id() {
        let mut mgr = CSManager::new();
        let ctx = ContextId::new(0);
        let var = VarId::new(1);
        let a = mgr.cs_var(ctx, var);
        let b = mgr.cs_var(ctx, var);
        assert_eq!(a, b);

        let other_ctx = ContextId::new(1);
        let c = mgr.cs_var(other_ctx, var);
        assert_ne!(a, c);
    }
}
