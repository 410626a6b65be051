// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Methods and the program they live in.

use std::fmt;

use crate::ir::class_hierarchy::{ClassHierarchy, ClassId};
use crate::ir::stmt::{Stmt, Subsignature, VarType};
use crate::util::bit_vec::Idx;

/// Index of a method within a [`Program`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u32);

impl Idx for MethodId {
    fn new(idx: usize) -> Self {
        MethodId(u32::new(idx))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Index of a local variable within a single method. Variable identity is
/// only meaningful relative to the owning method, mirroring a bytecode
/// verifier's local-slot numbering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

impl Idx for VarId {
    fn new(idx: usize) -> Self {
        VarId(u32::new(idx))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A statement's position within its owning method's statement list,
/// used to key per-program-point dataflow facts and ICFG nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtLoc {
    pub method: MethodId,
    pub index: u32,
}

impl StmtLoc {
    pub fn new(method: MethodId, index: u32) -> Self {
        StmtLoc { method, index }
    }
}

impl fmt::Debug for StmtLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.method, self.index)
    }
}

/// A single method body. Abstract and external (unmodeled) methods carry
/// no statements; callers must consult [`Method::is_abstract`] /
/// [`Method::is_external`] before indexing into `stmts`.
#[derive(Clone, Debug)]
pub struct Method {
    pub id: MethodId,
    pub declaring_class: ClassId,
    pub subsignature: Subsignature,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_external: bool,
    pub this_var: Option<VarId>,
    pub params: Vec<VarId>,
    pub var_types: Vec<VarType>,
    pub stmts: Vec<Stmt>,
}

impl Method {
    pub fn num_vars(&self) -> usize {
        self.var_types.len()
    }

    pub fn var_type(&self, var: VarId) -> VarType {
        self.var_types[var.index()]
    }

    pub fn stmt_at(&self, index: u32) -> &Stmt {
        &self.stmts[index as usize]
    }

    pub fn loc(&self, index: u32) -> StmtLoc {
        StmtLoc::new(self.id, index)
    }
}

/// The whole program under analysis: its class hierarchy plus every
/// method body, indexed by [`MethodId`]. This is the one concrete IR the
/// core analyses consume; there is no generic front-end trait. IR
/// construction is treated as an external concern that hands over exactly
/// this shape.
#[derive(Clone, Debug)]
pub struct Program {
    pub class_hierarchy: ClassHierarchy,
    methods: Vec<Method>,
    pub entry_method: MethodId,
}

impl Program {
    pub fn new(class_hierarchy: ClassHierarchy, methods: Vec<Method>, entry_method: MethodId) -> Self {
        Program { class_hierarchy, methods, entry_method }
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }
}
