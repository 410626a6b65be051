// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The closed statement/expression vocabulary. A tagged-variant
//! enum stands in for the open `Instruction` inheritance hierarchy a real
//! bytecode reader would expose; every solver matches on it exhaustively
//! rather than dispatching through a trait object.

use std::fmt;

use crate::ir::class_hierarchy::ClassId;
use crate::ir::method::{MethodId, VarId};

/// Whether a local variable can hold an integer (and therefore
/// participates in constant propagation) or a reference (and therefore
/// participates in points-to analysis). A real verifier derives this
/// from the bytecode's type descriptors; here it is carried directly on
/// the IR.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum VarType {
    Int,
    Ref,
}

/// A method's signature, stripped of its declaring class so it can be
/// compared across a class hierarchy during virtual dispatch.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Subsignature {
    pub name: String,
    pub num_params: usize,
}

impl Subsignature {
    pub fn new(name: impl Into<String>, num_params: usize) -> Self {
        Subsignature { name: name.into(), num_params }
    }
}

impl fmt::Display for Subsignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.num_params)
    }
}

/// Index of an instance or static field declared on some class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FieldId(pub u32);

/// A field reference, naming both the declaring class and the field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FieldRef {
    pub class: ClassId,
    pub field: FieldId,
    pub is_static: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    Xor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

/// How a call site resolves its callee(s).
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum CallKind {
    /// Static call: the callee is known without any receiver.
    Static(MethodId),
    /// Invokes exactly the declared method, no virtual dispatch (used for
    /// constructors and private methods).
    Special(MethodId),
    /// Virtual/interface call: resolved against the runtime class of
    /// `receiver` through the class hierarchy. `declared_class` is the
    /// receiver's static type as seen at the call site (the class or
    /// interface CHA's hierarchy descent starts from; a points-to-based
    /// resolver ignores it and dispatches on the receiver's actual
    /// pointed-to objects instead).
    Virtual { receiver: VarId, declared_class: ClassId, subsignature: Subsignature },
}

/// A right-hand-side expression.
#[derive(Clone, Debug)]
pub enum Expr {
    IntConst(i32),
    Var(VarId),
    BinOp(BinOp, VarId, VarId),
    /// Allocates a fresh object of `class` at this program point; the
    /// statement index doubles as the allocation site.
    New(ClassId),
    InstanceFieldLoad(VarId, FieldRef),
    StaticFieldLoad(FieldRef),
    /// `base[index]`. `index` is tracked as a plain variable so dataflow
    /// facts about it (constant vs. unknown) can drive index-sensitive
    /// array aliasing.
    ArrayLoad(VarId, VarId),
    Call { kind: CallKind, args: Vec<VarId> },
}

/// A single IR statement. Every statement either defines at most one
/// variable (`Assign`, `Call`), mutates heap state (`StoreField`,
/// `StoreArray`), or affects control flow (`If`, `Switch`, `Goto`,
/// `Return`).
#[derive(Clone, Debug)]
pub enum Stmt {
    Assign { lhs: VarId, rhs: Expr },
    /// A call whose result (if any) is discarded.
    CallStmt { call: Expr },
    StoreInstanceField { base: VarId, field: FieldRef, value: VarId },
    StoreStaticField { field: FieldRef, value: VarId },
    StoreArray { base: VarId, index: VarId, value: VarId },
    If { cond: VarId, target: u32 },
    Goto { target: u32 },
    Switch { cond: VarId, cases: Vec<(i32, u32)>, default: u32 },
    Return(Option<VarId>),
}

impl Stmt {
    /// The variable this statement directly assigns, if any.
    pub fn defined_var(&self) -> Option<VarId> {
        match self {
            Stmt::Assign { lhs, .. } => Some(*lhs),
            _ => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Stmt::If { .. } | Stmt::Goto { .. } | Stmt::Switch { .. } | Stmt::Return(_))
    }

    /// The call expression at this statement, if it contains one.
    pub fn call(&self) -> Option<&Expr> {
        match self {
            Stmt::Assign { rhs: call @ Expr::Call { .. }, .. } => Some(call),
            Stmt::CallStmt { call } => Some(call),
            _ => None,
        }
    }
}
