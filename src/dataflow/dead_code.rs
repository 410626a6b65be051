// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Dead-code detection: a thin consumer layered on a completed CFG and
//! constant-propagation result, in the same spirit as `rupta`'s reporting
//! passes (`util::results_dumper`, `util::pta_statistics`) sitting on top
//! of an already-computed fixpoint rather than folding reporting logic
//! into the solver.
//!
//! Two kinds of dead code are reported, ordered by statement index:
//! - an unreachable statement, one the CFG has no path to from the
//!   method's entry;
//! - a dead assignment, one whose LHS is never read again on any path and
//!   whose RHS has no observable side effect (a field/array load or a
//!   call may have one; a constant, copy, or arithmetic expression never
//!   does).

use std::collections::HashSet;

use crate::dataflow::DataflowResult;
use crate::ir::cfg::Cfg;
use crate::ir::method::Method;
use crate::ir::stmt::{Expr, Stmt};
use crate::ir::value::CPFact;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeadCodeKind {
    Unreachable,
    DeadAssignment,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeadCodeEntry {
    pub index: u32,
    pub kind: DeadCodeKind,
}

pub struct DeadCodeDetection {
    pub entries: Vec<DeadCodeEntry>,
}

impl DeadCodeDetection {
    /// `cp` is the intra-procedural constant-propagation result for
    /// `method`'s own CFG; dead-code detection only needs reachability
    /// and the live-variable question, neither of which requires the
    /// inter-procedural lattice.
    pub fn detect(method: &Method, cfg: &Cfg, cp: &DataflowResult<CPFact>) -> Self {
        let reachable = reachable_indices(cfg);
        let live = live_after(method, cfg);

        let mut entries = Vec::new();
        for (index, stmt) in method.stmts.iter().enumerate() {
            let index = index as u32;
            if !reachable.contains(&index) {
                entries.push(DeadCodeEntry { index, kind: DeadCodeKind::Unreachable });
                continue;
            }
            if is_dead_assignment(stmt, index, &live) {
                entries.push(DeadCodeEntry { index, kind: DeadCodeKind::DeadAssignment });
            }
        }
        // Constant-propagation facts aren't consulted for reachability or
        // liveness themselves, but a fixpoint that never converged would
        // leave `cp` with stale-looking UNDEF facts everywhere; asserting
        // its shape matches the CFG catches that class of caller error
        // early rather than silently under-reporting dead code.
        debug_assert_eq!(cp.in_facts.len(), cfg.num_stmts());

        DeadCodeDetection { entries }
    }
}

fn reachable_indices(cfg: &Cfg) -> HashSet<u32> {
    let mut seen = HashSet::new();
    let mut stack = vec![cfg.entry().index];
    seen.insert(cfg.entry().index);
    while let Some(index) = stack.pop() {
        for (succ, _) in cfg.successors(index) {
            if seen.insert(succ) {
                stack.push(succ);
            }
        }
    }
    seen
}

/// For every statement index, the set of variables live immediately
/// after it: backward fixpoint over the CFG, `live_in = use ∪ (live_out -
/// def)`, `live_out = union of live_in of successors`.
fn live_after(method: &Method, cfg: &Cfg) -> Vec<HashSet<crate::ir::method::VarId>> {
    use crate::ir::method::VarId;

    let n = cfg.num_stmts();
    let mut live_in: Vec<HashSet<VarId>> = vec![HashSet::new(); n];
    let mut live_out: Vec<HashSet<VarId>> = vec![HashSet::new(); n];
    let mut changed = true;
    while changed {
        changed = false;
        for index in (0..n as u32).rev() {
            let mut out = HashSet::new();
            for (succ, _) in cfg.successors(index) {
                out.extend(live_in[succ as usize].iter().copied());
            }
            let stmt = &method.stmts[index as usize];
            let mut new_in = out.clone();
            if let Some(def) = stmt.defined_var() {
                new_in.remove(&def);
            }
            new_in.extend(uses(stmt));

            if new_in != live_in[index as usize] {
                live_in[index as usize] = new_in;
                changed = true;
            }
            if out != live_out[index as usize] {
                live_out[index as usize] = out;
                changed = true;
            }
        }
    }
    live_out
}

fn uses(stmt: &Stmt) -> Vec<crate::ir::method::VarId> {
    match stmt {
        Stmt::Assign { rhs, .. } => expr_uses(rhs),
        Stmt::CallStmt { call } => expr_uses(call),
        Stmt::StoreInstanceField { base, value, .. } => vec![*base, *value],
        Stmt::StoreStaticField { value, .. } => vec![*value],
        Stmt::StoreArray { base, index, value } => vec![*base, *index, *value],
        Stmt::If { cond, .. } => vec![*cond],
        Stmt::Switch { cond, .. } => vec![*cond],
        Stmt::Goto { .. } => vec![],
        Stmt::Return(var) => var.iter().copied().collect(),
    }
}

fn expr_uses(expr: &Expr) -> Vec<crate::ir::method::VarId> {
    match expr {
        Expr::IntConst(_) | Expr::New(_) | Expr::StaticFieldLoad(_) => vec![],
        Expr::Var(v) => vec![*v],
        Expr::ArrayLoad(base, index) => vec![*base, *index],
        Expr::BinOp(_, a, b) => vec![*a, *b],
        Expr::InstanceFieldLoad(base, _) => vec![*base],
        Expr::Call { kind, args } => {
            let mut vars = args.clone();
            if let crate::ir::stmt::CallKind::Virtual { receiver, .. } = kind {
                vars.push(*receiver);
            }
            vars
        }
    }
}

/// A load (field/array) or a call may fault or have external side
/// effects even when its result is discarded; only pure expressions make
/// an unread assignment truly dead. Division and remainder can trap on a
/// zero divisor, so per §8 scenario 4 they are never pruned even though
/// their abstract result collapses to `UNDEF`.
fn has_side_effect(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::InstanceFieldLoad(..)
            | Expr::StaticFieldLoad(_)
            | Expr::ArrayLoad(..)
            | Expr::Call { .. }
            | Expr::BinOp(crate::ir::stmt::BinOp::Div | crate::ir::stmt::BinOp::Rem, _, _)
    )
}

fn is_dead_assignment(stmt: &Stmt, index: u32, live: &[HashSet<crate::ir::method::VarId>]) -> bool {
    let Stmt::Assign { lhs, rhs } = stmt else { return false };
    if has_side_effect(rhs) {
        return false;
    }
    !live[index as usize].contains(lhs)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::class_hierarchy::ClassId;
    use crate::ir::method::{MethodId, VarId};
    use crate::ir::stmt::{BinOp, Subsignature, VarType};
    use crate::util::bit_vec::Idx;

    fn method_with(stmts: Vec<Stmt>, num_vars: usize) -> Method {
        Method {
            id: MethodId::new(0),
            declaring_class: ClassId::new(0),
            subsignature: Subsignature::new("m", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types: vec![VarType::Int; num_vars],
            stmts,
        }
    }

    #[test]
    fn statement_after_unconditional_return_is_unreachable() {
        let v0 = VarId::new(0);
        let m = method_with(
            vec![
                Stmt::Return(None),
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(1) },
            ],
            1,
        );
        let cfg = Cfg::build(&m);
        let mut cp = super::super::constant_propagation::ConstantPropagation::new(&m);
        let result = super::super::solve(&cfg, &mut cp);
        let dead = DeadCodeDetection::detect(&m, &cfg, &result);
        assert!(dead.entries.contains(&DeadCodeEntry { index: 1, kind: DeadCodeKind::Unreachable }));
    }

    #[test]
    fn assignment_never_read_is_dead() {
        let v0 = VarId::new(0);
        let v1 = VarId::new(1);
        let m = method_with(
            vec![
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(1) },
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(2) },
                Stmt::Assign { lhs: v1, rhs: Expr::BinOp(BinOp::Add, v0, v0) },
                Stmt::Return(Some(v1)),
            ],
            2,
        );
        let cfg = Cfg::build(&m);
        let mut cp = super::super::constant_propagation::ConstantPropagation::new(&m);
        let result = super::super::solve(&cfg, &mut cp);
        let dead = DeadCodeDetection::detect(&m, &cfg, &result);
        assert!(dead.entries.contains(&DeadCodeEntry { index: 0, kind: DeadCodeKind::DeadAssignment }));
        assert!(!dead.entries.iter().any(|e| e.index == 1));
    }

    #[test]
    fn discarded_field_load_is_not_reported_as_dead() {
        let v0 = VarId::new(0);
        let m = method_with(
            vec![
                Stmt::Assign {
                    lhs: v0,
                    rhs: Expr::InstanceFieldLoad(
                        v0,
                        crate::ir::stmt::FieldRef {
                            class: ClassId::new(0),
                            field: crate::ir::stmt::FieldId(0),
                            is_static: false,
                        },
                    ),
                },
                Stmt::Return(None),
            ],
            1,
        );
        let cfg = Cfg::build(&m);
        let mut cp = super::super::constant_propagation::ConstantPropagation::new(&m);
        let result = super::super::solve(&cfg, &mut cp);
        let dead = DeadCodeDetection::detect(&m, &cfg, &result);
        assert!(!dead.entries.iter().any(|e| e.kind == DeadCodeKind::DeadAssignment));
    }
}
