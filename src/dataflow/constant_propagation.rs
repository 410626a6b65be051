// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Intra-procedural constant propagation: the generic
//! dataflow framework instantiated with [`CPFact`]/[`Value`].

use crate::ir::method::Method;
use crate::ir::stmt::{BinOp, Expr, Stmt, VarType};
use crate::ir::value::{CPFact, Value};

use super::DataflowAnalysis;

/// Evaluates a binary operation over two abstract values. Multiplying by
/// a known zero always yields zero, even when the other operand is
/// `NAC`, the one place this lattice deviates from pointwise meet, and
/// the scenario the "zero short-circuit" property exercises. Division
/// and remainder by a possible zero divisor fall back to `NAC` rather
/// than modeling the runtime's division-by-zero behavior.
pub fn eval_binop(op: BinOp, a: Value, b: Value) -> Value {
    if op == BinOp::Mul && (a == Value::Const(0) || b == Value::Const(0)) {
        return Value::Const(0);
    }
    match (a, b) {
        (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
        (Value::Undef, _) | (_, Value::Undef) => Value::Undef,
        (Value::Const(x), Value::Const(y)) => match op {
            BinOp::Add => Value::Const(x.wrapping_add(y)),
            BinOp::Sub => Value::Const(x.wrapping_sub(y)),
            BinOp::Mul => Value::Const(x.wrapping_mul(y)),
            // A zero divisor is undefined behavior, not "unknown": it
            // suppresses propagation rather than widening to NAC.
            BinOp::Div if y == 0 => Value::Undef,
            BinOp::Rem if y == 0 => Value::Undef,
            BinOp::Div => Value::Const(x.wrapping_div(y)),
            BinOp::Rem => Value::Const(x.wrapping_rem(y)),
            BinOp::Shl => Value::Const(x.wrapping_shl((y as u32) & 31)),
            BinOp::Shr => Value::Const(x.wrapping_shr((y as u32) & 31)),
            BinOp::UShr => Value::Const(((x as u32) >> ((y as u32) & 31)) as i32),
            BinOp::And => Value::Const(x & y),
            BinOp::Or => Value::Const(x | y),
            BinOp::Xor => Value::Const(x ^ y),
            BinOp::Lt => Value::Const((x < y) as i32),
            BinOp::Gt => Value::Const((x > y) as i32),
            BinOp::Le => Value::Const((x <= y) as i32),
            BinOp::Ge => Value::Const((x >= y) as i32),
            BinOp::Eq => Value::Const((x == y) as i32),
            BinOp::Ne => Value::Const((x != y) as i32),
        },
    }
}

pub struct ConstantPropagation<'a> {
    method: &'a Method,
}

impl<'a> ConstantPropagation<'a> {
    pub fn new(method: &'a Method) -> Self {
        ConstantPropagation { method }
    }
}

impl<'a> DataflowAnalysis for ConstantPropagation<'a> {
    type Fact = CPFact;

    /// Every integer parameter starts as `NAC`: a method's own CFG has
    /// no visibility into its callers, so an argument is conservatively
    /// unknown until the interprocedural pass threads real
    /// call-site values through.
    fn boundary_fact(&self) -> CPFact {
        let mut fact = CPFact::new();
        for &param in &self.method.params {
            if self.method.var_type(param) == VarType::Int {
                fact.update(param, Value::Nac);
            }
        }
        fact
    }

    fn init_fact(&self) -> CPFact {
        CPFact::new()
    }

    fn meet(&self, into: &mut CPFact, from: &CPFact) -> bool {
        into.meet_into(from)
    }

    fn transfer(&mut self, index: u32, in_fact: &CPFact, out_fact: &mut CPFact) -> bool {
        let mut new_out = in_fact.clone();
        if let Stmt::Assign { lhs, rhs } = self.method.stmt_at(index) {
            if self.method.var_type(*lhs) == VarType::Int {
                let value = match rhs {
                    Expr::IntConst(c) => Value::Const(*c),
                    Expr::Var(v) => in_fact.get(*v),
                    Expr::BinOp(op, a, b) => eval_binop(*op, in_fact.get(*a), in_fact.get(*b)),
                    // A field/array load or call result isn't modeled
                    // by this lattice; treat it as unknown.
                    Expr::New(_)
                    | Expr::InstanceFieldLoad(..)
                    | Expr::StaticFieldLoad(_)
                    | Expr::ArrayLoad(..)
                    | Expr::Call { .. } => Value::Nac,
                };
                new_out.update(*lhs, value);
            }
        }
        let changed = *out_fact != new_out;
        *out_fact = new_out;
        changed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::cfg::Cfg;
    use crate::ir::class_hierarchy::ClassId;
    use crate::ir::method::{MethodId, VarId};
    use crate::ir::stmt::Subsignature;
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
    fn arithmetic_propagates_through_assignment_chain() {
        let v0 = VarId::new(0);
        let v1 = VarId::new(1);
        let v2 = VarId::new(2);
        let m = method_with(
            vec![
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(2) },
                Stmt::Assign { lhs: v1, rhs: Expr::IntConst(3) },
                Stmt::Assign { lhs: v2, rhs: Expr::BinOp(BinOp::Add, v0, v1) },
                Stmt::Return(None),
            ],
            3,
        );
        let cfg = Cfg::build(&m);
        let mut cp = ConstantPropagation::new(&m);
        let result = super::super::solve(&cfg, &mut cp);
        assert_eq!(result.out_fact(2).get(v2), Value::Const(5));
    }

    #[test]
    fn branch_join_of_equal_constants_stays_constant() {
        // v0 = 1; if (v1) v0 = 1; else v0 = 1;  (both branches agree)
        let v0 = VarId::new(0);
        let v1 = VarId::new(1);
        let m = method_with(
            vec![
                Stmt::If { cond: v1, target: 3 },
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(1) },
                Stmt::Goto { target: 4 },
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(1) },
                Stmt::Return(None),
            ],
            2,
        );
        let cfg = Cfg::build(&m);
        let mut cp = ConstantPropagation::new(&m);
        let result = super::super::solve(&cfg, &mut cp);
        assert_eq!(result.in_fact(4).get(v0), Value::Const(1));
    }

    #[test]
    fn branch_join_of_different_constants_is_nac() {
        let v0 = VarId::new(0);
        let v1 = VarId::new(1);
        let m = method_with(
            vec![
                Stmt::If { cond: v1, target: 3 },
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(1) },
                Stmt::Goto { target: 4 },
                Stmt::Assign { lhs: v0, rhs: Expr::IntConst(2) },
                Stmt::Return(None),
            ],
            2,
        );
        let cfg = Cfg::build(&m);
        let mut cp = ConstantPropagation::new(&m);
        let result = super::super::solve(&cfg, &mut cp);
        assert_eq!(result.in_fact(4).get(v0), Value::Nac);
    }

    #[test]
    fn zero_times_nac_short_circuits_to_zero() {
        assert_eq!(eval_binop(BinOp::Mul, Value::Const(0), Value::Nac), Value::Const(0));
        assert_eq!(eval_binop(BinOp::Mul, Value::Nac, Value::Const(0)), Value::Const(0));
    }

    #[test]
    fn division_by_known_zero_is_undef_not_an_error() {
        assert_eq!(eval_binop(BinOp::Div, Value::Const(10), Value::Const(0)), Value::Undef);
        assert_eq!(eval_binop(BinOp::Rem, Value::Const(10), Value::Const(0)), Value::Undef);
    }

    #[test]
    fn division_by_unknown_possible_zero_is_nac() {
        assert_eq!(eval_binop(BinOp::Div, Value::Const(10), Value::Nac), Value::Nac);
    }

    #[test]
    fn comparisons_and_bitwise_ops_compute_when_both_const() {
        assert_eq!(eval_binop(BinOp::Lt, Value::Const(1), Value::Const(2)), Value::Const(1));
        assert_eq!(eval_binop(BinOp::Eq, Value::Const(2), Value::Const(2)), Value::Const(1));
        assert_eq!(eval_binop(BinOp::And, Value::Const(0b110), Value::Const(0b011)), Value::Const(0b010));
        assert_eq!(eval_binop(BinOp::Shl, Value::Const(1), Value::Const(4)), Value::Const(16));
        assert_eq!(eval_binop(BinOp::Lt, Value::Const(1), Value::Nac), Value::Nac);
    }
}
