// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Inter-procedural constant propagation: the intra-
//! procedural lattice and transfer rules from [`super::constant_propagation`],
//! lifted across call/return/call-to-return edges of an [`Icfg`], with
//! heap reads and writes resolved through a completed points-to result
//! (any [`PointerAnalysisResult`], CI or CS).
//!
//! Instance/static/array field values are tracked flow-insensitively, one
//! abstract value per `(object, field)` or `FieldRef`, updated by meet on
//! every store and re-read by every aliasing load, rather than
//! flow-sensitively per program point. This is the standard compromise
//! real constant-propagation-with-heap implementations make: a fully
//! flow-sensitive heap lattice would mean one CPFact-sized entry per
//! object per program point, which is rarely worth its cost.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::ir::cfg::Cfg;
use crate::ir::heap::ObjId;
use crate::ir::icfg::Icfg;
use crate::ir::method::{MethodId, Program, StmtLoc};
use crate::ir::stmt::{Expr, FieldId, FieldRef, Stmt, VarType};
use crate::ir::value::{CPFact, Value};
use crate::pta::PointerAnalysisResult;

use super::constant_propagation::eval_binop;

pub struct InterproceduralResult {
    in_facts: HashMap<StmtLoc, CPFact>,
    out_facts: HashMap<StmtLoc, CPFact>,
}

impl InterproceduralResult {
    pub fn in_fact(&self, loc: StmtLoc) -> CPFact {
        self.in_facts.get(&loc).cloned().unwrap_or_default()
    }

    pub fn out_fact(&self, loc: StmtLoc) -> CPFact {
        self.out_facts.get(&loc).cloned().unwrap_or_default()
    }
}

pub struct InterproceduralCP<'a, R: PointerAnalysisResult> {
    program: &'a Program,
    icfg: &'a Icfg,
    cfgs: HashMap<MethodId, &'a Cfg>,
    pts: &'a R,

    in_facts: HashMap<StmtLoc, CPFact>,
    out_facts: HashMap<StmtLoc, CPFact>,

    instance_values: HashMap<(ObjId, FieldId), Value>,
    instance_dependents: HashMap<(ObjId, FieldId), Vec<StmtLoc>>,
    static_values: HashMap<FieldRef, Value>,
    static_dependents: HashMap<FieldRef, Vec<StmtLoc>>,
    /// Per object, one `(index value, stored value)` slot per store
    /// statement. Kept per-store rather than merged into one value per
    /// object so a read can apply the index-sensitive alias predicate
    /// (spec-level "two stores/reads into the same array may or may not
    /// touch the same slot") instead of seeing every store to the object
    /// collapsed together regardless of index.
    array_values: HashMap<ObjId, HashMap<StmtLoc, (Value, Value)>>,
    array_dependents: HashMap<ObjId, Vec<StmtLoc>>,

    callers_of: HashMap<MethodId, Vec<StmtLoc>>,

    worklist: VecDeque<StmtLoc>,
    queued: HashSet<StmtLoc>,
}

impl<'a, R: PointerAnalysisResult> InterproceduralCP<'a, R> {
    pub fn new(program: &'a Program, icfg: &'a Icfg, pts: &'a R) -> Self {
        let mut cfgs = HashMap::new();
        let mut callers_of: HashMap<MethodId, Vec<StmtLoc>> = HashMap::new();
        let mut instance_dependents: HashMap<(ObjId, FieldId), Vec<StmtLoc>> = HashMap::new();
        let mut static_dependents: HashMap<FieldRef, Vec<StmtLoc>> = HashMap::new();
        let mut array_dependents: HashMap<ObjId, Vec<StmtLoc>> = HashMap::new();

        for method in pts.call_graph().reachable_methods() {
            if let Some(cfg) = icfg.cfg(method) {
                cfgs.insert(method, cfg);
            }
            let m = program.method(method);
            for (i, stmt) in m.stmts.iter().enumerate() {
                let loc = StmtLoc::new(method, i as u32);
                if let Some(Expr::Call { .. }) = stmt.call() {
                    for callee in icfg_callees(pts, loc) {
                        callers_of.entry(callee).or_default().push(loc);
                    }
                }
                match stmt {
                    Stmt::Assign { rhs: Expr::InstanceFieldLoad(base, field), .. } => {
                        for obj in pts.pts_of_var(*base).iter() {
                            instance_dependents.entry((obj, field.field)).or_default().push(loc);
                        }
                    }
                    Stmt::Assign { rhs: Expr::StaticFieldLoad(field), .. } => {
                        static_dependents.entry(*field).or_default().push(loc);
                    }
                    Stmt::Assign { rhs: Expr::ArrayLoad(base, _), .. } => {
                        for obj in pts.pts_of_var(*base).iter() {
                            array_dependents.entry(obj).or_default().push(loc);
                        }
                    }
                    _ => {}
                }
            }
        }

        InterproceduralCP {
            program,
            icfg,
            cfgs,
            pts,
            in_facts: HashMap::new(),
            out_facts: HashMap::new(),
            instance_values: HashMap::new(),
            instance_dependents,
            static_values: HashMap::new(),
            static_dependents,
            array_values: HashMap::new(),
            array_dependents,
            callers_of,
            worklist: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    pub fn solve(mut self) -> InterproceduralResult {
        let entry = self.program.entry_method;
        let mut boundary = CPFact::new();
        for &param in &self.program.method(entry).params {
            if self.program.method(entry).var_type(param) == VarType::Int {
                boundary.update(param, Value::Nac);
            }
        }
        self.in_facts.insert(self.icfg.entry(entry), boundary);
        self.enqueue(self.icfg.entry(entry));

        while let Some(loc) = self.worklist.pop_front() {
            self.queued.remove(&loc);
            self.step(loc);
        }

        InterproceduralResult { in_facts: self.in_facts, out_facts: self.out_facts }
    }

    fn enqueue(&mut self, loc: StmtLoc) {
        if self.queued.insert(loc) {
            self.worklist.push_back(loc);
        }
    }

    fn in_fact_of(&self, loc: StmtLoc) -> CPFact {
        self.in_facts.get(&loc).cloned().unwrap_or_default()
    }

    fn out_fact_of(&self, loc: StmtLoc) -> CPFact {
        self.out_facts.get(&loc).cloned().unwrap_or_default()
    }

    fn step(&mut self, loc: StmtLoc) {
        let Some(&cfg) = self.cfgs.get(&loc.method) else { return };

        // Recompute IN from intraprocedural predecessors, unless this is
        // a method entry with no intraprocedural predecessors (its IN is
        // driven purely by call edges from `push_call_args`).
        if loc.index != 0 {
            let mut merged = CPFact::new();
            let mut any = false;
            for (pred, _) in cfg.predecessors(loc.index) {
                any = true;
                merged.meet_into(&self.out_fact_of(StmtLoc::new(loc.method, pred)));
            }
            if any {
                self.in_facts.insert(loc, merged);
            }
        }

        let in_fact = self.in_fact_of(loc);
        let stmt = self.program.method(loc.method).stmt_at(loc.index).clone();
        let new_out = self.transfer(loc, &in_fact, &stmt);
        let changed = new_out != self.out_fact_of(loc);
        self.out_facts.insert(loc, new_out);

        if changed {
            if let Some(&cfg) = self.cfgs.get(&loc.method) {
                for (succ, _) in cfg.successors(loc.index) {
                    self.enqueue(StmtLoc::new(loc.method, succ));
                }
            }
            if loc.index == 0 {
                for &caller in self.callers_of.get(&loc.method).cloned().unwrap_or_default().iter() {
                    self.enqueue(caller);
                }
            }
        }

        if let Some(Expr::Call { .. }) = stmt.call() {
            self.push_call_args(loc, &in_fact);
        }
    }

    fn transfer(&mut self, loc: StmtLoc, in_fact: &CPFact, stmt: &Stmt) -> CPFact {
        let mut out = in_fact.clone();
        match stmt {
            Stmt::Assign { lhs, rhs } => {
                let is_int = self.program.method(loc.method).var_type(*lhs) == VarType::Int;
                if is_int {
                    let value = self.eval_rhs(loc, in_fact, rhs);
                    out.update(*lhs, value);
                }
            }
            Stmt::StoreInstanceField { base, field, value } => {
                let v = in_fact.get(*value);
                for obj in self.pts.pts_of_var(*base).iter() {
                    self.update_instance(obj, field.field, v);
                }
            }
            Stmt::StoreStaticField { field, value } => {
                let v = in_fact.get(*value);
                self.update_static(*field, v);
            }
            Stmt::StoreArray { base, index, value } => {
                let idx = in_fact.get(*index);
                let v = in_fact.get(*value);
                for obj in self.pts.pts_of_var(*base).iter() {
                    self.update_array(obj, loc, idx, v);
                }
            }
            Stmt::CallStmt { .. } | Stmt::If { .. } | Stmt::Goto { .. } | Stmt::Switch { .. } | Stmt::Return(_) => {}
        }
        out
    }

    fn eval_rhs(&mut self, loc: StmtLoc, in_fact: &CPFact, rhs: &Expr) -> Value {
        match rhs {
            Expr::IntConst(c) => Value::Const(*c),
            Expr::Var(v) => in_fact.get(*v),
            Expr::BinOp(op, a, b) => eval_binop(*op, in_fact.get(*a), in_fact.get(*b)),
            Expr::InstanceFieldLoad(base, field) => {
                let mut merged = Value::Undef;
                for obj in self.pts.pts_of_var(*base).iter() {
                    merged = Value::meet(merged, self.instance_values.get(&(obj, field.field)).copied().unwrap_or(Value::Undef));
                }
                merged
            }
            Expr::StaticFieldLoad(field) => self.static_values.get(field).copied().unwrap_or(Value::Undef),
            Expr::ArrayLoad(base, index) => {
                let read_idx = in_fact.get(*index);
                let mut merged = Value::Undef;
                for obj in self.pts.pts_of_var(*base).iter() {
                    let Some(stores) = self.array_values.get(&obj) else { continue };
                    for &(store_idx, store_val) in stores.values() {
                        if may_alias_index(store_idx, read_idx) {
                            merged = Value::meet(merged, store_val);
                        }
                    }
                }
                merged
            }
            Expr::New(_) => Value::Nac,
            Expr::Call { .. } => self.eval_call_result(loc),
        }
    }

    /// A call's result value: the meet of every resolved callee's
    /// returned value, read from whatever its `Return` statements'
    /// current OUT facts say (may still be `UNDEF` early in the
    /// fixpoint).
    fn eval_call_result(&self, loc: StmtLoc) -> Value {
        let mut merged = Value::Undef;
        for callee in icfg_callees(self.pts, loc) {
            for ret_loc in self.icfg.exits(self.program, callee) {
                if let Stmt::Return(Some(returned)) = self.program.method(callee).stmt_at(ret_loc.index) {
                    merged = Value::meet(merged, self.out_fact_of(ret_loc).get(*returned));
                }
            }
        }
        merged
    }

    /// Projects a call site's actual arguments onto each resolved
    /// callee's formal parameters and meets the result into that
    /// callee's entry IN fact, re-enqueuing the entry if it grew.
    fn push_call_args(&mut self, loc: StmtLoc, in_fact: &CPFact) {
        let callees: Vec<MethodId> = icfg_callees(self.pts, loc);
        let Expr::Call { args, .. } = self.program.method(loc.method).stmt_at(loc.index).call().unwrap() else {
            return;
        };
        let args = args.clone();
        for callee in callees {
            let callee_method = self.program.method(callee);
            let mut contribution = CPFact::new();
            for (formal, actual) in callee_method.params.iter().zip(args.iter()) {
                contribution.update(*formal, in_fact.get(*actual));
            }
            let entry = self.icfg.entry(callee);
            let mut merged = self.in_fact_of(entry);
            if merged.meet_into(&contribution) {
                self.in_facts.insert(entry, merged);
                self.enqueue(entry);
            }
        }
    }

    fn update_instance(&mut self, obj: ObjId, field: FieldId, v: Value) {
        let entry = self.instance_values.entry((obj, field)).or_insert(Value::Undef);
        let merged = Value::meet(*entry, v);
        if merged != *entry {
            *entry = merged;
            for &dep in self.instance_dependents.get(&(obj, field)).cloned().unwrap_or_default().iter() {
                self.enqueue(dep);
            }
        }
    }

    fn update_static(&mut self, field: FieldRef, v: Value) {
        let entry = self.static_values.entry(field).or_insert(Value::Undef);
        let merged = Value::meet(*entry, v);
        if merged != *entry {
            *entry = merged;
            for &dep in self.static_dependents.get(&field).cloned().unwrap_or_default().iter() {
                self.enqueue(dep);
            }
        }
    }

    fn update_array(&mut self, obj: ObjId, store_loc: StmtLoc, idx: Value, v: Value) {
        let slot = self.array_values.entry(obj).or_default().entry(store_loc).or_insert((Value::Undef, Value::Undef));
        let merged_idx = Value::meet(slot.0, idx);
        let merged_val = Value::meet(slot.1, v);
        if (merged_idx, merged_val) != *slot {
            *slot = (merged_idx, merged_val);
            for &dep in self.array_dependents.get(&obj).cloned().unwrap_or_default().iter() {
                self.enqueue(dep);
            }
        }
    }
}

/// Spec-level index alias predicate between a store's and a read's index
/// value: an unresolved (`NAC`) index may alias anything, two resolved
/// constants alias iff equal, and two still-`UNDEF` indices are not yet
/// known to alias (the store or read they belong to will re-enqueue this
/// pair once its index fact actually resolves).
fn may_alias_index(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Nac, _) | (_, Value::Nac) => true,
        (Value::Const(x), Value::Const(y)) => x == y,
        _ => false,
    }
}

fn icfg_callees<R: PointerAnalysisResult>(pts: &R, loc: StmtLoc) -> Vec<MethodId> {
    pts.call_graph().callees_at(loc).iter().map(|n| n.method()).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::analysis_context::AnalysisContext;
    use crate::ir::class_hierarchy::{Class, ClassHierarchy, ClassId};
    use crate::ir::heap::AllocSiteHeapModel;
    use crate::ir::method::{Method, VarId};
    use crate::ir::stmt::{Subsignature, VarType};
    use crate::pta::andersen::AndersenPTA;
    use crate::util::options::AnalysisOptions;
    use std::collections::HashMap as Map;

    #[test]
    fn array_load_only_sees_stores_whose_index_may_alias() {
        // class A {}
        // main() {
        //   arr = new A();
        //   i0 = 0; i1 = 1;
        //   arr[i0] = 10; arr[i1] = 20;
        //   r = arr[i0];   // must read 10, not NAC(10,20)
        // }
        let a_class = ClassId::new(0);
        let classes = vec![Class {
            id: a_class,
            name: "A".into(),
            is_interface: false,
            is_abstract: false,
            superclass: None,
            interfaces: vec![],
            declared_methods: Map::new(),
        }];
        let hierarchy = ClassHierarchy::new(classes);

        let arr = VarId::new(0);
        let i0 = VarId::new(1);
        let i1 = VarId::new(2);
        let v10 = VarId::new(3);
        let v20 = VarId::new(4);
        let r = VarId::new(5);
        let main_id = MethodId::new(0);
        let mut var_types = vec![VarType::Int; 6];
        var_types[0] = VarType::Ref;
        let main = Method {
            id: main_id,
            declaring_class: a_class,
            subsignature: Subsignature::new("main", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types,
            stmts: vec![
                Stmt::Assign { lhs: arr, rhs: Expr::New(a_class) },
                Stmt::Assign { lhs: i0, rhs: Expr::IntConst(0) },
                Stmt::Assign { lhs: i1, rhs: Expr::IntConst(1) },
                Stmt::Assign { lhs: v10, rhs: Expr::IntConst(10) },
                Stmt::Assign { lhs: v20, rhs: Expr::IntConst(20) },
                Stmt::StoreArray { base: arr, index: i0, value: v10 },
                Stmt::StoreArray { base: arr, index: i1, value: v20 },
                Stmt::Assign { lhs: r, rhs: Expr::ArrayLoad(arr, i0) },
                Stmt::Return(None),
            ],
        };
        let program = Program::new(hierarchy, vec![main], main_id);
        let mut ctx = AnalysisContext::new(program, AllocSiteHeapModel::new(), AnalysisOptions::default());
        let pta_result = AndersenPTA::new(&mut ctx).solve();

        let icfg = Icfg::build(&ctx.program, pta_result.call_graph());
        let cp = InterproceduralCP::new(&ctx.program, &icfg, &pta_result);
        let result = cp.solve();

        assert_eq!(result.out_fact(StmtLoc::new(main_id, 7)).get(r), Value::Const(10));
    }

    #[test]
    fn array_load_with_unresolved_index_merges_every_store() {
        // Same array, but the read's index is NAC, so it must merge both
        // stores into NAC instead of picking one.
        let a_class = ClassId::new(0);
        let classes = vec![Class {
            id: a_class,
            name: "A".into(),
            is_interface: false,
            is_abstract: false,
            superclass: None,
            interfaces: vec![],
            declared_methods: Map::new(),
        }];
        let hierarchy = ClassHierarchy::new(classes);

        let arr = VarId::new(0);
        let i0 = VarId::new(1);
        let i1 = VarId::new(2);
        let unknown_idx = VarId::new(3);
        let v10 = VarId::new(4);
        let v20 = VarId::new(5);
        let r = VarId::new(6);
        let main_id = MethodId::new(0);
        let mut var_types = vec![VarType::Int; 7];
        var_types[0] = VarType::Ref;
        let main = Method {
            id: main_id,
            declaring_class: a_class,
            subsignature: Subsignature::new("main", 1),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![unknown_idx],
            var_types,
            stmts: vec![
                Stmt::Assign { lhs: arr, rhs: Expr::New(a_class) },
                Stmt::Assign { lhs: i0, rhs: Expr::IntConst(0) },
                Stmt::Assign { lhs: i1, rhs: Expr::IntConst(1) },
                Stmt::Assign { lhs: v10, rhs: Expr::IntConst(10) },
                Stmt::Assign { lhs: v20, rhs: Expr::IntConst(20) },
                Stmt::StoreArray { base: arr, index: i0, value: v10 },
                Stmt::StoreArray { base: arr, index: i1, value: v20 },
                Stmt::Assign { lhs: r, rhs: Expr::ArrayLoad(arr, unknown_idx) },
                Stmt::Return(None),
            ],
        };
        let program = Program::new(hierarchy, vec![main], main_id);
        let mut ctx = AnalysisContext::new(program, AllocSiteHeapModel::new(), AnalysisOptions::default());
        let pta_result = AndersenPTA::new(&mut ctx).solve();

        let icfg = Icfg::build(&ctx.program, pta_result.call_graph());
        let cp = InterproceduralCP::new(&ctx.program, &icfg, &pta_result);
        let result = cp.solve();

        assert_eq!(result.out_fact(StmtLoc::new(main_id, 7)).get(r), Value::Nac);
    }
}
