// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-insensitive Andersen points-to analysis. A
//! worklist solver co-computes the call graph and the points-to sets:
//! processing a statement may discover new reachable code, which in
//! turn contributes more statements to process.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};

use crate::graph::call_graph::{CallEdgeKind, CallGraph};
use crate::graph::pfg::{PfgEdgeKind, Pointer, PointerFlowGraph};
use crate::ir::analysis_context::AnalysisContext;
use crate::ir::heap::{HeapModel, ObjId};
use crate::ir::method::{MethodId, Program, StmtLoc, VarId};
use crate::ir::stmt::{CallKind, Expr, FieldRef, Stmt, Subsignature};
use crate::pta::PointerAnalysisResult;
use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet};
use crate::pts_set::pt_data::DiffPTData;

/// A call site whose receiver's points-to set determines its callees;
/// tracked against the receiver variable so the solver can revisit it
/// whenever that variable's points-to set grows.
#[derive(Clone)]
struct PendingVirtualCall {
    site: StmtLoc,
    edge_kind: CallEdgeKind,
    subsignature: Subsignature,
    args: Vec<VarId>,
    ret: Option<VarId>,
}

pub struct AndersenPTA<'a, H: HeapModel> {
    program: &'a Program,
    heap_model: &'a mut H,
    call_graph: CallGraph<MethodId>,
    pfg: PointerFlowGraph<Pointer>,
    pt: DiffPTData<Pointer, ObjId>,
    worklist: VecDeque<Pointer>,

    instance_loads: HashMap<VarId, Vec<(FieldRef, VarId)>>,
    instance_stores: HashMap<VarId, Vec<(FieldRef, VarId)>>,
    array_loads: HashMap<VarId, Vec<VarId>>,
    array_stores: HashMap<VarId, Vec<VarId>>,
    virtual_calls: HashMap<VarId, Vec<PendingVirtualCall>>,

    processed_methods: HashSet<MethodId>,
}

impl<'a, H: HeapModel> AndersenPTA<'a, H> {
    pub fn new(ctx: &'a mut AnalysisContext<H>) -> Self {
        AndersenPTA {
            program: &ctx.program,
            heap_model: &mut ctx.heap_model,
            call_graph: CallGraph::new(),
            pfg: PointerFlowGraph::new(),
            pt: DiffPTData::new(),
            worklist: VecDeque::new(),
            instance_loads: HashMap::new(),
            instance_stores: HashMap::new(),
            array_loads: HashMap::new(),
            array_stores: HashMap::new(),
            virtual_calls: HashMap::new(),
            processed_methods: HashSet::new(),
        }
    }

    pub fn solve(mut self) -> AndersenResult {
        let entry = self.program.entry_method;
        self.add_reachable(entry);

        while let Some(pointer) = self.worklist.pop_front() {
            let diff = self.pt.flush_diff(pointer);
            if diff.is_empty() {
                continue;
            }
            self.propagate(pointer, &diff);
            if let Pointer::Var(var) = pointer {
                self.handle_var_growth(var, &diff);
            }
        }

        info!(
            "context-insensitive points-to analysis reached fixpoint: {} reachable methods",
            self.call_graph.num_reachable()
        );
        AndersenResult { call_graph: self.call_graph, pt: self.pt, pfg: self.pfg }
    }

    fn add_reachable(&mut self, method: MethodId) {
        if !self.call_graph.add_reachable(method) {
            return;
        }
        if !self.processed_methods.insert(method) {
            return;
        }
        let program = self.program;
        let m = program.method(method);
        if m.is_abstract || m.is_external {
            return;
        }
        for (i, stmt) in m.stmts.iter().enumerate() {
            self.process_stmt(program, method, StmtLoc::new(method, i as u32), stmt);
        }
    }

    fn process_stmt(&mut self, program: &Program, method: MethodId, loc: StmtLoc, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { lhs, rhs } => self.process_rhs(program, method, loc, Some(*lhs), rhs),
            Stmt::CallStmt { call } => self.process_rhs(program, method, loc, None, call),
            Stmt::StoreInstanceField { base, field, value } => {
                self.instance_stores.entry(*base).or_default().push((*field, *value));
                if let Some(pts) = self.pt_snapshot(Pointer::Var(*base)) {
                    self.wire_instance_store(*field, *value, &pts);
                }
            }
            Stmt::StoreStaticField { field, value } => {
                self.add_pfg_edge(Pointer::Var(*value), Pointer::StaticField(field.class, field.field), PfgEdgeKind::Store);
            }
            Stmt::StoreArray { base, index: _, value } => {
                self.array_stores.entry(*base).or_default().push(*value);
                if let Some(pts) = self.pt_snapshot(Pointer::Var(*base)) {
                    self.wire_array_store(*value, &pts);
                }
            }
            Stmt::If { .. } | Stmt::Goto { .. } | Stmt::Switch { .. } | Stmt::Return(_) => {}
        }
    }

    fn process_rhs(&mut self, program: &Program, method: MethodId, loc: StmtLoc, lhs: Option<VarId>, rhs: &Expr) {
        match rhs {
            Expr::IntConst(_) | Expr::BinOp(..) => {}
            Expr::Var(rhs_var) => {
                if let Some(lhs) = lhs {
                    self.add_pfg_edge(Pointer::Var(*rhs_var), Pointer::Var(lhs), PfgEdgeKind::Assign);
                }
            }
            Expr::New(class) => {
                if let Some(lhs) = lhs {
                    let obj = self.heap_model.alloc(*class, loc);
                    self.add_pts(Pointer::Var(lhs), obj);
                }
            }
            Expr::InstanceFieldLoad(base, field) => {
                if let Some(lhs) = lhs {
                    self.instance_loads.entry(*base).or_default().push((*field, lhs));
                    if let Some(pts) = self.pt_snapshot(Pointer::Var(*base)) {
                        self.wire_instance_load(*field, lhs, &pts);
                    }
                }
            }
            Expr::StaticFieldLoad(field) => {
                if let Some(lhs) = lhs {
                    self.add_pfg_edge(Pointer::StaticField(field.class, field.field), Pointer::Var(lhs), PfgEdgeKind::Load);
                }
            }
            Expr::ArrayLoad(base, _index) => {
                if let Some(lhs) = lhs {
                    self.array_loads.entry(*base).or_default().push(lhs);
                    if let Some(pts) = self.pt_snapshot(Pointer::Var(*base)) {
                        self.wire_array_load(lhs, &pts);
                    }
                }
            }
            Expr::Call { kind, args } => self.process_call(program, method, loc, kind, args, lhs),
        }
    }

    fn process_call(
        &mut self,
        program: &Program,
        _method: MethodId,
        loc: StmtLoc,
        kind: &CallKind,
        args: &[VarId],
        ret: Option<VarId>,
    ) {
        match kind {
            CallKind::Static(callee) => {
                self.dispatch_call(program, loc, CallEdgeKind::Static, *callee, None, args, ret);
            }
            CallKind::Special(callee) => {
                self.dispatch_call(program, loc, CallEdgeKind::Special, *callee, None, args, ret);
            }
            CallKind::Virtual { receiver, declared_class, subsignature } => {
                let edge_kind = if program.class_hierarchy.is_interface(*declared_class) {
                    CallEdgeKind::Interface
                } else {
                    CallEdgeKind::Virtual
                };
                self.virtual_calls.entry(*receiver).or_default().push(PendingVirtualCall {
                    site: loc,
                    edge_kind,
                    subsignature: subsignature.clone(),
                    args: args.to_vec(),
                    ret,
                });
                if let Some(pts) = self.pt_snapshot(Pointer::Var(*receiver)) {
                    self.resolve_virtual_targets(program, loc, edge_kind, subsignature, &pts, args, ret);
                }
            }
        }
    }

    fn resolve_virtual_targets(
        &mut self,
        program: &Program,
        loc: StmtLoc,
        edge_kind: CallEdgeKind,
        subsignature: &Subsignature,
        receiver_pts: &HybridPointsToSet<ObjId>,
        args: &[VarId],
        ret: Option<VarId>,
    ) {
        for obj in receiver_pts.iter() {
            let class = self.heap_model.obj(obj).class;
            if let Some(callee) = program.class_hierarchy.resolve_method(class, subsignature) {
                self.dispatch_call(program, loc, edge_kind, callee, Some(obj), args, ret);
            }
        }
    }

    fn dispatch_call(
        &mut self,
        program: &Program,
        loc: StmtLoc,
        edge_kind: CallEdgeKind,
        callee: MethodId,
        receiver_obj: Option<ObjId>,
        args: &[VarId],
        ret: Option<VarId>,
    ) {
        let is_new_edge = self.call_graph.add_edge(loc, edge_kind, callee);
        if is_new_edge {
            debug!("{:?}: new call-graph edge to {:?}", loc, callee);
        }
        self.add_reachable(callee);
        let callee_method = program.method(callee);
        if let (Some(obj), Some(this_var)) = (receiver_obj, callee_method.this_var) {
            self.add_pts(Pointer::Var(this_var), obj);
        }
        for (formal, actual) in callee_method.params.iter().zip(args.iter()) {
            self.add_pfg_edge(Pointer::Var(*actual), Pointer::Var(*formal), PfgEdgeKind::Assign);
        }
        if let Some(ret_var) = ret {
            for stmt in &callee_method.stmts {
                if let Stmt::Return(Some(returned)) = stmt {
                    self.add_pfg_edge(Pointer::Var(*returned), Pointer::Var(ret_var), PfgEdgeKind::Assign);
                }
            }
        }
    }

    fn wire_instance_load(&mut self, field: FieldRef, lhs: VarId, pts: &HybridPointsToSet<ObjId>) {
        for obj in pts.iter() {
            self.add_pfg_edge(Pointer::InstanceField(obj, field.field), Pointer::Var(lhs), PfgEdgeKind::Load);
        }
    }

    fn wire_instance_store(&mut self, field: FieldRef, value: VarId, pts: &HybridPointsToSet<ObjId>) {
        for obj in pts.iter() {
            self.add_pfg_edge(Pointer::Var(value), Pointer::InstanceField(obj, field.field), PfgEdgeKind::Store);
        }
    }

    fn wire_array_load(&mut self, lhs: VarId, pts: &HybridPointsToSet<ObjId>) {
        for obj in pts.iter() {
            self.add_pfg_edge(Pointer::ArrayElem(obj), Pointer::Var(lhs), PfgEdgeKind::Load);
        }
    }

    fn wire_array_store(&mut self, value: VarId, pts: &HybridPointsToSet<ObjId>) {
        for obj in pts.iter() {
            self.add_pfg_edge(Pointer::Var(value), Pointer::ArrayElem(obj), PfgEdgeKind::Store);
        }
    }

    /// Registers a PFG edge and, if it is new, seeds the target with
    /// whatever the source already points to.
    fn add_pfg_edge(&mut self, from: Pointer, to: Pointer, kind: PfgEdgeKind) {
        if !self.pfg.add_edge(from, to, kind) {
            return;
        }
        if let Some(pts) = self.pt_snapshot(from) {
            if !pts.is_empty() {
                self.pt.add_to_diff(to, &pts);
                self.enqueue(to);
            }
        }
    }

    fn add_pts(&mut self, pointer: Pointer, obj: ObjId) {
        let mut singleton = HybridPointsToSet::new();
        singleton.insert(obj);
        if self.pt.add_to_diff(pointer, &singleton) {
            self.enqueue(pointer);
        }
    }

    fn pt_snapshot(&self, pointer: Pointer) -> Option<HybridPointsToSet<ObjId>> {
        let pts = self.pt.pts_of(pointer);
        if pts.is_empty() {
            None
        } else {
            Some(pts)
        }
    }

    fn enqueue(&mut self, pointer: Pointer) {
        self.worklist.push_back(pointer);
    }

    /// Propagates `diff` to every PFG successor of `pointer`.
    fn propagate(&mut self, pointer: Pointer, diff: &HybridPointsToSet<ObjId>) {
        let successors: Vec<Pointer> = self.pfg.successors(pointer).collect();
        for succ in successors {
            if self.pt.add_to_diff(succ, diff) {
                self.enqueue(succ);
            }
        }
    }

    /// A variable's points-to set grew: re-evaluate every field
    /// access/virtual call that uses it as a base/receiver, since those
    /// only become well defined once we know what it points to.
    fn handle_var_growth(&mut self, var: VarId, diff: &HybridPointsToSet<ObjId>) {
        if let Some(loads) = self.instance_loads.get(&var).cloned() {
            for (field, lhs) in loads {
                self.wire_instance_load(field, lhs, diff);
            }
        }
        if let Some(stores) = self.instance_stores.get(&var).cloned() {
            for (field, value) in stores {
                self.wire_instance_store(field, value, diff);
            }
        }
        if let Some(loads) = self.array_loads.get(&var).cloned() {
            for lhs in loads {
                self.wire_array_load(lhs, diff);
            }
        }
        if let Some(stores) = self.array_stores.get(&var).cloned() {
            for value in stores {
                self.wire_array_store(value, diff);
            }
        }
        if let Some(calls) = self.virtual_calls.get(&var).cloned() {
            let program = self.program;
            for call in calls {
                self.resolve_virtual_targets(program, call.site, call.edge_kind, &call.subsignature, diff, &call.args, call.ret);
            }
        }
    }
}

pub struct AndersenResult {
    call_graph: CallGraph<MethodId>,
    pt: DiffPTData<Pointer, ObjId>,
    pfg: PointerFlowGraph<Pointer>,
}

impl PointerAnalysisResult for AndersenResult {
    type Node = MethodId;

    fn pts_of_var(&self, var: VarId) -> HybridPointsToSet<ObjId> {
        self.pt.pts_of(Pointer::Var(var))
    }

    fn call_graph(&self) -> &CallGraph<MethodId> {
        &self.call_graph
    }
}

impl AndersenResult {
    pub fn pfg(&self) -> &PointerFlowGraph<Pointer> {
        &self.pfg
    }

    /// `(#pointers with a non-empty points-to set, #points-to relations)`.
    pub fn pts_stats(&self) -> (usize, usize) {
        let mut num_pointers = 0;
        let mut num_relations = 0;
        for pointer in self.pt.pointers() {
            num_pointers += 1;
            num_relations += self.pt.pts_of(pointer).count();
        }
        (num_pointers, num_relations)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::class_hierarchy::{Class, ClassHierarchy, ClassId};
    use crate::ir::heap::AllocSiteHeapModel;
    use crate::ir::method::Method;
    use crate::ir::stmt::VarType;
    use crate::util::options::AnalysisOptions;
    use std::collections::HashMap as Map;

    #[test]
    fn new_object_flows_through_assignment() {
        // class A {} ; void main() { v0 = new A(); v1 = v0; }
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

        let v0 = VarId::new(0);
        let v1 = VarId::new(1);
        let main_id = MethodId::new(0);
        let main = Method {
            id: main_id,
            declaring_class: a_class,
            subsignature: Subsignature::new("main", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types: vec![VarType::Ref, VarType::Ref],
            stmts: vec![
                Stmt::Assign { lhs: v0, rhs: Expr::New(a_class) },
                Stmt::Assign { lhs: v1, rhs: Expr::Var(v0) },
                Stmt::Return(None),
            ],
        };
        let program = Program::new(hierarchy, vec![main], main_id);
        let mut ctx = AnalysisContext::new(program, AllocSiteHeapModel::new(), AnalysisOptions::default());
        let result = AndersenPTA::new(&mut ctx).solve();

        assert_eq!(result.pts_of_var(v0).count(), 1);
        assert_eq!(result.pts_of_var(v1).count(), 1);
        assert_eq!(
            result.pts_of_var(v0).iter().next(),
            result.pts_of_var(v1).iter().next()
        );
    }

    #[test]
    fn dispatched_instance_call_binds_this_to_the_receiver_object() {
        // class A { A self() { return this; } }
        // void main() { v0 = new A(); v1 = v0.self(); }
        // Without binding `this` to the receiver object, `self`'s `return
        // this` has an empty points-to set and v1 never picks up v0's object.
        let a_class = ClassId::new(0);
        let self_sig = Subsignature::new("self", 0);
        let self_id = MethodId::new(0);
        let main_id = MethodId::new(1);

        let this_var = VarId::new(0);
        let self_method = Method {
            id: self_id,
            declaring_class: a_class,
            subsignature: self_sig.clone(),
            is_static: false,
            is_abstract: false,
            is_external: false,
            this_var: Some(this_var),
            params: vec![],
            var_types: vec![VarType::Ref],
            stmts: vec![Stmt::Return(Some(this_var))],
        };

        let classes = vec![Class {
            id: a_class,
            name: "A".into(),
            is_interface: false,
            is_abstract: false,
            superclass: None,
            interfaces: vec![],
            declared_methods: Map::from([(self_sig.clone(), self_id)]),
        }];
        let hierarchy = ClassHierarchy::new(classes);

        // Distinct from `this_var`: the CI solver keys pointers on bare
        // `VarId`, so a variable-id clash across two methods would
        // collide in the points-to store the same way a clash within one
        // method would.
        let v0 = VarId::new(1);
        let v1 = VarId::new(2);
        let main = Method {
            id: main_id,
            declaring_class: a_class,
            subsignature: Subsignature::new("main", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types: vec![VarType::Ref, VarType::Ref, VarType::Ref],
            stmts: vec![
                Stmt::Assign { lhs: v0, rhs: Expr::New(a_class) },
                Stmt::Assign {
                    lhs: v1,
                    rhs: Expr::Call {
                        kind: CallKind::Virtual { receiver: v0, declared_class: a_class, subsignature: self_sig },
                        args: vec![],
                    },
                },
                Stmt::Return(None),
            ],
        };
        let program = Program::new(hierarchy, vec![self_method, main], main_id);
        let mut ctx = AnalysisContext::new(program, AllocSiteHeapModel::new(), AnalysisOptions::default());
        let result = AndersenPTA::new(&mut ctx).solve();

        assert_eq!(result.pts_of_var(this_var).count(), 1, "this_var must be seeded with the receiver object");
        assert_eq!(result.pts_of_var(v1).count(), 1);
        assert_eq!(result.pts_of_var(v0).iter().next(), result.pts_of_var(v1).iter().next());
    }
}
