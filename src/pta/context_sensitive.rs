// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-sensitive Andersen points-to analysis: the same
//! worklist shape as [`crate::pta::andersen`], but every pointer and
//! object carries a [`ContextId`] interned through [`CSManager`], and the
//! callee context at each call site is decided by a pluggable
//! [`ContextSelector`] rather than hardcoded.
//!
//! The solver also accepts [`PtaObserver`]s, notified every time a
//! pointer's points-to set grows and every time a call site's callee
//! settles; the taint analyzer registers itself as one instead of
//! re-deriving points-to facts after the fact.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};

use crate::graph::call_graph::{CallEdgeKind, CallGraph, CallGraphNode};
use crate::graph::pfg::PfgEdgeKind;
use crate::ir::analysis_context::AnalysisContext;
use crate::ir::context::{ContextCache, ContextId};
use crate::ir::heap::{HeapModel, ObjId};
use crate::ir::method::{MethodId, Program, StmtLoc, VarId};
use crate::ir::stmt::{CallKind, Expr, FieldId, FieldRef, Stmt, Subsignature};
use crate::pta::context_selector::ContextSelector;
use crate::pta::cs_manager::{CSManager, CSObjId, CSVarId};
use crate::pta::PointerAnalysisResult;
use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet};
use crate::pts_set::pt_data::DiffPTData;

/// A context-sensitive call-graph node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CSMethod {
    pub context: ContextId,
    pub method: MethodId,
}

impl CallGraphNode for CSMethod {
    fn method(&self) -> MethodId {
        self.method
    }
}

/// A context-sensitive pointer: variables and heap locations are both
/// qualified by the interned context they were reached under.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CSPointer {
    Var(CSVarId),
    InstanceField(CSObjId, FieldId),
    /// Static fields have exactly one slot program-wide; context adds no
    /// precision there, so they stay unqualified like the CI solver.
    StaticField(crate::ir::class_hierarchy::ClassId, FieldId),
    ArrayElem(CSObjId),
}

/// A request an observer hands back to the solver because the observer
/// itself cannot mutate the solver's points-to store or heap model: only
/// the solver can actually synthesize a pseudo-object or add one to a
/// pointer's points-to set.
pub enum PtaAction {
    /// Add an already-interned object to `target`'s points-to set.
    Inject { target: CSVarId, obj: CSObjId },
    /// Synthesize a fresh object of `class` with no allocation site and
    /// add it to `target`'s points-to set. `tag` is opaque to the solver
    /// and echoed back through [`PtaObserver::on_synthesized`] so the
    /// observer can recognize the resulting id later.
    Synthesize { target: CSVarId, class: crate::ir::class_hierarchy::ClassId, tag: StmtLoc },
}

/// Notified whenever a context-sensitive variable's points-to set gains
/// new objects, so an overlay analysis (taint) can react without
/// re-walking the completed result.
pub trait PtaObserver {
    fn on_new_pts(&mut self, cs_var: CSVarId, var: VarId, ctx: ContextId, added: &HybridPointsToSet<CSObjId>, cs_manager: &CSManager) -> Vec<PtaAction> {
        let _ = (cs_var, var, ctx, added, cs_manager);
        Vec::new()
    }

    /// Called once a call site's callee has settled (virtual dispatch
    /// resolved to a concrete target, or a static/special call recognized
    /// immediately), with every call-relevant variable already qualified
    /// into the caller's context. `base` is the receiver variable for a
    /// virtual call, `None` for static/special.
    fn on_call_resolved(
        &mut self,
        callee: MethodId,
        call_site: StmtLoc,
        base: Option<CSVarId>,
        args: &[CSVarId],
        ret: Option<CSVarId>,
        cs_manager: &CSManager,
    ) -> Vec<PtaAction> {
        let _ = (callee, call_site, base, args, ret, cs_manager);
        Vec::new()
    }

    /// Echoes back the object a [`PtaAction::Synthesize`] this observer
    /// requested was actually interned as, so the observer can track its
    /// own provenance for it (e.g. which source call produced it).
    fn on_synthesized(&mut self, _obj: CSObjId, _target: CSVarId, _tag: StmtLoc) {}
}

struct PendingVirtualCall {
    caller_ctx: ContextId,
    site: StmtLoc,
    edge_kind: CallEdgeKind,
    subsignature: Subsignature,
    receiver: VarId,
    args: Vec<VarId>,
    ret: Option<VarId>,
}

pub struct ContextSensitivePTA<'a, H: HeapModel, S: ContextSelector> {
    program: &'a Program,
    heap_model: &'a mut H,
    selector: S,
    ctx_cache: ContextCache,
    cs_manager: CSManager,

    call_graph: CallGraph<CSMethod>,
    pfg: crate::graph::pfg::PointerFlowGraph<CSPointer>,
    pt: DiffPTData<CSPointer, CSObjId>,
    worklist: VecDeque<CSPointer>,

    instance_loads: HashMap<CSVarId, Vec<(FieldRef, CSVarId)>>,
    instance_stores: HashMap<CSVarId, Vec<(FieldRef, CSVarId)>>,
    array_loads: HashMap<CSVarId, Vec<CSVarId>>,
    array_stores: HashMap<CSVarId, Vec<CSVarId>>,
    virtual_calls: HashMap<CSVarId, Vec<PendingVirtualCall>>,

    processed: HashSet<CSMethod>,
    observers: Vec<Box<dyn PtaObserver>>,
}

impl<'a, H: HeapModel, S: ContextSelector> ContextSensitivePTA<'a, H, S> {
    pub fn new(ctx: &'a mut AnalysisContext<H>, selector: S) -> Self {
        ContextSensitivePTA {
            program: &ctx.program,
            heap_model: &mut ctx.heap_model,
            selector,
            ctx_cache: ContextCache::new(),
            cs_manager: CSManager::new(),
            call_graph: CallGraph::new(),
            pfg: crate::graph::pfg::PointerFlowGraph::new(),
            pt: DiffPTData::new(),
            worklist: VecDeque::new(),
            instance_loads: HashMap::new(),
            instance_stores: HashMap::new(),
            array_loads: HashMap::new(),
            array_stores: HashMap::new(),
            virtual_calls: HashMap::new(),
            processed: HashSet::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn PtaObserver>) {
        self.observers.push(observer);
    }

    pub fn solve(mut self) -> ContextSensitiveResult {
        let entry_ctx = self.ctx_cache.empty_context();
        let entry = CSMethod { context: entry_ctx, method: self.program.entry_method };
        self.add_reachable(entry);

        while let Some(pointer) = self.worklist.pop_front() {
            let diff = self.pt.flush_diff(pointer);
            if diff.is_empty() {
                continue;
            }
            self.propagate(pointer, &diff);
            if let CSPointer::Var(cs_var) = pointer {
                self.notify_observers(cs_var, &diff);
                self.handle_var_growth(cs_var, &diff);
            }
        }

        info!(
            "context-sensitive points-to analysis reached fixpoint: {} reachable (context, method) pairs",
            self.call_graph.num_reachable()
        );
        ContextSensitiveResult {
            call_graph: self.call_graph,
            pt: self.pt,
            pfg: self.pfg,
            cs_manager: self.cs_manager,
            ctx_cache: self.ctx_cache,
        }
    }

    fn notify_observers(&mut self, cs_var: CSVarId, diff: &HybridPointsToSet<CSObjId>) {
        let (ctx, var) = self.cs_manager.base_var(cs_var);
        let mut actions = Vec::new();
        for observer in &mut self.observers {
            actions.extend(observer.on_new_pts(cs_var, var, ctx, diff, &self.cs_manager));
        }
        self.apply_actions(actions);
    }

    fn notify_call_resolved(&mut self, callee: MethodId, call_site: StmtLoc, base: Option<CSVarId>, args: &[CSVarId], ret: Option<CSVarId>) {
        let mut actions = Vec::new();
        for observer in &mut self.observers {
            actions.extend(observer.on_call_resolved(callee, call_site, base, args, ret, &self.cs_manager));
        }
        self.apply_actions(actions);
    }

    fn apply_actions(&mut self, actions: Vec<PtaAction>) {
        for action in actions {
            match action {
                PtaAction::Inject { target, obj } => self.add_cs_pts(target, obj),
                PtaAction::Synthesize { target, class, tag } => {
                    let obj = self.heap_model.synthetic(class);
                    let empty_ctx = self.ctx_cache.empty_context();
                    let cs_obj = self.cs_manager.cs_obj(empty_ctx, obj);
                    self.add_cs_pts(target, cs_obj);
                    for observer in &mut self.observers {
                        observer.on_synthesized(cs_obj, target, tag);
                    }
                }
            }
        }
    }

    fn add_reachable(&mut self, node: CSMethod) {
        if !self.call_graph.add_reachable(node) {
            return;
        }
        if !self.processed.insert(node) {
            return;
        }
        let program = self.program;
        let m = program.method(node.method);
        if m.is_abstract || m.is_external {
            return;
        }
        for (i, stmt) in m.stmts.iter().enumerate() {
            self.process_stmt(program, node, StmtLoc::new(node.method, i as u32), stmt);
        }
    }

    fn process_stmt(&mut self, program: &Program, node: CSMethod, loc: StmtLoc, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { lhs, rhs } => self.process_rhs(program, node, loc, Some(*lhs), rhs),
            Stmt::CallStmt { call } => self.process_rhs(program, node, loc, None, call),
            Stmt::StoreInstanceField { base, field, value } => {
                let base_cs = self.cs_manager.cs_var(node.context, *base);
                let value_cs = self.cs_manager.cs_var(node.context, *value);
                self.instance_stores.entry(base_cs).or_default().push((*field, value_cs));
                if let Some(pts) = self.pt_snapshot(CSPointer::Var(base_cs)) {
                    self.wire_instance_store(*field, value_cs, &pts);
                }
            }
            Stmt::StoreStaticField { field, value } => {
                let value_cs = self.cs_manager.cs_var(node.context, *value);
                self.add_pfg_edge(CSPointer::Var(value_cs), CSPointer::StaticField(field.class, field.field), PfgEdgeKind::Store);
            }
            Stmt::StoreArray { base, index: _, value } => {
                let base_cs = self.cs_manager.cs_var(node.context, *base);
                let value_cs = self.cs_manager.cs_var(node.context, *value);
                self.array_stores.entry(base_cs).or_default().push(value_cs);
                if let Some(pts) = self.pt_snapshot(CSPointer::Var(base_cs)) {
                    self.wire_array_store(value_cs, &pts);
                }
            }
            Stmt::If { .. } | Stmt::Goto { .. } | Stmt::Switch { .. } | Stmt::Return(_) => {}
        }
    }

    fn process_rhs(&mut self, program: &Program, node: CSMethod, loc: StmtLoc, lhs: Option<VarId>, rhs: &Expr) {
        match rhs {
            Expr::IntConst(_) | Expr::BinOp(..) => {}
            Expr::Var(rhs_var) => {
                if let Some(lhs) = lhs {
                    let rhs_cs = self.cs_manager.cs_var(node.context, *rhs_var);
                    let lhs_cs = self.cs_manager.cs_var(node.context, lhs);
                    self.add_pfg_edge(CSPointer::Var(rhs_cs), CSPointer::Var(lhs_cs), PfgEdgeKind::Assign);
                }
            }
            Expr::New(class) => {
                if let Some(lhs) = lhs {
                    let heap_ctx = self.selector.select_heap_context(&mut self.ctx_cache, node.context, loc);
                    let obj = self.heap_model.alloc(*class, loc);
                    let cs_obj = self.cs_manager.cs_obj(heap_ctx, obj);
                    let lhs_cs = self.cs_manager.cs_var(node.context, lhs);
                    self.add_cs_pts(lhs_cs, cs_obj);
                }
            }
            Expr::InstanceFieldLoad(base, field) => {
                if let Some(lhs) = lhs {
                    let base_cs = self.cs_manager.cs_var(node.context, *base);
                    let lhs_cs = self.cs_manager.cs_var(node.context, lhs);
                    self.instance_loads.entry(base_cs).or_default().push((*field, lhs_cs));
                    if let Some(pts) = self.pt_snapshot(CSPointer::Var(base_cs)) {
                        self.wire_instance_load(*field, lhs_cs, &pts);
                    }
                }
            }
            Expr::StaticFieldLoad(field) => {
                if let Some(lhs) = lhs {
                    let lhs_cs = self.cs_manager.cs_var(node.context, lhs);
                    self.add_pfg_edge(CSPointer::StaticField(field.class, field.field), CSPointer::Var(lhs_cs), PfgEdgeKind::Load);
                }
            }
            Expr::ArrayLoad(base, _index) => {
                if let Some(lhs) = lhs {
                    let base_cs = self.cs_manager.cs_var(node.context, *base);
                    let lhs_cs = self.cs_manager.cs_var(node.context, lhs);
                    self.array_loads.entry(base_cs).or_default().push(lhs_cs);
                    if let Some(pts) = self.pt_snapshot(CSPointer::Var(base_cs)) {
                        self.wire_array_load(lhs_cs, &pts);
                    }
                }
            }
            Expr::Call { kind, args } => self.process_call(program, node, loc, kind, args, lhs),
        }
    }

    fn process_call(&mut self, program: &Program, node: CSMethod, loc: StmtLoc, kind: &CallKind, args: &[VarId], ret: Option<VarId>) {
        match kind {
            CallKind::Static(callee) => {
                let callee_ctx = self.selector.select_context(&mut self.ctx_cache, node.context, loc, *callee, None);
                self.dispatch_call(program, node, loc, CallEdgeKind::Static, CSMethod { context: callee_ctx, method: *callee }, None, None, args, ret);
            }
            CallKind::Special(callee) => {
                let callee_ctx = self.selector.select_context(&mut self.ctx_cache, node.context, loc, *callee, None);
                self.dispatch_call(program, node, loc, CallEdgeKind::Special, CSMethod { context: callee_ctx, method: *callee }, None, None, args, ret);
            }
            CallKind::Virtual { receiver, declared_class, subsignature } => {
                let edge_kind = if program.class_hierarchy.is_interface(*declared_class) {
                    CallEdgeKind::Interface
                } else {
                    CallEdgeKind::Virtual
                };
                let receiver_cs = self.cs_manager.cs_var(node.context, *receiver);
                self.virtual_calls.entry(receiver_cs).or_default().push(PendingVirtualCall {
                    caller_ctx: node.context,
                    site: loc,
                    edge_kind,
                    subsignature: subsignature.clone(),
                    receiver: *receiver,
                    args: args.to_vec(),
                    ret,
                });
                if let Some(pts) = self.pt_snapshot(CSPointer::Var(receiver_cs)) {
                    self.resolve_virtual_targets(program, node, loc, edge_kind, subsignature, *receiver, &pts, args, ret);
                }
            }
        }
    }

    fn resolve_virtual_targets(
        &mut self,
        program: &Program,
        node: CSMethod,
        loc: StmtLoc,
        edge_kind: CallEdgeKind,
        subsignature: &Subsignature,
        receiver: VarId,
        receiver_pts: &HybridPointsToSet<CSObjId>,
        args: &[VarId],
        ret: Option<VarId>,
    ) {
        for cs_obj in receiver_pts.iter() {
            let (obj_ctx, obj) = self.cs_manager.base_obj(cs_obj);
            let class = self.heap_model.obj(obj).class;
            if let Some(callee) = program.class_hierarchy.resolve_method(class, subsignature) {
                let callee_ctx =
                    self.selector.select_context(&mut self.ctx_cache, node.context, loc, callee, Some((obj_ctx, obj)));
                self.dispatch_call(
                    program,
                    node,
                    loc,
                    edge_kind,
                    CSMethod { context: callee_ctx, method: callee },
                    Some(receiver),
                    Some(cs_obj),
                    args,
                    ret,
                );
            }
        }
    }

    fn dispatch_call(
        &mut self,
        program: &Program,
        caller: CSMethod,
        loc: StmtLoc,
        edge_kind: CallEdgeKind,
        callee: CSMethod,
        receiver: Option<VarId>,
        receiver_obj: Option<CSObjId>,
        args: &[VarId],
        ret: Option<VarId>,
    ) {
        if self.call_graph.add_edge(loc, edge_kind, callee) {
            debug!("{:?}: new CS call-graph edge to {:?}", loc, callee);
        }
        self.add_reachable(callee);
        let callee_method = program.method(callee.method);
        if let (Some(cs_obj), Some(this_var)) = (receiver_obj, callee_method.this_var) {
            let this_var_cs = self.cs_manager.cs_var(callee.context, this_var);
            self.add_cs_pts(this_var_cs, cs_obj);
        }
        let args_cs: Vec<CSVarId> = args.iter().map(|actual| self.cs_manager.cs_var(caller.context, *actual)).collect();
        for (formal, actual_cs) in callee_method.params.iter().zip(args_cs.iter()) {
            let formal_cs = self.cs_manager.cs_var(callee.context, *formal);
            self.add_pfg_edge(CSPointer::Var(*actual_cs), CSPointer::Var(formal_cs), PfgEdgeKind::Assign);
        }
        let ret_cs = ret.map(|ret_var| self.cs_manager.cs_var(caller.context, ret_var));
        if let Some(ret_cs) = ret_cs {
            for stmt in &callee_method.stmts {
                if let Stmt::Return(Some(returned)) = stmt {
                    let returned_cs = self.cs_manager.cs_var(callee.context, *returned);
                    self.add_pfg_edge(CSPointer::Var(returned_cs), CSPointer::Var(ret_cs), PfgEdgeKind::Assign);
                }
            }
        }
        let base_cs = receiver.map(|r| self.cs_manager.cs_var(caller.context, r));
        self.notify_call_resolved(callee.method, loc, base_cs, &args_cs, ret_cs);
    }

    fn wire_instance_load(&mut self, field: FieldRef, lhs_cs: CSVarId, pts: &HybridPointsToSet<CSObjId>) {
        for cs_obj in pts.iter() {
            self.add_pfg_edge(CSPointer::InstanceField(cs_obj, field.field), CSPointer::Var(lhs_cs), PfgEdgeKind::Load);
        }
    }

    fn wire_instance_store(&mut self, field: FieldRef, value_cs: CSVarId, pts: &HybridPointsToSet<CSObjId>) {
        for cs_obj in pts.iter() {
            self.add_pfg_edge(CSPointer::Var(value_cs), CSPointer::InstanceField(cs_obj, field.field), PfgEdgeKind::Store);
        }
    }

    fn wire_array_load(&mut self, lhs_cs: CSVarId, pts: &HybridPointsToSet<CSObjId>) {
        for cs_obj in pts.iter() {
            self.add_pfg_edge(CSPointer::ArrayElem(cs_obj), CSPointer::Var(lhs_cs), PfgEdgeKind::Load);
        }
    }

    fn wire_array_store(&mut self, value_cs: CSVarId, pts: &HybridPointsToSet<CSObjId>) {
        for cs_obj in pts.iter() {
            self.add_pfg_edge(CSPointer::Var(value_cs), CSPointer::ArrayElem(cs_obj), PfgEdgeKind::Store);
        }
    }

    fn add_pfg_edge(&mut self, from: CSPointer, to: CSPointer, kind: PfgEdgeKind) {
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

    fn add_cs_pts(&mut self, cs_var: CSVarId, cs_obj: CSObjId) {
        let mut singleton = HybridPointsToSet::new();
        singleton.insert(cs_obj);
        if self.pt.add_to_diff(CSPointer::Var(cs_var), &singleton) {
            self.enqueue(CSPointer::Var(cs_var));
        }
    }

    fn pt_snapshot(&self, pointer: CSPointer) -> Option<HybridPointsToSet<CSObjId>> {
        let pts = self.pt.pts_of(pointer);
        if pts.is_empty() {
            None
        } else {
            Some(pts)
        }
    }

    fn enqueue(&mut self, pointer: CSPointer) {
        self.worklist.push_back(pointer);
    }

    fn propagate(&mut self, pointer: CSPointer, diff: &HybridPointsToSet<CSObjId>) {
        let successors: Vec<CSPointer> = self.pfg.successors(pointer).collect();
        for succ in successors {
            if self.pt.add_to_diff(succ, diff) {
                self.enqueue(succ);
            }
        }
    }

    fn handle_var_growth(&mut self, cs_var: CSVarId, diff: &HybridPointsToSet<CSObjId>) {
        if let Some(loads) = self.instance_loads.get(&cs_var).cloned() {
            for (field, lhs_cs) in loads {
                self.wire_instance_load(field, lhs_cs, diff);
            }
        }
        if let Some(stores) = self.instance_stores.get(&cs_var).cloned() {
            for (field, value_cs) in stores {
                self.wire_instance_store(field, value_cs, diff);
            }
        }
        if let Some(loads) = self.array_loads.get(&cs_var).cloned() {
            for lhs_cs in loads {
                self.wire_array_load(lhs_cs, diff);
            }
        }
        if let Some(stores) = self.array_stores.get(&cs_var).cloned() {
            for value_cs in stores {
                self.wire_array_store(value_cs, diff);
            }
        }
        if let Some(calls) = self.virtual_calls.get(&cs_var).cloned() {
            let program = self.program;
            for call in calls {
                let node = CSMethod { context: call.caller_ctx, method: call.site.method };
                self.resolve_virtual_targets(program, node, call.site, call.edge_kind, &call.subsignature, call.receiver, diff, &call.args, call.ret);
            }
        }
    }
}

pub struct ContextSensitiveResult {
    call_graph: CallGraph<CSMethod>,
    pt: DiffPTData<CSPointer, CSObjId>,
    pfg: crate::graph::pfg::PointerFlowGraph<CSPointer>,
    cs_manager: CSManager,
    ctx_cache: ContextCache,
}

impl ContextSensitiveResult {
    pub fn context_cache(&self) -> &ContextCache {
        &self.ctx_cache
    }

    pub fn cs_manager(&self) -> &CSManager {
        &self.cs_manager
    }

    /// `(#context-qualified pointers with a non-empty points-to set,
    /// #points-to relations)`, the precision-sensitive view.
    pub fn pts_stats(&self) -> (usize, usize) {
        let mut num_pointers = 0;
        let mut num_relations = 0;
        for pointer in self.pt.pointers() {
            num_pointers += 1;
            num_relations += self.pt.pts_of(pointer).count();
        }
        (num_pointers, num_relations)
    }

    /// The same points-to relations collapsed by dropping context from
    /// every variable and object, the view a context-insensitive analysis
    /// of the same program would have produced.
    pub fn ci_pts_stats(&self) -> (usize, usize) {
        let mut collapsed: HashMap<VarId, HybridPointsToSet<ObjId>> = HashMap::new();
        for pointer in self.pt.pointers() {
            let CSPointer::Var(cs_var) = pointer else { continue };
            let (_, var) = self.cs_manager.base_var(cs_var);
            let entry = collapsed.entry(var).or_insert_with(HybridPointsToSet::new);
            for cs_obj in self.pt.pts_of(pointer).iter() {
                let (_, obj) = self.cs_manager.base_obj(cs_obj);
                entry.insert(obj);
            }
        }
        let num_pointers = collapsed.len();
        let num_relations = collapsed.values().map(|pts| pts.count()).sum();
        (num_pointers, num_relations)
    }

    pub fn pfg(&self) -> &crate::graph::pfg::PointerFlowGraph<CSPointer> {
        &self.pfg
    }

    /// The points-to set of one context-qualified variable, without
    /// collapsing away its context.
    pub fn pts_of_cs_var(&self, cs_var: CSVarId) -> HybridPointsToSet<CSObjId> {
        self.pt.pts_of(CSPointer::Var(cs_var))
    }
}


impl PointerAnalysisResult for ContextSensitiveResult {
    type Node = CSMethod;

    /// Collapses every context a variable was analyzed under into one
    /// set, the standard "context-insensitive view" of a CS result.
    fn pts_of_var(&self, var: VarId) -> HybridPointsToSet<ObjId> {
        let mut result = HybridPointsToSet::new();
        for cs_var in self.cs_manager.vars_for(var) {
            for cs_obj in self.pt.pts_of(CSPointer::Var(cs_var)).iter() {
                let (_, obj) = self.cs_manager.base_obj(cs_obj);
                result.insert(obj);
            }
        }
        result
    }

    fn call_graph(&self) -> &CallGraph<CSMethod> {
        &self.call_graph
    }
}
