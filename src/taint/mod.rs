// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Taint-flow analysis layered on the context-sensitive points-to
//! solver as a [`PtaObserver`], rather than folded into it: the solver
//! stays ignorant of sources, sinks and transfers, and only exposes the
//! two hooks (a pointer's points-to set growing, a call site's callee
//! settling) an overlay needs.
//!
//! A [`TaintConfig`] names sources, sinks and transfers by method
//! identity (declaring class name plus subsignature). [`TaintManager`]
//! resolves those against a [`Program`] once, then tracks taint
//! propagation as a parallel, taint-only subset of the real points-to
//! data: a synthetic object is minted per source call (no allocation
//! site, tagged by the call site that produced it) and injected into
//! the call's result variable; whenever that object (or one reachable
//! from it through a registered transfer edge) shows up in a later
//! points-to delta, it is forwarded along every edge registered out of
//! that variable. `finish` then walks every recorded sink and reports
//! which source call's object reached it.
//!
//! Because [`PtaObserver`] callbacks only get a shared reference to the
//! solver's interning tables, an observer cannot itself synthesize an
//! object or inject it into a points-to set: it hands the solver a
//! [`PtaAction`] describing what it wants done, and the solver performs
//! the mutation and (for a synthesized object) reports back the
//! resulting id via `on_synthesized`.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::ir::class_hierarchy::ClassId;
use crate::ir::context::ContextId;
use crate::ir::method::{MethodId, Program, StmtLoc, VarId};
use crate::pta::context_sensitive::{PtaAction, PtaObserver};
use crate::pta::cs_manager::{CSManager, CSObjId, CSVarId};
use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet};

/// Names a method without relying on a already-built [`Program`]: the
/// declaring class's name plus the subsignature rupta-style IR keys
/// methods by (name, arity).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: String,
    pub name: String,
    pub num_params: usize,
}

/// One endpoint of a transfer rule: the call's receiver, its result, or
/// one of its actual arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    Base,
    Result,
    Arg(usize),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceRule {
    pub method: MethodRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SinkRule {
    pub method: MethodRef,
    pub arg: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferRule {
    pub method: MethodRef,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaintConfig {
    #[serde(default)]
    pub sources: Vec<SourceRule>,
    #[serde(default)]
    pub sinks: Vec<SinkRule>,
    #[serde(default)]
    pub transfers: Vec<TransferRule>,
}

/// A tainted value traced from its originating source call to a sink
/// argument it reached. Ordered by `(source_call, sink_call,
/// arg_index)` so a `BTreeSet<TaintFlow>` gives a deterministic report
/// regardless of worklist visitation order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct TaintFlow {
    pub source_call: StmtLoc,
    pub sink_call: StmtLoc,
    pub arg_index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct TaintResult {
    pub flows: BTreeSet<TaintFlow>,
}

fn resolve(program: &Program, method_ref: &MethodRef) -> Option<MethodId> {
    program.class_hierarchy.classes().find(|c| c.name == method_ref.class).and_then(|class| {
        class
            .declared_methods
            .iter()
            .find(|(subsig, _)| subsig.name == method_ref.name && subsig.num_params == method_ref.num_params)
            .map(|(_, &id)| id)
    })
}

/// Owns taint propagation state; registered with the points-to solver
/// through the [`PtaObserver`]-implementing [`TaintObserver`] adapter,
/// since an observer callback only ever sees `&mut self` on the adapter,
/// never on the solver holding it.
pub struct TaintManager {
    sources: HashMap<MethodId, ClassId>,
    sinks: HashMap<MethodId, Vec<usize>>,
    transfers: HashMap<MethodId, Vec<(Endpoint, Endpoint)>>,

    /// Originating call site of every synthesized taint object.
    tainted_objs: HashMap<CSObjId, StmtLoc>,
    /// Taint-only subset of each variable's points-to set.
    tainted_pts: HashMap<CSVarId, HashSet<CSObjId>>,
    /// Registered transfer edges, `from -> [to, ...]`.
    edges: HashMap<CSVarId, Vec<CSVarId>>,
    recorded_sinks: Vec<(StmtLoc, usize, CSVarId)>,
}

impl TaintManager {
    pub fn new(program: &Program, config: &TaintConfig) -> Self {
        let mut sources = HashMap::new();
        for rule in &config.sources {
            if let Some(id) = resolve(program, &rule.method) {
                sources.insert(id, program.method(id).declaring_class);
            }
        }
        let mut sinks: HashMap<MethodId, Vec<usize>> = HashMap::new();
        for rule in &config.sinks {
            if let Some(id) = resolve(program, &rule.method) {
                sinks.entry(id).or_default().push(rule.arg);
            }
        }
        let mut transfers: HashMap<MethodId, Vec<(Endpoint, Endpoint)>> = HashMap::new();
        for rule in &config.transfers {
            if let Some(id) = resolve(program, &rule.method) {
                transfers.entry(id).or_default().push((rule.from, rule.to));
            }
        }
        TaintManager {
            sources,
            sinks,
            transfers,
            tainted_objs: HashMap::new(),
            tainted_pts: HashMap::new(),
            edges: HashMap::new(),
            recorded_sinks: Vec::new(),
        }
    }

    fn endpoint_var(&self, endpoint: Endpoint, base: Option<CSVarId>, args: &[CSVarId], ret: Option<CSVarId>) -> Option<CSVarId> {
        match endpoint {
            Endpoint::Base => base,
            Endpoint::Result => ret,
            Endpoint::Arg(i) => args.get(i).copied(),
        }
    }

    fn note_new_pts(&mut self, cs_var: CSVarId, added: &HybridPointsToSet<CSObjId>) -> Vec<PtaAction> {
        let mut actions = Vec::new();
        let bucket = self.tainted_pts.entry(cs_var).or_default();
        for obj in added.iter() {
            if self.tainted_objs.contains_key(&obj) && bucket.insert(obj) {
                if let Some(targets) = self.edges.get(&cs_var) {
                    actions.extend(targets.iter().map(|&target| PtaAction::Inject { target, obj }));
                }
            }
        }
        actions
    }

    fn note_call_resolved(
        &mut self,
        callee: MethodId,
        call_site: StmtLoc,
        base: Option<CSVarId>,
        args: &[CSVarId],
        ret: Option<CSVarId>,
    ) -> Vec<PtaAction> {
        let mut actions = Vec::new();

        if let (Some(&class), Some(ret_cs)) = (self.sources.get(&callee), ret) {
            actions.push(PtaAction::Synthesize { target: ret_cs, class, tag: call_site });
        }

        if let Some(arg_indices) = self.sinks.get(&callee) {
            for &arg_index in arg_indices {
                if let Some(&arg_cs) = args.get(arg_index) {
                    self.recorded_sinks.push((call_site, arg_index, arg_cs));
                }
            }
        }

        if let Some(rules) = self.transfers.get(&callee).cloned() {
            for (from, to) in rules {
                let (Some(from_cs), Some(to_cs)) =
                    (self.endpoint_var(from, base, args, ret), self.endpoint_var(to, base, args, ret))
                else {
                    continue;
                };
                let registered = self.edges.entry(from_cs).or_default();
                if registered.contains(&to_cs) {
                    continue;
                }
                registered.push(to_cs);
                if let Some(existing) = self.tainted_pts.get(&from_cs) {
                    actions.extend(existing.iter().map(|&obj| PtaAction::Inject { target: to_cs, obj }));
                }
            }
        }

        actions
    }

    fn note_synthesized(&mut self, obj: CSObjId, target: CSVarId, tag: StmtLoc) {
        self.tainted_objs.insert(obj, tag);
        self.tainted_pts.entry(target).or_default().insert(obj);
    }

    /// Walks every recorded sink and reports each source call whose
    /// taint object reached it.
    pub fn finish(self) -> TaintResult {
        let mut flows = BTreeSet::new();
        for (sink_call, arg_index, arg_cs) in &self.recorded_sinks {
            let Some(objs) = self.tainted_pts.get(arg_cs) else { continue };
            for obj in objs {
                if let Some(&source_call) = self.tainted_objs.get(obj) {
                    flows.insert(TaintFlow { source_call, sink_call: *sink_call, arg_index: *arg_index });
                }
            }
        }
        TaintResult { flows }
    }
}

/// Shares a [`TaintManager`] between the solver (which needs a boxed
/// [`PtaObserver`] it can own) and the caller (which needs the manager
/// back afterward to call [`TaintManager::finish`]).
pub struct TaintObserver(pub Rc<RefCell<TaintManager>>);

impl PtaObserver for TaintObserver {
    fn on_new_pts(&mut self, cs_var: CSVarId, _var: VarId, _ctx: ContextId, added: &HybridPointsToSet<CSObjId>, _cs_manager: &CSManager) -> Vec<PtaAction> {
        self.0.borrow_mut().note_new_pts(cs_var, added)
    }

    fn on_call_resolved(
        &mut self,
        callee: MethodId,
        call_site: StmtLoc,
        base: Option<CSVarId>,
        args: &[CSVarId],
        ret: Option<CSVarId>,
        _cs_manager: &CSManager,
    ) -> Vec<PtaAction> {
        self.0.borrow_mut().note_call_resolved(callee, call_site, base, args, ret)
    }

    fn on_synthesized(&mut self, obj: CSObjId, target: CSVarId, tag: StmtLoc) {
        self.0.borrow_mut().note_synthesized(obj, target, tag);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::analysis_context::AnalysisContext;
    use crate::ir::class_hierarchy::{Class, ClassHierarchy};
    use crate::ir::heap::AllocSiteHeapModel;
    use crate::ir::method::Method;
    use crate::ir::stmt::{CallKind, Expr, Stmt, Subsignature, VarType};
    use crate::pta::context_selector::KCallSiteSensitive;
    use crate::pta::context_sensitive::ContextSensitivePTA;
    use crate::pta::PointerAnalysisResult;
    use crate::util::bit_vec::Idx;
    use crate::util::options::AnalysisOptions;
    use std::collections::HashMap as StdHashMap;

    fn context_insensitive() -> KCallSiteSensitive {
        KCallSiteSensitive { k: 0 }
    }

    // main(): v0 = source(); sink(v0); return
    // source() and sink(arg) are external methods with no bodies of
    // their own, matched purely by name against the taint config.
    fn build_program() -> (Program, MethodId) {
        let source_sig = Subsignature::new("source", 0);
        let sink_sig = Subsignature::new("sink", 1);
        let main_sig = Subsignature::new("main", 0);

        let source_id = MethodId::new(0);
        let sink_id = MethodId::new(1);
        let main_id = MethodId::new(2);

        let mut declared = StdHashMap::new();
        declared.insert(source_sig.clone(), source_id);
        declared.insert(sink_sig.clone(), sink_id);
        declared.insert(main_sig, main_id);

        let class_id = ClassId::new(0);
        let class = Class {
            id: class_id,
            name: "Util".to_string(),
            is_interface: false,
            is_abstract: false,
            superclass: None,
            interfaces: vec![],
            declared_methods: declared,
        };
        let hierarchy = ClassHierarchy::new(vec![class]);

        let source_method = Method {
            id: source_id,
            declaring_class: class_id,
            subsignature: source_sig,
            is_static: true,
            is_abstract: false,
            is_external: true,
            this_var: None,
            params: vec![],
            var_types: vec![],
            stmts: vec![],
        };
        let sink_method = Method {
            id: sink_id,
            declaring_class: class_id,
            subsignature: sink_sig,
            is_static: true,
            is_abstract: false,
            is_external: true,
            this_var: None,
            params: vec![VarId::new(0)],
            var_types: vec![VarType::Ref],
            stmts: vec![],
        };
        let v0 = VarId::new(0);
        let main_method = Method {
            id: main_id,
            declaring_class: class_id,
            subsignature: Subsignature::new("main", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types: vec![VarType::Ref],
            stmts: vec![
                Stmt::Assign { lhs: v0, rhs: Expr::Call { kind: CallKind::Static(source_id), args: vec![] } },
                Stmt::CallStmt { call: Expr::Call { kind: CallKind::Static(sink_id), args: vec![v0] } },
                Stmt::Return(None),
            ],
        };

        (Program::new(hierarchy, vec![source_method, sink_method, main_method], main_id), main_id)
    }

    #[test]
    fn taint_flows_from_source_call_to_sink_call() {
        let (program, main_id) = build_program();
        let config = TaintConfig {
            sources: vec![SourceRule { method: MethodRef { class: "Util".into(), name: "source".into(), num_params: 0 } }],
            sinks: vec![SinkRule { method: MethodRef { class: "Util".into(), name: "sink".into(), num_params: 1 }, arg: 0 }],
            transfers: vec![],
        };
        let manager = Rc::new(RefCell::new(TaintManager::new(&program, &config)));

        let heap_model = AllocSiteHeapModel::new();
        let mut ctx = AnalysisContext::new(program, heap_model, AnalysisOptions::default());
        let mut pta = ContextSensitivePTA::new(&mut ctx, context_insensitive());
        pta.add_observer(Box::new(TaintObserver(manager.clone())));
        let result = pta.solve();

        assert!(result.call_graph().num_reachable() >= 3);

        let taint_result = Rc::try_unwrap(manager).unwrap_or_else(|_| panic!("observer outlived solve()")).into_inner().finish();
        assert_eq!(taint_result.flows.len(), 1);
        let flow = taint_result.flows.iter().next().unwrap();
        assert_eq!(flow.arg_index, 0);
        assert_eq!(flow.source_call, StmtLoc::new(main_id, 0));
    }

    #[test]
    fn transfer_rule_forwards_taint_through_an_intermediate_call() {
        // main(): v0 = source(); v1 = wrap(v0); sink(v1)
        let source_sig = Subsignature::new("source", 0);
        let wrap_sig = Subsignature::new("wrap", 1);
        let sink_sig = Subsignature::new("sink", 1);

        let source_id = MethodId::new(0);
        let wrap_id = MethodId::new(1);
        let sink_id = MethodId::new(2);
        let main_id = MethodId::new(3);

        let mut declared = StdHashMap::new();
        declared.insert(source_sig.clone(), source_id);
        declared.insert(wrap_sig.clone(), wrap_id);
        declared.insert(sink_sig.clone(), sink_id);
        declared.insert(Subsignature::new("main", 0), main_id);

        let class_id = ClassId::new(0);
        let class = Class {
            id: class_id,
            name: "Util".to_string(),
            is_interface: false,
            is_abstract: false,
            superclass: None,
            interfaces: vec![],
            declared_methods: declared,
        };
        let hierarchy = ClassHierarchy::new(vec![class]);

        let external = |id, subsig: Subsignature, params: Vec<VarId>| Method {
            id,
            declaring_class: class_id,
            subsignature: subsig,
            is_static: true,
            is_abstract: false,
            is_external: true,
            this_var: None,
            var_types: vec![VarType::Ref; params.len()],
            params,
            stmts: vec![],
        };
        let source_method = external(source_id, source_sig, vec![]);
        let wrap_method = external(wrap_id, wrap_sig, vec![VarId::new(0)]);
        let sink_method = external(sink_id, sink_sig, vec![VarId::new(0)]);

        let v0 = VarId::new(0);
        let v1 = VarId::new(1);
        let main_method = Method {
            id: main_id,
            declaring_class: class_id,
            subsignature: Subsignature::new("main", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types: vec![VarType::Ref, VarType::Ref],
            stmts: vec![
                Stmt::Assign { lhs: v0, rhs: Expr::Call { kind: CallKind::Static(source_id), args: vec![] } },
                Stmt::Assign { lhs: v1, rhs: Expr::Call { kind: CallKind::Static(wrap_id), args: vec![v0] } },
                Stmt::CallStmt { call: Expr::Call { kind: CallKind::Static(sink_id), args: vec![v1] } },
                Stmt::Return(None),
            ],
        };

        let program = Program::new(hierarchy, vec![source_method, wrap_method, sink_method, main_method], main_id);
        let config = TaintConfig {
            sources: vec![SourceRule { method: MethodRef { class: "Util".into(), name: "source".into(), num_params: 0 } }],
            sinks: vec![SinkRule { method: MethodRef { class: "Util".into(), name: "sink".into(), num_params: 1 }, arg: 0 }],
            transfers: vec![TransferRule {
                method: MethodRef { class: "Util".into(), name: "wrap".into(), num_params: 1 },
                from: Endpoint::Arg(0),
                to: Endpoint::Result,
            }],
        };
        let manager = Rc::new(RefCell::new(TaintManager::new(&program, &config)));

        let heap_model = AllocSiteHeapModel::new();
        let mut ctx = AnalysisContext::new(program, heap_model, AnalysisOptions::default());
        let mut pta = ContextSensitivePTA::new(&mut ctx, context_insensitive());
        pta.add_observer(Box::new(TaintObserver(manager.clone())));
        let _ = pta.solve();

        let taint_result = Rc::try_unwrap(manager).unwrap_or_else(|_| panic!("observer outlived solve()")).into_inner().finish();
        assert_eq!(taint_result.flows.len(), 1);
    }
}
