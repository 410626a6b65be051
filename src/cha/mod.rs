// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Class-Hierarchy Analysis: the coarsest call-graph
//! construction, resolving a virtual call against every class in the
//! hierarchy that could implement it rather than against points-to
//! results. Used standalone when no points-to precision is wanted, and
//! as the dispatch rule the points-to solvers refine.

use log::debug;

use crate::graph::call_graph::{CallEdgeKind, CallGraph};
use crate::ir::class_hierarchy::ClassId;
use crate::ir::method::{MethodId, Program, StmtLoc};
use crate::ir::stmt::{CallKind, Subsignature};

/// Builds a whole-program call graph by a worklist over reachable
/// methods, starting from `entry`. Virtual calls are resolved against
/// every concrete (non-abstract, non-interface) class reachable from the
/// receiver's static type in the class hierarchy.
pub fn build_call_graph(program: &Program, entry: MethodId) -> CallGraph<MethodId> {
    let mut cg = CallGraph::new();
    cg.add_reachable(entry);

    let mut worklist: Vec<MethodId> = vec![entry];
    while let Some(method) = worklist.pop() {
        let m = program.method(method);
        if m.is_abstract || m.is_external {
            continue;
        }
        for (i, stmt) in m.stmts.iter().enumerate() {
            let Some(call) = stmt.call() else { continue };
            let crate::ir::stmt::Expr::Call { kind, .. } = call else { continue };
            let site = StmtLoc::new(method, i as u32);
            let (edge_kind, callees) = resolve(program, kind);
            for callee in callees {
                if cg.add_edge(site, edge_kind, callee) {
                    debug!("{:?}: new CHA edge to {:?}", site, callee);
                }
                if cg.add_reachable(callee) {
                    worklist.push(callee);
                }
            }
        }
    }
    cg
}

/// Resolves a call statement's kind to every method it could invoke
/// under CHA, alongside the edge kind that resolution counts as.
fn resolve(program: &Program, kind: &CallKind) -> (CallEdgeKind, Vec<MethodId>) {
    match kind {
        CallKind::Static(m) => (CallEdgeKind::Static, vec![*m]),
        CallKind::Special(m) => (CallEdgeKind::Special, vec![*m]),
        CallKind::Virtual { declared_class, subsignature, .. } => {
            let edge_kind = if program.class_hierarchy.is_interface(*declared_class) {
                CallEdgeKind::Interface
            } else {
                CallEdgeKind::Virtual
            };
            (edge_kind, dispatch_targets(program, *declared_class, subsignature))
        }
    }
}

/// Every concrete override of `subsignature` reachable from
/// `static_class` downward: the static type itself (if it has a
/// concrete method) plus every subclass's resolution, found by a
/// breadth-first descent through direct-subclass/implementor edges.
fn dispatch_targets(program: &Program, static_class: ClassId, subsignature: &Subsignature) -> Vec<MethodId> {
    let hierarchy = &program.class_hierarchy;
    let mut targets = Vec::new();
    let mut seen_classes = std::collections::HashSet::new();
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(static_class);
    seen_classes.insert(static_class);

    while let Some(class) = queue.pop_front() {
        if !hierarchy.is_abstract(class) && !hierarchy.is_interface(class) {
            if let Some(method) = hierarchy.resolve_method(class, subsignature) {
                // A concrete class can still inherit an abstract method
                // declaration from an ancestor it does not override; that
                // is not a dispatchable target.
                if !program.method(method).is_abstract && !targets.contains(&method) {
                    targets.push(method);
                }
            }
        }
        for &sub in hierarchy.direct_subclasses(class) {
            if seen_classes.insert(sub) {
                queue.push_back(sub);
            }
        }
        for &sub in hierarchy.direct_implementors(class) {
            if seen_classes.insert(sub) {
                queue.push_back(sub);
            }
        }
    }
    targets
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::class_hierarchy::{Class, ClassHierarchy};
    use crate::ir::method::Method;
    use crate::ir::stmt::{Stmt, VarType};
    use std::collections::HashMap;

    fn leaf_method(id: MethodId, class: ClassId, subsig: Subsignature) -> Method {
        Method {
            id,
            declaring_class: class,
            subsignature: subsig,
            is_static: false,
            is_abstract: false,
            is_external: false,
            this_var: Some(crate::ir::method::VarId::new(0)),
            params: vec![],
            var_types: vec![VarType::Ref],
            stmts: vec![Stmt::Return(None)],
        }
    }

    #[test]
    fn virtual_call_dispatches_to_both_implementors() {
        // Interface Shape { draw() } implemented by Circle and Square.
        let iface = ClassId::new(0);
        let circle = ClassId::new(1);
        let square = ClassId::new(2);
        let caller_class = ClassId::new(3);

        let draw_sig = Subsignature::new("draw", 0);
        let circle_draw = MethodId::new(0);
        let square_draw = MethodId::new(1);
        let main_method_id = MethodId::new(2);

        let mut classes = vec![
            Class {
                id: iface,
                name: "Shape".into(),
                is_interface: true,
                is_abstract: false,
                superclass: None,
                interfaces: vec![],
                declared_methods: HashMap::new(),
            },
            Class {
                id: circle,
                name: "Circle".into(),
                is_interface: false,
                is_abstract: false,
                superclass: None,
                interfaces: vec![iface],
                declared_methods: HashMap::from([(draw_sig.clone(), circle_draw)]),
            },
            Class {
                id: square,
                name: "Square".into(),
                is_interface: false,
                is_abstract: false,
                superclass: None,
                interfaces: vec![iface],
                declared_methods: HashMap::from([(draw_sig.clone(), square_draw)]),
            },
            Class {
                id: caller_class,
                name: "Main".into(),
                is_interface: false,
                is_abstract: false,
                superclass: None,
                interfaces: vec![],
                declared_methods: HashMap::new(),
            },
        ];
        classes.sort_by_key(|c| c.id);
        let hierarchy = ClassHierarchy::new(classes);

        let receiver = crate::ir::method::VarId::new(0);
        let main_method = Method {
            id: main_method_id,
            declaring_class: caller_class,
            subsignature: Subsignature::new("main", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types: vec![VarType::Ref],
            stmts: vec![
                Stmt::CallStmt {
                    call: crate::ir::stmt::Expr::Call {
                        kind: CallKind::Virtual { receiver, declared_class: iface, subsignature: draw_sig.clone() },
                        args: vec![],
                    },
                },
                Stmt::Return(None),
            ],
        };

        let methods = vec![
            leaf_method(circle_draw, circle, draw_sig.clone()),
            leaf_method(square_draw, square, draw_sig),
            main_method,
        ];
        let program = Program::new(hierarchy, methods, main_method_id);

        let cg = build_call_graph(&program, main_method_id);
        let site = StmtLoc::new(main_method_id, 0);
        let mut callees = cg.callees_at(site).to_vec();
        callees.sort_by_key(|m| m.index());
        assert_eq!(callees, vec![circle_draw, square_draw]);
        assert!(cg.reachable_methods().any(|m| m == circle_draw));
        assert!(cg.reachable_methods().any(|m| m == square_draw));
    }

    #[test]
    fn concrete_subclass_inheriting_an_abstract_method_is_not_a_target() {
        // abstract class Shape { abstract draw(); } class Circle extends Shape {}
        // Circle inherits Shape's unimplemented `draw` without overriding it.
        let shape = ClassId::new(0);
        let circle = ClassId::new(1);
        let caller_class = ClassId::new(2);

        let draw_sig = Subsignature::new("draw", 0);
        let shape_draw = MethodId::new(0);
        let main_method_id = MethodId::new(1);

        let mut abstract_draw = leaf_method(shape_draw, shape, draw_sig.clone());
        abstract_draw.is_abstract = true;
        abstract_draw.stmts = vec![];

        let mut classes = vec![
            Class {
                id: shape,
                name: "Shape".into(),
                is_interface: false,
                is_abstract: true,
                superclass: None,
                interfaces: vec![],
                declared_methods: HashMap::from([(draw_sig.clone(), shape_draw)]),
            },
            Class {
                id: circle,
                name: "Circle".into(),
                is_interface: false,
                is_abstract: false,
                superclass: Some(shape),
                interfaces: vec![],
                declared_methods: HashMap::new(),
            },
            Class {
                id: caller_class,
                name: "Main".into(),
                is_interface: false,
                is_abstract: false,
                superclass: None,
                interfaces: vec![],
                declared_methods: HashMap::new(),
            },
        ];
        classes.sort_by_key(|c| c.id);
        let hierarchy = ClassHierarchy::new(classes);

        let receiver = crate::ir::method::VarId::new(0);
        let main_method = Method {
            id: main_method_id,
            declaring_class: caller_class,
            subsignature: Subsignature::new("main", 0),
            is_static: true,
            is_abstract: false,
            is_external: false,
            this_var: None,
            params: vec![],
            var_types: vec![VarType::Ref],
            stmts: vec![
                Stmt::CallStmt {
                    call: crate::ir::stmt::Expr::Call {
                        kind: CallKind::Virtual { receiver, declared_class: shape, subsignature: draw_sig.clone() },
                        args: vec![],
                    },
                },
                Stmt::Return(None),
            ],
        };

        let methods = vec![abstract_draw, main_method];
        let program = Program::new(hierarchy, methods, main_method_id);

        let cg = build_call_graph(&program, main_method_id);
        let site = StmtLoc::new(main_method_id, 0);
        assert!(cg.callees_at(site).is_empty());
    }
}
