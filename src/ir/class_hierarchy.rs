// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Class hierarchy: classes, interfaces and the subtype edges CHA and
//! virtual dispatch walk.

use std::collections::HashMap;
use std::fmt;

use crate::ir::method::MethodId;
use crate::ir::stmt::Subsignature;
use crate::util::bit_vec::Idx;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl Idx for ClassId {
    fn new(idx: usize) -> Self {
        ClassId(u32::new(idx))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    /// Methods declared directly on this class, keyed by subsignature so
    /// dispatch can look a call up without a linear scan.
    pub declared_methods: HashMap<Subsignature, MethodId>,
}

/// The whole-program class hierarchy: classes plus the direct-subtype
/// index CHA needs to descend from a static type to every class that
/// could actually be instantiated at a virtual call site.
#[derive(Clone, Debug)]
pub struct ClassHierarchy {
    classes: Vec<Class>,
    /// `direct_subclasses[c]` holds classes that directly extend `c`.
    direct_subclasses: HashMap<ClassId, Vec<ClassId>>,
    /// `direct_implementors[i]` holds classes/interfaces that directly
    /// implement/extend interface `i`.
    direct_implementors: HashMap<ClassId, Vec<ClassId>>,
}

impl ClassHierarchy {
    pub fn new(classes: Vec<Class>) -> Self {
        let mut direct_subclasses: HashMap<ClassId, Vec<ClassId>> = HashMap::new();
        let mut direct_implementors: HashMap<ClassId, Vec<ClassId>> = HashMap::new();
        for class in &classes {
            if let Some(superclass) = class.superclass {
                direct_subclasses.entry(superclass).or_default().push(class.id);
            }
            for &iface in &class.interfaces {
                direct_implementors.entry(iface).or_default().push(class.id);
            }
        }
        ClassHierarchy { classes, direct_subclasses, direct_implementors }
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    pub fn is_interface(&self, id: ClassId) -> bool {
        self.class(id).is_interface
    }

    pub fn is_abstract(&self, id: ClassId) -> bool {
        self.class(id).is_abstract
    }

    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup {
            return true;
        }
        let mut cur = self.class(sub).superclass;
        while let Some(c) = cur {
            if c == sup {
                return true;
            }
            cur = self.class(c).superclass;
        }
        self.class(sub).interfaces.iter().any(|&i| self.is_subinterface(i, sup))
    }

    fn is_subinterface(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup {
            return true;
        }
        self.class(sub).interfaces.iter().any(|&i| self.is_subinterface(i, sup))
    }

    pub fn direct_subclasses(&self, id: ClassId) -> &[ClassId] {
        self.direct_subclasses.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_implementors(&self, id: ClassId) -> &[ClassId] {
        self.direct_implementors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Looks up `subsig` starting at `id` and walking up the superclass
    /// chain, per single-inheritance method resolution order.
    pub fn resolve_method(&self, id: ClassId, subsig: &Subsignature) -> Option<MethodId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if let Some(&m) = self.class(c).declared_methods.get(subsig) {
                return Some(m);
            }
            cur = self.class(c).superclass;
        }
        None
    }
}
