// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The constant-propagation lattice and the flow fact it is
//! carried in.

use std::fmt;

use rpds::HashTrieMap;

use crate::ir::method::VarId;

/// Abstract value for 32-bit signed integers. `UNDEF` is bottom, `NAC`
/// ("not a constant") is top.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Value {
    Undef,
    Const(i32),
    Nac,
}

impl Value {
    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Value::Const(_))
    }

    pub fn is_nac(&self) -> bool {
        matches!(self, Value::Nac)
    }

    pub fn as_const(&self) -> Option<i32> {
        match self {
            Value::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// Meet of two abstract values. `NAC` absorbs everything, `UNDEF` is
    /// the identity, two distinct constants meet to `NAC`.
    pub fn meet(a: Value, b: Value) -> Value {
        match (a, b) {
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Undef, x) | (x, Value::Undef) => x,
            (Value::Const(x), Value::Const(y)) => {
                if x == y {
                    Value::Const(x)
                } else {
                    Value::Nac
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "UNDEF"),
            Value::Const(v) => write!(f, "{v}"),
            Value::Nac => write!(f, "NAC"),
        }
    }
}

/// Total mapping from integer-holding variables to `Value`; an absent key
/// is `UNDEF`. Backed by a persistent hash map so that cloning a fact (the
/// dataflow solver clones facts constantly while iterating to fixpoint) is
/// cheap and structurally shared rather than a deep copy.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CPFact {
    map: HashTrieMap<VarId, Value>,
}

impl CPFact {
    pub fn new() -> Self {
        CPFact { map: HashTrieMap::new() }
    }

    pub fn get(&self, var: VarId) -> Value {
        self.map.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Sets `var`'s value, returns whether the fact changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        if self.get(var) == value {
            return false;
        }
        self.map = self.map.insert(var, value);
        true
    }

    pub fn remove(&mut self, var: VarId) -> bool {
        if !self.map.contains_key(&var) {
            return false;
        }
        self.map = self.map.remove(&var);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &Value)> {
        self.map.iter()
    }

    /// Copies every binding from `other`, overwriting `self`'s. Used to
    /// implement a plain assignment `OUT = IN` before a transfer overrides
    /// the defined variable.
    pub fn copy_from(&mut self, other: &CPFact) {
        self.map = other.map.clone();
    }

    /// In-place pointwise meet: `self := self ⊓ other`. Returns whether
    /// `self` changed.
    pub fn meet_into(&mut self, other: &CPFact) -> bool {
        let mut changed = false;
        for (var, other_val) in other.iter() {
            let merged = Value::meet(self.get(*var), *other_val);
            changed |= self.update(*var, merged);
        }
        changed
    }
}

impl Default for CPFact {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn meet_is_idempotent_commutative_associative() {
        let vs = [Value::Undef, Value::Const(1), Value::Const(2), Value::Nac];
        for &a in &vs {
            assert_eq!(Value::meet(a, a), a, "idempotent at {a:?}");
            for &b in &vs {
                assert_eq!(Value::meet(a, b), Value::meet(b, a), "commutative at {a:?},{b:?}");
                for &c in &vs {
                    assert_eq!(
                        Value::meet(Value::meet(a, b), c),
                        Value::meet(a, Value::meet(b, c)),
                        "associative at {a:?},{b:?},{c:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn const_meet_same_const_is_same_const() {
        assert_eq!(Value::meet(Value::Const(7), Value::Const(7)), Value::Const(7));
        assert_eq!(Value::meet(Value::Const(7), Value::Const(8)), Value::Nac);
    }

    #[test]
    fn fact_absent_key_is_undef() {
        let fact = CPFact::new();
        assert_eq!(fact.get(VarId::new(0)), Value::Undef);
    }

    #[test]
    fn fact_meet_into_merges_pointwise() {
        let mut a = CPFact::new();
        a.update(VarId::new(0), Value::Const(1));
        a.update(VarId::new(1), Value::Const(2));
        let mut b = CPFact::new();
        b.update(VarId::new(0), Value::Const(1));
        b.update(VarId::new(1), Value::Const(3));

        let changed = a.meet_into(&b);
        assert!(changed);
        assert_eq!(a.get(VarId::new(0)), Value::Const(1));
        assert_eq!(a.get(VarId::new(1)), Value::Nac);

        assert!(!a.clone().meet_into(&a.clone()));
    }
}
