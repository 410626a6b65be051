// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Points-to data storage for the worklist solvers.
//!
//! `DiffPTData` splits each pointer's points-to set into what has
//! already been propagated to its PFG successors (`propa_pts_map`) and
//! what was added this round but not yet propagated (`diff_pts_map`).
//! Propagating only the diff on each worklist pop, rather than the
//! pointer's whole set, is what keeps a fixpoint iteration over a large
//! points-to graph from becoming quadratic.

use std::collections::HashMap;
use std::hash::Hash;

use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet};
use crate::util::bit_vec::Idx;

/// A flat pointer -> points-to-set map, with no diff tracking. Used
/// where the full set is always wanted directly (e.g. for reporting
/// final results).
pub struct BasePTData<P: Copy + Eq + Hash, E: Idx> {
    map: HashMap<P, HybridPointsToSet<E>>,
}

impl<P: Copy + Eq + Hash, E: Idx> Default for BasePTData<P, E> {
    fn default() -> Self {
        BasePTData { map: HashMap::new() }
    }
}

impl<P: Copy + Eq + Hash, E: Idx> BasePTData<P, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pts_of(&self, pointer: P) -> Option<&HybridPointsToSet<E>> {
        self.map.get(&pointer)
    }

    /// Adds `elem` to `pointer`'s set. Returns whether it was new.
    pub fn add(&mut self, pointer: P, elem: E) -> bool {
        self.map.entry(pointer).or_insert_with(HybridPointsToSet::new).insert(elem)
    }

    pub fn union(&mut self, pointer: P, other: &HybridPointsToSet<E>) -> bool {
        self.map.entry(pointer).or_insert_with(HybridPointsToSet::new).union(other)
    }

    pub fn pointers(&self) -> impl Iterator<Item = P> + '_ {
        self.map.keys().copied()
    }
}

/// Diff-propagation points-to store: tracks both the fully-propagated
/// set and the not-yet-propagated diff for each pointer.
pub struct DiffPTData<P: Copy + Eq + Hash, E: Idx> {
    propa: HashMap<P, HybridPointsToSet<E>>,
    diff: HashMap<P, HybridPointsToSet<E>>,
}

impl<P: Copy + Eq + Hash, E: Idx> Default for DiffPTData<P, E> {
    fn default() -> Self {
        DiffPTData { propa: HashMap::new(), diff: HashMap::new() }
    }
}

impl<P: Copy + Eq + Hash, E: Idx> DiffPTData<P, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pointer's complete points-to set, propagated plus pending
    /// diff.
    pub fn pts_of(&self, pointer: P) -> HybridPointsToSet<E> {
        let mut result = self.propa.get(&pointer).cloned().unwrap_or_else(HybridPointsToSet::new);
        if let Some(diff) = self.diff.get(&pointer) {
            result.union(diff);
        }
        result
    }

    /// Adds `pts` to `pointer`'s pending diff (elements already in the
    /// propagated set are not re-added). Returns whether the diff
    /// changed.
    pub fn add_to_diff(&mut self, pointer: P, pts: &HybridPointsToSet<E>) -> bool {
        let already = self.propa.get(&pointer);
        let diff = self.diff.entry(pointer).or_insert_with(HybridPointsToSet::new);
        let mut changed = false;
        for elem in pts.iter() {
            if already.map(|p| p.contains(elem)).unwrap_or(false) {
                continue;
            }
            changed |= diff.insert(elem);
        }
        changed
    }

    /// Moves `pointer`'s pending diff into its propagated set and
    /// returns the (now-empty) diff that should be flushed to PFG
    /// successors.
    pub fn flush_diff(&mut self, pointer: P) -> HybridPointsToSet<E> {
        let diff = self.diff.remove(&pointer).unwrap_or_else(HybridPointsToSet::new);
        if !diff.is_empty() {
            self.propa.entry(pointer).or_insert_with(HybridPointsToSet::new).union(&diff);
        }
        diff
    }

    pub fn has_diff(&self, pointer: P) -> bool {
        self.diff.get(&pointer).map(|d| !d.is_empty()).unwrap_or(false)
    }

    pub fn pointers(&self) -> impl Iterator<Item = P> + '_ {
        self.propa.keys().copied().chain(self.diff.keys().copied().filter(|p| !self.propa.contains_key(p)))
    }
}
