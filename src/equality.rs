//! Equality over structure elements.
//!
//! A union-find partition of the carrier plus a queue of pending equations.
//! The structure's rebuild pushes congruence equations here and drains them
//! through [`Equality::merge`].
//!
//! # Key Types
//!
//! - [`Equality`]: union-find + element count + pending equation queue
//! - [`PendingEquation`]: an equation waiting to be processed
//! - [`EquationReason`]: why an equation was created (for logging/explanation)

use std::collections::VecDeque;

use egglog_union_find::UnionFind;

use crate::error::StructureError;
use crate::id::{OpId, Slid};

/// A pending equation to be processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEquation {
    pub lhs: Slid,
    pub rhs: Slid,
    pub reason: EquationReason,
}

/// Reason an equation was created. Host and axiom equations merge at once
/// through [`Equality::merge`]; only rebuild defers equations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EquationReason {
    /// Congruence: two rows of `op` have equal canonical arguments
    Congruence { op: OpId },
}

/// Union-find over the elements `0..len`.
///
/// Only allocated elements may be queried: the underlying union-find grows
/// on demand, so `len` is what keeps `find` from inventing elements.
#[derive(Clone)]
pub struct Equality {
    uf: UnionFind<usize>,
    len: usize,
    pending: VecDeque<PendingEquation>,
    merge_count: usize,
}

impl std::fmt::Debug for Equality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Equality")
            .field("len", &self.len)
            .field("pending", &self.pending)
            .field("merge_count", &self.merge_count)
            .finish_non_exhaustive()
    }
}

impl Default for Equality {
    fn default() -> Self {
        Self::new()
    }
}

impl Equality {
    pub fn new() -> Self {
        Self {
            uf: UnionFind::default(),
            len: 0,
            pending: VecDeque::new(),
            merge_count: 0,
        }
    }

    /// Allocate a new singleton class. The returned id is the previous element count.
    pub fn add_element(&mut self) -> Slid {
        let id = self.len;
        self.len += 1;
        // Touch the slot so the union-find reserves it as its own root.
        self.uf.find(id);
        id
    }

    /// Number of allocated elements
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, elem: Slid) -> Result<(), StructureError> {
        if elem < self.len {
            Ok(())
        } else {
            Err(StructureError::UnknownElement {
                elem,
                len: self.len,
            })
        }
    }

    /// Find the canonical representative of an element
    pub fn find(&mut self, elem: Slid) -> Result<Slid, StructureError> {
        self.check(elem)?;
        Ok(self.uf.find(elem))
    }

    /// Find the representative without compressing paths
    pub fn find_naive(&self, elem: Slid) -> Result<Slid, StructureError> {
        self.check(elem)?;
        Ok(self.uf.find_naive(elem))
    }

    /// Check if two elements are in the same equivalence class
    pub fn are_equal(&mut self, a: Slid, b: Slid) -> Result<bool, StructureError> {
        Ok(self.find(a)? == self.find(b)?)
    }

    /// Merge two elements, returning true if they were not already equal
    pub fn merge(&mut self, a: Slid, b: Slid) -> Result<bool, StructureError> {
        let ra = self.find(a)?;
        let rb = self.find(b)?;

        if ra != rb {
            self.uf.union(ra, rb);
            self.merge_count += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Add a pending equation
    pub fn add_equation(&mut self, lhs: Slid, rhs: Slid, reason: EquationReason) {
        self.pending.push_back(PendingEquation { lhs, rhs, reason });
    }

    /// Pop the next pending equation, if any
    pub fn pop_pending(&mut self) -> Option<PendingEquation> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of successful merges so far. Grows monotonically, so it doubles
    /// as an epoch for "has the partition changed since ...".
    pub fn merge_count(&self) -> usize {
        self.merge_count
    }

    /// Number of equivalence classes
    pub fn num_classes(&self) -> usize {
        self.len - self.merge_count
    }

    /// The partition as sorted classes, ordered by their smallest member
    pub fn classes(&mut self) -> Vec<Vec<Slid>> {
        let mut by_root: std::collections::BTreeMap<Slid, Vec<Slid>> = Default::default();
        for elem in 0..self.len {
            let root = self.uf.find(elem);
            by_root.entry(root).or_default().push(elem);
        }
        let mut classes: Vec<Vec<Slid>> = by_root.into_values().collect();
        classes.sort_by_key(|class| class[0]);
        classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_elements(n: usize) -> Equality {
        let mut eq = Equality::new();
        for i in 0..n {
            assert_eq!(eq.add_element(), i);
        }
        eq
    }

    #[test]
    fn test_equality_basic() {
        let mut eq = with_elements(3);
        let (a, b, c) = (0, 1, 2);

        // Initially all different
        assert!(!eq.are_equal(a, b).unwrap());
        assert!(!eq.are_equal(b, c).unwrap());
        assert!(!eq.are_equal(a, c).unwrap());

        assert!(eq.merge(a, b).unwrap());
        assert!(eq.are_equal(a, b).unwrap());
        assert!(!eq.are_equal(b, c).unwrap());

        // Transitive
        assert!(eq.merge(b, c).unwrap());
        assert!(eq.are_equal(a, c).unwrap());

        // Merging already equal elements returns false
        assert!(!eq.merge(a, c).unwrap());
        assert_eq!(eq.merge_count(), 2);
        assert_eq!(eq.num_classes(), 1);
    }

    #[test]
    fn test_find_rejects_unallocated() {
        let mut eq = with_elements(2);
        assert_eq!(
            eq.find(2),
            Err(StructureError::UnknownElement { elem: 2, len: 2 })
        );
        assert!(eq.merge(0, 5).is_err());
        assert_eq!(eq.merge_count(), 0);
    }

    #[test]
    fn test_representative_is_stable() {
        let mut eq = with_elements(6);
        eq.merge(4, 5).unwrap();
        eq.merge(1, 3).unwrap();
        eq.merge(3, 5).unwrap();

        let root = eq.find_naive(5).unwrap();
        for x in [1, 3, 4, 5] {
            assert_eq!(eq.find(x).unwrap(), root);
        }
        assert_eq!(eq.find_naive(6), Err(StructureError::UnknownElement { elem: 6, len: 6 }));
        assert_eq!(eq.find(root).unwrap(), root);
        assert_eq!(eq.find(0).unwrap(), 0);
        assert_eq!(eq.find(2).unwrap(), 2);
    }

    #[test]
    fn test_classes() {
        let mut eq = with_elements(5);
        eq.merge(3, 0).unwrap();
        eq.merge(4, 2).unwrap();
        assert_eq!(eq.classes(), vec![vec![0, 3], vec![1], vec![2, 4]]);
        assert_eq!(eq.num_classes(), 3);
    }

    #[test]
    fn test_pending() {
        let mut eq = with_elements(3);
        assert!(!eq.has_pending());

        eq.add_equation(0, 1, EquationReason::Congruence { op: 2 });
        eq.add_equation(1, 2, EquationReason::Congruence { op: 0 });
        assert!(eq.has_pending());
        // Queued equations do not touch the partition
        assert_eq!(eq.num_classes(), 3);

        let first = eq.pop_pending().unwrap();
        assert_eq!((first.lhs, first.rhs), (0, 1));
        assert_eq!(first.reason, EquationReason::Congruence { op: 2 });
        let second = eq.pop_pending().unwrap();
        assert_eq!(second.reason, EquationReason::Congruence { op: 0 });
        assert!(!eq.has_pending());
    }
}
