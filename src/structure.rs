//! Partial structures: finite, growing interpretations of a signature.
//!
//! A [`PartialStructure`] owns
//! - the carrier: Slid → SortId, plus one roaring bitmap of elements per sort
//! - the [`Equality`] partition over the carrier
//! - one [`OperationTable`] per operation and one [`PredicateTable`] per predicate
//!
//! # Canonical rows
//!
//! Rows are stored with canonical representatives. A merge makes some of them
//! stale; the structure then stays *dirty* until [`PartialStructure::rebuild`]
//! runs. Every operation that reads or writes tables calls `rebuild` first,
//! so stale rows are never observed through this API. Rebuild also restores
//! functionality: two rows of an operation whose arguments became equal have
//! their results merged (congruence), repeatedly, until nothing changes.

use std::rc::Rc;

use roaring::RoaringTreemap;

use crate::equality::{Equality, EquationReason};
use crate::error::StructureError;
use crate::id::{OpId, PredId, Slid, SortId};
use crate::signature::Signature;
use crate::table::{OperationTable, PredicateTable, RelationStorage};

/// Summary counts for a structure
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StructureStats {
    pub elements: usize,
    pub classes: usize,
    pub operation_rows: usize,
    pub predicate_rows: usize,
    pub merges: usize,
}

/// A partial model of a signature, closed under nothing until the chase runs.
#[derive(Clone, Debug)]
pub struct PartialStructure {
    signature: Rc<Signature>,

    /// Element sorts: Slid → SortId
    sorts: Vec<SortId>,

    /// Carriers: SortId → RoaringTreemap of Slids in that sort
    carriers: Vec<RoaringTreemap>,

    equality: Equality,

    /// Operations: OpId → graph of the partial function
    operations: Vec<OperationTable>,

    /// Predicates: PredId → set of tuples
    predicates: Vec<PredicateTable>,

    /// Merges happened since the last rebuild
    dirty: bool,
}

impl PartialStructure {
    /// Create an empty structure with one empty table per symbol of `signature`
    pub fn new(signature: Rc<Signature>) -> Self {
        let carriers = vec![RoaringTreemap::new(); signature.num_sorts()];
        let operations = signature
            .operations()
            .map(|(_, op)| OperationTable::new(op.arity()))
            .collect();
        let predicates = signature
            .predicates()
            .map(|(_, pred)| PredicateTable::new(pred.arity.len()))
            .collect();

        Self {
            signature,
            sorts: Vec::new(),
            carriers,
            equality: Equality::new(),
            operations,
            predicates,
            dirty: false,
        }
    }

    pub fn signature(&self) -> &Rc<Signature> {
        &self.signature
    }

    /// Number of elements (the next Slid to be allocated)
    pub fn len(&self) -> usize {
        self.sorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty()
    }

    pub fn sort_of(&self, elem: Slid) -> Result<SortId, StructureError> {
        self.sorts
            .get(elem)
            .copied()
            .ok_or(StructureError::UnknownElement {
                elem,
                len: self.len(),
            })
    }

    /// All elements of a sort, in creation order (not only representatives)
    pub fn carrier(&self, sort: SortId) -> Option<&RoaringTreemap> {
        self.carriers.get(sort)
    }

    pub fn equality(&self) -> &Equality {
        &self.equality
    }

    /// Whether merges are waiting to be propagated into the tables
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn find(&mut self, elem: Slid) -> Result<Slid, StructureError> {
        self.equality.find(elem)
    }

    pub fn are_equal(&mut self, x: Slid, y: Slid) -> Result<bool, StructureError> {
        self.equality.are_equal(x, y)
    }

    /// Representative of `elem` through a shared borrow, for read-only views
    pub fn find_naive(&self, elem: Slid) -> Result<Slid, StructureError> {
        self.equality.find_naive(elem)
    }

    pub fn num_classes(&self) -> usize {
        self.equality.num_classes()
    }

    /// The partition of the carrier, see [`Equality::classes`]
    pub fn classes(&mut self) -> Vec<Vec<Slid>> {
        self.equality.classes()
    }

    /// Add a generator: a fresh element of `sort` not defined by any operation.
    pub fn add_element(&mut self, sort: SortId) -> Result<Slid, StructureError> {
        if sort >= self.carriers.len() {
            return Err(StructureError::UnknownSort(sort));
        }
        self.allocate(sort)
    }

    fn allocate(&mut self, sort: SortId) -> Result<Slid, StructureError> {
        let slid = self.sorts.len();
        if self.equality.len() != slid {
            return Err(StructureError::Internal(format!(
                "carrier has {} elements but equality tracks {}",
                slid,
                self.equality.len()
            )));
        }
        self.equality.add_element();
        self.sorts.push(sort);
        self.carriers[sort].insert(slid as u64);
        Ok(slid)
    }

    /// Validate arguments against declared sorts. Every argument must already
    /// exist, which is exactly the acyclic creation order.
    fn check_args(
        &self,
        symbol: &str,
        expected: &[SortId],
        args: &[Slid],
    ) -> Result<(), StructureError> {
        if args.len() != expected.len() {
            return Err(StructureError::ArityMismatch {
                symbol: symbol.to_string(),
                expected: expected.len(),
                actual: args.len(),
            });
        }
        for (position, (&arg, &sort)) in args.iter().zip(expected).enumerate() {
            let Some(&actual) = self.sorts.get(arg) else {
                return Err(StructureError::ForwardReference {
                    arg,
                    next: self.len(),
                });
            };
            if actual != sort {
                return Err(StructureError::SortMismatch {
                    symbol: symbol.to_string(),
                    position,
                    elem: arg,
                    expected: sort,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn canonicalize(&mut self, args: &[Slid]) -> Result<Vec<Slid>, StructureError> {
        args.iter().map(|&arg| self.equality.find(arg)).collect()
    }

    /// Return the element denoting `op(args)`, creating it if needed.
    ///
    /// Arguments are compared up to equality, so applying `op` to arguments
    /// equal to an earlier application returns the earlier result.
    pub fn define_operation(&mut self, op: OpId, args: &[Slid]) -> Result<Slid, StructureError> {
        let sig = Rc::clone(&self.signature);
        let operation = sig.operation(op).ok_or(StructureError::UnknownOperation(op))?;
        self.check_args(&operation.name, &operation.domain, args)?;

        self.rebuild()?;
        let key = self.canonicalize(args)?;
        if let Some(existing) = self.operations[op].get(&key) {
            return Ok(existing);
        }

        let new_id = self.allocate(operation.codomain)?;
        self.operations[op].insert(key, new_id);
        Ok(new_id)
    }

    /// Look up `op(args)` without creating it
    pub fn lookup_operation(
        &mut self,
        op: OpId,
        args: &[Slid],
    ) -> Result<Option<Slid>, StructureError> {
        let sig = Rc::clone(&self.signature);
        let operation = sig.operation(op).ok_or(StructureError::UnknownOperation(op))?;
        self.check_args(&operation.name, &operation.domain, args)?;

        self.rebuild()?;
        let key = self.canonicalize(args)?;
        Ok(self.operations[op].get(&key))
    }

    /// Record `pred(args)`. Returns true if the fact is new up to equality.
    ///
    /// Arguments are stored canonicalized, the same as operation rows.
    pub fn define_predicate(&mut self, pred: PredId, args: &[Slid]) -> Result<bool, StructureError> {
        let sig = Rc::clone(&self.signature);
        let predicate = sig
            .predicate(pred)
            .ok_or(StructureError::UnknownPredicate(pred))?;
        self.check_args(&predicate.name, &predicate.arity, args)?;

        self.rebuild()?;
        let tuple = self.canonicalize(args)?;
        Ok(self.predicates[pred].insert(tuple))
    }

    /// Whether `pred(args)` holds, up to equality
    pub fn holds(&mut self, pred: PredId, args: &[Slid]) -> Result<bool, StructureError> {
        let sig = Rc::clone(&self.signature);
        let predicate = sig
            .predicate(pred)
            .ok_or(StructureError::UnknownPredicate(pred))?;
        self.check_args(&predicate.name, &predicate.arity, args)?;

        self.rebuild()?;
        let tuple = self.canonicalize(args)?;
        Ok(self.predicates[pred].contains(&tuple))
    }

    /// Merge the classes of `x` and `y`. Returns true if they were distinct.
    ///
    /// Tables are not touched until the next rebuild.
    pub fn merge(&mut self, x: Slid, y: Slid) -> Result<bool, StructureError> {
        let left_sort = self.sort_of(x)?;
        let right_sort = self.sort_of(y)?;
        if left_sort != right_sort {
            return Err(StructureError::MergeSortMismatch {
                left: x,
                left_sort,
                right: y,
                right_sort,
            });
        }
        let merged = self.equality.merge(x, y)?;
        self.dirty |= merged;
        Ok(merged)
    }

    /// Restore canonical rows after merges, deriving congruence merges.
    ///
    /// Returns the number of merges derived by congruence.
    pub fn rebuild(&mut self) -> Result<usize, StructureError> {
        let mut congruences = 0;

        while self.dirty {
            self.dirty = false;

            for op in 0..self.operations.len() {
                self.recanonicalize_operation(op)?;
            }
            for pred in 0..self.predicates.len() {
                self.recanonicalize_predicate(pred)?;
            }

            while let Some(eq) = self.equality.pop_pending() {
                if self.equality.merge(eq.lhs, eq.rhs)? {
                    log::trace!("congruence {} = {} ({:?})", eq.lhs, eq.rhs, eq.reason);
                    congruences += 1;
                    self.dirty = true;
                }
            }
        }

        if congruences > 0 {
            log::debug!("rebuild derived {congruences} congruence merges");
        }
        Ok(congruences)
    }

    fn recanonicalize_operation(&mut self, op: OpId) -> Result<(), StructureError> {
        let Self {
            operations,
            equality,
            ..
        } = self;
        let table = &mut operations[op];

        let mut stale = Vec::new();
        for (args, result) in table.iter() {
            let canon_args = args
                .iter()
                .map(|&arg| equality.find(arg))
                .collect::<Result<Vec<_>, _>>()?;
            let canon_result = equality.find(result)?;
            if canon_args.as_slice() != args || canon_result != result {
                stale.push((args.to_vec(), canon_args, canon_result));
            }
        }

        // Remove every stale row before reinserting, so a reinserted row is
        // never clobbered by the removal of another stale row with the same key.
        for (old_args, _, _) in &stale {
            table.remove(old_args);
        }
        for (_, canon_args, canon_result) in stale {
            if let Some(existing) = table.insert(canon_args, canon_result) {
                if existing != canon_result {
                    equality.add_equation(existing, canon_result, EquationReason::Congruence { op });
                }
            }
        }
        Ok(())
    }

    fn recanonicalize_predicate(&mut self, pred: PredId) -> Result<(), StructureError> {
        let Self {
            predicates,
            equality,
            ..
        } = self;
        let table = &mut predicates[pred];

        let mut stale = Vec::new();
        for tuple in table.iter() {
            let canon = tuple
                .iter()
                .map(|&arg| equality.find(arg))
                .collect::<Result<Vec<_>, _>>()?;
            if canon.as_slice() != tuple {
                stale.push((tuple.to_vec(), canon));
            }
        }

        for (old, _) in &stale {
            table.remove(old);
        }
        for (_, canon) in stale {
            table.insert(canon);
        }
        Ok(())
    }

    /// Table of an operation. Rows are canonical unless [`is_dirty`](Self::is_dirty).
    pub fn operation_table(&self, op: OpId) -> Option<&OperationTable> {
        self.operations.get(op)
    }

    /// Table of a predicate. Rows are canonical unless [`is_dirty`](Self::is_dirty).
    pub fn predicate_table(&self, pred: PredId) -> Option<&PredicateTable> {
        self.predicates.get(pred)
    }

    /// Total number of rows over all tables
    pub fn num_rows(&self) -> usize {
        self.operations.iter().map(RelationStorage::len).sum::<usize>()
            + self.predicates.iter().map(RelationStorage::len).sum::<usize>()
    }

    pub fn stats(&self) -> StructureStats {
        StructureStats {
            elements: self.len(),
            classes: self.num_classes(),
            operation_rows: self.operations.iter().map(RelationStorage::len).sum(),
            predicate_rows: self.predicates.iter().map(RelationStorage::len).sum(),
            merges: self.equality.merge_count(),
        }
    }

    /// Check the structural invariants, returning a description of the first violation.
    ///
    /// Rows are only required to be canonical when the structure is not dirty.
    pub fn check_invariants(&mut self) -> Result<(), String> {
        if self.equality.len() != self.sorts.len() {
            return Err(format!(
                "carrier has {} elements but equality tracks {}",
                self.sorts.len(),
                self.equality.len()
            ));
        }

        let carrier_total: u64 = self.carriers.iter().map(RoaringTreemap::len).sum();
        if carrier_total != self.sorts.len() as u64 {
            return Err(format!(
                "carriers hold {} elements, expected {}",
                carrier_total,
                self.sorts.len()
            ));
        }
        for (slid, &sort) in self.sorts.iter().enumerate() {
            if !self.carriers[sort].contains(slid as u64) {
                return Err(format!("element {slid} missing from carrier of sort #{sort}"));
            }
        }

        let sig = Rc::clone(&self.signature);
        let check_canonical = !self.dirty;

        for (op, operation) in sig.operations() {
            let table = &self.operations[op];
            if table.arity() != operation.arity() {
                return Err(format!("table of `{}` has wrong arity", operation.name));
            }
            for row in table.rows() {
                let (result, args) = row
                    .split_last()
                    .ok_or_else(|| format!("empty row in `{}`", operation.name))?;
                let sorts_of: Vec<SortId> = args.iter().map(|&a| self.sorts[a]).collect();
                if sorts_of != operation.domain || self.sorts[*result] != operation.codomain {
                    return Err(format!("ill-sorted row {:?} in `{}`", row, operation.name));
                }
                if check_canonical {
                    for &x in &row {
                        if self.equality.find(x).map_err(|e| e.to_string())? != x {
                            return Err(format!(
                                "non-canonical id {} in row {:?} of `{}`",
                                x, row, operation.name
                            ));
                        }
                    }
                }
            }
        }

        for (pred, predicate) in sig.predicates() {
            let table = &self.predicates[pred];
            for row in table.rows() {
                let sorts_of: Vec<SortId> = row.iter().map(|&a| self.sorts[a]).collect();
                if sorts_of != predicate.arity {
                    return Err(format!("ill-sorted tuple {:?} in `{}`", row, predicate.name));
                }
                if check_canonical {
                    for &x in &row {
                        if self.equality.find(x).map_err(|e| e.to_string())? != x {
                            return Err(format!(
                                "non-canonical id {} in tuple {:?} of `{}`",
                                x, row, predicate.name
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
