//! Multi-sorted signatures: sorts, partial operations, predicates.
//!
//! A signature is built once and then shared (via `Rc`) by every structure
//! and compiled axiom of the theory. Ids are insertion positions, so the
//! n-th declared operation has `OpId` n.

use indexmap::{IndexMap, IndexSet};

use crate::error::SignatureError;
use crate::id::{OpId, PredId, SortId};

/// A partial function symbol with its domain and codomain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub domain: Vec<SortId>,
    pub codomain: SortId,
}

impl Operation {
    pub fn arity(&self) -> usize {
        self.domain.len()
    }
}

/// A relation symbol with its argument sorts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub name: String,
    pub arity: Vec<SortId>,
}

/// A signature: sorts + operation symbols + predicate symbols
#[derive(Clone, Debug, Default)]
pub struct Signature {
    /// Sort names, indexed by SortId
    sorts: IndexSet<String>,
    /// Operations, indexed by OpId and keyed by name
    operations: IndexMap<String, Operation>,
    /// Predicates, indexed by PredId and keyed by name
    predicates: IndexMap<String, Predicate>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sort(&mut self, name: impl Into<String>) -> Result<SortId, SignatureError> {
        let name = name.into();
        if self.sorts.contains(&name) {
            return Err(SignatureError::DuplicateSort(name));
        }
        let (id, _) = self.sorts.insert_full(name);
        Ok(id)
    }

    pub fn add_operation(
        &mut self,
        name: impl Into<String>,
        domain: Vec<SortId>,
        codomain: SortId,
    ) -> Result<OpId, SignatureError> {
        let name = name.into();
        if self.operations.contains_key(&name) {
            return Err(SignatureError::DuplicateOperation(name));
        }
        self.check_sorts(&name, domain.iter().copied().chain([codomain]))?;
        let (id, _) = self.operations.insert_full(
            name.clone(),
            Operation {
                name,
                domain,
                codomain,
            },
        );
        Ok(id)
    }

    pub fn add_predicate(
        &mut self,
        name: impl Into<String>,
        arity: Vec<SortId>,
    ) -> Result<PredId, SignatureError> {
        let name = name.into();
        if self.predicates.contains_key(&name) {
            return Err(SignatureError::DuplicatePredicate(name));
        }
        self.check_sorts(&name, arity.iter().copied())?;
        let (id, _) = self
            .predicates
            .insert_full(name.clone(), Predicate { name, arity });
        Ok(id)
    }

    fn check_sorts(
        &self,
        symbol: &str,
        sorts: impl IntoIterator<Item = SortId>,
    ) -> Result<(), SignatureError> {
        match sorts.into_iter().find(|&s| s >= self.sorts.len()) {
            Some(sort) => Err(SignatureError::UnknownSort {
                symbol: symbol.to_string(),
                sort,
            }),
            None => Ok(()),
        }
    }

    pub fn lookup_sort(&self, name: &str) -> Option<SortId> {
        self.sorts.get_index_of(name)
    }

    pub fn lookup_operation(&self, name: &str) -> Option<OpId> {
        self.operations.get_index_of(name)
    }

    pub fn lookup_predicate(&self, name: &str) -> Option<PredId> {
        self.predicates.get_index_of(name)
    }

    pub fn sort_name(&self, sort: SortId) -> Option<&str> {
        self.sorts.get_index(sort).map(String::as_str)
    }

    pub fn operation(&self, op: OpId) -> Option<&Operation> {
        self.operations.get_index(op).map(|(_, o)| o)
    }

    pub fn predicate(&self, pred: PredId) -> Option<&Predicate> {
        self.predicates.get_index(pred).map(|(_, p)| p)
    }

    pub fn num_sorts(&self) -> usize {
        self.sorts.len()
    }

    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }

    pub fn num_predicates(&self) -> usize {
        self.predicates.len()
    }

    /// Iterate over operations in OpId order
    pub fn operations(&self) -> impl Iterator<Item = (OpId, &Operation)> + '_ {
        self.operations.values().enumerate()
    }

    /// Iterate over predicates in PredId order
    pub fn predicates(&self) -> impl Iterator<Item = (PredId, &Predicate)> + '_ {
        self.predicates.values().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_declaration_order() {
        let mut sig = Signature::new();
        let ctx = sig.add_sort("Ctx").unwrap();
        let ty = sig.add_sort("Ty").unwrap();
        assert_eq!((ctx, ty), (0, 1));

        let empty = sig.add_operation("empty", vec![], ctx).unwrap();
        let ext = sig.add_operation("ext", vec![ctx, ty], ctx).unwrap();
        assert_eq!((empty, ext), (0, 1));
        assert_eq!(sig.operation(ext).unwrap().arity(), 2);

        let ty_in = sig.add_predicate("ty_in", vec![ty, ctx]).unwrap();
        assert_eq!(ty_in, 0);
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let mut sig = Signature::new();
        let s = sig.add_sort("S").unwrap();
        sig.add_operation("f", vec![s], s).unwrap();

        assert_eq!(sig.lookup_sort("S"), Some(s));
        assert_eq!(sig.lookup_operation("f"), Some(0));
        assert_eq!(sig.lookup_sort("T"), None);
        assert_eq!(sig.lookup_operation("g"), None);
        assert_eq!(sig.lookup_predicate("f"), None);
        assert!(sig.operation(7).is_none());
    }

    #[test]
    fn test_duplicates_and_unknown_sorts_rejected() {
        let mut sig = Signature::new();
        let s = sig.add_sort("S").unwrap();
        assert_eq!(
            sig.add_sort("S"),
            Err(SignatureError::DuplicateSort("S".to_string()))
        );

        sig.add_operation("f", vec![s], s).unwrap();
        assert_eq!(
            sig.add_operation("f", vec![], s),
            Err(SignatureError::DuplicateOperation("f".to_string()))
        );
        assert_eq!(
            sig.add_predicate("p", vec![s, 3]),
            Err(SignatureError::UnknownSort {
                symbol: "p".to_string(),
                sort: 3
            })
        );
        assert_eq!(sig.num_predicates(), 0);
    }
}
