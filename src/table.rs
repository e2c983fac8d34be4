//! Relation tables of a partial structure.
//!
//! - [`OperationTable`]: the graph of a partial function, at most one row per
//!   argument tuple
//! - [`PredicateTable`]: append-only tuple log + membership bitmap
//!
//! Tables know nothing about equality: keeping their rows canonical is the
//! structure's job (see `PartialStructure::rebuild`). Every table carries a
//! generation counter that grows on each modification, which the chase uses
//! to skip rules whose inputs did not change.

use std::collections::HashMap;

use roaring::RoaringTreemap;

use crate::id::Slid;

/// Tuple ID: index into a predicate's append-only tuple log
pub type TupleId = usize;

/// Read access shared by both kinds of table.
pub trait RelationStorage {
    /// Check if a full row is in the table
    fn contains(&self, row: &[Slid]) -> bool;

    /// Number of rows currently in the table
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of Slids per row (operation rows include the result)
    fn width(&self) -> usize;

    /// Modification counter
    fn generation(&self) -> u64;

    /// All rows, as owned vectors
    fn rows(&self) -> Box<dyn Iterator<Item = Vec<Slid>> + '_>;
}

/// Graph of a partial operation: argument tuple → result.
#[derive(Clone, Debug)]
pub struct OperationTable {
    arity: usize,
    rows: HashMap<Vec<Slid>, Slid>,
    generation: u64,
}

impl OperationTable {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            rows: HashMap::new(),
            generation: 0,
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Result stored for exactly these arguments
    pub fn get(&self, args: &[Slid]) -> Option<Slid> {
        self.rows.get(args).copied()
    }

    /// Insert `args ↦ result` unless a row for `args` exists.
    ///
    /// Returns the previously stored result on conflict (the table is left
    /// unchanged), `None` if the row was inserted.
    pub fn insert(&mut self, args: Vec<Slid>, result: Slid) -> Option<Slid> {
        debug_assert_eq!(args.len(), self.arity, "operation arity mismatch");
        match self.rows.get(&args) {
            Some(&existing) => Some(existing),
            None => {
                self.rows.insert(args, result);
                self.generation += 1;
                None
            }
        }
    }

    /// Remove the row for `args`, returning its result
    pub fn remove(&mut self, args: &[Slid]) -> Option<Slid> {
        let removed = self.rows.remove(args);
        if removed.is_some() {
            self.generation += 1;
        }
        removed
    }

    /// Iterate over `(args, result)` rows
    pub fn iter(&self) -> impl Iterator<Item = (&[Slid], Slid)> + '_ {
        self.rows.iter().map(|(args, &result)| (args.as_slice(), result))
    }
}

impl RelationStorage for OperationTable {
    fn contains(&self, row: &[Slid]) -> bool {
        match row.split_last() {
            Some((result, args)) if args.len() == self.arity => self.get(args) == Some(*result),
            _ => false,
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn width(&self) -> usize {
        self.arity + 1
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn rows(&self) -> Box<dyn Iterator<Item = Vec<Slid>> + '_> {
        Box::new(self.iter().map(|(args, result)| {
            let mut row = args.to_vec();
            row.push(result);
            row
        }))
    }
}

/// Append-only tuple log with membership bitmap.
///
/// Tuples are assigned stable IDs (their index in the log). The extent
/// bitmap tracks which tuples currently hold, so a tuple retracted during
/// re-canonicalization keeps its ID if it is ever asserted again.
#[derive(Clone, Debug)]
pub struct PredicateTable {
    arity: usize,
    /// Append-only log of all tuples ever inserted
    tuples: Vec<Vec<Slid>>,
    /// Map from tuple to its ID
    tuple_to_id: HashMap<Vec<Slid>, TupleId>,
    /// Bitmap of tuple IDs currently in the extent
    extent: RoaringTreemap,
    generation: u64,
}

impl PredicateTable {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            tuples: Vec::new(),
            tuple_to_id: HashMap::new(),
            extent: RoaringTreemap::new(),
            generation: 0,
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Insert a tuple, returns true if newly inserted
    pub fn insert(&mut self, tuple: Vec<Slid>) -> bool {
        debug_assert_eq!(tuple.len(), self.arity, "predicate arity mismatch");

        let id = match self.tuple_to_id.get(&tuple) {
            Some(&id) => id,
            None => {
                let id = self.tuples.len();
                self.tuple_to_id.insert(tuple.clone(), id);
                self.tuples.push(tuple);
                id
            }
        };
        let inserted = self.extent.insert(id as u64);
        if inserted {
            self.generation += 1;
        }
        inserted
    }

    /// Retract a tuple, returns true if it was present
    pub fn remove(&mut self, tuple: &[Slid]) -> bool {
        let removed = match self.tuple_to_id.get(tuple) {
            Some(&id) => self.extent.remove(id as u64),
            None => false,
        };
        if removed {
            self.generation += 1;
        }
        removed
    }

    pub fn get_tuple(&self, id: TupleId) -> Option<&[Slid]> {
        self.tuples.get(id).map(|v| v.as_slice())
    }

    /// Iterate over all tuples currently in the extent
    pub fn iter(&self) -> impl Iterator<Item = &[Slid]> + '_ {
        self.extent
            .iter()
            .filter_map(|id| self.tuples.get(id as usize).map(|v| v.as_slice()))
    }
}

impl RelationStorage for PredicateTable {
    fn contains(&self, tuple: &[Slid]) -> bool {
        match self.tuple_to_id.get(tuple) {
            Some(&id) => self.extent.contains(id as u64),
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.extent.len() as usize
    }

    fn width(&self) -> usize {
        self.arity
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn rows(&self) -> Box<dyn Iterator<Item = Vec<Slid>> + '_> {
        Box::new(self.iter().map(<[Slid]>::to_vec))
    }
}
