//! Error types for phl
//!
//! Three kinds of failure are kept apart:
//! - [`StructureError`]: the caller broke a structural contract (unknown
//!   element, wrong arity, wrong sort, forward reference). Never recoverable
//!   by retrying.
//! - [`AxiomError`] / [`SignatureError`]: a malformed theory, rejected before
//!   any structure is touched.
//! - [`ChaseError`]: closure failed, either because a contract was broken
//!   while firing a rule or because saturation ran out of budget.

use std::time::Duration;

use thiserror::Error;

use crate::id::{OpId, PredId, Slid, SortId, Var};

/// Errors raised while building a signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("sort `{0}` is already declared")]
    DuplicateSort(String),
    #[error("operation `{0}` is already declared")]
    DuplicateOperation(String),
    #[error("predicate `{0}` is already declared")]
    DuplicatePredicate(String),
    #[error("symbol `{symbol}` refers to undeclared sort #{sort}")]
    UnknownSort { symbol: String, sort: SortId },
}

/// Contract violations on a partial structure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("element {elem} does not exist (structure has {len} elements)")]
    UnknownElement { elem: Slid, len: usize },
    /// An argument refers to an element that would be created at or after
    /// the element being defined.
    #[error("argument {arg} is not older than the next element {next}")]
    ForwardReference { arg: Slid, next: Slid },
    #[error("operation #{0} is not in the signature")]
    UnknownOperation(OpId),
    #[error("predicate #{0} is not in the signature")]
    UnknownPredicate(PredId),
    #[error("sort #{0} is not in the signature")]
    UnknownSort(SortId),
    #[error("`{symbol}` expects {expected} arguments, got {actual}")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        actual: usize,
    },
    #[error("`{symbol}` argument {position}: element {elem} has sort #{actual}, expected #{expected}")]
    SortMismatch {
        symbol: String,
        position: usize,
        elem: Slid,
        expected: SortId,
        actual: SortId,
    },
    #[error("cannot merge element {left} (sort #{left_sort}) with element {right} (sort #{right_sort})")]
    MergeSortMismatch {
        left: Slid,
        left_sort: SortId,
        right: Slid,
        right_sort: SortId,
    },
    #[error("internal invariant broken: {0}")]
    Internal(String),
}

/// Errors raised while building or compiling an axiom
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AxiomError {
    #[error("axiom `{axiom}`: unknown sort `{name}`")]
    UnknownSortName { axiom: String, name: String },
    #[error("axiom `{axiom}`: unknown operation `{name}`")]
    UnknownOperationName { axiom: String, name: String },
    #[error("axiom `{axiom}`: unknown predicate `{name}`")]
    UnknownPredicateName { axiom: String, name: String },
    #[error("axiom `{axiom}`: unknown variable `{name}`")]
    UnknownVariableName { axiom: String, name: String },
    #[error("axiom `{axiom}`: variable `{name}` declared twice")]
    DuplicateVariable { axiom: String, name: String },
    #[error("axiom `{axiom}`: variable #{var} out of range")]
    VariableOutOfRange { axiom: String, var: Var },
    #[error("axiom `{axiom}`: operation #{op} is not in the signature")]
    UnknownOperation { axiom: String, op: OpId },
    #[error("axiom `{axiom}`: predicate #{pred} is not in the signature")]
    UnknownPredicate { axiom: String, pred: PredId },
    #[error("axiom `{axiom}`: sort #{sort} is not in the signature")]
    UnknownSort { axiom: String, sort: SortId },
    #[error("axiom `{axiom}`: `{symbol}` expects {expected} arguments, got {actual}")]
    ArityMismatch {
        axiom: String,
        symbol: String,
        expected: usize,
        actual: usize,
    },
    #[error("axiom `{axiom}`: variable `{var}` has sort #{actual}, `{symbol}` expects #{expected}")]
    SortMismatch {
        axiom: String,
        symbol: String,
        var: String,
        expected: SortId,
        actual: SortId,
    },
}

/// Errors raised by the closure engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChaseError {
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error("closure did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },
    #[error("closure exceeded the element limit ({elements} elements)")]
    ElementLimitExceeded { elements: usize },
    #[error("closure exceeded its time limit of {limit:?}")]
    Timeout { limit: Duration },
}

impl ChaseError {
    /// Whether this error signals budget exhaustion rather than a broken contract
    pub fn is_non_termination(&self) -> bool {
        !matches!(self, ChaseError::Structure(_))
    }
}
