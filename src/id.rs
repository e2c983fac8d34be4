//! ID types for phl
//!
//! All identifiers are plain dense indices:
//! - Slids index elements of a structure's carrier (0..N-1, creation order)
//! - SortId/OpId/PredId index the entries of a signature
//! - Vars index the quantified variables of an axiom

/// Structure-Local ID: index of an element in a structure's carrier.
///
/// Elements are allocated densely and never removed, so a Slid is valid
/// in a structure iff it is below `structure.len()`.
pub type Slid = usize;

/// A sort of the signature, by position
pub type SortId = usize;

/// An operation symbol of the signature, by position
pub type OpId = usize;

/// A predicate symbol of the signature, by position
pub type PredId = usize;

/// A variable of an axiom, by position in the axiom's context
pub type Var = usize;
