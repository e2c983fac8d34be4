//! phl: saturation of partial algebraic structures
//!
//! A partial structure is a finite, growing interpretation of a multi-sorted
//! signature with partial operations and predicates. phl maintains one under
//! equality (union-find with congruence) and closes it under Horn axioms with
//! a chase, which is how free models of partial Horn theories are built
//! incrementally by a host such as a type checker.

pub mod axiom;
pub mod chase;
pub mod equality;
pub mod error;
pub mod id;
pub mod model;
pub mod pretty;
pub mod signature;
pub mod structure;
pub mod table;

pub use axiom::{Atom, Axiom, AxiomBuilder};
pub use chase::{chase_fixpoint, chase_step, compile_axiom, compile_axioms, ChaseConfig, ChaseRule, ChaseStats};
pub use error::{AxiomError, ChaseError, SignatureError, StructureError};
pub use id::{OpId, PredId, Slid, SortId, Var};
pub use model::{Model, Theory};
pub use pretty::pretty_print;
pub use signature::{Operation, Predicate, Signature};
pub use structure::{PartialStructure, StructureStats};
