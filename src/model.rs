//! The host-facing surface: a theory and a model under construction.
//!
//! A [`Theory`] is a signature plus its ordered axiom list. A [`Model`] is a
//! partial structure of that theory together with the compiled axioms, so
//! the host can record facts as it elaborates terms and saturate whenever
//! it needs equality answers that account for the axioms.
//!
//! ```
//! use std::rc::Rc;
//! use phl::axiom::Axiom;
//! use phl::model::{Model, Theory};
//! use phl::signature::Signature;
//!
//! let mut sig = Signature::new();
//! let s = sig.add_sort("S").unwrap();
//! sig.add_operation("a", vec![], s).unwrap();
//! sig.add_operation("f", vec![s], s).unwrap();
//!
//! let idem = Axiom::builder(&sig, "f_idempotent")
//!     .var("x", "S")
//!     .var("y", "S")
//!     .var("z", "S")
//!     .premise_op("f", &["x"], "y")
//!     .premise_op("f", &["y"], "z")
//!     .conclude_eq("y", "z")
//!     .build()
//!     .unwrap();
//!
//! let theory = Theory::new(sig).with_axiom(idem);
//! let mut model = Model::new(&theory).unwrap();
//!
//! let (a, f) = (model.operation("a").unwrap(), model.operation("f").unwrap());
//! let x = model.define_operation(a, &[]).unwrap();
//! let fx = model.define_operation(f, &[x]).unwrap();
//! let ffx = model.define_operation(f, &[fx]).unwrap();
//! assert!(!model.are_equal(fx, ffx).unwrap());
//!
//! model.compute_fixpoint().unwrap();
//! assert!(model.are_equal(fx, ffx).unwrap());
//! ```

use std::rc::Rc;

use crate::axiom::Axiom;
use crate::chase::{chase_fixpoint, compile_axioms, ChaseConfig, ChaseRule, ChaseStats};
use crate::error::{AxiomError, ChaseError, StructureError};
use crate::id::{OpId, PredId, Slid, SortId};
use crate::signature::Signature;
use crate::structure::PartialStructure;

/// A signature together with its axioms
#[derive(Clone, Debug)]
pub struct Theory {
    pub signature: Rc<Signature>,
    pub axioms: Vec<Axiom>,
}

impl Theory {
    pub fn new(signature: Signature) -> Self {
        Self {
            signature: Rc::new(signature),
            axioms: Vec::new(),
        }
    }

    pub fn with_axiom(mut self, axiom: Axiom) -> Self {
        self.axioms.push(axiom);
        self
    }

    pub fn add_axiom(&mut self, axiom: Axiom) {
        self.axioms.push(axiom);
    }
}

/// A partial model of a theory. Dropping it releases all of its state.
#[derive(Debug)]
pub struct Model {
    structure: PartialStructure,
    rules: Vec<ChaseRule>,
    config: ChaseConfig,
}

impl Model {
    /// Create an empty model, compiling the theory's axioms once
    pub fn new(theory: &Theory) -> Result<Self, AxiomError> {
        let rules = compile_axioms(&theory.axioms, &theory.signature)?;
        Ok(Self {
            structure: PartialStructure::new(Rc::clone(&theory.signature)),
            rules,
            config: ChaseConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ChaseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ChaseConfig {
        &self.config
    }

    pub fn signature(&self) -> &Rc<Signature> {
        self.structure.signature()
    }

    pub fn sort(&self, name: &str) -> Option<SortId> {
        self.signature().lookup_sort(name)
    }

    pub fn operation(&self, name: &str) -> Option<OpId> {
        self.signature().lookup_operation(name)
    }

    pub fn predicate(&self, name: &str) -> Option<PredId> {
        self.signature().lookup_predicate(name)
    }

    pub fn are_equal(&mut self, x: Slid, y: Slid) -> Result<bool, StructureError> {
        self.structure.are_equal(x, y)
    }

    pub fn define_operation(&mut self, op: OpId, args: &[Slid]) -> Result<Slid, StructureError> {
        self.structure.define_operation(op, args)
    }

    pub fn define_predicate(&mut self, pred: PredId, args: &[Slid]) -> Result<bool, StructureError> {
        self.structure.define_predicate(pred, args)
    }

    pub fn merge(&mut self, x: Slid, y: Slid) -> Result<bool, StructureError> {
        self.structure.merge(x, y)
    }

    /// Saturate the model under the theory's axioms
    pub fn compute_fixpoint(&mut self) -> Result<ChaseStats, ChaseError> {
        let stats = chase_fixpoint(&self.rules, &mut self.structure, &self.config)?;
        log::debug!(
            "fixpoint after {} iterations: {} elements created, {} merges",
            stats.iterations,
            stats.elements_created,
            stats.merges
        );
        Ok(stats)
    }

    pub fn rules(&self) -> &[ChaseRule] {
        &self.rules
    }

    pub fn structure(&self) -> &PartialStructure {
        &self.structure
    }

    pub fn structure_mut(&mut self) -> &mut PartialStructure {
        &mut self.structure
    }
}
