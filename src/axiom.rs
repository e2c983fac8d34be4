//! Horn axioms over a signature.
//!
//! An axiom is a sequent `premises ⊢ conclusions` universally quantified over
//! a context of sorted variables. Atoms only mention variables, so nested
//! terms are flattened: `f(f(x)) = f(x)` becomes
//!
//! ```text
//! x y z : S | f(x) = y, f(y) = z  ⊢  y = z
//! ```
//!
//! A conclusion `op(args) = r` whose `r` is not bound by the premises and
//! not read by an earlier conclusion is *surjective*: firing it materializes
//! `op(args)` and binds `r` to the result, so later conclusions may use it.
//!
//! Any other context variable that no premise atom binds ranges over the
//! carrier of its sort (`x : S | ⊢ g(x) = y` defines `g` everywhere on `S`;
//! in `g : Ctx | ⊢ id(g) = i, dom(i) = g` the second conclusion merges
//! `dom(i)` with the `g` the first one read).

use crate::error::AxiomError;
use crate::id::{OpId, PredId, SortId, Var};
use crate::signature::Signature;

/// An atomic formula over axiom variables
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Atom {
    /// `op(args) = result`
    Op {
        op: OpId,
        args: Vec<Var>,
        result: Var,
    },
    /// `pred(args)`
    Pred { pred: PredId, args: Vec<Var> },
    /// `lhs = rhs`
    Eq(Var, Var),
}

impl Atom {
    /// Variables read by this atom, in order (the result of `Op` included)
    pub fn vars(&self) -> Vec<Var> {
        match self {
            Atom::Op { args, result, .. } => {
                let mut vars = args.clone();
                vars.push(*result);
                vars
            }
            Atom::Pred { args, .. } => args.clone(),
            Atom::Eq(lhs, rhs) => vec![*lhs, *rhs],
        }
    }
}

/// A Horn axiom: `∀ vars. premises ⊢ conclusions`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Axiom {
    /// Human-readable name, used in errors and logs
    pub name: String,
    /// The context: variable names and sorts, indexed by Var
    pub vars: Vec<(String, SortId)>,
    /// Conjunction matched against the structure
    pub premises: Vec<Atom>,
    /// Applied in order for every match
    pub conclusions: Vec<Atom>,
}

impl Axiom {
    pub fn builder<'a>(signature: &'a Signature, name: impl Into<String>) -> AxiomBuilder<'a> {
        AxiomBuilder::new(signature, name)
    }

    pub fn var_name(&self, var: Var) -> &str {
        self.vars.get(var).map(|(n, _)| n.as_str()).unwrap_or("?")
    }
}

/// Builds an [`Axiom`] from symbol and variable names.
///
/// Errors are sticky: the first one is reported by [`AxiomBuilder::build`],
/// which also checks the axiom is well-formed against the signature.
///
/// ```
/// use phl::axiom::Axiom;
/// use phl::signature::Signature;
///
/// let mut sig = Signature::new();
/// let s = sig.add_sort("S").unwrap();
/// sig.add_operation("f", vec![s], s).unwrap();
///
/// let idem = Axiom::builder(&sig, "f_idempotent")
///     .var("x", "S")
///     .var("y", "S")
///     .var("z", "S")
///     .premise_op("f", &["x"], "y")
///     .premise_op("f", &["y"], "z")
///     .conclude_eq("y", "z")
///     .build()
///     .unwrap();
/// assert_eq!(idem.premises.len(), 2);
/// ```
pub struct AxiomBuilder<'a> {
    signature: &'a Signature,
    axiom: Axiom,
    error: Option<AxiomError>,
}

impl<'a> AxiomBuilder<'a> {
    pub fn new(signature: &'a Signature, name: impl Into<String>) -> Self {
        Self {
            signature,
            axiom: Axiom {
                name: name.into(),
                vars: Vec::new(),
                premises: Vec::new(),
                conclusions: Vec::new(),
            },
            error: None,
        }
    }

    fn fail(&mut self, error: AxiomError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Declare a variable of the given sort
    pub fn var(mut self, name: &str, sort: &str) -> Self {
        let axiom = self.axiom.name.clone();
        if self.axiom.vars.iter().any(|(n, _)| n == name) {
            self.fail(AxiomError::DuplicateVariable {
                axiom,
                name: name.to_string(),
            });
            return self;
        }
        match self.signature.lookup_sort(sort) {
            Some(sort) => self.axiom.vars.push((name.to_string(), sort)),
            None => self.fail(AxiomError::UnknownSortName {
                axiom,
                name: sort.to_string(),
            }),
        }
        self
    }

    fn resolve_var(&mut self, name: &str) -> Option<Var> {
        let found = self.axiom.vars.iter().position(|(n, _)| n == name);
        if found.is_none() {
            self.fail(AxiomError::UnknownVariableName {
                axiom: self.axiom.name.clone(),
                name: name.to_string(),
            });
        }
        found
    }

    fn resolve_vars(&mut self, names: &[&str]) -> Option<Vec<Var>> {
        names.iter().map(|n| self.resolve_var(n)).collect()
    }

    fn op_atom(&mut self, op: &str, args: &[&str], result: &str) -> Option<Atom> {
        let Some(op_id) = self.signature.lookup_operation(op) else {
            self.fail(AxiomError::UnknownOperationName {
                axiom: self.axiom.name.clone(),
                name: op.to_string(),
            });
            return None;
        };
        let args = self.resolve_vars(args)?;
        let result = self.resolve_var(result)?;
        Some(Atom::Op {
            op: op_id,
            args,
            result,
        })
    }

    fn pred_atom(&mut self, pred: &str, args: &[&str]) -> Option<Atom> {
        let Some(pred_id) = self.signature.lookup_predicate(pred) else {
            self.fail(AxiomError::UnknownPredicateName {
                axiom: self.axiom.name.clone(),
                name: pred.to_string(),
            });
            return None;
        };
        let args = self.resolve_vars(args)?;
        Some(Atom::Pred {
            pred: pred_id,
            args,
        })
    }

    fn eq_atom(&mut self, lhs: &str, rhs: &str) -> Option<Atom> {
        let lhs = self.resolve_var(lhs)?;
        let rhs = self.resolve_var(rhs)?;
        Some(Atom::Eq(lhs, rhs))
    }

    /// Premise `op(args) = result`
    pub fn premise_op(mut self, op: &str, args: &[&str], result: &str) -> Self {
        if let Some(atom) = self.op_atom(op, args, result) {
            self.axiom.premises.push(atom);
        }
        self
    }

    /// Premise `pred(args)`
    pub fn premise_pred(mut self, pred: &str, args: &[&str]) -> Self {
        if let Some(atom) = self.pred_atom(pred, args) {
            self.axiom.premises.push(atom);
        }
        self
    }

    /// Premise `lhs = rhs`
    pub fn premise_eq(mut self, lhs: &str, rhs: &str) -> Self {
        if let Some(atom) = self.eq_atom(lhs, rhs) {
            self.axiom.premises.push(atom);
        }
        self
    }

    /// Conclusion `op(args) = result`, materializing `op(args)` when needed
    pub fn conclude_op(mut self, op: &str, args: &[&str], result: &str) -> Self {
        if let Some(atom) = self.op_atom(op, args, result) {
            self.axiom.conclusions.push(atom);
        }
        self
    }

    /// Conclusion `pred(args)`
    pub fn conclude_pred(mut self, pred: &str, args: &[&str]) -> Self {
        if let Some(atom) = self.pred_atom(pred, args) {
            self.axiom.conclusions.push(atom);
        }
        self
    }

    /// Conclusion `lhs = rhs`
    pub fn conclude_eq(mut self, lhs: &str, rhs: &str) -> Self {
        if let Some(atom) = self.eq_atom(lhs, rhs) {
            self.axiom.conclusions.push(atom);
        }
        self
    }

    pub fn build(self) -> Result<Axiom, AxiomError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        crate::chase::compile_axiom(&self.axiom, self.signature, 0)?;
        Ok(self.axiom)
    }
}
