//! Chase algorithm: saturating a partial structure under Horn axioms.
//!
//! The chase takes a structure and a list of compiled axioms and repeatedly
//! applies them until a fixpoint is reached: a full pass that creates no
//! element, adds no row and merges no classes.
//!
//! # Algorithm
//!
//! ```text
//! loop:
//!     rebuild()                       // canonical rows, congruence merges
//!     for each rule:
//!         if its inputs are unchanged since it last ran: skip
//!         rebuild()
//!         matches = join(premise)     // over canonical rows
//!         for each binding in matches:
//!             fire(conclusions, binding)
//!     if nothing changed: done
//! ```
//!
//! Firing goes through the same `define_operation` / `define_predicate` /
//! `merge` entry points the host uses, so the structure's invariants hold
//! after every single conclusion.
//!
//! ## Skipping unchanged rules
//!
//! A rule's matches depend only on the tables it scans, the carriers of the
//! sorts it ranges over, and the partition. Each table carries a generation
//! counter and the partition a merge count; when none of them moved since the
//! rule last matched, every match it would find was already fired and all of
//! its conclusions still hold, so the rule is skipped.
//!
//! ## Termination
//!
//! Saturation need not terminate for arbitrary axioms (a surjective axiom
//! like `x : S ⊢ f(x) = y` on its own generates `x, f(x), f(f(x)), …`).
//! [`ChaseConfig`] bounds iterations, elements and wall-clock time, and
//! reports exhaustion as a [`ChaseError`] distinct from contract violations.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::axiom::{Atom, Axiom};
use crate::error::{AxiomError, ChaseError, StructureError};
use crate::id::{OpId, PredId, Slid, SortId, Var};
use crate::signature::Signature;
use crate::structure::PartialStructure;
use crate::table::RelationStorage;

/// Budget for a chase run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaseConfig {
    /// Maximum number of passes over the rules (the final, quiet pass
    /// included). The first pass always runs, so a saturated structure
    /// passes under any budget, `Some(0)` included.
    pub max_iterations: Option<usize>,
    /// Maximum number of elements the structure may reach
    pub max_elements: Option<usize>,
    /// Maximum wall-clock time
    pub time_limit: Option<Duration>,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(10_000),
            max_elements: None,
            time_limit: None,
        }
    }
}

impl ChaseConfig {
    /// A short budget for quick checks
    pub fn quick() -> Self {
        Self {
            max_iterations: Some(100),
            max_elements: Some(10_000),
            time_limit: Some(Duration::from_millis(100)),
        }
    }

    /// A medium budget for real saturation runs
    pub fn medium() -> Self {
        Self {
            max_iterations: Some(1_000),
            max_elements: Some(1_000_000),
            time_limit: Some(Duration::from_secs(5)),
        }
    }

    /// No bound at all, for axiom sets known to terminate
    pub fn unbounded() -> Self {
        Self {
            max_iterations: None,
            max_elements: None,
            time_limit: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_max_elements(mut self, max_elements: usize) -> Self {
        self.max_elements = Some(max_elements);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

/// Counters reported by [`chase_fixpoint`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChaseStats {
    /// Passes over the rule list, the final quiet pass included
    pub iterations: usize,
    /// Matches fired
    pub firings: usize,
    /// Rule evaluations skipped because their inputs did not change
    pub skipped: usize,
    /// Elements created during the run
    pub elements_created: usize,
    /// Merges performed during the run (axiom consequents and congruences)
    pub merges: usize,
}

/// One step of a compiled premise
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Join with the rows of an operation table
    Op {
        op: OpId,
        args: Vec<Var>,
        result: Var,
    },
    /// Join with the tuples of a predicate table
    Pred { pred: PredId, args: Vec<Var> },
    /// Range over the classes of a sort
    Scan { var: Var, sort: SortId },
    /// Both sides bound: keep the binding if they are equal
    Eq(Var, Var),
}

/// A compiled chase rule
#[derive(Clone, Debug)]
pub struct ChaseRule {
    /// Human-readable name for logging
    pub name: String,
    /// Position of the axiom in its theory
    pub index: usize,
    pub num_vars: usize,
    /// Join plan for the premise
    pub plan: Vec<Step>,
    /// Conclusions, fired in order
    pub head: Vec<Atom>,
    /// Operation tables the plan reads
    pub reads_operations: Vec<OpId>,
    /// Predicate tables the plan reads
    pub reads_predicates: Vec<PredId>,
    /// Carriers the plan scans
    pub reads_sorts: Vec<SortId>,
}

struct Checker<'a> {
    axiom: &'a Axiom,
    sig: &'a Signature,
}

impl Checker<'_> {
    fn sort_of(&self, var: Var) -> Result<SortId, AxiomError> {
        self.axiom
            .vars
            .get(var)
            .map(|(_, sort)| *sort)
            .ok_or_else(|| AxiomError::VariableOutOfRange {
                axiom: self.axiom.name.clone(),
                var,
            })
    }

    fn check_sorts(&self, symbol: &str, expected: &[SortId], vars: &[Var]) -> Result<(), AxiomError> {
        if expected.len() != vars.len() {
            return Err(AxiomError::ArityMismatch {
                axiom: self.axiom.name.clone(),
                symbol: symbol.to_string(),
                expected: expected.len(),
                actual: vars.len(),
            });
        }
        for (&var, &sort) in vars.iter().zip(expected) {
            let actual = self.sort_of(var)?;
            if actual != sort {
                return Err(AxiomError::SortMismatch {
                    axiom: self.axiom.name.clone(),
                    symbol: symbol.to_string(),
                    var: self.axiom.var_name(var).to_string(),
                    expected: sort,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn check_atom(&self, atom: &Atom) -> Result<(), AxiomError> {
        match atom {
            Atom::Op { op, args, result } => {
                let operation = self.sig.operation(*op).ok_or_else(|| AxiomError::UnknownOperation {
                    axiom: self.axiom.name.clone(),
                    op: *op,
                })?;
                self.check_sorts(&operation.name, &operation.domain, args)?;
                self.check_sorts(&operation.name, &[operation.codomain], &[*result])
            }
            Atom::Pred { pred, args } => {
                let predicate = self.sig.predicate(*pred).ok_or_else(|| AxiomError::UnknownPredicate {
                    axiom: self.axiom.name.clone(),
                    pred: *pred,
                })?;
                self.check_sorts(&predicate.name, &predicate.arity, args)
            }
            Atom::Eq(lhs, rhs) => {
                let sort = self.sort_of(*lhs)?;
                self.check_sorts("=", &[sort], &[*rhs])
            }
        }
    }
}

/// Variables a conclusion reads; the result of an `Op` conclusion may be
/// unbound, so it is not an input.
fn conclusion_inputs(atom: &Atom) -> Vec<Var> {
    match atom {
        Atom::Op { args, .. } => args.clone(),
        other => other.vars(),
    }
}

/// Compile an axiom into a chase rule, checking it against the signature.
pub fn compile_axiom(axiom: &Axiom, sig: &Signature, index: usize) -> Result<ChaseRule, AxiomError> {
    let checker = Checker { axiom, sig };

    let mut names = BTreeSet::new();
    for (name, sort) in &axiom.vars {
        if !names.insert(name.as_str()) {
            return Err(AxiomError::DuplicateVariable {
                axiom: axiom.name.clone(),
                name: name.clone(),
            });
        }
        if *sort >= sig.num_sorts() {
            return Err(AxiomError::UnknownSort {
                axiom: axiom.name.clone(),
                sort: *sort,
            });
        }
    }
    for atom in axiom.premises.iter().chain(&axiom.conclusions) {
        checker.check_atom(atom)?;
    }

    // Join steps first; they bind every variable they mention.
    let mut plan = Vec::new();
    let mut bound = BTreeSet::new();
    let mut reads_operations = BTreeSet::new();
    let mut reads_predicates = BTreeSet::new();
    for atom in &axiom.premises {
        match atom {
            Atom::Op { op, args, result } => {
                reads_operations.insert(*op);
                plan.push(Step::Op {
                    op: *op,
                    args: args.clone(),
                    result: *result,
                });
                bound.extend(atom.vars());
            }
            Atom::Pred { pred, args } => {
                reads_predicates.insert(*pred);
                plan.push(Step::Pred {
                    pred: *pred,
                    args: args.clone(),
                });
                bound.extend(atom.vars());
            }
            Atom::Eq(..) => {}
        }
    }

    // Variables compared by premise equalities range over their carrier.
    let mut scanned = BTreeSet::new();
    for atom in &axiom.premises {
        if let Atom::Eq(lhs, rhs) = atom {
            for var in [*lhs, *rhs] {
                if !bound.contains(&var) && scanned.insert(var) {
                    plan.push(Step::Scan {
                        var,
                        sort: checker.sort_of(var)?,
                    });
                }
            }
        }
    }

    // Walk the conclusions in order. An `Op` result is introduced by the
    // conclusion (surjective) only if nothing bound it and no earlier
    // conclusion read it; every other input ranges over its carrier.
    let mut existential = BTreeSet::new();
    for atom in &axiom.conclusions {
        for var in conclusion_inputs(atom) {
            if !bound.contains(&var) && !existential.contains(&var) && scanned.insert(var) {
                plan.push(Step::Scan {
                    var,
                    sort: checker.sort_of(var)?,
                });
            }
        }
        if let Atom::Op { result, .. } = atom {
            if !bound.contains(result) && !scanned.contains(result) {
                existential.insert(*result);
            }
        }
    }
    for atom in &axiom.premises {
        if let Atom::Eq(lhs, rhs) = atom {
            plan.push(Step::Eq(*lhs, *rhs));
        }
    }

    let reads_sorts = plan
        .iter()
        .filter_map(|step| match step {
            Step::Scan { sort, .. } => Some(*sort),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    Ok(ChaseRule {
        name: axiom.name.clone(),
        index,
        num_vars: axiom.vars.len(),
        plan,
        head: axiom.conclusions.clone(),
        reads_operations: reads_operations.into_iter().collect(),
        reads_predicates: reads_predicates.into_iter().collect(),
        reads_sorts,
    })
}

/// Compile a list of axioms, in order
pub fn compile_axioms(axioms: &[Axiom], sig: &Signature) -> Result<Vec<ChaseRule>, AxiomError> {
    axioms
        .iter()
        .enumerate()
        .map(|(index, axiom)| compile_axiom(axiom, sig, index))
        .collect()
}

/// A (partial) assignment of elements to rule variables
pub type Binding = Vec<Option<Slid>>;

/// Snapshot of everything a rule's matches depend on
fn rule_inputs(rule: &ChaseRule, structure: &PartialStructure) -> Vec<u64> {
    let mut inputs = vec![structure.equality().merge_count() as u64];
    inputs.extend(
        rule.reads_operations
            .iter()
            .filter_map(|&op| structure.operation_table(op))
            .map(RelationStorage::generation),
    );
    inputs.extend(
        rule.reads_predicates
            .iter()
            .filter_map(|&pred| structure.predicate_table(pred))
            .map(RelationStorage::generation),
    );
    inputs.extend(
        rule.reads_sorts
            .iter()
            .filter_map(|&sort| structure.carrier(sort))
            .map(|carrier| carrier.len()),
    );
    inputs
}

/// Fingerprint that moves whenever the structure gains a fact or a merge
fn fingerprint(structure: &PartialStructure) -> (usize, usize, usize) {
    (
        structure.len(),
        structure.equality().merge_count(),
        structure.num_rows(),
    )
}

/// Canonical representatives of every sort a rule scans
fn scan_domains(
    rule: &ChaseRule,
    structure: &mut PartialStructure,
) -> Result<BTreeMap<SortId, Vec<Slid>>, StructureError> {
    let mut domains = BTreeMap::new();
    for &sort in &rule.reads_sorts {
        let elems: Vec<Slid> = structure
            .carrier(sort)
            .map(|carrier| carrier.iter().map(|e| e as Slid).collect())
            .unwrap_or_default();
        let mut reps = Vec::new();
        for elem in elems {
            if structure.find(elem)? == elem {
                reps.push(elem);
            }
        }
        domains.insert(sort, reps);
    }
    Ok(domains)
}

/// Bind `vars` to `values` position by position. On conflict, undo and
/// return None; otherwise return the variables that were newly bound.
fn bind_row(vars: &[Var], values: &[Slid], binding: &mut Binding) -> Option<Vec<Var>> {
    let mut newly = Vec::new();
    for (&var, &value) in vars.iter().zip(values) {
        match binding[var] {
            Some(existing) if existing != value => {
                unbind(&newly, binding);
                return None;
            }
            Some(_) => {}
            None => {
                binding[var] = Some(value);
                newly.push(var);
            }
        }
    }
    Some(newly)
}

fn unbind(vars: &[Var], binding: &mut Binding) {
    for &var in vars {
        binding[var] = None;
    }
}

fn search(
    plan: &[Step],
    structure: &PartialStructure,
    domains: &BTreeMap<SortId, Vec<Slid>>,
    binding: &mut Binding,
    out: &mut Vec<Binding>,
) {
    let Some((step, rest)) = plan.split_first() else {
        out.push(binding.clone());
        return;
    };

    match step {
        Step::Op { op, args, result } => {
            let Some(table) = structure.operation_table(*op) else {
                return;
            };
            let key: Option<Vec<Slid>> = args.iter().map(|&v| binding[v]).collect();
            if let Some(key) = key {
                // All arguments bound: a single lookup.
                if let Some(value) = table.get(&key) {
                    if let Some(newly) = bind_row(&[*result], &[value], binding) {
                        search(rest, structure, domains, binding, out);
                        unbind(&newly, binding);
                    }
                }
                return;
            }
            for (row_args, row_result) in table.iter() {
                let Some(mut newly) = bind_row(args, row_args, binding) else {
                    continue;
                };
                if let Some(more) = bind_row(&[*result], &[row_result], binding) {
                    newly.extend(more);
                    search(rest, structure, domains, binding, out);
                }
                unbind(&newly, binding);
            }
        }
        Step::Pred { pred, args } => {
            let Some(table) = structure.predicate_table(*pred) else {
                return;
            };
            let tuple: Option<Vec<Slid>> = args.iter().map(|&v| binding[v]).collect();
            if let Some(tuple) = tuple {
                if table.contains(&tuple) {
                    search(rest, structure, domains, binding, out);
                }
                return;
            }
            for row in table.iter() {
                if let Some(newly) = bind_row(args, row, binding) {
                    search(rest, structure, domains, binding, out);
                    unbind(&newly, binding);
                }
            }
        }
        Step::Scan { var, sort } => {
            if binding[*var].is_some() {
                search(rest, structure, domains, binding, out);
                return;
            }
            for &elem in domains.get(sort).map(Vec::as_slice).unwrap_or_default() {
                binding[*var] = Some(elem);
                search(rest, structure, domains, binding, out);
            }
            binding[*var] = None;
        }
        Step::Eq(lhs, rhs) => {
            if binding[*lhs].is_some() && binding[*lhs] == binding[*rhs] {
                search(rest, structure, domains, binding, out);
            }
        }
    }
}

/// All bindings satisfying the rule's premise. The structure is rebuilt
/// first, so every bound value is a canonical representative.
pub fn find_matches(
    rule: &ChaseRule,
    structure: &mut PartialStructure,
) -> Result<Vec<Binding>, StructureError> {
    structure.rebuild()?;
    let domains = scan_domains(rule, structure)?;
    let mut out = Vec::new();
    let mut binding = vec![None; rule.num_vars];
    search(&rule.plan, structure, &domains, &mut binding, &mut out);
    // Table iteration order is arbitrary; fire in a fixed order so runs are reproducible.
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

fn value(rule: &ChaseRule, binding: &Binding, var: Var) -> Result<Slid, StructureError> {
    binding.get(var).copied().flatten().ok_or_else(|| {
        StructureError::Internal(format!("rule `{}` fired with variable #{var} unbound", rule.name))
    })
}

fn values(rule: &ChaseRule, binding: &Binding, vars: &[Var]) -> Result<Vec<Slid>, StructureError> {
    vars.iter().map(|&v| value(rule, binding, v)).collect()
}

/// Fire a rule's conclusions for one binding
fn fire_head(
    rule: &ChaseRule,
    mut binding: Binding,
    structure: &mut PartialStructure,
) -> Result<(), StructureError> {
    for atom in &rule.head {
        match atom {
            Atom::Op { op, args, result } => {
                let args = values(rule, &binding, args)?;
                let elem = structure.define_operation(*op, &args)?;
                match binding[*result] {
                    Some(existing) => {
                        if structure.merge(existing, elem)? {
                            log::trace!("rule `{}`: merged {existing} = {elem}", rule.name);
                        }
                    }
                    None => binding[*result] = Some(elem),
                }
            }
            Atom::Pred { pred, args } => {
                let args = values(rule, &binding, args)?;
                structure.define_predicate(*pred, &args)?;
            }
            Atom::Eq(lhs, rhs) => {
                let (l, r) = (value(rule, &binding, *lhs)?, value(rule, &binding, *rhs)?);
                if structure.merge(l, r)? {
                    log::trace!("rule `{}`: merged {l} = {r}", rule.name);
                }
            }
        }
    }
    Ok(())
}

/// Per-run state: what each rule saw when it last matched
struct ChaseState {
    last_inputs: Vec<Option<Vec<u64>>>,
    stats: ChaseStats,
}

impl ChaseState {
    fn new(num_rules: usize) -> Self {
        Self {
            last_inputs: vec![None; num_rules],
            stats: ChaseStats::default(),
        }
    }

    fn step(
        &mut self,
        rules: &[ChaseRule],
        structure: &mut PartialStructure,
    ) -> Result<bool, ChaseError> {
        let before = fingerprint(structure);
        structure.rebuild()?;

        for (rule, last) in rules.iter().zip(self.last_inputs.iter_mut()) {
            structure.rebuild()?;
            let inputs = rule_inputs(rule, structure);
            if last.as_ref() == Some(&inputs) {
                self.stats.skipped += 1;
                continue;
            }

            let matches = find_matches(rule, structure)?;
            log::trace!("rule `{}`: {} matches", rule.name, matches.len());
            self.stats.firings += matches.len();
            for binding in matches {
                fire_head(rule, binding, structure)?;
            }
            *last = Some(inputs);
        }

        structure.rebuild()?;
        Ok(fingerprint(structure) != before)
    }
}

/// Execute one pass of the chase over all rules.
///
/// Returns `true` if the structure changed (new element, row, or merge).
pub fn chase_step(rules: &[ChaseRule], structure: &mut PartialStructure) -> Result<bool, ChaseError> {
    ChaseState::new(rules.len()).step(rules, structure)
}

/// Run the chase until a fixpoint is reached or the budget runs out.
///
/// On success the structure is not dirty: every stored id is canonical and a
/// further run changes nothing.
pub fn chase_fixpoint(
    rules: &[ChaseRule],
    structure: &mut PartialStructure,
    config: &ChaseConfig,
) -> Result<ChaseStats, ChaseError> {
    let started = Instant::now();
    let elements_before = structure.len();
    let merges_before = structure.equality().merge_count();
    let mut state = ChaseState::new(rules.len());

    loop {
        let changed = state.step(rules, structure)?;
        state.stats.iterations += 1;
        log::debug!(
            "chase iteration {}: {} elements, {} classes, {} rows",
            state.stats.iterations,
            structure.len(),
            structure.num_classes(),
            structure.num_rows()
        );

        if !changed {
            break;
        }
        if let Some(max) = config.max_iterations {
            if state.stats.iterations >= max {
                let iterations = state.stats.iterations;
                log::warn!("chase did not converge after {iterations} iterations");
                return Err(ChaseError::DidNotConverge { iterations });
            }
        }
        if let Some(max) = config.max_elements {
            if structure.len() > max {
                log::warn!("chase exceeded {max} elements");
                return Err(ChaseError::ElementLimitExceeded {
                    elements: structure.len(),
                });
            }
        }
        if let Some(limit) = config.time_limit {
            if started.elapsed() > limit {
                log::warn!("chase exceeded its time limit of {limit:?}");
                return Err(ChaseError::Timeout { limit });
            }
        }
    }

    state.stats.elements_created = structure.len() - elements_before;
    state.stats.merges = structure.equality().merge_count() - merges_before;
    Ok(state.stats)
}
