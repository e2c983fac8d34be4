//! Fuzz partial structures and the chase
//!
//! Each input byte pair is decoded into a host operation, including ill-sorted
//! and out-of-range ones. Errors are fine; panics and broken invariants are not.

#![no_main]

use std::rc::Rc;

use libfuzzer_sys::fuzz_target;
use phl::axiom::Axiom;
use phl::chase::{chase_fixpoint, compile_axioms, ChaseConfig};
use phl::signature::Signature;
use phl::structure::PartialStructure;

fn signature() -> Signature {
    let mut sig = Signature::new();
    let s = sig.add_sort("S").unwrap();
    let t = sig.add_sort("T").unwrap();
    sig.add_operation("e", vec![], s).unwrap();
    sig.add_operation("f", vec![s], s).unwrap();
    sig.add_operation("g", vec![s, s], s).unwrap();
    sig.add_operation("h", vec![s], t).unwrap();
    sig.add_predicate("P", vec![s, t]).unwrap();
    sig
}

fn axioms(sig: &Signature) -> Vec<Axiom> {
    vec![
        Axiom::builder(sig, "f_idempotent")
            .var("x", "S")
            .var("y", "S")
            .var("z", "S")
            .premise_op("f", &["x"], "y")
            .premise_op("f", &["y"], "z")
            .conclude_eq("y", "z")
            .build()
            .unwrap(),
        Axiom::builder(sig, "h_graph")
            .var("x", "S")
            .var("t", "T")
            .premise_op("h", &["x"], "t")
            .conclude_pred("P", &["x", "t"])
            .build()
            .unwrap(),
        // Not terminating on its own: exercises the budget
        Axiom::builder(sig, "g_total")
            .var("x", "S")
            .var("y", "S")
            .conclude_op("g", &["x", "x"], "y")
            .build()
            .unwrap(),
    ]
}

fuzz_target!(|data: &[u8]| {
    let sig = Rc::new(signature());
    let rules = compile_axioms(&axioms(&sig), &sig).unwrap();
    let mut structure = PartialStructure::new(Rc::clone(&sig));

    for chunk in data.chunks(3) {
        let &[tag, x, y] = chunk else { break };
        let (x, y) = (x as usize, y as usize);
        let _ = match tag % 8 {
            0 => structure.add_element(x % 3).map(|_| ()),
            1 => structure.define_operation(x % 5, &[y]).map(|_| ()),
            2 => structure.define_operation(2, &[x, y]).map(|_| ()),
            3 => structure.define_operation(0, &[]).map(|_| ()),
            4 => structure.define_predicate(0, &[x, y]).map(|_| ()),
            5 => structure.merge(x, y).map(|_| ()),
            6 => structure.rebuild().map(|_| ()),
            _ => structure.holds(0, &[x, y]).map(|_| ()),
        };
        assert!(structure.check_invariants().is_ok());
    }

    // Budget exhaustion is an expected outcome; anything else is a bug
    let config = ChaseConfig::unbounded().with_max_iterations(8).with_max_elements(512);
    if let Err(err) = chase_fixpoint(&rules, &mut structure, &config) {
        assert!(err.is_non_termination(), "{err}");
    }
    structure.rebuild().unwrap();
    assert!(structure.check_invariants().is_ok());
});
