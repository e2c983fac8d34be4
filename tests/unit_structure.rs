//! Unit tests for partial structures: creation, functionality up to
//! equality, congruence, and contract violations


use std::rc::Rc;

use generators::{empty_structure, test_signature, E, F, G, H, P, Q, S, T};
use phl::error::StructureError;
use phl::pretty::pretty_print;
use phl::signature::Signature;
use phl::structure::PartialStructure;
use phl::table::RelationStorage;

#[test]
fn test_nullary_operation_is_defined_once() {
    let mut s = empty_structure();

    let e = s.define_operation(E, &[]).unwrap();
    assert_eq!(e, 0);
    assert_eq!(s.len(), 1);

    let again = s.define_operation(E, &[]).unwrap();
    assert_eq!(again, 0);
    assert_eq!(s.len(), 1);
    assert!(s.are_equal(e, again).unwrap());
}

#[test]
fn test_generators_are_distinct() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();
    let t = s.add_element(T).unwrap();

    assert_eq!((a, b, t), (0, 1, 2));
    assert!(!s.are_equal(a, b).unwrap());
    assert_eq!(s.sort_of(t).unwrap(), T);
    assert_eq!(s.carrier(S).unwrap().len(), 2);
    assert_eq!(s.carrier(T).unwrap().len(), 1);
    assert_eq!(s.num_classes(), 3);
}

#[test]
fn test_unknown_sort_is_rejected() {
    let mut s = empty_structure();
    assert!(matches!(s.add_element(7), Err(StructureError::UnknownSort(7))));
    assert!(s.is_empty());
}

#[test]
fn test_operation_results_have_codomain_sort() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let ha = s.define_operation(H, &[a]).unwrap();
    assert_eq!(s.sort_of(ha).unwrap(), T);
    assert_eq!(s.lookup_operation(H, &[a]).unwrap(), Some(ha));
}

#[test]
fn test_lookup_does_not_create() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    assert_eq!(s.lookup_operation(F, &[a]).unwrap(), None);
    assert_eq!(s.len(), 1);
}

#[test]
fn test_forward_reference_is_rejected() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();

    let err = s.define_operation(F, &[a + 1]).unwrap_err();
    assert!(matches!(err, StructureError::ForwardReference { arg: 1, next: 1 }));

    let err = s.define_operation(G, &[a, 42]).unwrap_err();
    assert!(matches!(err, StructureError::ForwardReference { arg: 42, .. }));

    // Nothing was created by the failed calls
    assert_eq!(s.len(), 1);
    assert_eq!(s.num_rows(), 0);
}

#[test]
fn test_arity_and_sort_mismatch() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let t = s.add_element(T).unwrap();

    assert!(matches!(
        s.define_operation(G, &[a]),
        Err(StructureError::ArityMismatch { expected: 2, actual: 1, .. })
    ));
    assert!(matches!(
        s.define_operation(F, &[t]),
        Err(StructureError::SortMismatch { position: 0, expected: S, actual: T, .. })
    ));
    assert!(matches!(
        s.define_predicate(P, &[t, a]),
        Err(StructureError::SortMismatch { position: 0, .. })
    ));
    assert!(matches!(
        s.define_operation(99, &[]),
        Err(StructureError::UnknownOperation(99))
    ));
    assert!(matches!(
        s.define_predicate(99, &[]),
        Err(StructureError::UnknownPredicate(99))
    ));

    assert_eq!(s.len(), 2);
    assert_eq!(s.num_rows(), 0);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn test_merge_requires_same_sort() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let t = s.add_element(T).unwrap();

    assert!(matches!(
        s.merge(a, t),
        Err(StructureError::MergeSortMismatch { left_sort: S, right_sort: T, .. })
    ));
    assert!(matches!(
        s.merge(a, 5),
        Err(StructureError::UnknownElement { elem: 5, len: 2 })
    ));
    assert!(!s.are_equal(a, t).unwrap());
}

#[test]
fn test_merge_is_idempotent() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();

    assert!(s.merge(a, b).unwrap());
    let classes = s.classes();
    assert!(!s.merge(a, b).unwrap());
    assert!(!s.merge(b, a).unwrap());
    assert!(!s.merge(a, a).unwrap());
    assert_eq!(s.classes(), classes);
    assert_eq!(s.num_classes(), 1);
}

#[test]
fn test_functionality_up_to_equality() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();
    s.merge(a, b).unwrap();

    let fa = s.define_operation(F, &[a]).unwrap();
    let fb = s.define_operation(F, &[b]).unwrap();
    assert_eq!(fa, fb);
    assert_eq!(s.len(), 3);
}

#[test]
fn test_congruence_after_merge() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();
    let fa = s.define_operation(F, &[a]).unwrap();
    let fb = s.define_operation(F, &[b]).unwrap();
    assert!(!s.are_equal(fa, fb).unwrap());

    s.merge(a, b).unwrap();
    assert!(s.is_dirty());
    assert_eq!(s.rebuild().unwrap(), 1);
    assert!(!s.is_dirty());
    assert!(s.are_equal(fa, fb).unwrap());
    assert_eq!(s.operation_table(F).unwrap().len(), 1);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn test_congruence_propagates_through_nested_terms() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();
    let fa = s.define_operation(F, &[a]).unwrap();
    let fb = s.define_operation(F, &[b]).unwrap();
    let ffa = s.define_operation(F, &[fa]).unwrap();
    let ffb = s.define_operation(F, &[fb]).unwrap();
    let g1 = s.define_operation(G, &[fa, a]).unwrap();
    let g2 = s.define_operation(G, &[fb, b]).unwrap();
    let h1 = s.define_operation(H, &[ffa]).unwrap();
    let h2 = s.define_operation(H, &[ffb]).unwrap();

    s.merge(a, b).unwrap();
    // Any read rebuilds first
    let found = s.lookup_operation(F, &[b]).unwrap();
    assert_eq!(found, Some(s.find(fa).unwrap()));

    assert!(s.are_equal(ffa, ffb).unwrap());
    assert!(s.are_equal(g1, g2).unwrap());
    assert!(s.are_equal(h1, h2).unwrap());
    assert_eq!(s.operation_table(F).unwrap().len(), 2);
    assert_eq!(s.operation_table(G).unwrap().len(), 1);
    assert_eq!(s.operation_table(H).unwrap().len(), 1);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn test_predicates_hold_up_to_equality() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();

    assert!(s.define_predicate(Q, &[a]).unwrap());
    assert!(!s.define_predicate(Q, &[a]).unwrap());
    assert!(s.define_predicate(Q, &[b]).unwrap());
    assert_eq!(s.predicate_table(Q).unwrap().len(), 2);

    s.merge(a, b).unwrap();
    assert!(s.holds(Q, &[b]).unwrap());
    assert!(s.holds(Q, &[a]).unwrap());
    assert!(!s.define_predicate(Q, &[b]).unwrap());
    assert_eq!(s.predicate_table(Q).unwrap().len(), 1);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn test_predicate_tuples_are_canonicalized_on_insert() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();
    let t = s.add_element(T).unwrap();
    s.merge(a, b).unwrap();

    let rep = s.find(b).unwrap();
    s.define_predicate(P, &[b, t]).unwrap();
    let rows: Vec<Vec<usize>> = s.predicate_table(P).unwrap().iter().map(<[usize]>::to_vec).collect();
    assert_eq!(rows, vec![vec![rep, t]]);
}

#[test]
fn test_stats_track_rows_and_merges() {
    let mut s = empty_structure();
    let a = s.add_element(S).unwrap();
    let b = s.add_element(S).unwrap();
    s.define_operation(F, &[a]).unwrap();
    s.define_operation(F, &[b]).unwrap();
    s.define_predicate(Q, &[a]).unwrap();
    s.merge(a, b).unwrap();
    s.rebuild().unwrap();

    let stats = s.stats();
    assert_eq!(stats.elements, 4);
    assert_eq!(stats.classes, 2);
    assert_eq!(stats.operation_rows, 1);
    assert_eq!(stats.predicate_rows, 1);
    assert_eq!(stats.merges, 2);
}

#[test]
fn test_structures_share_a_signature() {
    let sig = Rc::new(test_signature());
    let mut left = PartialStructure::new(Rc::clone(&sig));
    let mut right = PartialStructure::new(Rc::clone(&sig));

    left.define_operation(E, &[]).unwrap();
    assert_eq!(left.len(), 1);
    assert!(right.is_empty());
    assert!(Rc::ptr_eq(left.signature(), right.signature()));
    assert_eq!(right.lookup_operation(E, &[]).unwrap(), None);
}

#[test]
fn test_empty_signature() {
    let mut s = PartialStructure::new(Rc::new(Signature::new()));
    assert!(s.is_empty());
    assert_eq!(s.rebuild().unwrap(), 0);
    assert!(s.check_invariants().is_ok());
    assert_eq!(pretty_print(&s), "structure: 0 elements, 0 classes\n");
}
