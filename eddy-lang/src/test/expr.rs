use std::sync::Arc;

use crate::{
    add, both, branch, cons, contains, either, equal, index_of, length, less, matches, negate,
    read, repeat, slice, write, Literal, Op, Txn,
};
use test_log::test;

#[test]
fn test_constant_fold_arithmetic() {
    // add(6, 9) constructs to the same value as real(15) directly.
    assert_eq!(add(Txn::real(6.0), Txn::real(9.0)), Txn::real(15.0));
    // Folds that land on canonical constants re-converge on the interned cell.
    let folded = add(Txn::real(0.5), Txn::real(0.5));
    match folded {
        Txn::Lit(l) => assert!(Arc::ptr_eq(&l, &Literal::real(1.0))),
        Txn::Exp(_) => panic!("expected fold to a literal"),
    }
}

#[test]
fn test_add_overload() {
    // Either text operand turns add into stringified concatenation.
    assert_eq!(add(Txn::text("a"), Txn::real(0.0)), Txn::text("a0.0"));
    assert_eq!(add(Txn::real(1.0), Txn::text("b")), Txn::text("1.0b"));
    assert_eq!(add(Txn::text("foo"), Txn::text("bar")), Txn::text("foobar"));
    // Flags coerce to reals on the numeric side.
    assert_eq!(add(Txn::flag(true), Txn::real(1.0)), Txn::real(2.0));
}

#[test]
fn test_branch_fold() {
    assert_eq!(
        branch(Txn::flag(true), Txn::text("y"), Txn::text("n")),
        Txn::text("y")
    );
    assert_eq!(
        branch(Txn::flag(false), Txn::text("y"), Txn::text("n")),
        Txn::text("n")
    );
    // A non-literal guard stays a node.
    let t = branch(read(Txn::text("k")), Txn::text("y"), Txn::text("n"));
    assert!(!t.is_lit());
}

#[test]
fn test_cons_fold() {
    // A pure literal head has no observable effect and drops out.
    assert_eq!(cons(Txn::real(3.0), Txn::text("x")), Txn::text("x"));
    // An effectful head is retained.
    let t = cons(write(Txn::text("k"), Txn::real(1.0)), Txn::text("x"));
    match &t {
        Txn::Exp(e) => assert_eq!(e.op, Op::Cons),
        Txn::Lit(_) => panic!("expected a cons node"),
    }
}

#[test]
fn test_repeat_fold() {
    // A literal-false guard collapses; a literal-true guard must not unroll.
    assert_eq!(repeat(Txn::flag(false), Txn::real(1.0)), Txn::none());
    let diverges = repeat(Txn::flag(true), Txn::real(1.0));
    assert!(!diverges.is_lit());
}

#[test]
fn test_short_circuit() {
    let effectful = write(Txn::text("k"), Txn::real(1.0));
    assert_eq!(both(Txn::flag(false), effectful.clone()), Txn::flag(false));
    assert_eq!(either(Txn::flag(true), effectful.clone()), Txn::flag(true));
    // A literal-true first operand cannot decide both() alone.
    assert!(!both(Txn::flag(true), effectful).is_lit());
    assert_eq!(both(Txn::flag(true), Txn::real(2.0)), Txn::flag(true));
}

#[test]
fn test_simplifier_purity_and_idempotence() {
    // Non-literal operands build structurally equal trees on repeated
    // construction, and rebuilding a built tree changes nothing.
    let t1 = add(read(Txn::text("k")), Txn::real(1.0));
    let t2 = add(read(Txn::text("k")), Txn::real(1.0));
    assert_eq!(t1, t2);
    match &t1 {
        Txn::Exp(e) => {
            let rebuilt = add(e.args[0].clone(), e.args[1].clone());
            assert_eq!(rebuilt, t1);
        }
        Txn::Lit(_) => panic!("expected a node"),
    }
}

#[test]
fn test_string_ops() {
    assert_eq!(length(Txn::text("héllo")), Txn::real(5.0));
    assert_eq!(
        slice(Txn::text("hello"), Txn::real(1.0), Txn::real(3.0)),
        Txn::text("el")
    );
    // Out-of-range bounds clamp.
    assert_eq!(
        slice(Txn::text("hello"), Txn::real(-2.0), Txn::real(99.0)),
        Txn::text("hello")
    );
    assert_eq!(
        slice(Txn::text("hello"), Txn::real(4.0), Txn::real(2.0)),
        Txn::text("")
    );
    assert_eq!(
        contains(Txn::text("hello"), Txn::text("ell")),
        Txn::flag(true)
    );
    assert_eq!(
        index_of(Txn::text("hello"), Txn::text("lo")),
        Txn::real(3.0)
    );
    assert_eq!(
        index_of(Txn::text("hello"), Txn::text("xyz")),
        Txn::real(-1.0)
    );
    // indexOf counts chars, not bytes.
    assert_eq!(index_of(Txn::text("héllo"), Txn::text("llo")), Txn::real(2.0));
}

#[test]
fn test_matches() {
    assert_eq!(
        matches(Txn::text("abc123"), Txn::text("[a-z]+[0-9]+")),
        Txn::flag(true)
    );
    // Whole-string semantics: a partial hit is not a match.
    assert_eq!(
        matches(Txn::text("abc123!"), Txn::text("[a-z]+[0-9]+")),
        Txn::flag(false)
    );
    // An invalid pattern matches nothing rather than failing.
    assert_eq!(matches(Txn::text("x"), Txn::text("(")), Txn::flag(false));
}

#[test]
fn test_logic_fold() {
    assert_eq!(negate(Txn::flag(true)), Txn::flag(false));
    assert_eq!(negate(Txn::none()), Txn::flag(true));
    assert_eq!(equal(Txn::none(), Txn::none()), Txn::flag(true));
    assert_eq!(equal(Txn::text("1.0"), Txn::real(1.0)), Txn::flag(false));
    assert_eq!(less(Txn::real(1.0), Txn::real(2.0)), Txn::flag(true));
}

#[test]
fn test_division_is_total() {
    let t = crate::div(Txn::real(1.0), Txn::real(0.0));
    match t {
        Txn::Lit(l) => assert_eq!(l.as_real(), f64::INFINITY),
        Txn::Exp(_) => panic!("expected fold"),
    }
}
