use std::sync::Arc;

use crate::Literal;
use test_log::test;

#[test]
fn test_interning() {
    // Independent constructions of the canonical literals share identity.
    assert!(Arc::ptr_eq(&Literal::none(), &Literal::none()));
    assert!(Arc::ptr_eq(&Literal::flag(true), &Literal::flag(true)));
    assert!(Arc::ptr_eq(&Literal::flag(false), &Literal::flag(false)));
    assert!(Arc::ptr_eq(&Literal::real(0.0), &Literal::real(0.0)));
    assert!(Arc::ptr_eq(&Literal::real(1.0), &Literal::real(1.0)));
    assert!(Arc::ptr_eq(&Literal::text(""), &Literal::text("")));

    // Non-canonical values are fresh but still value-equal.
    assert_eq!(Literal::real(2.0), Literal::real(2.0));
    assert!(!Arc::ptr_eq(&Literal::real(2.0), &Literal::real(2.0)));
}

#[test]
fn test_flag_coercion() {
    assert!(!Literal::none().as_flag());
    assert!(Literal::real(2.0).as_flag());
    assert!(!Literal::real(0.0).as_flag());
    assert!(Literal::text("x").as_flag());
    assert!(!Literal::text("").as_flag());
}

#[test]
fn test_real_coercion() {
    assert_eq!(Literal::none().as_real(), 0.0);
    assert_eq!(Literal::flag(true).as_real(), 1.0);
    assert_eq!(Literal::flag(false).as_real(), 0.0);
    assert_eq!(Literal::text("2.5").as_real(), 2.5);
    assert!(Literal::text("two").as_real().is_nan());
}

#[test]
fn test_text_coercion() {
    assert_eq!(Literal::none().as_text(), "");
    assert_eq!(Literal::flag(true).as_text(), "true");
    assert_eq!(Literal::flag(false).as_text(), "false");
    // Integer-valued doubles carry one decimal point.
    assert_eq!(Literal::real(0.0).as_text(), "0.0");
    assert_eq!(Literal::real(1.0).as_text(), "1.0");
    assert_eq!(Literal::real(42.0).as_text(), "42.0");
    assert_eq!(Literal::real(1.5).as_text(), "1.5");
    assert_eq!(Literal::text("abc").as_text(), "abc");
}

#[test]
fn test_equals() {
    assert!(Literal::none().equals(&Literal::none()));
    assert!(!Literal::none().equals(&Literal::real(0.0)));
    assert!(Literal::real(2.0).equals(&Literal::real(2.0)));
    assert!(Literal::text("a").equals(&Literal::text("a")));
    // Mixed non-none kinds never compare equal.
    assert!(!Literal::text("1.0").equals(&Literal::real(1.0)));
    assert!(!Literal::flag(true).equals(&Literal::real(1.0)));
}

#[test]
fn test_precedes() {
    assert!(Literal::real(1.0).precedes(&Literal::real(2.0)));
    assert!(!Literal::real(2.0).precedes(&Literal::real(2.0)));
    assert!(Literal::text("a").precedes(&Literal::text("b")));
    assert!(Literal::flag(false).precedes(&Literal::flag(true)));
    assert!(!Literal::flag(true).precedes(&Literal::flag(false)));
    assert!(Literal::none().precedes(&Literal::real(-5.0)));
    assert!(!Literal::none().precedes(&Literal::none()));
}
