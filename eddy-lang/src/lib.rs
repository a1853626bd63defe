// The language is a small algebraic expression calculus over transactions.
// A program is a value: a tree of literals and operator nodes. There is no
// statement form, no named functions and no environment beyond a flat local
// map and a flat key namespace, both addressed by text.
//
// Everything pure in the language is total: every coercion between the four
// literal kinds is defined, arithmetic follows IEEE-754 (division by zero
// and domain errors produce infinities and NaNs rather than failures), and
// string operators clamp or return sentinels. The only partiality in the
// system lives at the I/O seam, behind the interpreter.
//
// Construction _is_ simplification: the only way to build an operator node
// is through a smart constructor, and every smart constructor folds when
// its operands are literal. A tree that reaches the interpreter or the wire
// is therefore already in constant-folding normal form.

mod expr;
mod literal;

#[cfg(test)]
mod test;

pub use expr::{
    add, apply, both, branch, cons, contains, cos, div, either, equal, floor, index_of, length,
    less, load, log, matches, modulo, mul, negate, pow, prefetch, read, repeat, rollback, sin,
    slice, store, sub, write, Expr, Op, Txn,
};
pub use literal::Literal;
