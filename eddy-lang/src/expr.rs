use std::sync::Arc;

use memchr::memmem;
use regex::Regex;

use crate::literal::Literal;

// The closed operator set. Effectful operators (I/O, locals, sequencing,
// control) are interpreted; pure operators evaluate by `apply` both here at
// construction time and again in the interpreter.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Op {
    // I/O and locals
    Read,
    Write,
    Load,
    Store,
    Prefetch,
    Rollback,
    // Control
    Cons,
    Branch,
    Repeat,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Log,
    Sin,
    Cos,
    Floor,
    // Strings
    Length,
    Slice,
    Matches,
    Contains,
    IndexOf,
    // Logic
    Both,
    Either,
    Negate,
    Equal,
    Less,
}

// An operator node: an opcode plus 1-3 operands.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Expr {
    pub op: Op,
    pub args: Vec<Txn>,
}

// A Transaction is an immutable tree: a literal leaf or a shared operator
// node. Clones are cheap and equality is structural.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Txn {
    Lit(Arc<Literal>),
    Exp(Arc<Expr>),
}

impl Txn {
    pub fn none() -> Txn {
        Txn::Lit(Literal::none())
    }

    pub fn flag(b: bool) -> Txn {
        Txn::Lit(Literal::flag(b))
    }

    pub fn real(x: f64) -> Txn {
        Txn::Lit(Literal::real(x))
    }

    pub fn text(s: impl Into<String>) -> Txn {
        Txn::Lit(Literal::text(s))
    }

    pub fn is_lit(&self) -> bool {
        matches!(self, Txn::Lit(_))
    }

    pub fn as_lit(&self) -> Option<&Arc<Literal>> {
        match self {
            Txn::Lit(l) => Some(l),
            Txn::Exp(_) => None,
        }
    }
}

fn node(op: Op, args: Vec<Txn>) -> Txn {
    Txn::Exp(Arc::new(Expr { op, args }))
}

// The simplifier for pure operators: all-literal operands fold to the
// evaluated (interned) literal, anything else stays a node.
fn fold(op: Op, args: Vec<Txn>) -> Txn {
    if args.iter().all(Txn::is_lit) {
        let lits: Vec<Arc<Literal>> = args.iter().filter_map(|a| a.as_lit().cloned()).collect();
        Txn::Lit(apply(op, &lits))
    } else {
        node(op, args)
    }
}

// Effectful constructors. These never fold: a read of a literal key is
// still a read.

pub fn read(key: Txn) -> Txn {
    node(Op::Read, vec![key])
}

pub fn write(key: Txn, val: Txn) -> Txn {
    node(Op::Write, vec![key, val])
}

pub fn load(name: Txn) -> Txn {
    node(Op::Load, vec![name])
}

pub fn store(name: Txn, val: Txn) -> Txn {
    node(Op::Store, vec![name, val])
}

pub fn prefetch(keys: Txn) -> Txn {
    node(Op::Prefetch, vec![keys])
}

pub fn rollback(val: Txn) -> Txn {
    node(Op::Rollback, vec![val])
}

// Control constructors, with their folding rules. Side effects are never
// reordered: a sequence head is dropped only when it is a pure literal, a
// short-circuited operand is dropped only where the semantics say its
// value cannot matter.

pub fn cons(a: Txn, b: Txn) -> Txn {
    if a.is_lit() {
        b
    } else {
        node(Op::Cons, vec![a, b])
    }
}

pub fn branch(c: Txn, t: Txn, f: Txn) -> Txn {
    match c.as_lit() {
        Some(l) => {
            if l.as_flag() {
                t
            } else {
                f
            }
        }
        None => node(Op::Branch, vec![c, t, f]),
    }
}

pub fn repeat(c: Txn, body: Txn) -> Txn {
    match c.as_lit() {
        // A literal-false guard never runs the body.
        Some(l) if !l.as_flag() => Txn::none(),
        // A literal-true guard diverges; keep the node, never unroll.
        _ => node(Op::Repeat, vec![c, body]),
    }
}

pub fn both(a: Txn, b: Txn) -> Txn {
    if let Some(l) = a.as_lit() {
        if !l.as_flag() {
            return Txn::flag(false);
        }
        if let Some(m) = b.as_lit() {
            return Txn::flag(m.as_flag());
        }
    }
    node(Op::Both, vec![a, b])
}

pub fn either(a: Txn, b: Txn) -> Txn {
    if let Some(l) = a.as_lit() {
        if l.as_flag() {
            return Txn::flag(true);
        }
        if let Some(m) = b.as_lit() {
            return Txn::flag(m.as_flag());
        }
    }
    node(Op::Either, vec![a, b])
}

// Pure constructors.

pub fn add(a: Txn, b: Txn) -> Txn {
    fold(Op::Add, vec![a, b])
}

pub fn sub(a: Txn, b: Txn) -> Txn {
    fold(Op::Sub, vec![a, b])
}

pub fn mul(a: Txn, b: Txn) -> Txn {
    fold(Op::Mul, vec![a, b])
}

pub fn div(a: Txn, b: Txn) -> Txn {
    fold(Op::Div, vec![a, b])
}

pub fn modulo(a: Txn, b: Txn) -> Txn {
    fold(Op::Mod, vec![a, b])
}

pub fn pow(a: Txn, b: Txn) -> Txn {
    fold(Op::Pow, vec![a, b])
}

pub fn log(a: Txn) -> Txn {
    fold(Op::Log, vec![a])
}

pub fn sin(a: Txn) -> Txn {
    fold(Op::Sin, vec![a])
}

pub fn cos(a: Txn) -> Txn {
    fold(Op::Cos, vec![a])
}

pub fn floor(a: Txn) -> Txn {
    fold(Op::Floor, vec![a])
}

pub fn length(s: Txn) -> Txn {
    fold(Op::Length, vec![s])
}

pub fn slice(s: Txn, lo: Txn, hi: Txn) -> Txn {
    fold(Op::Slice, vec![s, lo, hi])
}

pub fn matches(s: Txn, pattern: Txn) -> Txn {
    fold(Op::Matches, vec![s, pattern])
}

pub fn contains(s: Txn, sub: Txn) -> Txn {
    fold(Op::Contains, vec![s, sub])
}

pub fn index_of(s: Txn, sub: Txn) -> Txn {
    fold(Op::IndexOf, vec![s, sub])
}

pub fn negate(a: Txn) -> Txn {
    fold(Op::Negate, vec![a])
}

pub fn equal(a: Txn, b: Txn) -> Txn {
    fold(Op::Equal, vec![a, b])
}

pub fn less(a: Txn, b: Txn) -> Txn {
    fold(Op::Less, vec![a, b])
}

// Pure operator semantics, shared between the fold above and the
// interpreter. Total: domain errors surface as IEEE values or sentinels,
// never as failures.
pub fn apply(op: Op, args: &[Arc<Literal>]) -> Arc<Literal> {
    match op {
        Op::Add => {
            let (a, b) = (&args[0], &args[1]);
            if matches!(a.as_ref(), Literal::Text(_)) || matches!(b.as_ref(), Literal::Text(_)) {
                Literal::text(format!("{}{}", a.as_text(), b.as_text()))
            } else {
                Literal::real(a.as_real() + b.as_real())
            }
        }
        Op::Sub => Literal::real(args[0].as_real() - args[1].as_real()),
        Op::Mul => Literal::real(args[0].as_real() * args[1].as_real()),
        Op::Div => Literal::real(args[0].as_real() / args[1].as_real()),
        Op::Mod => Literal::real(args[0].as_real() % args[1].as_real()),
        Op::Pow => Literal::real(args[0].as_real().powf(args[1].as_real())),
        Op::Log => Literal::real(args[0].as_real().ln()),
        Op::Sin => Literal::real(args[0].as_real().sin()),
        Op::Cos => Literal::real(args[0].as_real().cos()),
        Op::Floor => Literal::real(args[0].as_real().floor()),

        Op::Length => Literal::real(args[0].as_text().chars().count() as f64),
        Op::Slice => {
            let s = args[0].as_text();
            let chars: Vec<char> = s.chars().collect();
            let lo = clamp_index(args[1].as_real(), chars.len());
            let hi = clamp_index(args[2].as_real(), chars.len());
            if lo >= hi {
                Literal::text("")
            } else {
                Literal::text(chars[lo..hi].iter().collect::<String>())
            }
        }
        Op::Matches => {
            // Whole-string match; an unparseable pattern matches nothing.
            let s = args[0].as_text();
            let pat = format!("^(?:{})$", args[1].as_text());
            let hit = Regex::new(&pat).map(|re| re.is_match(&s)).unwrap_or(false);
            Literal::flag(hit)
        }
        Op::Contains => {
            let s = args[0].as_text();
            let sub = args[1].as_text();
            Literal::flag(memmem::find(s.as_bytes(), sub.as_bytes()).is_some())
        }
        Op::IndexOf => {
            let s = args[0].as_text();
            let sub = args[1].as_text();
            match memmem::find(s.as_bytes(), sub.as_bytes()) {
                // memmem works in bytes; the language speaks chars.
                Some(pos) => Literal::real(s[..pos].chars().count() as f64),
                None => Literal::real(-1.0),
            }
        }

        Op::Both => Literal::flag(args[0].as_flag() && args[1].as_flag()),
        Op::Either => Literal::flag(args[0].as_flag() || args[1].as_flag()),
        Op::Negate => Literal::flag(!args[0].as_flag()),
        Op::Equal => Literal::flag(args[0].equals(&args[1])),
        Op::Less => Literal::flag(args[0].precedes(&args[1])),

        // Effectful operators are routed to the interpreter by every
        // caller; none of them has a pure application.
        Op::Read
        | Op::Write
        | Op::Load
        | Op::Store
        | Op::Prefetch
        | Op::Rollback
        | Op::Cons
        | Op::Branch
        | Op::Repeat => unreachable!("effectful operator {:?} applied as pure", op),
    }
}

// f64-to-char-index with saturation: NaN goes to 0, everything clamps into
// the string.
fn clamp_index(x: f64, len: usize) -> usize {
    (x as i64).clamp(0, len as i64) as usize
}
