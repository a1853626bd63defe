// The wire form of the expression tree: a discriminated union with one
// case per operator plus the four literal kinds, serialized as msgpack.
// This is the cross-language surface; any client that can emit these
// messages can submit transactions.
//
// Decoding is a total recursive descent that rebuilds the tree through
// the smart constructors, so a decoded tree is already constant-folded;
// unknown discriminants and malformed payloads fail with a parse error.
// Encoding a simplified tree and decoding it yields an equal tree.

use serde::{Deserialize, Serialize};

use eddy_base::{Error, ErrorKind, Result};
use eddy_lang::{
    add, both, branch, cons, contains, cos, div, either, equal, floor, index_of, length, less,
    load, log, matches, modulo, mul, negate, pow, prefetch, read, repeat, rollback, sin, slice,
    store, sub, write, Literal, Op, Txn,
};


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    // Literal kinds
    None,
    Flag(bool),
    Real(f64),
    Text(String),
    // I/O and locals
    Read(Box<Node>),
    Write(Box<Node>, Box<Node>),
    Load(Box<Node>),
    Store(Box<Node>, Box<Node>),
    Prefetch(Box<Node>),
    Rollback(Box<Node>),
    // Control
    Cons(Box<Node>, Box<Node>),
    Branch(Box<Node>, Box<Node>, Box<Node>),
    Repeat(Box<Node>, Box<Node>),
    // Arithmetic
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
    Mod(Box<Node>, Box<Node>),
    Pow(Box<Node>, Box<Node>),
    Log(Box<Node>),
    Sin(Box<Node>),
    Cos(Box<Node>),
    Floor(Box<Node>),
    // Strings
    Length(Box<Node>),
    Slice(Box<Node>, Box<Node>, Box<Node>),
    Matches(Box<Node>, Box<Node>),
    Contains(Box<Node>, Box<Node>),
    IndexOf(Box<Node>, Box<Node>),
    // Logic
    Both(Box<Node>, Box<Node>),
    Either(Box<Node>, Box<Node>),
    Negate(Box<Node>),
    Equal(Box<Node>, Box<Node>),
    Less(Box<Node>, Box<Node>),
}

pub fn encode(t: &Txn) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(&pack(t))?)
}

pub fn decode(buf: &[u8]) -> Result<Txn> {
    let node: Node =
        rmp_serde::from_slice(buf).map_err(|e| Error::new(ErrorKind::Parse, e))?;
    Ok(unpack(node))
}

fn pack(t: &Txn) -> Node {
    match t {
        Txn::Lit(l) => match l.as_ref() {
            Literal::None => Node::None,
            Literal::Flag(b) => Node::Flag(*b),
            Literal::Real(x) => Node::Real(x.0),
            Literal::Text(s) => Node::Text(s.clone()),
        },
        Txn::Exp(e) => {
            let a = |i: usize| Box::new(pack(&e.args[i]));
            match e.op {
                Op::Read => Node::Read(a(0)),
                Op::Write => Node::Write(a(0), a(1)),
                Op::Load => Node::Load(a(0)),
                Op::Store => Node::Store(a(0), a(1)),
                Op::Prefetch => Node::Prefetch(a(0)),
                Op::Rollback => Node::Rollback(a(0)),
                Op::Cons => Node::Cons(a(0), a(1)),
                Op::Branch => Node::Branch(a(0), a(1), a(2)),
                Op::Repeat => Node::Repeat(a(0), a(1)),
                Op::Add => Node::Add(a(0), a(1)),
                Op::Sub => Node::Sub(a(0), a(1)),
                Op::Mul => Node::Mul(a(0), a(1)),
                Op::Div => Node::Div(a(0), a(1)),
                Op::Mod => Node::Mod(a(0), a(1)),
                Op::Pow => Node::Pow(a(0), a(1)),
                Op::Log => Node::Log(a(0)),
                Op::Sin => Node::Sin(a(0)),
                Op::Cos => Node::Cos(a(0)),
                Op::Floor => Node::Floor(a(0)),
                Op::Length => Node::Length(a(0)),
                Op::Slice => Node::Slice(a(0), a(1), a(2)),
                Op::Matches => Node::Matches(a(0), a(1)),
                Op::Contains => Node::Contains(a(0), a(1)),
                Op::IndexOf => Node::IndexOf(a(0), a(1)),
                Op::Both => Node::Both(a(0), a(1)),
                Op::Either => Node::Either(a(0), a(1)),
                Op::Negate => Node::Negate(a(0)),
                Op::Equal => Node::Equal(a(0), a(1)),
                Op::Less => Node::Less(a(0), a(1)),
            }
        }
    }
}

fn unpack(n: Node) -> Txn {
    let u = |b: Box<Node>| unpack(*b);
    match n {
        Node::None => Txn::none(),
        Node::Flag(b) => Txn::flag(b),
        Node::Real(x) => Txn::real(x),
        Node::Text(s) => Txn::text(s),
        Node::Read(k) => read(u(k)),
        Node::Write(k, v) => write(u(k), u(v)),
        Node::Load(n) => load(u(n)),
        Node::Store(n, v) => store(u(n), u(v)),
        Node::Prefetch(ks) => prefetch(u(ks)),
        Node::Rollback(v) => rollback(u(v)),
        Node::Cons(a, b) => cons(u(a), u(b)),
        Node::Branch(c, t, f) => branch(u(c), u(t), u(f)),
        Node::Repeat(c, b) => repeat(u(c), u(b)),
        Node::Add(a, b) => add(u(a), u(b)),
        Node::Sub(a, b) => sub(u(a), u(b)),
        Node::Mul(a, b) => mul(u(a), u(b)),
        Node::Div(a, b) => div(u(a), u(b)),
        Node::Mod(a, b) => modulo(u(a), u(b)),
        Node::Pow(a, b) => pow(u(a), u(b)),
        Node::Log(a) => log(u(a)),
        Node::Sin(a) => sin(u(a)),
        Node::Cos(a) => cos(u(a)),
        Node::Floor(a) => floor(u(a)),
        Node::Length(s) => length(u(s)),
        Node::Slice(s, lo, hi) => slice(u(s), u(lo), u(hi)),
        Node::Matches(s, p) => matches(u(s), u(p)),
        Node::Contains(s, c) => contains(u(s), u(c)),
        Node::IndexOf(s, c) => index_of(u(s), u(c)),
        Node::Both(a, b) => both(u(a), u(b)),
        Node::Either(a, b) => either(u(a), u(b)),
        Node::Negate(a) => negate(u(a)),
        Node::Equal(a, b) => equal(u(a), u(b)),
        Node::Less(a, b) => less(u(a), u(b)),
    }
}
