// Facade over the subsystem crates: one flat namespace with everything a
// client needs to build, ship and run transactions.

pub use eddy_base::{err, Error, ErrorKind, Result};
pub use eddy_dsl::{Builder, Index, Object, Schema};
pub use eddy_eval::{Context, Fetch, Revision};
pub use eddy_lang::{
    add, both, branch, cons, contains, cos, div, either, equal, floor, index_of, length, less,
    load, log, matches, modulo, mul, negate, pow, prefetch, read, repeat, rollback, sin, slice,
    store, sub, write, Expr, Literal, Op, Txn,
};
pub use eddy_txn::{Cache, Cached, Commit, Database, MemCache, MemStore, Store};
pub use eddy_wire::{decode, encode, Node};
