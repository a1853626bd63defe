// The interpreter runs one transaction against a snapshot buffer.
//
// Evaluation is a post-order walk of the tree with two lazily-evaluated
// forms: branch picks one arm after evaluating its guard, and repeat
// re-evaluates its guard before every pass over its body. Everything else
// evaluates operands left to right, then applies the operator.
//
// One transaction is strictly single-threaded, and the only I/O points are
// the fetch-frontier flushes. The frontier collects keys named by read and
// prefetch that the snapshot has not yet observed; a flush turns the whole
// set into one batched backend call. This batching is the principal
// performance lever: a prefetch ahead of a loop pays for one round trip
// where naive per-key reads would pay one per iteration.
//
// The context is the whole story of a run: locals, the read set (with the
// versions the commit will depend on), the write set, and the frontier.
// A conflict retry discards the context and nothing else.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use eddy_base::Result;
use eddy_lang::{apply, Expr, Literal, Op, Txn};
use tracing::trace;


// A Revision pairs a key's monotonically increasing version with its last
// committed value. Versions are the unit of optimistic concurrency
// control; version 0 is the never-written state.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Revision {
    pub version: u64,
    pub value: Arc<Literal>,
}

impl Revision {
    pub fn absent() -> Self {
        Revision {
            version: 0,
            value: Literal::none(),
        }
    }
}

// The evaluator's only I/O seam: a batched versioned read. The database
// implements this over its store (optionally through a cache).
pub trait Fetch {
    fn fetch(&mut self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>>;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Context {
    pub locals: BTreeMap<String, Arc<Literal>>,
    pub reads: BTreeMap<String, Revision>,
    pub writes: BTreeMap<String, Arc<Literal>>,
    frontier: BTreeSet<String>,
    readonly: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    // The version map the commit depends on: every key observed, at the
    // version observed. Writes are a subset of this by construction.
    pub fn depends(&self) -> BTreeMap<String, u64> {
        self.reads
            .iter()
            .map(|(k, r)| (k.clone(), r.version))
            .collect()
    }

    pub fn run<F: Fetch>(&mut self, txn: &Txn, src: &mut F) -> Result<Arc<Literal>> {
        self.eval(txn, src)
    }

    fn eval<F: Fetch>(&mut self, t: &Txn, src: &mut F) -> Result<Arc<Literal>> {
        match t {
            Txn::Lit(l) => Ok(l.clone()),
            Txn::Exp(e) => self.eval_expr(e, src),
        }
    }

    fn eval_expr<F: Fetch>(&mut self, e: &Expr, src: &mut F) -> Result<Arc<Literal>> {
        match e.op {
            Op::Cons => {
                self.eval(&e.args[0], src)?;
                self.eval(&e.args[1], src)
            }
            Op::Branch => {
                let c = self.eval(&e.args[0], src)?;
                if c.as_flag() {
                    self.eval(&e.args[1], src)
                } else {
                    self.eval(&e.args[2], src)
                }
            }
            Op::Repeat => {
                loop {
                    let c = self.eval(&e.args[0], src)?;
                    if !c.as_flag() {
                        break;
                    }
                    // Batch anything prefetched ahead of this iteration.
                    self.flush(src)?;
                    self.eval(&e.args[1], src)?;
                }
                Ok(Literal::none())
            }

            Op::Read => {
                let key = self.eval(&e.args[0], src)?.as_text();
                if let Some(v) = self.writes.get(&key) {
                    return Ok(v.clone());
                }
                if let Some(r) = self.reads.get(&key) {
                    return Ok(r.value.clone());
                }
                self.frontier.insert(key.clone());
                self.flush(src)?;
                Ok(self
                    .reads
                    .get(&key)
                    .map(|r| r.value.clone())
                    .unwrap_or_else(Literal::none))
            }
            Op::Write => {
                let key = self.eval(&e.args[0], src)?.as_text();
                let val = self.eval(&e.args[1], src)?;
                if self.readonly {
                    // A rolled-back transaction drops writes silently.
                    return Ok(val);
                }
                // The commit must depend on every written key, so an
                // unobserved key is read before it is overwritten.
                if !self.reads.contains_key(&key) {
                    self.frontier.insert(key.clone());
                    self.flush(src)?;
                }
                self.writes.insert(key, val.clone());
                Ok(val)
            }
            Op::Prefetch => {
                let list = self.eval(&e.args[0], src)?.as_text();
                for key in list.split(',') {
                    if !key.is_empty() && !self.reads.contains_key(key) {
                        self.frontier.insert(key.to_string());
                    }
                }
                self.flush(src)?;
                Ok(Literal::none())
            }

            Op::Load => {
                let name = self.eval(&e.args[0], src)?.as_text();
                Ok(self
                    .locals
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(Literal::none))
            }
            Op::Store => {
                let name = self.eval(&e.args[0], src)?.as_text();
                let val = self.eval(&e.args[1], src)?;
                self.locals.insert(name, val.clone());
                Ok(val)
            }

            Op::Rollback => {
                let val = self.eval(&e.args[0], src)?;
                self.writes.clear();
                self.readonly = true;
                Ok(val)
            }

            op => {
                let mut vals = Vec::with_capacity(e.args.len());
                for a in &e.args {
                    vals.push(self.eval(a, src)?);
                }
                Ok(apply(op, &vals))
            }
        }
    }

    // Turn the accumulated frontier into one batched backend call. Every
    // frontier key lands in the read set afterwards, absent keys at
    // version 0, so the commit depends on their nonexistence too.
    fn flush<F: Fetch>(&mut self, src: &mut F) -> Result<()> {
        if self.frontier.is_empty() {
            return Ok(());
        }
        let keys = std::mem::take(&mut self.frontier);
        trace!(target: "eddy", "flushing fetch frontier of {} keys", keys.len());
        let got = src.fetch(&keys)?;
        for (k, r) in got {
            self.reads.entry(k).or_insert(r);
        }
        for k in keys {
            self.reads.entry(k).or_insert_with(Revision::absent);
        }
        Ok(())
    }
}
