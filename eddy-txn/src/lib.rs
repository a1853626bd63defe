// The transaction system is plain optimistic concurrency over versioned
// keys. There is no locking, no coordinator and no consensus; the one
// atomic primitive is the store's conditional multi-put.
//
// The general sequence looks like this:
//
//  1. A fresh context interprets the transaction. Every fetch-frontier
//     flush snapshots (version, value) pairs into the read set; every
//     write records its pending literal in the write set, and the
//     interpreter guarantees each written key was read first.
//
//  2. The write set is installed with one conditional put (cput) that
//     succeeds only if every key in the read set is still at the version
//     observed. The cput is the linearization point; a commit is fully
//     visible or not at all.
//
//  3. On conflict the context is discarded and the whole transaction is
//     re-interpreted from a fresh snapshot. Conflicts are expected
//     traffic, not errors, and retry until the transaction commits.
//
// Backend failures are a different axis: a transient failure (network,
// timeout) feeds the caller's backoff schedule, a fatal one surfaces
// immediately. Delayed retries share one process-wide timer thread.

use std::sync::Arc;
use std::time::Duration;

use eddy_base::Result;
use eddy_eval::{Context, Fetch};
use eddy_lang::{Literal, Txn};
use tracing::debug;

mod cache;
mod store;
mod timer;

#[cfg(test)]
mod test;

pub use cache::{Cache, Cached, MemCache};
pub use eddy_eval::Revision;
pub use store::{Commit, MemStore, Store};

pub struct Database<S: Store> {
    store: S,
}

// Adapter giving the evaluator its batched-read seam over the store.
struct Snapshot<'a, S: Store>(&'a S);

impl<S: Store> Fetch for Snapshot<'_, S> {
    fn fetch(
        &mut self,
        keys: &std::collections::BTreeSet<String>,
    ) -> Result<std::collections::BTreeMap<String, Revision>> {
        self.0.get(keys)
    }
}

impl<S: Store> Database<S> {
    pub fn new(store: S) -> Self {
        Database { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // The top-level loop: snapshot, execute, conditionally commit, retry
    // on conflict. Retries are unbounded; bounding wall-clock time is the
    // backoff wrapper's job, and conflicts do not consume its schedule.
    pub fn execute(&self, txn: &Txn) -> Result<Arc<Literal>> {
        let mut attempt = 0_u64;
        loop {
            attempt += 1;
            let mut ctx = Context::new();
            let mut snap = Snapshot(&self.store);
            let value = ctx.run(txn, &mut snap)?;
            match self.store.cput(&ctx.depends(), &ctx.writes)? {
                Commit::Committed => {
                    debug!(target: "eddy", "committed after {} attempt(s)", attempt);
                    return Ok(value);
                }
                Commit::Conflict(key) => {
                    debug!(target: "eddy", "conflict on {:?} at attempt {}, retrying", key, attempt);
                }
            }
        }
    }

    // Execute with scheduled retries after transient backend failures.
    // The schedule is finite; exhausting it surfaces the last error,
    // re-tagged so callers can tell a dead backend from a slow one.
    pub fn execute_with_backoff(&self, txn: &Txn, backoffs: &[Duration]) -> Result<Arc<Literal>> {
        let mut delays = backoffs.iter();
        loop {
            match self.execute(txn) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() => match delays.next() {
                    Some(d) => {
                        debug!(target: "eddy", "transient failure, retrying in {:?}", d);
                        timer::sleep(*d);
                    }
                    None => return Err(e.with_kind(eddy_base::ErrorKind::Exhausted)),
                },
                Err(e) => return Err(e),
            }
        }
    }

    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}
