use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use eddy_base::{err, ErrorKind, Result};
use eddy_eval::Revision;
use eddy_lang::Literal;

// Outcome of a conditional put. A conflict optionally names one offending
// key; it carries no error semantics.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Commit {
    Committed,
    Conflict(Option<String>),
}

// The only contract the runtime requires of a backend:
//
//  - get is a bulk snapshot read; missing keys map to (0, none).
//  - cput is atomic: it succeeds only if every depends[k] matches the
//    current version of k, then installs each changes[k] at an
//    incremented version. Concurrent cputs linearize in some order.
//  - close releases backend resources; in-flight calls complete first.
//
// Adapters may be backed by anything (SQL, a remote cache, a map); the
// runtime never assumes more than the above.
pub trait Store: Send + Sync {
    fn get(&self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>>;

    fn cput(
        &self,
        depends: &BTreeMap<String, u64>,
        changes: &BTreeMap<String, Arc<Literal>>,
    ) -> Result<Commit>;

    fn close(&self) -> Result<()>;
}

// Reference backend: a versioned map behind a mutex. The mutex scope of
// cput is the linearization point.
#[derive(Debug, Default)]
pub struct MemStore {
    map: Mutex<BTreeMap<String, Revision>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Test and diagnostic peek at a single key's current revision.
    pub fn revision(&self, key: &str) -> Result<Revision> {
        let map = lock(&self.map)?;
        Ok(map.get(key).cloned().unwrap_or_else(Revision::absent))
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| err(ErrorKind::Fatal, "store mutex poisoned"))
}

impl Store for MemStore {
    fn get(&self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>> {
        let map = lock(&self.map)?;
        Ok(keys
            .iter()
            .map(|k| {
                let rev = map.get(k).cloned().unwrap_or_else(Revision::absent);
                (k.clone(), rev)
            })
            .collect())
    }

    fn cput(
        &self,
        depends: &BTreeMap<String, u64>,
        changes: &BTreeMap<String, Arc<Literal>>,
    ) -> Result<Commit> {
        let mut map = lock(&self.map)?;
        for (k, v) in depends {
            let current = map.get(k).map(|r| r.version).unwrap_or(0);
            if current != *v {
                return Ok(Commit::Conflict(Some(k.clone())));
            }
        }
        for (k, val) in changes {
            let next = map.get(k).map(|r| r.version).unwrap_or(0) + 1;
            map.insert(
                k.clone(),
                Revision {
                    version: next,
                    value: val.clone(),
                },
            );
        }
        Ok(Commit::Committed)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
