use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use eddy_base::{err, ErrorKind, Result};
use eddy_eval::Revision;
use eddy_lang::Literal;

use crate::store::{Commit, Store};

// An optional cache layered in front of a store. fetch may return any
// subset of the requested keys; update installs revisions; invalidate
// evicts. A cache never answers with a version the store has not
// committed, so serving from it preserves snapshot reads.
pub trait Cache: Send + Sync {
    fn fetch(&self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>>;
    fn update(&self, entries: &BTreeMap<String, Revision>) -> Result<()>;
    fn invalidate(&self, keys: &BTreeSet<String>) -> Result<()>;
}

// Reference cache: an unbounded map behind a mutex.
#[derive(Debug, Default)]
pub struct MemCache {
    map: Mutex<BTreeMap<String, Revision>>,
}

impl MemCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| err(ErrorKind::Fatal, "cache mutex poisoned"))
}

impl Cache for MemCache {
    fn fetch(&self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>> {
        let map = lock(&self.map)?;
        Ok(keys
            .iter()
            .filter_map(|k| map.get(k).map(|r| (k.clone(), r.clone())))
            .collect())
    }

    fn update(&self, entries: &BTreeMap<String, Revision>) -> Result<()> {
        let mut map = lock(&self.map)?;
        for (k, r) in entries {
            map.insert(k.clone(), r.clone());
        }
        Ok(())
    }

    fn invalidate(&self, keys: &BTreeSet<String>) -> Result<()> {
        let mut map = lock(&self.map)?;
        for k in keys {
            map.remove(k);
        }
        Ok(())
    }
}

// A store with a cache in front of it. get consults the cache first and
// fills it from the store; a committed cput writes through (the new
// version of each changed key is its observed version plus one, since the
// commit proved the observed version current); a conflicted cput
// invalidates every key the attempt touched.
pub struct Cached<S: Store, C: Cache> {
    store: S,
    cache: C,
}

impl<S: Store, C: Cache> Cached<S, C> {
    pub fn new(store: S, cache: C) -> Self {
        Cached { store, cache }
    }
}

impl<S: Store, C: Cache> Store for Cached<S, C> {
    fn get(&self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>> {
        let mut found = self.cache.fetch(keys)?;
        let missing: BTreeSet<String> = keys
            .iter()
            .filter(|k| !found.contains_key(*k))
            .cloned()
            .collect();
        if !missing.is_empty() {
            let fetched = self.store.get(&missing)?;
            self.cache.update(&fetched)?;
            found.extend(fetched);
        }
        Ok(found)
    }

    fn cput(
        &self,
        depends: &BTreeMap<String, u64>,
        changes: &BTreeMap<String, Arc<Literal>>,
    ) -> Result<Commit> {
        let outcome = self.store.cput(depends, changes)?;
        match &outcome {
            Commit::Committed => {
                let mut fresh = BTreeMap::new();
                let mut unknown = BTreeSet::new();
                for (k, val) in changes {
                    match depends.get(k) {
                        Some(v) => {
                            fresh.insert(
                                k.clone(),
                                Revision {
                                    version: v + 1,
                                    value: val.clone(),
                                },
                            );
                        }
                        None => {
                            unknown.insert(k.clone());
                        }
                    }
                }
                self.cache.update(&fresh)?;
                if !unknown.is_empty() {
                    self.cache.invalidate(&unknown)?;
                }
            }
            Commit::Conflict(_) => {
                let touched: BTreeSet<String> =
                    depends.keys().chain(changes.keys()).cloned().collect();
                self.cache.invalidate(&touched)?;
            }
        }
        Ok(outcome)
    }

    fn close(&self) -> Result<()> {
        self.store.close()
    }
}
