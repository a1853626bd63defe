use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eddy_base::{err, ErrorKind, Result};
use eddy_eval::Revision;
use eddy_lang::{add, read, write, Literal, Txn};
use test_log::test;

use crate::{Cached, Commit, Database, MemCache, MemStore, Store};

fn keyset(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn incr(key: &str) -> Txn {
    write(
        Txn::text(key),
        add(read(Txn::text(key)), Txn::real(1.0)),
    )
}

#[test]
fn test_memstore_missing_keys() -> Result<()> {
    let store = MemStore::new();
    let got = store.get(&keyset(&["ghost"]))?;
    assert_eq!(got.get("ghost"), Some(&Revision::absent()));
    Ok(())
}

#[test]
fn test_memstore_versions_advance() -> Result<()> {
    let store = MemStore::new();
    let mut changes = BTreeMap::new();
    changes.insert("k".to_string(), Literal::real(1.0));
    let mut depends = BTreeMap::new();
    depends.insert("k".to_string(), 0);

    assert_eq!(store.cput(&depends, &changes)?, Commit::Committed);
    let rev = store.revision("k")?;
    assert_eq!(rev.version, 1);
    assert_eq!(rev.value, Literal::real(1.0));
    Ok(())
}

#[test]
fn test_optimistic_isolation() -> Result<()> {
    // Two transactions snapshot k at the same version; exactly one
    // commits, the other conflicts and succeeds after re-reading.
    let store = MemStore::new();
    let keys = keyset(&["k"]);

    let snap1 = store.get(&keys)?;
    let snap2 = store.get(&keys)?;
    assert_eq!(snap1, snap2);

    let dep = |v: u64| {
        let mut m = BTreeMap::new();
        m.insert("k".to_string(), v);
        m
    };
    let chg = |x: f64| {
        let mut m = BTreeMap::new();
        m.insert("k".to_string(), Literal::real(x));
        m
    };

    assert_eq!(store.cput(&dep(0), &chg(1.0))?, Commit::Committed);
    assert_eq!(
        store.cput(&dep(0), &chg(1.0))?,
        Commit::Conflict(Some("k".to_string()))
    );

    // The retry sees the committed value and lands at version 2.
    let snap3 = store.get(&keys)?;
    let seen = &snap3["k"];
    assert_eq!(seen.version, 1);
    assert_eq!(seen.value, Literal::real(1.0));
    assert_eq!(store.cput(&dep(1), &chg(2.0))?, Commit::Committed);

    let rev = store.revision("k")?;
    assert_eq!(rev.version, 2);
    assert_eq!(rev.value, Literal::real(2.0));
    Ok(())
}

#[test]
fn test_execute_sequential_counter() -> Result<()> {
    let db = Database::new(MemStore::new());
    let txn = incr("x");
    for _ in 0..100 {
        db.execute(&txn)?;
    }
    let rev = db.store().revision("x")?;
    assert_eq!(rev.value, Literal::real(100.0));
    assert_eq!(rev.version, 100);
    Ok(())
}

#[test]
fn test_execute_concurrent_counter() {
    // Four racing incrementers; conflicts retry until every increment
    // lands exactly once.
    let db = Database::new(MemStore::new());
    let txn = incr("x");
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..25 {
                    db.execute(&txn).unwrap();
                }
            });
        }
    });
    let rev = db.store().revision("x").unwrap();
    assert_eq!(rev.value, Literal::real(100.0));
    assert_eq!(rev.version, 100);
}

#[test]
fn test_execute_result_value() -> Result<()> {
    let db = Database::new(MemStore::new());
    // The transaction result is the value of its tail expression.
    let out = db.execute(&incr("x"))?;
    assert_eq!(out, Literal::real(1.0));
    Ok(())
}

// A store wrapper counting backend reads, for cache assertions.
struct Counting {
    inner: MemStore,
    gets: Arc<AtomicUsize>,
}

impl Store for Counting {
    fn get(&self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(keys)
    }
    fn cput(
        &self,
        depends: &BTreeMap<String, u64>,
        changes: &BTreeMap<String, Arc<Literal>>,
    ) -> Result<Commit> {
        self.inner.cput(depends, changes)
    }
    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

#[test]
fn test_cached_store() -> Result<()> {
    let gets = Arc::new(AtomicUsize::new(0));
    let cached = Cached::new(
        Counting {
            inner: MemStore::new(),
            gets: gets.clone(),
        },
        MemCache::new(),
    );
    let keys = keyset(&["a"]);

    // First read fills the cache; the second is served from it.
    cached.get(&keys)?;
    cached.get(&keys)?;
    assert_eq!(gets.load(Ordering::SeqCst), 1);

    // A committed cput writes through: the cache answers with the new
    // revision without touching the store.
    let mut depends = BTreeMap::new();
    depends.insert("a".to_string(), 0);
    let mut changes = BTreeMap::new();
    changes.insert("a".to_string(), Literal::text("v"));
    assert_eq!(cached.cput(&depends, &changes)?, Commit::Committed);
    let got = cached.get(&keys)?;
    assert_eq!(gets.load(Ordering::SeqCst), 1);
    assert_eq!(got["a"].version, 1);
    assert_eq!(got["a"].value, Literal::text("v"));

    // A conflicted cput invalidates, so the next read goes to the store.
    assert!(matches!(
        cached.cput(&depends, &changes)?,
        Commit::Conflict(_)
    ));
    cached.get(&keys)?;
    assert_eq!(gets.load(Ordering::SeqCst), 2);
    Ok(())
}

// A store that fails transiently a fixed number of times before behaving.
struct Flaky {
    inner: MemStore,
    failures: AtomicUsize,
}

impl Store for Flaky {
    fn get(&self, keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(err(ErrorKind::Transient, "backend unavailable"));
        }
        self.inner.get(keys)
    }
    fn cput(
        &self,
        depends: &BTreeMap<String, u64>,
        changes: &BTreeMap<String, Arc<Literal>>,
    ) -> Result<Commit> {
        self.inner.cput(depends, changes)
    }
    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

#[test]
fn test_backoff_recovers() -> Result<()> {
    let db = Database::new(Flaky {
        inner: MemStore::new(),
        failures: AtomicUsize::new(2),
    });
    let backoffs = [Duration::from_millis(1); 3];
    let out = db.execute_with_backoff(&incr("x"), &backoffs)?;
    assert_eq!(out, Literal::real(1.0));
    Ok(())
}

#[test]
fn test_backoff_exhausts() {
    let db = Database::new(Flaky {
        inner: MemStore::new(),
        failures: AtomicUsize::new(5),
    });
    let backoffs = [Duration::from_millis(1)];
    let e = db
        .execute_with_backoff(&incr("x"), &backoffs)
        .expect_err("schedule should run out");
    assert_eq!(e.kind(), ErrorKind::Exhausted);
}

#[test]
fn test_fatal_skips_backoff() {
    struct Dead;
    impl Store for Dead {
        fn get(&self, _keys: &BTreeSet<String>) -> Result<BTreeMap<String, Revision>> {
            Err(err(ErrorKind::Fatal, "no such table"))
        }
        fn cput(
            &self,
            _depends: &BTreeMap<String, u64>,
            _changes: &BTreeMap<String, Arc<Literal>>,
        ) -> Result<Commit> {
            Err(err(ErrorKind::Fatal, "no such table"))
        }
        fn close(&self) -> Result<()> {
            Ok(())
        }
    }
    let db = Database::new(Dead);
    let backoffs = [Duration::from_millis(1); 3];
    let e = db
        .execute_with_backoff(&incr("x"), &backoffs)
        .expect_err("fatal should surface");
    assert_eq!(e.kind(), ErrorKind::Fatal);
}
