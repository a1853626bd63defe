use eddy_base::Result;
use eddy_lang::{
    add, branch, cons, either, equal, index_of, length, less, load, repeat, rollback, slice,
    store, Txn,
};

// Builds one transaction. The tail is the whole program so far; push
// sequences onto it, so the last pushed expression is the program's
// value.
pub struct Builder {
    tail: Txn,
    fresh: u64,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            tail: Txn::none(),
            fresh: 0,
        }
    }

    pub fn push(&mut self, t: Txn) {
        let head = std::mem::replace(&mut self.tail, Txn::none());
        self.tail = cons(head, t);
    }

    pub fn finish(self) -> Txn {
        self.tail
    }

    // Run a block against an empty tail and hand back the sub-tree it
    // built, restoring the surrounding program. This is the one
    // mechanism behind every structured combinator.
    pub fn capture(&mut self, block: impl FnOnce(&mut Self) -> Result<()>) -> Result<Txn> {
        let saved = std::mem::replace(&mut self.tail, Txn::none());
        let out = block(self);
        let body = std::mem::replace(&mut self.tail, saved);
        out?;
        Ok(body)
    }

    // Internal locals get one flat namespace with a $-prefix users are
    // told not to touch; the counter keeps nested combinators disjoint.
    pub(crate) fn fresh_local(&mut self, stem: &str) -> Txn {
        let n = self.fresh;
        self.fresh += 1;
        Txn::text(format!("${}{}", stem, n))
    }

    pub fn cond(&mut self, c: Txn, pass: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let p = self.capture(pass)?;
        self.push(branch(c, p, Txn::none()));
        Ok(())
    }

    pub fn cond_else(
        &mut self,
        c: Txn,
        pass: impl FnOnce(&mut Self) -> Result<()>,
        fail: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let p = self.capture(pass)?;
        let f = self.capture(fail)?;
        self.push(branch(c, p, f));
        Ok(())
    }

    pub fn while_(
        &mut self,
        c: Txn,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let b = self.capture(body)?;
        self.push(repeat(c, b));
        Ok(())
    }

    // A counted loop from lo while the counter stays below hi (at or
    // below for the inclusive form). The block receives the counter as a
    // load expression.
    pub fn for_(
        &mut self,
        lo: Txn,
        hi: Txn,
        inclusive: bool,
        body: impl FnOnce(&mut Self, Txn) -> Result<()>,
    ) -> Result<()> {
        let var = self.fresh_local("i");
        self.push(store(var.clone(), lo));
        let c = if inclusive {
            either(
                less(load(var.clone()), hi.clone()),
                equal(load(var.clone()), hi),
            )
        } else {
            less(load(var.clone()), hi)
        };
        let b = self.capture(|bld| {
            body(bld, load(var.clone()))?;
            bld.push(store(
                var.clone(),
                add(load(var.clone()), Txn::real(1.0)),
            ));
            Ok(())
        })?;
        self.push(repeat(c, b));
        Ok(())
    }

    // A loop over the items of a comma-joined list. The list value is
    // captured into a scratch local and consumed front to back with
    // indexOf/slice; the block receives each item as a load expression.
    pub fn foreach_item(
        &mut self,
        list: Txn,
        body: impl FnOnce(&mut Self, Txn) -> Result<()>,
    ) -> Result<()> {
        let rest = self.fresh_local("l");
        let item = self.fresh_local("j");
        self.push(store(rest.clone(), list));
        let c = less(Txn::real(0.0), length(load(rest.clone())));
        let b = self.capture(|bld| {
            let cut = bld.fresh_local("k");
            bld.push(store(
                cut.clone(),
                index_of(load(rest.clone()), Txn::text(",")),
            ));
            // No separator left: the whole remainder is the last item.
            let last = cons(
                store(item.clone(), load(rest.clone())),
                store(rest.clone(), Txn::text("")),
            );
            let split = cons(
                store(
                    item.clone(),
                    slice(load(rest.clone()), Txn::real(0.0), load(cut.clone())),
                ),
                store(
                    rest.clone(),
                    slice(
                        load(rest.clone()),
                        add(load(cut.clone()), Txn::real(1.0)),
                        length(load(rest.clone())),
                    ),
                ),
            );
            bld.push(branch(less(load(cut), Txn::real(0.0)), last, split));
            body(bld, load(item.clone()))
        })?;
        self.push(repeat(c, b));
        Ok(())
    }

    // Set the transaction's result. A single value becomes the tail as
    // is; several concatenate into a JSON array.
    pub fn ret(&mut self, mut vals: Vec<Txn>) {
        let t = match vals.len() {
            0 => Txn::none(),
            1 => vals.remove(0),
            _ => {
                let mut s = Txn::text("[");
                for (i, v) in vals.into_iter().enumerate() {
                    if i > 0 {
                        s = add(s, Txn::text(","));
                    }
                    s = add(s, v);
                }
                add(s, Txn::text("]"))
            }
        };
        self.push(t);
    }

    // Abort: discard every pending write and yield the given value.
    pub fn rollback(&mut self, val: Txn) {
        self.push(rollback(val));
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
