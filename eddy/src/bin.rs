// Illustrative client: the create-or-increment counter run a hundred
// times against the in-memory reference store.

use eddy::{add, Database, MemStore, Result, Schema, Txn};

fn main() -> Result<()> {
    let db = Database::new(MemStore::new());
    let schema = Schema::default();

    for _ in 0..100 {
        schema.execute(&db, |b| {
            let x = b.select("x")?;
            let grow = x.clone();
            let init = x.clone();
            b.cond_else(
                x.exists(),
                move |b| {
                    let v = grow.get("value")?;
                    grow.set(b, "value", add(v, Txn::real(1.0)))
                },
                move |b| init.set(b, "value", Txn::real(1.0)),
            )
        })?;
    }

    let rev = db.store().revision("x/value")?;
    println!("x/value = {} (version {})", rev.value.as_text(), rev.version);
    db.close()
}
