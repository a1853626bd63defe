use eddy_base::{err, ErrorKind, Result};
use eddy_lang::{add, branch, contains, length, less, load, prefetch, read, store, write, Txn};

use crate::builder::Builder;

// Reserved characters in the key alphabet: '/' derives field and index
// keys, ',' joins catalog lists. User keys and names containing either
// are rejected when the program is built.
pub const FIELD_SEP: char = '/';
pub const LIST_SEP: char = ',';

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(err(ErrorKind::Invariant, "empty key or name"));
    }
    if name.contains(FIELD_SEP) || name.contains(LIST_SEP) {
        return Err(err(
            ErrorKind::Invariant,
            format!("reserved character in {:?}", name),
        ));
    }
    Ok(())
}

// Derive a sub-key: base + "/" + name. For literal operands this folds to
// a literal key at build time.
pub(crate) fn join(base: Txn, name: Txn) -> Txn {
    add(add(base, Txn::text("/")), name)
}

// Membership test on a comma-joined list, as an expression. The list is
// wrapped in separators so item text cannot match across boundaries.
pub(crate) fn list_has(list: Txn, item: Txn) -> Txn {
    contains(
        add(add(Txn::text(","), list), Txn::text(",")),
        add(add(Txn::text(","), item), Txn::text(",")),
    )
}

// Append to a comma-joined list, as an expression; an empty list takes
// the item bare. The emptiness test goes through length so a catalog
// that has never been written (none) counts as empty too.
pub(crate) fn list_push(list: Txn, item: Txn) -> Txn {
    branch(
        less(length(list.clone()), Txn::real(1.0)),
        item.clone(),
        add(add(list, Txn::text(",")), item),
    )
}

// Register a name in a catalog key unless it is already present.
fn catalog(list_key: Txn, name: Txn) -> Txn {
    branch(
        list_has(read(list_key.clone()), name.clone()),
        Txn::none(),
        write(list_key.clone(), list_push(read(list_key), name)),
    )
}

// A handle on one object in the store. The key may be a literal (checked
// against the reserved alphabet) or a computed expression.
#[derive(Clone, Debug)]
pub struct Object {
    key: Txn,
}

impl Object {
    pub fn key(&self) -> Txn {
        self.key.clone()
    }

    fn sub(&self, name: &str) -> Txn {
        join(self.key(), Txn::text(name))
    }

    pub(crate) fn fields_key(&self) -> Txn {
        self.sub("$fields")
    }

    pub(crate) fn indices_key(&self) -> Txn {
        self.sub("$indices")
    }

    // Truthy iff the object has been created and not deleted.
    pub fn exists(&self) -> Txn {
        read(self.key())
    }

    pub fn get(&self, field: &str) -> Result<Txn> {
        check_name(field)?;
        Ok(read(self.sub(field)))
    }

    // Write a field: mark the object live, catalog the field name, land
    // the value.
    pub fn set(&self, b: &mut Builder, field: &str, value: Txn) -> Result<()> {
        check_name(field)?;
        b.push(write(self.key(), Txn::flag(true)));
        b.push(catalog(self.fields_key(), Txn::text(field)));
        b.push(write(self.sub(field), value));
        Ok(())
    }

    pub fn index(&self, name: &str) -> Result<Index> {
        check_name(name)?;
        Ok(Index {
            obj_key: self.key(),
            name: name.to_string(),
        })
    }
}

// A handle on one named index of an object: a catalog of addresses plus
// one value per address.
#[derive(Clone, Debug)]
pub struct Index {
    obj_key: Txn,
    name: String,
}

impl Index {
    fn base(&self) -> Txn {
        join(self.obj_key.clone(), Txn::text(self.name.clone()))
    }

    pub(crate) fn addresses_key(&self) -> Txn {
        join(self.base(), Txn::text("$addresses"))
    }

    // The comma-joined address catalog, as a read expression.
    pub fn addresses(&self) -> Txn {
        read(self.addresses_key())
    }

    pub(crate) fn entry_key(&self, addr: Txn) -> Txn {
        join(self.base(), addr)
    }

    pub fn get(&self, addr: Txn) -> Txn {
        read(self.entry_key(addr))
    }

    pub fn append(&self, b: &mut Builder, addr: &str, value: Txn) -> Result<()> {
        check_name(addr)?;
        b.push(write(self.obj_key.clone(), Txn::flag(true)));
        b.push(catalog(
            join(self.obj_key.clone(), Txn::text("$indices")),
            Txn::text(self.name.clone()),
        ));
        b.push(catalog(self.addresses_key(), Txn::text(addr)));
        b.push(write(self.entry_key(Txn::text(addr)), value));
        Ok(())
    }
}

impl Builder {
    pub fn select(&self, key: &str) -> Result<Object> {
        check_name(key)?;
        Ok(Object {
            key: Txn::text(key),
        })
    }

    // A handle bound to a computed key, eg. a loop variable. No reserved
    // alphabet check is possible at build time.
    pub fn select_at(&self, key: Txn) -> Object {
        Object { key }
    }

    // Iterate an index: one pass over the address catalog assembles the
    // entry keys, a prefetch batches all of their values, then a second
    // pass runs the block per address.
    pub fn foreach(
        &mut self,
        idx: &Index,
        body: impl FnOnce(&mut Self, Txn) -> Result<()>,
    ) -> Result<()> {
        let keys = self.fresh_local("a");
        self.push(store(keys.clone(), Txn::text("")));
        let idx2 = idx.clone();
        let keys2 = keys.clone();
        self.foreach_item(idx.addresses(), move |b, addr| {
            b.push(store(
                keys2.clone(),
                list_push(load(keys2.clone()), idx2.entry_key(addr)),
            ));
            Ok(())
        })?;
        self.push(prefetch(load(keys)));
        self.foreach_item(idx.addresses(), body)
    }

    // Erase an object: blank every field and every index entry, then the
    // catalogs, then the existence marker.
    pub fn delete(&mut self, obj: &Object) -> Result<()> {
        let okey = obj.key();
        let fields = obj.fields_key();
        let indices = obj.indices_key();

        let fkey = okey.clone();
        self.foreach_item(read(fields.clone()), move |b, field| {
            b.push(write(join(fkey, field), Txn::none()));
            Ok(())
        })?;

        let ikey = okey.clone();
        self.foreach_item(read(indices.clone()), move |b, idx| {
            let base = join(ikey, idx);
            let addrs_key = join(base.clone(), Txn::text("$addresses"));
            let ebase = base.clone();
            b.foreach_item(read(addrs_key.clone()), move |b2, addr| {
                b2.push(write(join(ebase, addr), Txn::none()));
                Ok(())
            })?;
            b.push(write(addrs_key, Txn::none()));
            Ok(())
        })?;

        self.push(write(fields, Txn::none()));
        self.push(write(indices, Txn::none()));
        self.push(write(okey, Txn::none()));
        Ok(())
    }

    // Render an object as a JSON string expression: fields as string
    // members, indices as arrays of their values in address order. The
    // string is assembled inside the transaction; nothing is read on the
    // host.
    pub fn stitch(&mut self, obj: &Object) -> Result<Txn> {
        let json = self.fresh_local("json");
        let okey = obj.key();
        self.push(store(
            json.clone(),
            add(add(Txn::text("{\"key\":\""), okey.clone()), Txn::text("\"")),
        ));

        let fkey = okey.clone();
        let fjson = json.clone();
        self.foreach_item(read(obj.fields_key()), move |b, field| {
            let member = add(
                add(
                    add(add(Txn::text(",\""), field.clone()), Txn::text("\":\"")),
                    read(join(fkey, field)),
                ),
                Txn::text("\""),
            );
            b.push(store(fjson.clone(), add(load(fjson), member)));
            Ok(())
        })?;

        let ijson = json.clone();
        self.foreach_item(read(obj.indices_key()), move |b, idx| {
            let base = join(okey, idx.clone());
            let elems = b.fresh_local("e");
            b.push(store(elems.clone(), Txn::text("")));
            let ebase = base.clone();
            let eelems = elems.clone();
            b.foreach_item(
                read(join(base, Txn::text("$addresses"))),
                move |b2, addr| {
                    let quoted = add(
                        add(Txn::text("\""), read(join(ebase, addr))),
                        Txn::text("\""),
                    );
                    b2.push(store(eelems.clone(), list_push(load(eelems), quoted)));
                    Ok(())
                },
            )?;
            let member = add(
                add(
                    add(add(Txn::text(",\""), idx), Txn::text("\":[")),
                    load(elems),
                ),
                Txn::text("]"),
            );
            b.push(store(ijson.clone(), add(load(ijson), member)));
            Ok(())
        })?;

        self.push(store(json.clone(), add(load(json.clone()), Txn::text("}"))));
        Ok(load(json))
    }
}
