// The host-side surface: imperative-looking program construction that
// desugars to pure expression trees.
//
// A Builder carries the transaction built so far and appends to it by
// sequencing. Control-flow combinators capture their block's sub-tree by
// swapping the builder's tail out, running the block, and swapping it
// back, so a block is ordinary host code that happens to append into a
// scratch buffer. The builder is an explicit value, not an ambient
// thread-local; everything that writes into a program takes one.
//
// Objects give the flat key namespace structure: an object at key K keeps
// an existence marker at K, its field catalog at K/$fields, its index
// catalog at K/$indices, field values at K/<field>, per-index address
// catalogs at K/<index>/$addresses and indexed values at
// K/<index>/<address>. Catalogs are comma-joined text, iterated at
// expression level, so programs that walk them run entirely inside the
// transaction.

mod builder;
mod object;
mod schema;


pub use builder::Builder;
pub use object::{Index, Object, FIELD_SEP, LIST_SEP};
pub use schema::Schema;
