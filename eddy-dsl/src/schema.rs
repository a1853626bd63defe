use std::sync::Arc;
use std::time::Duration;

use eddy_base::Result;
use eddy_lang::Literal;
use eddy_txn::{Database, Store};

use crate::builder::Builder;

// The user entry point: a backoff schedule that turns a builder block
// into a committed result. The block runs once, on the host, to build
// the tree; the database then interprets and commits it, retrying
// conflicts internally and transient backend failures on the schedule.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    backoffs: Vec<Duration>,
}

impl Schema {
    pub fn new(backoffs: Vec<Duration>) -> Self {
        Schema { backoffs }
    }

    pub fn execute<S: Store>(
        &self,
        db: &Database<S>,
        build: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<Arc<Literal>> {
        let mut b = Builder::new();
        build(&mut b)?;
        let txn = b.finish();
        db.execute_with_backoff(&txn, &self.backoffs)
    }
}
