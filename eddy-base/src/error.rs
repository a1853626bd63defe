// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A machine-readable kind on every error, since the commit and backoff
//    loops dispatch on it (transient retries, fatal surfaces immediately)
// 3. A way to centralize setting a breakpoint to trap any error in the
//    system fairly soon after it's created (or at least when it's
//    propagated from a library we use back to us)
// 4. Same but for logging / emitting error messages into the tracing system
//
// Note that a commit conflict is _not_ an error anywhere in the system;
// conflicts are ordinary values on the store contract.

use backtrace_error::DynBacktraceError;
use std::borrow::Cow;
use tracing::error;

#[cfg(test)]
use test_log::test;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ErrorKind {
    // Malformed wire form
    Parse,
    // Impossible coercion
    Type,
    // Structural rule broken at build time, eg. a reserved key character
    Invariant,
    // Retryable backend failure
    Transient,
    // Non-retryable backend failure
    Fatal,
    // Backoff schedule ran out
    Exhausted,
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct Error {
    kind: ErrorKind,
    inner: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(ErrorKind::Fatal, err)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, err: E) -> Error {
        error!(target: "eddy", "{:?}: {:?}", kind, err);
        let dbe = DynBacktraceError::from(err);
        Error { kind, inner: dbe }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Error {
        self.kind = kind;
        self
    }
}

pub fn err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    let err = SimpleErr(msg.into());
    Error::new(kind, err)
}

#[test]
fn test_error() {
    let e = err(ErrorKind::Transient, "test error");
    assert!(e.is_transient());
    assert_eq!(e.with_kind(ErrorKind::Exhausted).kind(), ErrorKind::Exhausted);
}
