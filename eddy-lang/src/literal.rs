use std::sync::{Arc, LazyLock};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

// A Literal is a total runtime value: the absent value, a boolean flag, an
// IEEE-754 double, or a Unicode string. Reals are OrderedFloat so literals
// are Eq/Ord/Hash like every other value type in the system.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Literal {
    None,
    Flag(bool),
    Real(OrderedFloat<f64>),
    Text(String),
}

// The canonical literals. The constructors below hand out clones of these
// cells, so equal canonical tokens share identity (Arc::ptr_eq), and any
// fold that lands on a canonical value re-converges on the shared cell.
static NONE: LazyLock<Arc<Literal>> = LazyLock::new(|| Arc::new(Literal::None));
static TRUE: LazyLock<Arc<Literal>> = LazyLock::new(|| Arc::new(Literal::Flag(true)));
static FALSE: LazyLock<Arc<Literal>> = LazyLock::new(|| Arc::new(Literal::Flag(false)));
static ZERO: LazyLock<Arc<Literal>> = LazyLock::new(|| Arc::new(Literal::Real(OrderedFloat(0.0))));
static ONE: LazyLock<Arc<Literal>> = LazyLock::new(|| Arc::new(Literal::Real(OrderedFloat(1.0))));
static EMPTY: LazyLock<Arc<Literal>> = LazyLock::new(|| Arc::new(Literal::Text(String::new())));

impl Literal {
    pub fn none() -> Arc<Literal> {
        NONE.clone()
    }

    pub fn flag(b: bool) -> Arc<Literal> {
        if b {
            TRUE.clone()
        } else {
            FALSE.clone()
        }
    }

    pub fn real(x: f64) -> Arc<Literal> {
        if x == 0.0 {
            ZERO.clone()
        } else if x == 1.0 {
            ONE.clone()
        } else {
            Arc::new(Literal::Real(OrderedFloat(x)))
        }
    }

    pub fn text(s: impl Into<String>) -> Arc<Literal> {
        let s = s.into();
        if s.is_empty() {
            EMPTY.clone()
        } else {
            Arc::new(Literal::Text(s))
        }
    }

    // Coercions. All three are total; operators that need a specific
    // primitive apply them unconditionally.

    pub fn as_flag(&self) -> bool {
        match self {
            Literal::None => false,
            Literal::Flag(b) => *b,
            Literal::Real(x) => x.0 != 0.0,
            Literal::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_real(&self) -> f64 {
        match self {
            Literal::None => 0.0,
            Literal::Flag(true) => 1.0,
            Literal::Flag(false) => 0.0,
            Literal::Real(x) => x.0,
            Literal::Text(s) => s.parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Literal::None => String::new(),
            Literal::Flag(b) => b.to_string(),
            Literal::Real(x) => render_real(x.0),
            Literal::Text(s) => s.clone(),
        }
    }

    // Equality is strongly typed: none equals only none, same-kind values
    // compare by value, and mixed non-none kinds are never equal.
    pub fn equals(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::None, Literal::None) => true,
            (Literal::Flag(a), Literal::Flag(b)) => a == b,
            (Literal::Real(a), Literal::Real(b)) => a == b,
            (Literal::Text(a), Literal::Text(b)) => a == b,
            _ => false,
        }
    }

    // The language ordering: reals numerically, text lexicographically,
    // flags false < true. none sorts before everything else, and mixed
    // non-none kinds compare by rendering, keeping the operator total.
    pub fn precedes(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::None, Literal::None) => false,
            (Literal::None, _) => true,
            (_, Literal::None) => false,
            (Literal::Flag(a), Literal::Flag(b)) => !*a && *b,
            (Literal::Real(a), Literal::Real(b)) => a < b,
            (Literal::Text(a), Literal::Text(b)) => a < b,
            _ => self.as_text() < other.as_text(),
        }
    }
}

// Integer-valued doubles render with one decimal point ("0.0", "1.0") so
// numeric text is distinguishable from the integer-looking strings users
// store; everything else renders in the shortest round-trip form.
fn render_real(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}
