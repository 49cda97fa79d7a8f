use crate::machine::Machine;

use ::{
    horn_term::Term,
    std::{fmt, sync::Arc},
};

/// A predicate implemented in Rust rather than by clauses. The function
/// receives the current machine and the goal's arguments, each resolved
/// one level against the bindings, and says what the engine should do
/// next via [`ForeignReturn`].
#[derive(Clone)]
pub struct ForeignPredicate {
    f: Arc<dyn Fn(&Machine, &[Term]) -> ForeignReturn + Send + Sync>,
}

impl ForeignPredicate {
    pub fn new(f: impl Fn(&Machine, &[Term]) -> ForeignReturn + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }

    pub fn call(&self, machine: &Machine, args: &[Term]) -> ForeignReturn {
        (self.f)(machine, args)
    }
}

impl fmt::Debug for ForeignPredicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ForeignPredicate").finish()
    }
}

/// Everything a foreign predicate is allowed to say. A closed sum: the
/// step loop interprets exactly these four outcomes.
#[derive(Debug, Clone)]
pub enum ForeignReturn {
    /// The goal succeeded without touching the bindings; continue with the
    /// next conjunction.
    True,

    /// The goal failed; backtrack.
    Fail,

    /// Continue on this machine instead. This is the low-level escape
    /// hatch: a foreign predicate may push conjunctions, cut, or rebind
    /// and hand back the result.
    Machine(Machine),

    /// Unify each pair left to right; failure of any pair backtracks,
    /// success continues under the extended bindings.
    Unify(Vec<(Term, Term)>),
}

impl ForeignReturn {
    /// Shorthand for the common single-pair unification result.
    pub fn unify(a: Term, b: Term) -> ForeignReturn {
        ForeignReturn::Unify(vec![(a, b)])
    }
}
