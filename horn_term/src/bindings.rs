use crate::term::{Compound, Term, Var};

use ::{
    failure::Fail,
    im::{HashMap as ImHashMap, OrdMap, Vector},
    std::fmt,
};

/// Engine errors raised by binding operations. Logical failure is *not* an
/// error; see [`CantUnify`].
#[derive(Debug, Fail)]
pub enum BindError {
    #[fail(display = "variable {} is already bound", _0)]
    AlreadyBound(Var),

    #[fail(display = "variable {} is not bound", _0)]
    Unbound(Var),

    #[fail(display = "no query variable named `{}`", _0)]
    UnknownName(String),
}

/// The failure signal of unification. Recovered locally by backtracking,
/// never propagated as an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Fail)]
#[fail(display = "terms cannot be unified")]
pub struct CantUnify;

/// A persistent substitution from variable ids to terms.
///
/// Every operation returns a new `Bindings`; the receiver is never changed.
/// Clones share structure, so threading bindings through unification is
/// cheap.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    env: ImHashMap<u64, Term>,
    names: OrdMap<String, Var>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `var` to `term`. Binding an already-bound variable is an engine
    /// error; the engine only binds through [`unify`](Bindings::unify),
    /// which resolves first.
    pub fn bind(&self, var: &Var, term: Term) -> Result<Bindings, BindError> {
        if self.env.contains_key(&var.id()) {
            return Err(BindError::AlreadyBound(*var));
        }

        Ok(Bindings {
            env: self.env.update(var.id(), term),
            names: self.names.clone(),
        })
    }

    /// Walk the substitution chain from `var` until an unbound variable or
    /// a non-variable term. Errs if `var` itself is unbound.
    pub fn resolve(&self, var: &Var) -> Result<Term, BindError> {
        match self.env.get(&var.id()) {
            None => Err(BindError::Unbound(*var)),
            Some(term) => Ok(self.walk(term)),
        }
    }

    /// Chase top-level variable links without descending into compound
    /// arguments. Terminates because unification only ever binds unbound
    /// ends of chains.
    pub fn walk(&self, term: &Term) -> Term {
        let mut cursor = term.clone();
        while let Term::Var(v) = cursor {
            match self.env.get(&v.id()) {
                Some(next) => cursor = next.clone(),
                None => return Term::Var(v),
            }
        }
        cursor
    }

    /// Substitute recursively, producing a term with every bound variable
    /// replaced by its value. Unifying a variable with a term containing
    /// that same variable makes this loop; the engine omits the occurs
    /// check, so such inputs are outside the supported space.
    pub fn resolve_rec(&self, term: &Term) -> Term {
        match self.walk(term) {
            Term::Compound(c) => {
                let args = c
                    .args()
                    .iter()
                    .map(|arg| self.resolve_rec(arg))
                    .collect::<Vector<Term>>();
                Term::app(c.functor(), args)
            }
            other => other,
        }
    }

    /// Unify two terms under this substitution. Success yields the extended
    /// substitution; the receiver is unchanged either way.
    pub fn unify(&self, a: &Term, b: &Term) -> Result<Bindings, CantUnify> {
        let a = self.walk(a);
        let b = self.walk(b);

        match (&a, &b) {
            (Term::Var(x), Term::Var(y)) => {
                if x == y {
                    Ok(self.clone())
                } else if x.id() > y.id() {
                    // deterministic direction: the younger variable points
                    // at the older one
                    Ok(self.insert(x, b.clone()))
                } else {
                    Ok(self.insert(y, a.clone()))
                }
            }
            (Term::Var(x), _) => Ok(self.insert(x, b.clone())),
            (_, Term::Var(y)) => Ok(self.insert(y, a.clone())),
            (Term::Atom(p), Term::Atom(q)) => {
                if p == q {
                    Ok(self.clone())
                } else {
                    Err(CantUnify)
                }
            }
            (Term::Int(m), Term::Int(n)) => {
                if m == n {
                    Ok(self.clone())
                } else {
                    Err(CantUnify)
                }
            }
            (Term::Compound(f), Term::Compound(g)) => self.unify_compounds(f, g),
            _ => Err(CantUnify),
        }
    }

    fn unify_compounds(&self, f: &Compound, g: &Compound) -> Result<Bindings, CantUnify> {
        if f.functor() != g.functor() || f.arity() != g.arity() {
            return Err(CantUnify);
        }

        let mut env = self.clone();
        for (x, y) in f.args().iter().zip(g.args().iter()) {
            env = env.unify(x, y)?;
        }
        Ok(env)
    }

    // `walk` guarantees the variable is unbound here.
    fn insert(&self, var: &Var, term: Term) -> Bindings {
        Bindings {
            env: self.env.update(var.id(), term),
            names: self.names.clone(),
        }
    }

    /// Associate the submitted source-level variable names with their ids,
    /// so answers read back by the names the query used. The first variable
    /// wins when a name repeats.
    pub fn with_names(&self, vars: &[Var]) -> Bindings {
        let mut names = self.names.clone();
        for var in vars {
            let name = var.hint().name().to_string();
            if name != "_" && !names.contains_key(&name) {
                names.insert(name, *var);
            }
        }

        Bindings {
            env: self.env.clone(),
            names,
        }
    }

    /// Look up an answer by the variable name used in the query, fully
    /// substituted.
    pub fn by_name(&self, name: &str) -> Result<Term, BindError> {
        match self.names.get(name) {
            Some(var) => Ok(self.resolve_rec(&Term::Var(*var))),
            None => Err(BindError::UnknownName(name.to_string())),
        }
    }

    /// Like [`by_name`](Bindings::by_name), but panics on error.
    pub fn by_name_(&self, name: &str) -> Term {
        match self.by_name(name) {
            Ok(term) => term,
            Err(err) => panic!("{}", err),
        }
    }

    /// The names installed by [`with_names`](Bindings::with_names), in
    /// sorted order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.names.keys()
    }

    pub fn len(&self) -> usize {
        self.env.len()
    }

    pub fn is_empty(&self) -> bool {
        self.env.is_empty()
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (name, var) in &self.names {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{} = {}", name, self.resolve_rec(&Term::Var(*var)))?;
        }
        Ok(())
    }
}
