use crate::atom::Atom;

use ::{
    im::Vector,
    std::{
        cmp::Ordering,
        collections::HashMap,
        fmt,
        hash::{Hash, Hasher},
        sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
};

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

/// A logic variable. Identity is the process-unique `id`; the `hint` is the
/// name the variable had in source text and is kept only for display.
#[derive(Debug, Clone, Copy)]
pub struct Var {
    id: u64,
    hint: Atom,
}

impl Var {
    /// Allocate a fresh variable. Every call returns a distinct variable,
    /// even across threads.
    pub fn fresh(hint: impl Into<Atom>) -> Var {
        Var {
            id: NEXT_VAR_ID.fetch_add(1, AtomicOrdering::Relaxed),
            hint: hint.into(),
        }
    }

    pub fn anonymous() -> Var {
        Var::fresh("_")
    }

    /// A fresh variable sharing this one's display hint. Used when renaming
    /// clause variables apart.
    pub fn renamed(&self) -> Var {
        Var {
            id: NEXT_VAR_ID.fetch_add(1, AtomicOrdering::Relaxed),
            hint: self.hint,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn hint(&self) -> Atom {
        self.hint
    }
}

impl PartialEq for Var {
    fn eq(&self, rhs: &Var) -> bool {
        self.id == rhs.id
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let hint = self.hint.name();
        if &*hint == "_" {
            write!(f, "_G{}", self.id)
        } else {
            hint.fmt(f)
        }
    }
}

/// A functor applied to one or more arguments. The argument vector is
/// persistent, so clones share structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    functor: Atom,
    args: Vector<Term>,
}

impl Compound {
    pub fn functor(&self) -> Atom {
        self.functor
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn args(&self) -> &Vector<Term> {
        &self.args
    }
}

/// The `name/arity` key the engine dispatches predicates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Indicator {
    pub name: Atom,
    pub arity: usize,
}

impl Indicator {
    pub fn new(name: impl Into<Atom>, arity: usize) -> Indicator {
        Indicator {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A Prolog term: the universe of values the engine manipulates.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Atom(Atom),
    Int(i64),
    Compound(Compound),
    Var(Var),
}

impl Term {
    pub fn atom(name: impl Into<Atom>) -> Term {
        Term::Atom(name.into())
    }

    pub fn int(n: i64) -> Term {
        Term::Int(n)
    }

    pub fn var(v: Var) -> Term {
        Term::Var(v)
    }

    /// Build a compound term. An empty argument list yields the plain atom,
    /// since zero-arity compounds don't exist in the term algebra.
    pub fn app(functor: impl Into<Atom>, args: impl IntoIterator<Item = Term>) -> Term {
        let functor = functor.into();
        let args = args.into_iter().collect::<Vector<Term>>();
        if args.is_empty() {
            Term::Atom(functor)
        } else {
            Term::Compound(Compound { functor, args })
        }
    }

    /// Build a proper list term out of `'.'/2` cells ending in `'[]'`.
    pub fn list(elems: impl IntoIterator<Item = Term>) -> Term {
        Term::partial_list(elems, Term::Atom(Atom::NIL))
    }

    /// Build a list with an explicit tail.
    pub fn partial_list(elems: impl IntoIterator<Item = Term>, tail: Term) -> Term {
        let elems = elems.into_iter().collect::<Vec<Term>>();
        elems.into_iter().rev().fold(tail, |tail, head| {
            Term::app(Atom::DOT, vec![head, tail])
        })
    }

    /// Decompose a proper list into its elements. Returns `None` for
    /// anything that isn't a `'.'/2` chain ending in `'[]'`.
    pub fn as_list(&self) -> Option<Vec<Term>> {
        let mut elems = Vec::new();
        let mut cursor = self.clone();
        loop {
            match cursor {
                Term::Atom(Atom::NIL) => return Some(elems),
                Term::Compound(ref c) if c.functor == Atom::DOT && c.arity() == 2 => {
                    elems.push(c.args[0].clone());
                    let rest = c.args[1].clone();
                    cursor = rest;
                }
                _ => return None,
            }
        }
    }

    /// The dispatch key of a callable term. Integers and variables are not
    /// callable and have no indicator.
    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            Term::Atom(name) => Some(Indicator::new(*name, 0)),
            Term::Compound(c) => Some(Indicator::new(c.functor, c.arity())),
            Term::Int(_) | Term::Var(_) => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        self.indicator().is_some()
    }

    pub fn is_true(&self) -> bool {
        match self {
            Term::Atom(a) => *a == Atom::TRUE,
            _ => false,
        }
    }

    /// Directives are `:-/1` terms, as produced by `:- goal.` in source.
    pub fn is_directive(&self) -> bool {
        match self {
            Term::Compound(c) => c.functor == Atom::CLAUSE && c.arity() == 1,
            _ => false,
        }
    }

    /// Split a clause into head and body. Facts get the body `true`.
    pub fn clause_parts(&self) -> (Term, Term) {
        match self {
            Term::Compound(c) if c.functor == Atom::CLAUSE && c.arity() == 2 => {
                (c.args[0].clone(), c.args[1].clone())
            }
            _ => (self.clone(), Term::Atom(Atom::TRUE)),
        }
    }

    /// Copy this term with every variable replaced by a fresh one. Repeated
    /// occurrences of a variable share the same replacement; the original
    /// term is untouched.
    pub fn renamed(&self) -> Term {
        let mut renaming = HashMap::new();
        self.renamed_with(&mut renaming)
    }

    fn renamed_with(&self, renaming: &mut HashMap<u64, Var>) -> Term {
        match self {
            Term::Atom(_) | Term::Int(_) => self.clone(),
            Term::Var(v) => {
                let fresh = renaming.entry(v.id()).or_insert_with(|| v.renamed());
                Term::Var(*fresh)
            }
            Term::Compound(c) => {
                let args = c
                    .args
                    .iter()
                    .map(|arg| arg.renamed_with(renaming))
                    .collect::<Vector<Term>>();
                Term::Compound(Compound {
                    functor: c.functor,
                    args,
                })
            }
        }
    }

    /// All variables of this term, in first-occurrence order, deduplicated.
    pub fn variables(&self) -> Vec<Var> {
        let mut seen = Vec::new();
        self.collect_variables(&mut seen);
        seen
    }

    fn collect_variables(&self, seen: &mut Vec<Var>) {
        match self {
            Term::Atom(_) | Term::Int(_) => {}
            Term::Var(v) => {
                if !seen.contains(v) {
                    seen.push(*v);
                }
            }
            Term::Compound(c) => {
                for arg in &c.args {
                    arg.collect_variables(seen);
                }
            }
        }
    }

    /// The standard order of terms: `Var < Int < Atom < Compound`, with
    /// variables ordered by id, atoms by name, and compounds by arity, then
    /// functor, then arguments left to right.
    pub fn standard_order(&self, rhs: &Term) -> Ordering {
        fn rank(t: &Term) -> u8 {
            match t {
                Term::Var(_) => 0,
                Term::Int(_) => 1,
                Term::Atom(_) => 2,
                Term::Compound(_) => 3,
            }
        }

        match (self, rhs) {
            (Term::Var(a), Term::Var(b)) => a.id().cmp(&b.id()),
            (Term::Int(a), Term::Int(b)) => a.cmp(b),
            (Term::Atom(a), Term::Atom(b)) => a.name().cmp(&b.name()),
            (Term::Compound(a), Term::Compound(b)) => a
                .arity()
                .cmp(&b.arity())
                .then_with(|| a.functor.name().cmp(&b.functor.name()))
                .then_with(|| {
                    for (x, y) in a.args.iter().zip(b.args.iter()) {
                        match x.standard_order(y) {
                            Ordering::Equal => continue,
                            other => return other,
                        }
                    }
                    Ordering::Equal
                }),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl From<Atom> for Term {
    fn from(atom: Atom) -> Term {
        Term::Atom(atom)
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Term {
        Term::Int(n)
    }
}

impl From<Var> for Term {
    fn from(v: Var) -> Term {
        Term::Var(v)
    }
}

fn atom_needs_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return true,
    };

    if first.is_ascii_lowercase() {
        return !chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    }

    const SOLO: &[&str] = &["[]", "!", ";", ",", "{}"];
    if SOLO.contains(&name) {
        return false;
    }

    const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";
    !name.chars().all(|c| SYMBOL_CHARS.contains(c))
}

fn fmt_atom(atom: Atom, f: &mut fmt::Formatter) -> fmt::Result {
    let name = atom.name();
    if atom_needs_quotes(&name) {
        write!(f, "'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    } else {
        write!(f, "{}", name)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Atom(atom) => fmt_atom(*atom, f),
            Term::Int(n) => n.fmt(f),
            Term::Var(v) => v.fmt(f),
            Term::Compound(c) => {
                // list cells print with bracket sugar
                if c.functor == Atom::DOT && c.arity() == 2 {
                    return fmt_list(c, f);
                }

                const INFIX: &[Atom] = &[
                    Atom::CLAUSE,
                    Atom::SEMICOLON,
                    Atom::ARROW,
                    Atom::COMMA,
                    Atom::UNIFY,
                ];
                if c.arity() == 2 && INFIX.contains(&c.functor) {
                    return write!(f, "({} {} {})", c.args[0], c.functor.name(), c.args[1]);
                }

                fmt_atom(c.functor, f)?;
                write!(f, "(")?;
                for (i, arg) in c.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt(f)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn fmt_list(cell: &Compound, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "[{}", cell.args[0])?;
    let mut tail = cell.args[1].clone();
    loop {
        match tail {
            Term::Atom(Atom::NIL) => return write!(f, "]"),
            Term::Compound(ref c) if c.functor() == Atom::DOT && c.arity() == 2 => {
                write!(f, ", {}", c.args()[0])?;
                let rest = c.args()[1].clone();
                tail = rest;
            }
            other => return write!(f, " | {}]", other),
        }
    }
}
