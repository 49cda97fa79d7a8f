use ::{
    lazy_static::lazy_static,
    parking_lot::RwLock,
    std::{collections::HashMap, fmt, sync::Arc},
};

/// Atoms which the engine itself dispatches on. It's very important these
/// stay in order because the order defines their indices in every table.
const RESERVED: &[&str] = &[
    "[]", ".", ",", ";", "->", ":-", "?-", "true", "fail", "!", "$cut_to", "=", "call",
];

/// An interned symbol. Two atoms are equal iff they intern the same name,
/// which makes atom comparison an integer compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom(usize);

impl Atom {
    pub const NIL: Atom = Atom(0);
    pub const DOT: Atom = Atom(1);
    pub const COMMA: Atom = Atom(2);
    pub const SEMICOLON: Atom = Atom(3);
    pub const ARROW: Atom = Atom(4);
    pub const CLAUSE: Atom = Atom(5);
    pub const QUERY: Atom = Atom(6);
    pub const TRUE: Atom = Atom(7);
    pub const FAIL: Atom = Atom(8);
    pub const CUT: Atom = Atom(9);
    pub const CUT_TO: Atom = Atom(10);
    pub const UNIFY: Atom = Atom(11);
    pub const CALL: Atom = Atom(12);

    /// Intern `name` in the process-wide atom table.
    pub fn new(name: &str) -> Atom {
        ATOMS.intern(name)
    }

    /// The text this atom interns. The returned handle shares storage with
    /// the table entry.
    pub fn name(&self) -> Arc<str> {
        ATOMS.name(*self)
    }
}

impl<'a> From<&'a str> for Atom {
    fn from(name: &'a str) -> Atom {
        Atom::new(name)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.name().fmt(f)
    }
}

lazy_static! {
    static ref ATOMS: AtomTable = AtomTable::new();
}

/// The atom table maps names to [`Atom`] indices and back. It is shared
/// behind an `Arc<RwLock<_>>` handle so that any number of threads can
/// intern concurrently; interning takes the write lock only for names not
/// seen before.
#[derive(Debug, Clone)]
pub struct AtomTable {
    inner: Arc<RwLock<AtomTableInner>>,
}

#[derive(Debug)]
struct AtomTableInner {
    to_atom: HashMap<Arc<str>, Atom>,
    to_name: Vec<Arc<str>>,
}

impl AtomTable {
    pub fn new() -> Self {
        let mut inner = AtomTableInner {
            to_atom: HashMap::new(),
            to_name: Vec::new(),
        };

        for &name in RESERVED {
            let name = Arc::<str>::from(name);
            let atom = Atom(inner.to_name.len());
            inner.to_name.push(name.clone());
            inner.to_atom.insert(name, atom);
        }

        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub fn intern(&self, name: &str) -> Atom {
        if let Some(&atom) = self.inner.read().to_atom.get(name) {
            return atom;
        }

        let mut inner = self.inner.write();
        // a racing writer may have interned it between the locks
        if let Some(&atom) = inner.to_atom.get(name) {
            return atom;
        }

        let name = Arc::<str>::from(name);
        let atom = Atom(inner.to_name.len());
        inner.to_name.push(name.clone());
        inner.to_atom.insert(name, atom);
        atom
    }

    pub fn name(&self, atom: Atom) -> Arc<str> {
        self.inner.read().to_name[atom.0].clone()
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}
