use crate::machine::MachineError;

use ::{
    horn_term::{Indicator, Term},
    im::{HashMap as ImHashMap, Vector},
    std::fmt,
};

/// The clause store: a persistent map from predicate indicator to the
/// clauses asserted for it, in insertion order. No first-argument
/// indexing; `candidates` returns every clause for the goal's indicator.
#[derive(Debug, Clone, Default)]
pub struct Database {
    clauses: ImHashMap<Indicator, Vector<Term>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause at the end of its indicator's list. The indicator
    /// comes from the clause head, so `p(1)` and `p(X) :- q(X)` both file
    /// under `p/1`. Errs when the head isn't callable.
    pub fn assertz(&self, clause: Term) -> Result<Database, MachineError> {
        let (head, _body) = clause.clause_parts();
        let indicator = head
            .indicator()
            .ok_or_else(|| MachineError::NotCallable(head.clone()))?;

        let mut for_indicator = self
            .clauses
            .get(&indicator)
            .cloned()
            .unwrap_or_default();
        for_indicator.push_back(clause);

        Ok(Database {
            clauses: self.clauses.update(indicator, for_indicator),
        })
    }

    /// Every clause that could match `goal`, in the order asserted. An
    /// unknown indicator simply has no candidates.
    pub fn candidates(&self, goal: &Term) -> Vector<Term> {
        match goal.indicator() {
            Some(indicator) => self.clauses.get(&indicator).cloned().unwrap_or_default(),
            None => Vector::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.clauses.values().map(Vector::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for clauses in self.clauses.values() {
            for clause in clauses {
                writeln!(f, "{}.", clause)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_preserve_assertion_order() {
        let db = Database::new()
            .assertz(Term::app("p", vec![Term::int(1)]))
            .unwrap()
            .assertz(Term::app("p", vec![Term::int(2)]))
            .unwrap()
            .assertz(Term::app("p", vec![Term::int(3)]))
            .unwrap();

        let goal = Term::app("p", vec![Term::int(9)]);
        let found = db.candidates(&goal);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], Term::app("p", vec![Term::int(1)]));
        assert_eq!(found[2], Term::app("p", vec![Term::int(3)]));
    }

    #[test]
    fn rules_file_under_their_head_indicator() {
        let clause = horn_term::read::term("parent(X) :- father(X).").unwrap();
        let db = Database::new().assertz(clause).unwrap();

        let goal = horn_term::read::term("parent(anyone)").unwrap();
        assert_eq!(db.candidates(&goal).len(), 1);
        assert!(db.candidates(&Term::atom("father")).is_empty());
    }

    #[test]
    fn assertz_is_persistent() {
        let before = Database::new();
        let after = before.assertz(Term::atom("sunny")).unwrap();

        assert!(before.is_empty());
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn non_callable_heads_are_rejected() {
        assert!(Database::new().assertz(Term::int(3)).is_err());
    }
}
