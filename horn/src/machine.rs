use crate::{
    builtins,
    choice::ChoicePoint,
    database::Database,
    foreign::{ForeignPredicate, ForeignReturn},
    list::List,
};

use ::{
    failure::{Error, Fail},
    horn_term::{read, Atom, Bindings, Indicator, Term},
    im::HashMap as ImHashMap,
    log::{debug, trace},
    smallvec::SmallVec,
    std::fmt,
};

/// Engine errors. Logical failure (a goal that can't be proved) is not
/// represented here; it shows up as an empty answer list.
#[derive(Debug, Fail)]
pub enum MachineError {
    #[fail(display = "there are no cut barriers")]
    NoBarriers,

    #[fail(display = "machine can't step any further")]
    Done,

    #[fail(display = "disjunctions list is empty")]
    EmptyDisjunctions,

    #[fail(display = "conjunctions list is empty")]
    EmptyConjunctions,

    #[fail(display = "term `{}` is not callable", _0)]
    NotCallable(Term),
}

/// The result of one machine transition: the successor machine, plus the
/// answer substitution if this step completed a proof.
#[derive(Debug, Clone)]
pub struct Step {
    pub machine: Machine,
    pub answer: Option<Bindings>,
}

impl Step {
    fn advance(machine: Machine) -> Step {
        Step {
            machine,
            answer: None,
        }
    }
}

/// Goals are accepted as parsed terms or as source text.
pub trait ToGoal {
    fn to_goal(self) -> Result<Term, Error>;
}

impl ToGoal for Term {
    fn to_goal(self) -> Result<Term, Error> {
        Ok(self)
    }
}

impl<'a> ToGoal for &'a Term {
    fn to_goal(self) -> Result<Term, Error> {
        Ok(self.clone())
    }
}

impl<'a> ToGoal for &'a str {
    fn to_goal(self) -> Result<Term, Error> {
        Ok(read::term(self)?)
    }
}

impl ToGoal for String {
    fn to_goal(self) -> Result<Term, Error> {
        Ok(read::term(&self)?)
    }
}

/// An immutable snapshot of the interpreter: database, foreign registry,
/// bindings, and the disjunction and conjunction stacks.
///
/// Every operation returns a new machine and leaves the receiver intact,
/// so a machine can be captured in a choice point, duplicated, resumed
/// later, or run from several threads at once without locks. Proof search
/// is driven by calling [`step`](Machine::step) until it reports
/// [`MachineError::Done`].
#[derive(Debug, Clone)]
pub struct Machine {
    db: Database,
    foreign: ImHashMap<Indicator, ForeignPredicate>,
    env: Bindings,
    disjs: List<ChoicePoint>,
    conjs: List<Term>,
}

// The whole point of the persistent data model. If this stops compiling,
// something non-shareable crept into the machine.
#[allow(dead_code)]
fn assert_machine_send_and_sync() {
    fn is_send_and_sync<T: Send + Sync>() {}
    is_send_and_sync::<Machine>();
}

impl Machine {
    /// A machine with the control and library built-ins registered. This
    /// is the usual entry point.
    pub fn new() -> Machine {
        builtins::install(Machine::blank())
    }

    /// A machine with nothing registered at all, save the bottom cut
    /// barrier. Useful mostly for testing the step loop itself.
    pub fn blank() -> Machine {
        let m = Machine {
            db: Database::new(),
            foreign: ImHashMap::new(),
            env: Bindings::new(),
            disjs: List::new(),
            conjs: List::new(),
        };
        m.demand_cut_barrier()
    }

    /// Parse `source` and assert each clause, in order. Directives are
    /// ignored, for now.
    pub fn consult(&self, source: &str) -> Result<Machine, Error> {
        let terms = read::terms(source)?;

        let mut m = self.clone();
        for term in terms {
            if term.is_directive() {
                continue;
            }
            m.db = m.db.assertz(term)?;
        }
        Ok(m)
    }

    /// Like [`consult`](Machine::consult), but panics on error.
    pub fn consult_(&self, source: &str) -> Machine {
        match self.consult(source) {
            Ok(m) => m,
            Err(err) => panic!("{}", err),
        }
    }

    /// True iff at least one answer exists. Stops at the first one.
    pub fn can_prove<G: ToGoal>(&self, goal: G) -> Result<bool, Error> {
        let goal = goal.to_goal()?;
        let mut m = self.push_conj(goal);
        loop {
            match m.step() {
                Ok(step) => {
                    if step.answer.is_some() {
                        return Ok(true);
                    }
                    m = step.machine;
                }
                Err(MachineError::Done) => return Ok(false),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Like [`can_prove`](Machine::can_prove), but panics on error.
    pub fn can_prove_<G: ToGoal>(&self, goal: G) -> bool {
        match self.can_prove(goal) {
            Ok(answer) => answer,
            Err(err) => panic!("{}", err),
        }
    }

    /// Enumerate every answer substitution for `goal`, in standard SLD
    /// order: conjunctions left to right, clauses in assertion order.
    /// Answers are keyed by the variable names the submitted goal used.
    ///
    /// This runs the proof to exhaustion; bounding divergent queries is
    /// the caller's job, by driving [`step`](Machine::step) directly.
    pub fn prove_all<G: ToGoal>(&self, goal: G) -> Result<Vec<Bindings>, Error> {
        let goal = goal.to_goal()?;
        let vars = goal.variables();

        let mut m = self.push_conj(goal);
        let mut answers = Vec::new();
        loop {
            match m.step() {
                Ok(step) => {
                    if let Some(env) = step.answer {
                        answers.push(env.with_names(&vars));
                    }
                    m = step.machine;
                }
                Err(MachineError::Done) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(answers)
    }

    /// Like [`prove_all`](Machine::prove_all), but panics on error.
    pub fn prove_all_<G: ToGoal>(&self, goal: G) -> Vec<Bindings> {
        match self.prove_all(goal) {
            Ok(answers) => answers,
            Err(err) => panic!("{}", err),
        }
    }

    /// Register a Rust function as the implementation of `name/arity`.
    /// Registering an indicator again replaces the previous function.
    pub fn register_foreign<F>(&self, name: &str, arity: usize, f: F) -> Machine
    where
        F: Fn(&Machine, &[Term]) -> ForeignReturn + Send + Sync + 'static,
    {
        let mut m = self.clone();
        m.foreign = self
            .foreign
            .update(Indicator::new(name, arity), ForeignPredicate::new(f));
        m
    }

    /// The machine's current variable bindings. Typically only needed by
    /// foreign predicates.
    pub fn bindings(&self) -> &Bindings {
        &self.env
    }

    /// A machine like this one with the given bindings.
    pub fn set_bindings(&self, env: Bindings) -> Machine {
        let mut m = self.clone();
        m.env = env;
        m
    }

    /// A machine like this one with `term` on front of the conjunction
    /// stack. This is where cut gets its lexical scope: every bare `!` in
    /// the pushed term is rewritten to target the most recent cut barrier,
    /// descending through `,/2` and `;/2` on both sides and `->/2` on the
    /// then-branch only.
    pub fn push_conj(&self, term: Term) -> Machine {
        let term = match self.most_recent_cut_barrier() {
            Ok(id) => resolve_cuts(id, &term),
            Err(_no_barriers) => term,
        };

        let mut m = self.clone();
        m.conjs = self.conjs.cons(term);
        m
    }

    /// Pop the next pending goal. Errs with
    /// [`MachineError::EmptyConjunctions`] when there is none, which the
    /// step loop takes to mean an answer has been found.
    pub fn pop_conj(&self) -> Result<(Term, Machine), MachineError> {
        match self.conjs.pop() {
            Some((term, rest)) => {
                let mut m = self.clone();
                m.conjs = rest;
                Ok((term.clone(), m))
            }
            None => Err(MachineError::EmptyConjunctions),
        }
    }

    /// A machine with an empty conjunction stack.
    pub fn clear_conjs(&self) -> Machine {
        let mut m = self.clone();
        m.conjs = List::new();
        m
    }

    /// A machine like this one with an extra choice point on the
    /// disjunction stack.
    pub fn push_disj(&self, cp: ChoicePoint) -> Machine {
        let mut m = self.clone();
        m.disjs = self.disjs.cons(cp);
        m
    }

    /// Pop the most recent choice point.
    pub fn pop_disj(&self) -> Result<(ChoicePoint, Machine), MachineError> {
        match self.disjs.pop() {
            Some((cp, rest)) => {
                let mut m = self.clone();
                m.disjs = rest;
                Ok((cp.clone(), m))
            }
            None => Err(MachineError::EmptyDisjunctions),
        }
    }

    /// Make sure the top of the disjunction stack is a cut barrier,
    /// pushing a fresh one if it isn't. Called on entry to every
    /// user-defined predicate.
    pub fn demand_cut_barrier(&self) -> Machine {
        if let Some(top) = self.disjs.head() {
            if top.barrier_id().is_some() {
                return self.clone();
            }
        }
        self.push_disj(ChoicePoint::barrier())
    }

    /// The id of the most recent cut barrier on the disjunction stack.
    pub fn most_recent_cut_barrier(&self) -> Result<u64, MachineError> {
        for cp in &self.disjs {
            if let Some(id) = cp.barrier_id() {
                return Ok(id);
            }
        }
        Err(MachineError::NoBarriers)
    }

    /// Discard every disjunction stacked on top of the barrier with this
    /// id, keeping the barrier itself. Ids come from
    /// [`most_recent_cut_barrier`](Machine::most_recent_cut_barrier);
    /// asking for one that isn't on the stack is an engine bug.
    pub fn cut_to(&self, id: u64) -> Machine {
        let mut ds = self.disjs.clone();
        loop {
            match ds.head() {
                Some(cp) if cp.barrier_id() == Some(id) => {
                    let mut m = self.clone();
                    m.disjs = ds;
                    return m;
                }
                Some(_) => {}
                None => panic!("no cut barrier with id {}", id),
            }
            ds = ds.tail();
        }
    }

    // Scratch machine for sub-proofs (findall): same database, registry,
    // and bindings, but fresh stacks.
    pub(crate) fn with_empty_stacks(&self) -> Machine {
        let m = Machine {
            db: self.db.clone(),
            foreign: self.foreign.clone(),
            env: self.env.clone(),
            disjs: List::new(),
            conjs: List::new(),
        };
        m.demand_cut_barrier()
    }

    /// Advance the proof one transition. At the end of every invocation
    /// the top of the conjunction stack is the goal to try next.
    ///
    /// Returns the successor machine, carrying an answer when the
    /// conjunction stack emptied; errs with [`MachineError::Done`] once
    /// every alternative is exhausted.
    pub fn step(&self) -> Result<Step, MachineError> {
        let mut m = self.clone();

        // find a goal other than true/0 to prove
        let goal = loop {
            match m.pop_conj() {
                Err(_empty) => {
                    // nothing left to prove: this is an answer
                    let answer = m.env.clone();
                    debug!("answer: {}", answer);
                    // backtrack on the next step
                    let m = m.push_conj(Term::Atom(Atom::FAIL));
                    return Ok(Step {
                        machine: m,
                        answer: Some(answer),
                    });
                }
                Ok((goal, rest)) => {
                    m = rest;
                    // a variable goal may have been bound to something
                    // callable by now
                    let goal = m.env.walk(&goal);
                    if !goal.is_true() {
                        break goal;
                    }
                }
            }
        };

        let indicator = goal
            .indicator()
            .ok_or_else(|| MachineError::NotCallable(goal.clone()))?;

        if let Some(f) = self.foreign.get(&indicator).cloned() {
            trace!("foreign {}", indicator);
            let args = m.resolve_arguments(&goal);
            match f.call(&m, &args) {
                ForeignReturn::True => return Ok(Step::advance(m)),
                ForeignReturn::Machine(next) => return Ok(Step::advance(next)),
                ForeignReturn::Unify(pairs) => {
                    let mut env = Some(m.env.clone());
                    for (a, b) in &pairs {
                        env = env.and_then(|e| e.unify(a, b).ok());
                    }
                    match env {
                        Some(env) => return Ok(Step::advance(m.set_bindings(env))),
                        None => {} // backtrack below
                    }
                }
                ForeignReturn::Fail => {} // backtrack below
            }
        } else {
            // user-defined predicate: one choice point per clause, pushed
            // in reverse so the first-asserted clause is tried first
            trace!("user-defined {}", indicator);
            let clauses = m.db.candidates(&goal);
            m = m.demand_cut_barrier();
            for clause in clauses.iter().rev() {
                let cp = ChoicePoint::head_body(&m, goal.clone(), clause.clone());
                m = m.push_disj(cp);
            }
        }

        // follow disjunctions until one pans out
        loop {
            let (cp, rest) = match m.pop_disj() {
                Ok(popped) => popped,
                Err(_empty) => return Err(MachineError::Done),
            };
            m = rest;

            if let Some(next) = cp.follow() {
                trace!("followed {}", cp);
                return Ok(Step::advance(next));
            }
        }
    }

    // Each argument of a foreign goal is resolved one level: a bound
    // variable becomes its value, everything else passes through as-is.
    fn resolve_arguments(&self, goal: &Term) -> SmallVec<[Term; 8]> {
        match goal {
            Term::Compound(c) => c.args().iter().map(|arg| self.env.walk(arg)).collect(),
            _ => SmallVec::new(),
        }
    }
}

impl Default for Machine {
    fn default() -> Machine {
        Machine::new()
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "disjs:")?;
        for cp in &self.disjs {
            writeln!(f, "  {}", cp)?;
        }
        writeln!(f, "conjs:")?;
        for goal in &self.conjs {
            writeln!(f, "  {}", goal)?;
        }
        write!(f, "bindings: {}", self.env)
    }
}

/// Rewrite every lexical `!` in `term` into `$cut_to(id)`, descending into
/// both arguments of `,/2` and `;/2` and only the then-branch of `->/2`.
/// Cuts anywhere else stay unresolved until that term is itself pushed.
fn resolve_cuts(id: u64, term: &Term) -> Term {
    match term {
        Term::Atom(a) if *a == Atom::CUT => {
            Term::app(Atom::CUT_TO, vec![Term::int(id as i64)])
        }

        Term::Compound(c)
            if c.arity() == 2
                && (c.functor() == Atom::COMMA || c.functor() == Atom::SEMICOLON) =>
        {
            let left = resolve_cuts(id, &c.args()[0]);
            let right = resolve_cuts(id, &c.args()[1]);
            Term::app(c.functor(), vec![left, right])
        }

        Term::Compound(c) if c.arity() == 2 && c.functor() == Atom::ARROW => {
            // cuts in the condition belong to the condition's own context
            let then = resolve_cuts(id, &c.args()[1]);
            Term::app(c.functor(), vec![c.args()[0].clone(), then])
        }

        _ => term.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_machines_carry_a_bottom_barrier() {
        let m = Machine::blank();
        assert!(m.most_recent_cut_barrier().is_ok());
    }

    #[test]
    fn demand_cut_barrier_is_idempotent_at_the_top() {
        let m = Machine::blank();
        let id = m.most_recent_cut_barrier().unwrap();
        let m = m.demand_cut_barrier();
        assert_eq!(m.most_recent_cut_barrier().unwrap(), id);
    }

    #[test]
    fn conjunctions_pop_in_lifo_order() {
        let m = Machine::blank()
            .push_conj(Term::atom("first"))
            .push_conj(Term::atom("second"));

        let (goal, m) = m.pop_conj().unwrap();
        assert_eq!(goal, Term::atom("second"));
        let (goal, m) = m.pop_conj().unwrap();
        assert_eq!(goal, Term::atom("first"));
        assert!(m.pop_conj().is_err());
    }

    #[test]
    fn push_conj_rewrites_cut_lexically() {
        let m = Machine::blank();
        let id = m.most_recent_cut_barrier().unwrap();

        let body = read::term("p(X), !, q(X)").unwrap();
        let m = m.push_conj(body);
        let (pushed, _) = m.pop_conj().unwrap();

        let expected = Term::app(
            Atom::CUT_TO,
            vec![Term::int(id as i64)],
        );
        match pushed {
            Term::Compound(ref c) => {
                // p(X), ($cut_to(B), q(X))
                match &c.args()[1] {
                    Term::Compound(inner) => assert_eq!(inner.args()[0], expected),
                    other => panic!("expected compound, got {}", other),
                }
            }
            ref other => panic!("expected compound, got {}", other),
        }
    }

    #[test]
    fn cut_rewriting_skips_if_then_conditions() {
        let m = Machine::blank();
        let body = read::term("(! -> a ; b)").unwrap();
        let m = m.push_conj(body);
        let (pushed, _) = m.pop_conj().unwrap();

        // the `;` and `->` spines are descended, but the condition's `!`
        // is left alone
        match pushed {
            Term::Compound(ref semi) => match &semi.args()[0] {
                Term::Compound(arrow) => {
                    assert_eq!(arrow.args()[0], Term::Atom(Atom::CUT));
                }
                other => panic!("expected compound, got {}", other),
            },
            ref other => panic!("expected compound, got {}", other),
        }
    }

    #[test]
    fn cut_to_prunes_down_to_the_barrier() {
        let m = Machine::blank();
        let id = m.most_recent_cut_barrier().unwrap();

        let noise = ChoicePoint::retry(&m, Term::atom("noise"));
        let m = m.push_disj(noise.clone()).push_disj(noise);
        let cut = m.cut_to(id);

        // the barrier survives, the retries don't
        assert_eq!(cut.most_recent_cut_barrier().unwrap(), id);
        let (top, _) = cut.pop_disj().unwrap();
        assert_eq!(top.barrier_id(), Some(id));
    }

    #[test]
    fn operations_leave_the_receiver_untouched() {
        let m = Machine::blank();
        let conjs_before = m.conjs.len();

        let _ = m.push_conj(Term::atom("extra"));
        let _ = m.push_disj(ChoicePoint::barrier());
        let _ = m.set_bindings(Bindings::new());

        assert_eq!(m.conjs.len(), conjs_before);
        assert!(m.pop_conj().is_err());
    }

    #[test]
    fn stepping_an_exhausted_machine_reports_done() {
        let m = Machine::blank().push_conj(Term::Atom(Atom::FAIL));
        // fail/0 isn't registered on a blank machine and has no clauses,
        // so the only barrier is popped and the machine is done
        let mut m = m;
        loop {
            match m.step() {
                Ok(step) => m = step.machine,
                Err(MachineError::Done) => return,
                Err(err) => panic!("{}", err),
            }
        }
    }
}
