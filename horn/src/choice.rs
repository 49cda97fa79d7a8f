use crate::machine::Machine;

use ::{
    horn_term::Term,
    log::trace,
    std::{
        fmt,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
    },
};

static NEXT_BARRIER_ID: AtomicU64 = AtomicU64::new(0);

/// A resumable alternative on the disjunction stack. Following a choice
/// point either advances a captured machine along that alternative or
/// fails, in which case the step loop tries the next one down.
#[derive(Clone)]
pub enum ChoicePoint {
    /// Try one candidate clause against a goal: rename the clause apart,
    /// unify its head with the goal under the captured machine's bindings,
    /// and schedule its body.
    HeadBody {
        machine: Arc<Machine>,
        goal: Term,
        clause: Term,
    },

    /// Resume the captured machine with an extra goal scheduled. Used for
    /// the right branch of a disjunction and the else branch of
    /// if-then-else.
    Retry { machine: Arc<Machine>, goal: Term },

    /// Never succeeds; exists only to mark predicate entry so that cut
    /// knows where to stop pruning. Every barrier has a distinct id.
    Barrier { id: u64 },
}

impl ChoicePoint {
    pub fn head_body(machine: &Machine, goal: Term, clause: Term) -> ChoicePoint {
        ChoicePoint::HeadBody {
            machine: Arc::new(machine.clone()),
            goal,
            clause,
        }
    }

    pub fn retry(machine: &Machine, goal: Term) -> ChoicePoint {
        ChoicePoint::Retry {
            machine: Arc::new(machine.clone()),
            goal,
        }
    }

    /// A fresh barrier. Ids come from a process-wide counter, so barriers
    /// from concurrent proofs never collide.
    pub fn barrier() -> ChoicePoint {
        ChoicePoint::Barrier {
            id: NEXT_BARRIER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The barrier id, when this choice point is a barrier.
    pub fn barrier_id(&self) -> Option<u64> {
        match self {
            ChoicePoint::Barrier { id } => Some(*id),
            _ => None,
        }
    }

    /// Advance along this alternative. `None` is logical failure: the
    /// alternative doesn't pan out and backtracking should continue.
    pub fn follow(&self) -> Option<Machine> {
        match self {
            ChoicePoint::HeadBody {
                machine,
                goal,
                clause,
            } => {
                let fresh = clause.renamed();
                let (head, body) = fresh.clause_parts();

                match machine.bindings().unify(goal, &head) {
                    Ok(env) => {
                        trace!("clause head {} matched goal {}", head, goal);
                        Some(machine.set_bindings(env).push_conj(body))
                    }
                    Err(_cant_unify) => None,
                }
            }

            ChoicePoint::Retry { machine, goal } => Some(machine.push_conj(goal.clone())),

            ChoicePoint::Barrier { .. } => None,
        }
    }
}

impl fmt::Display for ChoicePoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChoicePoint::HeadBody { goal, clause, .. } => {
                write!(f, "clause {} for {}", clause, goal)
            }
            ChoicePoint::Retry { goal, .. } => write!(f, "retry {}", goal),
            ChoicePoint::Barrier { id } => write!(f, "barrier #{}", id),
        }
    }
}

impl fmt::Debug for ChoicePoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
