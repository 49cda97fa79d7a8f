//! The control and library predicates implemented in Rust. All of the
//! control flow is expressed through the machine's public stack
//! operations, so these double as a worked example of writing foreign
//! predicates.

use crate::{
    choice::ChoicePoint,
    foreign::ForeignReturn,
    machine::{Machine, MachineError},
};

use ::{
    horn_term::{Atom, Term},
    std::char,
};

/// Register the standard built-ins on `m`. Called by [`Machine::new`].
pub(crate) fn install(m: Machine) -> Machine {
    let m = m
        .register_foreign("!", 0, cut)
        .register_foreign("$cut_to", 1, cut_to)
        .register_foreign(",", 2, conjunction)
        .register_foreign(";", 2, disjunction)
        .register_foreign("->", 2, if_then)
        .register_foreign("=", 2, unify)
        .register_foreign("fail", 0, fail)
        .register_foreign("findall", 3, findall)
        .register_foreign("msort", 2, msort)
        .register_foreign("atom_codes", 2, atom_codes)
        .register_foreign("downcase_atom", 2, downcase_atom);

    // call/1 through call/6
    (1..=6usize).fold(m, |m, arity| m.register_foreign("call", arity, call))
}

// A bare `!` only reaches here when it was never rewritten at push time,
// e.g. a top-level `!` goal. It cuts to the most recent barrier.
pub fn cut(m: &Machine, _args: &[Term]) -> ForeignReturn {
    let id = match m.most_recent_cut_barrier() {
        Ok(id) => id,
        // machines carry a bottom barrier from the moment they're built
        Err(err) => panic!("{}", err),
    };
    ForeignReturn::Machine(m.cut_to(id))
}

// `$cut_to(Id)` is what `!` rewrites into; the argument is always an
// engine-generated barrier id.
pub fn cut_to(m: &Machine, args: &[Term]) -> ForeignReturn {
    match args[0] {
        Term::Int(id) => ForeignReturn::Machine(m.cut_to(id as u64)),
        ref other => panic!("$cut_to/1: `{}` is not a barrier id", other),
    }
}

// `,(A, B)`: push B then A, so A is proved first.
pub fn conjunction(m: &Machine, args: &[Term]) -> ForeignReturn {
    ForeignReturn::Machine(m.push_conj(args[1].clone()).push_conj(args[0].clone()))
}

// `;(A, B)`: a choice point that retries with B, then A as the immediate
// continuation. A left side of the form `C -> T` degenerates into
// if-then-else.
pub fn disjunction(m: &Machine, args: &[Term]) -> ForeignReturn {
    if let Term::Compound(c) = &args[0] {
        if c.functor() == Atom::ARROW && c.arity() == 2 {
            let cond = c.args()[0].clone();
            let then = c.args()[1].clone();
            return if_then_else(m, cond, then, args[1].clone());
        }
    }

    let rhs = ChoicePoint::retry(m, args[1].clone());
    ForeignReturn::Machine(m.push_disj(rhs).push_conj(args[0].clone()))
}

// Standalone `C -> T` is if-then-else with a failing else branch.
pub fn if_then(m: &Machine, args: &[Term]) -> ForeignReturn {
    if_then_else(m, args[0].clone(), args[1].clone(), Term::Atom(Atom::FAIL))
}

fn if_then_else(m: &Machine, cond: Term, then: Term, alt: Term) -> ForeignReturn {
    // barrier first, else-branch above it: committing to the condition
    // cuts the else branch and the condition's own alternatives away,
    // while a failing condition still backtracks into the else branch
    let m = m.demand_cut_barrier();
    let id = match m.most_recent_cut_barrier() {
        Ok(id) => id,
        Err(err) => panic!("{}", err),
    };
    let m = m.push_disj(ChoicePoint::retry(&m, alt));

    let commit = Term::app(Atom::CUT_TO, vec![Term::int(id as i64)]);
    let goal = Term::app(
        Atom::COMMA,
        vec![cond, Term::app(Atom::COMMA, vec![commit, then])],
    );
    ForeignReturn::Machine(m.push_conj(goal))
}

// `=(X, Y)`: plain unification of the two arguments.
pub fn unify(_m: &Machine, args: &[Term]) -> ForeignReturn {
    ForeignReturn::unify(args[0].clone(), args[1].clone())
}

pub fn fail(_m: &Machine, _args: &[Term]) -> ForeignReturn {
    ForeignReturn::Fail
}

// `call(Goal, Extra...)`: append the extra arguments to the goal and
// schedule it behind a fresh barrier, so cuts inside stay local.
pub fn call(m: &Machine, args: &[Term]) -> ForeignReturn {
    let goal = match &args[0] {
        Term::Atom(name) => Term::app(*name, args[1..].iter().cloned()),
        Term::Compound(c) => {
            let augmented = c.args().iter().cloned().chain(args[1..].iter().cloned());
            Term::app(c.functor(), augmented)
        }
        other => panic!("call/{}: `{}` is not callable", args.len(), other),
    };

    let m = m.demand_cut_barrier();
    ForeignReturn::Machine(m.push_conj(goal))
}

// `findall(Template, Goal, List)`: prove Goal to exhaustion on a scratch
// machine and collect the template instance of every answer, in answer
// order. The sub-proof's bindings never leak back.
pub fn findall(m: &Machine, args: &[Term]) -> ForeignReturn {
    let template = &args[0];
    let goal = &args[1];

    let mut sub = m.with_empty_stacks().push_conj(goal.clone());
    let mut collected = Vec::new();
    loop {
        match sub.step() {
            Ok(step) => {
                if let Some(env) = step.answer {
                    collected.push(env.resolve_rec(template));
                }
                sub = step.machine;
            }
            Err(MachineError::Done) => break,
            Err(err) => panic!("{}", err),
        }
    }

    ForeignReturn::unify(args[2].clone(), Term::list(collected))
}

// `msort(List, Sorted)`: stable sort in the standard order of terms,
// duplicates kept.
pub fn msort(m: &Machine, args: &[Term]) -> ForeignReturn {
    let list = m.bindings().resolve_rec(&args[0]);
    let mut elems = match list.as_list() {
        Some(elems) => elems,
        None => panic!("msort/2: `{}` is not a proper list", list),
    };

    elems.sort_by(|a, b| a.standard_order(b));
    ForeignReturn::unify(args[1].clone(), Term::list(elems))
}

// `atom_codes(Atomic, Codes)`: convert between an atom (or integer) and
// the list of its character codes.
pub fn atom_codes(m: &Machine, args: &[Term]) -> ForeignReturn {
    fn codes_of(text: &str) -> Term {
        Term::list(text.chars().map(|c| Term::int(c as i64)))
    }

    match &args[0] {
        Term::Atom(atom) => ForeignReturn::unify(args[1].clone(), codes_of(&atom.name())),
        Term::Int(n) => ForeignReturn::unify(args[1].clone(), codes_of(&n.to_string())),
        Term::Var(_) => {
            let codes = m.bindings().resolve_rec(&args[1]);
            let elems = match codes.as_list() {
                Some(elems) => elems,
                None => panic!("atom_codes/2: `{}` is not a proper list", codes),
            };

            let text = elems
                .iter()
                .map(|code| match code {
                    Term::Int(n) => char::from_u32(*n as u32)
                        .unwrap_or_else(|| panic!("atom_codes/2: `{}` is not a character code", n)),
                    other => panic!("atom_codes/2: `{}` is not a character code", other),
                })
                .collect::<String>();

            ForeignReturn::unify(args[0].clone(), Term::atom(text.as_str()))
        }
        other => panic!("atom_codes/2: `{}` is not atomic", other),
    }
}

// `downcase_atom(Atom, Lower)`: ASCII-agnostic lowercasing of the atom's
// name.
pub fn downcase_atom(_m: &Machine, args: &[Term]) -> ForeignReturn {
    match &args[0] {
        Term::Atom(atom) => {
            let lower = atom.name().to_lowercase();
            ForeignReturn::unify(args[1].clone(), Term::atom(lower.as_str()))
        }
        other => panic!("downcase_atom/2: `{}` is not an atom", other),
    }
}
