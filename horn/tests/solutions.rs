use ::{
    horn::{ForeignReturn, Machine, Term},
    std::{sync::Arc, thread},
};

fn logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const FAMILY: &str = "
    father(john).
    father(jacob).

    mother(sue).

    parent(X) :-
        father(X).
    parent(X) :-
        mother(X).
";

#[test]
fn answers_come_in_clause_order() {
    logging();
    let m = Machine::new().consult_(FAMILY);

    let answers = m.prove_all_("parent(X).");
    let names = answers
        .iter()
        .map(|env| env.by_name_("X").to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["john", "jacob", "sue"]);
}

#[test]
fn ground_goals_succeed_anonymously() {
    let m = Machine::new().consult_(FAMILY);

    assert!(m.can_prove_("parent(jacob)."));
    assert_eq!(m.prove_all_("parent(jacob).").len(), 1);
    assert!(!m.can_prove_("parent(zeus)."));
}

#[test]
fn cut_commits_to_the_first_solution() {
    let m = Machine::new().consult_(
        "
        p(1).
        p(2).
        p(3).

        q(X) :- p(X), !.
        ",
    );

    let answers = m.prove_all_("q(X)");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].by_name_("X"), Term::int(1));
}

#[test]
fn disjunction_explores_left_then_right() {
    let m = Machine::new().consult_(
        "
        p(1).
        p(2).
        ",
    );

    let answers = m.prove_all_("(p(X) ; p(Y))");
    assert_eq!(answers.len(), 4);

    // the left branch binds only X, the right only Y
    assert_eq!(answers[0].by_name_("X"), Term::int(1));
    assert_eq!(answers[1].by_name_("X"), Term::int(2));
    assert_eq!(answers[2].by_name_("Y"), Term::int(1));
    assert_eq!(answers[3].by_name_("Y"), Term::int(2));

    assert!(answers[0].by_name_("Y").variables().len() == 1);
    assert!(answers[2].by_name_("X").variables().len() == 1);
}

#[test]
fn findall_collects_every_solution() {
    let m = Machine::new().consult_(
        "
        p(a).
        p(b).
        ",
    );

    let answers = m.prove_all_("findall(X, p(X), L)");
    assert_eq!(answers.len(), 1);
    assert_eq!(
        answers[0].by_name_("L"),
        Term::list(vec![Term::atom("a"), Term::atom("b")])
    );
}

#[test]
fn unification_flows_through_clause_bodies() {
    let m = Machine::new().consult_("t(X, Y) :- X = Y.");

    let answers = m.prove_all_("t(foo(A, B), foo(1, 2))");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].by_name_("A"), Term::int(1));
    assert_eq!(answers[0].by_name_("B"), Term::int(2));
}

#[test]
fn cut_is_local_to_the_predicate_it_appears_in() {
    logging();
    let m = Machine::new().consult_(
        "
        a(1).
        a(2).

        b(1).
        b(2).

        q(X, Y) :- a(X), !, b(Y).
        ",
    );

    // the cut prunes a/1's alternatives but not b/1's, which come after it
    let answers = m.prove_all_("q(X, Y)");
    let pairs = answers
        .iter()
        .map(|env| (env.by_name_("X"), env.by_name_("Y")))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        vec![
            (Term::int(1), Term::int(1)),
            (Term::int(1), Term::int(2)),
        ]
    );

    // and it doesn't prune choice points outside q/2 either
    let answers = m.prove_all_("a(Outer), q(X, Y)");
    assert_eq!(answers.len(), 4);
}

#[test]
fn each_clause_invocation_gets_fresh_variables() {
    let m = Machine::new().consult_("pair(X, X).");

    // one invocation unifies its two arguments
    let answers = m.prove_all_("pair(A, B)");
    assert_eq!(answers.len(), 1);

    // two invocations don't interfere with each other
    let answers = m.prove_all_("pair(c, B), pair(B, D)");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].by_name_("D"), Term::atom("c"));
}

#[test]
fn if_then_else() {
    let m = Machine::new().consult_(
        "
        p(1).
        p(2).
        ",
    );

    // the condition commits to its first solution
    let answers = m.prove_all_("(p(X) -> R = X ; R = none)");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].by_name_("R"), Term::int(1));

    // a failing condition falls through to the else branch
    let answers = m.prove_all_("(p(9) -> R = found ; R = none)");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].by_name_("R"), Term::atom("none"));

    // standalone if-then has no else branch to fall back on
    assert!(!m.can_prove_("(p(9) -> true)"));
    assert!(m.can_prove_("(p(X) -> true)"));
}

#[test]
fn conjunction_proves_left_to_right() {
    let m = Machine::new().consult_(
        "
        step(one).
        next(one, two).
        ",
    );

    let answers = m.prove_all_("step(X), next(X, Y)");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].by_name_("Y"), Term::atom("two"));

    assert!(!m.can_prove_("step(X), next(two, X)"));
}

#[test]
fn true_and_fail() {
    let m = Machine::new();

    assert!(m.can_prove_("true"));
    assert_eq!(m.prove_all_("true").len(), 1);
    assert!(!m.can_prove_("fail"));
    assert!(!m.can_prove_("true, fail"));
}

#[test]
fn equals_unifies_in_place() {
    let m = Machine::new();

    let answers = m.prove_all_("X = point(1, 2)");
    assert_eq!(answers.len(), 1);
    assert_eq!(
        answers[0].by_name_("X"),
        Term::app("point", vec![Term::int(1), Term::int(2)])
    );

    assert!(!m.can_prove_("a = b"));
    assert!(m.can_prove_("f(X, 2) = f(1, Y)"));
}

#[test]
fn machines_are_immutable_values() {
    let base = Machine::new();
    let loaded = base.consult_("p(1).");

    // consulting produced a new machine; the original still knows nothing
    assert!(loaded.can_prove_("p(1)"));
    assert!(!base.can_prove_("p(1)"));

    // proving doesn't change a machine either: same query, same answers
    let first = loaded.prove_all_("p(X)");
    let second = loaded.prove_all_("p(X)");
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].by_name_("X"), second[0].by_name_("X"));
}

#[test]
fn consult_extends_rather_than_replaces() {
    let m = Machine::new().consult_("p(1).");
    let m = m.consult_("p(2).");

    let answers = m.prove_all_("p(X)");
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0].by_name_("X"), Term::int(1));
    assert_eq!(answers[1].by_name_("X"), Term::int(2));
}

#[test]
fn directives_are_ignored_on_consult() {
    let m = Machine::new().consult_(
        "
        :- some_directive.
        p(1).
        ",
    );

    assert!(m.can_prove_("p(1)"));
    assert!(!m.can_prove_("some_directive"));
}

#[test]
fn foreign_predicates_cover_all_four_returns() {
    let m = Machine::new()
        .register_foreign("always", 0, |_m, _args| ForeignReturn::True)
        .register_foreign("never", 0, |_m, _args| ForeignReturn::Fail)
        .register_foreign("greet", 1, |_m, args| {
            ForeignReturn::unify(args[0].clone(), Term::atom("hello"))
        })
        .register_foreign("twice", 1, |m: &Machine, args: &[Term]| {
            // schedule the argument twice, via the machine escape hatch
            ForeignReturn::Machine(m.push_conj(args[0].clone()).push_conj(args[0].clone()))
        });

    assert!(m.can_prove_("always"));
    assert!(!m.can_prove_("never"));

    let answers = m.prove_all_("greet(X)");
    assert_eq!(answers[0].by_name_("X"), Term::atom("hello"));

    let m = m.consult_("p(1). p(2).");
    // both copies of the goal share X, so the second proof is constrained
    // by whatever the first one bound
    assert_eq!(m.prove_all_("twice(p(X))").len(), 2);
}

#[test]
fn registering_an_indicator_again_replaces_it() {
    let m = Machine::new()
        .register_foreign("answer", 1, |_m, args| {
            ForeignReturn::unify(args[0].clone(), Term::int(1))
        });
    let replaced = m.register_foreign("answer", 1, |_m, args| {
        ForeignReturn::unify(args[0].clone(), Term::int(42))
    });

    assert_eq!(m.prove_all_("answer(X)")[0].by_name_("X"), Term::int(1));
    assert_eq!(
        replaced.prove_all_("answer(X)")[0].by_name_("X"),
        Term::int(42)
    );
}

#[test]
fn goals_can_be_terms_or_text() {
    let m = Machine::new().consult_(FAMILY);

    let goal = horn::read::term("father(X)").unwrap();
    let by_term = m.prove_all_(&goal);
    let by_text = m.prove_all_("father(X)");
    assert_eq!(by_term.len(), by_text.len());
}

#[test]
fn machines_prove_concurrently_without_locks() {
    let m = Arc::new(Machine::new().consult_(FAMILY));

    let handles = (0..4)
        .map(|_| {
            let m = m.clone();
            thread::spawn(move || m.prove_all_("parent(X)").len())
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}

#[test]
fn deep_recursion_through_lists() {
    let m = Machine::new().consult_(
        "
        append([], L, L).
        append([H | T], L, [H | R]) :- append(T, L, R).
        ",
    );

    let answers = m.prove_all_("append([a, b], [c], X)");
    assert_eq!(answers.len(), 1);
    assert_eq!(
        answers[0].by_name_("X"),
        Term::list(vec![Term::atom("a"), Term::atom("b"), Term::atom("c")])
    );

    // append also runs backwards, splitting a list every possible way
    let splits = m.prove_all_("append(X, Y, [1, 2, 3])");
    assert_eq!(splits.len(), 4);
}

#[test]
fn prove_all_reports_parse_errors() {
    let m = Machine::new();
    assert!(m.prove_all("p(").is_err());
    assert!(m.consult("p(1). q(").is_err());
}
