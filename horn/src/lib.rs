//! Horn is a small, embeddable Prolog proof engine in pure Rust. The
//! engine state is an immutable [`Machine`] value: consulting clauses,
//! registering foreign predicates, and even every step of proof search
//! produce a *new* machine and leave the old one untouched. Typical usage
//! looks something like this:
//!
//! ```
//! use horn::Machine;
//!
//! let m = Machine::new().consult_(
//!     "
//!     father(john).
//!     father(jacob).
//!
//!     mother(sue).
//!
//!     parent(X) :-
//!         father(X).
//!     parent(X) :-
//!         mother(X).
//!     ",
//! );
//!
//! if m.can_prove_("father(john).") {
//!     println!("john is a father");
//! }
//!
//! for solution in m.prove_all_("parent(X).") {
//!     println!("{} is a parent", solution.by_name_("X"));
//! }
//! ```
//!
//! Because machines are immutable, it's common to build a large machine
//! once during startup and then extend it at runtime; any number of
//! threads can hold, run, and "modify" the same machine in parallel
//! without coordination.
//!
//! Predicates can also be defined in Rust and registered with
//! [`Machine::register_foreign`]; see [`ForeignReturn`] for what such a
//! predicate may do. The control constructs (cut, `,/2`, `;/2`, `->/2`,
//! `call/N`) are themselves implemented this way, on top of the machine's
//! public stack operations.

pub mod builtins;
pub mod choice;
pub mod database;
pub mod foreign;
pub mod list;
pub mod machine;

pub use crate::{
    choice::ChoicePoint,
    database::Database,
    foreign::{ForeignPredicate, ForeignReturn},
    list::List,
    machine::{Machine, MachineError, Step, ToGoal},
};

pub use horn_term::{
    read, Atom, BindError, Bindings, CantUnify, Indicator, ReadError, Term, Var,
};
