//! The term algebra underneath the Horn proof engine: interned atoms,
//! process-unique logic variables, persistent variable bindings with
//! unification, and a reader for turning Prolog source text into terms.
//!
//! Everything here is an immutable value. Terms and bindings clone by
//! sharing structure, so they can be captured in choice points and handed
//! between threads without coordination.

pub mod atom;
pub mod bindings;
pub mod read;
pub mod term;

pub use crate::{
    atom::{Atom, AtomTable},
    bindings::{BindError, Bindings, CantUnify},
    read::{ReadError, Reader},
    term::{Compound, Indicator, Term, Var},
};
