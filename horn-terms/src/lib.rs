//! # Horn Terms
//!
//! An arena-backed representation of Prolog terms, together with the
//! machinery a resolution engine needs around them: a persistent binding
//! environment, unification, the standard order of terms, a user-extensible
//! operator table, and a token-emitting term writer.
//!
//! This crate provides a compact [`Term`] type: a 16 byte `Copy` handle
//! which carries both the tag and value of a term.  Atoms with short names
//! are stored inline; long names and compound terms are interned into an
//! [`Arena`].  Terms can be matched using the [`Term::view`] method which
//! yields a [`View`] that borrows from the underlying arena.
//!
//! Variable bindings never mutate terms.  An [`Env`] is an immutable
//! persistent map from variable identity to term; [`unify`] threads an
//! environment through and returns an extended one, so a backtracking
//! caller undoes a whole branch by dropping the environment it got back.
//!
//! ## Example
//! ```rust
//! use horn_terms::{unify, Arena, Env, View};
//!
//! let mut arena = Arena::new();
//!
//! // f(X, b)
//! let x = arena.fresh_var(Some("X"));
//! let b = arena.atom("b");
//! let lhs = arena.func("f", [x, b]);
//!
//! // f(a, b)
//! let a = arena.atom("a");
//! let rhs = arena.func("f", [a, b]);
//!
//! let env = Env::new();
//! let (env, ok) = unify(&arena, &env, lhs, rhs, false);
//! assert!(ok);
//! assert!(matches!(env.resolve(x).view(&arena).unwrap(), View::Atom("a")));
//! ```

mod arena;
mod display;
mod env;
mod error;
mod oper;
mod order;
mod term;
mod unify;
mod view;
mod writer;

pub use arena::{Arena, ArenaID, ArenaStats};
pub use display::TermDisplay;
pub use env::Env;
pub use error::TermError;
pub use oper::{
    Operator, OperatorTable, Specifier, SpecifierClass, MAX_PRIORITY, MIN_PRIORITY, UNBOUNDED,
};
pub use order::{compare, proper_list_vec, set, ListIter, SeqIter};
pub(crate) use term::{Handle, Slice, TinyArray};
pub use term::{IntoTerm, Term, VarId};
pub use unify::unify;
pub use view::View;
pub use writer::{write_term, WriteOptions, WriteToken};
