//! # Horn Engine
//!
//! An embeddable Prolog interpreter built on the [`horn_terms`] term
//! algebra.
//!
//! Source text flows through the [`lexer`] into the operator-aware
//! Pratt [`parser`], producing terms; the [`compiler`] lowers clauses
//! into a compact bytecode which the [`vm`] executes against a
//! persistent binding environment.  Non-determinism is a lazy tree of
//! alternatives ([`promise`]) driven depth-first by a single trampoline
//! loop, which is also where cut, `catch/3`, and cancellation live.
//! The [`builtins`] module supplies the standard predicate set, and
//! [`interpreter`] is the embedding façade a host application talks to.
//!
//! ## Example
//! ```rust
//! use horn_engine::Interpreter;
//!
//! let mut horn = Interpreter::try_new().unwrap();
//! horn.consult("path(X, Y) :- edge(X, Y). edge(a, b).").unwrap();
//!
//! let mut solutions = horn.query("path(a, W).").unwrap();
//! assert!(solutions.next().unwrap());
//! assert_eq!(solutions.get::<String>("W").unwrap(), "b");
//! ```

pub mod arith;
pub mod builtins;
pub mod compiler;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod promise;
pub mod stream;
pub mod vm;

pub use compiler::{Clause, Pi};
pub use error::{EngineError, PrologError};
pub use interpreter::{FromTerm, Interpreter, Solutions};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParsedVariable, Parser};
pub use promise::{accept, Cont, CutScope, Promise, Search};
pub use vm::{DoubleQuotes, Flags, Hooks, Procedure, Unknown, VM};
