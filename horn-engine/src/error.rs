//! # Engine Error Types
//!
//! This module defines [`EngineError`], the unified error enum for the
//! interpreter pipeline, and [`PrologError`], the carrier for errors
//! that exist as terms inside the object language.
//!
//! A Prolog-level error is a first-class term, conventionally
//! `error(Formal, Context)`, thrown with `throw/1` or raised by a
//! built-in, and caught by unifying it with a `catch/3` pattern.  The
//! constructors below build the ball term in the arena and prerender a
//! host-readable message, so the same value serves both worlds.

use horn_terms::{Arena, Term, TermError};
use smartstring::alias::String;
use thiserror::Error;

/// An error travelling through the engine's non-deterministic core.
///
/// `Ball` is an ordinary Prolog exception; `Halted` is the control
/// result of `halt/0..1`, which no handler intercepts.
#[derive(Debug, Clone, Error)]
pub enum PrologError {
    #[error("{message}")]
    Ball {
        /// The thrown term, allocated in the engine's arena.
        term: Term,
        /// Prerendered description for the host side.
        message: String,
    },

    #[error("halted with status {0}")]
    Halted(i32),
}

impl PrologError {
    /// The thrown term, if this is a thrown error.
    pub fn ball(&self) -> Option<Term> {
        match self {
            PrologError::Ball { term, .. } => Some(*term),
            PrologError::Halted(_) => None,
        }
    }

    /// Wraps an already-built ball term.
    pub fn from_ball(arena: &Arena, term: Term) -> Self {
        let message = String::from(format!("uncaught exception: {}", term.display(arena)));
        PrologError::Ball { term, message }
    }

    fn formal(arena: &mut Arena, formal: Term, context: &str, message: std::string::String) -> Self {
        let ctx = arena.atom(context);
        let term = arena.func("error", [formal, ctx]);
        PrologError::Ball {
            term,
            message: String::from(message),
        }
    }

    /// `instantiation_error`: an argument required to be instantiated
    /// is an unbound variable.
    pub fn instantiation(arena: &mut Arena, context: &str) -> Self {
        let formal = arena.atom("instantiation_error");
        Self::formal(
            arena,
            formal,
            context,
            format!("arguments are not sufficiently instantiated in {context}"),
        )
    }

    /// `type_error(Type, Culprit)`: an argument is of the wrong kind.
    pub fn type_error(arena: &mut Arena, type_name: &str, culprit: Term, context: &str) -> Self {
        let message = format!(
            "type error: expected {type_name}, found {} in {context}",
            culprit.display(arena)
        );
        let ty = arena.atom(type_name);
        let formal = arena.func("type_error", [ty, culprit]);
        Self::formal(arena, formal, context, message)
    }

    /// `domain_error(Domain, Culprit)`: an argument's value is outside
    /// the expected domain.
    pub fn domain_error(arena: &mut Arena, domain: &str, culprit: Term, context: &str) -> Self {
        let message = format!(
            "domain error: {} is not a valid {domain} in {context}",
            culprit.display(arena)
        );
        let dom = arena.atom(domain);
        let formal = arena.func("domain_error", [dom, culprit]);
        Self::formal(arena, formal, context, message)
    }

    /// `existence_error(Kind, Culprit)`: a referenced procedure,
    /// stream, or source does not exist.
    pub fn existence_error(arena: &mut Arena, kind: &str, culprit: Term, context: &str) -> Self {
        let message = format!(
            "existence error: unknown {kind} {} in {context}",
            culprit.display(arena)
        );
        let k = arena.atom(kind);
        let formal = arena.func("existence_error", [k, culprit]);
        Self::formal(arena, formal, context, message)
    }

    /// `permission_error(Op, Kind, Culprit)`: a disallowed operation.
    pub fn permission_error(
        arena: &mut Arena,
        operation: &str,
        kind: &str,
        culprit: Term,
        context: &str,
    ) -> Self {
        let message = format!(
            "permission error: cannot {operation} {kind} {} in {context}",
            culprit.display(arena)
        );
        let op = arena.atom(operation);
        let k = arena.atom(kind);
        let formal = arena.func("permission_error", [op, k, culprit]);
        Self::formal(arena, formal, context, message)
    }

    /// `representation_error(Flag)`: a value exceeds an implementation
    /// limit.
    pub fn representation_error(arena: &mut Arena, flag: &str, context: &str) -> Self {
        let f = arena.atom(flag);
        let formal = arena.func("representation_error", [f]);
        Self::formal(
            arena,
            formal,
            context,
            format!("representation error: {flag} exceeded in {context}"),
        )
    }

    /// `evaluation_error(Kind)`: an arithmetic fault such as
    /// `zero_divisor` or `int_overflow`.
    pub fn evaluation_error(arena: &mut Arena, kind: &str, context: &str) -> Self {
        let k = arena.atom(kind);
        let formal = arena.func("evaluation_error", [k]);
        Self::formal(
            arena,
            formal,
            context,
            format!("evaluation error: {kind} in {context}"),
        )
    }

    /// `resource_error(Kind)`: out of some finite resource.
    pub fn resource_error(arena: &mut Arena, kind: &str, context: &str) -> Self {
        let k = arena.atom(kind);
        let formal = arena.func("resource_error", [k]);
        Self::formal(
            arena,
            formal,
            context,
            format!("resource error: {kind} in {context}"),
        )
    }

    /// `syntax_error(Detail)`: from the parser, e.g. via `read_term/2`.
    pub fn syntax_error(arena: &mut Arena, detail: &str, context: &str) -> Self {
        let d = arena.atom(detail);
        let formal = arena.func("syntax_error", [d]);
        Self::formal(
            arena,
            formal,
            context,
            format!("syntax error: {detail} in {context}"),
        )
    }

    /// `system_error(Inner)`: a host-level fault.
    pub fn system_error(arena: &mut Arena, detail: &str) -> Self {
        let d = arena.atom(detail);
        let formal = arena.func("system_error", [d]);
        Self::formal(arena, formal, "system", format!("system error: {detail}"))
    }
}

/// Represents all possible errors surfaced to an embedding host.
///
/// [`EngineError`] provides a single error surface for the façade.
/// Each variant wraps a more specific underlying error, and thanks to
/// `#[from]` you can write `?` at call sites without explicit mapping.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A syntax error from the lexer or parser.
    #[error("syntax error at line {line}: {detail}")]
    Syntax { line: usize, detail: String },

    /// The input ended in the middle of a clause; more text could make
    /// it parse.
    #[error("more input required")]
    Insufficient,

    /// A term-layer fault.
    #[error(transparent)]
    Term(#[from] TermError),

    /// An uncaught Prolog exception or a halt.
    #[error(transparent)]
    Prolog(#[from] PrologError),

    /// A typed projection from a solution failed.
    #[error("cannot convert {variable} to the requested type")]
    Conversion { variable: String },

    /// The queried variable does not exist.
    #[error("no such variable: {0}")]
    NoSuchVariable(String),

    /// A host I/O fault.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// The exit status a standalone driver should report for this
    /// error: the halt code if the program halted, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Prolog(PrologError::Halted(code)) => *code,
            _ => 1,
        }
    }
}
