//! Defines [`TermError`], the unified error type for term operations.
//!
//! Provides descriptive error variants for invalid terms, kind or arity
//! mismatches, malformed lists, and operator table issues.

use crate::Term;
use smartstring::alias::String;
use thiserror::Error;

/// Represents all possible errors that can occur within the term layer.
///
/// [`TermError`] provides a single error surface for higher-level
/// functions.  Each variant carries enough context to produce a useful
/// diagnostic, and `#[from]` conversions let callers write `?` at call
/// sites without explicit mapping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TermError {
    #[error("invalid term {0:?}")]
    InvalidTerm(Term),

    #[error("missing functor")]
    MissingFunctor,

    #[error("invalid functor {0:?}")]
    InvalidFunctor(Term),

    #[error("type mismatch: expected {expected}, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("arity mismatch: expected {expected}, found {found}")]
    UnexpectedArity { expected: usize, found: usize },

    #[error("unexpected name in {0:?}")]
    UnexpectedName(Term),

    /// A list whose tail is neither `[]` nor another cons cell, or a
    /// cyclic chain of cons cells.
    #[error("not a proper list: {0:?}")]
    ImproperList(Term),

    /// A list whose tail is an unbound variable.
    #[error("unbound list tail in {0:?}")]
    UnboundTail(Term),

    // Operator table errors
    #[error("invalid operator specifier: {0}")]
    InvalidSpecifier(String),

    #[error("operator priority {0} out of range")]
    InvalidPriority(i64),

    #[error("operator table error: {0}")]
    OperTab(String),
}

/// Returns `TermError::OperTab` with a formatted message.
///
/// # Example
/// ```rust, ignore
/// bail!("invalid value: {}", val);
/// ```
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::TermError::OperTab(
            smartstring::alias::String::from(format!($($arg)*)),
        ))
    }
}

pub(crate) use bail;
