//! Defines [`View`], a borrowed read-only representation of a [`Term`].
//!
//! Provides lightweight accessors for inspecting terms without allocation.

use crate::{Arena, Handle, Term, TermError, VarId};
use core::fmt;

/// A borrowed view into the interned contents of a [`Term`].
///
/// Use [`Term::view`] to obtain a view.  Each variant of [`View`]
/// represents the decoded form of a term and borrows any data
/// referenced from the [`Arena`] or the term handle itself.  No
/// allocations are performed when constructing a `View`; instead
/// references into the underlying storage are returned directly.  The
/// lifetime `'a` binds the returned references to both the borrowed
/// `Term` and the supplied `Arena`.
#[derive(Clone, Copy)]
pub enum View<'a> {
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Real(f64),
    /// A variable identity.  The source name, if any, is available
    /// through [`Arena::var_name`].
    Var(VarId),
    /// An atom name borrowed from the term or arena.
    Atom(&'a str),
    /// A compound term view containing the functor atom and a slice
    /// of arguments.  Both the functor and the argument slice are
    /// borrowed; the arguments themselves are `Term` handles owned
    /// by the arena.
    Func(&'a Arena, &'a Term, &'a [Term]),
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            View::Int(i) => f.debug_tuple("Int").field(&i).finish(),
            View::Real(r) => f.debug_tuple("Real").field(&r).finish(),
            View::Var(v) => f.debug_tuple("Var").field(&v).finish(),
            View::Atom(a) => f.debug_tuple("Atom").field(&a).finish(),
            View::Func(a, fr, ts) => f
                .debug_tuple("Func")
                .field(&a.arena_id)
                .field(&fr)
                .field(&ts.iter().map(|t| t.view(a)).collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl Term {
    /// Produce a [`View`] of this term that borrows from the given
    /// [`Arena`].  This method decodes any inlined bytes and
    /// dereferences indexes into the arena to yield structured
    /// references.  See [`View`] for details.
    #[inline]
    pub fn view<'a>(&'a self, arena: &'a Arena) -> Result<View<'a>, TermError> {
        match &self.0 {
            Handle::Int(i) => Ok(View::Int(*i)),
            Handle::Real(f) => Ok(View::Real(*f)),
            Handle::Var(id) => Ok(View::Var(VarId(*id))),
            Handle::Atom(a) => Ok(View::Atom(a.as_str())),
            Handle::AtomRef(ar) => {
                let bytes = arena
                    .byte_slice(ar)
                    .ok_or(TermError::InvalidTerm(*self))?;
                // Interned bytes always originate from &str data.
                Ok(View::Atom(unsafe { core::str::from_utf8_unchecked(bytes) }))
            }
            Handle::FuncRef(fr) => {
                let slice = arena
                    .term_slice(fr)
                    .ok_or(TermError::InvalidTerm(*self))?;
                // Functor is the first element of the slice.
                let functor = &slice[0];
                let args = &slice[1..];
                Ok(View::Func(arena, functor, args))
            }
        }
    }
}

impl Arena {
    /// Produce a [`View`] of the given `term` that borrows from this
    /// [`Arena`].  See [`View`] for details.
    #[inline]
    pub fn view<'a>(&'a self, term: &'a Term) -> Result<View<'a>, TermError> {
        term.view(self)
    }
}

/// Syntactic equality of views: same kind, same value, argument-wise
/// for compounds.  Variables compare by identity; numbers of different
/// kinds are never equal.  Binding environments play no part here —
/// resolve first if that is what you mean.
impl<'a> PartialEq for View<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (View::Int(a), View::Int(b)) => a == b,
            (View::Real(a), View::Real(b)) => a == b,
            (View::Var(a), View::Var(b)) => a == b,
            (View::Atom(a), View::Atom(b)) => a == b,
            (View::Func(arena_a, functor_a, args_a), View::Func(arena_b, functor_b, args_b)) => {
                if args_a.len() != args_b.len() {
                    return false;
                }
                match (functor_a.view(arena_a), functor_b.view(arena_b)) {
                    (Ok(fa), Ok(fb)) if fa == fb => {}
                    _ => return false,
                }
                args_a
                    .iter()
                    .zip(args_b.iter())
                    .all(|(a, b)| match (a.view(arena_a), b.view(arena_b)) {
                        (Ok(va), Ok(vb)) => va == vb,
                        _ => false,
                    })
            }
            _ => false,
        }
    }
}
