//! Defines the core [`Term`] type and related constructors.
//!
//! Provides a compact representation for Prolog terms and basic
//! utilities for creating and inspecting them.

use crate::{Arena, TermError};
use core::fmt;
use smartstring::alias::String;
use std::borrow::Cow;

// The following type definitions describe the internal representation
// of a term.  Rather than packing data into a single integer we use
// a tagged enum to store the various kinds of terms.  Each variant
// carries its associated data directly, for example a 64 bit integer
// for numeric types or a small inline buffer for short atom names.
// Long names or argument sequences store an index and length into the
// appropriate arena storage.

#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub(crate) struct TinyArray {
    pub(crate) bytes: [u8; 14],
    pub(crate) len: u8,
}

impl TinyArray {
    #[inline]
    pub(crate) fn as_str(&self) -> &str {
        let bytes = &self.bytes[..self.len as usize];
        // Inline buffers are only ever filled from &str data.
        unsafe { core::str::from_utf8_unchecked(bytes) }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub(crate) struct Slice {
    pub(crate) index: u32,
    pub(crate) len: u32,
}

/// The identity of a variable.  Identity, not name, distinguishes
/// variables: two variables with the same written name in different
/// clauses are different variables, and an anonymous variable has no
/// name at all.  Fresh identities are handed out by
/// [`Arena::fresh_var`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u64);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_G{}", self.0)
    }
}

/// Internal handle describing the kind of a term and storing its data.
///
/// Each variant stores the associated value directly.  The `repr(u8)`
/// attribute ensures the discriminant occupies a single byte, which
/// together with the payloads yields a `Term` size of 16 bytes on
/// 64-bit targets.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
#[repr(u8)]
pub(crate) enum Handle {
    Int(i64),
    Real(f64),
    Var(u64),
    Atom(TinyArray),
    AtomRef(Slice),
    FuncRef(Slice),
}

/// A compact, copyable handle referencing a term stored in an [`Arena`].
///
/// Internally a `Term` stores a single [`Handle`] enum variant.  On
/// 64-bit targets the discriminant and associated payload occupy 16
/// bytes in total.  Users should never construct `Term` values
/// directly; instead use the associated constructors, the [`Arena`]
/// methods, or the convenience macros exported from this crate.
/// Instances of `Term` are cheap to copy (`Copy` and `Clone`).
///
/// Handle equality is syntactic equality for everything except long
/// atoms and compounds: long atom names are interned through a
/// deduplicating index, so two equal atoms always compare equal by
/// handle, while two structurally equal compounds may live at
/// different arena slices.  Structural comparison goes through
/// [`Term::view`] or [`crate::compare`].
#[derive(Copy, Clone, PartialEq, PartialOrd)]
pub struct Term(pub(crate) Handle);

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Handle::Int(i) => write!(f, "Int({i})"),
            Handle::Real(r) => write!(f, "Real({r})"),
            Handle::Var(v) => write!(f, "Var(_G{v})"),
            Handle::Atom(a) => write!(f, "Atom({:?})", a.as_str()),
            Handle::AtomRef(s) => write!(f, "AtomRef({}..+{})", s.index, s.len),
            Handle::FuncRef(s) => write!(f, "FuncRef({}..+{})", s.index, s.len),
        }
    }
}

impl AsRef<Term> for Term {
    fn as_ref(&self) -> &Self {
        self
    }
}

macro_rules! impl_from_integers_for_term {
    ($($t:ty),* $(,)?) => {$(
        impl From<$t> for Term {
            #[inline]
            fn from(v: $t) -> Self { Term::int(v as i64) }
        }
    )*};
}
impl_from_integers_for_term!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_from_floats_for_term {
    ($($t:ty),* $(,)?) => {$(
        impl From<$t> for Term {
            #[inline]
            fn from(v: $t) -> Self { Term::real(v as f64) }
        }
    )*};
}
impl_from_floats_for_term!(f32, f64);

/// Conversion of host values into terms, allocating through an arena
/// when the value needs interned storage.
pub trait IntoTerm {
    fn into_term(self, arena: &mut Arena) -> Term;
}

macro_rules! impl_intoterm_for_integers {
    ($($t:ty),* $(,)?) => {$(
        impl IntoTerm for $t {
            #[inline]
            fn into_term(self, _arena: &mut Arena) -> Term { Term::int(self as i64) }
        }
    )*};
}
impl_intoterm_for_integers!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_intoterm_for_floats {
    ($($t:ty),* $(,)?) => {$(
        impl IntoTerm for $t {
            #[inline]
            fn into_term(self, _arena: &mut Arena) -> Term { Term::real(self as f64) }
        }
    )*};
}
impl_intoterm_for_floats!(f32, f64);

impl<'a> IntoTerm for &'a str {
    #[inline]
    fn into_term(self, arena: &mut Arena) -> Term {
        Term::atom(arena, self)
    }
}

impl<'a> IntoTerm for Cow<'a, str> {
    #[inline]
    fn into_term(self, arena: &mut Arena) -> Term {
        Term::atom(arena, self.as_ref())
    }
}

impl IntoTerm for String {
    #[inline]
    fn into_term(self, arena: &mut Arena) -> Term {
        Term::atom(arena, &self)
    }
}

impl IntoTerm for std::string::String {
    #[inline]
    fn into_term(self, arena: &mut Arena) -> Term {
        Term::atom(arena, &self)
    }
}

impl IntoTerm for Term {
    #[inline]
    fn into_term(self, _arena: &mut Arena) -> Term {
        self
    }
}

impl IntoTerm for &Term {
    #[inline]
    fn into_term(self, _arena: &mut Arena) -> Term {
        *self
    }
}

impl<F> IntoTerm for F
where
    F: FnOnce(&mut Arena) -> Term,
{
    #[inline]
    fn into_term(self, arena: &mut Arena) -> Term {
        self(arena)
    }
}

impl Term {
    /// Constant representing the empty list.  Internally this is the
    /// atom `"[]"` encoded as a small atom.  It may be copied freely
    /// and does not depend on any arena.
    pub const NIL: Term = Term(Handle::Atom(TinyArray {
        bytes: [b'[', b']', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        len: 2,
    }));

    /// Construct a new integer term.  The full 64 bit two's complement
    /// representation of `i` is stored in the payload.  No truncation
    /// occurs.
    #[inline]
    pub fn int(i: impl Into<i64>) -> Self {
        Self(Handle::Int(i.into()))
    }

    /// Construct a new floating point term.  The full 64 bit IEEE-754
    /// bit pattern is stored in the payload without truncation.
    #[inline]
    pub fn real(f: impl Into<f64>) -> Self {
        Self(Handle::Real(f.into()))
    }

    /// Construct or intern an atom into the arena and produce a term
    /// referencing it.  Small atom names (≤14 bytes of UTF-8) are
    /// inlined directly into the handle; longer names are interned
    /// into the arena through a deduplicating index so that equal
    /// atoms always yield equal handles.
    #[inline]
    pub fn atom(arena: &mut Arena, name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let bytes = name.as_bytes();
        if bytes.len() <= 14 {
            let mut buf = [0u8; 14];
            buf[..bytes.len()].copy_from_slice(bytes);
            Self(Handle::Atom(TinyArray {
                bytes: buf,
                len: bytes.len() as u8,
            }))
        } else {
            Self(Handle::AtomRef(arena.intern_atom(name)))
        }
    }

    /// Wrap a variable identity in a term handle.  Fresh identities
    /// come from [`Arena::fresh_var`].
    #[inline]
    pub(crate) fn var(id: VarId) -> Self {
        Self(Handle::Var(id.0))
    }

    /// Construct a new compound term by interning the functor and
    /// arguments in the arena.  The returned term references a slice
    /// in the arena's term storage consisting of the functor atom as
    /// the first entry followed by the argument handles.  A functor of
    /// arity zero results in an atom.
    #[inline]
    pub fn func(
        arena: &mut Arena,
        functor: impl AsRef<str>,
        args: impl IntoIterator<Item = impl IntoTerm>,
    ) -> Self {
        let functor_atom = Self::atom(arena, functor);
        let args: Vec<Term> = args.into_iter().map(|x| x.into_term(arena)).collect();
        if args.is_empty() {
            return functor_atom;
        }
        Self(Handle::FuncRef(arena.intern_func(functor_atom, args)))
    }

    /// Construct a new compound term from a sequence of terms (functor
    /// first, then arguments).  A functor with no arguments yields the
    /// atom itself.  Errors if no functor is provided or if the first
    /// term is not an atom.
    #[inline]
    pub fn funcv(
        arena: &mut Arena,
        terms: impl IntoIterator<Item = impl IntoTerm>,
    ) -> Result<Self, TermError> {
        let terms: Vec<Term> = terms.into_iter().map(|x| x.into_term(arena)).collect();
        let Some((&functor_atom, args)) = terms.split_first() else {
            return Err(TermError::MissingFunctor);
        };
        if !functor_atom.is_atom() {
            return Err(TermError::InvalidFunctor(functor_atom));
        }
        if args.is_empty() {
            return Ok(functor_atom);
        }
        Ok(Self(Handle::FuncRef(
            arena.intern_func(functor_atom, args.to_vec()),
        )))
    }

    /// Returns `true` if this term is an atom.
    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self.0, Handle::Atom(_) | Handle::AtomRef(_))
    }

    /// Returns `true` if this term is an unresolved variable handle.
    /// Whether the variable is bound is a question for an [`crate::Env`].
    #[inline]
    pub fn is_var(&self) -> bool {
        matches!(self.0, Handle::Var(_))
    }

    /// Returns `true` if this term is an integer or a float.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self.0, Handle::Int(_) | Handle::Real(_))
    }

    /// Returns `true` if this term is a compound.
    #[inline]
    pub fn is_compound(&self) -> bool {
        matches!(self.0, Handle::FuncRef(_))
    }

    /// Returns the variable identity if this term is a variable.
    #[inline]
    pub fn var_id(&self) -> Option<VarId> {
        match self.0 {
            Handle::Var(id) => Some(VarId(id)),
            _ => None,
        }
    }

    /// A short name for the kind of this term, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.0 {
            Handle::Int(_) => "integer",
            Handle::Real(_) => "float",
            Handle::Var(_) => "variable",
            Handle::Atom(_) | Handle::AtomRef(_) => "atom",
            Handle::FuncRef(_) => "compound",
        }
    }
}

/// Builds an atom term.  Without `=> arena` the expansion is a closure
/// usable anywhere an [`IntoTerm`] is expected.
///
/// ```rust
/// # use horn_terms::{atom, func, Arena};
/// # let mut arena = Arena::new();
/// let t = atom!("hello" => &mut arena);
/// let u = func!("point"; 1, atom!("y") => &mut arena);
/// ```
#[macro_export]
macro_rules! atom {
    ($name:expr => $arena:expr) => {
        $crate::Term::atom($arena, $name)
    };
    ($name:expr) => {
        move |arena: &mut $crate::Arena| $crate::Term::atom(arena, $name)
    };
}

/// Builds a compound term from a functor and argument expressions, each
/// of which may be any [`IntoTerm`] (numbers, strings, terms, or nested
/// `atom!`/`func!`/`list!` closures).
#[macro_export]
macro_rules! func {
    ($name:expr; $($arg:expr),+ $(,)? => $arena:expr) => {{
        let arena = $arena;
        let args = vec![$($crate::IntoTerm::into_term($arg, arena)),+];
        $crate::Term::func(arena, $name, args)
    }};
    ($name:expr; $($arg:expr),+ $(,)?) => {
        move |arena: &mut $crate::Arena| {
            let args = vec![$($crate::IntoTerm::into_term($arg, arena)),+];
            $crate::Term::func(arena, $name, args)
        }
    };
}

/// Builds a proper list term out of `'.'/2` cells.
#[macro_export]
macro_rules! list {
    () => {
        $crate::Term::NIL
    };
    ($($item:expr),+ $(,)? => $arena:expr) => {{
        let arena = $arena;
        let items = vec![$($crate::IntoTerm::into_term($item, arena)),+];
        arena.list(items)
    }};
    ($($item:expr),+ $(,)?) => {
        move |arena: &mut $crate::Arena| {
            let items = vec![$($crate::IntoTerm::into_term($item, arena)),+];
            arena.list(items)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::View;

    #[test]
    fn term_size_is_16_bytes() {
        assert_eq!(core::mem::size_of::<Term>(), 16);
    }

    #[test]
    fn nil_is_the_empty_list_atom() {
        let arena = Arena::new();
        assert!(matches!(Term::NIL.view(&arena).unwrap(), View::Atom("[]")));
    }

    #[test]
    fn short_atoms_are_inline_and_equal_by_handle() {
        let mut arena = Arena::new();
        let a = arena.atom("foo");
        let b = arena.atom("foo");
        assert_eq!(a, b);
        assert!(a.is_atom());
    }

    #[test]
    fn long_atoms_are_interned_and_equal_by_handle() {
        let mut arena = Arena::new();
        let a = arena.atom("a_rather_long_atom_name");
        let b = arena.atom("a_rather_long_atom_name");
        assert_eq!(a, b);
    }

    #[test]
    fn zero_arity_func_is_an_atom() {
        let mut arena = Arena::new();
        let t = Term::func(&mut arena, "f", Vec::<Term>::new());
        assert!(t.is_atom());
    }

    #[test]
    fn funcv_requires_an_atom_functor() {
        let mut arena = Arena::new();
        let n = Term::int(1);
        let err = Term::funcv(&mut arena, [n, n]).unwrap_err();
        assert!(matches!(err, TermError::InvalidFunctor(_)));
    }

    #[test]
    fn macros_compose() {
        let mut arena = Arena::new();
        let t = func!("example"; 123, "abc", list![1, 2, 3], atom!("x") => &mut arena);
        match t.view(&arena).unwrap() {
            View::Func(ar, functor, args) => {
                assert_eq!(ar.atom_name(functor).unwrap(), "example");
                assert_eq!(args.len(), 4);
            }
            _ => unreachable!(),
        }
    }
}
