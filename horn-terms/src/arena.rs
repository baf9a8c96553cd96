//! Defines the [`Arena`] type, which manages allocation and interning
//! of data for [`Term`] values.
//!
//! Provides constructors, basic allocation methods, and utilities for
//! working with terms stored in the arena.

use crate::{IntoTerm, Slice, Term, TermError, VarId, View};
use indexmap::IndexMap;
use smartstring::alias::String;

/// The arena interns atom names, compound terms, and the variable name
/// registry.  An `Arena` owns all memory for interned data; terms store
/// only indices into it and remain valid as long as the arena is alive.
///
/// Storage is append-only.  Long atom names go through a deduplicating
/// index so that two equal atoms always carry the same slice and atom
/// equality reduces to handle equality.  Compound terms are stored as
/// contiguous slices `[functor, arg1, arg2, …]`; argument sequences are
/// immutable once interned.
///
/// Variables are not interned data: [`Arena::fresh_var`] hands out a new
/// identity on every call and records the optional source name for the
/// writer and for query projection.  Bindings live in a
/// [`crate::Env`], never in the arena, so the arena can be shared by
/// every branch of a search.
#[derive(Default, Clone, Debug)]
pub struct Arena {
    /// Randomly generated arena ID, carried into `Debug` output so that
    /// handles accidentally resolved against a foreign arena are easier
    /// to spot.
    pub(crate) arena_id: ArenaID,

    /// Storage for interned long atom names.
    pub(crate) bytes: Vec<u8>,

    /// Deduplicating index over interned atom names.
    pub(crate) atom_index: IndexMap<String, Slice>,

    /// Storage for compound terms.  Each compound is a contiguous
    /// slice: `[functor_atom, arg1, arg2, …]`.  The `FuncRef` handle
    /// encodes both the slice's starting index and length.
    pub(crate) terms: Vec<Term>,

    /// Source names of variables, indexed by variable identity.
    /// Anonymous variables have no name.
    pub(crate) var_names: Vec<Option<String>>,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaID(pub(crate) u32);

#[derive(Debug, Clone, Copy)]
pub struct ArenaStats {
    pub bytes_len: usize,
    pub terms_len: usize,
    pub atoms_interned: usize,
    pub vars_allocated: usize,
}

impl Arena {
    /// Create a new, empty arena with given capacities.
    pub fn with_capacity(bytes_capacity: usize, terms_capacity: usize) -> Self {
        Self {
            arena_id: ArenaID(rand::random()),
            bytes: Vec::with_capacity(bytes_capacity),
            atom_index: IndexMap::new(),
            terms: Vec::with_capacity(terms_capacity),
            var_names: Vec::new(),
        }
    }

    /// Create a new, empty arena with default capacities.
    pub fn new() -> Self {
        Self::with_capacity(4096, 1024)
    }

    /// Returns stats.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            bytes_len: self.bytes.len(),
            terms_len: self.terms.len(),
            atoms_interned: self.atom_index.len(),
            vars_allocated: self.var_names.len(),
        }
    }

    /// Convert a `value` into a `Term`.
    #[inline]
    pub fn term<T: IntoTerm>(&mut self, value: T) -> Term {
        value.into_term(self)
    }

    /// Construct a new integer term.
    #[inline]
    pub fn int(&mut self, i: impl Into<i64>) -> Term {
        Term::int(i)
    }

    /// Construct a new floating point term.
    #[inline]
    pub fn real(&mut self, r: impl Into<f64>) -> Term {
        Term::real(r)
    }

    /// Construct or intern an atom and produce a term referencing it.
    #[inline]
    pub fn atom(&mut self, name: impl AsRef<str>) -> Term {
        Term::atom(self, name)
    }

    /// Allocate a fresh variable, optionally recording its source name.
    /// Every call returns a distinct identity regardless of the name.
    #[inline]
    pub fn fresh_var(&mut self, name: Option<&str>) -> Term {
        let id = VarId(self.var_names.len() as u64);
        self.var_names.push(name.map(String::from));
        Term::var(id)
    }

    /// Returns the recorded source name of a variable, if any.
    #[inline]
    pub fn var_name(&self, id: VarId) -> Option<&str> {
        self.var_names
            .get(id.0 as usize)
            .and_then(|n| n.as_deref())
    }

    /// Construct a new compound term.
    #[inline]
    pub fn func(
        &mut self,
        functor: impl AsRef<str>,
        args: impl IntoIterator<Item = impl IntoTerm>,
    ) -> Term {
        Term::func(self, functor, args)
    }

    /// Construct a new compound term from a sequence of terms (functor
    /// first, then arguments).
    #[inline]
    pub fn funcv(
        &mut self,
        terms: impl IntoIterator<Item = impl IntoTerm>,
    ) -> Result<Term, TermError> {
        Term::funcv(self, terms)
    }

    /// Constructs a cons cell `'.'(car, cdr)`.
    #[inline]
    pub fn cons(&mut self, car: impl IntoTerm, cdr: impl IntoTerm) -> Term {
        let car = car.into_term(self);
        let cdr = cdr.into_term(self);
        self.func(".", [car, cdr])
    }

    /// Constructs a proper list of `'.'/2` cells ending in `[]`.  An
    /// empty sequence yields `[]`.
    pub fn list(&mut self, terms: impl IntoIterator<Item = impl IntoTerm>) -> Term {
        self.partial_list(terms, Term::NIL)
    }

    /// Constructs a list of `'.'/2` cells ending in `tail`.
    pub fn partial_list(
        &mut self,
        terms: impl IntoIterator<Item = impl IntoTerm>,
        tail: impl IntoTerm,
    ) -> Term {
        let items: Vec<Term> = terms.into_iter().map(|x| x.into_term(self)).collect();
        let mut list = tail.into_term(self);
        for item in items.into_iter().rev() {
            list = self.cons(item, list);
        }
        list
    }

    /// Returns the name of a compound term or an atom.
    #[inline]
    pub fn name<'a>(&'a self, term: &'a Term) -> Result<&'a str, TermError> {
        match self.view(term)? {
            View::Atom(name) => Ok(name),
            View::Func(ar, functor, _) => ar.atom_name(functor),
            _ => Err(TermError::UnexpectedKind {
                expected: "atom, compound",
                found: term.kind_name(),
            }),
        }
    }

    /// Returns the name of an atom.
    #[inline]
    pub fn atom_name<'a>(&'a self, term: &'a Term) -> Result<&'a str, TermError> {
        self.unpack_atom(term, &[])
    }

    /// Returns the name of a compound term.
    #[inline]
    pub fn func_name<'a>(&'a self, term: &'a Term) -> Result<&'a str, TermError> {
        let (functor, _) = self.unpack_func_any(term, &[])?;
        self.atom_name(functor)
    }

    /// Returns the value if `term` is an integer, otherwise an error.
    #[inline]
    pub fn unpack_int(&self, term: &Term) -> Result<i64, TermError> {
        match self.view(term)? {
            View::Int(v) => Ok(v),
            _ => Err(TermError::UnexpectedKind {
                expected: "integer",
                found: term.kind_name(),
            }),
        }
    }

    /// Returns the value if `term` is a float, otherwise an error.
    #[inline]
    pub fn unpack_real(&self, term: &Term) -> Result<f64, TermError> {
        match self.view(term)? {
            View::Real(v) => Ok(v),
            _ => Err(TermError::UnexpectedKind {
                expected: "float",
                found: term.kind_name(),
            }),
        }
    }

    /// Returns the name if `term` is an atom, otherwise an error.  A
    /// non-empty `allowed_names` restricts which atoms are accepted.
    #[inline]
    pub fn unpack_atom<'a>(
        &'a self,
        term: &'a Term,
        allowed_names: &[&str],
    ) -> Result<&'a str, TermError> {
        match self.view(term)? {
            View::Atom(name) => {
                if !allowed_names.is_empty() && !allowed_names.contains(&name) {
                    return Err(TermError::UnexpectedName(*term));
                }
                Ok(name)
            }
            _ => Err(TermError::UnexpectedKind {
                expected: "atom",
                found: term.kind_name(),
            }),
        }
    }

    /// Returns the identity if `term` is a variable, otherwise an error.
    #[inline]
    pub fn unpack_var(&self, term: &Term) -> Result<VarId, TermError> {
        term.var_id().ok_or(TermError::UnexpectedKind {
            expected: "variable",
            found: term.kind_name(),
        })
    }

    /// Returns the functor and arguments if `term` is a compound term of
    /// any arity or an atom, and its name is in `allowed_names` (or if
    /// `allowed_names` is empty), otherwise returns an error.
    #[inline]
    pub fn unpack_func_any<'a>(
        &'a self,
        term: &'a Term,
        allowed_names: &[&str],
    ) -> Result<(&'a Term, &'a [Term]), TermError> {
        match self.view(term)? {
            View::Atom(name) => {
                if !allowed_names.is_empty() && !allowed_names.contains(&name) {
                    return Err(TermError::UnexpectedName(*term));
                }
                Ok((term, &[] as &[Term]))
            }
            View::Func(_, functor, args) => {
                if args.is_empty() {
                    return Err(TermError::InvalidTerm(*term));
                }
                if !allowed_names.is_empty() {
                    let name = self.atom_name(functor)?;
                    if !allowed_names.contains(&name) {
                        return Err(TermError::UnexpectedName(*term));
                    }
                }
                Ok((functor, args))
            }
            _ => Err(TermError::UnexpectedKind {
                expected: "compound",
                found: term.kind_name(),
            }),
        }
    }

    /// Returns the functor and arguments if `term` is a compound term of
    /// arity `ARITY` (or an atom if `ARITY == 0`) and its name is in
    /// `allowed_names` (or if `allowed_names` is empty), otherwise
    /// returns an error.
    #[inline]
    pub fn unpack_func<'a, const ARITY: usize>(
        &'a self,
        term: &'a Term,
        allowed_names: &[&str],
    ) -> Result<(&'a Term, [Term; ARITY]), TermError> {
        let (functor, args) = self.unpack_func_any(term, allowed_names)?;
        if args.len() != ARITY {
            return Err(TermError::UnexpectedArity {
                expected: ARITY,
                found: args.len(),
            });
        }
        let arr: [_; ARITY] = args.try_into().map_err(|_| TermError::InvalidTerm(*term))?;
        Ok((functor, arr))
    }

    /// Intern a long atom name, reusing the existing slice when the
    /// same name was interned before.
    #[inline]
    pub(crate) fn intern_atom(&mut self, name: &str) -> Slice {
        if let Some(slice) = self.atom_index.get(name) {
            return *slice;
        }
        let index = self.bytes.len();
        self.bytes.extend_from_slice(name.as_bytes());
        let slice = Slice {
            index: index as u32,
            len: name.len() as u32,
        };
        self.atom_index.insert(String::from(name), slice);
        slice
    }

    /// Intern a compound term slice (functor + args) into the term arena.
    #[inline]
    pub(crate) fn intern_func(
        &mut self,
        functor: Term,
        args: impl IntoIterator<Item = impl IntoTerm>,
    ) -> Slice {
        let args: Vec<Term> = args.into_iter().map(|x| x.into_term(self)).collect();
        let index = self.terms.len();
        self.terms.push(functor);
        self.terms.extend_from_slice(&args);
        Slice {
            index: index as u32,
            len: (self.terms.len() - index) as u32,
        }
    }

    /// Borrow a slice of bytes stored in the arena.  Should not be
    /// called directly by users; use [`Term::view`] instead.
    #[inline]
    pub(crate) fn byte_slice(&self, slice: &Slice) -> Option<&[u8]> {
        self.bytes
            .get((slice.index as usize)..((slice.index + slice.len) as usize))
    }

    /// Borrow a slice of terms comprising a compound term.
    #[inline]
    pub(crate) fn term_slice(&self, slice: &Slice) -> Option<&[Term]> {
        self.terms
            .get((slice.index as usize)..((slice.index + slice.len) as usize))
    }
}

impl Term {
    /// Returns the principal functor name and arity of a callable term
    /// (an atom has arity 0).
    pub fn indicator<'a>(&'a self, arena: &'a Arena) -> Result<(&'a str, usize), TermError> {
        match arena.view(self)? {
            View::Atom(name) => Ok((name, 0)),
            View::Func(ar, functor, args) => Ok((ar.atom_name(functor)?, args.len())),
            _ => Err(TermError::UnexpectedKind {
                expected: "atom, compound",
                found: self.kind_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{func, list};

    #[test]
    fn fresh_vars_are_distinct_even_when_named_alike() {
        let mut arena = Arena::new();
        let x1 = arena.fresh_var(Some("X"));
        let x2 = arena.fresh_var(Some("X"));
        assert_ne!(x1, x2);
        assert_eq!(arena.var_name(x1.var_id().unwrap()), Some("X"));
    }

    #[test]
    fn anonymous_vars_have_no_name() {
        let mut arena = Arena::new();
        let v = arena.fresh_var(None);
        assert_eq!(arena.var_name(v.var_id().unwrap()), None);
    }

    #[test]
    fn lists_are_nested_cons_cells() {
        let mut arena = Arena::new();
        let l = list![1, 2 => &mut arena];
        let (functor, [head, tail]) = arena.unpack_func::<2>(&l, &["."]).unwrap();
        assert_eq!(arena.atom_name(functor).unwrap(), ".");
        assert_eq!(arena.unpack_int(&head).unwrap(), 1);
        let (_, [head2, tail2]) = arena.unpack_func::<2>(&tail, &["."]).unwrap();
        assert_eq!(arena.unpack_int(&head2).unwrap(), 2);
        assert_eq!(tail2, Term::NIL);
    }

    #[test]
    fn empty_list_is_nil() {
        let mut arena = Arena::new();
        let l = arena.list(Vec::<Term>::new());
        assert_eq!(l, Term::NIL);
    }

    #[test]
    fn unpack_func_checks_names_and_arity() {
        let mut arena = Arena::new();
        let t = func!("f"; 1, 2 => &mut arena);
        assert!(arena.unpack_func::<2>(&t, &["f"]).is_ok());
        assert!(matches!(
            arena.unpack_func::<3>(&t, &["f"]),
            Err(TermError::UnexpectedArity {
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            arena.unpack_func::<2>(&t, &["g"]),
            Err(TermError::UnexpectedName(_))
        ));
    }

    #[test]
    fn indicator_reports_name_and_arity() {
        let mut arena = Arena::new();
        let t = func!("foo"; 1, 2, 3 => &mut arena);
        assert_eq!(t.indicator(&arena).unwrap(), ("foo", 3));
        let a = arena.atom("bar");
        assert_eq!(a.indicator(&arena).unwrap(), ("bar", 0));
    }
}
