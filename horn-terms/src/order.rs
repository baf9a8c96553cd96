//! The standard order of terms, sorted sets, and term iterators.
//!
//! Ordering is environment-aware: every subterm is resolved before it
//! is ranked.  Variables order before numbers, numbers before atoms,
//! atoms before compounds.  Within numbers the comparison is numeric
//! across kinds, with a float ordering before an integer of equal value
//! so that mixed collections sort deterministically.  Within compounds
//! the order is arity first, then functor name, then arguments left to
//! right.

use crate::{Arena, Env, Term, TermError, View};
use std::cmp::Ordering;

// Comparison of cyclic graphs (possible with the occurs check off)
// bottoms out here with `Equal`, keeping every downstream sort total
// and terminating.
const MAX_DEPTH: usize = 4096;

/// Compares two terms in the standard order of terms.
pub fn compare(arena: &Arena, env: &Env, a: Term, b: Term) -> Ordering {
    compare_at(arena, env, a, b, 0)
}

fn rank(v: &View) -> u8 {
    match v {
        View::Var(_) => 0,
        View::Int(_) | View::Real(_) => 1,
        View::Atom(_) => 2,
        View::Func(_, _, _) => 3,
    }
}

fn compare_at(arena: &Arena, env: &Env, a: Term, b: Term, depth: usize) -> Ordering {
    if depth > MAX_DEPTH {
        return Ordering::Equal;
    }
    let a = env.resolve(a);
    let b = env.resolve(b);
    let (Ok(va), Ok(vb)) = (a.view(arena), b.view(arena)) else {
        return Ordering::Equal;
    };
    let (ra, rb) = (rank(&va), rank(&vb));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (va, vb) {
        (View::Var(x), View::Var(y)) => x.cmp(&y),
        (View::Int(x), View::Int(y)) => x.cmp(&y),
        (View::Real(x), View::Real(y)) => x.total_cmp(&y),
        // Mixed kinds compare as reals; on numeric equality the float
        // orders first.
        (View::Int(x), View::Real(y)) => match (x as f64).total_cmp(&y) {
            Ordering::Equal => Ordering::Greater,
            ord => ord,
        },
        (View::Real(x), View::Int(y)) => match x.total_cmp(&(y as f64)) {
            Ordering::Equal => Ordering::Less,
            ord => ord,
        },
        (View::Atom(x), View::Atom(y)) => x.cmp(y),
        (View::Func(_, fa, args_a), View::Func(_, fb, args_b)) => {
            let ord = args_a.len().cmp(&args_b.len());
            if ord != Ordering::Equal {
                return ord;
            }
            let na = arena.atom_name(fa).unwrap_or("");
            let nb = arena.atom_name(fb).unwrap_or("");
            let ord = na.cmp(nb);
            if ord != Ordering::Equal {
                return ord;
            }
            for (x, y) in args_a.iter().zip(args_b.iter()) {
                let ord = compare_at(arena, env, *x, *y, depth + 1);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

/// Sorts `ts` by the standard order, removes adjacent duplicates, and
/// returns the result as a proper list.
pub fn set(arena: &mut Arena, env: &Env, ts: &[Term]) -> Term {
    let mut us: Vec<Term> = ts.to_vec();
    us.sort_by(|a, b| compare(arena, env, *a, *b));
    us.dedup_by(|a, b| compare(arena, env, *a, *b) == Ordering::Equal);
    arena.list(us)
}

/// An iterator over the elements of a `'.'/2` list, resolving through
/// an environment as it goes.  Cycles are detected with Brent's
/// algorithm and reported as [`TermError::ImproperList`] rather than
/// looping; a variable tail yields [`TermError::UnboundTail`] unless
/// partial lists were allowed.
pub struct ListIter<'a> {
    arena: &'a Arena,
    env: &'a Env,
    allow_partial: bool,
    hare: Term,
    tortoise: Option<Term>,
    power: usize,
    lam: usize,
    done: bool,
}

impl<'a> ListIter<'a> {
    pub fn new(arena: &'a Arena, env: &'a Env, list: Term) -> Self {
        Self {
            arena,
            env,
            allow_partial: false,
            hare: env.resolve(list),
            tortoise: None,
            power: 1,
            lam: 1,
            done: false,
        }
    }

    /// A variant that stops silently at an unbound tail instead of
    /// reporting an error.
    pub fn allow_partial(mut self) -> Self {
        self.allow_partial = true;
        self
    }

    /// The unconsumed suffix of the list.
    pub fn suffix(&self) -> Term {
        self.hare
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Result<Term, TermError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(tortoise) = self.tortoise {
            if tortoise == self.hare {
                self.done = true;
                return Some(Err(TermError::ImproperList(self.hare)));
            }
        }
        if self.power == self.lam {
            self.tortoise = Some(self.hare);
            self.power *= 2;
            self.lam = 0;
        }

        match self.hare.view(self.arena) {
            Ok(View::Var(_)) => {
                self.done = true;
                if self.allow_partial {
                    None
                } else {
                    Some(Err(TermError::UnboundTail(self.hare)))
                }
            }
            Ok(View::Atom("[]")) => {
                self.done = true;
                None
            }
            Ok(View::Func(ar, functor, args)) if args.len() == 2 => {
                match ar.atom_name(functor) {
                    Ok(".") => {}
                    _ => {
                        self.done = true;
                        return Some(Err(TermError::ImproperList(self.hare)));
                    }
                }
                let head = args[0];
                self.hare = self.env.resolve(args[1]);
                self.lam += 1;
                Some(Ok(head))
            }
            _ => {
                self.done = true;
                Some(Err(TermError::ImproperList(self.hare)))
            }
        }
    }
}

/// Collects a proper list into a vector of (unresolved) element terms.
pub fn proper_list_vec(arena: &Arena, env: &Env, list: Term) -> Result<Vec<Term>, TermError> {
    ListIter::new(arena, env, list).collect()
}

/// An iterator over a binary-operator chain such as a `','/2`
/// conjunction, yielding each element; the final non-matching term is
/// yielded last.
pub struct SeqIter<'a> {
    arena: &'a Arena,
    env: &'a Env,
    sep: &'static str,
    seq: Option<Term>,
}

impl<'a> SeqIter<'a> {
    pub fn new(arena: &'a Arena, env: &'a Env, sep: &'static str, seq: Term) -> Self {
        Self {
            arena,
            env,
            sep,
            seq: Some(seq),
        }
    }
}

impl<'a> Iterator for SeqIter<'a> {
    type Item = Term;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = self.env.resolve(self.seq.take()?);
        if let Ok(View::Func(ar, functor, args)) = seq.view(self.arena) {
            if args.len() == 2 && ar.atom_name(functor) == Ok(self.sep) {
                self.seq = Some(args[1]);
                return Some(args[0]);
            }
        }
        Some(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{func, list, unify};

    #[test]
    fn kinds_rank_in_the_standard_order() {
        let mut arena = Arena::new();
        let env = Env::new();
        let v = arena.fresh_var(None);
        let n = Term::int(42);
        let a = arena.atom("zzz");
        let c = func!("a"; 1 => &mut arena);
        assert_eq!(compare(&arena, &env, v, n), Ordering::Less);
        assert_eq!(compare(&arena, &env, n, a), Ordering::Less);
        assert_eq!(compare(&arena, &env, a, c), Ordering::Less);
    }

    #[test]
    fn floats_order_before_equal_integers() {
        let arena = Arena::new();
        let env = Env::new();
        assert_eq!(
            compare(&arena, &env, Term::real(1.0), Term::int(1)),
            Ordering::Less
        );
        assert_eq!(
            compare(&arena, &env, Term::int(1), Term::real(1.0)),
            Ordering::Greater
        );
        assert_eq!(
            compare(&arena, &env, Term::int(1), Term::real(1.5)),
            Ordering::Less
        );
    }

    #[test]
    fn compounds_order_by_arity_then_name_then_args() {
        let mut arena = Arena::new();
        let env = Env::new();
        let f1 = func!("f"; 1 => &mut arena);
        let f2 = func!("f"; 1, 2 => &mut arena);
        let g1 = func!("g"; 1 => &mut arena);
        let f1b = func!("f"; 2 => &mut arena);
        assert_eq!(compare(&arena, &env, f1, f2), Ordering::Less);
        assert_eq!(compare(&arena, &env, f1, g1), Ordering::Less);
        assert_eq!(compare(&arena, &env, f1, f1b), Ordering::Less);
        assert_eq!(compare(&arena, &env, f1, f1), Ordering::Equal);
    }

    #[test]
    fn set_sorts_and_dedups() {
        let mut arena = Arena::new();
        let env = Env::new();
        let b = arena.atom("b");
        let a = arena.atom("a");
        let c = arena.atom("c");
        let s = set(&mut arena, &env, &[b, a, b, c, a]);
        let names: Vec<_> = proper_list_vec(&arena, &env, s)
            .unwrap()
            .into_iter()
            .map(|t| arena.atom_name(&t).unwrap().to_owned())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn list_iter_walks_elements_in_order() {
        let mut arena = Arena::new();
        let env = Env::new();
        let l = list![1, 2, 3 => &mut arena];
        let vals: Vec<i64> = ListIter::new(&arena, &env, l)
            .map(|t| arena.unpack_int(&t.unwrap()).unwrap())
            .collect();
        assert_eq!(vals, [1, 2, 3]);
    }

    #[test]
    fn list_iter_reports_unbound_tails() {
        let mut arena = Arena::new();
        let env = Env::new();
        let x = arena.fresh_var(None);
        let l = arena.partial_list([Term::int(1)], x);
        let items: Vec<_> = ListIter::new(&arena, &env, l).collect();
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(TermError::UnboundTail(_))));
        let partial: Vec<_> = ListIter::new(&arena, &env, l).allow_partial().collect();
        assert_eq!(partial.len(), 1);
    }

    #[test]
    fn list_iter_detects_cycles() {
        let mut arena = Arena::new();
        let x = arena.fresh_var(None);
        let cell = arena.partial_list([Term::int(1)], x);
        // X = [1|X]
        let (env, ok) = unify(&arena, &Env::new(), x, cell, false);
        assert!(ok);
        let mut saw_error = false;
        for (i, item) in ListIter::new(&arena, &env, cell).enumerate() {
            if item.is_err() {
                saw_error = true;
                break;
            }
            assert!(i < 64, "iterator failed to detect the cycle");
        }
        assert!(saw_error);
    }

    #[test]
    fn seq_iter_splits_conjunctions() {
        let mut arena = Arena::new();
        let env = Env::new();
        let a = arena.atom("a");
        let b = arena.atom("b");
        let c = arena.atom("c");
        let bc = arena.func(",", [b, c]);
        let abc = arena.func(",", [a, bc]);
        let parts: Vec<_> = SeqIter::new(&arena, &env, ",", abc)
            .map(|t| arena.atom_name(&t).unwrap().to_owned())
            .collect();
        assert_eq!(parts, ["a", "b", "c"]);
    }
}
