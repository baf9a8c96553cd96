//! Two-sided structural unification over a persistent environment.
//!
//! [`unify`] extends an [`Env`] with the bindings required to make two
//! terms equal, or reports failure without touching the caller's
//! environment.  It never raises an error: a mismatch is an ordinary
//! `false`, and the partially extended environment built while the
//! attempt was underway is simply dropped with the failed branch.

use crate::{Arena, Env, Term, VarId, View};
use std::collections::HashSet;

// With the occurs check disabled, unification may tie a variable into
// the term it appears in, producing a rational (cyclic) term graph.
// Below this depth two terms are compared structurally; past it the
// pair is declared equal, which is the coinductive answer for the
// cyclic graphs that can reach it.
const MAX_DEPTH: usize = 4096;

/// Unifies `t1` and `t2` under `env`, returning the extended
/// environment and whether unification succeeded.
///
/// Both sides are resolved through the environment first.  An unbound
/// variable is bound to the other side (binding a variable to itself is
/// a no-op); atoms unify by name; numbers unify only with numerically
/// equal values of the same kind — an integer never unifies with a
/// float; compounds unify functor-wise and then argument-wise, threading
/// the environment left to right.
///
/// With `occurs_check` set, a variable is never bound to a term that
/// contains it; the attempt fails instead of building a cyclic graph.
pub fn unify(arena: &Arena, env: &Env, t1: Term, t2: Term, occurs_check: bool) -> (Env, bool) {
    unify_at(arena, env, t1, t2, occurs_check, 0)
}

fn unify_at(
    arena: &Arena,
    env: &Env,
    t1: Term,
    t2: Term,
    occurs_check: bool,
    depth: usize,
) -> (Env, bool) {
    if depth > MAX_DEPTH {
        return (env.clone(), true);
    }

    let t1 = env.resolve(t1);
    let t2 = env.resolve(t2);

    if let Some(v1) = t1.var_id() {
        if t2.var_id() == Some(v1) {
            return (env.clone(), true);
        }
        if occurs_check && occurs(arena, env, v1, t2) {
            return (env.clone(), false);
        }
        return (env.bind(v1, t2), true);
    }
    if let Some(v2) = t2.var_id() {
        if occurs_check && occurs(arena, env, v2, t1) {
            return (env.clone(), false);
        }
        return (env.bind(v2, t1), true);
    }

    let (Ok(v1), Ok(v2)) = (t1.view(arena), t2.view(arena)) else {
        return (env.clone(), false);
    };
    match (v1, v2) {
        (View::Int(a), View::Int(b)) => (env.clone(), a == b),
        (View::Real(a), View::Real(b)) => (env.clone(), a == b),
        (View::Atom(a), View::Atom(b)) => (env.clone(), a == b),
        (View::Func(_, f1, args1), View::Func(_, f2, args2)) => {
            if args1.len() != args2.len() {
                return (env.clone(), false);
            }
            match (arena.atom_name(f1), arena.atom_name(f2)) {
                (Ok(n1), Ok(n2)) if n1 == n2 => {}
                _ => return (env.clone(), false),
            }
            let mut env = env.clone();
            for (a, b) in args1.iter().zip(args2.iter()) {
                let (next, ok) = unify_at(arena, &env, *a, *b, occurs_check, depth + 1);
                if !ok {
                    return (env, false);
                }
                env = next;
            }
            (env, true)
        }
        _ => (env.clone(), false),
    }
}

/// Walks `t` under `env` checking whether variable `v` occurs in it.
/// Bound variables along the way are followed; each is visited at most
/// once, so the walk terminates even on cyclic graphs.
fn occurs(arena: &Arena, env: &Env, v: VarId, t: Term) -> bool {
    let mut visited: HashSet<VarId> = HashSet::new();
    let mut stack = vec![t];
    while let Some(t) = stack.pop() {
        if let Some(id) = t.var_id() {
            if !visited.insert(id) {
                continue;
            }
        }
        let t = env.resolve(t);
        if t.var_id() == Some(v) {
            return true;
        }
        if let Ok(View::Func(_, _, args)) = t.view(arena) {
            stack.extend_from_slice(args);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{func, list};

    #[test]
    fn atoms_unify_by_name() {
        let mut arena = Arena::new();
        let a1 = arena.atom("a");
        let a2 = arena.atom("a");
        let b = arena.atom("b");
        let env = Env::new();
        assert!(unify(&arena, &env, a1, a2, false).1);
        assert!(!unify(&arena, &env, a1, b, false).1);
    }

    #[test]
    fn numbers_do_not_coerce() {
        let arena = Arena::new();
        let env = Env::new();
        assert!(unify(&arena, &env, Term::int(1), Term::int(1), false).1);
        assert!(!unify(&arena, &env, Term::int(1), Term::real(1.0), false).1);
        assert!(!unify(&arena, &env, Term::real(1.5), Term::real(2.5), false).1);
    }

    #[test]
    fn variables_bind_and_resolve() {
        let mut arena = Arena::new();
        let x = arena.fresh_var(None);
        let a = arena.atom("a");
        let (env, ok) = unify(&arena, &Env::new(), x, a, false);
        assert!(ok);
        assert_eq!(env.resolve(x), a);
    }

    #[test]
    fn symmetry() {
        let mut arena = Arena::new();
        let x = arena.fresh_var(None);
        let t = func!("f"; x, "b" => &mut arena);
        let u = func!("f"; "a", "b" => &mut arena);
        let (e1, ok1) = unify(&arena, &Env::new(), t, u, false);
        let (e2, ok2) = unify(&arena, &Env::new(), u, t, false);
        assert_eq!(ok1, ok2);
        assert_eq!(e1.resolve(x), e2.resolve(x));
    }

    #[test]
    fn idempotence_with_occurs_check() {
        let mut arena = Arena::new();
        let x = arena.fresh_var(None);
        let t = func!("f"; x, list![1, 2] => &mut arena);
        let env = Env::new();
        let (env2, ok) = unify(&arena, &env, t, t, true);
        assert!(ok);
        assert_eq!(env2.len(), env.len());
    }

    #[test]
    fn compound_mismatch_fails() {
        let mut arena = Arena::new();
        let t = func!("f"; 1 => &mut arena);
        let u = func!("f"; 1, 2 => &mut arena);
        let v = func!("g"; 1 => &mut arena);
        let env = Env::new();
        assert!(!unify(&arena, &env, t, u, false).1);
        assert!(!unify(&arena, &env, t, v, false).1);
    }

    #[test]
    fn occurs_check_rejects_self_reference() {
        let mut arena = Arena::new();
        let x = arena.fresh_var(None);
        let t = func!("f"; x => &mut arena);
        let (_, ok) = unify(&arena, &Env::new(), x, t, true);
        assert!(!ok);
        // Without the check the binding is made.
        let (env, ok) = unify(&arena, &Env::new(), x, t, false);
        assert!(ok);
        assert!(env.lookup(x.var_id().unwrap()).is_some());
    }

    #[test]
    fn unifying_a_cyclic_pair_terminates() {
        let mut arena = Arena::new();
        let x = arena.fresh_var(None);
        let y = arena.fresh_var(None);
        let fx = func!("f"; x => &mut arena);
        let fy = func!("f"; y => &mut arena);
        let (env, _) = unify(&arena, &Env::new(), x, fx, false);
        let (env, _) = unify(&arena, &env, y, fy, false);
        // f(X) vs f(Y) where X = f(X), Y = f(Y): must not diverge.
        let (_, ok) = unify(&arena, &env, fx, fy, false);
        assert!(ok);
    }
}
