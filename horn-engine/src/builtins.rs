//! The standard built-in predicates.
//!
//! Everything here is a native procedure with the uniform signature
//! `fn(&mut VM, &[Term], &Env, &Cont, CutScope) -> Promise`.  Argument
//! contracts are checked against resolved terms; a violated contract
//! raises the corresponding standard error with a descriptive culprit.
//! Control constructs are transparent to cut except where the standard
//! makes them opaque (`call/N`, `catch/3`, and the condition of
//! if-then-else).

use crate::arith::{self, Number};
use crate::compiler::Pi;
use crate::error::PrologError;
use crate::parser::{ParseError, Parser};
use crate::promise::{accept, CatchNode, Cont, CutScope, Promise, Search};
use crate::vm::{Procedure, VM};
use horn_terms::{
    compare, proper_list_vec, set, unify, Env, ListIter, Specifier, Term, TermError, VarId, View,
    WriteOptions,
};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

/// Registers the whole built-in set on a VM.
pub fn register_all(vm: &mut VM) {
    // Control.
    vm.register("true", 0, bi_true);
    vm.register("fail", 0, bi_fail);
    vm.register("false", 0, bi_fail);
    vm.register("!", 0, bi_cut);
    vm.register(",", 2, bi_conjunction);
    vm.register(";", 2, bi_disjunction);
    vm.register("->", 2, bi_if_then);
    for arity in 1..=8 {
        vm.register("call", arity, bi_call);
    }
    vm.register("catch", 3, bi_catch);
    vm.register("throw", 1, bi_throw);
    vm.register("halt", 0, bi_halt);
    vm.register("halt", 1, bi_halt);

    // Type tests.
    vm.register("var", 1, bi_var);
    vm.register("nonvar", 1, bi_nonvar);
    vm.register("atom", 1, bi_atom);
    vm.register("number", 1, bi_number);
    vm.register("integer", 1, bi_integer);
    vm.register("float", 1, bi_float);
    vm.register("atomic", 1, bi_atomic);
    vm.register("compound", 1, bi_compound);
    vm.register("callable", 1, bi_callable);
    vm.register("is_list", 1, bi_is_list);
    vm.register("ground", 1, bi_ground);

    // Term construction and inspection.
    vm.register("functor", 3, bi_functor);
    vm.register("arg", 3, bi_arg);
    vm.register("=..", 2, bi_univ);
    vm.register("copy_term", 2, bi_copy_term);

    // Unification.
    vm.register("=", 2, bi_unify);
    vm.register("\\=", 2, bi_not_unifiable);
    vm.register("unify_with_occurs_check", 2, bi_unify_occurs);

    // Standard order comparison.
    vm.register("==", 2, bi_term_eq);
    vm.register("\\==", 2, bi_term_ne);
    vm.register("@<", 2, bi_term_lt);
    vm.register("@>", 2, bi_term_gt);
    vm.register("@=<", 2, bi_term_le);
    vm.register("@>=", 2, bi_term_ge);
    vm.register("compare", 3, bi_compare);

    // Arithmetic.
    vm.register("is", 2, bi_is);
    vm.register("=:=", 2, bi_num_eq);
    vm.register("=\\=", 2, bi_num_ne);
    vm.register("<", 2, bi_num_lt);
    vm.register(">", 2, bi_num_gt);
    vm.register("=<", 2, bi_num_le);
    vm.register(">=", 2, bi_num_ge);

    // Database.
    vm.register("assertz", 1, bi_assertz);
    vm.register("asserta", 1, bi_asserta);
    vm.register("retract", 1, bi_retract);
    vm.register("abolish", 1, bi_abolish);

    // Operators.
    vm.register("op", 3, bi_op);
    vm.register("current_op", 3, bi_current_op);

    // All-solutions.
    vm.register("findall", 3, bi_findall);
    vm.register("bagof", 3, bi_bagof);
    vm.register("setof", 3, bi_setof);

    // Flags.
    vm.register("set_prolog_flag", 2, bi_set_prolog_flag);
    vm.register("char_conversion", 2, bi_char_conversion);

    // I/O.
    vm.register("read_term", 2, bi_read_term);
    vm.register("write_term", 2, bi_write_term);
    vm.register("write", 1, bi_write);
    vm.register("writeq", 1, bi_writeq);
    vm.register("print", 1, bi_write);
    vm.register("nl", 0, bi_nl);
    vm.register("nl", 1, bi_nl);
    vm.register("get_char", 1, bi_get_char);
    vm.register("get_char", 2, bi_get_char);
    vm.register("put_char", 1, bi_put_char);
    vm.register("put_char", 2, bi_put_char);
}

// --- helpers -------------------------------------------------------------

fn unify_k(vm: &mut VM, env: &Env, a: Term, b: Term, k: &Cont) -> Promise {
    let (env2, ok) = unify(&vm.arena, env, a, b, false);
    if ok {
        k.call(vm, env2)
    } else {
        Promise::Fail
    }
}

/// The unbound variables of `t` under `env`, in order of first
/// occurrence.  Cycle-tolerant through the visited set.
fn free_vars(vm: &VM, env: &Env, t: Term) -> Vec<Term> {
    let mut out = Vec::new();
    let mut seen: HashSet<VarId> = HashSet::new();
    collect_free(vm, env, t, &mut seen, &mut out, 0);
    out
}

fn collect_free(
    vm: &VM,
    env: &Env,
    t: Term,
    seen: &mut HashSet<VarId>,
    out: &mut Vec<Term>,
    depth: usize,
) {
    const MAX_DEPTH: usize = 1 << 12;
    if depth > MAX_DEPTH {
        return;
    }
    let t = env.resolve(t);
    match t.view(&vm.arena) {
        Ok(View::Var(id)) => {
            if seen.insert(id) {
                out.push(t);
            }
        }
        Ok(View::Func(_, _, args)) => {
            let args = args.to_vec();
            for a in args {
                collect_free(vm, env, a, seen, out, depth + 1);
            }
        }
        _ => {}
    }
}

fn resolved_is_unbound(_vm: &VM, env: &Env, t: Term) -> bool {
    env.resolve(t).is_var()
}

// --- control -------------------------------------------------------------

fn bi_true(vm: &mut VM, _args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    k.call(vm, env.clone())
}

fn bi_fail(_vm: &mut VM, _args: &[Term], _env: &Env, _k: &Cont, _cut: CutScope) -> Promise {
    Promise::Fail
}

fn bi_cut(_vm: &mut VM, _args: &[Term], env: &Env, k: &Cont, cut: CutScope) -> Promise {
    let env = env.clone();
    let k = k.clone();
    Promise::cut(cut, Promise::delay(move |vm| k.call(vm, env)))
}

fn bi_conjunction(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, cut: CutScope) -> Promise {
    let second = args[1];
    let k2: Cont = {
        let k = k.clone();
        Cont::new(move |_vm: &mut VM, env1: Env| {
            let k = k.clone();
            Promise::delay(move |vm| vm.solve(second, &env1, &k, cut))
        })
    };
    vm.solve(args[0], env, &k2, cut)
}

fn bi_disjunction(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, cut: CutScope) -> Promise {
    let lhs = env.resolve(args[0]);
    let rhs = args[1];

    // (Cond -> Then ; Else) folds into if-then-else.
    if let Ok((_, [cond, then])) = vm.arena.unpack_func::<2>(&lhs, &["->"]) {
        return if_then_else(vm, cond, then, Some(rhs), env, k, cut);
    }

    let alternatives = vec![
        {
            let env = env.clone();
            let k = k.clone();
            Promise::delay(move |vm: &mut VM| vm.solve(lhs, &env, &k, cut))
        },
        {
            let env = env.clone();
            let k = k.clone();
            Promise::delay(move |vm: &mut VM| vm.solve(rhs, &env, &k, cut))
        },
    ];
    Promise::choice(alternatives)
}

fn bi_if_then(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, cut: CutScope) -> Promise {
    if_then_else(vm, args[0], args[1], None, env, k, cut)
}

/// `Cond -> Then ; Else`: the condition runs behind its own barrier;
/// its first solution commits, discarding both the condition's
/// remaining alternatives and the else branch.  `Then` and `Else` run
/// under the caller's cut scope.
fn if_then_else(
    vm: &mut VM,
    cond: Term,
    then: Term,
    els: Option<Term>,
    env: &Env,
    k: &Cont,
    cut: CutScope,
) -> Promise {
    let barrier = vm.new_barrier();

    let k_cond: Cont = {
        let k = k.clone();
        Cont::new(move |_vm: &mut VM, env1: Env| {
            let k = k.clone();
            Promise::cut(
                barrier,
                Promise::delay(move |vm| vm.solve(then, &env1, &k, cut)),
            )
        })
    };

    let mut alternatives = vec![{
        let env = env.clone();
        Promise::delay(move |vm: &mut VM| vm.solve(cond, &env, &k_cond, barrier))
    }];
    match els {
        Some(els) => alternatives.push({
            let env = env.clone();
            let k = k.clone();
            Promise::delay(move |vm: &mut VM| vm.solve(els, &env, &k, cut))
        }),
        None => alternatives.push(Promise::Fail),
    }

    Promise::cut_barrier(barrier, Promise::choice(alternatives))
}

fn bi_call(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let goal = match build_call_goal(vm, env, args[0], &args[1..]) {
        Ok(goal) => goal,
        Err(e) => return Promise::Error(e),
    };
    let barrier = vm.new_barrier();
    let env = env.clone();
    let k = k.clone();
    Promise::cut_barrier(
        barrier,
        Promise::delay(move |vm: &mut VM| vm.solve(goal, &env, &k, barrier)),
    )
}

fn build_call_goal(
    vm: &mut VM,
    env: &Env,
    goal: Term,
    extra: &[Term],
) -> Result<Term, PrologError> {
    let goal = env.resolve(goal);
    if extra.is_empty() {
        return Ok(goal);
    }
    enum Kind {
        Extend(smartstring::alias::String, Vec<Term>),
        Unbound,
        Bad,
    }
    let kind = match goal.view(&vm.arena) {
        Ok(View::Atom(name)) => Kind::Extend(name.into(), Vec::new()),
        Ok(View::Func(ar, functor, args)) => match ar.atom_name(functor) {
            Ok(name) => Kind::Extend(name.into(), args.to_vec()),
            Err(_) => Kind::Bad,
        },
        Ok(View::Var(_)) => Kind::Unbound,
        _ => Kind::Bad,
    };
    match kind {
        Kind::Extend(name, mut args) => {
            args.extend_from_slice(extra);
            Ok(vm.arena.func(name.as_str(), args))
        }
        Kind::Unbound => Err(PrologError::instantiation(&mut vm.arena, "call/1")),
        Kind::Bad => Err(PrologError::type_error(
            &mut vm.arena,
            "callable",
            goal,
            "call/1",
        )),
    }
}

fn bi_catch(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, cut: CutScope) -> Promise {
    let goal = args[0];
    let catcher = args[1];
    let recovery = args[2];
    let barrier = vm.new_barrier();

    let inner = {
        let env = env.clone();
        let k = k.clone();
        Promise::cut_barrier(
            barrier,
            Promise::delay(move |vm: &mut VM| vm.solve(goal, &env, &k, barrier)),
        )
    };

    Promise::catch(CatchNode {
        inner,
        catcher,
        recovery,
        env: env.clone(),
        k: k.clone(),
        cut,
    })
}

fn bi_throw(vm: &mut VM, args: &[Term], env: &Env, _k: &Cont, _cut: CutScope) -> Promise {
    let ball = env.resolve(args[0]);
    if ball.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "throw/1"));
    }
    // The ball is copied out of the throwing environment.
    let copied = vm.rename_term(ball, env);
    Promise::Error(PrologError::from_ball(&vm.arena, copied))
}

fn bi_halt(vm: &mut VM, args: &[Term], env: &Env, _k: &Cont, _cut: CutScope) -> Promise {
    let code = if args.is_empty() {
        0
    } else {
        let status = env.resolve(args[0]);
        match vm.arena.unpack_int(&status) {
            Ok(code) => code as i32,
            Err(_) => {
                return if status.is_var() {
                    Promise::Error(PrologError::instantiation(&mut vm.arena, "halt/1"))
                } else {
                    Promise::Error(PrologError::type_error(
                        &mut vm.arena,
                        "integer",
                        status,
                        "halt/1",
                    ))
                };
            }
        }
    };
    if let Some(hook) = vm.hooks.on_halt.as_mut() {
        hook(code);
    }
    Promise::Error(PrologError::Halted(code))
}

// --- type tests ----------------------------------------------------------

fn type_test(
    vm: &mut VM,
    args: &[Term],
    env: &Env,
    k: &Cont,
    pred: impl Fn(&VM, &Env, Term) -> bool,
) -> Promise {
    if pred(vm, env, args[0]) {
        k.call(vm, env.clone())
    } else {
        Promise::Fail
    }
}

fn bi_var(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |vm, env, t| resolved_is_unbound(vm, env, t))
}

fn bi_nonvar(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |vm, env, t| !resolved_is_unbound(vm, env, t))
}

fn bi_atom(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |_vm, env, t| env.resolve(t).is_atom())
}

fn bi_number(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |_vm, env, t| env.resolve(t).is_number())
}

fn bi_integer(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |vm, env, t| {
        matches!(env.resolve(t).view(&vm.arena), Ok(View::Int(_)))
    })
}

fn bi_float(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |vm, env, t| {
        matches!(env.resolve(t).view(&vm.arena), Ok(View::Real(_)))
    })
}

fn bi_atomic(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |_vm, env, t| {
        let t = env.resolve(t);
        t.is_atom() || t.is_number()
    })
}

fn bi_compound(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |_vm, env, t| env.resolve(t).is_compound())
}

fn bi_callable(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |_vm, env, t| {
        let t = env.resolve(t);
        t.is_atom() || t.is_compound()
    })
}

fn bi_is_list(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |vm, env, t| {
        ListIter::new(&vm.arena, env, t).all(|item| item.is_ok())
    })
}

fn bi_ground(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    type_test(vm, args, env, k, |vm, env, t| {
        free_vars(vm, env, t).is_empty()
    })
}

// --- term construction ---------------------------------------------------

fn bi_functor(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let t = env.resolve(args[0]);
    let name_arg = args[1];
    let arity_arg = args[2];

    if !t.is_var() {
        // Decompose.
        enum Parts {
            Whole,
            Named(smartstring::alias::String, usize),
        }
        let parts = match t.view(&vm.arena) {
            Ok(View::Func(ar, functor, fargs)) => match ar.atom_name(functor) {
                Ok(name) => Parts::Named(name.into(), fargs.len()),
                Err(_) => Parts::Whole,
            },
            _ => Parts::Whole,
        };
        let (name_term, arity) = match parts {
            Parts::Whole => (t, 0),
            Parts::Named(name, arity) => (vm.arena.atom(name.as_str()), arity),
        };
        let (env2, ok) = unify(&vm.arena, env, name_arg, name_term, false);
        if !ok {
            return Promise::Fail;
        }
        return unify_k(vm, &env2, arity_arg, Term::int(arity as i64), k);
    }

    // Construct.
    let name = env.resolve(name_arg);
    let arity = env.resolve(arity_arg);
    if name.is_var() || arity.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "functor/3"));
    }
    let arity = match vm.arena.unpack_int(&arity) {
        Ok(n) => n,
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "integer",
                arity,
                "functor/3",
            ))
        }
    };
    if arity < 0 {
        return Promise::Error(PrologError::domain_error(
            &mut vm.arena,
            "not_less_than_zero",
            arity_arg,
            "functor/3",
        ));
    }
    if arity == 0 {
        if name.is_compound() {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "atomic",
                name,
                "functor/3",
            ));
        }
        return unify_k(vm, env, t, name, k);
    }
    let functor = match vm.arena.atom_name(&name) {
        Ok(name) => smartstring::alias::String::from(name),
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "atom",
                name,
                "functor/3",
            ))
        }
    };
    let fresh: Vec<Term> = (0..arity).map(|_| vm.arena.fresh_var(None)).collect();
    let compound = vm.arena.func(functor.as_str(), fresh);
    unify_k(vm, env, t, compound, k)
}

fn bi_arg(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let n = env.resolve(args[0]);
    let t = env.resolve(args[1]);
    let out = args[2];

    if t.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "arg/3"));
    }
    let t_args: Vec<Term> = match t.view(&vm.arena) {
        Ok(View::Func(_, _, fargs)) => fargs.to_vec(),
        _ => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "compound",
                t,
                "arg/3",
            ))
        }
    };

    if n.is_var() {
        // Enumerate argument positions.
        let alternatives: Vec<Promise> = t_args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| {
                let env = env.clone();
                let k = k.clone();
                Promise::delay(move |vm: &mut VM| {
                    let (env2, ok) = unify(&vm.arena, &env, n, Term::int(i as i64 + 1), false);
                    if !ok {
                        return Promise::Fail;
                    }
                    unify_k(vm, &env2, out, arg, &k)
                })
            })
            .collect();
        return Promise::choice(alternatives);
    }

    match vm.arena.unpack_int(&n) {
        Ok(i) if i >= 1 && (i as usize) <= t_args.len() => {
            unify_k(vm, env, out, t_args[i as usize - 1], k)
        }
        Ok(_) => Promise::Fail,
        Err(_) => Promise::Error(PrologError::type_error(
            &mut vm.arena,
            "integer",
            n,
            "arg/3",
        )),
    }
}

fn bi_univ(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let t = env.resolve(args[0]);
    let list_arg = args[1];

    if !t.is_var() {
        // Decompose: atomic → [T]; compound → [Functor | Args].
        enum Parts {
            Whole,
            Compound(Term, Vec<Term>),
        }
        let parts = match t.view(&vm.arena) {
            Ok(View::Func(_, functor, fargs)) => Parts::Compound(*functor, fargs.to_vec()),
            _ => Parts::Whole,
        };
        let listed = match parts {
            Parts::Whole => vm.arena.list([t]),
            Parts::Compound(functor, fargs) => {
                let mut items = vec![functor];
                items.extend(fargs);
                vm.arena.list(items)
            }
        };
        return unify_k(vm, env, list_arg, listed, k);
    }

    // Construct from the list side.
    let items = match proper_list_vec(&vm.arena, env, list_arg) {
        Ok(items) => items,
        Err(TermError::UnboundTail(_)) => {
            return Promise::Error(PrologError::instantiation(&mut vm.arena, "=../2"))
        }
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "list",
                list_arg,
                "=../2",
            ))
        }
    };
    let Some((&first, rest)) = items.split_first() else {
        return Promise::Error(PrologError::domain_error(
            &mut vm.arena,
            "non_empty_list",
            list_arg,
            "=../2",
        ));
    };
    let first = env.resolve(first);
    if first.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "=../2"));
    }
    if rest.is_empty() {
        if first.is_compound() {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "atomic",
                first,
                "=../2",
            ));
        }
        return unify_k(vm, env, t, first, k);
    }
    let name = match vm.arena.atom_name(&first) {
        Ok(name) => smartstring::alias::String::from(name),
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "atom",
                first,
                "=../2",
            ))
        }
    };
    let rest = rest.to_vec();
    let compound = vm.arena.func(name.as_str(), rest);
    unify_k(vm, env, t, compound, k)
}

fn bi_copy_term(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let copy = vm.rename_term(args[0], env);
    unify_k(vm, env, args[1], copy, k)
}

// --- unification ---------------------------------------------------------

fn bi_unify(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let occurs = vm.flags.occurs_check;
    let (env2, ok) = unify(&vm.arena, env, args[0], args[1], occurs);
    if ok {
        k.call(vm, env2)
    } else {
        Promise::Fail
    }
}

fn bi_unify_occurs(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let (env2, ok) = unify(&vm.arena, env, args[0], args[1], true);
    if ok {
        k.call(vm, env2)
    } else {
        Promise::Fail
    }
}

fn bi_not_unifiable(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let (_, ok) = unify(&vm.arena, env, args[0], args[1], vm.flags.occurs_check);
    if ok {
        Promise::Fail
    } else {
        k.call(vm, env.clone())
    }
}

// --- standard order ------------------------------------------------------

fn order_test(
    vm: &mut VM,
    args: &[Term],
    env: &Env,
    k: &Cont,
    accept_ordering: impl Fn(Ordering) -> bool,
) -> Promise {
    let ord = compare(&vm.arena, env, args[0], args[1]);
    if accept_ordering(ord) {
        k.call(vm, env.clone())
    } else {
        Promise::Fail
    }
}

fn bi_term_eq(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    order_test(vm, args, env, k, |o| o == Ordering::Equal)
}

fn bi_term_ne(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    order_test(vm, args, env, k, |o| o != Ordering::Equal)
}

fn bi_term_lt(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    order_test(vm, args, env, k, |o| o == Ordering::Less)
}

fn bi_term_gt(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    order_test(vm, args, env, k, |o| o == Ordering::Greater)
}

fn bi_term_le(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    order_test(vm, args, env, k, |o| o != Ordering::Greater)
}

fn bi_term_ge(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    order_test(vm, args, env, k, |o| o != Ordering::Less)
}

fn bi_compare(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let ord = compare(&vm.arena, env, args[1], args[2]);
    let symbol = vm.arena.atom(match ord {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    });
    unify_k(vm, env, args[0], symbol, k)
}

// --- arithmetic ----------------------------------------------------------

fn bi_is(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    match arith::eval(&mut vm.arena, env, args[1]) {
        Ok(n) => unify_k(vm, env, args[0], n.into_term(), k),
        Err(e) => Promise::Error(e),
    }
}

fn num_test(
    vm: &mut VM,
    args: &[Term],
    env: &Env,
    k: &Cont,
    accept_ordering: impl Fn(Ordering) -> bool,
) -> Promise {
    let a = match arith::eval(&mut vm.arena, env, args[0]) {
        Ok(n) => n,
        Err(e) => return Promise::Error(e),
    };
    let b = match arith::eval(&mut vm.arena, env, args[1]) {
        Ok(n) => n,
        Err(e) => return Promise::Error(e),
    };
    if accept_ordering(Number::compare(a, b)) {
        k.call(vm, env.clone())
    } else {
        Promise::Fail
    }
}

fn bi_num_eq(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    num_test(vm, args, env, k, |o| o == Ordering::Equal)
}

fn bi_num_ne(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    num_test(vm, args, env, k, |o| o != Ordering::Equal)
}

fn bi_num_lt(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    num_test(vm, args, env, k, |o| o == Ordering::Less)
}

fn bi_num_gt(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    num_test(vm, args, env, k, |o| o == Ordering::Greater)
}

fn bi_num_le(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    num_test(vm, args, env, k, |o| o != Ordering::Greater)
}

fn bi_num_ge(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    num_test(vm, args, env, k, |o| o != Ordering::Less)
}

// --- database ------------------------------------------------------------

fn assert_impl(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, front: bool) -> Promise {
    let term = env.resolve(args[0]);

    // Asserting a directive executes it instead of storing it.
    if let Ok((_, [goal])) = vm.arena.unpack_func::<1>(&term, &[":-"]) {
        let barrier = vm.new_barrier();
        let env = env.clone();
        let k = k.clone();
        return Promise::cut_barrier(
            barrier,
            Promise::delay(move |vm: &mut VM| vm.solve(goal, &env, &k, barrier)),
        );
    }

    match vm.assert_clause(term, env, front) {
        Ok(()) => k.call(vm, env.clone()),
        Err(e) => Promise::Error(e),
    }
}

fn bi_assertz(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    assert_impl(vm, args, env, k, false)
}

fn bi_asserta(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    assert_impl(vm, args, env, k, true)
}

fn bi_retract(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let whole = env.resolve(args[0]);
    if whole.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "retract/1"));
    }

    // Split into head and body; a bare head means body `true`.
    let (head, body) = match vm.arena.unpack_func::<2>(&whole, &[":-"]) {
        Ok((_, [h, b])) => (h, b),
        Err(_) => {
            let t = vm.arena.atom("true");
            (whole, t)
        }
    };
    let pi = match crate::compiler::callable_pi(&mut vm.arena, env.resolve(head), "retract/1") {
        Ok(pi) => pi,
        Err(e) => return Promise::Error(e),
    };

    let clauses = match vm.procedures.get(&pi) {
        Some(Procedure::Clauses(cs)) => cs.clone(),
        Some(Procedure::Native { .. }) => {
            let culprit = pi.to_term(&mut vm.arena);
            return Promise::Error(PrologError::permission_error(
                &mut vm.arena,
                "modify",
                "static_procedure",
                culprit,
                "retract/1",
            ));
        }
        None => return Promise::Fail,
    };

    let alternatives: Vec<Promise> = clauses
        .into_iter()
        .map(|clause| {
            let env = env.clone();
            let k = k.clone();
            let pi = pi.clone();
            Promise::delay(move |vm: &mut VM| {
                let fresh = vm.rename_term(clause.raw, &Env::new());
                let (chead, cbody) = match vm.arena.unpack_func::<2>(&fresh, &[":-"]) {
                    Ok((_, [h, b])) => (h, b),
                    Err(_) => {
                        let t = vm.arena.atom("true");
                        (fresh, t)
                    }
                };
                let (env2, ok) = unify(&vm.arena, &env, head, chead, false);
                if !ok {
                    return Promise::Fail;
                }
                let (env3, ok) = unify(&vm.arena, &env2, body, cbody, false);
                if !ok {
                    return Promise::Fail;
                }
                // Remove exactly this clause, if it is still present.
                if let Some(Procedure::Clauses(cs)) = vm.procedures.get_mut(&pi) {
                    cs.retain(|c| !Rc::ptr_eq(c, &clause));
                }
                k.call(vm, env3)
            })
        })
        .collect();
    Promise::choice(alternatives)
}

fn bi_abolish(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let spec = env.resolve(args[0]);
    if spec.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "abolish/1"));
    }
    let (name, arity) = match vm.arena.unpack_func::<2>(&spec, &["/"]) {
        Ok((_, [name, arity])) => (env.resolve(name), env.resolve(arity)),
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "predicate_indicator",
                spec,
                "abolish/1",
            ))
        }
    };
    if name.is_var() || arity.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "abolish/1"));
    }
    let arity = match vm.arena.unpack_int(&arity) {
        Ok(n) if n >= 0 => n as usize,
        Ok(_) => {
            return Promise::Error(PrologError::domain_error(
                &mut vm.arena,
                "not_less_than_zero",
                arity,
                "abolish/1",
            ))
        }
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "integer",
                arity,
                "abolish/1",
            ))
        }
    };
    let pi = match vm.arena.atom_name(&name) {
        Ok(n) => Pi::new(n, arity),
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "atom",
                name,
                "abolish/1",
            ))
        }
    };
    if vm.is_native(&pi) {
        let culprit = pi.to_term(&mut vm.arena);
        return Promise::Error(PrologError::permission_error(
            &mut vm.arena,
            "modify",
            "static_procedure",
            culprit,
            "abolish/1",
        ));
    }
    vm.procedures.shift_remove(&pi);
    k.call(vm, env.clone())
}

// --- operators -----------------------------------------------------------

fn bi_op(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let priority = env.resolve(args[0]);
    let specifier = env.resolve(args[1]);
    let names = env.resolve(args[2]);

    if priority.is_var() || specifier.is_var() || names.is_var() {
        return Promise::Error(PrologError::instantiation(&mut vm.arena, "op/3"));
    }
    let priority = match vm.arena.unpack_int(&priority) {
        Ok(p) if (0..=1200).contains(&p) => p as u16,
        Ok(_) => {
            return Promise::Error(PrologError::domain_error(
                &mut vm.arena,
                "operator_priority",
                priority,
                "op/3",
            ))
        }
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "integer",
                priority,
                "op/3",
            ))
        }
    };
    let specifier: Specifier = {
        let parsed = vm
            .arena
            .atom_name(&specifier)
            .ok()
            .and_then(|s| s.parse().ok());
        match parsed {
            Some(s) => s,
            None => {
                return Promise::Error(PrologError::domain_error(
                    &mut vm.arena,
                    "operator_specifier",
                    specifier,
                    "op/3",
                ))
            }
        }
    };

    let name_terms: Vec<Term> = if names.is_atom() {
        vec![names]
    } else {
        match proper_list_vec(&vm.arena, env, names) {
            Ok(items) => items,
            Err(_) => {
                return Promise::Error(PrologError::type_error(
                    &mut vm.arena,
                    "list",
                    names,
                    "op/3",
                ))
            }
        }
    };

    for name_term in name_terms {
        let name_term = env.resolve(name_term);
        let name = match vm.arena.atom_name(&name_term) {
            Ok(n) => smartstring::alias::String::from(n),
            Err(_) => {
                return Promise::Error(PrologError::type_error(
                    &mut vm.arena,
                    "atom",
                    name_term,
                    "op/3",
                ))
            }
        };
        if name == "," {
            return Promise::Error(PrologError::permission_error(
                &mut vm.arena,
                "modify",
                "operator",
                name_term,
                "op/3",
            ));
        }
        if let Err(e) = vm.operators.define(priority, specifier, name.as_str()) {
            let detail = format!("{e}");
            return Promise::Error(PrologError::system_error(&mut vm.arena, &detail));
        }
    }
    k.call(vm, env.clone())
}

fn bi_current_op(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let snapshot: Vec<(u16, Specifier, smartstring::alias::String)> = vm
        .operators
        .iter()
        .map(|op| (op.priority, op.specifier, op.name.clone()))
        .collect();

    let (p_arg, s_arg, n_arg) = (args[0], args[1], args[2]);
    let alternatives: Vec<Promise> = snapshot
        .into_iter()
        .map(|(priority, specifier, name)| {
            let env = env.clone();
            let k = k.clone();
            Promise::delay(move |vm: &mut VM| {
                let (env2, ok) =
                    unify(&vm.arena, &env, p_arg, Term::int(priority as i64), false);
                if !ok {
                    return Promise::Fail;
                }
                let spec = vm.arena.atom(Specifier::STRS[usize::from(specifier)]);
                let (env3, ok) = unify(&vm.arena, &env2, s_arg, spec, false);
                if !ok {
                    return Promise::Fail;
                }
                let name = vm.arena.atom(name.as_str());
                unify_k(vm, &env3, n_arg, name, &k)
            })
        })
        .collect();
    Promise::choice(alternatives)
}

// --- all-solutions -------------------------------------------------------

/// Drives `goal` to exhaustion in a nested search, calling `collect`
/// with the environment of each solution.
fn drive_all(
    vm: &mut VM,
    goal: Term,
    env: &Env,
    mut collect: impl FnMut(&mut VM, &Env),
) -> Result<(), PrologError> {
    let barrier = vm.new_barrier();
    let k0 = accept();
    let root = {
        let env = env.clone();
        Promise::cut_barrier(
            barrier,
            Promise::delay(move |vm: &mut VM| vm.solve(goal, &env, &k0, barrier)),
        )
    };
    let mut search = Search::new(root);
    loop {
        match search.next(vm)? {
            Some(solution_env) => collect(vm, &solution_env),
            None => return Ok(()),
        }
    }
}

fn bi_findall(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let template = args[0];
    let goal = args[1];
    let out = args[2];

    let mut results: Vec<Term> = Vec::new();
    let outcome = drive_all(vm, goal, env, |vm, solution_env| {
        results.push(vm.rename_term(template, solution_env));
    });
    if let Err(e) = outcome {
        return Promise::Error(e);
    }
    let listed = vm.arena.list(results);
    unify_k(vm, env, out, listed, k)
}

fn bag_or_set(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, sorted: bool) -> Promise {
    let template = args[0];
    let out = args[2];

    // Strip `Var ^ Goal` existential quantifiers.
    let mut goal = env.resolve(args[1]);
    let mut quantified: Vec<Term> = Vec::new();
    loop {
        match vm.arena.unpack_func::<2>(&goal, &["^"]) {
            Ok((_, [qv, inner])) => {
                quantified.extend(free_vars(vm, env, qv));
                goal = env.resolve(inner);
            }
            Err(_) => break,
        }
    }

    // Witness: free variables of the goal not in the template and not
    // existentially quantified.
    let excluded: HashSet<VarId> = free_vars(vm, env, template)
        .into_iter()
        .chain(quantified)
        .filter_map(|t| t.var_id())
        .collect();
    let witness: Vec<Term> = free_vars(vm, env, goal)
        .into_iter()
        .filter(|t| t.var_id().map(|id| !excluded.contains(&id)).unwrap_or(true))
        .collect();
    let witness_list = vm.arena.list(witness);
    let pair_template = vm.arena.func("-", [witness_list, template]);

    let mut pairs: Vec<Term> = Vec::new();
    let outcome = drive_all(vm, goal, env, |vm, solution_env| {
        pairs.push(vm.rename_term(pair_template, solution_env));
    });
    if let Err(e) = outcome {
        return Promise::Error(e);
    }
    if pairs.is_empty() {
        return Promise::Fail;
    }

    // Group by witness value, preserving first-solution order.
    let scratch = Env::new();
    let mut groups: Vec<(Term, Vec<Term>)> = Vec::new();
    for pair in pairs {
        let Ok((_, [w, t])) = vm.arena.unpack_func::<2>(&pair, &["-"]) else {
            continue;
        };
        match groups
            .iter_mut()
            .find(|(gw, _)| compare(&vm.arena, &scratch, *gw, w) == Ordering::Equal)
        {
            Some((_, members)) => members.push(t),
            None => groups.push((w, vec![t])),
        }
    }

    let alternatives: Vec<Promise> = groups
        .into_iter()
        .map(|(group_witness, members)| {
            let env = env.clone();
            let k = k.clone();
            Promise::delay(move |vm: &mut VM| {
                let (env2, ok) =
                    unify(&vm.arena, &env, witness_list, group_witness, false);
                if !ok {
                    return Promise::Fail;
                }
                let scratch = Env::new();
                let collected = if sorted {
                    set(&mut vm.arena, &scratch, &members)
                } else {
                    vm.arena.list(members)
                };
                unify_k(vm, &env2, out, collected, &k)
            })
        })
        .collect();
    Promise::choice(alternatives)
}

fn bi_bagof(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    bag_or_set(vm, args, env, k, false)
}

fn bi_setof(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    bag_or_set(vm, args, env, k, true)
}

// --- flags ---------------------------------------------------------------

fn bi_set_prolog_flag(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let flag = env.resolve(args[0]);
    let value = env.resolve(args[1]);
    if flag.is_var() || value.is_var() {
        return Promise::Error(PrologError::instantiation(
            &mut vm.arena,
            "set_prolog_flag/2",
        ));
    }
    enum Setting {
        Unknown(crate::vm::Unknown),
        DoubleQuotes(crate::vm::DoubleQuotes),
        OccursCheck(bool),
        CharConversion(bool),
        Debug(bool),
        BadFlag,
        BadValue,
    }
    fn truthy(value: &str) -> Option<bool> {
        match value {
            "true" | "on" => Some(true),
            "false" | "off" => Some(false),
            _ => None,
        }
    }
    let setting = {
        let flag_name = vm.arena.atom_name(&flag).unwrap_or("");
        let value_name = vm.arena.atom_name(&value).unwrap_or("");
        match flag_name {
            "unknown" => match value_name.parse() {
                Ok(u) => Setting::Unknown(u),
                Err(_) => Setting::BadValue,
            },
            "double_quotes" => match value_name.parse() {
                Ok(d) => Setting::DoubleQuotes(d),
                Err(_) => Setting::BadValue,
            },
            "occurs_check" => match truthy(value_name) {
                Some(b) => Setting::OccursCheck(b),
                None => Setting::BadValue,
            },
            "char_conversion" => match truthy(value_name) {
                Some(b) => Setting::CharConversion(b),
                None => Setting::BadValue,
            },
            "debug" => match truthy(value_name) {
                Some(b) => Setting::Debug(b),
                None => Setting::BadValue,
            },
            _ => Setting::BadFlag,
        }
    };
    match setting {
        Setting::Unknown(u) => vm.flags.unknown = u,
        Setting::DoubleQuotes(d) => vm.flags.double_quotes = d,
        Setting::OccursCheck(b) => vm.flags.occurs_check = b,
        Setting::CharConversion(b) => vm.flags.char_conversion = b,
        Setting::Debug(b) => vm.flags.debug = b,
        Setting::BadFlag => {
            return Promise::Error(PrologError::domain_error(
                &mut vm.arena,
                "prolog_flag",
                flag,
                "set_prolog_flag/2",
            ))
        }
        Setting::BadValue => {
            return Promise::Error(PrologError::domain_error(
                &mut vm.arena,
                "flag_value",
                value,
                "set_prolog_flag/2",
            ))
        }
    }
    k.call(vm, env.clone())
}

fn bi_char_conversion(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let from = env.resolve(args[0]);
    let to = env.resolve(args[1]);
    let from_char = single_char(vm, &from);
    let to_char = single_char(vm, &to);
    let (Some(from), Some(to)) = (from_char, to_char) else {
        let bad = if from_char.is_none() { from } else { to };
        return Promise::Error(PrologError::type_error(
            &mut vm.arena,
            "character",
            bad,
            "char_conversion/2",
        ));
    };
    if from == to {
        vm.flags.char_conversions.remove(&from);
    } else {
        vm.flags.char_conversions.insert(from, to);
    }
    k.call(vm, env.clone())
}

fn single_char(vm: &VM, t: &Term) -> Option<char> {
    let name = vm.arena.atom_name(t).ok()?;
    let mut chars = name.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

// --- I/O -----------------------------------------------------------------

fn stream_existence(vm: &mut VM, alias: &str, context: &str) -> Promise {
    let culprit = vm.arena.atom(alias);
    Promise::Error(PrologError::existence_error(
        &mut vm.arena,
        "stream",
        culprit,
        context,
    ))
}

fn write_to_output(vm: &mut VM, alias: Option<&str>, text: &str, context: &str) -> Option<Promise> {
    let stream = match alias {
        Some(alias) => vm.streams.get_mut(alias),
        None => vm.streams.output_mut(),
    };
    let Some(stream) = stream else {
        let alias = alias.unwrap_or("user_output").to_owned();
        return Some(stream_existence(vm, &alias, context));
    };
    match stream.write_str(text).and_then(|()| stream.flush()) {
        Ok(()) => None,
        Err(e) => {
            let detail = format!("{e}");
            Some(Promise::Error(PrologError::system_error(
                &mut vm.arena,
                &detail,
            )))
        }
    }
}

/// Renders `term` under the write options encoded in an options list:
/// `quoted(Bool)`, `ignore_ops(Bool)`, `numbervars(Bool)`,
/// `max_depth(N)`.
fn render_with_options(
    vm: &mut VM,
    env: &Env,
    term: Term,
    options: Option<Term>,
) -> Result<String, PrologError> {
    let mut quoted = false;
    let mut ignore_ops = false;
    let mut number_vars = true;
    let mut max_depth = 0usize;

    if let Some(options) = options {
        let items = match proper_list_vec(&vm.arena, env, options) {
            Ok(items) => items,
            Err(_) => {
                return Err(PrologError::type_error(
                    &mut vm.arena,
                    "list",
                    options,
                    "write_term/2",
                ))
            }
        };
        for item in items {
            let item = env.resolve(item);
            enum Opt {
                Flag(smartstring::alias::String, bool),
                Depth(usize),
                Bad,
            }
            let opt = match vm.arena.unpack_func::<1>(&item, &[]) {
                Ok((functor, [value])) => {
                    let name = vm.arena.atom_name(functor).unwrap_or("");
                    let value = env.resolve(value);
                    match (name, vm.arena.atom_name(&value), vm.arena.unpack_int(&value)) {
                        ("max_depth", _, Ok(n)) if n >= 0 => Opt::Depth(n as usize),
                        (_, Ok("true"), _) => Opt::Flag(name.into(), true),
                        (_, Ok("false"), _) => Opt::Flag(name.into(), false),
                        _ => Opt::Bad,
                    }
                }
                Err(_) => Opt::Bad,
            };
            match opt {
                Opt::Flag(name, value) => match name.as_str() {
                    "quoted" => quoted = value,
                    "ignore_ops" => ignore_ops = value,
                    "numbervars" => number_vars = value,
                    _ => {
                        return Err(PrologError::domain_error(
                            &mut vm.arena,
                            "write_option",
                            item,
                            "write_term/2",
                        ))
                    }
                },
                Opt::Depth(n) => max_depth = n,
                Opt::Bad => {
                    return Err(PrologError::domain_error(
                        &mut vm.arena,
                        "write_option",
                        item,
                        "write_term/2",
                    ))
                }
            }
        }
    }

    let opts = WriteOptions {
        quoted,
        ignore_ops,
        number_vars,
        max_depth,
        ops: Some(&vm.operators),
        ..Default::default()
    };
    Ok(format!("{}", term.display_with(&vm.arena, env, opts)))
}

fn bi_write_term(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let text = match render_with_options(vm, env, args[0], Some(args[1])) {
        Ok(text) => text,
        Err(e) => return Promise::Error(e),
    };
    if let Some(err) = write_to_output(vm, None, &text, "write_term/2") {
        return err;
    }
    k.call(vm, env.clone())
}

fn bi_write(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let text = match render_with_options(vm, env, args[0], None) {
        Ok(text) => text,
        Err(e) => return Promise::Error(e),
    };
    if let Some(err) = write_to_output(vm, None, &text, "write/1") {
        return err;
    }
    k.call(vm, env.clone())
}

fn bi_writeq(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let opts = WriteOptions {
        quoted: true,
        number_vars: true,
        ops: Some(&vm.operators),
        ..Default::default()
    };
    let text = format!("{}", args[0].display_with(&vm.arena, env, opts));
    if let Some(err) = write_to_output(vm, None, &text, "writeq/1") {
        return err;
    }
    k.call(vm, env.clone())
}

fn bi_nl(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let alias = match args.first() {
        Some(alias_term) => {
            let alias_term = env.resolve(*alias_term);
            match vm.arena.atom_name(&alias_term) {
                Ok(a) => Some(smartstring::alias::String::from(a)),
                Err(_) => {
                    return Promise::Error(PrologError::type_error(
                        &mut vm.arena,
                        "atom",
                        alias_term,
                        "nl/1",
                    ))
                }
            }
        }
        None => None,
    };
    if let Some(err) = write_to_output(vm, alias.as_deref(), "\n", "nl/0") {
        return err;
    }
    k.call(vm, env.clone())
}

fn bi_put_char(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let (alias, char_arg) = if args.len() == 2 {
        let alias_term = env.resolve(args[0]);
        match vm.arena.atom_name(&alias_term) {
            Ok(a) => (Some(smartstring::alias::String::from(a)), args[1]),
            Err(_) => {
                return Promise::Error(PrologError::type_error(
                    &mut vm.arena,
                    "atom",
                    alias_term,
                    "put_char/2",
                ))
            }
        }
    } else {
        (None, args[0])
    };
    let ch = env.resolve(char_arg);
    let Some(c) = single_char(vm, &ch) else {
        return if ch.is_var() {
            Promise::Error(PrologError::instantiation(&mut vm.arena, "put_char/1"))
        } else {
            Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "character",
                ch,
                "put_char/1",
            ))
        };
    };
    if let Some(err) = write_to_output(vm, alias.as_deref(), &c.to_string(), "put_char/1") {
        return err;
    }
    k.call(vm, env.clone())
}

fn bi_get_char(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let (alias, out) = if args.len() == 2 {
        let alias_term = env.resolve(args[0]);
        match vm.arena.atom_name(&alias_term) {
            Ok(a) => (Some(smartstring::alias::String::from(a)), args[1]),
            Err(_) => {
                return Promise::Error(PrologError::type_error(
                    &mut vm.arena,
                    "atom",
                    alias_term,
                    "get_char/2",
                ))
            }
        }
    } else {
        (None, args[0])
    };
    let stream = match alias.as_deref() {
        Some(a) => vm.streams.get_mut(a),
        None => vm.streams.input_mut(),
    };
    let Some(stream) = stream else {
        let a = alias.as_deref().unwrap_or("user_input").to_owned();
        return stream_existence(vm, &a, "get_char/1");
    };
    let read = stream.read_char();
    let result = match read {
        Ok(Some(c)) => vm.arena.atom(c.to_string()),
        Ok(None) => vm.arena.atom("end_of_file"),
        Err(e) => {
            let detail = format!("{e}");
            return Promise::Error(PrologError::system_error(&mut vm.arena, &detail));
        }
    };
    unify_k(vm, env, out, result, k)
}

fn bi_read_term(vm: &mut VM, args: &[Term], env: &Env, k: &Cont, _cut: CutScope) -> Promise {
    let out = args[0];
    let options = args[1];

    // Accumulate source text a line at a time until a clause parses.
    let mut text = match vm.streams.input_mut() {
        Some(stream) => std::mem::take(&mut stream.pending),
        None => return stream_existence(vm, "user_input", "read_term/2"),
    };

    loop {
        let ops = vm.operators.clone();
        let double_quotes = vm.flags.double_quotes;
        let conversions = if vm.flags.char_conversion {
            Some(vm.flags.char_conversions.clone())
        } else {
            None
        };
        let parsed = {
            let mut parser = Parser::new(
                &text,
                &mut vm.arena,
                &ops,
                double_quotes,
                conversions.as_ref(),
            );
            match parser.next_term() {
                Ok(Some(term)) => {
                    let names: Vec<(smartstring::alias::String, Term)> = parser
                        .variables()
                        .iter()
                        .map(|pv| (pv.name.clone(), pv.variable))
                        .collect();
                    Ok(Some((term, parser.offset(), names)))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        };

        match parsed {
            Ok(Some((term, offset, names))) => {
                if let Some(stream) = vm.streams.input_mut() {
                    stream.pending = text[offset..].to_owned();
                }
                return finish_read(vm, env, term, &names, out, options, k);
            }
            // No clause yet: either nothing but layout so far, or a
            // clause truncated mid-way.  Ask the source for another
            // line before deciding.
            outcome @ (Ok(None) | Err(ParseError::Insufficient)) => {
                let exhausted_cleanly = outcome.is_ok();
                let Some(stream) = vm.streams.input_mut() else {
                    return stream_existence(vm, "user_input", "read_term/2");
                };
                match stream.fill_line() {
                    Ok(0) => {
                        if exhausted_cleanly {
                            let eof = vm.arena.atom("end_of_file");
                            return unify_k(vm, env, out, eof, k);
                        }
                        return Promise::Error(PrologError::syntax_error(
                            &mut vm.arena,
                            "unexpected_end_of_input",
                            "read_term/2",
                        ));
                    }
                    Ok(_) => {
                        text.push_str(&std::mem::take(&mut stream.pending));
                    }
                    Err(e) => {
                        let detail = format!("{e}");
                        return Promise::Error(PrologError::system_error(&mut vm.arena, &detail));
                    }
                }
            }
            Err(e) => {
                let detail = format!("{e}");
                return Promise::Error(PrologError::syntax_error(
                    &mut vm.arena,
                    &detail,
                    "read_term/2",
                ));
            }
        }
    }
}

/// Unifies the read result and honours `variable_names(Pairs)` among
/// the read options.
fn finish_read(
    vm: &mut VM,
    env: &Env,
    term: Term,
    names: &[(smartstring::alias::String, Term)],
    out: Term,
    options: Term,
    k: &Cont,
) -> Promise {
    let mut env2 = match unify(&vm.arena, env, out, term, false) {
        (env2, true) => env2,
        (_, false) => return Promise::Fail,
    };

    let items = match proper_list_vec(&vm.arena, &env2, options) {
        Ok(items) => items,
        Err(_) => {
            return Promise::Error(PrologError::type_error(
                &mut vm.arena,
                "list",
                options,
                "read_term/2",
            ))
        }
    };
    for item in items {
        let item = env2.resolve(item);
        if let Ok((_, [pairs_out])) = vm.arena.unpack_func::<1>(&item, &["variable_names"]) {
            let pairs: Vec<Term> = names
                .iter()
                .map(|(name, var)| {
                    let name_atom = vm.arena.atom(name.as_str());
                    vm.arena.func("=", [name_atom, *var])
                })
                .collect();
            let listed = vm.arena.list(pairs);
            match unify(&vm.arena, &env2, pairs_out, listed, false) {
                (env3, true) => env2 = env3,
                (_, false) => return Promise::Fail,
            }
        }
    }
    k.call(vm, env2)
}
