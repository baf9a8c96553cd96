//! The virtual machine: procedure table, flags, hooks, and the
//! bytecode interpreter.
//!
//! A goal arrives as a principal functor plus argument terms.  User
//! procedures are ordered clause lists: each activation allocates a
//! fresh variable frame, matches the head against the call arguments
//! by running the clause bytecode, and on reaching `exit` hands the
//! extended environment to the continuation.  The clause list as a
//! whole sits behind a labelled cut barrier; a `!` compiled into any
//! body names that barrier, so it commits to its clause and discards
//! the ones below it no matter how many calls succeeded in between.
//! Native procedures are dispatched with the raw argument terms, the
//! continuation, and the cut scope of the call site — the transparent
//! control constructs (`,`, `;`, `->`) pass it on, the opaque ones
//! (`call/1`, `catch/3`) mint a fresh one.
//!
//! The bytecode interpreter threads its argument cursor and argument
//! stack as logical list terms and advances by unification, so the
//! same instructions that match a head against bound arguments build
//! argument lists for body goals against unbound ones.

use crate::builtins;
use crate::compiler::{callable_pi, compile_clause, Clause, OpCode, Pi, Symbol};
use crate::error::PrologError;
use crate::promise::{Cont, CutScope, Promise};
use crate::stream::StreamTable;
use horn_terms::{proper_list_vec, unify, Arena, Env, OperatorTable, Term, VarId, View};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// A native predicate: receives the call arguments (unresolved), the
/// current environment, the success continuation, and the cut scope of
/// the call site.
pub type NativeFn = Rc<dyn Fn(&mut VM, &[Term], &Env, &Cont, CutScope) -> Promise>;

/// A procedure: an ordered, extendable vector of user clauses, or an
/// opaque native handler of fixed arity.
pub enum Procedure {
    Clauses(Vec<Rc<Clause>>),
    Native { f: NativeFn },
}

/// What to do when a called procedure does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unknown {
    /// Raise an existence error (the default).
    Error,
    /// Fail silently.
    Fail,
    /// Log a warning, then fail.
    Warning,
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unknown::Error => "error",
            Unknown::Fail => "fail",
            Unknown::Warning => "warning",
        })
    }
}

impl FromStr for Unknown {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "error" => Ok(Unknown::Error),
            "fail" => Ok(Unknown::Fail),
            "warning" => Ok(Unknown::Warning),
            _ => Err(()),
        }
    }
}

/// How a double-quoted literal expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleQuotes {
    /// A list of one-character atoms.
    Chars,
    /// A list of character codes.
    Codes,
    /// A single atom.
    Atom,
}

impl fmt::Display for DoubleQuotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DoubleQuotes::Chars => "chars",
            DoubleQuotes::Codes => "codes",
            DoubleQuotes::Atom => "atom",
        })
    }
}

impl FromStr for DoubleQuotes {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "chars" => Ok(DoubleQuotes::Chars),
            "codes" => Ok(DoubleQuotes::Codes),
            "atom" => Ok(DoubleQuotes::Atom),
            _ => Err(()),
        }
    }
}

/// Process-global interpreter flags.
#[derive(Debug, Clone)]
pub struct Flags {
    pub unknown: Unknown,
    pub double_quotes: DoubleQuotes,
    /// The default occurs-check mode for `=/2`.
    pub occurs_check: bool,
    pub char_conversion: bool,
    pub char_conversions: HashMap<char, char>,
    pub debug: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            unknown: Unknown::Error,
            double_quotes: DoubleQuotes::Codes,
            occurs_check: false,
            char_conversion: false,
            char_conversions: HashMap::new(),
            debug: false,
        }
    }
}

/// Coarse lifecycle hooks.  Hooks observe; they never mutate the
/// environment.
#[derive(Default)]
pub struct Hooks {
    /// Execution reached a procedure, with its resolved call args.
    pub on_arrive: Option<Box<dyn FnMut(&Pi, &[Term])>>,
    /// The first clause of a procedure is about to be tried.
    pub on_call: Option<Box<dyn FnMut(&Pi, &[Term])>>,
    /// A later clause is being tried after backtracking.
    pub on_redo: Option<Box<dyn FnMut(&Pi, &[Term])>>,
    /// A clause body completed.
    pub on_exit: Option<Box<dyn FnMut(&Pi)>>,
    /// A clause head or body failed.
    pub on_fail: Option<Box<dyn FnMut(&Pi)>>,
    /// `halt/0..1` is about to take effect.
    pub on_halt: Option<Box<dyn FnMut(i32)>>,
    /// An error is propagating through the search.
    pub on_error: Option<Box<dyn FnMut(&PrologError)>>,
}

/// The interpreter core: term storage, the operator table, the
/// procedure table, streams, flags, and hooks.
///
/// A `VM` is single-threaded; embedders wanting concurrency run one VM
/// per thread.
pub struct VM {
    pub arena: Arena,
    pub operators: OperatorTable,
    pub(crate) procedures: IndexMap<Pi, Procedure>,
    pub streams: StreamTable,
    pub flags: Flags,
    pub hooks: Hooks,
    barrier_counter: CutScope,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl VM {
    /// A fresh VM with the default operator table and the standard
    /// built-in predicates registered.  No user clauses, no streams.
    pub fn new() -> Self {
        let mut vm = Self {
            arena: Arena::new(),
            operators: OperatorTable::default_table(),
            procedures: IndexMap::new(),
            streams: StreamTable::new(),
            flags: Flags::default(),
            hooks: Hooks::default(),
            barrier_counter: 0,
        };
        builtins::register_all(&mut vm);
        vm
    }

    /// Mints a fresh cut barrier label.
    pub fn new_barrier(&mut self) -> CutScope {
        self.barrier_counter += 1;
        self.barrier_counter
    }

    /// Installs a native predicate under `name/arity`.
    pub fn register(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut VM, &[Term], &Env, &Cont, CutScope) -> Promise + 'static,
    ) {
        self.procedures
            .insert(Pi::new(name, arity), Procedure::Native { f: Rc::new(f) });
    }

    /// Whether `pi` names a native procedure.
    pub(crate) fn is_native(&self, pi: &Pi) -> bool {
        matches!(self.procedures.get(pi), Some(Procedure::Native { .. }))
    }

    /// Executes `goal` under `env`, continuing with `k` on success.
    /// `cut` is the scope a metacalled `!` commits to.
    pub fn solve(&mut self, goal: Term, env: &Env, k: &Cont, cut: CutScope) -> Promise {
        let goal = env.resolve(goal);
        let pi = match callable_pi(&mut self.arena, goal, "call/1") {
            Ok(pi) => pi,
            Err(e) => return Promise::Error(e),
        };
        let args: Vec<Term> = match goal.view(&self.arena) {
            Ok(View::Func(_, _, args)) => args.to_vec(),
            _ => Vec::new(),
        };
        self.arrive(pi, args, env, k, cut)
    }

    /// Looks up `pi` and dispatches.  User procedures become a choice
    /// over their clauses behind a fresh labelled barrier; native
    /// procedures run with the caller's cut scope.
    pub(crate) fn arrive(
        &mut self,
        pi: Pi,
        args: Vec<Term>,
        env: &Env,
        k: &Cont,
        cut: CutScope,
    ) -> Promise {
        if self.hooks.on_arrive.is_some() {
            let resolved: Vec<Term> = args.iter().map(|a| env.resolve(*a)).collect();
            if let Some(hook) = self.hooks.on_arrive.as_mut() {
                hook(&pi, &resolved);
            }
        }

        match self.procedures.get(&pi) {
            None => match self.flags.unknown {
                Unknown::Error => {
                    let culprit = pi.to_term(&mut self.arena);
                    Promise::Error(PrologError::existence_error(
                        &mut self.arena,
                        "procedure",
                        culprit,
                        "call/1",
                    ))
                }
                Unknown::Fail => Promise::Fail,
                Unknown::Warning => {
                    log::warn!("unknown procedure {pi}");
                    Promise::Fail
                }
            },
            Some(Procedure::Native { f }) => {
                let f = f.clone();
                let env = env.clone();
                let k = k.clone();
                Promise::delay(move |vm| (*f)(vm, &args, &env, &k, cut))
            }
            Some(Procedure::Clauses(clauses)) => {
                let clauses = clauses.clone();
                let barrier = self.new_barrier();
                let alternatives: Vec<Promise> = clauses
                    .into_iter()
                    .enumerate()
                    .map(|(i, clause)| {
                        let args = args.clone();
                        let env = env.clone();
                        let k = k.clone();
                        let pi = pi.clone();
                        Promise::delay(move |vm| {
                            let hook = if i == 0 {
                                vm.hooks.on_call.as_mut()
                            } else {
                                vm.hooks.on_redo.as_mut()
                            };
                            if let Some(hook) = hook {
                                hook(&pi, &args);
                            }
                            vm.run_clause(&clause, args, env, k, barrier)
                        })
                    })
                    .collect();
                Promise::cut_barrier(barrier, Promise::choice(alternatives))
            }
        }
    }

    fn run_clause(
        &mut self,
        clause: &Rc<Clause>,
        args: Vec<Term>,
        env: Env,
        k: Cont,
        barrier: CutScope,
    ) -> Promise {
        let frame: Vec<Term> = (0..clause.var_slots)
            .map(|_| self.arena.fresh_var(None))
            .collect();
        let args_list = self.arena.list(args);
        self.exec(
            clause.clone(),
            0,
            Rc::new(frame),
            env,
            args_list,
            Term::NIL,
            k,
            barrier,
        )
    }

    /// The bytecode interpreter.  `args` is the cursor over the
    /// remaining arguments at the current level, `astack` the stack of
    /// suspended outer levels; both are list terms advanced by
    /// unification.  `barrier` is the clause's own cut scope.
    #[allow(clippy::too_many_arguments)]
    fn exec(
        &mut self,
        clause: Rc<Clause>,
        mut pc: usize,
        frame: Rc<Vec<Term>>,
        mut env: Env,
        mut args: Term,
        mut astack: Term,
        k: Cont,
        barrier: CutScope,
    ) -> Promise {
        loop {
            let Some(&byte) = clause.bytecode.get(pc) else {
                return self.corrupt(&clause, "bytecode ended without exit");
            };
            let Ok(op) = OpCode::try_from(byte) else {
                return self.corrupt(&clause, "unknown opcode");
            };
            match op {
                OpCode::Void => {
                    pc += 1;
                }
                OpCode::Const | OpCode::Var => {
                    let x = if op == OpCode::Const {
                        match self.operand(&clause, pc) {
                            Some(Symbol::Const(t)) => *t,
                            _ => return self.corrupt(&clause, "bad constant operand"),
                        }
                    } else {
                        let slot = clause
                            .bytecode
                            .get(pc + 1)
                            .and_then(|&i| frame.get(i as usize));
                        match slot {
                            Some(&v) => v,
                            None => return self.corrupt(&clause, "bad variable slot"),
                        }
                    };
                    let rest = self.arena.fresh_var(None);
                    let cons = self.arena.cons(x, rest);
                    let (env2, ok) = unify(&self.arena, &env, args, cons, false);
                    if !ok {
                        return self.clause_failed(&clause);
                    }
                    env = env2;
                    args = rest;
                    pc += 2;
                }
                OpCode::Functor => {
                    let Some(Symbol::Proc(sub)) = self.operand(&clause, pc) else {
                        return self.corrupt(&clause, "bad functor operand");
                    };
                    let sub = sub.clone();

                    let arg = self.arena.fresh_var(None);
                    let rest = self.arena.fresh_var(None);
                    let cons = self.arena.cons(arg, rest);
                    let (env2, ok) = unify(&self.arena, &env, args, cons, false);
                    if !ok {
                        return self.clause_failed(&clause);
                    }
                    env = env2;

                    enum Found {
                        Build(VarId),
                        Match(Vec<Term>),
                        No,
                    }
                    let resolved = env.resolve(arg);
                    let found = match resolved.view(&self.arena) {
                        Ok(View::Var(id)) => Found::Build(id),
                        Ok(View::Func(ar, functor, sub_args))
                            if sub_args.len() == sub.arity
                                && ar.atom_name(functor) == Ok(sub.name.as_str()) =>
                        {
                            Found::Match(sub_args.to_vec())
                        }
                        _ => Found::No,
                    };
                    let sub_args = match found {
                        Found::Build(id) => {
                            let vars: Vec<Term> =
                                (0..sub.arity).map(|_| self.arena.fresh_var(None)).collect();
                            let compound = self.arena.func(sub.name.as_str(), vars.clone());
                            env = env.bind(id, compound);
                            vars
                        }
                        Found::Match(sub_args) => sub_args,
                        Found::No => return self.clause_failed(&clause),
                    };

                    args = self.arena.list(sub_args);
                    astack = self.arena.cons(rest, astack);
                    pc += 2;
                }
                OpCode::Pop => {
                    let (env2, ok) = unify(&self.arena, &env, args, Term::NIL, false);
                    if !ok {
                        return self.clause_failed(&clause);
                    }
                    env = env2;
                    let a = self.arena.fresh_var(None);
                    let rest = self.arena.fresh_var(None);
                    let cons = self.arena.cons(a, rest);
                    let (env3, ok) = unify(&self.arena, &env, astack, cons, false);
                    if !ok {
                        return self.clause_failed(&clause);
                    }
                    env = env3;
                    args = a;
                    astack = rest;
                    pc += 1;
                }
                OpCode::Enter => {
                    let (env2, ok) = unify(&self.arena, &env, args, Term::NIL, false);
                    if !ok {
                        return self.clause_failed(&clause);
                    }
                    let (env3, ok) = unify(&self.arena, &env2, astack, Term::NIL, false);
                    if !ok {
                        return self.clause_failed(&clause);
                    }
                    env = env3;
                    let open = self.arena.fresh_var(None);
                    args = open;
                    astack = open;
                    pc += 1;
                }
                OpCode::Call => {
                    let Some(Symbol::Proc(callee)) = self.operand(&clause, pc) else {
                        return self.corrupt(&clause, "bad call operand");
                    };
                    let callee = callee.clone();
                    let (env2, ok) = unify(&self.arena, &env, args, Term::NIL, false);
                    if !ok {
                        return self.clause_failed(&clause);
                    }
                    env = env2;
                    pc += 2;

                    let call_args = match proper_list_vec(&self.arena, &env, astack) {
                        Ok(v) => v,
                        Err(_) => return self.corrupt(&clause, "malformed argument stack"),
                    };

                    let rest_k: Cont = {
                        let clause = clause.clone();
                        let frame = frame.clone();
                        let k = k.clone();
                        Cont::new(move |vm: &mut VM, env2: Env| {
                            let open = vm.arena.fresh_var(None);
                            vm.exec(
                                clause.clone(),
                                pc,
                                frame.clone(),
                                env2,
                                open,
                                open,
                                k.clone(),
                                barrier,
                            )
                        })
                    };
                    let env_at_call = env.clone();
                    return Promise::delay(move |vm| {
                        vm.arrive(callee, call_args, &env_at_call, &rest_k, barrier)
                    });
                }
                OpCode::Exit => {
                    if let Some(hook) = self.hooks.on_exit.as_mut() {
                        hook(&clause.pi);
                    }
                    // Hand the environment back through the driver so
                    // a deep chain of returning clauses never nests
                    // host stack frames.
                    return Promise::delay(move |vm| k.call(vm, env));
                }
                OpCode::Cut => {
                    pc += 1;
                    let clause = clause.clone();
                    let frame = frame.clone();
                    let k = k.clone();
                    return Promise::cut(
                        barrier,
                        Promise::delay(move |vm| {
                            vm.exec(clause, pc, frame, env, args, astack, k, barrier)
                        }),
                    );
                }
            }
        }
    }

    fn operand<'b>(&self, clause: &'b Clause, pc: usize) -> Option<&'b Symbol> {
        let &index = clause.bytecode.get(pc + 1)?;
        clause.symbols.get(index as usize)
    }

    fn clause_failed(&mut self, clause: &Clause) -> Promise {
        if let Some(hook) = self.hooks.on_fail.as_mut() {
            hook(&clause.pi);
        }
        Promise::Fail
    }

    fn corrupt(&mut self, clause: &Clause, what: &str) -> Promise {
        let detail = format!("{what} in {}", clause.pi);
        Promise::Error(PrologError::system_error(&mut self.arena, &detail))
    }

    /// Copies `term` with `env` applied and every unbound variable
    /// replaced by a fresh one (sharing preserved within the copy).
    pub fn rename_term(&mut self, term: Term, env: &Env) -> Term {
        let mut map: HashMap<VarId, Term> = HashMap::new();
        self.rename_with(term, env, &mut map, 0)
    }

    fn rename_with(
        &mut self,
        term: Term,
        env: &Env,
        map: &mut HashMap<VarId, Term>,
        depth: usize,
    ) -> Term {
        // Bindings make cycles possible with the occurs check off; cap
        // rather than hang.
        const MAX_DEPTH: usize = 1 << 12;
        if depth > MAX_DEPTH {
            return term;
        }
        let term = env.resolve(term);
        enum Kind {
            Var(VarId),
            Func(smartstring::alias::String, Vec<Term>),
            Leaf,
        }
        let kind = match term.view(&self.arena) {
            Ok(View::Var(id)) => Kind::Var(id),
            Ok(View::Func(ar, functor, args)) => match ar.atom_name(functor) {
                Ok(name) => Kind::Func(name.into(), args.to_vec()),
                Err(_) => Kind::Leaf,
            },
            _ => Kind::Leaf,
        };
        match kind {
            Kind::Var(id) => {
                if let Some(copy) = map.get(&id) {
                    return *copy;
                }
                let name = self
                    .arena
                    .var_name(id)
                    .map(smartstring::alias::String::from);
                let fresh = self.arena.fresh_var(name.as_deref());
                map.insert(id, fresh);
                fresh
            }
            Kind::Func(name, args) => {
                let new_args: Vec<Term> = args
                    .into_iter()
                    .map(|a| self.rename_with(a, env, map, depth + 1))
                    .collect();
                self.arena.func(name.as_str(), new_args)
            }
            Kind::Leaf => term,
        }
    }

    /// Asserts a clause at the front or back of its procedure.  A
    /// directive `:- Goal` is not a clause; callers handle it first.
    pub fn assert_clause(&mut self, term: Term, env: &Env, front: bool) -> Result<(), PrologError> {
        let renamed = self.rename_term(term, env);
        let clause = Rc::new(compile_clause(&mut self.arena, renamed)?);
        let pi = clause.pi.clone();

        match self.procedures.get_mut(&pi) {
            Some(Procedure::Native { .. }) => {
                let culprit = pi.to_term(&mut self.arena);
                Err(PrologError::permission_error(
                    &mut self.arena,
                    "modify",
                    "static_procedure",
                    culprit,
                    "assert/1",
                ))
            }
            Some(Procedure::Clauses(clauses)) => {
                if front {
                    clauses.insert(0, clause);
                } else {
                    clauses.push(clause);
                }
                Ok(())
            }
            None => {
                self.procedures.insert(pi, Procedure::Clauses(vec![clause]));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::promise::{accept, Search};

    fn vm_with(clauses: &str) -> VM {
        let mut vm = VM::new();
        let ops = vm.operators.clone();
        let terms: Vec<Term> = {
            let mut parser =
                Parser::new(clauses, &mut vm.arena, &ops, vm.flags.double_quotes, None);
            let mut out = Vec::new();
            while let Some(t) = parser.next_term().expect("parse") {
                out.push(t);
            }
            out
        };
        let env = Env::new();
        for t in terms {
            vm.assert_clause(t, &env, false).expect("assert");
        }
        vm
    }

    fn query(vm: &mut VM, text: &str) -> (Vec<Env>, Vec<(String, Term)>) {
        let ops = vm.operators.clone();
        let (goal, vars) = {
            let mut parser = Parser::new(text, &mut vm.arena, &ops, vm.flags.double_quotes, None);
            let goal = parser.next_term().expect("parse").expect("goal");
            let vars: Vec<_> = parser
                .variables()
                .iter()
                .map(|pv| (pv.name.to_string(), pv.variable))
                .collect();
            (goal, vars)
        };
        let env = Env::new();
        let k = accept();
        let barrier = vm.new_barrier();
        let root = Promise::cut_barrier(
            barrier,
            Promise::delay(move |vm: &mut VM| vm.solve(goal, &env, &k, barrier)),
        );
        let mut search = Search::new(root);
        let mut envs = Vec::new();
        while let Some(env) = search.next(vm).expect("query error") {
            envs.push(env);
        }
        (envs, vars)
    }

    #[test]
    fn facts_answer_ground_queries() {
        let mut vm = vm_with("edge(a, b). edge(b, c).");
        let (envs, _) = query(&mut vm, "edge(a, b).");
        assert_eq!(envs.len(), 1);
        let (envs, _) = query(&mut vm, "edge(a, c).");
        assert!(envs.is_empty());
    }

    #[test]
    fn variables_enumerate_matching_facts_in_order() {
        let mut vm = vm_with("edge(a, b). edge(a, c). edge(b, d).");
        let (envs, vars) = query(&mut vm, "edge(a, X).");
        assert_eq!(envs.len(), 2);
        let x = vars[0].1;
        let names: Vec<String> = envs
            .iter()
            .map(|e| {
                let t = e.resolve(x);
                vm.arena.atom_name(&t).unwrap().to_owned()
            })
            .collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn rules_chain_through_their_bodies() {
        let mut vm = vm_with(
            "edge(a, b). edge(b, c). \
             path(X, Y) :- edge(X, Y). \
             path(X, Z) :- edge(X, Y), path(Y, Z).",
        );
        let (envs, vars) = query(&mut vm, "path(a, Z).");
        let z = vars[0].1;
        let names: Vec<String> = envs
            .iter()
            .map(|e| {
                let t = e.resolve(z);
                vm.arena.atom_name(&t).unwrap().to_owned()
            })
            .collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn cut_commits_to_the_first_matching_clause() {
        let mut vm = vm_with(
            "classify(0, zero) :- !. \
             classify(_, other).",
        );
        let (envs, vars) = query(&mut vm, "classify(0, C).");
        assert_eq!(envs.len(), 1);
        let c = vars[0].1;
        assert_eq!(vm.arena.atom_name(&envs[0].resolve(c)).unwrap(), "zero");

        let (envs, _) = query(&mut vm, "classify(1, C).");
        assert_eq!(envs.len(), 1);
    }

    #[test]
    fn cut_prunes_choicepoints_of_earlier_body_goals() {
        let mut vm = vm_with(
            "num(1). num(2). num(3). \
             pick(X) :- num(X), !.",
        );
        let (envs, vars) = query(&mut vm, "pick(X).");
        assert_eq!(envs.len(), 1);
        let x = vars[0].1;
        assert_eq!(vm.arena.unpack_int(&envs[0].resolve(x)).unwrap(), 1);
    }

    #[test]
    fn nested_compounds_match_and_build() {
        let mut vm = vm_with("mirror(f(X, g(Y)), g(f(Y, X))).");
        let (envs, vars) = query(&mut vm, "mirror(f(1, g(2)), Out).");
        assert_eq!(envs.len(), 1);
        let out = vars[0].1;
        let shown = format!(
            "{}",
            envs[0]
                .resolve(out)
                .display_with(&vm.arena, &envs[0], Default::default())
        );
        assert_eq!(shown, "g(f(2, 1))");
    }

    #[test]
    fn unknown_procedures_follow_the_flag() {
        let mut vm = VM::new();
        let env = Env::new();
        let goal = vm.arena.atom("no_such_thing");
        let k = accept();

        vm.flags.unknown = Unknown::Error;
        let b = vm.new_barrier();
        let mut search = Search::new(vm.solve(goal, &env, &k, b));
        assert!(search.next(&mut vm).is_err());

        vm.flags.unknown = Unknown::Fail;
        let mut search = Search::new(vm.solve(goal, &env, &k, b));
        assert!(search.next(&mut vm).unwrap().is_none());

        vm.flags.unknown = Unknown::Warning;
        let mut search = Search::new(vm.solve(goal, &env, &k, b));
        assert!(search.next(&mut vm).unwrap().is_none());
    }

    #[test]
    fn calling_an_unbound_goal_is_an_instantiation_error() {
        let mut vm = VM::new();
        let env = Env::new();
        let v = vm.arena.fresh_var(None);
        let k = accept();
        let b = vm.new_barrier();
        let mut search = Search::new(vm.solve(v, &env, &k, b));
        assert!(search.next(&mut vm).is_err());
    }

    #[test]
    fn asserting_over_a_native_is_a_permission_error() {
        let mut vm = VM::new();
        let env = Env::new();
        let t = vm.arena.atom("true");
        let err = vm.assert_clause(t, &env, false).unwrap_err();
        let ball = err.ball().unwrap();
        let (_, [formal, _]) = vm.arena.unpack_func::<2>(&ball, &["error"]).unwrap();
        assert_eq!(vm.arena.func_name(&formal).unwrap(), "permission_error");
    }

    #[test]
    fn asserta_prepends_assertz_appends() {
        let mut vm = vm_with("val(1).");
        let env = Env::new();
        let two = vm.arena.func("val", [Term::int(2)]);
        vm.assert_clause(two, &env, false).unwrap();
        let zero = vm.arena.func("val", [Term::int(0)]);
        vm.assert_clause(zero, &env, true).unwrap();
        let (envs, vars) = query(&mut vm, "val(X).");
        let x = vars[0].1;
        let got: Vec<i64> = envs
            .iter()
            .map(|e| vm.arena.unpack_int(&e.resolve(x)).unwrap())
            .collect();
        assert_eq!(got, [0, 1, 2]);
    }

    #[test]
    fn rename_term_preserves_sharing_and_freshens_vars() {
        let mut vm = VM::new();
        let env = Env::new();
        let x = vm.arena.fresh_var(Some("X"));
        let t = vm.arena.func("f", [x, x]);
        let copy = vm.rename_term(t, &env);
        let (_, args) = vm.arena.unpack_func_any(&copy, &["f"]).unwrap();
        assert_eq!(args[0], args[1]);
        assert_ne!(args[0], x);
    }

    #[test]
    fn deep_recursion_does_not_overflow_the_host_stack() {
        let mut vm = vm_with("count(zero). count(s(N)) :- count(N).");
        let mut t = vm.arena.atom("zero");
        for _ in 0..50_000 {
            t = vm.arena.func("s", [t]);
        }
        let goal = vm.arena.func("count", [t]);
        let env = Env::new();
        let k = accept();
        let b = vm.new_barrier();
        let root = vm.solve(goal, &env, &k, b);
        let mut search = Search::new(root);
        assert!(search.next(&mut vm).expect("no error").is_some());
    }
}
