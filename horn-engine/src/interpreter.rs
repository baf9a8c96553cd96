//! The embedding façade: what a host application talks to.
//!
//! [`Interpreter::try_new`] builds a VM with the standard built-ins,
//! default operators, `stdin`/`stdout` streams, and a small consulted
//! prelude.  [`Interpreter::consult`] reads clauses and directives
//! from source text; [`Interpreter::query`] starts a demand-driven
//! search whose solutions are read through [`Solutions`]: advance with
//! `next`, inspect variable bindings by name, project them into host
//! values with [`Solutions::get`], and drop (or `close`) to cancel.

use crate::error::{EngineError, PrologError};
use crate::parser::{ParseError, ParsedVariable, Parser};
use crate::promise::{accept, Cont, CutScope, Promise, Search};
use crate::vm::VM;
use horn_terms::{proper_list_vec, Env, IntoTerm, Term, View, WriteOptions};
use smartstring::alias::String;
use std::io::{self, BufReader};

/// Clauses consulted into every fresh interpreter.  Library predicates
/// that are comfortably expressed as ordinary Prolog live here rather
/// than as natives.
const PRELUDE: &str = r#"
once(G) :- call(G), !.
\+(G) :- call(G), !, fail.
\+(_).
not(G) :- \+(G).

member(X, [X|_]).
member(X, [_|T]) :- member(X, T).

append([], L, L).
append([H|T], L, [H|R]) :- append(T, L, R).

between(L, U, X) :- L =< U, X = L.
between(L, U, X) :- L < U, L1 is L + 1, between(L1, U, X).

length(L, N) :- length_of(L, 0, N).
length_of([], N, N).
length_of([_|T], A, N) :- A1 is A + 1, length_of(T, A1, N).

reverse(L, R) :- reverse_onto(L, [], R).
reverse_onto([], A, A).
reverse_onto([H|T], A, R) :- reverse_onto(T, [H|A], R).
"#;

/// The placeholder atom substituted by query arguments.
const PLACEHOLDER: &str = "?";

/// An embeddable Prolog interpreter.
pub struct Interpreter {
    pub vm: VM,
}

impl Interpreter {
    /// A ready interpreter: built-ins registered, default operator
    /// table, `stdin`/`stdout` wired as `user_input`/`user_output`,
    /// prelude consulted.
    pub fn try_new() -> Result<Self, EngineError> {
        let mut vm = VM::new();
        vm.streams.set_user_input(BufReader::new(io::stdin()));
        vm.streams.set_user_output(io::stdout());
        let mut interpreter = Self { vm };
        interpreter.consult(PRELUDE)?;
        Ok(interpreter)
    }

    /// Like [`Interpreter::try_new`].  The bootstrap cannot fail
    /// unless the build is broken.
    pub fn new() -> Self {
        Self::try_new().expect("bootstrap clauses are well-formed")
    }

    /// Installs a native predicate.
    pub fn register(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut VM, &[Term], &Env, &Cont, CutScope) -> Promise + 'static,
    ) {
        self.vm.register(name, arity, f);
    }

    /// Reads clauses and directives from `source`.  Clauses are
    /// asserted in order; a `:- Goal` directive runs immediately and
    /// must succeed.
    pub fn consult(&mut self, source: &str) -> Result<(), EngineError> {
        let mut offset = 0;
        loop {
            let ops = self.vm.operators.clone();
            let double_quotes = self.vm.flags.double_quotes;
            let conversions = if self.vm.flags.char_conversion {
                Some(self.vm.flags.char_conversions.clone())
            } else {
                None
            };
            // Re-enter the parser after every clause: a directive may
            // have changed the operator table or a flag.
            let parsed = {
                let mut parser = Parser::new(
                    &source[offset..],
                    &mut self.vm.arena,
                    &ops,
                    double_quotes,
                    conversions.as_ref(),
                );
                match parser.next_term() {
                    Ok(Some(term)) => Ok(Some((term, parser.offset()))),
                    Ok(None) => Ok(None),
                    Err(e) => Err(e),
                }
            };
            match parsed {
                Ok(Some((term, consumed))) => {
                    offset += consumed;
                    self.load(term)?;
                }
                Ok(None) => return Ok(()),
                Err(ParseError::Insufficient) => return Err(EngineError::Insufficient),
                Err(e) => {
                    let line = e.line().unwrap_or(0);
                    return Err(EngineError::Syntax {
                        line,
                        detail: String::from(format!("{e}")),
                    });
                }
            }
        }
    }

    /// Asserts one term, running it instead when it is a directive.
    fn load(&mut self, term: Term) -> Result<(), EngineError> {
        if let Ok((_, [goal])) = self.vm.arena.unpack_func::<1>(&term, &[":-"]) {
            return self.run_directive(goal);
        }
        self.vm.assert_clause(term, &Env::new(), false)?;
        Ok(())
    }

    fn run_directive(&mut self, goal: Term) -> Result<(), EngineError> {
        let env = Env::new();
        let k = accept();
        let barrier = self.vm.new_barrier();
        let root = Promise::cut_barrier(
            barrier,
            Promise::delay(move |vm: &mut VM| vm.solve(goal, &env, &k, barrier)),
        );
        let mut search = Search::new(root);
        match search.next(&mut self.vm) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                let shown = format!(
                    "{}",
                    goal.display_with(
                        &self.vm.arena,
                        &Env::new(),
                        WriteOptions::with_ops(&self.vm.operators)
                    )
                );
                log::warn!("directive failed: {shown}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Starts a query.  `goal_text` is ordinary source text; a missing
    /// final dot is supplied.
    pub fn query(&mut self, goal_text: &str) -> Result<Solutions<'_>, EngineError> {
        self.query_with(goal_text, Vec::<Term>::new())
    }

    /// Starts a query, substituting `args` for each occurrence of the
    /// placeholder atom `?`, left to right.
    pub fn query_with(
        &mut self,
        goal_text: &str,
        args: impl IntoIterator<Item = impl IntoTerm>,
    ) -> Result<Solutions<'_>, EngineError> {
        let args: Vec<Term> = args
            .into_iter()
            .map(|a| a.into_term(&mut self.vm.arena))
            .collect();

        let mut text = goal_text.trim_end().to_owned();
        if !text.ends_with('.') {
            text.push('.');
        }

        let ops = self.vm.operators.clone();
        let double_quotes = self.vm.flags.double_quotes;
        let (goal, vars) = {
            let mut parser =
                Parser::new(&text, &mut self.vm.arena, &ops, double_quotes, None);
            parser.replace(PLACEHOLDER, args);
            match parser.next_term() {
                Ok(Some(term)) => (term, parser.variables().to_vec()),
                Ok(None) => {
                    return Err(EngineError::Syntax {
                        line: 1,
                        detail: String::from("empty query"),
                    })
                }
                Err(ParseError::Insufficient) => return Err(EngineError::Insufficient),
                Err(e) => {
                    let line = e.line().unwrap_or(0);
                    return Err(EngineError::Syntax {
                        line,
                        detail: String::from(format!("{e}")),
                    });
                }
            }
        };

        let env = Env::new();
        let k = accept();
        let barrier = self.vm.new_barrier();
        let root = Promise::cut_barrier(
            barrier,
            Promise::delay(move |vm: &mut VM| vm.solve(goal, &env, &k, barrier)),
        );
        Ok(Solutions {
            vm: &mut self.vm,
            search: Search::new(root),
            vars,
            env: None,
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of a query.  Every call to [`Solutions::next`] searches
/// for the next solution; the current solution's bindings are read by
/// variable name.
pub struct Solutions<'a> {
    vm: &'a mut VM,
    search: Search,
    vars: Vec<ParsedVariable>,
    env: Option<Env>,
}

impl Solutions<'_> {
    /// Advances to the next solution.  `Ok(true)` means a solution is
    /// available for reading; `Ok(false)` means the search is
    /// exhausted.
    pub fn next(&mut self) -> Result<bool, EngineError> {
        match self.search.next(self.vm) {
            Ok(Some(env)) => {
                self.env = Some(env);
                Ok(true)
            }
            Ok(None) => {
                self.env = None;
                Ok(false)
            }
            Err(e) => {
                self.env = None;
                Err(e.into())
            }
        }
    }

    /// Cancels the search.  Dropping the `Solutions` does the same.
    pub fn close(&mut self) {
        self.search.close();
    }

    /// The named, non-anonymous variables of the query, in first
    /// occurrence order.
    pub fn vars(&self) -> Vec<&str> {
        self.vars.iter().map(|pv| pv.name.as_str()).collect()
    }

    /// The current binding of the named query variable, resolved one
    /// step through the solution environment.
    pub fn resolve(&self, name: &str) -> Option<Term> {
        let env = self.env.as_ref()?;
        let pv = self.vars.iter().find(|pv| pv.name == name)?;
        Some(env.resolve(pv.variable))
    }

    /// The current solution environment.
    pub fn env(&self) -> Option<&Env> {
        self.env.as_ref()
    }

    /// Renders the current binding of `name` as source text under the
    /// live operator table.
    pub fn show(&self, name: &str) -> Option<std::string::String> {
        let env = self.env.as_ref()?;
        let term = self.resolve(name)?;
        let opts = WriteOptions {
            quoted: true,
            number_vars: true,
            ops: Some(&self.vm.operators),
            ..Default::default()
        };
        Some(format!("{}", term.display_with(&self.vm.arena, env, opts)))
    }

    /// Projects the current binding of `name` into a host value.
    pub fn get<T: FromTerm>(&self, name: &str) -> Result<T, EngineError> {
        let Some(env) = self.env.as_ref() else {
            return Err(EngineError::NoSuchVariable(String::from(name)));
        };
        let Some(term) = self.resolve(name) else {
            return Err(EngineError::NoSuchVariable(String::from(name)));
        };
        T::from_term(self.vm, env, term).ok_or_else(|| EngineError::Conversion {
            variable: String::from(name),
        })
    }
}

/// Conversion from a solved term into a host value.  Numeric
/// conversions follow standard widening rules; a list projects to a
/// homogeneous `Vec`.
pub trait FromTerm: Sized {
    fn from_term(vm: &VM, env: &Env, term: Term) -> Option<Self>;
}

impl FromTerm for Term {
    fn from_term(_vm: &VM, env: &Env, term: Term) -> Option<Self> {
        Some(env.resolve(term))
    }
}

impl FromTerm for i64 {
    fn from_term(vm: &VM, env: &Env, term: Term) -> Option<Self> {
        match env.resolve(term).view(&vm.arena) {
            Ok(View::Int(i)) => Some(i),
            _ => None,
        }
    }
}

impl FromTerm for f64 {
    fn from_term(vm: &VM, env: &Env, term: Term) -> Option<Self> {
        match env.resolve(term).view(&vm.arena) {
            Ok(View::Real(r)) => Some(r),
            Ok(View::Int(i)) => Some(i as f64),
            _ => None,
        }
    }
}

impl FromTerm for std::string::String {
    fn from_term(vm: &VM, env: &Env, term: Term) -> Option<Self> {
        match env.resolve(term).view(&vm.arena) {
            Ok(View::Atom(name)) => Some(name.to_owned()),
            _ => None,
        }
    }
}

impl<T: FromTerm> FromTerm for Vec<T> {
    fn from_term(vm: &VM, env: &Env, term: Term) -> Option<Self> {
        let items = proper_list_vec(&vm.arena, env, env.resolve(term)).ok()?;
        items
            .into_iter()
            .map(|item| T::from_term(vm, env, item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp(src: &str) -> Interpreter {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut horn = Interpreter::try_new().expect("interpreter");
        horn.consult(src).expect("consult");
        horn
    }

    fn all_solutions(horn: &mut Interpreter, goal: &str, var: &str) -> Vec<std::string::String> {
        let mut out = Vec::new();
        let mut solutions = horn.query(goal).expect("query");
        while solutions.next().expect("next") {
            out.push(solutions.show(var).expect("binding"));
        }
        out
    }

    #[test]
    fn append_ground() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("append([1,2], [3,4], X).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<Vec<i64>>("X").unwrap(), vec![1, 2, 3, 4]);
        assert!(!s.next().unwrap());
    }

    #[test]
    fn append_splits_backwards() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("append(X, Y, [1,2]).").unwrap();
        let mut splits = Vec::new();
        while s.next().unwrap() {
            splits.push((
                s.get::<Vec<i64>>("X").unwrap(),
                s.get::<Vec<i64>>("Y").unwrap(),
            ));
        }
        assert_eq!(
            splits,
            vec![
                (vec![], vec![1, 2]),
                (vec![1], vec![2]),
                (vec![1, 2], vec![]),
            ]
        );
    }

    #[test]
    fn member_with_cut_commits() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("member(X, [a,b,c]), !.").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("X").unwrap(), "a");
        assert!(!s.next().unwrap());
    }

    #[test]
    fn catch_recovers_with_the_ball() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("catch(throw(err), E, E = err).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("E").unwrap(), "err");
        assert!(!s.next().unwrap());
    }

    #[test]
    fn catch_rethrows_on_mismatch() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("catch(throw(err), other, true).").unwrap();
        assert!(s.next().is_err());
    }

    #[test]
    fn catch_rewinds_partial_bindings() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn
            .query("catch((X = 1, throw(oops)), _, true).")
            .unwrap();
        assert!(s.next().unwrap());
        // X was bound inside the protected goal; the recovery runs in
        // the environment captured at catch entry.
        let x = s.resolve("X").unwrap();
        assert!(x.is_var());
    }

    #[test]
    fn setof_sorts_and_dedups() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("setof(X, member(X, [b,a,b,c,a]), L).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(
            s.get::<Vec<std::string::String>>("L").unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn findall_collects_in_order_and_empty() {
        let mut horn = interp("num(2). num(1). num(3).");
        let mut s = horn.query("findall(X, num(X), L).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<Vec<i64>>("L").unwrap(), vec![2, 1, 3]);

        let mut s = horn.query("findall(X, fail, L).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<Vec<i64>>("L").unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn bagof_fails_on_no_solutions() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("bagof(X, member(X, []), L).").unwrap();
        assert!(!s.next().unwrap());
    }

    #[test]
    fn bagof_groups_by_witness() {
        let mut horn = interp("age(peter, 7). age(ann, 11). age(pat, 8). age(tom, 5).");
        let mut s = horn.query("bagof(C, age(C, A), L).").unwrap();
        let mut groups = 0;
        while s.next().unwrap() {
            groups += 1;
        }
        // One group per distinct age.
        assert_eq!(groups, 4);
    }

    #[test]
    fn if_then_else_takes_the_right_branch() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("(1 < 2 -> X = yes ; X = no).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("X").unwrap(), "yes");
        assert!(!s.next().unwrap());

        let mut s = horn.query("(2 < 1 -> X = yes ; X = no).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("X").unwrap(), "no");
    }

    #[test]
    fn negation_as_failure() {
        let mut horn = interp("good(milk).");
        let mut s = horn.query("\\+ good(mud).").unwrap();
        assert!(s.next().unwrap());
        let mut s = horn.query("\\+ good(milk).").unwrap();
        assert!(!s.next().unwrap());
    }

    #[test]
    fn cut_inside_call_stays_local() {
        let mut horn = interp("num(1). num(2).");
        let mut s = horn.query("num(X), call((!, true)).").unwrap();
        let mut count = 0;
        while s.next().unwrap() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn arithmetic_and_comparison() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("X is 2 + 3 * 4, X > 10, X =:= 14.").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<i64>("X").unwrap(), 14);
    }

    #[test]
    fn standard_order_builtins() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("1.0 @< 1, a @< f(a), compare(O, 1, 2).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("O").unwrap(), "<");
    }

    #[test]
    fn univ_round_trips() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn
            .query("foo(a, b) =.. L, T =.. L, T == foo(a, b).")
            .unwrap();
        assert!(s.next().unwrap());
        assert_eq!(
            s.get::<Vec<std::string::String>>("L").unwrap(),
            vec!["foo", "a", "b"]
        );
    }

    #[test]
    fn functor_both_modes() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("functor(foo(a, b), N, A).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("N").unwrap(), "foo");
        assert_eq!(s.get::<i64>("A").unwrap(), 2);

        let mut s = horn.query("functor(T, foo, 2), T = foo(X, Y).").unwrap();
        assert!(s.next().unwrap());

        let mut s = horn.query("functor(T, baz, 0), T == baz.").unwrap();
        assert!(s.next().unwrap());
    }

    #[test]
    fn assert_and_retract() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn
            .query("assertz(fact(1)), assertz(fact(2)), asserta(fact(0)).")
            .unwrap();
        assert!(s.next().unwrap());
        drop(s);

        let facts = all_solutions(&mut horn, "fact(X).", "X");
        assert_eq!(facts, ["0", "1", "2"]);

        let mut s = horn.query("retract(fact(1)).").unwrap();
        assert!(s.next().unwrap());
        drop(s);

        let facts = all_solutions(&mut horn, "fact(X).", "X");
        assert_eq!(facts, ["0", "2"]);
    }

    #[test]
    fn directives_run_during_consult() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.consult(":- assertz(seeded(yes)). check(X) :- seeded(X).")
            .unwrap();
        let mut s = horn.query("check(X).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("X").unwrap(), "yes");
    }

    #[test]
    fn user_defined_operators_parse_after_op_directive() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.consult(":- op(700, xfx, ===). eq(X === Y) :- X = Y.")
            .unwrap();
        let mut s = horn.query("eq(a === a).").unwrap();
        assert!(s.next().unwrap());
    }

    #[test]
    fn placeholders_substitute_query_arguments() {
        let mut horn = interp("double(X, Y) :- Y is X * 2.");
        let mut s = horn.query_with("double(?, Y).", [21i64]).unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<i64>("Y").unwrap(), 42);
    }

    #[test]
    fn halt_surfaces_through_next() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("halt(3).").unwrap();
        match s.next() {
            Err(EngineError::Prolog(PrologError::Halted(3))) => {}
            other => panic!("expected halt, got {other:?}"),
        }
    }

    #[test]
    fn vars_lists_named_variables_only() {
        let mut horn = Interpreter::try_new().unwrap();
        let s = horn.query("append(X, _, [1]).").unwrap();
        assert_eq!(s.vars(), ["X"]);
    }

    #[test]
    fn close_cancels_the_search() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("member(X, [1,2,3]).").unwrap();
        assert!(s.next().unwrap());
        s.close();
        assert!(!s.next().unwrap());
    }

    #[test]
    fn numbervars_scenario() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.vm.streams.set_user_output(Vec::new());
        let mut s = horn
            .query("T = f('$VAR'(0), '$VAR'(1), '$VAR'(25), '$VAR'(26), '$VAR'(27)).")
            .unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.show("T").unwrap(), "f(A, B, Z, A1, B1)");
    }

    #[test]
    fn double_quotes_flag_is_respected() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.consult(":- set_prolog_flag(double_quotes, atom).")
            .unwrap();
        let mut s = horn.query("X = \"hi\".").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("X").unwrap(), "hi");
    }

    #[test]
    fn unknown_flag_fail_silences_missing_predicates() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.consult(":- set_prolog_flag(unknown, fail).").unwrap();
        let mut s = horn.query("surely_not_defined(1).").unwrap();
        assert!(!s.next().unwrap());
    }

    #[test]
    fn between_and_length_from_the_prelude() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("between(1, 3, X).").unwrap();
        let mut got = Vec::new();
        while s.next().unwrap() {
            got.push(s.get::<i64>("X").unwrap());
        }
        assert_eq!(got, [1, 2, 3]);

        let mut s = horn.query("length([a,b,c], N).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<i64>("N").unwrap(), 3);
    }

    #[test]
    fn once_commits_to_the_first_solution() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("once(member(X, [a,b,c])).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("X").unwrap(), "a");
        assert!(!s.next().unwrap());
    }

    #[test]
    fn cyclic_unification_is_tolerated_by_write() {
        let mut horn = Interpreter::try_new().unwrap();
        let mut s = horn.query("X = f(X), Y = f(Y), X = Y.").unwrap();
        // With the occurs check off this must terminate (coinductively
        // true), and rendering the binding must not hang.
        assert!(s.next().unwrap());
        let shown = s.show("X").unwrap();
        assert!(shown.contains("f("));
    }

    #[test]
    fn occurs_check_flag_rejects_cycles() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.consult(":- set_prolog_flag(occurs_check, true).")
            .unwrap();
        let mut s = horn.query("X = f(X).").unwrap();
        assert!(!s.next().unwrap());
        drop(s);
        let mut s = horn.query("unify_with_occurs_check(Y, g(Y)).").unwrap();
        assert!(!s.next().unwrap());
    }

    #[test]
    fn write_and_read_round_trip_through_streams() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.vm
            .streams
            .set_user_input(BufReader::new(&b"point(1, 2).\n"[..]));
        let mut s = horn.query("read_term(T, []), T = point(X, Y).").unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<i64>("X").unwrap(), 1);
        assert_eq!(s.get::<i64>("Y").unwrap(), 2);
    }

    #[test]
    fn get_char_walks_input() {
        let mut horn = Interpreter::try_new().unwrap();
        horn.vm.streams.set_user_input(BufReader::new(&b"ab"[..]));
        let mut s = horn
            .query("get_char(A), get_char(B), get_char(C).")
            .unwrap();
        assert!(s.next().unwrap());
        assert_eq!(s.get::<std::string::String>("A").unwrap(), "a");
        assert_eq!(s.get::<std::string::String>("B").unwrap(), "b");
        assert_eq!(s.get::<std::string::String>("C").unwrap(), "end_of_file");
    }
}
