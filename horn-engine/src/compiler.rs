//! The clause compiler: lowers a clause term into bytecode.
//!
//! A clause `Head :- Body` (or a bare head) compiles into a linear
//! program for the unification stack machine in [`crate::vm`]: head
//! matching instructions (`const`/`var`/`functor`/`pop`), an `enter`
//! marking the head/body boundary, argument-building plus `call` for
//! each body goal (`cut` for a literal `!`), and a final `exit`.
//! The same instructions that match arguments against a call in the
//! head build argument lists in the body — matching against an
//! unbound open list is construction.
//!
//! Each clause carries a symbol table of the constants and procedure
//! indicators it references, and a count of variable slots to allocate
//! a fresh frame from at every activation.

use crate::error::PrologError;
use horn_terms::{Arena, Env, SeqIter, Term, VarId, View};
use smartstring::alias::String;
use std::fmt;

/// A procedure indicator: name and arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pi {
    pub name: String,
    pub arity: usize,
}

impl Pi {
    pub fn new(name: impl AsRef<str>, arity: usize) -> Self {
        Self {
            name: String::from(name.as_ref()),
            arity,
        }
    }

    /// The `Name/Arity` term form.
    pub fn to_term(&self, arena: &mut Arena) -> Term {
        let name = arena.atom(self.name.as_str());
        arena.func("/", [name, Term::int(self.arity as i64)])
    }
}

impl fmt::Display for Pi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Bytecode operations.  `Const`, `Var`, `Functor`, and `Call` carry a
/// one-byte operand index into the clause's symbol or variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Void = 0,
    Enter,
    Call,
    Exit,
    Const,
    Var,
    Functor,
    Pop,
    Cut,
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(b: u8) -> Result<Self, u8> {
        Ok(match b {
            0 => OpCode::Void,
            1 => OpCode::Enter,
            2 => OpCode::Call,
            3 => OpCode::Exit,
            4 => OpCode::Const,
            5 => OpCode::Var,
            6 => OpCode::Functor,
            7 => OpCode::Pop,
            8 => OpCode::Cut,
            other => return Err(other),
        })
    }
}

/// A symbol table entry: an atomic constant or a procedure indicator.
#[derive(Debug, Clone)]
pub enum Symbol {
    Const(Term),
    Proc(Pi),
}

/// A compiled clause.  Immutable once built; shared by reference from
/// the procedure table into suspended alternatives.
#[derive(Debug, Clone)]
pub struct Clause {
    pub pi: Pi,
    /// The clause as asserted, with its own fresh variables; the
    /// source of truth for `retract/1` and friends.
    pub raw: Term,
    pub symbols: Vec<Symbol>,
    pub var_slots: usize,
    pub bytecode: Vec<u8>,
}

/// Compiles `term` — `Head :- Body` or a bare head, with no bindings
/// pending — into a [`Clause`].
pub fn compile_clause(arena: &mut Arena, term: Term) -> Result<Clause, PrologError> {
    let (head, body) = {
        match term.view(arena) {
            Ok(View::Func(ar, functor, args))
                if args.len() == 2 && ar.atom_name(functor) == Ok(":-") =>
            {
                (args[0], Some(args[1]))
            }
            _ => (term, None),
        }
    };

    let pi = callable_pi(arena, head, "assert/1")?;

    let mut compiler = Compiler {
        arena,
        pi: pi.clone(),
        symbols: Vec::new(),
        vars: Vec::new(),
        bytecode: Vec::new(),
    };

    let head_args: Vec<Term> = match compiler.arena.view(&head) {
        Ok(View::Func(_, _, args)) => args.to_vec(),
        _ => Vec::new(),
    };
    for arg in head_args {
        compiler.arg(arg)?;
    }

    if let Some(body) = body {
        compiler.emit(OpCode::Enter);
        let goals: Vec<Term> = {
            let env = Env::new();
            SeqIter::new(compiler.arena, &env, ",", body).collect()
        };
        for goal in goals {
            compiler.pred(goal)?;
        }
    }
    compiler.emit(OpCode::Exit);

    Ok(Clause {
        pi,
        raw: term,
        symbols: compiler.symbols,
        var_slots: compiler.vars.len(),
        bytecode: compiler.bytecode,
    })
}

/// The principal functor of a callable term, or the appropriate error.
pub fn callable_pi(arena: &mut Arena, term: Term, context: &str) -> Result<Pi, PrologError> {
    enum Kind {
        Pi(Pi),
        Unbound,
        Bad,
    }
    let kind = match term.view(arena) {
        Ok(View::Atom(name)) => Kind::Pi(Pi::new(name, 0)),
        Ok(View::Func(ar, functor, args)) => match ar.atom_name(functor) {
            Ok(name) => Kind::Pi(Pi::new(name, args.len())),
            Err(_) => Kind::Bad,
        },
        Ok(View::Var(_)) => Kind::Unbound,
        _ => Kind::Bad,
    };
    match kind {
        Kind::Pi(pi) => Ok(pi),
        Kind::Unbound => Err(PrologError::instantiation(arena, context)),
        Kind::Bad => Err(PrologError::type_error(arena, "callable", term, context)),
    }
}

struct Compiler<'a> {
    arena: &'a mut Arena,
    pi: Pi,
    symbols: Vec<Symbol>,
    vars: Vec<VarId>,
    bytecode: Vec<u8>,
}

impl Compiler<'_> {
    fn emit(&mut self, op: OpCode) {
        self.bytecode.push(op as u8);
    }

    fn emit_with(&mut self, op: OpCode, operand: usize) -> Result<(), PrologError> {
        if operand > u8::MAX as usize {
            let context = format!("{}", self.pi);
            return Err(PrologError::representation_error(
                self.arena,
                "clause_symbols",
                &context,
            ));
        }
        self.bytecode.push(op as u8);
        self.bytecode.push(operand as u8);
        Ok(())
    }

    fn pred(&mut self, goal: Term) -> Result<(), PrologError> {
        enum Kind {
            Cut,
            Atom(Pi),
            Func(Pi, Vec<Term>),
            Bad,
            Unbound,
        }
        let kind = match goal.view(self.arena) {
            Ok(View::Atom("!")) => Kind::Cut,
            Ok(View::Atom(name)) => Kind::Atom(Pi::new(name, 0)),
            Ok(View::Func(ar, functor, args)) => match ar.atom_name(functor) {
                Ok(name) => Kind::Func(Pi::new(name, args.len()), args.to_vec()),
                Err(_) => Kind::Bad,
            },
            Ok(View::Var(_)) => Kind::Unbound,
            _ => Kind::Bad,
        };
        match kind {
            Kind::Cut => {
                self.emit(OpCode::Cut);
                Ok(())
            }
            Kind::Atom(pi) => {
                let k = self.proc_offset(pi);
                self.emit_with(OpCode::Call, k)
            }
            Kind::Func(pi, args) => {
                for arg in args {
                    self.arg(arg)?;
                }
                let k = self.proc_offset(pi);
                self.emit_with(OpCode::Call, k)
            }
            Kind::Unbound => Err(PrologError::instantiation(self.arena, "assert/1")),
            Kind::Bad => Err(PrologError::type_error(self.arena, "callable", goal, "assert/1")),
        }
    }

    fn arg(&mut self, arg: Term) -> Result<(), PrologError> {
        enum Kind {
            Var(VarId),
            Const,
            Func(Pi, Vec<Term>),
        }
        let kind = match arg.view(self.arena) {
            Ok(View::Var(id)) => Kind::Var(id),
            Ok(View::Int(_) | View::Real(_) | View::Atom(_)) => Kind::Const,
            Ok(View::Func(ar, functor, args)) => {
                let name = ar.atom_name(functor).unwrap_or("");
                Kind::Func(Pi::new(name, args.len()), args.to_vec())
            }
            Err(_) => Kind::Const,
        };
        match kind {
            Kind::Var(id) => {
                let v = self.var_offset(id);
                self.emit_with(OpCode::Var, v)
            }
            Kind::Const => {
                let k = self.const_offset(arg);
                self.emit_with(OpCode::Const, k)
            }
            Kind::Func(pi, args) => {
                let k = self.proc_offset(pi);
                self.emit_with(OpCode::Functor, k)?;
                for a in args {
                    self.arg(a)?;
                }
                self.emit(OpCode::Pop);
                Ok(())
            }
        }
    }

    fn const_offset(&mut self, term: Term) -> usize {
        let found = self.symbols.iter().position(|s| match s {
            Symbol::Const(t) => match (t.view(self.arena), term.view(self.arena)) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
            Symbol::Proc(_) => false,
        });
        match found {
            Some(i) => i,
            None => {
                self.symbols.push(Symbol::Const(term));
                self.symbols.len() - 1
            }
        }
    }

    fn proc_offset(&mut self, pi: Pi) -> usize {
        let found = self.symbols.iter().position(|s| match s {
            Symbol::Proc(p) => *p == pi,
            Symbol::Const(_) => false,
        });
        match found {
            Some(i) => i,
            None => {
                self.symbols.push(Symbol::Proc(pi));
                self.symbols.len() - 1
            }
        }
    }

    fn var_offset(&mut self, id: VarId) -> usize {
        match self.vars.iter().position(|v| *v == id) {
            Some(i) => i,
            None => {
                self.vars.push(id);
                self.vars.len() - 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::vm::DoubleQuotes;
    use horn_terms::OperatorTable;

    fn compile(src: &str) -> (Arena, Clause) {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let term = {
            let mut parser = Parser::new(src, &mut arena, &ops, DoubleQuotes::Codes, None);
            parser.next_term().expect("parse").expect("one clause")
        };
        let clause = compile_clause(&mut arena, term).expect("compile");
        (arena, clause)
    }

    fn decode(clause: &Clause) -> Vec<(OpCode, Option<u8>)> {
        let mut out = Vec::new();
        let mut pc = 0;
        while pc < clause.bytecode.len() {
            let op = OpCode::try_from(clause.bytecode[pc]).expect("valid opcode");
            pc += 1;
            match op {
                OpCode::Const | OpCode::Var | OpCode::Functor | OpCode::Call => {
                    out.push((op, Some(clause.bytecode[pc])));
                    pc += 1;
                }
                _ => out.push((op, None)),
            }
        }
        out
    }

    #[test]
    fn facts_compile_to_head_matching_plus_exit() {
        let (_, clause) = compile("edge(a, b).");
        assert_eq!(clause.pi, Pi::new("edge", 2));
        assert_eq!(
            decode(&clause),
            vec![
                (OpCode::Const, Some(0)),
                (OpCode::Const, Some(1)),
                (OpCode::Exit, None),
            ]
        );
        assert_eq!(clause.var_slots, 0);
    }

    #[test]
    fn rules_compile_head_then_enter_then_body() {
        let (_, clause) = compile("append([H|T], L, [H|R]) :- append(T, L, R).");
        assert_eq!(clause.pi, Pi::new("append", 3));
        assert_eq!(
            decode(&clause),
            vec![
                (OpCode::Functor, Some(0)), // './2'
                (OpCode::Var, Some(0)),     // H
                (OpCode::Var, Some(1)),     // T
                (OpCode::Pop, None),
                (OpCode::Var, Some(2)), // L
                (OpCode::Functor, Some(0)),
                (OpCode::Var, Some(0)), // H
                (OpCode::Var, Some(3)), // R
                (OpCode::Pop, None),
                (OpCode::Enter, None),
                (OpCode::Var, Some(1)),
                (OpCode::Var, Some(2)),
                (OpCode::Var, Some(3)),
                (OpCode::Call, Some(1)), // append/3
                (OpCode::Exit, None),
            ]
        );
        assert_eq!(clause.var_slots, 4);
        assert!(matches!(&clause.symbols[0], Symbol::Proc(pi) if *pi == Pi::new(".", 2)));
        assert!(matches!(&clause.symbols[1], Symbol::Proc(pi) if *pi == Pi::new("append", 3)));
    }

    #[test]
    fn cut_compiles_to_its_own_opcode() {
        let (_, clause) = compile("first(X, [X|_]) :- !.");
        let ops: Vec<OpCode> = decode(&clause).into_iter().map(|(op, _)| op).collect();
        assert!(ops.contains(&OpCode::Cut));
    }

    #[test]
    fn constants_are_deduplicated() {
        let (_, clause) = compile("f(a, a, b).");
        let consts = clause
            .symbols
            .iter()
            .filter(|s| matches!(s, Symbol::Const(_)))
            .count();
        assert_eq!(consts, 2);
    }

    #[test]
    fn non_callable_heads_are_type_errors() {
        let mut arena = Arena::new();
        let term = Term::int(42);
        let err = compile_clause(&mut arena, term).unwrap_err();
        let ball = err.ball().unwrap();
        let (_, [formal, _]) = arena.unpack_func::<2>(&ball, &["error"]).unwrap();
        assert_eq!(arena.func_name(&formal).unwrap(), "type_error");
    }

    #[test]
    fn non_callable_body_goals_are_type_errors() {
        let (_arena, result) = {
            let mut arena = Arena::new();
            let ops = OperatorTable::default_table();
            let term = {
                let mut parser =
                    Parser::new("f :- 1.", &mut arena, &ops, DoubleQuotes::Codes, None);
                parser.next_term().unwrap().unwrap()
            };
            let r = compile_clause(&mut arena, term);
            (arena, r)
        };
        assert!(result.is_err());
    }
}
