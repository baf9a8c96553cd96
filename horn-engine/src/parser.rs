//! The operator-aware term parser.
//!
//! A Pratt-style precedence-climbing parser over the lexer's token
//! stream, parameterised by the live operator table.  Specifiers map
//! to left/right binding priorities (see
//! [`horn_terms::Operator::binding_priorities`]); a term at priority
//! `max` consumes a prefix operand or an atomic term and then folds in
//! infix and postfix operators whose left binding priority fits.
//!
//! The parser reads one clause at a time, terminated by an end dot,
//! and reports [`ParseError::Insufficient`] when the lexer runs out
//! mid-clause so an interactive host knows to ask for another line.
//! Variables are pooled per clause: two occurrences of the same name
//! share one variable, `_` is always fresh.  A placeholder atom may be
//! registered together with positional arguments; each occurrence is
//! substituted by the next argument.

use crate::lexer::{Lexer, Token, TokenKind};
use crate::vm::DoubleQuotes;
use horn_terms::{Arena, OperatorTable, SpecifierClass, Term, UNBOUNDED};
use smartstring::alias::String;
use std::collections::VecDeque;
use thiserror::Error;

/// A variable encountered during a parse: its written name, the term
/// standing for it, and how many times it occurred.
#[derive(Debug, Clone)]
pub struct ParsedVariable {
    pub name: String,
    pub variable: Term,
    pub uses: usize,
}

/// A syntax-level parse failure.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("unexpected token {kind:?} {text:?} at line {line}")]
    Unexpected {
        kind: TokenKind,
        text: String,
        line: usize,
    },

    /// The input ended mid-clause; more input could complete it.
    #[error("more input required")]
    Insufficient,

    #[error("integer literal out of range at line {line}")]
    IntegerOverflow { line: usize },

    #[error("malformed {what} literal at line {line}")]
    BadLiteral { what: &'static str, line: usize },

    #[error("not enough arguments for placeholders at line {line}")]
    MissingPlaceholderArg { line: usize },

    #[error("too many arguments for placeholders")]
    ExtraPlaceholderArgs,
}

impl ParseError {
    /// The source line the failure refers to, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Unexpected { line, .. }
            | ParseError::IntegerOverflow { line }
            | ParseError::BadLiteral { line, .. }
            | ParseError::MissingPlaceholderArg { line } => Some(*line),
            _ => None,
        }
    }
}

// Internal failure mode: an expectation miss is recoverable (the
// caller backtracks to another production), a fatal error is not.
enum PErr {
    Expectation,
    Fatal(ParseError),
}

type PResult<T> = Result<T, PErr>;

// A four-slot token ring, enough for the parser's worst-case lookahead.
struct TokenRing {
    buf: [Token; 4],
    start: usize,
    end: usize,
}

impl TokenRing {
    fn new() -> Self {
        Self {
            buf: [
                Token::new(TokenKind::Eof, ""),
                Token::new(TokenKind::Eof, ""),
                Token::new(TokenKind::Eof, ""),
                Token::new(TokenKind::Eof, ""),
            ],
            start: 0,
            end: 0,
        }
    }

    fn empty(&self) -> bool {
        self.start == self.end
    }

    fn put(&mut self, t: Token) {
        self.buf[self.end] = t;
        self.end = (self.end + 1) % self.buf.len();
    }

    fn get(&mut self) -> Token {
        let t = self.buf[self.start].clone();
        self.start = (self.start + 1) % self.buf.len();
        t
    }

    fn backup(&mut self) {
        self.start = (self.start + self.buf.len() - 1) % self.buf.len();
    }
}

/// The term parser.  Borrows the source text, the arena terms are
/// built in, and the operator table driving precedence decisions.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    buf: TokenRing,
    arena: &'a mut Arena,
    ops: &'a OperatorTable,
    double_quotes: DoubleQuotes,
    placeholder: Option<String>,
    placeholder_args: VecDeque<Term>,
    vars: Vec<ParsedVariable>,
    last: Token,
}

impl<'a> Parser<'a> {
    pub fn new(
        source: &'a str,
        arena: &'a mut Arena,
        ops: &'a OperatorTable,
        double_quotes: DoubleQuotes,
        conversions: Option<&'a std::collections::HashMap<char, char>>,
    ) -> Self {
        Self {
            lexer: Lexer::new(source, conversions),
            buf: TokenRing::new(),
            arena,
            ops,
            double_quotes,
            placeholder: None,
            placeholder_args: VecDeque::new(),
            vars: Vec::new(),
            last: Token::new(TokenKind::Eof, ""),
        }
    }

    /// Registers a placeholder atom and its positional substitutes.
    /// Every occurrence of the atom is replaced by the next argument;
    /// a count mismatch fails the parse.
    pub fn replace(&mut self, placeholder: &str, args: Vec<Term>) {
        self.placeholder = Some(String::from(placeholder));
        self.placeholder_args = args.into();
    }

    /// The variables pooled while parsing the most recent clause.
    pub fn variables(&self) -> &[ParsedVariable] {
        &self.vars
    }

    /// The byte offset just past the most recently consumed token; a
    /// clean resume point after an end dot.
    pub fn offset(&self) -> usize {
        self.lexer.offset()
    }

    /// The current (1-based) source line.
    pub fn line_no(&self) -> usize {
        self.lexer.line_no()
    }

    fn next(&mut self) -> Token {
        if self.buf.empty() {
            let t = self.lexer.token();
            self.last = t.clone();
            self.buf.put(t);
        }
        self.buf.get()
    }

    fn backup(&mut self) {
        self.buf.backup();
    }

    /// Whether more clauses may follow.
    pub fn more(&mut self) -> bool {
        let t = self.next();
        self.backup();
        !matches!(t.kind, TokenKind::Eof | TokenKind::Insufficient)
    }

    /// Parses one clause terminated by an end dot.  Returns `Ok(None)`
    /// at the end of input.
    pub fn next_term(&mut self) -> Result<Option<Term>, ParseError> {
        self.vars.clear();

        let t = self.next();
        if t.kind == TokenKind::Eof {
            return Ok(None);
        }
        self.backup();

        let term = match self.term(1201) {
            Ok(t) => t,
            Err(PErr::Fatal(e)) => return Err(e),
            Err(PErr::Expectation) => {
                return Err(self.expectation_error());
            }
        };

        let t = self.next();
        match t.kind {
            TokenKind::End => {}
            TokenKind::Eof | TokenKind::Insufficient => return Err(ParseError::Insufficient),
            _ => {
                self.backup();
                return Err(ParseError::Unexpected {
                    kind: t.kind,
                    text: t.text,
                    line: self.lexer.line_no(),
                });
            }
        }

        if !self.placeholder_args.is_empty() {
            return Err(ParseError::ExtraPlaceholderArgs);
        }

        Ok(Some(term))
    }

    fn expectation_error(&mut self) -> ParseError {
        match self.last.kind {
            TokenKind::Eof | TokenKind::Insufficient => ParseError::Insufficient,
            _ => ParseError::Unexpected {
                kind: self.last.kind,
                text: self.last.text.clone(),
                line: self.lexer.line_no(),
            },
        }
    }

    // --- the Pratt loop --------------------------------------------------

    fn term(&mut self, max_priority: u16) -> PResult<Term> {
        let mut lhs = {
            let t = self.next();
            let is_sign = t.kind == TokenKind::Sign;
            self.backup();
            if is_sign {
                // A sign adjacent to a digit is part of the literal.
                self.term0()?
            } else {
                match self.prefix(max_priority) {
                    Some(op) => {
                        let (_, rbp) = op.binding_priorities();
                        let name = op.name.clone();
                        match self.term(rbp) {
                            Ok(arg) => Term::func(self.arena, name.as_str(), [arg]),
                            Err(PErr::Expectation) => self.arena.atom(name.as_str()),
                            Err(fatal) => return Err(fatal),
                        }
                    }
                    None => self.term0()?,
                }
            }
        };

        loop {
            let Some(op) = self.infix(max_priority) else {
                break;
            };
            let (_, rbp) = op.binding_priorities();
            let name = op.name.clone();
            if rbp == UNBOUNDED {
                // Postfix.
                lhs = Term::func(self.arena, name.as_str(), [lhs]);
            } else {
                let rhs = self.term(rbp)?;
                lhs = Term::func(self.arena, name.as_str(), [lhs, rhs]);
            }
        }

        Ok(lhs)
    }

    /// Tries to consume a prefix operator applicable under
    /// `max_priority`.  Restores the token stream and returns `None`
    /// when the upcoming tokens are not a prefix operator application.
    fn prefix(&mut self, max_priority: u16) -> Option<horn_terms::Operator> {
        let name = self.op_name(max_priority)?;

        // A functor application binds tighter than any operator.
        let t = self.next();
        if t.kind == TokenKind::OpenCT {
            self.backup();
            self.backup();
            return None;
        }
        self.backup();

        match self.ops.prefix(name.as_str(), max_priority) {
            Some(op) => Some(op.clone()),
            None => {
                self.backup();
                None
            }
        }
    }

    /// Tries to consume an infix or postfix operator applicable under
    /// `max_priority`.
    fn infix(&mut self, max_priority: u16) -> Option<horn_terms::Operator> {
        let name = self.op_name(max_priority)?;
        match self.ops.infix_or_postfix(name.as_str(), max_priority) {
            Some(op) if op.specifier.class() != SpecifierClass::Prefix => Some(op.clone()),
            _ => {
                self.backup();
                None
            }
        }
    }

    /// Consumes a token usable as an operator name.  The comma is an
    /// operator only at priority 1000 and above.
    fn op_name(&mut self, max_priority: u16) -> Option<String> {
        if let Ok(name) = self.atom_name() {
            match name.as_str() {
                // `[]` and `{}` are atoms, never operators; un-consume.
                "[]" | "{}" => {
                    self.backup();
                    self.backup();
                    return None;
                }
                _ => return Some(name),
            }
        }

        let t = self.next();
        match t.kind {
            TokenKind::Comma if max_priority >= 1000 => Some(String::from(",")),
            TokenKind::Bar => Some(String::from("|")),
            _ => {
                self.backup();
                None
            }
        }
    }

    // --- primaries -------------------------------------------------------

    fn term0(&mut self) -> PResult<Term> {
        let t = self.next();
        match t.kind {
            TokenKind::Open | TokenKind::OpenCT => {
                let inner = self.term(1201)?;
                let t = self.next();
                if t.kind != TokenKind::Close {
                    self.backup();
                    return Err(PErr::Expectation);
                }
                return Ok(inner);
            }
            TokenKind::Integer => return self.parse_integer(1, &t.text),
            TokenKind::FloatNumber => return self.parse_float(1.0, &t.text),
            TokenKind::Sign => {
                let sign = t.text.clone();
                let t = self.next();
                match t.kind {
                    TokenKind::Integer => {
                        let s = if sign == "-" { -1 } else { 1 };
                        return self.parse_integer(s, &t.text);
                    }
                    TokenKind::FloatNumber => {
                        let s = if sign == "-" { -1.0 } else { 1.0 };
                        return self.parse_float(s, &t.text);
                    }
                    _ => {
                        self.backup();
                        return self.atom_then_args(sign);
                    }
                }
            }
            TokenKind::Variable => {
                if t.text == "_" {
                    return Ok(self.arena.fresh_var(None));
                }
                for pv in &mut self.vars {
                    if pv.name == t.text {
                        pv.uses += 1;
                        return Ok(pv.variable);
                    }
                }
                let v = self.arena.fresh_var(Some(t.text.as_str()));
                self.vars.push(ParsedVariable {
                    name: t.text,
                    variable: v,
                    uses: 1,
                });
                return Ok(v);
            }
            TokenKind::OpenList => {
                let t = self.next();
                if t.kind == TokenKind::CloseList {
                    self.backup();
                    self.backup();
                    // fall through: `[]` parses as an atom
                } else {
                    self.backup();
                    return self.list();
                }
            }
            TokenKind::OpenCurly => {
                let t = self.next();
                if t.kind == TokenKind::CloseCurly {
                    self.backup();
                    self.backup();
                    // fall through: `{}` parses as an atom
                } else {
                    self.backup();
                    return self.curly();
                }
            }
            TokenKind::DoubleQuotedList => match self.double_quotes {
                DoubleQuotes::Chars => {
                    let chars: Vec<Term> = t
                        .text
                        .chars()
                        .map(|c| self.arena.atom(c.to_string()))
                        .collect();
                    return Ok(self.arena.list(chars));
                }
                DoubleQuotes::Codes => {
                    let codes: Vec<Term> =
                        t.text.chars().map(|c| Term::int(c as u32 as i64)).collect();
                    return Ok(self.arena.list(codes));
                }
                DoubleQuotes::Atom => {
                    self.backup();
                    // fall through: the literal reads as an atom
                }
            },
            _ => {
                self.backup();
            }
        }

        let name = self.atom_name()?;
        self.atom_then_args(name)
    }

    fn atom_then_args(&mut self, name: String) -> PResult<Term> {
        let term = self.functional_notation(name.as_str())?;

        if let Some(ph) = &self.placeholder {
            if term.is_atom() && name == *ph {
                return match self.placeholder_args.pop_front() {
                    Some(arg) => Ok(arg),
                    None => Err(PErr::Fatal(ParseError::MissingPlaceholderArg {
                        line: self.lexer.line_no(),
                    })),
                };
            }
        }

        Ok(term)
    }

    /// A token sequence naming an atom: a name token, `[]`, `{}`, or a
    /// double-quoted literal under the `atom` flag.
    fn atom_name(&mut self) -> PResult<String> {
        if let Ok(name) = self.name() {
            return Ok(name);
        }

        let t = self.next();
        match t.kind {
            TokenKind::OpenList => {
                let t = self.next();
                if t.kind == TokenKind::CloseList {
                    Ok(String::from("[]"))
                } else {
                    self.backup();
                    self.backup();
                    Err(PErr::Expectation)
                }
            }
            TokenKind::OpenCurly => {
                let t = self.next();
                if t.kind == TokenKind::CloseCurly {
                    Ok(String::from("{}"))
                } else {
                    self.backup();
                    self.backup();
                    Err(PErr::Expectation)
                }
            }
            TokenKind::DoubleQuotedList if self.double_quotes == DoubleQuotes::Atom => Ok(t.text),
            _ => {
                self.backup();
                Err(PErr::Expectation)
            }
        }
    }

    fn name(&mut self) -> PResult<String> {
        let t = self.next();
        match t.kind {
            TokenKind::LetterDigit
            | TokenKind::Graphic
            | TokenKind::Semicolon
            | TokenKind::Cut
            | TokenKind::Sign
            | TokenKind::Quoted => Ok(t.text),
            _ => {
                self.backup();
                Err(PErr::Expectation)
            }
        }
    }

    fn list(&mut self) -> PResult<Term> {
        let mut items = vec![self.term(999)?];
        loop {
            let t = self.next();
            match t.kind {
                TokenKind::Comma => items.push(self.term(999)?),
                TokenKind::Bar => {
                    let tail = self.term(999)?;
                    let t = self.next();
                    if t.kind != TokenKind::CloseList {
                        self.backup();
                        return Err(PErr::Expectation);
                    }
                    return Ok(self.arena.partial_list(items, tail));
                }
                TokenKind::CloseList => return Ok(self.arena.list(items)),
                _ => {
                    self.backup();
                    return Err(PErr::Expectation);
                }
            }
        }
    }

    fn curly(&mut self) -> PResult<Term> {
        let inner = self.term(1201)?;
        let t = self.next();
        if t.kind != TokenKind::CloseCurly {
            self.backup();
            return Err(PErr::Expectation);
        }
        Ok(Term::func(self.arena, "{}", [inner]))
    }

    fn functional_notation(&mut self, functor: &str) -> PResult<Term> {
        let t = self.next();
        if t.kind != TokenKind::OpenCT {
            self.backup();
            return Ok(self.arena.atom(functor));
        }

        let mut args = vec![self.term(999)?];
        loop {
            let t = self.next();
            match t.kind {
                TokenKind::Comma => args.push(self.term(999)?),
                TokenKind::Close => return Ok(Term::func(self.arena, functor, args)),
                _ => {
                    self.backup();
                    return Err(PErr::Expectation);
                }
            }
        }
    }

    // --- literals --------------------------------------------------------

    fn parse_integer(&mut self, sign: i64, text: &str) -> PResult<Term> {
        let line = self.lexer.line_no();
        let (radix, digits) = match text.get(..2) {
            Some("0x") => (16, &text[2..]),
            Some("0o") => (8, &text[2..]),
            Some("0b") => (2, &text[2..]),
            _ => (10, text),
        };
        let magnitude = u64::from_str_radix(digits, radix)
            .map_err(|_| PErr::Fatal(ParseError::IntegerOverflow { line }))?;
        let value = if sign < 0 {
            if magnitude == (i64::MAX as u64) + 1 {
                i64::MIN
            } else if magnitude <= i64::MAX as u64 {
                -(magnitude as i64)
            } else {
                return Err(PErr::Fatal(ParseError::IntegerOverflow { line }));
            }
        } else {
            if magnitude > i64::MAX as u64 {
                return Err(PErr::Fatal(ParseError::IntegerOverflow { line }));
            }
            magnitude as i64
        };
        Ok(Term::int(value))
    }

    fn parse_float(&mut self, sign: f64, text: &str) -> PResult<Term> {
        let line = self.lexer.line_no();
        let value: f64 = text.parse().map_err(|_| {
            PErr::Fatal(ParseError::BadLiteral {
                what: "float",
                line,
            })
        })?;
        Ok(Term::real(sign * value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn_terms::{Env, View, WriteOptions};

    fn parse_all(src: &str) -> (Arena, Vec<Term>) {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let mut terms = Vec::new();
        {
            let mut parser = Parser::new(src, &mut arena, &ops, DoubleQuotes::Codes, None);
            while let Some(t) = parser.next_term().expect("parse error") {
                terms.push(t);
            }
        }
        (arena, terms)
    }

    fn shown(src: &str) -> std::string::String {
        let (arena, terms) = parse_all(src);
        let env = Env::new();
        let ops = OperatorTable::default_table();
        terms
            .iter()
            .map(|t| {
                format!(
                    "{}",
                    t.display_with(&arena, &env, WriteOptions::with_ops(&ops))
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn facts_and_rules_parse() {
        let (arena, terms) = parse_all("edge(a, b). path(X, Y) :- edge(X, Y).");
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].indicator(&arena).unwrap(), ("edge", 2));
        assert_eq!(terms[1].indicator(&arena).unwrap(), (":-", 2));
    }

    #[test]
    fn operator_priorities_shape_the_tree() {
        let (arena, terms) = parse_all("X = 2*2+2.");
        let (_, [_, rhs]) = arena.unpack_func::<2>(&terms[0], &["="]).unwrap();
        let (_, [lhs, _]) = arena.unpack_func::<2>(&rhs, &["+"]).unwrap();
        assert_eq!(arena.func_name(&lhs).unwrap(), "*");
    }

    #[test]
    fn parens_override_priorities() {
        let (arena, terms) = parse_all("X = 2*(2+2).");
        let (_, [_, rhs]) = arena.unpack_func::<2>(&terms[0], &["="]).unwrap();
        let (_, [_, inner]) = arena.unpack_func::<2>(&rhs, &["*"]).unwrap();
        assert_eq!(arena.func_name(&inner).unwrap(), "+");
    }

    #[test]
    fn round_trip_modulo_whitespace() {
        assert_eq!(shown("X = 2*2+2."), "X=2*2+2");
        assert_eq!(shown("X = 2*(2+2)."), "X=2*(2+2)");
        assert_eq!(shown("f(a, [1, 2|T])."), "f(a, [1, 2|T])");
    }

    #[test]
    fn right_associativity_of_conjunction() {
        let (arena, terms) = parse_all("a :- b, c, d.");
        let (_, [_, body]) = arena.unpack_func::<2>(&terms[0], &[":-"]).unwrap();
        let (_, [first, rest]) = arena.unpack_func::<2>(&body, &[","]).unwrap();
        assert_eq!(arena.atom_name(&first).unwrap(), "b");
        let (_, [second, third]) = arena.unpack_func::<2>(&rest, &[","]).unwrap();
        assert_eq!(arena.atom_name(&second).unwrap(), "c");
        assert_eq!(arena.atom_name(&third).unwrap(), "d");
    }

    #[test]
    fn named_variables_share_identity_per_clause() {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let mut parser = Parser::new("f(X, X, Y, _, _).", &mut arena, &ops, DoubleQuotes::Codes, None);
        let t = parser.next_term().unwrap().unwrap();
        let vars: Vec<_> = parser.variables().to_vec();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].name, "X");
        assert_eq!(vars[0].uses, 2);
        assert_eq!(vars[1].name, "Y");
        let (_, args) = arena.unpack_func_any(&t, &["f"]).unwrap();
        assert_eq!(args[0], args[1]);
        assert_ne!(args[3], args[4]);
    }

    #[test]
    fn negative_literals_fuse_only_when_adjacent() {
        let (arena, terms) = parse_all("X = -1.");
        let (_, [_, n]) = arena.unpack_func::<2>(&terms[0], &["="]).unwrap();
        assert_eq!(arena.unpack_int(&n).unwrap(), -1);

        let (arena, terms) = parse_all("X = - 1.");
        let (_, [_, n]) = arena.unpack_func::<2>(&terms[0], &["="]).unwrap();
        let (_, [inner]) = arena.unpack_func::<1>(&n, &["-"]).unwrap();
        assert_eq!(arena.unpack_int(&inner).unwrap(), 1);
    }

    #[test]
    fn infix_minus_with_adjacent_digit() {
        let (arena, terms) = parse_all("X = 3-1.");
        let (_, [_, d]) = arena.unpack_func::<2>(&terms[0], &["="]).unwrap();
        let (_, [l, r]) = arena.unpack_func::<2>(&d, &["-"]).unwrap();
        assert_eq!(arena.unpack_int(&l).unwrap(), 3);
        assert_eq!(arena.unpack_int(&r).unwrap(), 1);
    }

    #[test]
    fn curly_terms_wrap_their_inner_term() {
        let (arena, terms) = parse_all("{a, b}.");
        let (_, [inner]) = arena.unpack_func::<1>(&terms[0], &["{}"]).unwrap();
        assert_eq!(arena.func_name(&inner).unwrap(), ",");
    }

    #[test]
    fn double_quotes_flag_controls_expansion() {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let env = Env::new();

        let t = {
            let mut p = Parser::new("\"ab\".", &mut arena, &ops, DoubleQuotes::Codes, None);
            p.next_term().unwrap().unwrap()
        };
        let items = horn_terms::proper_list_vec(&arena, &env, t).unwrap();
        assert_eq!(arena.unpack_int(&items[0]).unwrap(), 97);

        let t = {
            let mut p = Parser::new("\"ab\".", &mut arena, &ops, DoubleQuotes::Chars, None);
            p.next_term().unwrap().unwrap()
        };
        let items = horn_terms::proper_list_vec(&arena, &env, t).unwrap();
        assert_eq!(arena.atom_name(&items[0]).unwrap(), "a");

        let t = {
            let mut p = Parser::new("\"ab\".", &mut arena, &ops, DoubleQuotes::Atom, None);
            p.next_term().unwrap().unwrap()
        };
        assert_eq!(arena.atom_name(&t).unwrap(), "ab");
    }

    #[test]
    fn placeholders_substitute_positionally() {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let one = Term::int(1);
        let two = Term::int(2);
        let mut parser = Parser::new("f(?, ?).", &mut arena, &ops, DoubleQuotes::Codes, None);
        parser.replace("?", vec![one, two]);
        let t = parser.next_term().unwrap().unwrap();
        let (_, [a, b]) = arena.unpack_func::<2>(&t, &["f"]).unwrap();
        assert_eq!(arena.unpack_int(&a).unwrap(), 1);
        assert_eq!(arena.unpack_int(&b).unwrap(), 2);
    }

    #[test]
    fn placeholder_count_mismatch_fails() {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let mut parser = Parser::new("f(?).", &mut arena, &ops, DoubleQuotes::Codes, None);
        parser.replace("?", vec![]);
        assert!(matches!(
            parser.next_term(),
            Err(ParseError::MissingPlaceholderArg { .. })
        ));

        let mut parser = Parser::new("f(a).", &mut arena, &ops, DoubleQuotes::Codes, None);
        parser.replace("?", vec![Term::int(1)]);
        assert!(matches!(
            parser.next_term(),
            Err(ParseError::ExtraPlaceholderArgs)
        ));
    }

    #[test]
    fn insufficient_input_is_reported() {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let mut parser = Parser::new("f(a", &mut arena, &ops, DoubleQuotes::Codes, None);
        assert!(matches!(
            parser.next_term(),
            Err(ParseError::Insufficient)
        ));
        let mut parser = Parser::new("f(a)", &mut arena, &ops, DoubleQuotes::Codes, None);
        assert!(matches!(
            parser.next_term(),
            Err(ParseError::Insufficient)
        ));
    }

    #[test]
    fn cut_and_semicolon_parse_as_atoms() {
        let (arena, terms) = parse_all("a :- b, !.");
        let (_, [_, body]) = arena.unpack_func::<2>(&terms[0], &[":-"]).unwrap();
        let (_, [_, cut]) = arena.unpack_func::<2>(&body, &[","]).unwrap();
        assert_eq!(arena.atom_name(&cut).unwrap(), "!");

        let (arena, terms) = parse_all("a :- b ; c.");
        let (_, [_, body]) = arena.unpack_func::<2>(&terms[0], &[":-"]).unwrap();
        assert_eq!(arena.func_name(&body).unwrap(), ";");
    }

    #[test]
    fn quoted_atoms_parse_with_escapes() {
        let (arena, terms) = parse_all("x('hello world').");
        let (_, [a]) = arena.unpack_func::<1>(&terms[0], &["x"]).unwrap();
        assert_eq!(arena.atom_name(&a).unwrap(), "hello world");
    }

    #[test]
    fn multiple_clauses_offsets_track_resume_points() {
        let mut arena = Arena::new();
        let ops = OperatorTable::default_table();
        let src = "a. b.";
        let mut parser = Parser::new(src, &mut arena, &ops, DoubleQuotes::Codes, None);
        parser.next_term().unwrap().unwrap();
        assert_eq!(&src[..parser.offset()], "a.");
        parser.next_term().unwrap().unwrap();
        parser.next_term().unwrap();
    }
}
