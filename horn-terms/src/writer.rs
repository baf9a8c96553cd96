//! The term writer: turns a term back into a token stream.
//!
//! [`write_term`] walks a term under an environment and emits
//! [`WriteToken`]s to a caller-supplied emitter.  The caller decides
//! how to join them; [`crate::TermDisplay`] provides the standard
//! whitespace-sensitive joining for `fmt::Display`.
//!
//! Lists and curly blocks print in their surface syntax, operator
//! compounds print through the operator table with parentheses exactly
//! where the ambient priority requires them, and `'$VAR'(N)` renders as
//! a generated variable name when `number_vars` is on.  The writer is
//! cycle-safe: a depth cap turns any runaway nesting into a `...`
//! token instead of a hang.

use crate::{Arena, Env, Operator, OperatorTable, Term, View};
use smartstring::alias::String;

// Nesting bound applied even when the caller sets no max_depth.  Deep
// enough for any sane term; cyclic graphs hit it and degrade to `...`.
const DEPTH_CAP: usize = 2048;

const GRAPHIC_CHARS: &str = "#$&*+-./:<=>?@^~\\";

/// A token emitted by the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteToken {
    /// An atom that needs no quoting.
    Atom(String),
    /// An atom rendered quoted; the payload is the escaped content
    /// without the surrounding quotes.
    Quoted(String),
    /// A variable name.
    Variable(String),
    Int(i64),
    Real(f64),
    Open,
    Close,
    OpenList,
    CloseList,
    OpenCurly,
    CloseCurly,
    Comma,
    Bar,
    /// An explicit separating space, emitted where adjacency would
    /// change how the text reads back (a prefix sign before a number).
    Space,
    /// Stands in for structure beyond the depth limit.
    Ellipsis,
}

/// Options controlling how a term is written.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions<'a> {
    /// Quote atoms that need quoting to read back.
    pub quoted: bool,
    /// Print everything in canonical functional notation, ignoring
    /// operator declarations and list/curly sugar.
    pub ignore_ops: bool,
    /// Render `'$VAR'(N)` as a generated variable name.
    pub number_vars: bool,
    /// The ambient priority; operator compounds of higher priority are
    /// parenthesised.
    pub priority: u16,
    /// Nesting depth at which subterms are elided; `0` means no
    /// caller-imposed limit.
    pub max_depth: usize,
    /// Operator declarations used for operator rendering.
    pub ops: Option<&'a OperatorTable>,
}

impl Default for WriteOptions<'_> {
    fn default() -> Self {
        Self {
            quoted: false,
            ignore_ops: false,
            number_vars: false,
            priority: 1200,
            max_depth: 0,
            ops: None,
        }
    }
}

impl<'a> WriteOptions<'a> {
    /// Options with operator rendering against the given table.
    pub fn with_ops(ops: &'a OperatorTable) -> Self {
        Self {
            ops: Some(ops),
            ..Default::default()
        }
    }

    fn depth_limit(&self) -> usize {
        if self.max_depth == 0 {
            DEPTH_CAP
        } else {
            self.max_depth.min(DEPTH_CAP)
        }
    }
}

/// Writes `term` under `env` as a stream of tokens.
pub fn write_term(
    arena: &Arena,
    env: &Env,
    term: Term,
    opts: &WriteOptions,
    emit: &mut dyn FnMut(WriteToken),
) {
    write(arena, env, term, opts, opts.priority, 0, emit);
}

fn write(
    arena: &Arena,
    env: &Env,
    term: Term,
    opts: &WriteOptions,
    priority: u16,
    depth: usize,
    emit: &mut dyn FnMut(WriteToken),
) {
    if depth >= opts.depth_limit() {
        emit(WriteToken::Ellipsis);
        return;
    }
    let term = env.resolve(term);
    let Ok(view) = term.view(arena) else {
        emit(WriteToken::Atom("<invalid>".into()));
        return;
    };
    match view {
        View::Int(i) => emit(WriteToken::Int(i)),
        View::Real(r) => emit(WriteToken::Real(r)),
        View::Var(id) => {
            let name = match arena.var_name(id) {
                Some(n) => String::from(n),
                None => String::from(format!("{id}")),
            };
            emit(WriteToken::Variable(name));
        }
        View::Atom(name) => emit(atom_token(opts, name)),
        View::Func(_, functor, args) => {
            let name = arena.atom_name(functor).unwrap_or("<invalid>");
            if !opts.ignore_ops && name == "." && args.len() == 2 {
                write_list(arena, env, term, opts, depth, emit);
                return;
            }
            write_func(arena, env, name, args, opts, priority, depth, emit);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn write_func(
    arena: &Arena,
    env: &Env,
    name: &str,
    args: &[Term],
    opts: &WriteOptions,
    priority: u16,
    depth: usize,
    emit: &mut dyn FnMut(WriteToken),
) {
    if !opts.ignore_ops && name == "{}" && args.len() == 1 {
        emit(WriteToken::OpenCurly);
        write(arena, env, args[0], opts, 1201, depth + 1, emit);
        emit(WriteToken::CloseCurly);
        return;
    }

    if let Some(op) = operator_for(opts, name, args.len()) {
        let (left, right) = op.argument_priorities();
        let wrap = op.priority > priority;
        if wrap {
            emit(WriteToken::Open);
        }
        match (left, right) {
            // Prefix operator.
            (None, Some(rp)) => {
                emit(atom_token(opts, name));
                if (name == "-" || name == "+") && env.resolve(args[0]).is_number() {
                    emit(WriteToken::Space);
                }
                write(arena, env, args[0], opts, rp, depth + 1, emit);
            }
            // Postfix operator.
            (Some(lp), None) => {
                write(arena, env, args[0], opts, lp, depth + 1, emit);
                emit(atom_token(opts, name));
            }
            // Infix operator.
            (Some(lp), Some(rp)) => {
                write(arena, env, args[0], opts, lp, depth + 1, emit);
                if name == "," {
                    emit(WriteToken::Comma);
                } else {
                    emit(atom_token(opts, name));
                }
                write(arena, env, args[1], opts, rp, depth + 1, emit);
            }
            (None, None) => unreachable!(),
        }
        if wrap {
            emit(WriteToken::Close);
        }
        return;
    }

    if opts.number_vars && name == "$VAR" && args.len() == 1 {
        if let Ok(View::Int(n)) = env.resolve(args[0]).view(arena) {
            if n >= 0 {
                emit(WriteToken::Variable(numbered_var_name(n)));
                return;
            }
        }
    }

    emit(atom_token(opts, name));
    emit(WriteToken::Open);
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            emit(WriteToken::Comma);
        }
        write(arena, env, *arg, opts, 999, depth + 1, emit);
    }
    emit(WriteToken::Close);
}

/// Prints `[a, b | t]` sugar, walking the cons chain with Brent's
/// cycle detection so a tied tail degrades to `| ...` instead of
/// looping.  Element depth is constant: list length does not count
/// against the nesting limit.
fn write_list(
    arena: &Arena,
    env: &Env,
    list: Term,
    opts: &WriteOptions,
    depth: usize,
    emit: &mut dyn FnMut(WriteToken),
) {
    emit(WriteToken::OpenList);
    let mut hare = env.resolve(list);
    let mut tortoise = hare;
    let mut power = 1usize;
    let mut lam = 1usize;
    let mut first = true;
    loop {
        enum Step {
            Element(Term, Term),
            End,
            Tail,
        }
        let step = match hare.view(arena) {
            Ok(View::Func(ar, functor, cell))
                if cell.len() == 2 && ar.atom_name(functor) == Ok(".") =>
            {
                Step::Element(cell[0], cell[1])
            }
            Ok(View::Atom("[]")) => Step::End,
            _ => Step::Tail,
        };
        match step {
            Step::Element(head, tail) => {
                if !first {
                    emit(WriteToken::Comma);
                }
                first = false;
                write(arena, env, head, opts, 999, depth + 1, emit);
                hare = env.resolve(tail);
            }
            Step::End => break,
            Step::Tail => {
                emit(WriteToken::Bar);
                write(arena, env, hare, opts, 999, depth + 1, emit);
                break;
            }
        }
        if tortoise == hare {
            emit(WriteToken::Bar);
            emit(WriteToken::Ellipsis);
            break;
        }
        if power == lam {
            tortoise = hare;
            power *= 2;
            lam = 0;
        }
        lam += 1;
    }
    emit(WriteToken::CloseList);
}

fn operator_for<'b>(opts: &WriteOptions<'b>, name: &str, arity: usize) -> Option<&'b Operator> {
    if opts.ignore_ops || arity > 2 {
        return None;
    }
    opts.ops?.lookup_arity(name, arity)
}

/// The generated name for `'$VAR'(N)`: letters cycle A..Z, with the
/// cycle count appended from the second round on (0 → A, 25 → Z,
/// 26 → A1, 27 → B1, …).
fn numbered_var_name(n: i64) -> String {
    const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let i = (n % 26) as usize;
    let j = n / 26;
    if j == 0 {
        String::from(core::str::from_utf8(&LETTERS[i..=i]).unwrap_or("A"))
    } else {
        String::from(format!(
            "{}{}",
            LETTERS[i] as char,
            j
        ))
    }
}

fn atom_token(opts: &WriteOptions, name: &str) -> WriteToken {
    if opts.quoted && needs_quoting(name) {
        WriteToken::Quoted(escape_atom(name))
    } else {
        WriteToken::Atom(String::from(name))
    }
}

fn needs_quoting(name: &str) -> bool {
    if matches!(name, "[]" | "{}" | "!" | ";") {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if first.is_ascii_lowercase() {
        return !chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    }
    !name.chars().all(|c| GRAPHIC_CHARS.contains(c))
}

fn escape_atom(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0B' => out.push_str("\\v"),
            '\x0C' => out.push_str("\\f"),
            c if c.is_control() => {
                out.push_str(&format!("\\x{:x}\\", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Renders a float so that it reads back as a float: a decimal point
/// or an exponent with a pointed mantissa is always present.
pub(crate) fn format_real(r: f64) -> String {
    let s = format!("{r}");
    if let Some(epos) = s.find('e') {
        if s[..epos].contains('.') {
            String::from(s)
        } else {
            String::from(format!("{}.0{}", &s[..epos], &s[epos..]))
        }
    } else if s.contains('.') || s.contains("inf") || s.contains("NaN") {
        String::from(s)
    } else {
        String::from(format!("{s}.0"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{func, list, unify, OperatorTable};

    fn tokens(arena: &Arena, env: &Env, t: Term, opts: &WriteOptions) -> Vec<WriteToken> {
        let mut out = Vec::new();
        write_term(arena, env, t, opts, &mut |tok| out.push(tok));
        out
    }

    #[test]
    fn atoms_and_numbers() {
        let mut arena = Arena::new();
        let env = Env::new();
        let a = arena.atom("abc");
        assert_eq!(
            tokens(&arena, &env, a, &WriteOptions::default()),
            [WriteToken::Atom("abc".into())]
        );
        assert_eq!(
            tokens(&arena, &env, Term::int(-7), &WriteOptions::default()),
            [WriteToken::Int(-7)]
        );
    }

    #[test]
    fn quoting_kicks_in_only_when_needed() {
        let mut arena = Arena::new();
        let env = Env::new();
        let plain = arena.atom("abc");
        let spaced = arena.atom("hello world");
        let graphic = arena.atom(":-");
        let opts = WriteOptions {
            quoted: true,
            ..Default::default()
        };
        assert_eq!(
            tokens(&arena, &env, plain, &opts),
            [WriteToken::Atom("abc".into())]
        );
        assert_eq!(
            tokens(&arena, &env, spaced, &opts),
            [WriteToken::Quoted("hello world".into())]
        );
        assert_eq!(
            tokens(&arena, &env, graphic, &opts),
            [WriteToken::Atom(":-".into())]
        );
    }

    #[test]
    fn lists_print_with_sugar() {
        let mut arena = Arena::new();
        let env = Env::new();
        let l = list![1, 2 => &mut arena];
        assert_eq!(
            tokens(&arena, &env, l, &WriteOptions::default()),
            [
                WriteToken::OpenList,
                WriteToken::Int(1),
                WriteToken::Comma,
                WriteToken::Int(2),
                WriteToken::CloseList,
            ]
        );
    }

    #[test]
    fn partial_lists_print_their_tail() {
        let mut arena = Arena::new();
        let env = Env::new();
        let x = arena.fresh_var(Some("T"));
        let l = arena.partial_list([Term::int(1)], x);
        assert_eq!(
            tokens(&arena, &env, l, &WriteOptions::default()),
            [
                WriteToken::OpenList,
                WriteToken::Int(1),
                WriteToken::Bar,
                WriteToken::Variable("T".into()),
                WriteToken::CloseList,
            ]
        );
    }

    #[test]
    fn ignore_ops_prints_canonically() {
        let mut arena = Arena::new();
        let env = Env::new();
        let l = list![1 => &mut arena];
        let opts = WriteOptions {
            ignore_ops: true,
            ..Default::default()
        };
        assert_eq!(
            tokens(&arena, &env, l, &opts),
            [
                WriteToken::Atom(".".into()),
                WriteToken::Open,
                WriteToken::Int(1),
                WriteToken::Comma,
                WriteToken::Atom("[]".into()),
                WriteToken::Close,
            ]
        );
    }

    #[test]
    fn operator_parenthesisation_follows_priorities() {
        let mut arena = Arena::new();
        let env = Env::new();
        let table = OperatorTable::default_table();
        // 2*2+2 : +(*(2,2), 2) — no parens needed.
        let m = func!("*"; 2, 2 => &mut arena);
        let t = func!("+"; m, 2 => &mut arena);
        let opts = WriteOptions::with_ops(&table);
        let toks = tokens(&arena, &env, t, &opts);
        assert!(!toks.contains(&WriteToken::Open), "{toks:?}");
        // 2*(2+2) : *(2, +(2,2)) — parens around the sum.
        let s = func!("+"; 2, 2 => &mut arena);
        let t = func!("*"; 2, s => &mut arena);
        let toks = tokens(&arena, &env, t, &opts);
        assert!(toks.contains(&WriteToken::Open), "{toks:?}");
    }

    #[test]
    fn prefix_minus_before_a_number_is_spaced() {
        let mut arena = Arena::new();
        let env = Env::new();
        let table = OperatorTable::default_table();
        let t = func!("-"; 1 => &mut arena);
        let toks = tokens(&arena, &env, t, &WriteOptions::with_ops(&table));
        assert_eq!(
            toks,
            [
                WriteToken::Atom("-".into()),
                WriteToken::Space,
                WriteToken::Int(1),
            ]
        );
    }

    #[test]
    fn numbervars_names_follow_the_alphabet() {
        let mut arena = Arena::new();
        let env = Env::new();
        let opts = WriteOptions {
            number_vars: true,
            ..Default::default()
        };
        for (n, expected) in [(0, "A"), (1, "B"), (25, "Z"), (26, "A1"), (27, "B1")] {
            let t = func!("$VAR"; n => &mut arena);
            assert_eq!(
                tokens(&arena, &env, t, &opts),
                [WriteToken::Variable(expected.into())]
            );
        }
    }

    #[test]
    fn cyclic_terms_do_not_hang_the_writer() {
        let mut arena = Arena::new();
        let x = arena.fresh_var(None);
        let cell = arena.partial_list([Term::int(1)], x);
        let (env, ok) = unify(&arena, &Env::new(), x, cell, false);
        assert!(ok);
        let opts = WriteOptions {
            max_depth: 8,
            ..Default::default()
        };
        let toks = tokens(&arena, &env, cell, &opts);
        assert!(toks.contains(&WriteToken::Ellipsis));
    }

    #[test]
    fn reals_always_read_back_as_reals() {
        assert_eq!(format_real(1.5).as_str(), "1.5");
        assert_eq!(format_real(2.0).as_str(), "2.0");
        let huge = format_real(1e300);
        assert!(huge.contains('.') || huge.contains('e'));
    }
}
