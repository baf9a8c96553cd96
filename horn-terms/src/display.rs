//! Defines [`TermDisplay`], a formatter for rendering [`Term`] values.
//!
//! Joins the token stream produced by the writer into text, inserting
//! whitespace exactly where adjacent tokens would otherwise fuse when
//! read back (two name tokens, two graphic tokens, a sign before a
//! number).

use crate::writer::format_real;
use crate::{write_term, Arena, Env, Term, WriteOptions, WriteToken};
use std::fmt;

/// A wrapper that ties together a [`Term`], its [`Arena`], an optional
/// [`Env`], and [`WriteOptions`], forming the basis for configurable
/// pretty-printing.
///
/// It implements [`fmt::Display`], so it can be used with standard
/// formatting macros (`format!`, `println!`, etc.) to render terms.
///
/// Construct instances via [`Term::display`] or [`Term::display_with`].
pub struct TermDisplay<'a> {
    term: Term,
    arena: &'a Arena,
    env: Option<&'a Env>,
    opts: WriteOptions<'a>,
}

impl Term {
    /// Return a [`TermDisplay`] with default options and no
    /// environment, suitable for quick diagnostics:
    ///
    /// ```ignore
    /// println!("{}", term.display(&arena));
    /// ```
    #[inline]
    pub fn display<'a>(&self, arena: &'a Arena) -> TermDisplay<'a> {
        TermDisplay {
            term: *self,
            arena,
            env: None,
            opts: WriteOptions::default(),
        }
    }

    /// Return a [`TermDisplay`] that resolves through `env` and renders
    /// with the given options.
    #[inline]
    pub fn display_with<'a>(
        &self,
        arena: &'a Arena,
        env: &'a Env,
        opts: WriteOptions<'a>,
    ) -> TermDisplay<'a> {
        TermDisplay {
            term: *self,
            arena,
            env: Some(env),
            opts,
        }
    }
}

const GRAPHIC_CHARS: &str = "#$&*+-./:<=>?@^~\\";

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_graphic_char(c: char) -> bool {
    GRAPHIC_CHARS.contains(c)
}

/// Whether a space is needed between two adjacent fragments so the
/// output tokenizes the same way it was emitted.
fn needs_space(prev: char, next: char) -> bool {
    (is_name_char(prev) && is_name_char(next)) || (is_graphic_char(prev) && is_graphic_char(next))
}

fn fragment(tok: &WriteToken) -> String {
    match tok {
        WriteToken::Atom(s) => s.to_string(),
        WriteToken::Quoted(s) => format!("'{s}'"),
        WriteToken::Variable(s) => s.to_string(),
        WriteToken::Int(i) => i.to_string(),
        WriteToken::Real(r) => format_real(*r).to_string(),
        WriteToken::Open => "(".into(),
        WriteToken::Close => ")".into(),
        WriteToken::OpenList => "[".into(),
        WriteToken::CloseList => "]".into(),
        WriteToken::OpenCurly => "{".into(),
        WriteToken::CloseCurly => "}".into(),
        WriteToken::Comma => ", ".into(),
        WriteToken::Bar => "|".into(),
        WriteToken::Space => " ".into(),
        WriteToken::Ellipsis => "...".into(),
    }
}

/// Joins a writer token stream into text.
pub(crate) fn join_tokens(tokens: &[WriteToken]) -> String {
    let mut out = String::new();
    for tok in tokens {
        let frag = fragment(tok);
        if let (Some(prev), Some(next)) = (out.chars().last(), frag.chars().next()) {
            if needs_space(prev, next) {
                out.push(' ');
            }
        }
        out.push_str(&frag);
    }
    out
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let empty;
        let env = match self.env {
            Some(env) => env,
            None => {
                empty = Env::new();
                &empty
            }
        };
        let mut tokens = Vec::new();
        write_term(self.arena, env, self.term, &self.opts, &mut |tok| {
            tokens.push(tok)
        });
        f.write_str(&join_tokens(&tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atom, func, list, OperatorTable};

    #[test]
    fn canonical_display() {
        let mut arena = Arena::new();
        let t = func!("foo"; 1, "bar", list![1, 2] => &mut arena);
        assert_eq!(format!("{}", t.display(&arena)), "foo(1, bar, [1, 2])");
    }

    #[test]
    fn operator_display_matches_source() {
        let mut arena = Arena::new();
        let env = Env::new();
        let table = OperatorTable::default_table();
        let m = func!("*"; 2, 2 => &mut arena);
        let t = func!("+"; m, 2 => &mut arena);
        assert_eq!(
            format!("{}", t.display_with(&arena, &env, WriteOptions::with_ops(&table))),
            "2*2+2"
        );
        let s = func!("+"; 2, 2 => &mut arena);
        let t = func!("*"; 2, s => &mut arena);
        assert_eq!(
            format!("{}", t.display_with(&arena, &env, WriteOptions::with_ops(&table))),
            "2*(2+2)"
        );
    }

    #[test]
    fn graphic_operators_are_separated() {
        let mut arena = Arena::new();
        let env = Env::new();
        let table = OperatorTable::default_table();
        let neg = func!("-"; 3 => &mut arena);
        let t = func!("-"; atom!("a"), neg => &mut arena);
        assert_eq!(
            format!("{}", t.display_with(&arena, &env, WriteOptions::with_ops(&table))),
            "a- - 3"
        );
    }

    #[test]
    fn quoted_display_round_trips_spacey_atoms() {
        let mut arena = Arena::new();
        let env = Env::new();
        let a = arena.atom("hello world");
        let opts = WriteOptions {
            quoted: true,
            ..Default::default()
        };
        assert_eq!(
            format!("{}", a.display_with(&arena, &env, opts)),
            "'hello world'"
        );
    }

    #[test]
    fn curly_blocks_display_in_braces() {
        let mut arena = Arena::new();
        let t = func!("{}"; atom!("x") => &mut arena);
        assert_eq!(format!("{}", t.display(&arena)), "{x}");
    }
}
