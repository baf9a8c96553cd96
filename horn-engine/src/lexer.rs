//! The tokenizer for Prolog source text.
//!
//! Characters are classified into the standard Prolog token set:
//! alphanumeric names, graphic-character names, quoted atoms,
//! double-quoted lists, variables, numbers, solo characters, and the
//! clause-terminating end dot.  The lexer works over a borrowed string
//! with single-character backup and reports [`TokenKind::Insufficient`]
//! when the input ends in the middle of a token, which is how the
//! parser tells an interactive host to read another line.
//!
//! Character conversions, when enabled, are applied to every character
//! read outside quoted literals.

use smartstring::alias::String;
use std::collections::HashMap;

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An alphanumeric name starting with a lowercase letter.
    LetterDigit,
    /// A name made of graphic characters, e.g. `:-` or `=..`.
    Graphic,
    /// A single-quoted atom; the token text is the unescaped content.
    Quoted,
    /// A double-quoted literal; the token text is the unescaped content.
    DoubleQuotedList,
    /// A variable name starting with an uppercase letter or `_`.
    Variable,
    Integer,
    FloatNumber,
    /// A `+` or `-` immediately followed by a digit.
    Sign,
    /// An open parenthesis with no preceding layout, marking functor
    /// application.
    OpenCT,
    Open,
    Close,
    OpenList,
    CloseList,
    OpenCurly,
    CloseCurly,
    Comma,
    /// The head/tail separator `|`.
    Bar,
    Semicolon,
    Cut,
    /// A clause-terminating dot followed by layout or end of input.
    End,
    /// The input ended inside a token; more input could complete it.
    Insufficient,
    /// A character that cannot start any token, or a malformed escape.
    Invalid,
    Eof,
}

/// A lexical token: a kind plus its processed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl AsRef<str>) -> Self {
        Self {
            kind,
            text: String::from(text.as_ref()),
        }
    }
}

const GRAPHIC_CHARS: &str = "#$&*+-./:<=>?@^~\\";

fn is_graphic(c: char) -> bool {
    GRAPHIC_CHARS.contains(c)
}

fn is_alnum(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

enum Escaped {
    Char(char),
    /// A line continuation: contributes nothing to the literal.
    Empty,
    Insufficient,
    Invalid,
}

/// The tokenizer.  Borrows the source text and an optional character
/// conversion table.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    prev_pos: usize,
    line_no: usize,
    prev_line_no: usize,
    conversions: Option<&'a HashMap<char, char>>,
    prev_token: Option<TokenKind>,
    /// A dot consumed while looking for a fraction, to be re-examined
    /// at the next token boundary.
    reserved_dot: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, conversions: Option<&'a HashMap<char, char>>) -> Self {
        Self {
            input,
            pos: 0,
            prev_pos: 0,
            line_no: 1,
            prev_line_no: 1,
            conversions,
            prev_token: None,
            reserved_dot: false,
        }
    }

    /// The current byte offset into the input, a clean resume point
    /// after an [`TokenKind::End`] token.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The current (1-based) line number.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    fn next_raw(&mut self) -> Option<char> {
        let c = self.input[self.pos..].chars().next()?;
        self.prev_pos = self.pos;
        self.prev_line_no = self.line_no;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line_no += 1;
        }
        Some(c)
    }

    /// Reads a character with conversions applied.  Conversions apply
    /// only outside quoted literals.
    fn next_conv(&mut self) -> Option<char> {
        let c = self.next_raw()?;
        match self.conversions {
            Some(table) => Some(*table.get(&c).unwrap_or(&c)),
            None => Some(c),
        }
    }

    fn peek_conv(&self) -> Option<char> {
        let c = self.input[self.pos..].chars().next()?;
        match self.conversions {
            Some(table) => Some(*table.get(&c).unwrap_or(&c)),
            None => Some(c),
        }
    }

    fn peek_raw(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn backup(&mut self) {
        self.pos = self.prev_pos;
        self.line_no = self.prev_line_no;
    }

    /// Produces the next token.
    pub fn token(&mut self) -> Token {
        if self.reserved_dot {
            self.reserved_dot = false;
            let token = self.dot_token();
            return self.finish(token);
        }

        let mut layout_seen = false;
        loop {
            match self.peek_conv() {
                Some(c) if c.is_whitespace() => {
                    self.next_raw();
                    layout_seen = true;
                }
                Some('%') => {
                    while let Some(c) = self.next_raw() {
                        if c == '\n' {
                            break;
                        }
                    }
                    layout_seen = true;
                }
                Some('/') if self.input[self.pos..].starts_with("/*") => {
                    self.next_raw();
                    self.next_raw();
                    let mut closed = false;
                    while let Some(c) = self.next_raw() {
                        if c == '*' && self.peek_raw() == Some('/') {
                            self.next_raw();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return self.finish(Token::new(TokenKind::Insufficient, "/*"));
                    }
                    layout_seen = true;
                }
                _ => break,
            }
        }

        let Some(c) = self.next_conv() else {
            return self.finish(Token::new(TokenKind::Eof, ""));
        };

        let token = match c {
            '(' => {
                let applied = !layout_seen
                    && matches!(
                        self.prev_token,
                        Some(
                            TokenKind::LetterDigit
                                | TokenKind::Graphic
                                | TokenKind::Quoted
                                | TokenKind::Variable
                                | TokenKind::Semicolon
                                | TokenKind::Cut
                        )
                    );
                if applied {
                    Token::new(TokenKind::OpenCT, "(")
                } else {
                    Token::new(TokenKind::Open, "(")
                }
            }
            ')' => Token::new(TokenKind::Close, ")"),
            '[' => Token::new(TokenKind::OpenList, "["),
            ']' => Token::new(TokenKind::CloseList, "]"),
            '{' => Token::new(TokenKind::OpenCurly, "{"),
            '}' => Token::new(TokenKind::CloseCurly, "}"),
            ',' => Token::new(TokenKind::Comma, ","),
            '|' => Token::new(TokenKind::Bar, "|"),
            ';' => Token::new(TokenKind::Semicolon, ";"),
            '!' => Token::new(TokenKind::Cut, "!"),
            '\'' => self.quoted('\'', TokenKind::Quoted),
            '"' => self.quoted('"', TokenKind::DoubleQuotedList),
            '.' => self.dot_token(),
            '+' | '-' if self.peek_conv().is_some_and(|d| d.is_ascii_digit()) => {
                Token::new(TokenKind::Sign, c.to_string())
            }
            c if c.is_ascii_digit() => self.number(c),
            c if c.is_ascii_lowercase() => self.name(c, TokenKind::LetterDigit),
            c if c.is_ascii_uppercase() || c == '_' => self.name(c, TokenKind::Variable),
            c if is_graphic(c) => self.graphic(c),
            c => Token::new(TokenKind::Invalid, c.to_string()),
        };
        self.finish(token)
    }

    fn finish(&mut self, token: Token) -> Token {
        self.prev_token = Some(token.kind);
        token
    }

    fn name(&mut self, first: char, kind: TokenKind) -> Token {
        let mut text = String::new();
        text.push(first);
        while let Some(c) = self.peek_conv() {
            if is_alnum(c) {
                self.next_conv();
                text.push(c);
            } else {
                break;
            }
        }
        Token { kind, text }
    }

    fn graphic(&mut self, first: char) -> Token {
        let mut text = String::new();
        text.push(first);
        while let Some(c) = self.peek_conv() {
            if is_graphic(c) {
                self.next_conv();
                text.push(c);
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Graphic,
            text,
        }
    }

    /// A token starting with `.`: the end of a clause when followed by
    /// layout, a comment, or the end of input; a graphic name otherwise.
    fn dot_token(&mut self) -> Token {
        match self.peek_conv() {
            None => Token::new(TokenKind::End, "."),
            Some(c) if c.is_whitespace() || c == '%' => Token::new(TokenKind::End, "."),
            Some(c) if is_graphic(c) => self.graphic('.'),
            Some(_) => Token::new(TokenKind::Graphic, "."),
        }
    }

    fn number(&mut self, first: char) -> Token {
        let mut text = String::new();
        text.push(first);

        if first == '0' {
            match self.peek_conv() {
                Some('\'') => {
                    self.next_conv();
                    return self.char_code();
                }
                Some(radix @ ('b' | 'o' | 'x')) => {
                    self.next_conv();
                    let valid = |c: char| match radix {
                        'b' => matches!(c, '0' | '1'),
                        'o' => matches!(c, '0'..='7'),
                        _ => c.is_ascii_hexdigit(),
                    };
                    let mut digits = String::new();
                    while let Some(c) = self.peek_conv() {
                        if valid(c) {
                            self.next_conv();
                            digits.push(c);
                        } else {
                            break;
                        }
                    }
                    if digits.is_empty() {
                        return if self.peek_conv().is_none() {
                            Token::new(TokenKind::Insufficient, format!("0{radix}"))
                        } else {
                            Token::new(TokenKind::Invalid, format!("0{radix}"))
                        };
                    }
                    return Token::new(TokenKind::Integer, format!("0{radix}{digits}"));
                }
                _ => {}
            }
        }

        while let Some(c) = self.peek_conv() {
            if c.is_ascii_digit() {
                self.next_conv();
                text.push(c);
            } else {
                break;
            }
        }

        // A dot continues the number only when a digit follows it.
        if self.peek_conv() == Some('.') {
            self.next_conv();
            match self.peek_conv() {
                Some(c) if c.is_ascii_digit() => {
                    text.push('.');
                    while let Some(c) = self.peek_conv() {
                        if c.is_ascii_digit() {
                            self.next_conv();
                            text.push(c);
                        } else {
                            break;
                        }
                    }
                    return self.exponent(text);
                }
                _ => {
                    // The dot belongs to the next token.
                    self.reserved_dot = true;
                    return Token {
                        kind: TokenKind::Integer,
                        text,
                    };
                }
            }
        }

        Token {
            kind: TokenKind::Integer,
            text,
        }
    }

    fn exponent(&mut self, mut text: String) -> Token {
        if !matches!(self.peek_conv(), Some('e' | 'E')) {
            return Token {
                kind: TokenKind::FloatNumber,
                text,
            };
        }
        self.next_conv();
        text.push('e');
        if matches!(self.peek_conv(), Some('+' | '-')) {
            let sign = self.next_conv().unwrap_or('+');
            text.push(sign);
        }
        let mut digits = 0;
        while let Some(c) = self.peek_conv() {
            if c.is_ascii_digit() {
                self.next_conv();
                text.push(c);
                digits += 1;
            } else {
                break;
            }
        }
        if digits == 0 {
            return if self.peek_conv().is_none() {
                Token::new(TokenKind::Insufficient, text)
            } else {
                Token::new(TokenKind::Invalid, text)
            };
        }
        Token {
            kind: TokenKind::FloatNumber,
            text,
        }
    }

    /// A character-code literal `0'c`, with escape support.  The token
    /// text is the decimal code of the character.
    fn char_code(&mut self) -> Token {
        match self.next_raw() {
            None => Token::new(TokenKind::Insufficient, "0'"),
            Some('\\') => match self.escape() {
                Escaped::Char(c) => Token::new(TokenKind::Integer, (c as u32).to_string()),
                Escaped::Empty => Token::new(TokenKind::Invalid, "0'\\"),
                Escaped::Insufficient => Token::new(TokenKind::Insufficient, "0'\\"),
                Escaped::Invalid => Token::new(TokenKind::Invalid, "0'\\"),
            },
            Some('\'') => {
                // 0''' denotes the quote character itself.
                if self.peek_raw() == Some('\'') {
                    self.next_raw();
                    Token::new(TokenKind::Integer, ('\'' as u32).to_string())
                } else {
                    Token::new(TokenKind::Invalid, "0''")
                }
            }
            Some(c) => Token::new(TokenKind::Integer, (c as u32).to_string()),
        }
    }

    /// A quoted literal.  `quote` doubled stands for itself; the
    /// standard escapes are honoured; conversions do not apply.
    fn quoted(&mut self, quote: char, kind: TokenKind) -> Token {
        let mut text = String::new();
        loop {
            match self.next_raw() {
                None => return Token::new(TokenKind::Insufficient, text),
                Some(c) if c == quote => {
                    if self.peek_raw() == Some(quote) {
                        self.next_raw();
                        text.push(quote);
                    } else {
                        return Token { kind, text };
                    }
                }
                Some('\\') => match self.escape() {
                    Escaped::Char(c) => text.push(c),
                    Escaped::Empty => {}
                    Escaped::Insufficient => return Token::new(TokenKind::Insufficient, text),
                    Escaped::Invalid => return Token::new(TokenKind::Invalid, text),
                },
                Some(c) => text.push(c),
            }
        }
    }

    /// An escape sequence, after the backslash.
    fn escape(&mut self) -> Escaped {
        let Some(c) = self.next_raw() else {
            return Escaped::Insufficient;
        };
        match c {
            'a' => Escaped::Char('\x07'),
            'b' => Escaped::Char('\x08'),
            'f' => Escaped::Char('\x0C'),
            'n' => Escaped::Char('\n'),
            'r' => Escaped::Char('\r'),
            't' => Escaped::Char('\t'),
            'v' => Escaped::Char('\x0B'),
            '\\' => Escaped::Char('\\'),
            '\'' => Escaped::Char('\''),
            '"' => Escaped::Char('"'),
            '`' => Escaped::Char('`'),
            '\n' => Escaped::Empty,
            'x' => self.coded_escape(16),
            c if c.is_digit(8) => {
                self.backup();
                self.coded_escape(8)
            }
            _ => Escaped::Invalid,
        }
    }

    /// `\x23\` or `\23\`: a character by code, closed by a backslash.
    fn coded_escape(&mut self, radix: u32) -> Escaped {
        let mut value: u32 = 0;
        let mut digits = 0;
        loop {
            match self.next_raw() {
                None => return Escaped::Insufficient,
                Some('\\') => {
                    if digits == 0 {
                        return Escaped::Invalid;
                    }
                    return match char::from_u32(value) {
                        Some(c) => Escaped::Char(c),
                        None => Escaped::Invalid,
                    };
                }
                Some(c) => match c.to_digit(radix) {
                    Some(d) => {
                        digits += 1;
                        value = match value.checked_mul(radix).and_then(|v| v.checked_add(d)) {
                            Some(v) => v,
                            None => return Escaped::Invalid,
                        };
                    }
                    None => return Escaped::Invalid,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(input: &str) -> Vec<(TokenKind, std::string::String)> {
        let mut lexer = Lexer::new(input, None);
        let mut out = Vec::new();
        loop {
            let t = lexer.token();
            let done = matches!(
                t.kind,
                TokenKind::Eof | TokenKind::Insufficient | TokenKind::Invalid
            );
            out.push((t.kind, t.text.to_string()));
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn clause_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds_and_texts("append(nil,L,L)."),
            vec![
                (LetterDigit, "append".into()),
                (OpenCT, "(".into()),
                (LetterDigit, "nil".into()),
                (Comma, ",".into()),
                (Variable, "L".into()),
                (Comma, ",".into()),
                (Variable, "L".into()),
                (Close, ")".into()),
                (End, ".".into()),
                (Eof, "".into()),
            ]
        );
    }

    #[test]
    fn open_ct_requires_adjacency() {
        use TokenKind::*;
        assert_eq!(
            kinds_and_texts("p (a)")
                .iter()
                .map(|(k, _)| *k)
                .collect::<Vec<_>>(),
            vec![LetterDigit, Open, LetterDigit, Close, Eof]
        );
    }

    #[test]
    fn brackets_and_bars() {
        use TokenKind::*;
        assert_eq!(
            kinds_and_texts("[a, b|c]")
                .iter()
                .map(|(k, _)| *k)
                .collect::<Vec<_>>(),
            vec![
                OpenList,
                LetterDigit,
                Comma,
                LetterDigit,
                Bar,
                LetterDigit,
                CloseList,
                Eof
            ]
        );
        assert_eq!(
            kinds_and_texts("{}")
                .iter()
                .map(|(k, _)| *k)
                .collect::<Vec<_>>(),
            vec![OpenCurly, CloseCurly, Eof]
        );
    }

    #[test]
    fn graphic_tokens_run_together() {
        let toks = kinds_and_texts("X =.. L");
        assert_eq!(toks[1], (TokenKind::Graphic, "=..".into()));
    }

    #[test]
    fn dot_is_end_only_before_layout() {
        let toks = kinds_and_texts("a.b");
        assert_eq!(toks[1], (TokenKind::Graphic, ".".into()));
        let toks = kinds_and_texts("a. b");
        assert_eq!(toks[1], (TokenKind::End, ".".into()));
        let toks = kinds_and_texts("a.");
        assert_eq!(toks[1], (TokenKind::End, ".".into()));
    }

    #[test]
    fn numbers() {
        let toks = kinds_and_texts("1 42.5 1.0e3 0x1f 0o17 0b101 0'a 0' ");
        assert_eq!(toks[0], (TokenKind::Integer, "1".into()));
        assert_eq!(toks[1], (TokenKind::FloatNumber, "42.5".into()));
        assert_eq!(toks[2], (TokenKind::FloatNumber, "1.0e3".into()));
        assert_eq!(toks[3], (TokenKind::Integer, "0x1f".into()));
        assert_eq!(toks[4], (TokenKind::Integer, "0o17".into()));
        assert_eq!(toks[5], (TokenKind::Integer, "0b101".into()));
        assert_eq!(toks[6], (TokenKind::Integer, "97".into()));
        assert_eq!(toks[7], (TokenKind::Integer, "32".into()));
    }

    #[test]
    fn integer_then_end_dot() {
        use TokenKind::*;
        assert_eq!(
            kinds_and_texts("X = 1."),
            vec![
                (Variable, "X".into()),
                (Graphic, "=".into()),
                (Integer, "1".into()),
                (End, ".".into()),
                (Eof, "".into()),
            ]
        );
    }

    #[test]
    fn signs_fuse_only_with_adjacent_digits() {
        let toks = kinds_and_texts("-1");
        assert_eq!(toks[0], (TokenKind::Sign, "-".into()));
        assert_eq!(toks[1], (TokenKind::Integer, "1".into()));
        let toks = kinds_and_texts("- 1");
        assert_eq!(toks[0], (TokenKind::Graphic, "-".into()));
        let toks = kinds_and_texts("->");
        assert_eq!(toks[0], (TokenKind::Graphic, "->".into()));
    }

    #[test]
    fn quoted_atoms_unescape() {
        let toks = kinds_and_texts(r"'hello\nworld'");
        assert_eq!(toks[0], (TokenKind::Quoted, "hello\nworld".into()));
        let toks = kinds_and_texts("'it''s'");
        assert_eq!(toks[0], (TokenKind::Quoted, "it's".into()));
        let toks = kinds_and_texts(r"'\x41\'");
        assert_eq!(toks[0], (TokenKind::Quoted, "A".into()));
        let toks = kinds_and_texts(r"'\101\'");
        assert_eq!(toks[0], (TokenKind::Quoted, "A".into()));
    }

    #[test]
    fn unterminated_quotes_are_insufficient() {
        let toks = kinds_and_texts("'abc");
        assert_eq!(toks[0].0, TokenKind::Insufficient);
        let toks = kinds_and_texts("\"abc");
        assert_eq!(toks[0].0, TokenKind::Insufficient);
    }

    #[test]
    fn comments_are_layout() {
        use TokenKind::*;
        assert_eq!(
            kinds_and_texts("a % line\n/* block */ b")
                .iter()
                .map(|(k, _)| *k)
                .collect::<Vec<_>>(),
            vec![LetterDigit, LetterDigit, Eof]
        );
        let toks = kinds_and_texts("/* open");
        assert_eq!(toks[0].0, TokenKind::Insufficient);
    }

    #[test]
    fn char_conversions_apply_outside_quotes() {
        let mut table = HashMap::new();
        table.insert('&', ',');
        let mut lexer = Lexer::new("a&'&'", Some(&table));
        assert_eq!(lexer.token().kind, TokenKind::LetterDigit);
        assert_eq!(lexer.token().kind, TokenKind::Comma);
        let quoted = lexer.token();
        assert_eq!(quoted.kind, TokenKind::Quoted);
        assert_eq!(quoted.text, "&");
    }

    #[test]
    fn invalid_characters_are_flagged() {
        let toks = kinds_and_texts("\u{0}");
        assert_eq!(toks[0].0, TokenKind::Invalid);
    }

    #[test]
    fn line_numbers_advance() {
        let mut lexer = Lexer::new("a\nb\nc", None);
        lexer.token();
        assert_eq!(lexer.line_no(), 1);
        lexer.token();
        assert_eq!(lexer.line_no(), 2);
        lexer.token();
        assert_eq!(lexer.line_no(), 3);
    }
}
