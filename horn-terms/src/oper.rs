//! Operator definitions, priorities, and the operator table.
//!
//! This module defines types and utilities for representing and
//! managing operator priority and shape.  Operators may appear in
//! prefix, infix, or postfix positions, each characterized by its
//! [`Specifier`]; the specifier also fixes associativity, which the
//! parser and writer express as a pair of binding priorities.
//!
//! The table is shared by the parser (to drive precedence climbing)
//! and by the writer (to decide when a printed operator needs
//! parentheses), and is mutated at run time by the `op/3` built-in.

use crate::error::bail;
use crate::TermError;
use smartstring::alias::String;
use std::fmt;
use std::str::FromStr;

/// Lowest priority an operator may be declared with.
pub const MIN_PRIORITY: u16 = 1;
/// Highest priority an operator may be declared with.
pub const MAX_PRIORITY: u16 = 1200;
/// A binding priority larger than any term priority; a side bound at
/// this value never accepts an operand.
pub const UNBOUNDED: u16 = 1202;

/// The shape and associativity of an operator.
///
/// `f` marks the operator position; `x` marks an argument whose
/// priority must be strictly lower than the operator's, `y` one whose
/// priority may be equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Specifier {
    /// Prefix, non-associative argument: `fx`.
    FX = 0,
    /// Prefix, right-associative argument: `fy`.
    FY = 1,
    /// Postfix, non-associative argument: `xf`.
    XF = 2,
    /// Postfix, left-associative argument: `yf`.
    YF = 3,
    /// Infix, non-associative: `xfx`.
    XFX = 4,
    /// Infix, right-associative: `xfy`.
    XFY = 5,
    /// Infix, left-associative: `yfx`.
    YFX = 6,
}

/// The syntactic position an operator occupies, independent of
/// associativity.  Two operators with specifiers of the same class
/// occupy the same slot in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierClass {
    Prefix,
    Infix,
    Postfix,
}

impl Specifier {
    /// The total number of specifier variants.
    pub const COUNT: usize = 7;

    /// String representations of each specifier, in declaration order.
    pub const STRS: &'static [&'static str] = &["fx", "fy", "xf", "yf", "xfx", "xfy", "yfx"];

    /// The number of operands the specifier implies.
    pub fn arity(&self) -> usize {
        match self.class() {
            SpecifierClass::Infix => 2,
            _ => 1,
        }
    }

    /// The positional class of the specifier.
    pub fn class(&self) -> SpecifierClass {
        match self {
            Specifier::FX | Specifier::FY => SpecifierClass::Prefix,
            Specifier::XF | Specifier::YF => SpecifierClass::Postfix,
            Specifier::XFX | Specifier::XFY | Specifier::YFX => SpecifierClass::Infix,
        }
    }
}

impl From<Specifier> for usize {
    fn from(s: Specifier) -> Self {
        s as usize
    }
}

impl From<Specifier> for String {
    fn from(s: Specifier) -> Self {
        Specifier::STRS[usize::from(s)].into()
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Specifier::STRS[usize::from(*self)])
    }
}

impl FromStr for Specifier {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fx" => Ok(Specifier::FX),
            "fy" => Ok(Specifier::FY),
            "xf" => Ok(Specifier::XF),
            "yf" => Ok(Specifier::YF),
            "xfx" => Ok(Specifier::XFX),
            "xfy" => Ok(Specifier::XFY),
            "yfx" => Ok(Specifier::YFX),
            other => Err(TermError::InvalidSpecifier(String::from(other))),
        }
    }
}

impl TryFrom<&str> for Specifier {
    type Error = TermError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A single operator declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// Priority, `1..=1200`.  Lower numbers bind tighter.
    pub priority: u16,
    /// Shape and associativity.
    pub specifier: Specifier,
    /// The operator's name.
    pub name: String,
}

impl Operator {
    /// The left and right binding priorities of this operator, the pair
    /// a precedence-climbing parser consumes.  A side that takes no
    /// operand is reported as [`UNBOUNDED`].
    ///
    /// | specifier | left | right |
    /// |-----------|------|-------|
    /// | fx  | — | P-1 |
    /// | fy  | — | P   |
    /// | xf  | P-1 | — |
    /// | yf  | P   | — |
    /// | xfx | P-1 | P-1 |
    /// | xfy | P-1 | P   |
    /// | yfx | P   | P-1 |
    pub fn binding_priorities(&self) -> (u16, u16) {
        let p = self.priority;
        match self.specifier {
            Specifier::FX => (UNBOUNDED, p - 1),
            Specifier::FY => (UNBOUNDED, p),
            Specifier::XF => (p - 1, UNBOUNDED),
            Specifier::YF => (p, UNBOUNDED),
            Specifier::XFX => (p - 1, p - 1),
            Specifier::XFY => (p - 1, p),
            Specifier::YFX => (p, p - 1),
        }
    }

    /// The maximum priorities the operator's printed operands may have
    /// without requiring parentheses: the binding priorities with the
    /// absent sides left out.
    pub fn argument_priorities(&self) -> (Option<u16>, Option<u16>) {
        let (l, r) = self.binding_priorities();
        (
            (l != UNBOUNDED).then_some(l),
            (r != UNBOUNDED).then_some(r),
        )
    }
}

/// The live operator table: an ordered collection of declarations,
/// sorted by priority, with at most one entry per `(class, name)` pair.
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    ops: Vec<Operator>,
}

impl OperatorTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default table of standard operators.
    pub fn default_table() -> Self {
        const DEFAULTS: &[(u16, &str, &[&str])] = &[
            (1200, "xfx", &[":-", "-->"]),
            (1200, "fx", &[":-", "?-"]),
            (1100, "xfy", &[";"]),
            (1050, "xfy", &["->"]),
            (1000, "xfy", &[","]),
            (900, "fy", &["\\+"]),
            (
                700,
                "xfx",
                &[
                    "=", "\\=", "==", "\\==", "@<", "@>", "@=<", "@>=", "=..", "is", "=:=", "=\\=",
                    "<", ">", "=<", ">=",
                ],
            ),
            (500, "yfx", &["+", "-", "/\\", "\\/", "xor"]),
            (400, "yfx", &["*", "/", "//", "rem", "mod", "<<", ">>"]),
            (200, "xfx", &["**"]),
            (200, "xfy", &["^"]),
            (200, "fy", &["-", "+", "\\"]),
        ];

        let mut table = Self::new();
        for (priority, specifier, names) in DEFAULTS {
            for name in names.iter() {
                // The defaults are well-formed by construction.
                let spec = specifier.parse().unwrap_or(Specifier::XFX);
                let _ = table.define(*priority, spec, name);
            }
        }
        table
    }

    /// Declares an operator.  A prior declaration with the same name
    /// and specifier class is removed first; priority `0` only removes.
    /// Priorities outside `0..=1200` are rejected.
    pub fn define(
        &mut self,
        priority: u16,
        specifier: Specifier,
        name: &str,
    ) -> Result<(), TermError> {
        if priority > MAX_PRIORITY {
            return Err(TermError::InvalidPriority(priority as i64));
        }
        if name.is_empty() {
            bail!("operator name must not be empty");
        }
        self.ops
            .retain(|op| !(op.name == name && op.specifier.class() == specifier.class()));
        if priority < MIN_PRIORITY {
            return Ok(());
        }
        // Insert before the first operator of equal or greater priority
        // so the table stays sorted.
        let at = self
            .ops
            .partition_point(|op| op.priority < priority);
        self.ops.insert(
            at,
            Operator {
                priority,
                specifier,
                name: String::from(name),
            },
        );
        Ok(())
    }

    /// All declarations, in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Operator> {
        self.ops.iter()
    }

    /// The lowest-priority prefix declaration of `name` whose priority
    /// does not exceed `max_priority`.
    pub fn prefix(&self, name: &str, max_priority: u16) -> Option<&Operator> {
        self.ops.iter().find(|op| {
            op.name == name
                && op.specifier.class() == SpecifierClass::Prefix
                && op.priority <= max_priority
        })
    }

    /// The lowest-priority infix or postfix declaration of `name` whose
    /// left binding priority does not exceed `max_priority`.
    pub fn infix_or_postfix(&self, name: &str, max_priority: u16) -> Option<&Operator> {
        self.ops.iter().find(|op| {
            op.name == name
                && op.specifier.class() != SpecifierClass::Prefix
                && op.binding_priorities().0 <= max_priority
        })
    }

    /// The first declaration of `name` with the given operand count,
    /// for the writer.
    pub fn lookup_arity(&self, name: &str, arity: usize) -> Option<&Operator> {
        self.ops
            .iter()
            .find(|op| op.name == name && op.specifier.arity() == arity)
    }

    /// Whether `name` is declared as an operator in any position.
    pub fn is_operator(&self, name: &str) -> bool {
        self.ops.iter().any(|op| op.name == name)
    }
}
