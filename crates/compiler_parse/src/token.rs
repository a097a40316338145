//! Token kinds produced by the [`crate::scanner::Scanner`].
//!
//! Keywords are recognized by a sorted table and a binary search
//! (`maybe_keyword`) rather than a hash lookup, favored for a handful of
//! short, fixed strings scanned on every identifier.

use compiler_base::Symbol;
use compiler_base::span::SourceLocation;

/// The classification of a single token.
///
/// `true`/`false` are not keywords here — they resolve through the
/// universe as ordinary identifiers bound to boolean constants, matching
/// the scanner's keyword table, which carries only control-flow and
/// declaration keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    Semi,
    Comma,
    Dot,
    DotDot,
    DotDotDot,
    Hash,
    Question,
    Colon,

    // Arithmetic / bitwise operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Comparison
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    AmpAmp,
    PipePipe,
    Bang,

    // Assignment
    Assign,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    ShlEq,
    ShrEq,
    AmpEq,
    CaretEq,
    PipeEq,

    // Increment / decrement
    PlusPlus,
    MinusMinus,

    // Keywords
    Fun,
    Type,
    Let,
    Var,
    If,
    Else,
    For,
    Return,
    Mut,
    This,

    // Literals and identifiers
    Id,
    IntLit,
    FloatLit,

    Eof,
}

/// Sorted `(text, kind)` table, binary-searched by the scanner.
///
/// Keeping this sorted is a correctness requirement, not a style nit — a
/// debug build asserts the order once at scanner construction.
pub(crate) const KEYWORDS: &[(&str, TokenKind)] = &[
    ("else", TokenKind::Else),
    ("for", TokenKind::For),
    ("fun", TokenKind::Fun),
    ("if", TokenKind::If),
    ("let", TokenKind::Let),
    ("mut", TokenKind::Mut),
    ("return", TokenKind::Return),
    ("this", TokenKind::This),
    ("type", TokenKind::Type),
    ("var", TokenKind::Var),
];

/// A decoded literal payload. Only one variant is populated for a given token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LitValue {
    None,
    Int(u64),
    Float(f64),
}

/// A single scanned token.
///
/// `lit` borrows from the scanner's input buffer for everything except
/// float literals, which are re-materialized into the scanner's literal
/// buffer (see [`crate::scanner::Scanner`]) because their textual form may
/// need the leading sign slot overwritten by a unary-minus prefix.
#[derive(Debug, Clone, Copy)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub loc: SourceLocation,
    pub lit: &'src str,
    pub value: LitValue,
}

impl<'src> Token<'src> {
    /// True for tokens that can legally end a statement, and therefore
    /// trigger implicit-semicolon insertion when a newline follows them.
    pub fn ends_statement(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::RParen
                | TokenKind::RBrack
                | TokenKind::RBrace
                | TokenKind::Id
                | TokenKind::IntLit
                | TokenKind::FloatLit
                | TokenKind::Return
        )
    }
}

/// Interns `name` as the scanner's handle for an input's display name.
pub fn input_name(name: &str) -> Symbol {
    compiler_base::intern::intern(name)
}
