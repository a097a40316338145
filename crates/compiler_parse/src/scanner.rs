//! Byte stream → token stream.
//!
//! Grounded directly on the reference implementation's `scanner.c`:
//! `scan0` skips whitespace and decides whether to synthesize an implicit
//! `SEMI`, `scan1` dispatches on the current byte, `number`/`zeronumber`
//! decode integer literals with an overflow-checked accumulator and rewind
//! into `floatnumber` on a `.`/exponent, and `identifier`/`maybe_keyword`
//! scan a lexeme then binary-search a sorted keyword table. The scanner's
//! richer operator set (`<=`, `&&`, compound assignments, `++`/`--`, …)
//! goes beyond what the reference scanner implements, built in its style:
//! consume the first byte, then peek ahead for the longer form, exactly as
//! `=`/`==` already does there.

use compiler_base::error::{Diagnostic, DiagnosticSink};
use compiler_base::span::{SourceLocation, SourceRange};
use compiler_base::Symbol;

use crate::token::{LitValue, Token, TokenKind, KEYWORDS};

const UTF8_SELF: u8 = 0x80;

/// Produces tokens on demand from a byte buffer.
///
/// One `Scanner` is constructed per [`crate::context::Input`]; it halts
/// (pins itself to `EOF`) on any lexical error, per §4.1/§7: the scanner
/// stops to avoid a flood of cascading diagnostics, not because the error
/// is otherwise fatal.
pub struct Scanner<'src> {
    src: &'src [u8],
    name: Symbol,
    inp: usize,
    inend: usize,
    linestart: usize,
    lineno: u32,
    tokstart: usize,
    insertsemi: bool,
    diagnostics: &'src dyn DiagnosticSink,
    pub tok: Token<'src>,
}

impl<'src> Scanner<'src> {
    pub fn new(name: Symbol, src: &'src [u8], diagnostics: &'src dyn DiagnosticSink) -> Self {
        debug_assert!(
            KEYWORDS.windows(2).all(|w| w[0].0 < w[1].0),
            "keyword table must be sorted"
        );
        let mut s = Scanner {
            src,
            name,
            inp: 0,
            inend: src.len(),
            linestart: 0,
            lineno: 1,
            tokstart: 0,
            insertsemi: false,
            diagnostics,
            tok: Token {
                kind: TokenKind::Eof,
                loc: SourceLocation::new(name, 1, 1),
                lit: "",
                value: LitValue::None,
            },
        };
        s.advance();
        s
    }

    fn loc(&self, line: u32, col: u32) -> SourceLocation {
        SourceLocation::new(self.name, line, col)
    }

    fn report(&self, loc: SourceLocation, message: impl Into<String>) {
        self.diagnostics
            .report(Diagnostic::error(SourceRange::point(loc), message));
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.inp).copied()
    }

    fn halt(&mut self) {
        self.inp = self.inend;
    }

    fn newline(&mut self) {
        self.lineno += 1;
        self.linestart = self.inp + 1;
    }

    fn col_at(&self, pos: usize) -> u32 {
        (pos - self.linestart) as u32 + 1
    }

    fn lit_str(&self, start: usize, end: usize) -> &'src str {
        std::str::from_utf8(&self.src[start..end]).unwrap_or("")
    }

    /// Advances to the next token, replacing `self.tok`.
    pub fn advance(&mut self) {
        self.scan0();
    }

    fn scan0(&mut self) {
        let prev_lineno = self.lineno;
        let prev_linestart = self.linestart;
        // `self.inp` here still points just past the previous token (the
        // whitespace loop below hasn't moved it yet), so it's the position
        // the inserted semicolon's column is measured from.
        let prev_tokend = self.inp;

        while self.inp < self.inend && is_space_byte(self.src[self.inp]) {
            if self.src[self.inp] == b'\n' {
                self.newline();
            }
            self.inp += 1;
        }

        if prev_linestart != self.linestart && self.insertsemi {
            self.insertsemi = false;
            self.tok = Token {
                kind: TokenKind::Semi,
                loc: self.loc(prev_lineno, (prev_tokend - prev_linestart) as u32 + 1),
                lit: ";",
                value: LitValue::None,
            };
            return;
        }

        if self.inp >= self.inend {
            let kind = if self.insertsemi {
                self.insertsemi = false;
                TokenKind::Semi
            } else {
                TokenKind::Eof
            };
            self.tok = Token {
                kind,
                loc: self.loc(self.lineno, self.col_at(self.inend.min(self.src.len()))),
                lit: "",
                value: LitValue::None,
            };
            return;
        }

        self.scan1();
    }

    fn scan1(&mut self) {
        self.tokstart = self.inp;
        let line = self.lineno;
        let col = self.col_at(self.tokstart);
        let loc = self.loc(line, col);

        let insertsemi_before = self.insertsemi;
        self.insertsemi = false;

        let c = self.src[self.inp];
        self.inp += 1;

        macro_rules! simple {
            ($kind:expr) => {{
                self.emit($kind, loc);
                return;
            }};
        }
        macro_rules! simple_semi {
            ($kind:expr) => {{
                self.insertsemi = true;
                self.emit($kind, loc);
                return;
            }};
        }

        match c {
            b'(' => simple!(TokenKind::LParen),
            b')' => simple_semi!(TokenKind::RParen),
            b'{' => simple!(TokenKind::LBrace),
            b'}' => simple_semi!(TokenKind::RBrace),
            b'[' => simple!(TokenKind::LBrack),
            b']' => simple_semi!(TokenKind::RBrack),
            b';' => simple!(TokenKind::Semi),
            b',' => simple!(TokenKind::Comma),
            b'#' => simple!(TokenKind::Hash),
            b'?' => simple!(TokenKind::Question),
            b':' => simple!(TokenKind::Colon),

            b'+' => {
                if self.eat(b'+') {
                    simple!(TokenKind::PlusPlus)
                } else if self.eat(b'=') {
                    simple!(TokenKind::PlusEq)
                } else {
                    simple!(TokenKind::Plus)
                }
            }
            b'-' => {
                if self.eat(b'-') {
                    simple!(TokenKind::MinusMinus)
                } else if self.eat(b'=') {
                    simple!(TokenKind::MinusEq)
                } else {
                    simple!(TokenKind::Minus)
                }
            }
            b'*' => {
                if self.eat(b'=') {
                    simple!(TokenKind::StarEq)
                } else {
                    simple!(TokenKind::Star)
                }
            }
            b'%' => {
                if self.eat(b'=') {
                    simple!(TokenKind::PercentEq)
                } else {
                    simple!(TokenKind::Percent)
                }
            }
            b'&' => {
                if self.eat(b'&') {
                    simple!(TokenKind::AmpAmp)
                } else if self.eat(b'=') {
                    simple!(TokenKind::AmpEq)
                } else {
                    simple!(TokenKind::Amp)
                }
            }
            b'|' => {
                if self.eat(b'|') {
                    simple!(TokenKind::PipePipe)
                } else if self.eat(b'=') {
                    simple!(TokenKind::PipeEq)
                } else {
                    simple!(TokenKind::Pipe)
                }
            }
            b'^' => {
                if self.eat(b'=') {
                    simple!(TokenKind::CaretEq)
                } else {
                    simple!(TokenKind::Caret)
                }
            }
            b'~' => simple!(TokenKind::Tilde),
            b'!' => {
                if self.eat(b'=') {
                    simple!(TokenKind::Ne)
                } else {
                    simple!(TokenKind::Bang)
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    simple!(TokenKind::EqEq)
                } else {
                    simple!(TokenKind::Assign)
                }
            }
            b'<' => {
                if self.eat(b'<') {
                    if self.eat(b'=') {
                        simple!(TokenKind::ShlEq)
                    } else {
                        simple!(TokenKind::Shl)
                    }
                } else if self.eat(b'=') {
                    simple!(TokenKind::Le)
                } else {
                    simple!(TokenKind::Lt)
                }
            }
            b'>' => {
                if self.eat(b'>') {
                    if self.eat(b'=') {
                        simple!(TokenKind::ShrEq)
                    } else {
                        simple!(TokenKind::Shr)
                    }
                } else if self.eat(b'=') {
                    simple!(TokenKind::Ge)
                } else {
                    simple!(TokenKind::Gt)
                }
            }

            b'0' => return self.zeronumber(loc),

            b'.' => {
                if let Some(next) = self.peek_byte() {
                    if next.is_ascii_digit() {
                        self.inp -= 1;
                        return self.floatnumber(10, loc);
                    }
                    if next == b'.' {
                        self.inp += 1;
                        if self.eat(b'.') {
                            simple!(TokenKind::DotDotDot)
                        } else {
                            simple!(TokenKind::DotDot)
                        }
                    }
                }
                simple!(TokenKind::Dot)
            }

            b'/' => {
                if matches!(self.peek_byte(), Some(b'/') | Some(b'*')) {
                    self.inp -= 1;
                    self.insertsemi = insertsemi_before;
                    self.skip_comment();
                    return self.scan0();
                }
                if self.eat(b'=') {
                    simple!(TokenKind::SlashEq)
                } else {
                    simple!(TokenKind::Slash)
                }
            }

            c if c.is_ascii_digit() => {
                self.inp -= 1;
                self.number(10, loc)
            }

            c if c >= UTF8_SELF => {
                self.inp -= 1;
                self.identifier(loc)
            }

            c if c.is_ascii_alphabetic() || c == b'_' => self.identifier(loc),

            c => {
                self.report(loc, format!("unexpected input byte {:#04x}", c));
                self.halt();
                self.tok = Token {
                    kind: TokenKind::Eof,
                    loc,
                    lit: "",
                    value: LitValue::None,
                };
            }
        }
    }

    fn emit(&mut self, kind: TokenKind, loc: SourceLocation) {
        let lit = self.lit_str(self.tokstart, self.inp);
        self.tok = Token {
            kind,
            loc,
            lit,
            value: LitValue::None,
        };
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek_byte() == Some(c) {
            self.inp += 1;
            true
        } else {
            false
        }
    }

    fn zeronumber(&mut self, loc: SourceLocation) {
        let base = match self.peek_byte() {
            Some(b'x') | Some(b'X') => {
                self.inp += 1;
                16
            }
            Some(b'b') | Some(b'B') => {
                self.inp += 1;
                2
            }
            Some(b'o') | Some(b'O') => {
                self.inp += 1;
                8
            }
            _ => 10,
        };
        self.number(base, loc)
    }

    fn number(&mut self, base: u32, loc: SourceLocation) {
        self.insertsemi = true;
        let start = self.inp;

        let cutoff: u64 = u64::MAX / base as u64;
        let cutlim: u64 = u64::MAX % base as u64;
        let mut acc: u64 = 0;
        let mut overflow = false;
        let mut last_was_underscore = false;

        loop {
            let Some(c) = self.peek_byte() else { break };
            let digit = match c {
                b'0'..=b'9' => (c - b'0') as u64,
                b'A'..=b'Z' => (c - b'A') as u64 + 10,
                b'a'..=b'z' => (c - b'a') as u64 + 10,
                b'_' => {
                    self.inp += 1;
                    last_was_underscore = true;
                    continue;
                }
                b'.' if base == 10 || base == 16 => {
                    self.inp = start;
                    return self.floatnumber(base, loc);
                }
                _ => break,
            };
            if digit >= base as u64 {
                self.report(loc, format!("invalid base-{} integer literal", base));
                self.halt();
                return;
            }
            last_was_underscore = false;
            self.inp += 1;
            if overflow || acc > cutoff || (acc == cutoff && digit > cutlim) {
                overflow = true;
            } else {
                acc = acc * base as u64 + digit;
            }
        }

        let lit = self.lit_str(self.tokstart, self.inp);
        if overflow {
            self.report(loc, "integer literal too large");
        }
        if last_was_underscore {
            self.report(loc, "trailing \"_\" after integer literal");
        }
        self.tok = Token {
            kind: TokenKind::IntLit,
            loc,
            lit,
            value: LitValue::Int(acc),
        };
    }

    fn floatnumber(&mut self, base: u32, loc: SourceLocation) {
        self.insertsemi = true;
        let mut text = String::with_capacity(32);
        if base == 16 {
            text.push_str("0x");
        }
        let mut allow_sign = false;

        while self.inp < self.inend {
            let c = self.src[self.inp];
            match c {
                b'e' | b'E' => allow_sign = true,
                b'p' | b'P' if base >= 16 => allow_sign = true,
                b'p' | b'P' => break,
                b'+' | b'-' => {
                    if !allow_sign {
                        break;
                    }
                }
                b'_' => {
                    self.inp += 1;
                    continue;
                }
                b'.' => allow_sign = false,
                _ if c.is_ascii_alphanumeric() => allow_sign = false,
                _ => break,
            }
            text.push(c as char);
            self.inp += 1;
        }

        let lit = self.lit_str(self.tokstart, self.inp);
        let value = if base == 16 {
            parse_hex_float(&text).unwrap_or(0.0)
        } else {
            text.parse::<f64>().unwrap_or_else(|_| {
                self.report(loc, format!("malformed floating-point literal '{}'", text));
                0.0
            })
        };
        self.tok = Token {
            kind: TokenKind::FloatLit,
            loc,
            lit,
            value: LitValue::Float(value),
        };
    }

    fn identifier(&mut self, loc: SourceLocation) {
        loop {
            match self.peek_byte() {
                Some(c) if c >= UTF8_SELF => {
                    if !self.utf8_seq() {
                        self.report(loc, "invalid UTF-8 sequence");
                        self.halt();
                        return;
                    }
                }
                Some(c) if c.is_ascii_alphanumeric() || c == b'_' => {
                    self.inp += 1;
                }
                _ => break,
            }
        }
        self.insertsemi = true;
        let lit = self.lit_str(self.tokstart, self.inp);
        let kind = maybe_keyword(lit);
        self.tok = Token {
            kind,
            loc,
            lit,
            value: LitValue::None,
        };
    }

    /// Consumes one (already-started) multi-byte UTF-8 sequence. Mirrors
    /// the reference implementation's length-prefix validation without
    /// fully verifying continuation-byte structure.
    fn utf8_seq(&mut self) -> bool {
        let a = self.src[self.inp];
        self.inp += 1;
        let Some(&b1) = self.src.get(self.inp) else {
            return false;
        };
        if b1 & 0xc0 != 0x80 {
            return false;
        }
        self.inp += 1;
        if a >> 5 == 0x6 {
            return true;
        }
        let Some(&b2) = self.src.get(self.inp) else {
            return false;
        };
        if b2 & 0xc0 != 0x80 {
            return false;
        }
        self.inp += 1;
        if a >> 4 == 0xE {
            return true;
        }
        let Some(&b3) = self.src.get(self.inp) else {
            return false;
        };
        if b3 & 0xc0 != 0x80 {
            return false;
        }
        self.inp += 1;
        a >> 3 == 0x1E
    }

    fn skip_comment(&mut self) {
        let c = self.src[self.inp + 1];
        if c == b'/' {
            self.inp += 2;
            while self.inp < self.inend && self.src[self.inp] != b'\n' {
                self.inp += 1;
            }
            return;
        }
        self.inp += 2;
        let startstar = self.inp - 1;
        while self.inp < self.inend {
            if self.src[self.inp] == b'\n' {
                self.newline();
            } else if self.src[self.inp] == b'/'
                && self.src[self.inp - 1] == b'*'
                && self.inp - 1 != startstar
            {
                self.inp += 1;
                break;
            }
            self.inp += 1;
        }
    }
}

fn is_space_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

fn maybe_keyword(lit: &str) -> TokenKind {
    KEYWORDS
        .binary_search_by(|(s, _)| (*s).cmp(lit))
        .map(|i| KEYWORDS[i].1)
        .unwrap_or(TokenKind::Id)
}

fn parse_hex_float(text: &str) -> Option<f64> {
    // Minimal C99-style hex float support (0x1.8p3); falls back to a plain
    // hex-integer-as-float reading when no binary exponent is present.
    let body = text.strip_prefix("0x").unwrap_or(text);
    let (mantissa, exp) = match body.split_once(['p', 'P']) {
        Some((m, e)) => (m, e.parse::<i32>().ok()?),
        None => (body, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let int_val = if int_part.is_empty() {
        0u64
    } else {
        u64::from_str_radix(int_part, 16).ok()?
    };
    let mut frac_val = 0.0f64;
    let mut scale = 1.0f64 / 16.0;
    for c in frac_part.chars() {
        frac_val += (c.to_digit(16)? as f64) * scale;
        scale /= 16.0;
    }
    Some((int_val as f64 + frac_val) * 2f64.powi(exp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compiler_base::error::DiagnosticBag;

    fn scan_all(src: &str) -> (Vec<TokenKind>, DiagnosticBag) {
        let bag = DiagnosticBag::new();
        let name = compiler_base::intern::intern("t.lang");
        let mut scanner = Scanner::new(name, src.as_bytes(), &bag);
        let mut kinds = Vec::new();
        loop {
            kinds.push(scanner.tok.kind);
            if scanner.tok.kind == TokenKind::Eof {
                break;
            }
            scanner.advance();
        }
        (kinds, bag)
    }

    #[test]
    fn implicit_semicolon_inserted_between_identifiers_on_newline() {
        let (kinds, _) = scan_all("a\nb");
        assert_eq!(
            kinds,
            vec![TokenKind::Id, TokenKind::Semi, TokenKind::Id, TokenKind::Eof]
        );
    }

    #[test]
    fn operator_before_newline_suppresses_implicit_semicolon() {
        let (kinds, _) = scan_all("a +\n b");
        assert_eq!(
            kinds,
            vec![TokenKind::Id, TokenKind::Plus, TokenKind::Id, TokenKind::Eof]
        );
    }

    #[test]
    fn keyword_table_reclassifies_identifier() {
        let (kinds, _) = scan_all("fun return if else for let var mut this type");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Fun,
                TokenKind::Return,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::For,
                TokenKind::Let,
                TokenKind::Var,
                TokenKind::Mut,
                TokenKind::This,
                TokenKind::Type,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn hex_octal_binary_bases_decode_correctly() {
        let bag = DiagnosticBag::new();
        let name = compiler_base::intern::intern("t.lang");
        let mut s = Scanner::new(name, b"0xFF 0b101 0o17", &bag);
        assert_eq!(s.tok.value, LitValue::Int(255));
        s.advance();
        assert_eq!(s.tok.value, LitValue::Int(5));
        s.advance();
        assert_eq!(s.tok.value, LitValue::Int(15));
    }

    #[test]
    fn overflow_is_reported() {
        let (_, bag) = scan_all("0xFFFFFFFFFFFFFFFF1");
        assert!(bag.has_errors());
    }

    #[test]
    fn trailing_underscore_is_an_error() {
        let (_, bag) = scan_all("0x1ff_");
        assert!(bag.has_errors());
    }

    #[test]
    fn dot_digit_is_a_float_literal() {
        let bag = DiagnosticBag::new();
        let name = compiler_base::intern::intern("t.lang");
        let s = Scanner::new(name, b"3.5", &bag);
        assert_eq!(s.tok.kind, TokenKind::FloatLit);
        assert_eq!(s.tok.value, LitValue::Float(3.5));
    }

    #[test]
    fn int_rewinds_into_float_on_dot() {
        let bag = DiagnosticBag::new();
        let name = compiler_base::intern::intern("t.lang");
        let s = Scanner::new(name, b"10.25", &bag);
        assert_eq!(s.tok.kind, TokenKind::FloatLit);
        assert_eq!(s.tok.value, LitValue::Float(10.25));
    }

    #[test]
    fn line_comment_is_skipped() {
        let (kinds, _) = scan_all("a // comment\nb");
        assert_eq!(
            kinds,
            vec![TokenKind::Id, TokenKind::Semi, TokenKind::Id, TokenKind::Eof]
        );
    }

    #[test]
    fn block_comment_with_slash_star_slash_does_not_close_early() {
        // "/*/" must not be interpreted as a closed comment.
        let (kinds, bag) = scan_all("/*/ still a comment */ a");
        assert!(!bag.has_errors());
        assert_eq!(kinds, vec![TokenKind::Id, TokenKind::Eof]);
    }

    #[test]
    fn compound_assignment_and_shift_operators_scan() {
        let (kinds, _) = scan_all("<<= >>= += -= &&");
        assert_eq!(
            kinds,
            vec![
                TokenKind::ShlEq,
                TokenKind::ShrEq,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::AmpAmp,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn eof_with_pending_semicolon_flag_emits_one_final_semi() {
        let (kinds, _) = scan_all("a");
        assert_eq!(kinds, vec![TokenKind::Id, TokenKind::Semi, TokenKind::Eof]);
    }
}
