//! Shared parsing harness for the integration suite.
//!
//! Every scenario needs the same three things alive for the duration of one
//! `parse` call: a diagnostic sink, an AST arena, and the parser itself.
//! Leaking them to `'static` keeps each test a one-line `parse(src)` call
//! instead of threading lifetimes through every test body.

use compiler_base::error::DiagnosticBag;
use compiler_base::AstArena;
use compiler_parse::context::{CompilerContext, Input};
use compiler_parse::{Parser, Unit};

pub const PTR_SIZE: u32 = 8;

pub fn parse(src: &str) -> (Unit<'static>, &'static DiagnosticBag) {
    let (unit, _parser, bag) = parse_keep(src);
    (unit, bag)
}

/// Like [`parse`], but also returns the `Parser` — needed by scenarios that
/// look a method up in the method map after parsing completes.
pub fn parse_keep(src: &str) -> (Unit<'static>, Parser<'static, 'static>, &'static DiagnosticBag) {
    let bag: &'static DiagnosticBag = Box::leak(Box::new(DiagnosticBag::new()));
    let arena: &'static AstArena = Box::leak(Box::new(AstArena::new()));
    let ctx = CompilerContext::new(PTR_SIZE, bag);
    let mut parser: Parser<'static, 'static> = Parser::new(ctx);
    let owned: &'static [u8] = Box::leak(src.as_bytes().to_vec().into_boxed_slice());
    let input = Input::new("scenario.lang", owned);
    let unit = parser.parse(arena, input);
    (unit, parser, bag)
}

pub fn messages(bag: &DiagnosticBag) -> Vec<String> {
    bag.diagnostics().into_iter().map(|d| d.message).collect()
}
