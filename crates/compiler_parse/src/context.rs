//! The compiler context consumed read-only by the parser, and the input
//! it parses.
//!
//! Grounded on the reference implementation's `compiler_t`/`input_t`
//! pair (`compiler.c`): a parser is handed target configuration and a
//! diagnostic sink it does not own, plus one input buffer per `parse` call.
//! Everything here is read-only from the parser's point of view — target
//! configuration and the diagnostic sink are owned by the host.

use compiler_base::error::DiagnosticSink;
use compiler_base::Symbol;

/// Target configuration the parser reads but never mutates: only the
/// pointer size matters to this layer (the `this`-by-value optimization and
/// the size/align of pointer-shaped types both key off it).
#[derive(Debug, Clone, Copy)]
pub struct CompilerContext<'a> {
    pub ptr_size: u32,
    pub diagnostics: &'a dyn DiagnosticSink,
}

impl<'a> CompilerContext<'a> {
    pub fn new(ptr_size: u32, diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self {
            ptr_size,
            diagnostics,
        }
    }
}

/// One source buffer handed to `parser-parse`: a byte slice plus a display
/// name. Typically backed by a memory-mapped file on the host side, but any
/// buffer works — the parser never touches a filesystem.
pub struct Input<'a> {
    pub name: Symbol,
    pub bytes: &'a [u8],
}

impl<'a> Input<'a> {
    pub fn new(name: &str, bytes: &'a [u8]) -> Self {
        Self {
            name: compiler_base::intern::intern(name),
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compiler_base::error::DiagnosticBag;

    #[test]
    fn context_carries_ptr_size_and_sink() {
        let bag = DiagnosticBag::new();
        let ctx = CompilerContext::new(8, &bag);
        assert_eq!(ctx.ptr_size, 8);
    }

    #[test]
    fn input_interns_its_name() {
        let bytes = b"fun f() {}";
        let input = Input::new("a.lang", bytes);
        assert_eq!(input.name.as_str(), "a.lang");
        assert_eq!(input.bytes, bytes);
    }
}
