//! Shared parameter-list parsing for `fun NAME(...)` declarations and
//! `fun(...)` type expressions (§4.4.2).
//!
//! Grounded closely on the reference implementation's `fun_params`: a
//! parameter list is either **name-and-type** (`x, y T, z Y`) or
//! **type-only** (`T1, T2`), and the parser doesn't know which until it
//! sees the first explicit type following a bare name. Bare names seen
//! before that point queue in `typeq` and receive the type retroactively;
//! if the list turns out to be type-only, queued "names" were actually
//! type names all along.

use compiler_base::Symbol;

use super::Parser;
use crate::token::TokenKind;
use crate::types::TypeRef;

/// One parsed parameter slot before its type (and, for `this`, its
/// pass-by-value/reference choice) is finalized.
pub(crate) struct ParamSpec {
    pub name: Symbol,
    pub ty: Option<TypeRef>,
    pub is_this: bool,
    pub is_mut_this: bool,
    pub loc: compiler_base::span::SourceRange,
}

impl<'a, 'src> Parser<'a, 'src> {
    /// Parses `( param (, param)* )`. `allow_this` gates recognizing a
    /// leading `this`/`mut this` parameter; callers for bare function
    /// *types* pass `false` since there is no method receiver to bind to.
    pub(crate) fn parse_param_list(&mut self, allow_this: bool) -> (Vec<ParamSpec>, bool) {
        let mut params = Vec::new();
        let mut typeq: Vec<usize> = Vec::new();
        let mut is_name_type = false;

        if !self.expect(TokenKind::LParen, "'(' to start parameter list") {
            return (params, is_name_type);
        }

        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let mut consumed_mut = false;
            if allow_this && params.is_empty() && self.at(TokenKind::Mut) {
                self.bump();
                consumed_mut = true;
            }
            let at_this = self.at(TokenKind::This)
                || (self.at(TokenKind::Id) && self.scanner().tok.lit == "this");

            if allow_this && params.is_empty() && at_this {
                let name = compiler_base::intern::intern(self.scanner().tok.lit);
                let loc = self.cur_range();
                self.bump();
                params.push(ParamSpec {
                    name,
                    ty: None,
                    is_this: true,
                    is_mut_this: consumed_mut,
                    loc,
                });
                is_name_type = true;
                self.consume_param_separator();
                continue;
            }
            if consumed_mut {
                self.error("expected 'this' after 'mut' in a parameter list");
            }

            if self.at(TokenKind::Id) {
                let name = compiler_base::intern::intern(self.scanner().tok.lit);
                let loc = self.cur_range();
                self.bump();

                match self.cur() {
                    TokenKind::RParen | TokenKind::Comma | TokenKind::Semi => {
                        typeq.push(params.len());
                        params.push(ParamSpec {
                            name,
                            ty: None,
                            is_this: false,
                            is_mut_this: false,
                            loc,
                        });
                    }
                    _ => {
                        let ty = self.parse_type();
                        is_name_type = true;
                        for &i in &typeq {
                            params[i].ty = Some(ty);
                        }
                        typeq.clear();
                        params.push(ParamSpec {
                            name,
                            ty: Some(ty),
                            is_this: false,
                            is_mut_this: false,
                            loc,
                        });
                    }
                }
            } else {
                let loc = self.cur_range();
                let ty = self.parse_type();
                params.push(ParamSpec {
                    name: Symbol::underscore(),
                    ty: Some(ty),
                    is_this: false,
                    is_mut_this: false,
                    loc,
                });
            }

            if !self.consume_param_separator() {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' to end parameter list");

        if is_name_type {
            if !typeq.is_empty() {
                self.error("expecting type");
                for &i in &typeq {
                    params[i].ty = Some(crate::universe::void_type());
                }
            }
        } else {
            for p in &mut params {
                if p.ty.is_none() {
                    p.ty = Some(self.named_type_or_unknown(p.name, p.loc));
                    p.name = Symbol::underscore();
                }
            }
        }

        (params, is_name_type)
    }

    fn consume_param_separator(&mut self) -> bool {
        match self.cur() {
            TokenKind::Comma | TokenKind::Semi => {
                self.bump();
                !self.at(TokenKind::RParen)
            }
            TokenKind::RParen => false,
            _ => {
                self.error("expecting ',' ';' or ')'");
                self.recover(&[TokenKind::RParen, TokenKind::Semi]);
                false
            }
        }
    }

    fn named_type_or_unknown(
        &mut self,
        name: Symbol,
        loc: compiler_base::span::SourceRange,
    ) -> TypeRef {
        use crate::ast::Binding;
        match self.resolve(name) {
            Some(Binding::Ty(t)) => t,
            _ => {
                use compiler_base::error::{Diagnostic, DiagnosticSink};
                self.diagnostics
                    .report(Diagnostic::error(loc, format!("undeclared type \"{}\"", name.as_str())));
                crate::universe::unknown_type()
            }
        }
    }
}
