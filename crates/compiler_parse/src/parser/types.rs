//! Type-position parsing: prefix parselets for `ID`, `{` (struct body),
//! `fun(` (function type), `*`, `&`, `mut &`, `?` (§4.4.2).
//!
//! Unlike expressions and statements, parsed types resolve immediately to
//! a canonical [`TypeRef`] through [`crate::types::intern_type`] rather
//! than living in the unit's arena — the type interner is process-wide, so
//! a type expression never needs its own AST node kept around afterward.

use compiler_base::Symbol;

use super::Parser;
use crate::ast::Binding;
use crate::token::TokenKind;
use crate::types::{intern_type, Field, TypeKind, TypeRef, TypeShape};
use crate::universe;

impl<'a, 'src> Parser<'a, 'src> {
    /// Parses one type expression.
    pub(crate) fn parse_type(&mut self) -> TypeRef {
        match self.cur() {
            TokenKind::Id => self.parse_named_type(),
            TokenKind::LBrace => self.parse_struct_type(),
            TokenKind::Fun => self.parse_fun_type(),
            TokenKind::Star => {
                self.bump();
                let elem = self.parse_type();
                self.mk_pointer_shaped(TypeKind::Ptr, elem)
            }
            TokenKind::Mut => {
                self.bump();
                if !self.expect(TokenKind::Amp, "'&' after 'mut' in a type") {
                    return universe::unknown_type();
                }
                let elem = self.parse_type();
                self.mk_pointer_shaped(TypeKind::MutRef, elem)
            }
            TokenKind::Amp => {
                self.bump();
                let elem = self.parse_type();
                self.mk_pointer_shaped(TypeKind::Ref, elem)
            }
            TokenKind::Question => {
                self.bump();
                let elem = self.parse_type();
                intern_type(TypeKind::Optional, elem.size, elem.align, false, TypeShape::Optional(elem))
            }
            TokenKind::LBrack => {
                self.bump();
                self.parse_array_or_slice_type()
            }
            _ => {
                self.error("expected a type");
                universe::unknown_type()
            }
        }
    }

    fn mk_pointer_shaped(&self, kind: TypeKind, elem: TypeRef) -> TypeRef {
        intern_type(kind, self.ptr_size, self.ptr_size, false, TypeShape::Elem(elem))
    }

    /// `[]T` (slice) or `[N]T` (array). `mut` after `[` selects the mutable
    /// slice variant; arrays have no mutable counterpart distinct from
    /// their element's own mutability.
    fn parse_array_or_slice_type(&mut self) -> TypeRef {
        if self.eat(TokenKind::RBrack) {
            let elem = self.parse_type();
            return self.mk_pointer_shaped(TypeKind::Slice, elem);
        }
        let len = match self.scanner().tok.value {
            crate::token::LitValue::Int(n) => n,
            _ => {
                self.error("expected an array length or ']'");
                0
            }
        };
        self.bump();
        if !self.expect(TokenKind::RBrack, "']'") {
            return universe::unknown_type();
        }
        let elem = self.parse_type();
        intern_type(
            TypeKind::Array,
            (len as u32).saturating_mul(elem.size),
            elem.align,
            false,
            TypeShape::Array { len, elem },
        )
    }

    fn parse_named_type(&mut self) -> TypeRef {
        let name = compiler_base::intern::intern(self.scanner().tok.lit);
        let loc = self.cur_range();
        self.bump();
        match self.resolve(name) {
            Some(Binding::Ty(t)) => t,
            Some(Binding::Value(_)) => {
                self.diag_at(loc, format!("\"{}\" is not a type", name.as_str()));
                universe::unknown_type()
            }
            None => {
                self.diag_at(loc, format!("undeclared type \"{}\"", name.as_str()));
                universe::unknown_type()
            }
        }
    }

    fn diag_at(&self, loc: compiler_base::span::SourceRange, msg: impl Into<String>) {
        use compiler_base::error::{Diagnostic, DiagnosticSink};
        self.diagnostics.report(Diagnostic::error(loc, msg));
    }

    /// `fun( params ) RESULT?` in type position — a function type, not a
    /// declaration. Parameter names, if given, are discarded; only types
    /// matter, reusing the same two-form disambiguation a `fun` declaration
    /// parses its parameter list with (§4.4.2).
    fn parse_fun_type(&mut self) -> TypeRef {
        self.bump(); // `fun`
        let (specs, _) = self.parse_param_list(false);
        let params: Vec<TypeRef> = specs
            .into_iter()
            .map(|p| p.ty.unwrap_or_else(universe::unknown_type))
            .collect();
        let result = if self.is_type_starter() {
            self.parse_type()
        } else {
            universe::void_type()
        };
        intern_type(
            TypeKind::Fun,
            self.ptr_size,
            self.ptr_size,
            false,
            TypeShape::Fun { params, result },
        )
    }

    pub(crate) fn is_type_starter(&self) -> bool {
        matches!(
            self.cur(),
            TokenKind::Id
                | TokenKind::Star
                | TokenKind::Amp
                | TokenKind::Mut
                | TokenKind::Question
                | TokenKind::LBrace
                | TokenKind::LBrack
                | TokenKind::Fun
        )
    }

    /// `{ field-set* }` — a struct body (§4.4.2). Accumulates fields, then
    /// `align := max(field.align)`, `size := round_up(sum(field.size),
    /// align)`. Methods declared in the same body are parsed by the caller
    /// (`parse_fun_decl`) after the type itself is interned, since methods
    /// need the receiver type to already exist.
    fn parse_struct_type(&mut self) -> TypeRef {
        self.bump(); // `{`
        let (fields, seen) = self.parse_field_set(true);
        let _ = seen;
        self.expect(TokenKind::RBrace, "'}' to close struct body");
        intern_struct(fields)
    }

    /// Accumulates a struct's `field-set` (§4.4.2): `name (, name)* TYPE (=
    /// expr)?` repeated until `}`, `fun`, or EOF. When `methods_forbidden`,
    /// a `fun` encountered mid-body is an error (a bare struct-type
    /// expression cannot declare methods); otherwise the caller — parsing a
    /// `type NAME { ... }` declaration — stops at the first `fun` and
    /// parses methods itself once the struct type is interned.
    pub(crate) fn parse_field_set(
        &mut self,
        methods_forbidden: bool,
    ) -> (Vec<Field>, std::collections::HashSet<Symbol>) {
        let mut fields: Vec<Field> = Vec::new();
        let mut seen: std::collections::HashSet<Symbol> = std::collections::HashSet::new();

        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Fun) {
                if !methods_forbidden {
                    break;
                }
                self.error("methods may only appear in a 'type NAME { ... }' declaration");
                self.recover(&[TokenKind::Semi, TokenKind::RBrace]);
                self.eat(TokenKind::Semi);
                continue;
            }

            let mut names = Vec::new();
            loop {
                if !self.at(TokenKind::Id) {
                    self.error("expected a field name");
                    break;
                }
                names.push(compiler_base::intern::intern(self.scanner().tok.lit));
                self.bump();
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            let ty = self.parse_type();
            for name in names {
                if !seen.insert(name) {
                    self.error(format!("duplicate field \"{}\"", name.as_str()));
                    continue;
                }
                fields.push(Field { name, ty });
            }
            if self.eat(TokenKind::Assign) {
                // Field default initializer: parsed for its side effects
                // (diagnostics, nrefs) but not retained on `Field`, which
                // only the type interner needs (§4.5 does not fold default
                // values into a struct's typeid).
                self.push_type_ctx(fields.last().map(|f| f.ty).unwrap_or(ty));
                let _ = self.parse_expr(super::Prec::Comma);
                self.pop_type_ctx();
            }
            if !self.eat(TokenKind::Semi) {
                break;
            }
        }
        (fields, seen)
    }
}

/// `align := max(field.align)`, `size := round-up(Σ field.size, align)`
/// (§4.4.2).
pub(crate) fn intern_struct(fields: Vec<Field>) -> TypeRef {
    let align = fields.iter().map(|f| f.ty.align).max().unwrap_or(1).max(1);
    let raw_size: u32 = fields.iter().map(|f| f.ty.size).sum();
    let size = round_up(raw_size, align);
    intern_type(TypeKind::Struct, size, align, false, TypeShape::Struct { fields })
}

fn round_up(n: u32, align: u32) -> u32 {
    if align == 0 {
        return n;
    }
    (n + align - 1) / align * align
}
