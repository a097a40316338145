//! Statement-level parsing (§4.4.1): the top-level and block statement
//! list, `type` and `fun` declarations, and method attachment.

use super::params::ParamSpec;
use super::{Parser, Prec};
use crate::ast::{Binding, Expr, ExprFlags, ExprKind, Param, Stmt, StmtKind};
use crate::token::TokenKind;
use crate::types::{claim_struct_name, intern_type, TypeKind, TypeRef, TypeShape};
use crate::universe;

impl<'a, 'src> Parser<'a, 'src> {
    /// Parses statements until a token in `stop` (or `Eof`) is reached.
    /// Used both for a whole unit (`stop = &[]`) and for `{ ... }` bodies
    /// via [`Parser::parse_block`], which calls `parse_expr` directly since
    /// blocks are themselves expressions — this entry point only serves
    /// top-level declarations, which are not.
    pub(crate) fn parse_stmt_list(&mut self, stop: &[TokenKind]) -> Vec<Stmt<'a>> {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eof) && !stop.contains(&self.cur()) {
            stmts.push(self.parse_stmt());
        }
        stmts
    }

    fn parse_stmt(&mut self) -> Stmt<'a> {
        let loc = self.cur_range();
        match self.cur() {
            TokenKind::Type => self.parse_type_decl(),
            TokenKind::Fun => {
                let e = self.parse_fun_common(None);
                Stmt::new(loc, StmtKind::Expr(e))
            }
            _ => {
                let e = self.parse_expr(Prec::Lowest);
                self.consume_stmt_terminator();
                Stmt::new(loc, StmtKind::Expr(e))
            }
        }
    }

    fn consume_stmt_terminator(&mut self) {
        if !self.eat(TokenKind::Semi)
            && !self.at(TokenKind::Eof)
            && !self.at(TokenKind::RBrace)
        {
            self.error("expected ';'");
            self.recover(&[TokenKind::Semi, TokenKind::RBrace]);
            self.eat(TokenKind::Semi);
        }
    }

    /// `type NAME TYPE` or `type NAME { field-set* fun* }` (§4.4.1). A
    /// struct body's fields are parsed first and the struct type interned,
    /// then any `fun`s in the same body are parsed as methods of that now-
    /// known receiver type — methods always follow fields in source order.
    ///
    /// A struct type that doesn't already have a name takes this one
    /// directly; any other underlying type (a primitive, or a struct
    /// that's already named) is wrapped in a `TypeShape::Alias` instead,
    /// so the name always resolves to a type but a struct is never renamed
    /// out from under an earlier declaration (§4.5).
    fn parse_type_decl(&mut self) -> Stmt<'a> {
        let loc = self.cur_range();
        self.bump(); // 'type'
        let name = self.expect_name();

        let is_struct_body = self.at(TokenKind::LBrace);
        let underlying = if is_struct_body {
            self.parse_struct_decl_body()
        } else {
            self.parse_type()
        };

        if !is_struct_body {
            // A struct body's closing '}' already behaves as a statement
            // terminator; anything else needs an explicit ';'.
            self.consume_stmt_terminator();
        }

        let ty = if claim_struct_name(underlying, name) {
            underlying
        } else {
            intern_type(
                TypeKind::Alias,
                underlying.size,
                underlying.align,
                underlying.is_unsigned,
                TypeShape::Alias { name, underlying },
            )
        };

        self.define(name, Binding::Ty(ty), loc);
        Stmt::new(loc, StmtKind::Typedef { name, ty })
    }

    fn parse_struct_decl_body(&mut self) -> TypeRef {
        self.bump(); // '{'
        let (fields, _seen) = self.parse_field_set(false);
        let ty = super::types::intern_struct(fields);
        while self.at(TokenKind::Fun) {
            self.parse_method_decl(ty);
        }
        self.expect(TokenKind::RBrace, "'}' to close a type body");
        ty
    }

    fn parse_method_decl(&mut self, receiver: TypeRef) {
        let fun = self.parse_fun_common(Some(receiver));
        if let ExprKind::Fun { name: Some(name), .. } = &fun.kind {
            let name = *name;
            if self.methodmap.insert(receiver, name, fun).is_err() {
                self.error_at(
                    fun.loc,
                    format!("\"{}\" collides with an existing field or method", name.as_str()),
                );
            }
        }
    }

    /// `fun NAME?( params ) RESULT? BLOCK?` shared by free functions and
    /// methods. `receiver` is `Some` exactly when parsing a method body,
    /// which allows a leading `this`/`mut this` parameter and pushes a
    /// dot-context for the shorthand `.name` (§4.4.1, §4.4.3).
    fn parse_fun_common(&mut self, receiver: Option<TypeRef>) -> &'a Expr<'a> {
        let loc = self.cur_range();
        self.bump(); // 'fun'
        let name = if self.at(TokenKind::Id) {
            Some(self.expect_name())
        } else {
            None
        };

        let (specs, _is_name_type) = self.parse_param_list(receiver.is_some());

        self.push_scope();
        let mut param_exprs: Vec<&'a Expr<'a>> = Vec::with_capacity(specs.len());
        let mut signature_types: Vec<TypeRef> = Vec::with_capacity(specs.len());
        let mut this_expr: Option<&'a Expr<'a>> = None;

        for spec in specs {
            self.push_one_param(receiver, spec, &mut param_exprs, &mut signature_types, &mut this_expr);
        }

        if let Some(this) = this_expr {
            self.dotctx.push(this);
        }

        let result_ty = if self.is_type_starter() {
            self.parse_type()
        } else {
            universe::void_type()
        };

        let body = if self.at(TokenKind::LBrace) {
            // A function body's value is only usable as an implicit return
            // when the function actually declares a non-`void` result; a
            // `void` function's body is never itself an rvalue.
            let is_rvalue = !matches!(result_ty.kind, TypeKind::Void);
            Some(self.parse_block(is_rvalue))
        } else {
            self.consume_stmt_terminator();
            None
        };

        if this_expr.is_some() {
            self.dotctx.pop();
        }
        self.pop_scope();

        let fun_ty = intern_type(
            TypeKind::Fun,
            self.ptr_size,
            self.ptr_size,
            false,
            TypeShape::Fun {
                params: signature_types,
                result: result_ty,
            },
        );
        let params_slice = self.arena().alloc_slice(param_exprs);
        let fun_expr = self.arena().alloc(Expr::new(
            loc,
            fun_ty,
            ExprKind::Fun {
                name,
                params: params_slice,
                body,
            },
        ));

        if let Some(n) = name {
            if receiver.is_none() {
                self.define(n, Binding::Value(fun_expr), loc);
            } else if n.as_str() != "this" {
                self.error_at(loc, "a method with a 'this' parameter cannot also be named");
            }
        }
        fun_expr
    }

    fn push_one_param(
        &mut self,
        receiver: Option<TypeRef>,
        spec: ParamSpec,
        param_exprs: &mut Vec<&'a Expr<'a>>,
        signature_types: &mut Vec<TypeRef>,
        this_expr: &mut Option<&'a Expr<'a>>,
    ) {
        if spec.is_this {
            let recv = match receiver {
                Some(r) => r,
                None => {
                    self.error_at(spec.loc, "'this' may only appear in a method parameter list");
                    universe::unknown_type()
                }
            };
            let ty = this_param_type(recv, spec.is_mut_this, self.ptr_size);
            let param = Param::new(spec.name, ty, true, spec.is_mut_this, spec.loc);
            let e = self.arena().alloc(Expr::new(spec.loc, ty, ExprKind::Param(param)));
            e.flags.set(e.flags.get() | ExprFlags::IS_THIS);
            self.define(spec.name, Binding::Value(e), spec.loc);
            param_exprs.push(e);
            *this_expr = Some(e);
            // `this` is excluded from the function type's signature so
            // positional call-argument correspondence skips it (§4.4.3).
            return;
        }

        let ty = spec.ty.unwrap_or_else(universe::unknown_type);
        let param = Param::new(spec.name, ty, false, false, spec.loc);
        let e = self.arena().alloc(Expr::new(spec.loc, ty, ExprKind::Param(param)));
        self.define(spec.name, Binding::Value(e), spec.loc);
        param_exprs.push(e);
        signature_types.push(ty);
    }
}

/// `this`/`mut this` parameter typing (§4.4.1): a mutable receiver always
/// becomes a `mut &` to the receiver type; a non-mutable receiver is passed
/// by value when it is a primitive or a "small" struct (`align <= ptrsize`,
/// `size <= 2*ptrsize`), and otherwise becomes a plain `&`.
fn this_param_type(receiver: TypeRef, is_mut: bool, ptr_size: u32) -> TypeRef {
    if is_mut {
        return intern_type(
            TypeKind::MutRef,
            ptr_size,
            ptr_size,
            false,
            TypeShape::Elem(receiver),
        );
    }
    if receiver.is_small(ptr_size) {
        return receiver;
    }
    intern_type(TypeKind::Ref, ptr_size, ptr_size, false, TypeShape::Elem(receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CompilerContext, Input};
    use compiler_base::error::DiagnosticBag;
    use compiler_base::AstArena;

    fn parse(src: &str) -> (crate::ast::Unit<'static>, &'static DiagnosticBag) {
        let bag: &'static DiagnosticBag = Box::leak(Box::new(DiagnosticBag::new()));
        let arena: &'static AstArena = Box::leak(Box::new(AstArena::new()));
        let ctx = CompilerContext::new(8, bag);
        let mut parser: Parser<'static, 'static> = Parser::new(ctx);
        let src_owned: &'static [u8] = Box::leak(src.as_bytes().to_vec().into_boxed_slice());
        let input = Input::new("t.lang", src_owned);
        let unit = parser.parse(arena, input);
        (unit, bag)
    }

    #[test]
    fn free_function_declaration_parses_without_errors() {
        let (unit, bag) = parse("fun add(x i32, y i32) i32 { x + y }");
        assert_eq!(unit.children.len(), 1);
        assert!(!bag.has_errors());
    }

    #[test]
    fn type_alias_declaration_parses() {
        let (unit, bag) = parse("type MyInt i32;");
        assert_eq!(unit.children.len(), 1);
        assert!(!bag.has_errors());
        match &unit.children[0].kind {
            StmtKind::Typedef { ty, .. } => {
                assert!(matches!(ty.shape, TypeShape::Alias { .. }), "aliasing a primitive must wrap it");
                assert_eq!(ty.kind, TypeKind::Alias);
            }
            other => panic!("expected Typedef, got {other:?}"),
        }
    }

    #[test]
    fn struct_with_method_attaches_to_methodmap() {
        let (unit, bag) = parse(
            "type Point { x i32, y i32; fun sum(this) i32 { this.x + this.y } }",
        );
        assert_eq!(unit.children.len(), 1);
        assert!(!bag.has_errors());
        match &unit.children[0].kind {
            StmtKind::Typedef { ty, .. } => {
                assert!(!matches!(ty.shape, TypeShape::Alias { .. }), "a fresh struct takes the name directly");
                assert_eq!(ty.kind, TypeKind::Struct);
            }
            other => panic!("expected Typedef, got {other:?}"),
        }
    }

    #[test]
    fn second_name_for_an_already_named_struct_wraps_in_an_alias() {
        let (unit, bag) = parse("type Point { x i32, y i32 } type AliasOfPoint Point;");
        assert_eq!(unit.children.len(), 2);
        assert!(!bag.has_errors());
        match &unit.children[1].kind {
            StmtKind::Typedef { ty, .. } => {
                assert!(
                    matches!(ty.shape, TypeShape::Alias { .. }),
                    "a struct that already has a name must not be renamed out from under it"
                );
            }
            other => panic!("expected Typedef, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_definition_is_an_error() {
        let (_unit, bag) = parse("let a = 1; let a = 2;");
        assert!(bag.has_errors());
    }
}
