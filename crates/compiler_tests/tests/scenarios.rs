//! The six concrete scenarios from the front-end's testable-properties list,
//! plus a couple of the boundary behaviors named alongside them, driven end
//! to end through the public parser API.

mod common;

use compiler_base::intern::intern;
use compiler_parse::ast::{ExprKind, StmtKind};
use compiler_parse::types::TypeKind;

#[test]
fn function_with_method() {
    let (unit, parser, bag) = common::parse_keep(
        "type Foo { x i32; fun bar(this) i32 { this.x } }",
    );
    assert!(!bag.has_errors(), "{:?}", common::messages(bag));
    assert_eq!(unit.children.len(), 1);

    let StmtKind::Typedef { name, ty } = &unit.children[0].kind else {
        panic!("expected a typedef statement");
    };
    assert_eq!(name.as_str(), "Foo");

    let fields = match &ty.shape {
        compiler_parse::types::TypeShape::Struct { fields } => fields,
        other => panic!("expected a struct, got {:?}", other),
    };
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name.as_str(), "x");
    assert_eq!(fields[0].ty.kind, TypeKind::I32);

    let bar = parser
        .methods()
        .lookup(*ty, intern("bar"))
        .expect("bar should be registered as a method of Foo");
    let ExprKind::Fun { params, body, .. } = &bar.kind else {
        panic!("expected a function expression");
    };
    assert_eq!(params.len(), 1);
    let ExprKind::Param(this_param) = &params[0].kind else {
        panic!("expected a param node");
    };
    assert!(this_param.is_this);
    // Foo is a one-field i32 struct: small enough to pass `this` by value,
    // so its type is the receiver type itself, not a reference to it.
    assert!(std::ptr::eq(this_param.ty, *ty));

    let body = body.expect("bar should have a body");
    let ExprKind::Block { stmts, .. } = &body.kind else {
        panic!("expected a block body");
    };
    assert_eq!(stmts.len(), 1);
    let StmtKind::Expr(member_expr) = &stmts[0].kind else {
        panic!("expected an expression statement");
    };
    assert!(matches!(member_expr.kind, ExprKind::Member { .. }));
    assert_eq!(member_expr.ty.get().kind, TypeKind::I32);
}

#[test]
fn optional_narrowing() {
    let (unit, bag) = common::parse("var x ?i32 = 0\nif x { x + 1 }");
    assert!(!bag.has_errors(), "{:?}", common::messages(bag));
    assert_eq!(unit.children.len(), 2);

    let StmtKind::Expr(if_expr) = &unit.children[1].kind else {
        panic!("expected the 'if' as the second statement");
    };
    let ExprKind::If { cond, then_branch, .. } = &if_expr.kind else {
        panic!("expected an if expression");
    };
    // The condition itself still refers to the un-narrowed `?i32` binding.
    assert_eq!(cond.ty.get().kind, TypeKind::Optional);

    let ExprKind::Block { stmts, .. } = &then_branch.kind else {
        panic!("expected a block");
    };
    let StmtKind::Expr(sum) = &stmts[0].kind else {
        panic!("expected an expression statement");
    };
    let ExprKind::BinOp { lhs, .. } = &sum.kind else {
        panic!("expected a binary expression");
    };
    // Inside the `then` block, `x` resolves to the narrowed `i32`.
    assert_eq!(lhs.ty.get().kind, TypeKind::I32);
}

#[test]
fn duplicate_definition() {
    let (unit, bag) = common::parse("let a = 1; let a = 2;");
    assert!(bag.has_errors());
    let msgs = common::messages(bag);
    assert_eq!(
        msgs.iter().filter(|m| m.contains("redefinition") && m.contains('a')).count(),
        1,
        "expected exactly one redefinition diagnostic, got {:?}",
        msgs
    );
    assert_eq!(unit.children.len(), 2);
}

#[test]
fn type_interning_shares_identical_function_types() {
    let (unit, bag) =
        common::parse("fun f(x i32, y i32) i32 { x + y }\nfun g(a i32, b i32) i32 { a - b }");
    assert!(!bag.has_errors(), "{:?}", common::messages(bag));
    assert_eq!(unit.children.len(), 2);

    let StmtKind::Expr(f) = &unit.children[0].kind else { panic!("expected an expr stmt") };
    let StmtKind::Expr(g) = &unit.children[1].kind else { panic!("expected an expr stmt") };
    assert!(std::ptr::eq(f.ty.get(), g.ty.get()));
}

#[test]
fn unreachable_code_after_return() {
    let (unit, bag) = common::parse("fun f() { return; 1 + 2 }");
    let msgs = common::messages(bag);
    assert_eq!(
        msgs.iter().filter(|m| m.contains("unreachable code")).count(),
        1,
        "expected exactly one unreachable-code warning, got {:?}",
        msgs
    );

    let StmtKind::Expr(fun) = &unit.children[0].kind else { panic!("expected an expr stmt") };
    let ExprKind::Fun { body, .. } = &fun.kind else { panic!("expected a function") };
    let ExprKind::Block { stmts, exits, warned_unreachable, .. } = &body.unwrap().kind else {
        panic!("expected a block");
    };
    assert_eq!(stmts.len(), 2);
    assert!(exits.get());
    assert!(warned_unreachable.get());
}

#[test]
fn invalid_dereference() {
    let (unit, bag) = common::parse("let x = 1; *x;");
    assert!(bag.has_errors());
    let msgs = common::messages(bag);
    assert!(
        msgs.iter().any(|m| m.contains("dereference")),
        "expected a dereference diagnostic, got {:?}",
        msgs
    );

    assert_eq!(unit.children.len(), 2);
    let StmtKind::Expr(deref) = &unit.children[1].kind else { panic!("expected an expr stmt") };
    assert!(matches!(deref.kind, ExprKind::Deref { .. }));
    assert_eq!(deref.ty.get().kind, TypeKind::Void);
}

#[test]
fn implicit_semicolon_boundary_behavior() {
    let (two, bag_two) = common::parse("let a = 1\nlet b = 2");
    assert!(!bag_two.has_errors(), "{:?}", common::messages(bag_two));
    assert_eq!(two.children.len(), 2);

    // An operator right before a newline suppresses insertion: this parses
    // as one `let` whose initializer continues onto the next line.
    let (one, bag_one) = common::parse("let a = 1 +\n2");
    assert!(!bag_one.has_errors(), "{:?}", common::messages(bag_one));
    assert_eq!(one.children.len(), 1);
}

#[test]
fn negative_literal_selects_widening_int_type() {
    let (unit, bag) = common::parse("let x = -0x8000000000000000;");
    assert!(!bag.has_errors(), "{:?}", common::messages(bag));
    let StmtKind::Expr(letb) = &unit.children[0].kind else { panic!("expected an expr stmt") };
    let ExprKind::Let { init, .. } = &letb.kind else { panic!("expected a let binding") };
    assert_eq!(init.ty.get().kind, TypeKind::I64);
}

#[test]
fn unknown_member_target_is_none_but_node_is_produced() {
    let (unit, bag) = common::parse("let a = 1; a.missing;");
    assert!(bag.has_errors());
    let StmtKind::Expr(member) = &unit.children[1].kind else { panic!("expected an expr stmt") };
    let ExprKind::Member { target, .. } = &member.kind else { panic!("expected a member expr") };
    assert!(target.get().is_none());
}
