//! Abstract syntax tree: tagged variants per node category.
//!
//! The reference implementation represents every node as a tagged record —
//! a leading `kind` field followed by a cast to the matching concrete
//! struct. Rust expresses that directly as an enum: `ExprKind` carries one
//! variant per expression kind, and "is this a storage expression?" becomes
//! an exhaustive match instead of a kind-tag switch.
//!
//! Type nodes are not part of this arena: a parsed type expression resolves
//! immediately to a [`crate::types::TypeRef`], a process-wide interned
//! pointer, so `Expr::ty` borrows no lifetime from the unit's arena at all.

use std::cell::Cell;

use bitflags::bitflags;
use compiler_base::span::SourceRange;
use compiler_base::Symbol;

use crate::types::TypeRef;

bitflags! {
    /// The "expression-flags bitset" threaded through the Pratt core
    /// (§4.4). Distinct from any single node's own narrow-purpose state
    /// (e.g. a block's `exits`), which is stored on that variant directly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExprFlags: u8 {
        /// Cleared from a block-interior expression that is not actually
        /// the block's resulting value.
        const IS_RVALUE = 1 << 0;
        /// Set on the shadow binding introduced by optional narrowing.
        const IS_NARROWED = 1 << 1;
        /// Set on the synthesized reference-to-`this` parameter.
        const IS_THIS = 1 << 2;
    }
}

impl Default for ExprFlags {
    fn default() -> Self {
        ExprFlags::IS_RVALUE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Plus,
    Minus,
    Not,
    BitNot,
    Ref,
    MutRef,
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ShlAssign,
    ShrAssign,
    BitAndAssign,
    BitXorAssign,
    BitOrAssign,
}

impl BinOp {
    /// `true` for the compound/plain assignment family — used by diagnostics
    /// that skip lvalue enforcement at parse time (§9, Open Questions).
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinOp::Assign
                | BinOp::AddAssign
                | BinOp::SubAssign
                | BinOp::MulAssign
                | BinOp::DivAssign
                | BinOp::RemAssign
                | BinOp::ShlAssign
                | BinOp::ShrAssign
                | BinOp::BitAndAssign
                | BinOp::BitXorAssign
                | BinOp::BitOrAssign
        )
    }
}

/// A resolved `expr.name` target: either a field slot or a method.
#[derive(Debug, Clone, Copy)]
pub enum MemberTarget<'a> {
    Field(usize),
    Method(&'a Expr<'a>),
}

/// A function parameter.
#[derive(Debug)]
pub struct Param<'a> {
    pub name: Symbol,
    pub ty: TypeRef,
    pub is_this: bool,
    pub is_mut_this: bool,
    pub loc: SourceRange,
    pub nrefs: Cell<u32>,
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a> Param<'a> {
    pub fn new(name: Symbol, ty: TypeRef, is_this: bool, is_mut_this: bool, loc: SourceRange) -> Self {
        Self {
            name,
            ty,
            is_this,
            is_mut_this,
            loc,
            nrefs: Cell::new(0),
            _marker: std::marker::PhantomData,
        }
    }
}

/// The shape-specific payload of an [`Expr`].
pub enum ExprKind<'a> {
    Id {
        name: Symbol,
        resolved: Cell<Option<&'a Expr<'a>>>,
    },
    IntLit(u64),
    FloatLit(f64),
    BoolLit(bool),
    /// An expression that denotes a type itself — the callee position of a
    /// cast/struct-constructor call, or the right-hand side of `type NAME
    /// TYPE` (§4.4.1, §4.4.3).
    TypeVal(TypeRef),
    PrefixOp {
        op: PrefixOp,
        operand: &'a Expr<'a>,
    },
    PostfixOp {
        op: PostfixOp,
        operand: &'a Expr<'a>,
    },
    BinOp {
        op: BinOp,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    },
    Deref {
        operand: &'a Expr<'a>,
    },
    Call {
        callee: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    },
    Member {
        recv: &'a Expr<'a>,
        name: Symbol,
        target: Cell<Option<MemberTarget<'a>>>,
    },
    Block {
        stmts: &'a [Stmt<'a>],
        exits: Cell<bool>,
        warned_unreachable: Cell<bool>,
    },
    If {
        cond: &'a Expr<'a>,
        then_branch: &'a Expr<'a>,
        else_branch: Option<&'a Expr<'a>>,
    },
    For {
        init: Option<&'a Expr<'a>>,
        cond: Option<&'a Expr<'a>>,
        step: Option<&'a Expr<'a>>,
        body: &'a Expr<'a>,
    },
    Return {
        value: Option<&'a Expr<'a>>,
    },
    Let {
        name: Symbol,
        init: &'a Expr<'a>,
    },
    Var {
        name: Symbol,
        init: Option<&'a Expr<'a>>,
    },
    Param(Param<'a>),
    Fun {
        name: Option<Symbol>,
        params: &'a [&'a Expr<'a>],
        body: Option<&'a Expr<'a>>,
    },
    /// An error-recovery placeholder (§4.6).
    Bad,
}

/// An expression node. Every node in the tree — declarations included,
/// since `fun`/`let`/`var`/`type` are expression-bearing statements — is one
/// of these.
pub struct Expr<'a> {
    pub loc: SourceRange,
    pub flags: Cell<ExprFlags>,
    pub ty: Cell<TypeRef>,
    pub nrefs: Cell<u32>,
    pub kind: ExprKind<'a>,
}

impl<'a> Expr<'a> {
    pub fn new(loc: SourceRange, ty: TypeRef, kind: ExprKind<'a>) -> Self {
        Self {
            loc,
            flags: Cell::new(ExprFlags::default()),
            ty: Cell::new(ty),
            nrefs: Cell::new(0),
            kind,
        }
    }

    pub fn is_rvalue(&self) -> bool {
        self.flags.get().contains(ExprFlags::IS_RVALUE)
    }

    pub fn clear_rvalue(&self) {
        self.flags.set(self.flags.get() - ExprFlags::IS_RVALUE);
    }

    pub fn bump_nrefs(&self) {
        self.nrefs.set(self.nrefs.get() + 1);
    }

    /// A "storage expression" (glossary): an identifier, member, deref, or
    /// declared local/param — anything `&`/`mut &` may be applied to.
    pub fn is_storage(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Id { .. }
                | ExprKind::Member { .. }
                | ExprKind::Deref { .. }
                | ExprKind::Param(_)
                | ExprKind::Let { .. }
                | ExprKind::Var { .. }
        )
    }

    /// Whether this storage expression denotes a mutable binding — `let`
    /// bindings and non-`mut` params/fields are not (§4.4.3, `mut &`).
    pub fn is_mutable_storage(&self) -> bool {
        match &self.kind {
            ExprKind::Var { .. } => true,
            ExprKind::Param(p) => p.is_mut_this,
            ExprKind::Let { .. } => false,
            ExprKind::Id { resolved, .. } => resolved
                .get()
                .map(Expr::is_mutable_storage)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// A top-level or nested declaration that is not itself an expression.
pub enum StmtKind<'a> {
    Typedef {
        name: Symbol,
        ty: TypeRef,
    },
    Expr(&'a Expr<'a>),
}

pub struct Stmt<'a> {
    pub loc: SourceRange,
    pub kind: StmtKind<'a>,
}

impl<'a> Stmt<'a> {
    pub fn new(loc: SourceRange, kind: StmtKind<'a>) -> Self {
        Self { loc, kind }
    }
}

/// The top-level container produced once per `parser-parse` call.
pub struct Unit<'a> {
    pub name: Symbol,
    pub children: &'a [Stmt<'a>],
}

/// What a name resolves to in the scope stack, the package map, or the
/// universe (§4.4.5): a value (an expression node, whose `nrefs` is bumped
/// on lookup), or a type alias bound by `type NAME TYPE`.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'a> {
    Value(&'a Expr<'a>),
    Ty(TypeRef),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe;
    use compiler_base::span::SourceLocation;

    fn point() -> SourceRange {
        let loc = SourceLocation::new(compiler_base::intern::intern("t"), 1, 1);
        SourceRange::point(loc)
    }

    #[test]
    fn default_flags_mark_rvalue() {
        let e = Expr::new(point(), universe::i32_type(), ExprKind::IntLit(1));
        assert!(e.is_rvalue());
    }

    #[test]
    fn clear_rvalue_drops_only_that_bit() {
        let e = Expr::new(point(), universe::i32_type(), ExprKind::IntLit(1));
        e.flags.set(e.flags.get() | ExprFlags::IS_NARROWED);
        e.clear_rvalue();
        assert!(!e.is_rvalue());
        assert!(e.flags.get().contains(ExprFlags::IS_NARROWED));
    }

    #[test]
    fn id_and_member_are_storage_but_intlit_is_not() {
        let id = Expr::new(
            point(),
            universe::i32_type(),
            ExprKind::Id {
                name: compiler_base::intern::intern("x"),
                resolved: Cell::new(None),
            },
        );
        assert!(id.is_storage());
        let lit = Expr::new(point(), universe::i32_type(), ExprKind::IntLit(1));
        assert!(!lit.is_storage());
    }

    #[test]
    fn let_binding_is_storage_but_not_mutable() {
        let init = Expr::new(point(), universe::i32_type(), ExprKind::IntLit(1));
        let letb = Expr::new(
            point(),
            universe::i32_type(),
            ExprKind::Let {
                name: compiler_base::intern::intern("a"),
                init: &init,
            },
        );
        assert!(letb.is_storage());
        assert!(!letb.is_mutable_storage());
    }

    #[test]
    fn nrefs_accumulates() {
        let e = Expr::new(point(), universe::i32_type(), ExprKind::IntLit(1));
        e.bump_nrefs();
        e.bump_nrefs();
        assert_eq!(e.nrefs.get(), 2);
    }
}
