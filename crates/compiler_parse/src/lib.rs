//! # compiler-parse
//!
//! The scanner, Pratt parser, scope stack, and type interner for the
//! front-end: turns a byte buffer into a fully typed, scope-resolved AST.
//!
//! - [`scanner::Scanner`] — byte stream → token stream, with implicit
//!   semicolon insertion and UTF-8 identifiers.
//! - [`scope::ScopeStack`] — the linear-scan binding stack backing local
//!   scopes, package-level definitions, and optional narrowing.
//! - [`types`] — structural type interning ("typeid"): composite types are
//!   canonicalized so that equal structure implies pointer-equal nodes.
//! - [`methodmap::MethodMap`] — receiver-type identity → method lookup.
//! - [`parser::Parser`] — the Pratt-driven recursive descent that ties the
//!   above together and produces one [`ast::Unit`] per call.
//!
//! This crate has no knowledge of file I/O or of the downstream LLVM/Clang
//! backend; it only builds the typed AST (§1, Purpose & Scope).

pub mod ast;
pub mod context;
pub mod methodmap;
pub mod parser;
pub mod scanner;
pub mod scope;
pub mod token;
pub mod types;
pub mod universe;

pub use ast::{Expr, ExprKind, Stmt, StmtKind, Unit};
pub use context::{CompilerContext, Input};
pub use parser::Parser;
pub use types::{Type, TypeKind, TypeRef};
