#![cfg_attr(docsrs, feature(doc_cfg))]

//! # compiler-base
//!
//! Pure structural atoms shared by the front-end crates: arena allocation,
//! process-wide symbol interning, source locations, and diagnostics.
//!
//! - [`Arena`] — Bump allocation for stable AST references
//! - [`intern::intern`]/[`Symbol`] — String interning with pointer equality
//! - [`Span`]/[`span::SourceLocation`]/[`span::SourceRange`] — Source positions
//! - [`SpannedError`]/[`Result`]/[`error::Diagnostic`]/[`error::DiagnosticSink`] — Errors and diagnostics
//!
//! # Design Principles
//!
//! This crate has **no knowledge of the language's grammar or of file I/O**.
//! It provides only generic, reusable infrastructure that the parsing crate
//! builds on.
//!
//! # Example
//!
//! ```
//! use compiler_base::{Arena, Span};
//! use compiler_base::intern::intern;
//!
//! let arena: Arena<&str> = Arena::new();
//! let hello = intern("hello");
//! let span = Span::new(0, 5);
//!
//! let allocated = arena.alloc("hello");
//! assert_eq!(*allocated, "hello");
//! assert_eq!(hello.as_str(), "hello");
//! ```

pub mod arena;
pub mod error;
pub mod intern;
pub mod span;

pub use arena::{Arena, AstArena};
pub use error::{Result, SpannedError};
pub use intern::{Symbol, SymbolEq};
pub use span::Span;
