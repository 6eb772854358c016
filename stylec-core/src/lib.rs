//! Core pipeline for the style-to-Groovy compiler.
//!
//! The compiler turns a stack-based bibliography style program into a
//! Groovy class driven by a host bibliography processor. The pipeline
//! is roughly:
//!
//!   source .bst
//!     -> lexer     (tokens)
//!     -> parser    (top-level declarations)
//!     -> interp    (symbolic stack interpretation, IR)
//!     -> optimizer (branch canonicalization, dead-store elision)
//!     -> codegen   (Groovy source text)
//!
//! Drivers (the CLI, embedders) should depend on this crate and call
//! [`compile_style`] or [`compile`] rather than wiring the stages
//! themselves.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and declaration parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;

// ---------------------------------------------------------------------
// Semantic layer: built-in registry, IR, symbolic interpretation
// ---------------------------------------------------------------------

pub mod ir;
pub mod registry;
pub mod interp;

// ---------------------------------------------------------------------
// Back-end: rewrites, code generation, orchestration
// ---------------------------------------------------------------------

pub mod optimizer;
pub mod codegen;
pub mod resolver;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{compile, compile_style};
pub use error::CompileError;
pub use resolver::{DirResolver, Resolver};
