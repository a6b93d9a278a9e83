//! Shared types for the RoboBASIC translator.
//!
//! This crate defines the AST node types and source spans handed from
//! the front end to the evaluator.

mod span;
pub mod ast;

pub use span::Span;
