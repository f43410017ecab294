//! Koto Language Interpreter Library
//!
//! This library provides the core functionality for the Koto language
//! interpreter: a streaming tokenizer, a statement-at-a-time parser and
//! a tree-walking interpreter with shared-cell values.

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;

// Re-export commonly used types
pub use ast::{Node, NodeKind, NodeRef};
pub use error::{DiagnosticError, ErrorKind, KotoError, KotoResult, Location, Span};
pub use interpreter::{Interpreter, RunOutcome, TypeSpec, TypeTag, Value};
pub use lexer::{Token, Tokenizer};
pub use parser::{NodeCaches, Parser};
