//! Parser for the Koto language.
//!
//! The parser is recursive descent with one token of lookahead, and it is
//! streaming: the interpreter asks for one statement at a time and executes
//! it before the next statement is parsed. `import` therefore takes effect
//! immediately by pushing the imported source onto the tokenizer stack.
//!
//! Same-precedence operator runs such as `a + b - c + d` are collected into
//! a single chain node instead of a nested binary tree, which keeps the
//! execution recursion depth independent of the number of operands.

mod cache;
mod decl_parser;
mod expr_parser;
mod parser_impl;
mod stmt_parser;
mod type_parser;

pub use cache::NodeCaches;
pub use parser_impl::Parser;
