//! Lexical analysis module for the Koto language.
//!
//! Source code is tokenized with a derive-based scanner and delivered
//! through a stack of sources: `import` pushes a new source mid-stream,
//! and tokens resume from the outer source once it is exhausted. Keywords
//! are matched case-insensitively; `#` starts a line comment.

mod source;
mod token;
mod tokenizer;

pub use source::SourceText;
pub use token::Token;
pub use tokenizer::Tokenizer;
