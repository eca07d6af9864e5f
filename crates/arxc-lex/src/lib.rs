//! arxc-lex - Lexical analyzer for the Arx language.
//!
//! The lexer transforms source text into a finite stream of tokens. Arx
//! is indentation-structured: nesting is expressed purely by the number
//! of leading spaces on a line, so in addition to the usual identifier/
//! literal/operator tokens the lexer emits an [`Token::Indent`] token at
//! the start of every non-blank line.
//!
//! Pipeline position:
//!
//! ```text
//! bytes -> SourceBuffer -> Lexer -> TokenStream -> parser
//! ```
//!
//! The [`SourceBuffer`] is a refillable character source (file or
//! string). The [`Lexer`] consumes it one character at a time with a
//! single character of lookahead and produces located tokens. The
//! [`TokenStream`] is the cursor the parser drives, with one-token
//! lookahead and structural equality on the current token.

pub mod buffer;
pub mod lexer;
pub mod stream;
pub mod token;

pub use buffer::SourceBuffer;
pub use lexer::Lexer;
pub use stream::TokenStream;
pub use token::{Token, TokenWithLoc};
