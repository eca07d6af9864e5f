//! Token stream with one-token lookahead.

use arxc_util::SourceLocation;

use crate::token::{Token, TokenWithLoc};

/// A finite, restartable cursor over a lexed token sequence.
///
/// The stream always ends in [`Token::Eof`]; advancing past the end
/// keeps yielding it, so grammar code never has to special-case
/// exhaustion. The parser dispatches on [`current`](TokenStream::current)
/// using structural token equality and looks ahead with
/// [`peek`](TokenStream::peek).
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<TokenWithLoc>,
    pos: usize,
}

impl TokenStream {
    /// Wraps a token sequence, appending a trailing `Eof` if missing.
    pub fn new(mut tokens: Vec<TokenWithLoc>) -> Self {
        let needs_eof = !matches!(
            tokens.last(),
            Some(TokenWithLoc {
                token: Token::Eof,
                ..
            })
        );
        if needs_eof {
            let loc = tokens
                .last()
                .map(|t| t.loc)
                .unwrap_or(SourceLocation::START);
            tokens.push(TokenWithLoc::new(Token::Eof, loc));
        }
        Self { tokens, pos: 0 }
    }

    /// The token under the cursor.
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    /// The location of the token under the cursor.
    pub fn current_loc(&self) -> SourceLocation {
        self.tokens[self.pos].loc
    }

    /// Consumes the current token and returns the new current one.
    /// Past the end this keeps returning `Eof`.
    pub fn advance(&mut self) -> &Token {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        self.current()
    }

    /// Looks `n` tokens ahead without consuming; `peek(0)` is `current`.
    pub fn peek(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    /// Rewinds the cursor to the first token.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// All located tokens in the stream, consuming it.
    pub fn into_tokens(self) -> Vec<TokenWithLoc> {
        self.tokens
    }

    /// All located tokens in the stream.
    pub fn tokens(&self) -> &[TokenWithLoc] {
        &self.tokens
    }
}
