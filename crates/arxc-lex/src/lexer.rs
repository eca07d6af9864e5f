//! Core lexer implementation.
//!
//! The lexer reads the [`SourceBuffer`] one character at a time with a
//! single character of lookahead and produces the token sequence for a
//! whole compilation unit in one pass.
//!
//! Indentation contract: only whitespace runs that begin a non-blank
//! line become [`Token::Indent`]; mid-line whitespace is discarded.
//! Blank lines produce nothing. Unindented continuation lines produce
//! `Indent(0)`, which the parser uses to end blocks.

use arxc_util::{CompileError, Result, SourceLocation};

use crate::buffer::SourceBuffer;
use crate::stream::TokenStream;
use crate::token::{Token, TokenWithLoc};

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lexer for the Arx language.
///
/// Owns the input buffer for the duration of [`lex`](Lexer::lex) and
/// produces a [`TokenStream`], or a fatal lexical error with the
/// location it was detected at.
///
/// # Example
///
/// ```
/// use arxc_lex::{Lexer, SourceBuffer, Token};
///
/// let tokens = Lexer::new(SourceBuffer::from_string("x + 1")).lex().unwrap();
/// assert_eq!(*tokens.current(), Token::Identifier("x".into()));
/// ```
pub struct Lexer {
    buffer: SourceBuffer,

    /// One-character lookahead; `None` once the buffer is exhausted.
    last_char: Option<char>,

    /// Location of the lookahead character.
    loc: SourceLocation,

    /// The next token starts a logical line (indentation applies).
    at_line_start: bool,

    /// A newline has been consumed, i.e. we are past the first line.
    saw_newline: bool,
}

impl Lexer {
    /// Creates a lexer over the given buffer and primes the lookahead.
    pub fn new(buffer: SourceBuffer) -> Self {
        let mut lexer = Self {
            buffer,
            last_char: None,
            loc: SourceLocation::START,
            at_line_start: true,
            saw_newline: false,
        };
        lexer.advance();
        lexer
    }

    /// Consumes the lexer and returns the complete token stream,
    /// terminated by a single [`Token::Eof`].
    pub fn lex(mut self) -> Result<TokenStream> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.token == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(TokenStream::new(tokens));
            }
        }
    }

    /// Reads the next character and updates the location: a newline or
    /// carriage return bumps the line and resets the column, anything
    /// else bumps the column.
    fn advance(&mut self) {
        if matches!(self.last_char, Some('\n') | Some('\r')) {
            self.saw_newline = true;
        }
        self.last_char = self.buffer.read_char();
        match self.last_char {
            Some('\n') | Some('\r') => {
                self.loc.line += 1;
                self.loc.col = 0;
            }
            _ => self.loc.col += 1,
        }
    }

    fn next_token(&mut self) -> Result<TokenWithLoc> {
        loop {
            if self.at_line_start {
                if let Some(tok) = self.lex_line_start() {
                    return Ok(tok);
                }
                if self.last_char.is_none() {
                    return Ok(TokenWithLoc::new(Token::Eof, self.loc));
                }
            }

            // Mid-line whitespace is discarded; a newline hands control
            // back to the line-start handling above.
            while let Some(c) = self.last_char {
                if c == '\n' || c == '\r' {
                    self.advance();
                    self.at_line_start = true;
                    break;
                } else if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }
            if self.at_line_start {
                continue;
            }

            let tok_loc = self.loc;
            let c = match self.last_char {
                None => return Ok(TokenWithLoc::new(Token::Eof, tok_loc)),
                Some(c) => c,
            };

            if is_identifier_start(c) {
                return Ok(self.lex_identifier(tok_loc));
            }

            if c.is_ascii_digit() || c == '.' {
                return self.lex_number(tok_loc);
            }

            if c == '#' {
                while let Some(c) = self.last_char {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            self.advance();
            return Ok(TokenWithLoc::new(Token::Operator(c), tok_loc));
        }
    }

    /// Handles the start of a logical line: counts leading spaces and
    /// emits the `Indent` token for non-blank lines. Blank lines and
    /// comment-only lines carry no structure and produce nothing.
    /// Returns `None` when no token is produced here (end of input or an
    /// unindented first line).
    fn lex_line_start(&mut self) -> Option<TokenWithLoc> {
        loop {
            let tok_loc = self.loc;
            let mut count: u32 = 0;
            while self.last_char == Some(' ') {
                count += 1;
                self.advance();
            }
            match self.last_char {
                // Blank line: swallow the newline and start over.
                Some('\n') | Some('\r') => {
                    self.advance();
                    continue;
                }
                // Comment-only line: same as blank.
                Some('#') => {
                    while let Some(c) = self.last_char {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.advance();
                    }
                    if self.last_char.is_some() {
                        self.advance();
                    }
                    continue;
                }
                None => return None,
                Some(_) => {
                    self.at_line_start = false;
                    if count > 0 || self.saw_newline {
                        return Some(TokenWithLoc::new(Token::Indent(count), tok_loc));
                    }
                    return None;
                }
            }
        }
    }

    fn lex_identifier(&mut self, tok_loc: SourceLocation) -> TokenWithLoc {
        let mut lexeme = String::new();
        while let Some(c) = self.last_char {
            if !is_identifier_continue(c) {
                break;
            }
            lexeme.push(c);
            self.advance();
        }

        let token = Token::keyword(&lexeme).unwrap_or(Token::Identifier(lexeme));
        TokenWithLoc::new(token, tok_loc)
    }

    fn lex_number(&mut self, tok_loc: SourceLocation) -> Result<TokenWithLoc> {
        let mut lexeme = String::new();
        while let Some(c) = self.last_char {
            if !c.is_ascii_digit() && c != '.' {
                break;
            }
            lexeme.push(c);
            self.advance();
        }

        match lexeme.parse::<f64>() {
            Ok(value) => Ok(TokenWithLoc::new(Token::FloatLiteral(value), tok_loc)),
            Err(_) => Err(CompileError::lexical(
                format!("invalid float literal '{}'", lexeme),
                tok_loc,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(source: &str) -> Vec<Token> {
        Lexer::new(SourceBuffer::from_string(source))
            .lex()
            .expect("lexing failed")
            .into_tokens()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_keywords_lex_to_keyword_tokens() {
        let cases = [
            ("fn", Token::Fn),
            ("return", Token::Return),
            ("extern", Token::Extern),
            ("if", Token::If),
            ("else", Token::Else),
            ("for", Token::For),
            ("in", Token::In),
            ("binary", Token::Binary),
            ("unary", Token::Unary),
            ("var", Token::Var),
            ("const", Token::Const),
        ];
        for (source, expected) in cases {
            assert_eq!(lex_tokens(source), vec![expected, Token::Eof], "for {source:?}");
        }
    }

    #[test]
    fn test_identifier() {
        assert_eq!(
            lex_tokens("math _x a1_b"),
            vec![
                Token::Identifier("math".into()),
                Token::Identifier("_x".into()),
                Token::Identifier("a1_b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_call_token_sequence() {
        assert_eq!(
            lex_tokens("math(1)"),
            vec![
                Token::Identifier("math".into()),
                Token::Operator('('),
                Token::FloatLiteral(1.0),
                Token::Operator(')'),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(lex_tokens("1"), vec![Token::FloatLiteral(1.0), Token::Eof]);
        assert_eq!(lex_tokens("0.5"), vec![Token::FloatLiteral(0.5), Token::Eof]);
        assert_eq!(lex_tokens(".25"), vec![Token::FloatLiteral(0.25), Token::Eof]);
        assert_eq!(
            lex_tokens("10 20"),
            vec![Token::FloatLiteral(10.0), Token::FloatLiteral(20.0), Token::Eof]
        );
    }

    #[test]
    fn test_malformed_float_is_fatal() {
        let result = Lexer::new(SourceBuffer::from_string("1.2.3")).lex();
        assert!(matches!(
            result,
            Err(arxc_util::CompileError::Lexical { .. })
        ));
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        assert_eq!(
            lex_tokens("1 # the rest is ignored + * /\n2"),
            vec![
                Token::FloatLiteral(1.0),
                Token::Indent(0),
                Token::FloatLiteral(2.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comment_at_eof() {
        assert_eq!(lex_tokens("# nothing here"), vec![Token::Eof]);
    }

    #[test]
    fn test_comment_only_line_produces_no_indent() {
        // A comment-only line between two block lines behaves like a
        // blank line.
        assert_eq!(
            lex_tokens("if x:\n  a\n  # note\n  b"),
            vec![
                Token::If,
                Token::Identifier("x".into()),
                Token::Operator(':'),
                Token::Indent(2),
                Token::Identifier("a".into()),
                Token::Indent(2),
                Token::Identifier("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_indent_at_line_start_only() {
        // Mid-line whitespace produces nothing; the second line's
        // leading run produces exactly one Indent.
        assert_eq!(
            lex_tokens("a   b\n  c"),
            vec![
                Token::Identifier("a".into()),
                Token::Identifier("b".into()),
                Token::Indent(2),
                Token::Identifier("c".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_space_prefixed_first_line() {
        assert_eq!(
            lex_tokens("  a"),
            vec![Token::Indent(2), Token::Identifier("a".into()), Token::Eof]
        );
    }

    #[test]
    fn test_unindented_first_line_has_no_indent() {
        assert_eq!(
            lex_tokens("a"),
            vec![Token::Identifier("a".into()), Token::Eof]
        );
    }

    #[test]
    fn test_blank_lines_produce_nothing() {
        assert_eq!(
            lex_tokens("a\n\n   \n  b"),
            vec![
                Token::Identifier("a".into()),
                Token::Indent(2),
                Token::Identifier("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_dedent_to_zero_is_explicit() {
        assert_eq!(
            lex_tokens("if x:\n  y\nz"),
            vec![
                Token::If,
                Token::Identifier("x".into()),
                Token::Operator(':'),
                Token::Indent(2),
                Token::Identifier("y".into()),
                Token::Indent(0),
                Token::Identifier("z".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_characters_become_operators() {
        assert_eq!(
            lex_tokens("a @ b"),
            vec![
                Token::Identifier("a".into()),
                Token::Operator('@'),
                Token::Identifier("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_token_locations() {
        let tokens = Lexer::new(SourceBuffer::from_string("ab + 1\n  cd"))
            .lex()
            .unwrap()
            .into_tokens();
        // "ab" starts at 1:1, "+" at 1:4, "1" at 1:6.
        assert_eq!(tokens[0].loc, SourceLocation::new(1, 1));
        assert_eq!(tokens[1].loc, SourceLocation::new(1, 4));
        assert_eq!(tokens[2].loc, SourceLocation::new(1, 6));
        // The Indent token points at the first leading space.
        assert_eq!(tokens[3].token, Token::Indent(2));
        assert_eq!(tokens[3].loc, SourceLocation::new(2, 1));
        assert_eq!(tokens[4].loc, SourceLocation::new(2, 3));
    }

    /// Renders tokens back to canonical source text so a stream can be
    /// lexed a second time.
    fn render(tokens: &[Token]) -> String {
        let mut out = String::new();
        for token in tokens {
            match token {
                Token::Eof | Token::NotInitialized => {}
                Token::Indent(n) => {
                    out.push('\n');
                    for _ in 0..*n {
                        out.push(' ');
                    }
                }
                Token::Identifier(name) => {
                    out.push_str(name);
                    out.push(' ');
                }
                Token::FloatLiteral(value) => {
                    out.push_str(&value.to_string());
                    out.push(' ');
                }
                Token::Operator(op) => {
                    out.push(*op);
                    out.push(' ');
                }
                Token::Fn => out.push_str("fn "),
                Token::Extern => out.push_str("extern "),
                Token::Return => out.push_str("return "),
                Token::If => out.push_str("if "),
                Token::Else => out.push_str("else "),
                Token::For => out.push_str("for "),
                Token::In => out.push_str("in "),
                Token::Binary => out.push_str("binary "),
                Token::Unary => out.push_str("unary "),
                Token::Var => out.push_str("var "),
                Token::Const => out.push_str("const "),
            }
        }
        out
    }

    #[test]
    fn test_relex_is_idempotent() {
        let sources = [
            "1 + 1",
            "1 + 2 * (3 - 2)",
            "if 1 > 2:\n  a = 1\nelse:\n  a = 2",
            "fn add_one(a):\n  a + 1\nadd_one(1)",
            "for i = 1, 10 in\n  putchard(i)",
            "var a = 1, b in a + b",
        ];
        for source in sources {
            let once = lex_tokens(source);
            let twice = lex_tokens(&render(&once));
            assert_eq!(once, twice, "for {source:?}");
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn float_literal_matches_str_parse(lexeme in "[0-9]{1,7}(\\.[0-9]{1,7})?") {
                let expected: f64 = lexeme.parse().unwrap();
                let tokens = lex_tokens(&lexeme);
                prop_assert_eq!(tokens, vec![Token::FloatLiteral(expected), Token::Eof]);
            }

            #[test]
            fn leading_spaces_become_one_indent(count in 1u32..12, name in "[a-z]{1,6}") {
                prop_assume!(Token::keyword(&name).is_none());
                let source = format!("{}{}", " ".repeat(count as usize), name);
                let tokens = lex_tokens(&source);
                prop_assert_eq!(
                    tokens,
                    vec![Token::Indent(count), Token::Identifier(name), Token::Eof]
                );
            }
        }
    }
}
