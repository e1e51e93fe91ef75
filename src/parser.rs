//! Parser for route paths.
//!
//! ```text
//! route    := '/'? segment ('/' segment)*
//! segment  := TEXT? (';' param)*
//! param    := TEXT '=' TEXT?
//! ```
//!
//! Path texts, keys and values are percent-decoded. Segments with neither a
//! path nor parameters (`//`, trailing `/`) are skipped.

use std::fmt;

use crate::route::{RouteSegment, RouteState};
use crate::token::{Span, Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self { message, span: Some(span) }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} at {}-{}", self.message, span.start, span.end),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self { tokens, position: 0 }
    }

    /// Current token, without advancing
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position);
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn match_token(&self, kind: &TokenKind) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.kind) == std::mem::discriminant(kind)
        } else {
            false
        }
    }

    /// Consumes a token of the expected kind, or fails
    fn expect(&mut self, expected: TokenKind) -> Result<&'a Token<'a>, ParseError> {
        match self.peek() {
            Some(token) if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) => {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::at_position(
                format!("Expected {:?}, found {:?}", expected, token.kind),
                token.span,
            )),
            None => Err(ParseError::new(
                format!("Expected {:?}, but reached end of input", expected),
                None,
            )),
        }
    }

    pub fn parse(&mut self) -> Result<RouteState, ParseError> {
        let mut segments = Vec::new();

        if self.match_token(&TokenKind::Slash) {
            self.advance();
        }

        loop {
            let segment = self.parse_segment()?;
            if !segment.path.is_empty() || !segment.params.is_empty() {
                segments.push(segment);
            }

            match self.advance() {
                None => break,
                Some(Token { kind: TokenKind::Slash, .. }) => continue,
                Some(token) => {
                    return Err(ParseError::at_position(
                        format!("Unexpected token: {:?}", token.kind),
                        token.span,
                    ));
                }
            }
        }

        Ok(RouteState { segments })
    }

    fn parse_segment(&mut self) -> Result<RouteSegment, ParseError> {
        let mut segment = RouteSegment::default();

        if let Some(Token { kind: TokenKind::Text(text), span }) = self.peek() {
            self.advance();
            segment.path = decode(text, *span)?;
        }

        while self.match_token(&TokenKind::Semicolon) {
            self.advance();
            let (key, value) = self.parse_param()?;
            segment.params.insert(key, value);
        }

        Ok(segment)
    }

    fn parse_param(&mut self) -> Result<(String, String), ParseError> {
        let key_token = self.expect(TokenKind::Text(""))?;
        let TokenKind::Text(text) = key_token.kind else {
            return Err(ParseError::at_position("Expected a parameter name".to_string(), key_token.span));
        };
        let key = decode(text, key_token.span)?;

        self.expect(TokenKind::Equals)?;

        let value = match self.peek() {
            Some(Token { kind: TokenKind::Text(text), span }) => {
                self.advance();
                decode(text, *span)?
            }
            _ => String::new(),
        };

        Ok((key, value))
    }
}

fn decode(text: &str, span: Span) -> Result<String, ParseError> {
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ParseError::at_position(format!("Invalid percent-encoding: {}", e), span))
}
