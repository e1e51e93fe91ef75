//! Tokens of a route path with matrix parameters, e.g. `/my/home;cat=123/list-a`.

/// A token is a single unit of the path, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    /// A run of characters free of delimiters, still percent-encoded
    Text(&'a str),

    // Punctuation
    Slash,     // /
    Semicolon, // ;
    Equals,    // =

    /// `?` or `#`: query strings and fragments are not part of a route path
    Illegal,
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
