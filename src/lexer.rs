//! Lexer for route paths.

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// Current byte offset in the input
    position: usize,
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '/' | ';' | '=' | '?' | '#')
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// Reads text up to the next delimiter. The first character has already
    /// been consumed by the caller.
    fn read_text(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            self.bump();
        }
        Token {
            kind: TokenKind::Text(&self.input[start..self.position]),
            span: Span::new(start, self.position),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.position;
        let c = self.bump()?;

        let token = match c {
            '/' => Token { kind: TokenKind::Slash, span: Span::new(start, self.position) },
            ';' => Token { kind: TokenKind::Semicolon, span: Span::new(start, self.position) },
            '=' => Token { kind: TokenKind::Equals, span: Span::new(start, self.position) },
            '?' | '#' => Token { kind: TokenKind::Illegal, span: Span::new(start, self.position) },
            _ => self.read_text(start),
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let kinds: Vec<_> = Lexer::new("/my/home").map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Slash, TokenKind::Text("my"), TokenKind::Slash, TokenKind::Text("home")]
        );
    }

    #[test]
    fn test_matrix_params() {
        let kinds: Vec<_> = Lexer::new("list-a;dog=456;na=").map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text("list-a"),
                TokenKind::Semicolon,
                TokenKind::Text("dog"),
                TokenKind::Equals,
                TokenKind::Text("456"),
                TokenKind::Semicolon,
                TokenKind::Text("na"),
                TokenKind::Equals,
            ]
        );
    }

    #[test]
    fn test_text_keeps_encoding_and_unicode() {
        let tokens: Vec<_> = Lexer::new("%5B%5D;é=ü x").collect();
        assert_eq!(tokens[0].kind, TokenKind::Text("%5B%5D"));
        assert_eq!(tokens[2].kind, TokenKind::Text("é"));
        assert_eq!(tokens[4].kind, TokenKind::Text("ü x"));
        assert_eq!(tokens[4].span, Span::new(10, 14));
    }

    #[test]
    fn test_query_string_is_illegal() {
        let kinds: Vec<_> = Lexer::new("a?b").map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Text("a"), TokenKind::Illegal, TokenKind::Text("b")]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Lexer::new("").next(), None);
    }
}
