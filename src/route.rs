//! Route state: path segments carrying matrix parameters.
//!
//! The list screens persist their state as parameters of the last segment,
//! `/my/home;cat=123/list-a;pa=..;so=..`, and key their storage by the path
//! without those parameters.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::QueryError;
use crate::lexer::Lexer;
use crate::parser::{ParseError, Parser};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteSegment {
    pub path: String,
    /// Decoded parameter values.
    pub params: BTreeMap<String, String>,
}

impl RouteSegment {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), params: BTreeMap::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteState {
    pub segments: Vec<RouteSegment>,
}

impl RouteState {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let tokens: Vec<_> = Lexer::new(input).collect();
        Parser::new(&tokens).parse()
    }

    /// Parameter of the last segment.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.segments.last()?.params.get(key).map(String::as_str)
    }

    /// The full path without the last segment's parameters.
    pub fn storage_key(&self) -> String {
        let mut key = String::new();
        let last = self.segments.len().saturating_sub(1);
        for (index, segment) in self.segments.iter().enumerate() {
            key.push('/');
            key.push_str(&urlencoding::encode(&segment.path));
            if index != last {
                write_params(&mut key, &segment.params);
            }
        }
        if key.is_empty() {
            key.push('/');
        }
        key
    }

    pub fn with_param(&self, key: &str, value: &str) -> Self {
        let mut route = self.clone();
        if route.segments.is_empty() {
            route.segments.push(RouteSegment::default());
        }
        if let Some(last) = route.segments.last_mut() {
            last.params.insert(key.to_string(), value.to_string());
        }
        route
    }

    pub fn without_param(&self, key: &str) -> Self {
        let mut route = self.clone();
        if let Some(last) = route.segments.last_mut() {
            last.params.remove(key);
        }
        route
    }
}

fn write_params(out: &mut String, params: &BTreeMap<String, String>) {
    for (key, value) in params {
        out.push(';');
        out.push_str(&urlencoding::encode(key));
        out.push('=');
        out.push_str(&urlencoding::encode(value));
    }
}

impl std::str::FromStr for RouteState {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s)?)
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.push_str(&urlencoding::encode(&segment.path));
            write_params(&mut out, &segment.params);
        }
        write!(f, "{}", out)
    }
}
