// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Navigation paths: `facet=value/facet=value`.
//!
//! Values are encoded facet tokens, so they can contain any character. `/`,
//! `=` and `%` are written as `%2F`, `%3D` and `%25`; nothing else is
//! escaped. The empty string (or `/`) is the root of a facet search.

use std::fmt;

use crate::error::NavigationError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NavPath {
    steps: Vec<(String, String)>,
}

impl NavPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, NavigationError> {
        let trimmed = text.strip_prefix('/').unwrap_or(text);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let mut path = NavPath::root();
        if trimmed.is_empty() {
            return Ok(path);
        }
        for segment in trimmed.split('/') {
            let malformed = |reason: String| NavigationError::MalformedPath {
                path: text.to_string(),
                reason,
            };
            let Some((facet, value)) = segment.split_once('=') else {
                return Err(malformed(format!("segment '{}' has no '='", segment)));
            };
            let facet = unescape(facet).map_err(&malformed)?;
            if facet.is_empty() {
                return Err(malformed(format!("segment '{}' has an empty facet name", segment)));
            }
            let value = unescape(value).map_err(&malformed)?;
            path.steps.push((facet, value));
        }
        Ok(path)
    }

    /// This path extended by one assignment.
    pub fn child(&self, facet: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.steps.push((facet.into(), value.into()));
        next
    }

    pub fn steps(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for NavPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (facet, value)) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}={}", escape(facet), escape(value))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for NavPath {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NavPath::parse(s)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let code = rest.get(idx + 1..idx + 3).unwrap_or("");
        let decoded = match code.to_ascii_uppercase().as_str() {
            "25" => '%',
            "2F" => '/',
            "3D" => '=',
            _ => return Err(format!("invalid escape '%{}'", code)),
        };
        out.push(decoded);
        rest = &rest[idx + 3..];
    }
    out.push_str(rest);
    Ok(out)
}
