// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Namespace prefixes and qualified property names.
//!
//! Property names arrive as `prefix:local`. The index keys facet fields by
//! the expanded form `{uri}local` so that two prefixes bound to the same URI
//! land in the same field. Names in the empty namespace expand to just
//! `local`, which keeps test fixtures and the common case readable.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NamespaceError;

/// A resolved `prefix:local` name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace_uri: String,
    pub prefix: String,
    pub local: String,
}

impl QualifiedName {
    /// Field key used by the index.
    pub fn expanded(&self) -> String {
        if self.namespace_uri.is_empty() {
            self.local.clone()
        } else {
            format!("{{{}}}{}", self.namespace_uri, self.local)
        }
    }

    /// The name as the repository writes it.
    pub fn jcr_name(&self) -> String {
        if self.prefix.is_empty() {
            self.local.clone()
        } else {
            format!("{}:{}", self.prefix, self.local)
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.jcr_name())
    }
}

/// Prefix to URI bindings. The empty prefix is always bound to the empty URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceRegistry {
    prefixes: HashMap<String, String>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the prefixes every repository defines.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for (prefix, uri) in [
            ("jcr", "http://www.jcp.org/jcr/1.0"),
            ("nt", "http://www.jcp.org/jcr/nt/1.0"),
            ("mix", "http://www.jcp.org/jcr/mix/1.0"),
            ("xml", "http://www.w3.org/XML/1998/namespace"),
        ] {
            registry.register(prefix, uri);
        }
        registry
    }

    pub fn register(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        if prefix.is_empty() {
            return Some("");
        }
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.prefixes.iter()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Resolve `prefix:local` (or a bare `local`).
    pub fn resolve(&self, name: &str) -> Result<QualifiedName, NamespaceError> {
        let (prefix, local) = match name.split_once(':') {
            Some((prefix, local)) => (prefix, local),
            None => ("", name),
        };
        if local.is_empty() || local.contains(':') || local.contains('/') {
            return Err(NamespaceError::Malformed(name.to_string()));
        }
        let uri = self
            .uri(prefix)
            .ok_or_else(|| NamespaceError::UnknownPrefix {
                prefix: prefix.to_string(),
                name: name.to_string(),
            })?;
        Ok(QualifiedName {
            namespace_uri: uri.to_string(),
            prefix: prefix.to_string(),
            local: local.to_string(),
        })
    }
}
