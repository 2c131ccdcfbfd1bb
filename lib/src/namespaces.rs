//! The namespace registry: short prefixes mapped to full namespace IRIs.
//! Expansion turns `prefix:local` into a full IRI and shortening goes the other way.

use crate::consts::{DEFAULT_BUILDING_NS, DEFAULT_PREFIXES};
use crate::errors::{BrickGraphError, Result};
use lazy_static::lazy_static;
use log::debug;
use oxigraph::model::NamedNode;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

lazy_static! {
    static ref PREFIX_NAME: Regex = Regex::new(r"^[A-Za-z]([A-Za-z0-9_.\-]*[A-Za-z0-9_\-])?$")
        .expect("prefix name pattern is valid");
}

/// Returns true if `prefix` can be used as a SPARQL prefix name.
pub fn is_valid_prefix(prefix: &str) -> bool {
    PREFIX_NAME.is_match(prefix)
}

/// Returns true if `local` can follow `prefix:` in SPARQL without escaping.
pub fn is_valid_local_name(local: &str) -> bool {
    let mut chars = local.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return true,
    };
    if first == '-' || first == '.' || local.ends_with('.') {
        return false;
    }
    local.chars().all(is_local_char)
}

pub(crate) fn is_local_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NamespaceRegistry {
    prefixes: BTreeMap<String, String>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self {
            prefixes: BTreeMap::new(),
        }
    }

    /// The fixed Brick registry: `brick`, `bf`, `rdf`, `rdfs`, `owl`, `xsd`, and `ex` bound
    /// to the given building namespace.
    pub fn brick(building_namespace: &str) -> Result<Self> {
        let mut registry = Self::new();
        for (prefix, namespace) in DEFAULT_PREFIXES {
            registry.register(prefix, namespace)?;
        }
        registry.register("ex", building_namespace)?;
        Ok(registry)
    }

    /// Binds `prefix` to `namespace`. Re-registering the same pair is a no-op; rebinding a
    /// prefix to a different namespace is an error.
    pub fn register(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        if !is_valid_prefix(prefix) {
            return Err(BrickGraphError::InvalidPrefix(prefix.to_string()));
        }
        NamedNode::new(namespace).map_err(|e| BrickGraphError::InvalidNamespace {
            namespace: namespace.to_string(),
            message: e.to_string(),
        })?;
        if let Some(existing) = self.prefixes.get(prefix) {
            if existing == namespace {
                return Ok(());
            }
            return Err(BrickGraphError::DuplicatePrefix {
                prefix: prefix.to_string(),
                existing: existing.clone(),
                requested: namespace.to_string(),
            });
        }
        debug!("Registering prefix {}: <{}>", prefix, namespace);
        self.prefixes.insert(prefix.to_string(), namespace.to_string());
        Ok(())
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|ns| ns.as_str())
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Expands `prefix:local` into a full IRI.
    pub fn expand(&self, prefixed: &str) -> Result<String> {
        let (prefix, local) = prefixed
            .split_once(':')
            .ok_or_else(|| BrickGraphError::UnresolvedPrefix(prefixed.to_string()))?;
        let namespace = self
            .namespace(prefix)
            .ok_or_else(|| BrickGraphError::UnresolvedPrefix(prefix.to_string()))?;
        Ok(format!("{}{}", namespace, local))
    }

    /// Finds the shortest `prefix:local` form of `iri`. The longest matching namespace wins;
    /// ties go to the shorter prefix, then the lexically smaller one. Returns None if no
    /// namespace matches or the remainder is not a legal local name.
    pub fn shorten<'a>(&'a self, iri: &str) -> Option<(&'a str, String)> {
        let mut best: Option<(&str, &str)> = None;
        for (prefix, namespace) in self.prefixes.iter() {
            let local = match iri.strip_prefix(namespace.as_str()) {
                Some(local) => local,
                None => continue,
            };
            if !is_valid_local_name(local) {
                continue;
            }
            best = match best {
                Some((best_prefix, best_ns))
                    if best_ns.len() > namespace.len()
                        || (best_ns.len() == namespace.len()
                            && best_prefix.len() <= prefix.len()) =>
                {
                    Some((best_prefix, best_ns))
                }
                _ => Some((prefix.as_str(), namespace.as_str())),
            };
        }
        best.map(|(prefix, namespace)| (prefix, iri[namespace.len()..].to_string()))
    }

    /// Sorted (prefix, namespace) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes
            .iter()
            .map(|(prefix, namespace)| (prefix.as_str(), namespace.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// One `PREFIX` line per registered namespace.
    pub fn to_sparql_prologue(&self) -> String {
        self.iter()
            .map(|(prefix, namespace)| format!("PREFIX {}: <{}>\n", prefix, namespace))
            .collect()
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::brick(DEFAULT_BUILDING_NS).expect("default namespaces are valid")
    }
}
