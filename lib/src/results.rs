//! Typed query results. A [`ResultTable`] carries the projected variable names and one
//! [`ResultRow`] per solution; rows can be read by position, by variable name, or decoded
//! into caller-defined records through [`FromRow`].

use crate::errors::{BrickGraphError, Result};
use crate::namespaces::NamespaceRegistry;
use crate::options::UriRendering;
use oxigraph::model::Term;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// A single bound value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Iri(String),
    PrefixedName { prefix: String, local: String },
    BlankNode(String),
    Literal {
        value: String,
        datatype: String,
        language: Option<String>,
    },
    /// A term kind without a dedicated variant, such as a quoted triple when oxigraph's
    /// `rdf-12` feature is enabled, kept in its N-Triples form.
    Other(String),
}

impl Value {
    /// Converts an engine term, shortening IRIs through `registry` unless `rendering` asks
    /// for full URIs. Literals are never rewritten.
    pub fn from_term(term: &Term, registry: &NamespaceRegistry, rendering: UriRendering) -> Self {
        match term {
            Term::NamedNode(node) => Value::from_iri(node.as_str(), registry, rendering),
            Term::BlankNode(node) => Value::BlankNode(node.as_str().to_string()),
            Term::Literal(literal) => Value::Literal {
                value: literal.value().to_string(),
                datatype: literal.datatype().as_str().to_string(),
                language: literal.language().map(|l| l.to_string()),
            },
            #[allow(unreachable_patterns)]
            other => Value::Other(other.to_string()),
        }
    }

    pub fn from_iri(iri: &str, registry: &NamespaceRegistry, rendering: UriRendering) -> Self {
        if rendering.is_full() {
            return Value::Iri(iri.to_string());
        }
        match registry.shorten(iri) {
            Some((prefix, local)) => Value::PrefixedName {
                prefix: prefix.to_string(),
                local,
            },
            None => Value::Iri(iri.to_string()),
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Value::Iri(_) | Value::PrefixedName { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Value::Literal { .. })
    }

    /// The lexical form of a literal.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The part of an IRI after its namespace: the local name of a prefixed name, or the
    /// text after the last `#` or `/` of a full IRI. Blank nodes and literals return their
    /// label or lexical form.
    pub fn local_name(&self) -> &str {
        match self {
            Value::Iri(iri) => iri
                .rfind(|c: char| c == '#' || c == '/')
                .map(|idx| &iri[idx + 1..])
                .unwrap_or(iri),
            Value::PrefixedName { local, .. } => local,
            Value::BlankNode(id) => id,
            Value::Literal { value, .. } => value,
            Value::Other(term) => term,
        }
    }

    /// The full IRI behind an IRI value, re-expanding prefixed names through `registry`.
    pub fn full_iri(&self, registry: &NamespaceRegistry) -> Option<String> {
        match self {
            Value::Iri(iri) => Some(iri.clone()),
            Value::PrefixedName { prefix, local } => registry
                .namespace(prefix)
                .map(|namespace| format!("{}{}", namespace, local)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(iri) => write!(f, "{}", iri),
            Value::PrefixedName { prefix, local } => write!(f, "{}:{}", prefix, local),
            Value::BlankNode(id) => write!(f, "_:{}", id),
            Value::Literal { value, .. } => write!(f, "{}", value),
            Value::Other(term) => write!(f, "{}", term),
        }
    }
}

/// One solution. Values line up with the table's variables; unbound variables are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    variables: Arc<[String]>,
    values: Vec<Option<Value>>,
}

impl ResultRow {
    pub(crate) fn new(variables: Arc<[String]>, values: Vec<Option<Value>>) -> Self {
        Self { variables, values }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value bound to `variable` (given without the leading `?`).
    pub fn get(&self, variable: &str) -> Option<&Value> {
        let variable = variable.trim_start_matches(['?', '$']);
        self.variables
            .iter()
            .position(|v| v == variable)
            .and_then(|idx| self.values[idx].as_ref())
    }

    /// Like [`ResultRow::get`] but an unbound variable is an error.
    pub fn require(&self, variable: &str) -> Result<&Value> {
        self.get(variable)
            .ok_or_else(|| BrickGraphError::MissingBinding(variable.to_string()))
    }

    /// Renders every value with `Display`, unbound values as empty strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| v.as_ref().map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }
}

impl Index<usize> for ResultRow {
    type Output = Option<Value>;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.values[idx]
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let bound = self.values.iter().filter(|v| v.is_some()).count();
        let mut map = serializer.serialize_map(Some(bound))?;
        for (variable, value) in self.variables.iter().zip(self.values.iter()) {
            if let Some(value) = value {
                map.serialize_entry(variable, value)?;
            }
        }
        map.end()
    }
}

/// Builds a typed record from a result row.
pub trait FromRow: Sized {
    fn from_row(row: &ResultRow) -> Result<Self>;
}

/// The rows of one query execution, in engine order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    variables: Arc<[String]>,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub(crate) fn new(variables: Vec<String>) -> Self {
        Self {
            variables: variables.into(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, values: Vec<Option<Value>>) {
        debug_assert_eq!(values.len(), self.variables.len());
        self.rows.push(ResultRow::new(self.variables.clone(), values));
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }

    /// Decodes every row into `T`, failing on the first row that does not fit.
    pub fn decode<T: FromRow>(&self) -> Result<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }

    /// Every row rendered with `Display`, the shape the notebook printed.
    pub fn to_strings(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| row.to_strings()).collect()
    }
}

impl IntoIterator for ResultTable {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut table = serializer.serialize_struct("ResultTable", 2)?;
        table.serialize_field("variables", &*self.variables)?;
        table.serialize_field("rows", &self.rows)?;
        table.end()
    }
}
