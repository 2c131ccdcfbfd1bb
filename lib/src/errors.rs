//! Error kinds surfaced by the graph facade, the namespace registry and the time series
//! helpers.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BrickGraphError {
    /// The graph file is missing or could not be parsed.
    Load { path: PathBuf, message: String },
    /// The query text is not valid SPARQL after prefix expansion.
    QuerySyntax { query: String, message: String },
    /// The query parsed but the engine failed while evaluating it.
    QueryEvaluation(String),
    /// A `prefix:local` token names a prefix that is not registered.
    UnresolvedPrefix(String),
    DuplicatePrefix {
        prefix: String,
        existing: String,
        requested: String,
    },
    InvalidPrefix(String),
    InvalidNamespace { namespace: String, message: String },
    UnsupportedQueryForm(&'static str),
    MissingBinding(String),
    TimeSeries { origin: String, message: String },
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for BrickGraphError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BrickGraphError::Load { path, message } => {
                write!(f, "Failed to load graph from {}: {}", path.display(), message)
            }
            BrickGraphError::QuerySyntax { message, .. } => {
                write!(f, "Invalid query: {}", message)
            }
            BrickGraphError::QueryEvaluation(message) => {
                write!(f, "Query evaluation failed: {}", message)
            }
            BrickGraphError::UnresolvedPrefix(prefix) => {
                write!(f, "Prefix '{}' is not registered", prefix)
            }
            BrickGraphError::DuplicatePrefix {
                prefix,
                existing,
                requested,
            } => write!(
                f,
                "Prefix '{}' is already bound to <{}>, cannot rebind it to <{}>",
                prefix, existing, requested
            ),
            BrickGraphError::InvalidPrefix(prefix) => {
                write!(f, "'{}' is not a valid prefix name", prefix)
            }
            BrickGraphError::InvalidNamespace { namespace, message } => {
                write!(f, "'{}' is not a valid namespace IRI: {}", namespace, message)
            }
            BrickGraphError::UnsupportedQueryForm(form) => {
                write!(f, "{} queries are not supported here", form)
            }
            BrickGraphError::MissingBinding(variable) => {
                write!(f, "Variable ?{} is not bound in this row", variable)
            }
            BrickGraphError::TimeSeries { origin, message } => {
                write!(f, "Bad time series data in {}: {}", origin, message)
            }
            BrickGraphError::Config(message) => write!(f, "Invalid configuration: {}", message),
            BrickGraphError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for BrickGraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrickGraphError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BrickGraphError {
    fn from(e: std::io::Error) -> Self {
        BrickGraphError::Io(e)
    }
}

impl From<serde_json::Error> for BrickGraphError {
    fn from(e: serde_json::Error) -> Self {
        BrickGraphError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BrickGraphError>;
