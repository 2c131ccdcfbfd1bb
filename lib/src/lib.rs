//! Query Brick building models with short prefixed names.
//!
//! [`BrickGraph`] loads a serialized graph, expands `brick:`, `bf:`, `rdf:`, `rdfs:` and
//! `ex:` names in SPARQL text, and hands back typed rows. The [`timeseries`] module resolves
//! the identifiers those rows carry to CSV data and runs the simple fault rules from the
//! Brick tutorial.

extern crate derive_builder;

pub mod config;
pub mod consts;
pub mod errors;
pub mod graph;
pub mod io;
pub mod namespaces;
pub mod options;
pub mod results;
pub mod rewrite;
pub mod timeseries;

pub use config::Config;
pub use errors::{BrickGraphError, Result};
pub use graph::BrickGraph;
pub use namespaces::NamespaceRegistry;
pub use options::{PrefixPolicy, UriRendering};
pub use results::{FromRow, ResultRow, ResultTable, Value};

/// Initializes logging for the brickgraph library.
///
/// If the `BRICKGRAPH_LOG` environment variable is set, `RUST_LOG` is set to its value.
/// The logger itself (e.g. `env_logger::init()`) must be initialized after this call for
/// the level to take effect.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("BRICKGRAPH_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
