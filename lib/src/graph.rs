//! The namespaced graph facade. A [`BrickGraph`] loads one serialized graph, holds a fixed
//! [`NamespaceRegistry`], and answers SPARQL queries written with short prefixes.

use crate::config::Config;
use crate::consts::DEFAULT_GRAPH_FILE;
use crate::errors::{BrickGraphError, Result};
use crate::io::{load_store, load_store_from_reader};
use crate::namespaces::NamespaceRegistry;
use crate::options::{PrefixPolicy, UriRendering};
use crate::results::{ResultTable, Value};
use crate::rewrite;
use log::debug;
use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A loaded, read-only graph plus the prefixes its queries may use.
///
/// Nothing is written to the store after construction and no query state is cached, so a
/// `BrickGraph` can be shared between threads and queried concurrently.
pub struct BrickGraph {
    store: Store,
    registry: NamespaceRegistry,
    policy: PrefixPolicy,
    source: Option<PathBuf>,
    num_triples: usize,
}

impl BrickGraph {
    /// Loads `path` with the default Brick prefixes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, NamespaceRegistry::default(), PrefixPolicy::default())
    }

    /// Loads `building.ttl` from the working directory.
    pub fn open_default() -> Result<Self> {
        Self::load(DEFAULT_GRAPH_FILE)
    }

    pub fn load_with(
        path: impl AsRef<Path>,
        registry: NamespaceRegistry,
        policy: PrefixPolicy,
    ) -> Result<Self> {
        let path = path.as_ref();
        let (store, num_triples) = load_store(path)?;
        Ok(Self {
            store,
            registry,
            policy,
            source: Some(path.to_path_buf()),
            num_triples,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::load_with(
            &config.graph_file,
            config.registry()?,
            config.prefix_policy(),
        )
    }

    /// Builds a graph from in-memory data instead of a file.
    pub fn from_reader(
        reader: impl Read,
        format: RdfFormat,
        registry: NamespaceRegistry,
    ) -> Result<Self> {
        let (store, num_triples) = load_store_from_reader(reader, format, None)?;
        Ok(Self {
            store,
            registry,
            policy: PrefixPolicy::default(),
            source: None,
            num_triples,
        })
    }

    pub fn with_prefix_policy(mut self, policy: PrefixPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub fn prefix_policy(&self) -> PrefixPolicy {
        self.policy
    }

    /// The file this graph was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of distinct triples.
    pub fn len(&self) -> usize {
        self.num_triples
    }

    pub fn is_empty(&self) -> bool {
        self.num_triples == 0
    }

    /// The query text the engine would see.
    pub fn expand_query(&self, text: &str) -> Result<String> {
        rewrite::expand_query(text, &self.registry, self.policy)
    }

    /// Runs a SELECT, CONSTRUCT or DESCRIBE query.
    ///
    /// Registered `prefix:local` names in `text` are expanded before parsing. SELECT rows
    /// follow the projection; CONSTRUCT and DESCRIBE produce `subject`, `predicate`,
    /// `object` rows. With [`UriRendering::Short`] (or `false`) IRIs in a registered
    /// namespace come back as prefixed names. A query that matches nothing returns an
    /// empty table; a failed query returns no rows at all.
    pub fn query(&self, text: &str, rendering: impl Into<UriRendering>) -> Result<ResultTable> {
        let rendering = rendering.into();
        let expanded = self.expand_query(text)?;
        debug!("Executing query: {}", expanded);
        let results = SparqlEvaluator::new()
            .parse_query(&expanded)
            .map_err(|e| BrickGraphError::QuerySyntax {
                query: expanded.clone(),
                message: e.to_string(),
            })?
            .on_store(&self.store)
            .execute()
            .map_err(|e| BrickGraphError::QueryEvaluation(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let variables: Vec<String> = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut table = ResultTable::new(variables.clone());
                for solution in solutions {
                    let solution =
                        solution.map_err(|e| BrickGraphError::QueryEvaluation(e.to_string()))?;
                    let values = variables
                        .iter()
                        .map(|v| {
                            solution
                                .get(v.as_str())
                                .map(|term| self.render(term, rendering))
                        })
                        .collect();
                    table.push(values);
                }
                debug!("Query returned {} rows", table.len());
                Ok(table)
            }
            QueryResults::Graph(triples) => {
                let mut table = ResultTable::new(vec![
                    "subject".to_string(),
                    "predicate".to_string(),
                    "object".to_string(),
                ]);
                for triple in triples {
                    let triple =
                        triple.map_err(|e| BrickGraphError::QueryEvaluation(e.to_string()))?;
                    table.push(vec![
                        Some(self.render(&Term::from(triple.subject), rendering)),
                        Some(self.render(&Term::from(triple.predicate), rendering)),
                        Some(self.render(&triple.object, rendering)),
                    ]);
                }
                debug!("Query returned {} triples", table.len());
                Ok(table)
            }
            QueryResults::Boolean(_) => Err(BrickGraphError::UnsupportedQueryForm("ASK")),
        }
    }

    /// Runs an ASK query.
    pub fn ask(&self, text: &str) -> Result<bool> {
        let expanded = self.expand_query(text)?;
        debug!("Executing ask: {}", expanded);
        let results = SparqlEvaluator::new()
            .parse_query(&expanded)
            .map_err(|e| BrickGraphError::QuerySyntax {
                query: expanded.clone(),
                message: e.to_string(),
            })?
            .on_store(&self.store)
            .execute()
            .map_err(|e| BrickGraphError::QueryEvaluation(e.to_string()))?;
        match results {
            QueryResults::Boolean(answer) => Ok(answer),
            QueryResults::Solutions(_) => Err(BrickGraphError::UnsupportedQueryForm("SELECT")),
            QueryResults::Graph(_) => {
                Err(BrickGraphError::UnsupportedQueryForm("CONSTRUCT/DESCRIBE"))
            }
        }
    }

    fn render(&self, term: &Term, rendering: UriRendering) -> Value {
        Value::from_term(term, &self.registry, rendering)
    }
}

impl std::fmt::Debug for BrickGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrickGraph")
            .field("source", &self.source)
            .field("num_triples", &self.num_triples)
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
@prefix brick: <https://brickschema.org/schema/1.0.1/Brick#> .
@prefix bf: <https://brickschema.org/schema/1.0.1/BrickFrame#> .
@prefix ex: <http://example.com/building#> .
ex:VAV1 a brick:VAV ; bf:feeds ex:ZoneA .
ex:RoomA bf:isPartOf ex:ZoneA .
"#;

    fn graph() -> BrickGraph {
        BrickGraph::from_reader(
            MODEL.as_bytes(),
            RdfFormat::Turtle,
            NamespaceRegistry::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_select_short_names() {
        let graph = graph();
        assert_eq!(graph.len(), 3);
        let table = graph
            .query("select ?vav where { ?vav rdf:type brick:VAV }", false)
            .unwrap();
        assert_eq!(table.variables(), &["vav".to_string()]);
        assert_eq!(table.to_strings(), vec![vec!["ex:VAV1".to_string()]]);
        assert_eq!(table.rows()[0].get("vav").unwrap().local_name(), "VAV1");
    }

    #[test]
    fn test_construct_and_ask() {
        let graph = graph();
        let table = graph
            .query(
                "CONSTRUCT { ?zone ex:fedBy ?vav } WHERE { ?vav bf:feeds ?zone }",
                UriRendering::Short,
            )
            .unwrap();
        assert_eq!(table.variables().len(), 3);
        assert_eq!(
            table.to_strings(),
            vec![vec![
                "ex:ZoneA".to_string(),
                "ex:fedBy".to_string(),
                "ex:VAV1".to_string()
            ]]
        );

        assert!(graph.ask("ASK { ex:RoomA bf:isPartOf ex:ZoneA }").unwrap());
        assert!(!graph.ask("ASK { ex:RoomA bf:feeds ex:ZoneA }").unwrap());
        assert!(matches!(
            graph.query("ASK { ?s ?p ?o }", true),
            Err(BrickGraphError::UnsupportedQueryForm("ASK"))
        ));
        assert!(matches!(
            graph.ask("SELECT * WHERE { ?s ?p ?o }"),
            Err(BrickGraphError::UnsupportedQueryForm("SELECT"))
        ));
    }

    #[test]
    fn test_strict_policy() {
        let graph = graph().with_prefix_policy(PrefixPolicy::Strict);
        assert!(matches!(
            graph.query("SELECT ?x WHERE { ?x a foaf:Person }", true),
            Err(BrickGraphError::UnresolvedPrefix(_))
        ));
    }

    #[test]
    fn test_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BrickGraph>();
    }
}
