//! Configuration for a [`crate::graph::BrickGraph`]: which file to load, which namespace the
//! `ex:` prefix names, extra prefixes, and where time series CSV files live.

use crate::consts::{DEFAULT_BUILDING_NS, DEFAULT_GRAPH_FILE, DEFAULT_PREFIXES};
use crate::errors::Result;
use crate::namespaces::{is_valid_prefix, NamespaceRegistry};
use crate::options::PrefixPolicy;
use derive_builder::Builder;
use oxigraph::model::NamedNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

fn default_graph_file() -> PathBuf {
    PathBuf::from(DEFAULT_GRAPH_FILE)
}

fn default_building_namespace() -> String {
    DEFAULT_BUILDING_NS.to_string()
}

#[derive(Builder, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct Config {
    #[builder(default = "default_graph_file()")]
    #[serde(default = "default_graph_file")]
    pub graph_file: PathBuf,
    // namespace bound to ex:
    #[builder(default = "default_building_namespace()")]
    #[serde(default = "default_building_namespace")]
    pub building_namespace: String,
    // registered on top of the Brick defaults
    #[builder(default)]
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub timeseries_dir: Option<PathBuf>,
    // fail on unregistered prefixes instead of handing them to the parser
    #[builder(default)]
    #[serde(default)]
    pub strict_prefixes: bool,
}

impl ConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(namespace) = &self.building_namespace {
            NamedNode::new(namespace.as_str())
                .map_err(|e| format!("building namespace '{}': {}", namespace, e))?;
        }
        if let Some(prefixes) = &self.prefixes {
            let building_namespace = self
                .building_namespace
                .clone()
                .unwrap_or_else(default_building_namespace);
            for (prefix, namespace) in prefixes {
                if !is_valid_prefix(prefix) {
                    return Err(format!("'{}' is not a valid prefix name", prefix));
                }
                NamedNode::new(namespace.as_str())
                    .map_err(|e| format!("namespace for '{}': {}", prefix, e))?;
                // built-in prefixes may only be repeated with the same namespace
                let builtin = DEFAULT_PREFIXES
                    .iter()
                    .find(|(p, _)| *p == prefix.as_str())
                    .map(|(_, ns)| *ns)
                    .or_else(|| (prefix == "ex").then_some(building_namespace.as_str()));
                if let Some(existing) = builtin {
                    if existing != namespace.as_str() {
                        return Err(format!(
                            "prefix '{}' is built in as {} and cannot be bound to {}",
                            prefix, existing, namespace
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            graph_file: default_graph_file(),
            building_namespace: default_building_namespace(),
            prefixes: BTreeMap::new(),
            timeseries_dir: None,
            strict_prefixes: false,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The Brick defaults plus the configured prefixes.
    pub fn registry(&self) -> Result<NamespaceRegistry> {
        let mut registry = NamespaceRegistry::brick(&self.building_namespace)?;
        for (prefix, namespace) in &self.prefixes {
            registry.register(prefix, namespace)?;
        }
        Ok(registry)
    }

    pub fn prefix_policy(&self) -> PrefixPolicy {
        PrefixPolicy::from(self.strict_prefixes)
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Graph file: {}", self.graph_file.display());
        println!("  Building namespace: {}", self.building_namespace);
        if !self.prefixes.is_empty() {
            println!("  Extra prefixes:");
            for (prefix, namespace) in &self.prefixes {
                println!("    - {}: {}", prefix, namespace);
            }
        }
        if let Some(dir) = &self.timeseries_dir {
            println!("  Time series directory: {}", dir.display());
        }
        println!("  Strict prefixes: {}", self.strict_prefixes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BRICK_NS;
    use tempdir::TempDir;

    #[test]
    fn test_builder_defaults() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.graph_file, PathBuf::from("building.ttl"));
        assert_eq!(config.prefix_policy(), PrefixPolicy::PassThrough);
    }

    #[test]
    fn test_builder_validation() {
        let err = Config::builder()
            .building_namespace("not a namespace")
            .build();
        assert!(err.is_err());

        let mut prefixes = BTreeMap::new();
        prefixes.insert("9bad".to_string(), "http://example.com/#".to_string());
        assert!(Config::builder().prefixes(prefixes).build().is_err());
    }

    #[test]
    fn test_builder_rejects_rebinding_builtin_prefixes() {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("brick".to_string(), "urn:other:".to_string());
        assert!(Config::builder().prefixes(prefixes).build().is_err());

        let mut prefixes = BTreeMap::new();
        prefixes.insert("ex".to_string(), "urn:other:".to_string());
        assert!(Config::builder()
            .building_namespace("urn:bldg#")
            .prefixes(prefixes)
            .build()
            .is_err());

        // repeating a built-in binding is harmless
        let mut prefixes = BTreeMap::new();
        prefixes.insert("brick".to_string(), BRICK_NS.to_string());
        prefixes.insert("ex".to_string(), "urn:bldg#".to_string());
        let config = Config::builder()
            .building_namespace("urn:bldg#")
            .prefixes(prefixes)
            .build()
            .unwrap();
        assert!(config.registry().is_ok());
    }

    #[test]
    fn test_registry_from_config() {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("site".to_string(), "urn:site:".to_string());
        let config = Config::builder()
            .building_namespace("urn:bldg#")
            .prefixes(prefixes)
            .strict_prefixes(true)
            .build()
            .unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.namespace("ex"), Some("urn:bldg#"));
        assert_eq!(registry.namespace("site"), Some("urn:site:"));
        assert!(config.prefix_policy().is_strict());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = TempDir::new("brickgraph-config").unwrap();
        let path = dir.path().join("brickgraph.json");
        let config = Config::builder()
            .graph_file("model.ttl")
            .timeseries_dir(dir.path().join("data"))
            .build()
            .unwrap();
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);

        // missing keys fall back to defaults
        std::fs::write(&path, r#"{"graph_file": "other.ttl"}"#).unwrap();
        let partial = Config::from_file(&path).unwrap();
        assert_eq!(partial.graph_file, PathBuf::from("other.ttl"));
        assert_eq!(partial.building_namespace, DEFAULT_BUILDING_NS);
        assert!(partial.timeseries_dir.is_none());
    }
}
