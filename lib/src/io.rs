//! Reading serialized graphs into an in-memory oxigraph store.

use crate::errors::{BrickGraphError, Result};
use log::{debug, info};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{GraphName, Quad};
use oxigraph::store::Store;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Picks a parser from the file extension. Unknown or missing extensions are read as Turtle.
pub fn format_for_path(path: &Path) -> RdfFormat {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("ttl") | Some("turtle") => RdfFormat::Turtle,
        Some("n3") => RdfFormat::Turtle,
        Some("nt") => RdfFormat::NTriples,
        Some("nq") => RdfFormat::NQuads,
        Some("trig") => RdfFormat::TriG,
        Some("xml") | Some("rdf") | Some("owl") => RdfFormat::RdfXml,
        _ => RdfFormat::Turtle,
    }
}

/// Loads the graph at `path` into a fresh in-memory store and returns it along with the
/// number of distinct triples. Named graphs are merged into the default graph.
pub fn load_store(path: &Path) -> Result<(Store, usize)> {
    debug!("Reading file: {}", path.display());
    let load_error = |message: String| BrickGraphError::Load {
        path: path.to_path_buf(),
        message,
    };
    let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
    let base_iri = path
        .canonicalize()
        .ok()
        .and_then(|abs| url::Url::from_file_path(abs).ok())
        .map(|url| url.to_string());
    let format = format_for_path(path);
    let (store, count) =
        read_into_store(BufReader::new(file), format, base_iri.as_deref()).map_err(load_error)?;
    info!(
        "Loaded {} triples from {} as {}",
        count,
        path.display(),
        format.name()
    );
    Ok((store, count))
}

/// Same as [`load_store`] for data that does not come from a file.
pub fn load_store_from_reader(
    reader: impl Read,
    format: RdfFormat,
    base_iri: Option<&str>,
) -> Result<(Store, usize)> {
    read_into_store(reader, format, base_iri).map_err(|message| BrickGraphError::Load {
        path: PathBuf::from("<reader>"),
        message,
    })
}

fn read_into_store(
    reader: impl Read,
    format: RdfFormat,
    base_iri: Option<&str>,
) -> std::result::Result<(Store, usize), String> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base) = base_iri {
        parser = parser.with_base_iri(base).map_err(|e| e.to_string())?;
    }
    let store = Store::new().map_err(|e| e.to_string())?;
    let mut count = 0;
    for quad in parser.for_reader(reader) {
        let quad = quad.map_err(|e| e.to_string())?;
        let triple = Quad::new(
            quad.subject,
            quad.predicate,
            quad.object,
            GraphName::DefaultGraph,
        );
        if !store.contains(&triple).map_err(|e| e.to_string())? {
            store.insert(&triple).map_err(|e| e.to_string())?;
            count += 1;
        }
    }
    Ok((store, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_path() {
        assert_eq!(format_for_path(Path::new("a.ttl")), RdfFormat::Turtle);
        assert_eq!(format_for_path(Path::new("a.TTL")), RdfFormat::Turtle);
        assert_eq!(format_for_path(Path::new("a.nt")), RdfFormat::NTriples);
        assert_eq!(format_for_path(Path::new("a.nq")), RdfFormat::NQuads);
        assert_eq!(format_for_path(Path::new("a.owl")), RdfFormat::RdfXml);
        assert_eq!(format_for_path(Path::new("model")), RdfFormat::Turtle);
    }

    #[test]
    fn test_load_store() {
        // turtle
        let (_, count) = load_store(Path::new("tests/data/building.ttl")).unwrap();
        assert_eq!(count, 30);

        // ntriples
        let (_, count) = load_store(Path::new("tests/data/small.nt")).unwrap();
        assert_eq!(count, 3);

        // named graphs collapse into the default graph; the repeated triple counts once
        let (_, count) = load_store(Path::new("tests/data/small.nq")).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_load_errors() {
        let result = load_store(Path::new("tests/data/non-existent.ttl"));
        assert!(matches!(result, Err(BrickGraphError::Load { .. })));

        let result = load_store(Path::new("tests/data/malformed.ttl"));
        match result {
            Err(BrickGraphError::Load { path, .. }) => {
                assert!(path.ends_with("malformed.ttl"))
            }
            _ => panic!("expected a load error"),
        }
    }

    #[test]
    fn test_relative_iris_resolve_against_base() {
        let data = "<a> <http://example.com/p> <b> .";
        let (store, count) = load_store_from_reader(
            data.as_bytes(),
            RdfFormat::Turtle,
            Some("http://example.com/base/"),
        )
        .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.len().unwrap(), 1);
    }
}
