//! Well-known namespaces for Brick models, and constant NamedNodeRefs for the Brick and RDF
//! terms used to navigate a building model.

use oxigraph::model::NamedNodeRef;

// namespaces registered by default
pub const BRICK_NS: &str = "https://brickschema.org/schema/1.0.1/Brick#";
pub const BRICK_FRAME_NS: &str = "https://brickschema.org/schema/1.0.1/BrickFrame#";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
/// Namespace bound to `ex:` unless the configuration names another one.
pub const DEFAULT_BUILDING_NS: &str = "http://example.com/building#";

/// The graph file loaded when no path is given.
pub const DEFAULT_GRAPH_FILE: &str = "building.ttl";

pub const DEFAULT_PREFIXES: [(&str, &str); 6] = [
    ("brick", BRICK_NS),
    ("bf", BRICK_FRAME_NS),
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("owl", OWL_NS),
    ("xsd", XSD_NS),
];

// instantiation and subclassing
pub const TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
pub const SUB_CLASS_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#subClassOf");
pub const LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
// brickframe relationships
pub const FEEDS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://brickschema.org/schema/1.0.1/BrickFrame#feeds");
pub const HAS_POINT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://brickschema.org/schema/1.0.1/BrickFrame#hasPoint");
pub const IS_PART_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://brickschema.org/schema/1.0.1/BrickFrame#isPartOf");
pub const UUID: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://brickschema.org/schema/1.0.1/BrickFrame#uuid");
