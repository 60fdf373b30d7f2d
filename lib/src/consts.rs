//! Defines constant NamedNodeRefs for the handful of RDF terms the library
//! navigates itself, and the namespace table every graph starts with.

use oxigraph::model::NamedNodeRef;

pub const TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
pub const SAME_AS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#sameAs");

// xsd datatypes used when building literals from native values
pub const XSD_INTEGER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#integer");
pub const XSD_DOUBLE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#double");
pub const XSD_BOOLEAN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#boolean");

/// Prefixes registered on every new graph. Later registrations of the same
/// prefix replace these.
pub const DEFAULT_NAMESPACES: [(&str, &str); 17] = [
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("yago", "http://dbpedia.org/class/yago/"),
    ("dbpedia", "http://dbpedia.org/resource/"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("void", "http://rdfs.org/ns/void#"),
    ("qb", "http://purl.org/linked-data/cube#"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("interval", "http://reference.data.gov.uk/def/intervals/"),
    ("org", "http://www.w3.org/ns/org#"),
    ("vcard", "http://www.w3.org/2006/vcard/ns#"),
    ("payment", "http://reference.data.gov.uk/def/payment#"),
    ("council", "http://reference.data.gov.uk/def/council#"),
    ("internal", "http://www.epimorphics.com/vocabularies/spend/internal#"),
];

/// Accept header sent when dereferencing a URI.
pub const RDF_ACCEPT: &[(&str, f32)] = &[
    ("text/turtle", 0.9),
    ("text/n3", 0.8),
    ("application/rdf+xml", 0.5),
];

/// Base IRI used when parsing text that has no location of its own.
pub const STRING_INPUT_BASE: &str = "tag:string-input";
