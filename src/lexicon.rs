//! RDF vocabulary the repository reserves for itself

pub const REPOSITORY_NAMESPACE: &str = "http://fedora.info/definitions/v4/repository#";
pub const LDP_NAMESPACE: &str = "http://www.w3.org/ns/ldp#";
pub const MEMENTO_NAMESPACE: &str = "http://mementoweb.org/ns#";
pub const PREMIS_NAMESPACE: &str = "http://www.loc.gov/premis/rdf/v1#";
pub const EBUCORE_NAMESPACE: &str = "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#";
pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";
pub const VANN_NAMESPACE: &str = "http://purl.org/vocab/vann/";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// Provenance properties clients may set in relaxed mode
pub const CREATED_DATE: &str = "http://fedora.info/definitions/v4/repository#created";
pub const CREATED_BY: &str = "http://fedora.info/definitions/v4/repository#createdBy";
pub const LAST_MODIFIED_DATE: &str = "http://fedora.info/definitions/v4/repository#lastModified";
pub const LAST_MODIFIED_BY: &str = "http://fedora.info/definitions/v4/repository#lastModifiedBy";

pub const RELAXABLE_PROPERTIES: [&str; 4] = [CREATED_DATE, CREATED_BY, LAST_MODIFIED_DATE, LAST_MODIFIED_BY];

// Fixity
pub const HAS_FIXITY_RESULT: &str = "http://www.loc.gov/premis/rdf/v1#hasFixity";
pub const HAS_MESSAGE_DIGEST: &str = "http://www.loc.gov/premis/rdf/v1#hasMessageDigest";
pub const HAS_MESSAGE_DIGEST_ALGORITHM: &str = "http://www.loc.gov/premis/rdf/v1#hasMessageDigestAlgorithm";
pub const HAS_SIZE: &str = "http://www.loc.gov/premis/rdf/v1#hasSize";

// Containment
pub const CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";

// Namespace declarations
pub const HAS_NAMESPACE_PREFIX: &str = "http://purl.org/vocab/vann/preferredNamespacePrefix";
pub const HAS_NAMESPACE_URI: &str = "http://purl.org/vocab/vann/preferredNamespaceUri";

// Binary descriptions
pub const HAS_MIME_TYPE: &str = "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#hasMimeType";
pub const HAS_ORIGINAL_NAME: &str = "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#filename";

/// Predicates outside the reserved namespaces that only the server may write
pub const MANAGED_PROPERTIES: [&str; 7] = [
    HAS_FIXITY_RESULT,
    HAS_MESSAGE_DIGEST,
    HAS_MESSAGE_DIGEST_ALGORITHM,
    HAS_SIZE,
    CONTAINS,
    HAS_NAMESPACE_PREFIX,
    HAS_NAMESPACE_URI,
];

/// Namespaces whose types clients may not assert with `rdf:type`
pub const RESTRICTED_TYPE_NAMESPACES: [&str; 3] = [REPOSITORY_NAMESPACE, LDP_NAMESPACE, MEMENTO_NAMESPACE];

/// Namespaces whose predicates clients may not write
pub const RESTRICTED_PREDICATE_NAMESPACES: [&str; 2] = [REPOSITORY_NAMESPACE, MEMENTO_NAMESPACE];

// Interaction models
pub const BASIC_CONTAINER: &str = "http://www.w3.org/ns/ldp#BasicContainer";
pub const DIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#DirectContainer";
pub const INDIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#IndirectContainer";
pub const RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#RDFSource";
pub const NON_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#NonRDFSource";

pub fn is_relaxable(predicate: &str) -> bool {
    RELAXABLE_PROPERTIES.contains(&predicate)
}

/// Whether a predicate is managed by the repository
pub fn is_managed_predicate(predicate: &str) -> bool {
    RESTRICTED_PREDICATE_NAMESPACES
        .iter()
        .any(|ns| predicate.starts_with(ns))
        || MANAGED_PROPERTIES.contains(&predicate)
}

/// Whether an `rdf:type` value is reserved for the repository
pub fn is_managed_type(type_iri: &str) -> bool {
    RESTRICTED_TYPE_NAMESPACES.iter().any(|ns| type_iri.starts_with(ns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_predicates() {
        assert!(is_managed_predicate(CREATED_BY));
        assert!(is_managed_predicate("http://fedora.info/definitions/v4/repository#anything"));
        assert!(is_managed_predicate("http://mementoweb.org/ns#original"));
        assert!(is_managed_predicate(CONTAINS));
        assert!(!is_managed_predicate("http://www.w3.org/ns/ldp#membershipResource"));
        assert!(!is_managed_predicate("http://purl.org/dc/terms/title"));
    }

    #[test]
    fn test_relaxable() {
        assert!(is_relaxable(LAST_MODIFIED_DATE));
        assert!(!is_relaxable(HAS_SIZE));
    }
}
