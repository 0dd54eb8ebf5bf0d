//! Relaxed server-managed properties
//!
//! In `relaxed` mode a client may supply the provenance of a resource
//! (created/last-modified date and agent) instead of letting the server
//! compute it. Two independent steps make that safe:
//!
//! 1. [`extract`] pulls the four provenance values for one subject out of a
//!    source model so a builder can carry them as explicit fields.
//! 2. [`filter_triples`] drops every triple a client may not write, including
//!    those same provenance triples, so they never persist as ordinary
//!    user triples.
//!
//! In `strict` mode neither step runs.

use crate::config::ServerManagedPropsMode;
use crate::error::KernelError;
use crate::identifiers::ResourceId;
use crate::lexicon;
use crate::rdf::{Graph, RdfStream, Term, Triple};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Why a triple may not be written by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// `rdf:type` with a literal value
    LiteralType(String),
    /// `rdf:type` naming a repository, LDP or Memento type
    ServerManagedType(String),
    /// Predicate only the server may write
    ServerManagedProperty(String),
    /// Provenance predicate, settable only through relaxed extraction
    RelaxableProperty(String),
    /// `ebucore:hasMimeType` with an invalid media type
    InvalidMimeType(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LiteralType(v) => write!(f, "rdf:type may not be a literal ({})", v),
            Violation::ServerManagedType(t) => write!(f, "type {} is server managed", t),
            Violation::ServerManagedProperty(p) => write!(f, "property {} is server managed", p),
            Violation::RelaxableProperty(p) => {
                write!(f, "property {} may only be set in relaxed mode", p)
            }
            Violation::InvalidMimeType(m) => write!(f, "invalid mime type {}", m),
        }
    }
}

impl From<Violation> for KernelError {
    fn from(v: Violation) -> Self {
        match v {
            Violation::LiteralType(_) | Violation::InvalidMimeType(_) => {
                KernelError::MalformedRdf(v.to_string())
            }
            _ => KernelError::ServerManaged(v.to_string()),
        }
    }
}

/// Outcome of checking one triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Disallowed(Violation),
    /// The rules could not be applied to this triple at all
    Unevaluable(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

/// Check a triple against the server-managed rules
pub fn classify(triple: &Triple) -> Verdict {
    let predicate = match &triple.predicate {
        Term::Iri(p) => p.as_str(),
        other => return Verdict::Unevaluable(format!("predicate {} is not an IRI", other)),
    };
    if triple.subject.is_literal() {
        return Verdict::Unevaluable(format!("subject {} is a literal", triple.subject));
    }

    if predicate == lexicon::RDF_TYPE {
        return match &triple.object {
            Term::Literal(lit) => Verdict::Disallowed(Violation::LiteralType(lit.lexical.clone())),
            Term::Iri(t) if lexicon::is_managed_type(t) => {
                Verdict::Disallowed(Violation::ServerManagedType(t.clone()))
            }
            _ => Verdict::Allowed,
        };
    }

    if lexicon::is_relaxable(predicate) {
        return Verdict::Disallowed(Violation::RelaxableProperty(predicate.to_string()));
    }
    if lexicon::is_managed_predicate(predicate) {
        return Verdict::Disallowed(Violation::ServerManagedProperty(predicate.to_string()));
    }

    if predicate == lexicon::HAS_MIME_TYPE {
        if let Term::Literal(lit) = &triple.object {
            if !is_valid_mime_type(&lit.lexical) {
                return Verdict::Disallowed(Violation::InvalidMimeType(lit.lexical.clone()));
            }
        }
    }

    Verdict::Allowed
}

/// Whether a client may write this triple
pub fn is_allowed(triple: &Triple) -> bool {
    classify(triple).is_allowed()
}

/// Strict-boundary form of [`classify`]: disallowed triples become errors
pub fn check_triple(triple: &Triple) -> Result<(), KernelError> {
    match classify(triple) {
        Verdict::Allowed => Ok(()),
        Verdict::Disallowed(v) => Err(v.into()),
        Verdict::Unevaluable(reason) => Err(KernelError::MalformedRdf(reason)),
    }
}

/// Keep only the triples a client may write, preserving their order.
///
/// Disallowed and unevaluable triples are dropped, never reported.
pub fn filter_triples<I>(triples: I) -> impl Iterator<Item = Triple>
where
    I: IntoIterator<Item = Triple>,
{
    triples.into_iter().filter(|triple| match classify(triple) {
        Verdict::Allowed => true,
        Verdict::Disallowed(violation) => {
            debug!(triple = %triple, reason = %violation, "Dropping disallowed triple");
            false
        }
        Verdict::Unevaluable(reason) => {
            debug!(triple = %triple, reason = %reason, "Dropping unevaluable triple");
            false
        }
    })
}

/// [`filter_triples`] over a whole stream, keeping its topic
pub fn filter_stream(stream: RdfStream) -> RdfStream {
    let (topic, triples) = stream.into_parts();
    RdfStream::new(topic, filter_triples(triples))
}

/// Media type check per RFC 6838 `type/subtype`, parameters allowed
fn is_valid_mime_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or("").trim();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    is_restricted_name(kind) && is_restricted_name(subtype)
}

fn is_restricted_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    name.len() <= 127
        && chars.all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
}

/// Provenance fields a client may supply in relaxed mode.
///
/// `None` means "not supplied": the persistence layer computes the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerManagedFields {
    pub created_by: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl ServerManagedFields {
    pub fn is_empty(&self) -> bool {
        self.created_by.is_none()
            && self.created_date.is_none()
            && self.last_modified_by.is_none()
            && self.last_modified_date.is_none()
    }

    /// Overwrite each field `other` has a value for; leave the rest alone
    pub fn merge(&mut self, other: ServerManagedFields) {
        if other.created_by.is_some() {
            self.created_by = other.created_by;
        }
        if other.created_date.is_some() {
            self.created_date = other.created_date;
        }
        if other.last_modified_by.is_some() {
            self.last_modified_by = other.last_modified_by;
        }
        if other.last_modified_date.is_some() {
            self.last_modified_date = other.last_modified_date;
        }
    }
}

/// Provenance values the model holds for exactly `resource_id`
pub fn extract(model: &Graph, resource_id: &ResourceId) -> Result<ServerManagedFields, KernelError> {
    let subject = resource_id.as_str();
    Ok(ServerManagedFields {
        created_by: single_value(model, subject, lexicon::CREATED_BY)?.map(agent_value).transpose()?,
        created_date: single_value(model, subject, lexicon::CREATED_DATE)?
            .map(|t| date_value(t, lexicon::CREATED_DATE))
            .transpose()?,
        last_modified_by: single_value(model, subject, lexicon::LAST_MODIFIED_BY)?
            .map(agent_value)
            .transpose()?,
        last_modified_date: single_value(model, subject, lexicon::LAST_MODIFIED_DATE)?
            .map(|t| date_value(t, lexicon::LAST_MODIFIED_DATE))
            .transpose()?,
    })
}

/// Copy relaxed provenance values into `fields`.
///
/// A no-op unless `mode` is relaxed and a model was supplied.
pub fn apply_relaxed_properties(
    fields: &mut ServerManagedFields,
    mode: ServerManagedPropsMode,
    model: Option<&Graph>,
    resource_id: &ResourceId,
) -> Result<(), KernelError> {
    let Some(model) = model else {
        return Ok(());
    };
    if mode != ServerManagedPropsMode::Relaxed {
        return Ok(());
    }

    let found = extract(model, resource_id)?;
    if !found.is_empty() {
        debug!(resource = %resource_id, "Applying relaxed server managed properties");
    }
    fields.merge(found);
    Ok(())
}

fn single_value<'a>(model: &'a Graph, subject: &'a str, predicate: &'a str) -> Result<Option<&'a Term>, KernelError> {
    let mut values = model.objects(subject, predicate);
    let first = values.next();
    if values.next().is_some() {
        return Err(KernelError::MalformedRdf(format!(
            "{} may only appear once for {}",
            predicate, subject
        )));
    }
    Ok(first)
}

fn agent_value(term: &Term) -> Result<String, KernelError> {
    term.as_literal()
        .map(|lit| lit.lexical.clone())
        .ok_or_else(|| KernelError::MalformedRdf(format!("expected a literal agent, got {}", term)))
}

fn date_value(term: &Term, predicate: &str) -> Result<DateTime<Utc>, KernelError> {
    let lexical = term
        .as_literal()
        .map(|lit| lit.lexical.as_str())
        .ok_or_else(|| KernelError::MalformedRdf(format!("expected a date literal for {}", predicate)))?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(lexical) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            KernelError::MalformedRdf(format!(
                "expected value for {} to be an xsd:dateTime, got {}",
                predicate, lexical
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::*;

    const SUBJECT: &str = "http://example.com/subject";

    fn triple(predicate: &str, object: Term) -> Triple {
        Triple::new(Term::iri(SUBJECT), Term::iri(predicate), object)
    }

    #[test]
    fn test_literal_type_disallowed() {
        let verdict = classify(&triple(RDF_TYPE, Term::literal("some-type")));
        assert!(matches!(verdict, Verdict::Disallowed(Violation::LiteralType(_))));

        assert!(is_allowed(&triple(RDF_TYPE, Term::iri("http://example.com/allowed-type"))));
        assert!(is_allowed(&triple(RDF_TYPE, Term::variable("some-variable"))));
    }

    #[test]
    fn test_restricted_type_namespaces() {
        for ns in [REPOSITORY_NAMESPACE, LDP_NAMESPACE, MEMENTO_NAMESPACE] {
            let verdict = classify(&triple(RDF_TYPE, Term::iri(format!("{}my-type", ns))));
            assert!(matches!(verdict, Verdict::Disallowed(Violation::ServerManagedType(_))));
        }
    }

    #[test]
    fn test_server_managed_predicates() {
        let predicates = [
            format!("{}my-predicate", REPOSITORY_NAMESPACE),
            format!("{}my-predicate", MEMENTO_NAMESPACE),
            HAS_FIXITY_RESULT.to_string(),
            HAS_MESSAGE_DIGEST.to_string(),
            CONTAINS.to_string(),
        ];
        for p in predicates {
            let verdict = classify(&triple(&p, Term::literal("some-value")));
            assert!(
                matches!(verdict, Verdict::Disallowed(Violation::ServerManagedProperty(_))),
                "{} should be server managed",
                p
            );
        }
    }

    #[test]
    fn test_relaxable_predicates() {
        for p in RELAXABLE_PROPERTIES {
            let verdict = classify(&triple(p, Term::literal("some-value")));
            assert!(matches!(verdict, Verdict::Disallowed(Violation::RelaxableProperty(_))));
        }
    }

    #[test]
    fn test_mime_types() {
        for valid in ["text/plain", "application/json", "application/n-triples", "text/plain; charset=utf-8"] {
            assert!(is_allowed(&triple(HAS_MIME_TYPE, Term::literal(valid))), "{}", valid);
        }
        assert!(is_allowed(&triple(HAS_MIME_TYPE, Term::variable("some-variable"))));

        let verdict = classify(&triple(HAS_MIME_TYPE, Term::literal("video")));
        assert!(matches!(verdict, Verdict::Disallowed(Violation::InvalidMimeType(_))));
    }

    #[test]
    fn test_unevaluable_predicate() {
        let t = Triple::new(Term::iri(SUBJECT), Term::literal("not-a-predicate"), Term::literal("x"));
        assert!(matches!(classify(&t), Verdict::Unevaluable(_)));
        assert!(matches!(check_triple(&t), Err(KernelError::MalformedRdf(_))));
    }

    #[test]
    fn test_literal_subject_unevaluable() {
        let t = Triple::new(Term::literal("subject"), Term::iri("http://purl.org/dc/terms/title"), Term::literal("x"));
        assert!(matches!(classify(&t), Verdict::Unevaluable(_)));
        assert_eq!(filter_triples(vec![t]).count(), 0);
    }

    #[test]
    fn test_check_triple_errors() {
        assert!(matches!(
            check_triple(&triple(CONTAINS, Term::iri("http://example.com/child"))),
            Err(KernelError::ServerManaged(_))
        ));
        assert!(check_triple(&triple("http://purl.org/dc/terms/title", Term::literal("t"))).is_ok());
    }

    #[test]
    fn test_filter_stream_keeps_topic() {
        let stream = RdfStream::new(
            Term::iri(SUBJECT),
            vec![
                triple("http://purl.org/dc/terms/title", Term::literal("kept")),
                triple(CREATED_BY, Term::literal("dropped")),
            ],
        );
        let filtered = filter_stream(stream);
        assert_eq!(filtered.topic(), &Term::iri(SUBJECT));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_extract_values() {
        let id = ResourceId::new("info:fedora/test-subject").unwrap();
        let model: Graph = vec![
            Triple::new(Term::iri(id.as_str()), Term::iri(CREATED_BY), Term::literal("test-user")),
            Triple::new(
                Term::iri(id.as_str()),
                Term::iri(CREATED_DATE),
                Term::typed_literal("2023-10-01T00:00:00Z", XSD_DATE_TIME),
            ),
            Triple::new(Term::iri(id.as_str()), Term::iri(LAST_MODIFIED_BY), Term::literal("other-user")),
            Triple::new(
                Term::iri(id.as_str()),
                Term::iri(LAST_MODIFIED_DATE),
                Term::typed_literal("2025-11-01T00:00:00Z", XSD_DATE_TIME),
            ),
        ]
        .into_iter()
        .collect();

        let fields = extract(&model, &id).unwrap();
        assert_eq!(fields.created_by.as_deref(), Some("test-user"));
        assert_eq!(fields.last_modified_by.as_deref(), Some("other-user"));
        assert_eq!(fields.created_date.unwrap().to_rfc3339(), "2023-10-01T00:00:00+00:00");
        assert_eq!(fields.last_modified_date.unwrap().to_rfc3339(), "2025-11-01T00:00:00+00:00");
    }

    #[test]
    fn test_extract_non_date_fails() {
        let id = ResourceId::new("info:fedora/test-subject").unwrap();
        let model: Graph = vec![Triple::new(
            Term::iri(id.as_str()),
            Term::iri(LAST_MODIFIED_DATE),
            Term::literal("Notadate"),
        )]
        .into_iter()
        .collect();

        assert!(matches!(extract(&model, &id), Err(KernelError::MalformedRdf(_))));
    }

    #[test]
    fn test_extract_repeated_value_fails() {
        let id = ResourceId::new("info:fedora/test-subject").unwrap();
        let model: Graph = vec![
            Triple::new(Term::iri(id.as_str()), Term::iri(CREATED_BY), Term::literal("a")),
            Triple::new(Term::iri(id.as_str()), Term::iri(CREATED_BY), Term::literal("b")),
        ]
        .into_iter()
        .collect();

        assert!(matches!(extract(&model, &id), Err(KernelError::MalformedRdf(_))));
    }

    #[test]
    fn test_merge_keeps_existing_values() {
        let mut fields = ServerManagedFields {
            created_by: Some("first".to_string()),
            last_modified_by: Some("kept".to_string()),
            ..Default::default()
        };
        fields.merge(ServerManagedFields {
            created_by: Some("second".to_string()),
            ..Default::default()
        });
        assert_eq!(fields.created_by.as_deref(), Some("second"));
        assert_eq!(fields.last_modified_by.as_deref(), Some("kept"));
    }

    #[test]
    fn test_apply_is_noop_in_strict_mode() {
        let id = ResourceId::new("info:fedora/test-subject").unwrap();
        let model: Graph = vec![Triple::new(Term::iri(id.as_str()), Term::iri(CREATED_BY), Term::literal("a"))]
            .into_iter()
            .collect();

        let mut fields = ServerManagedFields::default();
        apply_relaxed_properties(&mut fields, ServerManagedPropsMode::Strict, Some(&model), &id).unwrap();
        assert!(fields.is_empty());

        apply_relaxed_properties(&mut fields, ServerManagedPropsMode::Relaxed, None, &id).unwrap();
        assert!(fields.is_empty());

        apply_relaxed_properties(&mut fields, ServerManagedPropsMode::Relaxed, Some(&model), &id).unwrap();
        assert_eq!(fields.created_by.as_deref(), Some("a"));
    }
}
