//! Operation builder integration tests

use archive_kernel::lexicon::{self, BASIC_CONTAINER, CREATED_BY, NON_RDF_SOURCE};
use archive_kernel::operations::{ExternalHandling, NonRdfSourceOperationBuilder, OperationPayload};
use archive_kernel::{
    DigestUri, Graph, KernelError, OperationFactory, ResourceId, ResourceOperationType, RdfStream,
    ServerManagedPropsMode, Term, Transaction, Triple,
};
use std::io::Cursor;
use std::sync::Arc;
use url::Url;

const RESOURCE: &str = "info:fedora/test-subject";

fn id(s: &str) -> ResourceId {
    ResourceId::new(s).unwrap()
}

fn tx() -> Arc<Transaction> {
    Arc::new(Transaction::with_id("tx-1", Some("fedoraUser".to_string())))
}

#[test]
fn test_overwrite_produces_tombstone_kind() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Strict);

    let op = factory
        .create_builder(tx(), id(RESOURCE), BASIC_CONTAINER)
        .is_overwrite(true)
        .build();
    assert_eq!(op.kind(), ResourceOperationType::OverwriteTombstone);

    let op = factory
        .create_builder(tx(), id(RESOURCE), BASIC_CONTAINER)
        .is_overwrite(false)
        .build();
    assert_eq!(op.kind(), ResourceOperationType::Create);
}

#[test]
fn test_create_carries_parent_and_archival_group() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Strict);
    let op = factory
        .create_builder(tx(), id(RESOURCE), BASIC_CONTAINER)
        .parent_id(id("info:fedora/parent"))
        .archival_group(true)
        .user_principal("fedoraAdmin")
        .build();

    assert!(op.is_archival_group());
    assert_eq!(op.parent_id(), Some(&id("info:fedora/parent")));
    assert_eq!(op.user_principal(), Some("fedoraAdmin"));
    assert_eq!(op.transaction().id(), "tx-1");

    let payload = op.as_rdf_source().unwrap();
    assert_eq!(payload.interaction_model, BASIC_CONTAINER);
    assert!(payload.triples.is_empty());
    assert_eq!(payload.triples.topic(), &Term::iri(RESOURCE));
}

#[test]
fn test_headers_builder_rejects_digests() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Relaxed);
    let digest: DigestUri = "urn:sha-256:abcd".parse().unwrap();

    let result = factory
        .update_headers_builder(tx(), id(RESOURCE))
        .content_digests(vec![digest]);
    assert!(matches!(result, Err(KernelError::UnsupportedOperationForKind { .. })));
}

#[test]
fn test_headers_builder_relaxed_properties() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Relaxed);
    let model: Graph = vec![Triple::new(Term::iri(RESOURCE), Term::iri(CREATED_BY), Term::literal("importer"))]
        .into_iter()
        .collect();

    let op = factory
        .update_headers_builder(tx(), id(RESOURCE))
        .relaxed_properties(Some(&model))
        .unwrap()
        .mime_type("text/plain")
        .build();

    assert_eq!(op.kind(), ResourceOperationType::Update);
    assert_eq!(op.server_managed_fields().unwrap().created_by.as_deref(), Some("importer"));
}

#[test]
fn test_binary_builders_choose_content_source() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Strict);

    let internal = factory
        .create_internal_binary_builder(tx(), id(RESOURCE), Cursor::new(b"bytes".to_vec()))
        .build();
    let external = factory
        .update_external_binary_builder(
            tx(),
            id(RESOURCE),
            "Redirect".parse::<ExternalHandling>().unwrap(),
            Url::parse("https://example.org/data.bin").unwrap(),
        )
        .build();

    let internal = internal.as_non_rdf_source().unwrap();
    assert!(internal.content.content_stream().is_some());
    assert!(internal.content.external_url().is_none());

    let external = external.as_non_rdf_source().unwrap();
    assert!(external.content.content_stream().is_none());
    assert_eq!(external.content.external_handling(), Some(ExternalHandling::Redirect));
}

#[test]
fn test_binary_update_internal_and_create_external() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Strict);

    let op = factory
        .update_internal_binary_builder(tx(), id(RESOURCE), Cursor::new(Vec::new()))
        .content_size(Some(0))
        .unwrap()
        .build();
    assert_eq!(op.kind(), ResourceOperationType::Update);
    assert_eq!(op.as_non_rdf_source().unwrap().content_size, Some(0));

    let op = factory
        .create_external_binary_builder(
            tx(),
            id(RESOURCE),
            ExternalHandling::Proxy,
            Url::parse("file:///data/remote.bin").unwrap(),
        )
        .parent_id(id("info:fedora/parent"))
        .filename("remote.bin")
        .build();
    assert_eq!(op.kind(), ResourceOperationType::Create);
    assert_eq!(op.parent_id(), Some(&id("info:fedora/parent")));
}

#[test]
fn test_relaxed_update_filters_stream() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Relaxed);
    let stream = RdfStream::new(
        Term::iri(RESOURCE),
        vec![
            Triple::new(Term::iri(RESOURCE), Term::iri("http://purl.org/dc/terms/title"), Term::literal("t")),
            Triple::new(Term::iri(RESOURCE), Term::iri(lexicon::RDF_TYPE), Term::iri(NON_RDF_SOURCE)),
            Triple::new(Term::iri(RESOURCE), Term::iri(CREATED_BY), Term::literal("someone")),
        ],
    );

    let op = factory.update_builder(tx(), id(RESOURCE)).triples(stream).build();
    let payload = op.as_rdf_source().unwrap();
    assert_eq!(payload.triples.len(), 1);
    assert!(op.server_managed_fields().unwrap().is_empty());
}

#[test]
fn test_payload_dispatch() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Strict);
    let ops = vec![
        factory.create_builder(tx(), id(RESOURCE), BASIC_CONTAINER).build(),
        factory.delete_builder(tx(), id(RESOURCE)).build(),
        factory.update_headers_builder(tx(), id(RESOURCE)).build(),
    ];

    let described: Vec<&str> = ops
        .iter()
        .map(|op| match op.payload() {
            OperationPayload::RdfSource(_) => "rdf",
            OperationPayload::NonRdfSource(_) => "binary",
            OperationPayload::Headers(_) => "headers",
            OperationPayload::None => "none",
        })
        .collect();
    assert_eq!(described, vec!["rdf", "none", "headers"]);
}

#[test]
fn test_operation_shared_across_threads() {
    let factory = OperationFactory::new(ServerManagedPropsMode::Strict);
    let op = Arc::new(factory.purge_builder(tx(), id(RESOURCE)).build());

    let handle = {
        let op = op.clone();
        std::thread::spawn(move || op.kind())
    };
    assert_eq!(handle.join().unwrap(), ResourceOperationType::Purge);
}
