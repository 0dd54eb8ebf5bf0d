//! Resource operations
//!
//! Every change to a stored resource is described by an immutable
//! [`ResourceOperation`]: a common [`OperationHeader`] plus a kind-specific
//! [`OperationPayload`]. Operations are assembled by per-kind builders
//! obtained from an [`OperationFactory`] and handed to the persistence layer,
//! which dispatches on [`ResourceOperation::kind`].
//!
//! ```rust,ignore
//! let factory = OperationFactory::new(ServerManagedPropsMode::Relaxed);
//! let op = factory
//!     .create_builder(tx, id, lexicon::BASIC_CONTAINER)
//!     .parent_id(parent)
//!     .triples(stream)
//!     .relaxed_properties(Some(&model))?
//!     .build();
//!
//! match op.kind() {
//!     ResourceOperationType::Create => { /* write new object */ }
//!     ResourceOperationType::OverwriteTombstone => { /* replace tombstone */ }
//!     _ => {}
//! }
//! ```

pub mod factory;
pub mod non_rdf_source;
pub mod rdf_source;
pub mod simple;

pub use factory::OperationFactory;
pub use non_rdf_source::{
    BinaryContent, ContentStream, CreateNonRdfSourceOperationBuilder, ExternalHandling,
    NonRdfSourceOperationBuilder, UpdateNonRdfSourceHeadersOperationBuilder,
    UpdateNonRdfSourceOperationBuilder,
};
pub use rdf_source::{CreateRdfSourceOperationBuilder, UpdateRdfSourceOperationBuilder};
pub use simple::SimpleOperationBuilder;

use crate::digest::DigestUri;
use crate::identifiers::{ResourceId, Transaction};
use crate::rdf::RdfStream;
use crate::relaxed::ServerManagedFields;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Kind tag the persistence layer dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceOperationType {
    Create,
    Update,
    Delete,
    Purge,
    Reindex,
    /// Reference to another resource
    Follow,
    /// Create that replaces a deletion marker
    OverwriteTombstone,
    CreateVersion,
}

impl ResourceOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceOperationType::Create => "CREATE",
            ResourceOperationType::Update => "UPDATE",
            ResourceOperationType::Delete => "DELETE",
            ResourceOperationType::Purge => "PURGE",
            ResourceOperationType::Reindex => "REINDEX",
            ResourceOperationType::Follow => "FOLLOW",
            ResourceOperationType::OverwriteTombstone => "OVERWRITE_TOMBSTONE",
            ResourceOperationType::CreateVersion => "CREATE_VERSION",
        }
    }
}

impl fmt::Display for ResourceOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every operation carries
#[derive(Debug, Clone)]
pub struct OperationHeader {
    pub resource_id: ResourceId,
    pub transaction: Arc<Transaction>,
    pub user_principal: Option<String>,
    pub kind: ResourceOperationType,
}

impl OperationHeader {
    fn new(transaction: Arc<Transaction>, resource_id: ResourceId, kind: ResourceOperationType) -> Self {
        Self {
            resource_id,
            transaction,
            user_principal: None,
            kind,
        }
    }
}

/// Create, update or tombstone overwrite of an RDF source
#[derive(Debug, Clone)]
pub struct RdfSourcePayload {
    pub interaction_model: String,
    pub triples: RdfStream,
    pub archival_group: bool,
    /// Containment parent, only set on create
    pub parent_id: Option<ResourceId>,
    pub server_managed: ServerManagedFields,
}

/// Create or update of a binary
#[derive(Debug)]
pub struct NonRdfSourcePayload {
    pub content: BinaryContent,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub content_digests: BTreeSet<DigestUri>,
    /// `None` when the client did not declare a size
    pub content_size: Option<u64>,
    /// Containment parent, only set on create
    pub parent_id: Option<ResourceId>,
}

/// Update of a binary's descriptive headers only
#[derive(Debug, Clone, Default)]
pub struct HeadersPayload {
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub server_managed: ServerManagedFields,
}

#[derive(Debug)]
pub enum OperationPayload {
    /// Delete, purge, reindex, reference and version operations
    None,
    RdfSource(RdfSourcePayload),
    NonRdfSource(NonRdfSourcePayload),
    Headers(HeadersPayload),
}

/// An immutable description of one change to one resource
#[derive(Debug)]
pub struct ResourceOperation {
    header: OperationHeader,
    payload: OperationPayload,
}

impl ResourceOperation {
    pub(crate) fn new(header: OperationHeader, payload: OperationPayload) -> Self {
        Self { header, payload }
    }

    pub fn header(&self) -> &OperationHeader {
        &self.header
    }

    pub fn kind(&self) -> ResourceOperationType {
        self.header.kind
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.header.resource_id
    }

    pub fn transaction(&self) -> &Transaction {
        &self.header.transaction
    }

    pub fn user_principal(&self) -> Option<&str> {
        self.header.user_principal.as_deref()
    }

    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    /// Split into header and payload, e.g. to take ownership of content
    pub fn into_parts(self) -> (OperationHeader, OperationPayload) {
        (self.header, self.payload)
    }

    pub fn as_rdf_source(&self) -> Option<&RdfSourcePayload> {
        match &self.payload {
            OperationPayload::RdfSource(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_non_rdf_source(&self) -> Option<&NonRdfSourcePayload> {
        match &self.payload {
            OperationPayload::NonRdfSource(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_headers(&self) -> Option<&HeadersPayload> {
        match &self.payload {
            OperationPayload::Headers(p) => Some(p),
            _ => None,
        }
    }

    /// Relaxed provenance values, for the kinds that carry them
    pub fn server_managed_fields(&self) -> Option<&ServerManagedFields> {
        match &self.payload {
            OperationPayload::RdfSource(p) => Some(&p.server_managed),
            OperationPayload::Headers(p) => Some(&p.server_managed),
            _ => None,
        }
    }

    pub fn is_archival_group(&self) -> bool {
        self.as_rdf_source().map(|p| p.archival_group).unwrap_or(false)
    }

    pub fn parent_id(&self) -> Option<&ResourceId> {
        match &self.payload {
            OperationPayload::RdfSource(p) => p.parent_id.as_ref(),
            OperationPayload::NonRdfSource(p) => p.parent_id.as_ref(),
            _ => None,
        }
    }
}
