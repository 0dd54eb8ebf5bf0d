//! Builders for binary (non-RDF source) operations
//!
//! A binary's content is either streamed into the repository
//! ([`BinaryContent::Internal`]) or referenced at an external URL the
//! repository redirects or proxies to ([`BinaryContent::External`]).

use super::{
    HeadersPayload, NonRdfSourcePayload, OperationHeader, OperationPayload, ResourceOperation,
    ResourceOperationType,
};
use crate::config::ServerManagedPropsMode;
use crate::digest::DigestUri;
use crate::error::KernelError;
use crate::identifiers::{ResourceId, Transaction};
use crate::rdf::Graph;
use crate::relaxed::{self, ServerManagedFields};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

/// How the repository serves external content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalHandling {
    Redirect,
    Proxy,
}

impl fmt::Display for ExternalHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalHandling::Redirect => write!(f, "redirect"),
            ExternalHandling::Proxy => write!(f, "proxy"),
        }
    }
}

impl FromStr for ExternalHandling {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redirect" => Ok(ExternalHandling::Redirect),
            "proxy" => Ok(ExternalHandling::Proxy),
            other => Err(KernelError::InvalidExternalContent(format!(
                "unknown handling '{}', expected redirect or proxy",
                other
            ))),
        }
    }
}

/// Content stream an operation hands to the persistence layer exactly once
pub struct ContentStream(Mutex<Option<Box<dyn Read + Send>>>);

impl ContentStream {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self(Mutex::new(Some(Box::new(reader))))
    }

    /// Take the stream; later calls return `None`
    pub fn take(&self) -> Option<Box<dyn Read + Send>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn is_taken(&self) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("taken", &self.is_taken())
            .finish()
    }
}

#[derive(Debug)]
pub enum BinaryContent {
    Internal(ContentStream),
    External { url: Url, handling: ExternalHandling },
}

impl BinaryContent {
    pub fn is_external(&self) -> bool {
        matches!(self, BinaryContent::External { .. })
    }

    pub fn content_stream(&self) -> Option<&ContentStream> {
        match self {
            BinaryContent::Internal(stream) => Some(stream),
            BinaryContent::External { .. } => None,
        }
    }

    pub fn external_url(&self) -> Option<&Url> {
        match self {
            BinaryContent::External { url, .. } => Some(url),
            BinaryContent::Internal(_) => None,
        }
    }

    pub fn external_handling(&self) -> Option<ExternalHandling> {
        match self {
            BinaryContent::External { handling, .. } => Some(*handling),
            BinaryContent::Internal(_) => None,
        }
    }
}

/// Setters shared by every binary builder.
///
/// The header-only update rejects the content setters with
/// [`KernelError::UnsupportedOperationForKind`].
pub trait NonRdfSourceOperationBuilder: Sized {
    fn mime_type(self, mime_type: impl Into<String>) -> Self;

    fn filename(self, filename: impl Into<String>) -> Self;

    fn content_digests<I>(self, digests: I) -> Result<Self, KernelError>
    where
        I: IntoIterator<Item = DigestUri>;

    /// Declared size in bytes, `None` when unknown
    fn content_size(self, size: Option<u64>) -> Result<Self, KernelError>;

    fn user_principal(self, user_principal: impl Into<String>) -> Self;

    fn build(self) -> ResourceOperation;
}

/// Fields common to binary create and update
#[derive(Debug)]
struct BinaryFields {
    header: OperationHeader,
    content: BinaryContent,
    mime_type: Option<String>,
    filename: Option<String>,
    content_digests: BTreeSet<DigestUri>,
    content_size: Option<u64>,
}

impl BinaryFields {
    fn new(
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        kind: ResourceOperationType,
        content: BinaryContent,
    ) -> Self {
        Self {
            header: OperationHeader::new(transaction, resource_id, kind),
            content,
            mime_type: None,
            filename: None,
            content_digests: BTreeSet::new(),
            content_size: None,
        }
    }

    fn build(self, parent_id: Option<ResourceId>) -> ResourceOperation {
        debug!(
            resource = %self.header.resource_id,
            kind = %self.header.kind,
            external = self.content.is_external(),
            digests = self.content_digests.len(),
            "Built binary operation"
        );

        ResourceOperation::new(
            self.header,
            OperationPayload::NonRdfSource(NonRdfSourcePayload {
                content: self.content,
                mime_type: self.mime_type,
                filename: self.filename,
                content_digests: self.content_digests,
                content_size: self.content_size,
                parent_id,
            }),
        )
    }
}

macro_rules! binary_setters {
    () => {
        fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
            self.fields.mime_type = Some(mime_type.into());
            self
        }

        fn filename(mut self, filename: impl Into<String>) -> Self {
            self.fields.filename = Some(filename.into());
            self
        }

        fn content_digests<I>(mut self, digests: I) -> Result<Self, KernelError>
        where
            I: IntoIterator<Item = DigestUri>,
        {
            self.fields.content_digests = digests.into_iter().collect();
            Ok(self)
        }

        fn content_size(mut self, size: Option<u64>) -> Result<Self, KernelError> {
            self.fields.content_size = size;
            Ok(self)
        }

        fn user_principal(mut self, user_principal: impl Into<String>) -> Self {
            self.fields.header.user_principal = Some(user_principal.into());
            self
        }
    };
}

/// Builds a CREATE of a binary
#[derive(Debug)]
pub struct CreateNonRdfSourceOperationBuilder {
    fields: BinaryFields,
    parent_id: Option<ResourceId>,
}

impl CreateNonRdfSourceOperationBuilder {
    pub fn internal<R: Read + Send + 'static>(
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        content: R,
    ) -> Self {
        Self {
            fields: BinaryFields::new(
                transaction,
                resource_id,
                ResourceOperationType::Create,
                BinaryContent::Internal(ContentStream::new(content)),
            ),
            parent_id: None,
        }
    }

    pub fn external(
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        handling: ExternalHandling,
        url: Url,
    ) -> Self {
        Self {
            fields: BinaryFields::new(
                transaction,
                resource_id,
                ResourceOperationType::Create,
                BinaryContent::External { url, handling },
            ),
            parent_id: None,
        }
    }

    pub fn parent_id(mut self, parent_id: ResourceId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

impl NonRdfSourceOperationBuilder for CreateNonRdfSourceOperationBuilder {
    binary_setters!();

    fn build(self) -> ResourceOperation {
        self.fields.build(self.parent_id)
    }
}

/// Builds an UPDATE of a binary's content
#[derive(Debug)]
pub struct UpdateNonRdfSourceOperationBuilder {
    fields: BinaryFields,
}

impl UpdateNonRdfSourceOperationBuilder {
    pub fn internal<R: Read + Send + 'static>(
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        content: R,
    ) -> Self {
        Self {
            fields: BinaryFields::new(
                transaction,
                resource_id,
                ResourceOperationType::Update,
                BinaryContent::Internal(ContentStream::new(content)),
            ),
        }
    }

    pub fn external(
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        handling: ExternalHandling,
        url: Url,
    ) -> Self {
        Self {
            fields: BinaryFields::new(
                transaction,
                resource_id,
                ResourceOperationType::Update,
                BinaryContent::External { url, handling },
            ),
        }
    }
}

impl NonRdfSourceOperationBuilder for UpdateNonRdfSourceOperationBuilder {
    binary_setters!();

    fn build(self) -> ResourceOperation {
        self.fields.build(None)
    }
}

/// Builds an UPDATE of a binary's mime type, filename and provenance
#[derive(Debug)]
pub struct UpdateNonRdfSourceHeadersOperationBuilder {
    header: OperationHeader,
    mode: ServerManagedPropsMode,
    payload: HeadersPayload,
}

impl UpdateNonRdfSourceHeadersOperationBuilder {
    pub fn new(transaction: Arc<Transaction>, resource_id: ResourceId, mode: ServerManagedPropsMode) -> Self {
        Self {
            header: OperationHeader::new(transaction, resource_id, ResourceOperationType::Update),
            mode,
            payload: HeadersPayload::default(),
        }
    }

    pub fn relaxed_properties(mut self, model: Option<&Graph>) -> Result<Self, KernelError> {
        relaxed::apply_relaxed_properties(
            &mut self.payload.server_managed,
            self.mode,
            model,
            &self.header.resource_id,
        )?;
        Ok(self)
    }

    pub fn server_managed_fields(&self) -> &ServerManagedFields {
        &self.payload.server_managed
    }

    fn unsupported(operation: &'static str) -> KernelError {
        KernelError::UnsupportedOperationForKind {
            operation,
            kind: "binary header update".to_string(),
        }
    }
}

impl NonRdfSourceOperationBuilder for UpdateNonRdfSourceHeadersOperationBuilder {
    fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.payload.mime_type = Some(mime_type.into());
        self
    }

    fn filename(mut self, filename: impl Into<String>) -> Self {
        self.payload.filename = Some(filename.into());
        self
    }

    fn content_digests<I>(self, _digests: I) -> Result<Self, KernelError>
    where
        I: IntoIterator<Item = DigestUri>,
    {
        Err(Self::unsupported("content_digests"))
    }

    fn content_size(self, _size: Option<u64>) -> Result<Self, KernelError> {
        Err(Self::unsupported("content_size"))
    }

    fn user_principal(mut self, user_principal: impl Into<String>) -> Self {
        self.header.user_principal = Some(user_principal.into());
        self
    }

    fn build(self) -> ResourceOperation {
        debug!(
            resource = %self.header.resource_id,
            kind = %self.header.kind,
            "Built binary header operation"
        );
        ResourceOperation::new(self.header, OperationPayload::Headers(self.payload))
    }
}
