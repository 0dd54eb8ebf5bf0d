//! Builders for RDF source operations

use super::{OperationHeader, OperationPayload, RdfSourcePayload, ResourceOperation, ResourceOperationType};
use crate::config::ServerManagedPropsMode;
use crate::error::KernelError;
use crate::identifiers::{ResourceId, Transaction};
use crate::rdf::{Graph, RdfStream, Term};
use crate::relaxed::{self, ServerManagedFields};
use std::sync::Arc;
use tracing::debug;

/// In relaxed mode, strip triples a client may not write
fn accept_triples(mode: ServerManagedPropsMode, triples: RdfStream) -> RdfStream {
    match mode {
        ServerManagedPropsMode::Relaxed => relaxed::filter_stream(triples),
        ServerManagedPropsMode::Strict => triples,
    }
}

/// Builds a CREATE (or OVERWRITE_TOMBSTONE) of an RDF source
#[derive(Debug)]
pub struct CreateRdfSourceOperationBuilder {
    header: OperationHeader,
    mode: ServerManagedPropsMode,
    interaction_model: String,
    triples: Option<RdfStream>,
    parent_id: Option<ResourceId>,
    archival_group: bool,
    overwrite: bool,
    server_managed: ServerManagedFields,
}

impl CreateRdfSourceOperationBuilder {
    pub fn new(
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        interaction_model: impl Into<String>,
        mode: ServerManagedPropsMode,
    ) -> Self {
        Self {
            header: OperationHeader::new(transaction, resource_id, ResourceOperationType::Create),
            mode,
            interaction_model: interaction_model.into(),
            triples: None,
            parent_id: None,
            archival_group: false,
            overwrite: false,
            server_managed: ServerManagedFields::default(),
        }
    }

    /// Client triples, filtered in relaxed mode
    pub fn triples(mut self, triples: RdfStream) -> Self {
        self.triples = Some(accept_triples(self.mode, triples));
        self
    }

    pub fn parent_id(mut self, parent_id: ResourceId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Mark the resource as the root of an archival group
    pub fn archival_group(mut self, archival_group: bool) -> Self {
        self.archival_group = archival_group;
        self
    }

    /// Replace a deletion marker at this identifier instead of conflicting with it
    pub fn is_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn user_principal(mut self, user_principal: impl Into<String>) -> Self {
        self.header.user_principal = Some(user_principal.into());
        self
    }

    /// Take provenance values for this resource from a client model
    pub fn relaxed_properties(mut self, model: Option<&Graph>) -> Result<Self, KernelError> {
        relaxed::apply_relaxed_properties(
            &mut self.server_managed,
            self.mode,
            model,
            &self.header.resource_id,
        )?;
        Ok(self)
    }

    pub fn build(mut self) -> ResourceOperation {
        if self.overwrite {
            self.header.kind = ResourceOperationType::OverwriteTombstone;
        }
        let triples = self
            .triples
            .unwrap_or_else(|| RdfStream::empty(Term::iri(self.header.resource_id.as_str())));

        debug!(
            resource = %self.header.resource_id,
            kind = %self.header.kind,
            triples = triples.len(),
            "Built RDF source operation"
        );

        ResourceOperation::new(
            self.header,
            OperationPayload::RdfSource(RdfSourcePayload {
                interaction_model: self.interaction_model,
                triples,
                archival_group: self.archival_group,
                parent_id: self.parent_id,
                server_managed: self.server_managed,
            }),
        )
    }
}

/// Builds an UPDATE of an RDF source
#[derive(Debug)]
pub struct UpdateRdfSourceOperationBuilder {
    header: OperationHeader,
    mode: ServerManagedPropsMode,
    interaction_model: Option<String>,
    triples: Option<RdfStream>,
    server_managed: ServerManagedFields,
}

impl UpdateRdfSourceOperationBuilder {
    pub fn new(transaction: Arc<Transaction>, resource_id: ResourceId, mode: ServerManagedPropsMode) -> Self {
        Self {
            header: OperationHeader::new(transaction, resource_id, ResourceOperationType::Update),
            mode,
            interaction_model: None,
            triples: None,
            server_managed: ServerManagedFields::default(),
        }
    }

    pub fn interaction_model(mut self, interaction_model: impl Into<String>) -> Self {
        self.interaction_model = Some(interaction_model.into());
        self
    }

    pub fn triples(mut self, triples: RdfStream) -> Self {
        self.triples = Some(accept_triples(self.mode, triples));
        self
    }

    pub fn user_principal(mut self, user_principal: impl Into<String>) -> Self {
        self.header.user_principal = Some(user_principal.into());
        self
    }

    pub fn relaxed_properties(mut self, model: Option<&Graph>) -> Result<Self, KernelError> {
        relaxed::apply_relaxed_properties(
            &mut self.server_managed,
            self.mode,
            model,
            &self.header.resource_id,
        )?;
        Ok(self)
    }

    pub fn build(self) -> ResourceOperation {
        let triples = self
            .triples
            .unwrap_or_else(|| RdfStream::empty(Term::iri(self.header.resource_id.as_str())));

        debug!(
            resource = %self.header.resource_id,
            kind = %self.header.kind,
            triples = triples.len(),
            "Built RDF source operation"
        );

        ResourceOperation::new(
            self.header,
            OperationPayload::RdfSource(RdfSourcePayload {
                interaction_model: self.interaction_model.unwrap_or_default(),
                triples,
                archival_group: false,
                parent_id: None,
                server_managed: self.server_managed,
            }),
        )
    }
}
