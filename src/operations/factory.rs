//! Entry point for obtaining operation builders

use super::non_rdf_source::{
    CreateNonRdfSourceOperationBuilder, ExternalHandling, UpdateNonRdfSourceHeadersOperationBuilder,
    UpdateNonRdfSourceOperationBuilder,
};
use super::rdf_source::{CreateRdfSourceOperationBuilder, UpdateRdfSourceOperationBuilder};
use super::simple::SimpleOperationBuilder;
use super::ResourceOperationType;
use crate::config::ServerManagedPropsMode;
use crate::identifiers::{ResourceId, Transaction};
use std::io::Read;
use std::sync::Arc;
use url::Url;

/// Hands out per-kind builders configured with the deployment's
/// server-managed properties mode.
#[derive(Debug, Clone, Copy)]
pub struct OperationFactory {
    mode: ServerManagedPropsMode,
}

impl OperationFactory {
    pub fn new(mode: ServerManagedPropsMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ServerManagedPropsMode {
        self.mode
    }

    pub fn create_builder(
        &self,
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        interaction_model: impl Into<String>,
    ) -> CreateRdfSourceOperationBuilder {
        CreateRdfSourceOperationBuilder::new(transaction, resource_id, interaction_model, self.mode)
    }

    pub fn update_builder(
        &self,
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
    ) -> UpdateRdfSourceOperationBuilder {
        UpdateRdfSourceOperationBuilder::new(transaction, resource_id, self.mode)
    }

    pub fn create_internal_binary_builder<R: Read + Send + 'static>(
        &self,
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        content: R,
    ) -> CreateNonRdfSourceOperationBuilder {
        CreateNonRdfSourceOperationBuilder::internal(transaction, resource_id, content)
    }

    pub fn create_external_binary_builder(
        &self,
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        handling: ExternalHandling,
        url: Url,
    ) -> CreateNonRdfSourceOperationBuilder {
        CreateNonRdfSourceOperationBuilder::external(transaction, resource_id, handling, url)
    }

    pub fn update_internal_binary_builder<R: Read + Send + 'static>(
        &self,
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        content: R,
    ) -> UpdateNonRdfSourceOperationBuilder {
        UpdateNonRdfSourceOperationBuilder::internal(transaction, resource_id, content)
    }

    pub fn update_external_binary_builder(
        &self,
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
        handling: ExternalHandling,
        url: Url,
    ) -> UpdateNonRdfSourceOperationBuilder {
        UpdateNonRdfSourceOperationBuilder::external(transaction, resource_id, handling, url)
    }

    pub fn update_headers_builder(
        &self,
        transaction: Arc<Transaction>,
        resource_id: ResourceId,
    ) -> UpdateNonRdfSourceHeadersOperationBuilder {
        UpdateNonRdfSourceHeadersOperationBuilder::new(transaction, resource_id, self.mode)
    }

    pub fn delete_builder(&self, transaction: Arc<Transaction>, resource_id: ResourceId) -> SimpleOperationBuilder {
        SimpleOperationBuilder::new(transaction, resource_id, ResourceOperationType::Delete)
    }

    pub fn purge_builder(&self, transaction: Arc<Transaction>, resource_id: ResourceId) -> SimpleOperationBuilder {
        SimpleOperationBuilder::new(transaction, resource_id, ResourceOperationType::Purge)
    }

    pub fn reindex_builder(&self, transaction: Arc<Transaction>, resource_id: ResourceId) -> SimpleOperationBuilder {
        SimpleOperationBuilder::new(transaction, resource_id, ResourceOperationType::Reindex)
    }

    /// Reference (FOLLOW) operation
    pub fn reference_builder(&self, transaction: Arc<Transaction>, resource_id: ResourceId) -> SimpleOperationBuilder {
        SimpleOperationBuilder::new(transaction, resource_id, ResourceOperationType::Follow)
    }

    pub fn version_builder(&self, transaction: Arc<Transaction>, resource_id: ResourceId) -> SimpleOperationBuilder {
        SimpleOperationBuilder::new(transaction, resource_id, ResourceOperationType::CreateVersion)
    }
}
