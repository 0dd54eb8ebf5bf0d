//! Builder for operations without a payload

use super::{OperationHeader, OperationPayload, ResourceOperation, ResourceOperationType};
use crate::identifiers::{ResourceId, Transaction};
use std::sync::Arc;
use tracing::debug;

/// Builds delete, purge, reindex, reference and version operations
#[derive(Debug)]
pub struct SimpleOperationBuilder {
    header: OperationHeader,
}

impl SimpleOperationBuilder {
    pub fn new(transaction: Arc<Transaction>, resource_id: ResourceId, kind: ResourceOperationType) -> Self {
        Self {
            header: OperationHeader::new(transaction, resource_id, kind),
        }
    }

    pub fn user_principal(mut self, user_principal: impl Into<String>) -> Self {
        self.header.user_principal = Some(user_principal.into());
        self
    }

    pub fn build(self) -> ResourceOperation {
        debug!(resource = %self.header.resource_id, kind = %self.header.kind, "Built operation");
        ResourceOperation::new(self.header, OperationPayload::None)
    }
}
