//! Resource identity and transaction context

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a repository resource.
///
/// The identifier is also the subject IRI the resource's own triples use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Result<Self, KernelError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(KernelError::InvalidIdentifier("identifier must not be blank".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = KernelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unit of work an operation is staged under.
///
/// Owned by the caller; operations only hold a shared reference to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: String,
    user_principal: Option<String>,
}

impl Transaction {
    /// Start a transaction with a fresh id
    pub fn new(user_principal: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_principal,
        }
    }

    /// Wrap an existing transaction id
    pub fn with_id(id: impl Into<String>, user_principal: Option<String>) -> Self {
        Self {
            id: id.into(),
            user_principal,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Principal acting in this transaction, if known
    pub fn user_principal(&self) -> Option<&str> {
        self.user_principal.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_equality() {
        let a = ResourceId::new("info:fedora/a").unwrap();
        let b: ResourceId = "info:fedora/a".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "info:fedora/a");
    }

    #[test]
    fn test_blank_resource_id_rejected() {
        assert!(ResourceId::new("  ").is_err());
    }

    #[test]
    fn test_transaction_ids_unique() {
        let a = Transaction::new(Some("fedoraUser".to_string()));
        let b = Transaction::new(None);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.user_principal(), Some("fedoraUser"));
    }
}
