//! Archive Kernel - mutation and integrity core for a versioned object repository
//!
//! Sits between the request layer, which parses client requests, and the
//! persistence layer, which writes versioned objects to disk.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`operations`] | Immutable per-kind operation values and their builders |
//! | [`relaxed`] | Which client triples may be written, relaxed provenance extraction |
//! | [`fixity`] | Single-pass streaming digest and size verification |
//! | [`digest`] | Digest algorithm registry and `urn:<scheme>:<hex>` digest URIs |
//!
//! ## Flow
//!
//! ```text
//! request layer ──► OperationFactory ──► builder ──► ResourceOperation ──► persistence
//!                                          │
//!                                          └── relaxed::{filter_triples, extract}
//!
//! stored content ──► FixityService ──► FixityResult / FixityReport
//! ```

pub mod config;
pub mod digest;
pub mod error;
pub mod fixity;
pub mod identifiers;
pub mod lexicon;
pub mod operations;
pub mod rdf;
pub mod relaxed;

// Re-exports
pub use config::{Config, ServerManagedPropsMode};
pub use digest::{DigestAlgorithm, DigestRegistry, DigestUri};
pub use error::KernelError;
pub use fixity::{FixityOptions, FixityReport, FixityResult, FixityService, FixityState, MultiDigestReader};
pub use identifiers::{ResourceId, Transaction};
pub use operations::{OperationFactory, ResourceOperation, ResourceOperationType};
pub use rdf::{Graph, RdfStream, Term, Triple};
pub use relaxed::{ServerManagedFields, Verdict, Violation};
