//! Digest algorithms and digest URIs
//!
//! Every supported algorithm has a canonical name (the name the repository
//! records), a URI scheme used when a digest is written as a URI, and a set
//! of case-insensitive aliases accepted from clients:
//!
//! | Algorithm | Name | Scheme | Aliases |
//! |-----------|------|--------|---------|
//! | SHA-1 | `SHA` | `urn:sha1` | `sha-1`, `sha1` |
//! | SHA-256 | `SHA-256` | `urn:sha-256` | `sha256` |
//! | SHA-512 | `SHA-512` | `urn:sha-512` | `sha512` |
//! | SHA-512/256 | `SHA-512/256` | `urn:sha-512/256` | `sha512/256` |
//! | MD5 | `MD5` | `urn:md5` | |
//!
//! Lookups go through a [`DigestRegistry`], built once at startup and passed
//! by reference to whatever needs to resolve a client-supplied name.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A digest algorithm known to the repository.
///
/// `Missing` stands for "unknown algorithm" and is what lookups return for
/// names the registry does not recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha512,
    Sha512_256,
    Md5,
    Missing,
}

impl DigestAlgorithm {
    /// All algorithms that can actually compute a digest
    pub const SUPPORTED: [DigestAlgorithm; 5] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha512,
        DigestAlgorithm::Sha512_256,
        DigestAlgorithm::Md5,
    ];

    /// Canonical algorithm name
    pub fn algorithm(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512 => "SHA-512",
            DigestAlgorithm::Sha512_256 => "SHA-512/256",
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Missing => "NONE",
        }
    }

    /// URI scheme a digest of this algorithm is written under
    pub fn scheme(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "urn:sha1",
            DigestAlgorithm::Sha256 => "urn:sha-256",
            DigestAlgorithm::Sha512 => "urn:sha-512",
            DigestAlgorithm::Sha512_256 => "urn:sha-512/256",
            DigestAlgorithm::Md5 => "urn:md5",
            DigestAlgorithm::Missing => "missing",
        }
    }

    /// Alternate names accepted for this algorithm (compared case-insensitively)
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            DigestAlgorithm::Sha1 => &["sha-1", "sha1"],
            DigestAlgorithm::Sha256 => &["sha256"],
            DigestAlgorithm::Sha512 => &["sha512"],
            DigestAlgorithm::Sha512_256 => &["sha512/256"],
            DigestAlgorithm::Md5 | DigestAlgorithm::Missing => &[],
        }
    }

    pub fn is_missing(&self) -> bool {
        *self == DigestAlgorithm::Missing
    }

    /// Length of the raw digest in bytes
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 | DigestAlgorithm::Sha512_256 => 32,
            DigestAlgorithm::Sha512 => 64,
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Missing => 0,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm())
    }
}

/// Read-only lookup table from names, aliases and schemes to algorithms.
#[derive(Debug, Clone)]
pub struct DigestRegistry {
    by_name: HashMap<String, DigestAlgorithm>,
    by_scheme: HashMap<&'static str, DigestAlgorithm>,
}

impl DigestRegistry {
    /// Registry holding every supported algorithm
    pub fn standard() -> Self {
        Self::with_algorithms(&DigestAlgorithm::SUPPORTED)
    }

    /// Registry restricted to the given algorithms
    pub fn with_algorithms(algorithms: &[DigestAlgorithm]) -> Self {
        let mut by_name = HashMap::new();
        let mut by_scheme = HashMap::new();

        for alg in algorithms.iter().filter(|a| !a.is_missing()) {
            by_name.insert(alg.algorithm().to_ascii_lowercase(), *alg);
            for alias in alg.aliases() {
                by_name.insert(alias.to_ascii_lowercase(), *alg);
            }
            by_scheme.insert(alg.scheme(), *alg);
        }

        Self { by_name, by_scheme }
    }

    /// Look up an algorithm by name or alias, `Missing` when unknown
    pub fn from_algorithm(&self, name: &str) -> DigestAlgorithm {
        self.by_name
            .get(&name.trim().to_ascii_lowercase())
            .copied()
            .unwrap_or(DigestAlgorithm::Missing)
    }

    /// Look up an algorithm by name or alias, failing for unknown names
    pub fn resolve(&self, name: &str) -> Result<DigestAlgorithm, KernelError> {
        match self.from_algorithm(name) {
            DigestAlgorithm::Missing => Err(KernelError::UnsupportedAlgorithm(name.to_string())),
            alg => Ok(alg),
        }
    }

    /// Look up an algorithm by URI scheme, `Missing` when unknown
    pub fn from_scheme(&self, scheme: &str) -> DigestAlgorithm {
        self.by_scheme
            .get(scheme.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(DigestAlgorithm::Missing)
    }

    pub fn is_supported(&self, name: &str) -> bool {
        !self.from_algorithm(name).is_missing()
    }
}

impl Default for DigestRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// A digest written as a URI: `<scheme>:<hex digest>`, e.g.
/// `urn:sha1:e070a846e478723070bd3c84cf83281acdb1cb09`.
///
/// Scheme and value are stored lowercased so that comparisons are
/// insensitive to the case a client used for the hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DigestUri {
    scheme: String,
    value: String,
}

impl DigestUri {
    /// Build a digest URI from raw digest bytes
    pub fn new(algorithm: DigestAlgorithm, digest: &[u8]) -> Self {
        Self {
            scheme: algorithm.scheme().to_string(),
            value: hex::encode(digest),
        }
    }

    /// Build a digest URI from an already hex-encoded digest
    pub fn from_hex(algorithm: DigestAlgorithm, hex_digest: &str) -> Self {
        Self {
            scheme: algorithm.scheme().to_string(),
            value: hex_digest.to_ascii_lowercase(),
        }
    }

    /// Sentinel for "no expected checksum recorded"
    pub fn missing() -> Self {
        Self {
            scheme: DigestAlgorithm::Missing.scheme().to_string(),
            value: "missing".to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.scheme == DigestAlgorithm::Missing.scheme()
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Encoded digest value (lowercase hex for computed digests)
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Algorithm this digest was computed with, `Missing` when unknown
    pub fn algorithm(&self, registry: &DigestRegistry) -> DigestAlgorithm {
        registry.from_scheme(&self.scheme)
    }
}

impl fmt::Display for DigestUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.value)
    }
}

impl FromStr for DigestUri {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scheme, value) = s
            .rsplit_once(':')
            .ok_or_else(|| KernelError::InvalidDigestUri(s.to_string()))?;

        if scheme.is_empty() || value.is_empty() {
            return Err(KernelError::InvalidDigestUri(s.to_string()));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            value: value.to_ascii_lowercase(),
        })
    }
}

impl TryFrom<String> for DigestUri {
    type Error = KernelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DigestUri> for String {
    fn from(uri: DigestUri) -> Self {
        uri.to_string()
    }
}
