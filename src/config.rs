//! Configuration for archive-kernel

use crate::digest::{DigestAlgorithm, DigestRegistry};
use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Whether clients may set server-managed provenance properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerManagedPropsMode {
    /// The server computes created/modified fields itself
    #[default]
    Strict,
    /// Clients may supply created/modified fields
    Relaxed,
}

impl fmt::Display for ServerManagedPropsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerManagedPropsMode::Strict => f.write_str("strict"),
            ServerManagedPropsMode::Relaxed => f.write_str("relaxed"),
        }
    }
}

impl FromStr for ServerManagedPropsMode {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ServerManagedPropsMode::Strict),
            "relaxed" => Ok(ServerManagedPropsMode::Relaxed),
            other => Err(KernelError::InvalidConfiguration(format!(
                "unknown server managed properties mode: {}",
                other
            ))),
        }
    }
}

/// Algorithms accepted as the repository default digest
pub const DEFAULT_DIGEST_CHOICES: [DigestAlgorithm; 2] = [DigestAlgorithm::Sha512, DigestAlgorithm::Sha256];

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("archive-kernel")
        .join("config.toml")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server managed properties mode, fixed for the life of the process
    #[serde(default)]
    pub server_managed_props_mode: ServerManagedPropsMode,

    /// Digest algorithm every stored binary gets (sha512 or sha256)
    #[serde(default = "default_digest_algorithm")]
    pub default_digest_algorithm: String,

    /// Read buffer size for fixity checks in bytes
    #[serde(default = "default_buffer_size")]
    pub fixity_buffer_size: usize,

    /// Upper bound on a single fixity drain, in seconds
    #[serde(default)]
    pub fixity_timeout_secs: Option<u64>,
}

fn default_digest_algorithm() -> String {
    "sha512".to_string()
}

fn default_buffer_size() -> usize {
    crate::fixity::DEFAULT_BUFFER_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_managed_props_mode: ServerManagedPropsMode::Strict,
            default_digest_algorithm: default_digest_algorithm(),
            fixity_buffer_size: default_buffer_size(),
            fixity_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KernelError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| KernelError::Config(e.to_string()))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), KernelError> {
        let content = toml::to_string_pretty(self).map_err(|e| KernelError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check startup invariants, returning the resolved default algorithm
    pub fn validate(&self, registry: &DigestRegistry) -> Result<DigestAlgorithm, KernelError> {
        if self.fixity_buffer_size == 0 {
            return Err(KernelError::InvalidConfiguration(
                "fixity_buffer_size must be greater than zero".to_string(),
            ));
        }

        let alg = registry.from_algorithm(&self.default_digest_algorithm);
        if !DEFAULT_DIGEST_CHOICES.contains(&alg) {
            return Err(KernelError::InvalidConfiguration(format!(
                "unsupported default digest algorithm {}, must be one of sha512 or sha256",
                self.default_digest_algorithm
            )));
        }

        Ok(alg)
    }

    /// Drain deadline for fixity checks
    pub fn fixity_timeout(&self) -> Option<Duration> {
        self.fixity_timeout_secs.map(Duration::from_secs)
    }
}
