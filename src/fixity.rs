//! Fixity verification
//!
//! Computes content size and one or more digests over a byte stream in a
//! single read pass, and classifies the outcome against an expected
//! (size, checksum) pair.
//!
//! The stream is taken by value, so it is dropped (closed) on every exit path,
//! including digest and I/O failures. Multi-algorithm checks keep one hasher
//! per algorithm and feed every buffer to all of them, so the content is read
//! exactly once no matter how many digests are requested.

use crate::digest::{DigestAlgorithm, DigestRegistry, DigestUri};
use crate::error::KernelError;
use chrono::{DateTime, Utc};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512, Sha512_256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default read buffer size (8KB)
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Outcome flags of a fixity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixityState {
    Success,
    BadChecksum,
    BadSize,
    MissingExpected,
}

impl fmt::Display for FixityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixityState::Success => "SUCCESS",
            FixityState::BadChecksum => "BAD_CHECKSUM",
            FixityState::BadSize => "BAD_SIZE",
            FixityState::MissingExpected => "MISSING_EXPECTED",
        };
        f.write_str(name)
    }
}

/// Classify a computed (size, checksum) pair against the expected pair.
///
/// `None` for the expected size means the size is unknown.
pub fn classify(
    computed_size: u64,
    computed_checksum: &DigestUri,
    expected_size: Option<u64>,
    expected_checksum: &DigestUri,
) -> BTreeSet<FixityState> {
    let mut status = BTreeSet::new();

    if expected_checksum.is_missing() || expected_size.is_none() {
        status.insert(FixityState::MissingExpected);
    }
    if computed_checksum != expected_checksum {
        status.insert(FixityState::BadChecksum);
    }
    if expected_size != Some(computed_size) {
        status.insert(FixityState::BadSize);
    }
    if !status.contains(&FixityState::BadChecksum) && !status.contains(&FixityState::BadSize) {
        status.insert(FixityState::Success);
    }

    status
}

/// Result of digesting one content stream with one algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixityResult {
    /// Number of bytes read from the stream
    pub computed_size: u64,
    /// Digest of the bytes read
    pub computed_checksum: DigestUri,
    /// Canonical name of the algorithm used
    pub algorithm: String,
    /// Identifier of the resource the content belongs to
    pub subject_identifier: String,
}

impl FixityResult {
    /// Status set of this result against an expected size and checksum
    pub fn status(&self, expected_size: Option<u64>, expected_checksum: &DigestUri) -> BTreeSet<FixityState> {
        classify(
            self.computed_size,
            &self.computed_checksum,
            expected_size,
            expected_checksum,
        )
    }

    /// Whether both size and checksum match
    pub fn matches(&self, expected_size: Option<u64>, expected_checksum: &DigestUri) -> bool {
        self.status(expected_size, expected_checksum)
            .contains(&FixityState::Success)
    }
}

/// Report of checking content against every digest recorded for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixityReport {
    pub subject_identifier: String,
    pub computed_size: u64,
    /// Computed digests, one per recorded algorithm that could be evaluated
    pub digests: Vec<DigestUri>,
    pub status: BTreeSet<FixityState>,
    pub checked_at: DateTime<Utc>,
}

impl FixityReport {
    pub fn is_success(&self) -> bool {
        self.status.contains(&FixityState::Success)
    }
}

/// Deadline and cancellation for a drain loop
#[derive(Debug, Clone, Default)]
pub struct FixityOptions {
    /// Give up once the drain has run this long
    pub deadline: Option<Duration>,
    /// Give up once this flag is set
    pub cancel: Option<Arc<AtomicBool>>,
}

impl FixityOptions {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn check(&self, started: Instant, subject: &str) -> Result<(), KernelError> {
        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(KernelError::Cancelled(format!("fixity check of {}", subject)));
            }
        }
        if let Some(deadline) = self.deadline {
            if started.elapsed() >= deadline {
                return Err(KernelError::Timeout(format!(
                    "fixity check of {} exceeded {:?}",
                    subject, deadline
                )));
            }
        }
        Ok(())
    }
}

/// Running hash state for one algorithm
enum Hasher {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
    Sha512_256(Sha512_256),
    Md5(Md5),
}

struct DigestState {
    algorithm: DigestAlgorithm,
    hasher: Hasher,
}

impl DigestState {
    fn new(algorithm: DigestAlgorithm) -> Result<Self, KernelError> {
        let hasher = match algorithm {
            DigestAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
            DigestAlgorithm::Sha512_256 => Hasher::Sha512_256(Sha512_256::new()),
            DigestAlgorithm::Md5 => Hasher::Md5(Md5::new()),
            DigestAlgorithm::Missing => {
                return Err(KernelError::UnsupportedAlgorithm(
                    DigestAlgorithm::Missing.algorithm().to_string(),
                ))
            }
        };
        Ok(Self { algorithm, hasher })
    }

    fn update(&mut self, data: &[u8]) {
        match &mut self.hasher {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
            Hasher::Sha512_256(h) => h.update(data),
            Hasher::Md5(h) => h.update(data),
        }
    }

    fn finalize(self) -> DigestUri {
        let bytes = match self.hasher {
            Hasher::Sha1(h) => h.finalize().to_vec(),
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
            Hasher::Sha512_256(h) => h.finalize().to_vec(),
            Hasher::Md5(h) => h.finalize().to_vec(),
        };
        DigestUri::new(self.algorithm, &bytes)
    }
}

/// Read `content` to the end, feeding every buffer to all `states`.
///
/// Returns the number of bytes read.
fn drain<R: Read>(
    mut content: R,
    states: &mut [DigestState],
    buffer_size: usize,
    options: &FixityOptions,
    subject: &str,
) -> Result<u64, KernelError> {
    let started = Instant::now();
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        options.check(started, subject)?;

        let n = match content.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(KernelError::Io(e)),
        };

        for state in states.iter_mut() {
            state.update(&buf[..n]);
        }
        total += n as u64;
    }

    Ok(total)
}

/// Fixity engine
#[derive(Debug, Clone)]
pub struct FixityService {
    registry: Arc<DigestRegistry>,
    buffer_size: usize,
    options: FixityOptions,
}

impl FixityService {
    /// Create a fixity service resolving algorithms through `registry`
    pub fn new(registry: Arc<DigestRegistry>) -> Self {
        Self {
            registry,
            buffer_size: DEFAULT_BUFFER_SIZE,
            options: FixityOptions::default(),
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Default deadline/cancellation applied to every check
    pub fn with_options(mut self, options: FixityOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &DigestRegistry {
        &self.registry
    }

    /// Digest `content` with a single algorithm
    pub fn check_fixity<R: Read>(
        &self,
        subject: &str,
        content: R,
        algorithm: &str,
    ) -> Result<FixityResult, KernelError> {
        self.check_fixity_with_options(subject, content, algorithm, &self.options)
    }

    /// Digest `content` with a single algorithm under explicit options
    pub fn check_fixity_with_options<R: Read>(
        &self,
        subject: &str,
        content: R,
        algorithm: &str,
        options: &FixityOptions,
    ) -> Result<FixityResult, KernelError> {
        let alg = self.registry.resolve(algorithm)?;
        let mut states = vec![DigestState::new(alg)?];

        let size = drain(content, &mut states, self.buffer_size, options, subject)?;
        let checksum = states
            .pop()
            .map(DigestState::finalize)
            .ok_or_else(|| KernelError::Internal("digest state lost".to_string()))?;

        debug!(subject = %subject, size = size, checksum = %checksum, "Computed fixity");

        Ok(FixityResult {
            computed_size: size,
            computed_checksum: checksum,
            algorithm: alg.algorithm().to_string(),
            subject_identifier: subject.to_string(),
        })
    }

    /// Digest `content` with every requested algorithm in one pass.
    ///
    /// All names are resolved before the stream is touched, so an unknown
    /// algorithm fails without reading any content.
    pub fn check_fixity_all<R, S>(&self, content: R, algorithms: &[S]) -> Result<BTreeSet<DigestUri>, KernelError>
    where
        R: Read,
        S: AsRef<str>,
    {
        let mut resolved = BTreeSet::new();
        for name in algorithms {
            resolved.insert(self.registry.resolve(name.as_ref())?);
        }

        let mut states = resolved
            .into_iter()
            .map(DigestState::new)
            .collect::<Result<Vec<_>, _>>()?;

        let size = drain(content, &mut states, self.buffer_size, &self.options, "content")?;
        let digests: BTreeSet<DigestUri> = states.into_iter().map(DigestState::finalize).collect();

        debug!(size = size, digests = digests.len(), "Computed digests");
        Ok(digests)
    }

    /// Check `content` against the size and digests recorded for it.
    ///
    /// Recorded digests with an unknown algorithm are skipped. Every recorded
    /// digest of a known algorithm is compared, including repeats. When no
    /// recorded digest can be evaluated the report is MISSING_EXPECTED and
    /// never SUCCESS.
    pub fn check_recorded_fixity<R: Read>(
        &self,
        subject: &str,
        content: R,
        recorded_size: Option<u64>,
        recorded_digests: &[DigestUri],
    ) -> Result<FixityReport, KernelError> {
        let mut expected: BTreeMap<DigestAlgorithm, Vec<&DigestUri>> = BTreeMap::new();
        for uri in recorded_digests {
            match uri.algorithm(&self.registry) {
                DigestAlgorithm::Missing => {
                    warn!(subject = %subject, digest = %uri, "Skipping recorded digest with unknown algorithm");
                }
                alg => expected.entry(alg).or_default().push(uri),
            }
        }

        let mut states = expected
            .keys()
            .map(|alg| DigestState::new(*alg))
            .collect::<Result<Vec<_>, _>>()?;

        let size = drain(content, &mut states, self.buffer_size, &self.options, subject)?;
        let digests: Vec<DigestUri> = states.into_iter().map(DigestState::finalize).collect();

        let mut status = BTreeSet::new();
        for (computed, recorded) in digests.iter().zip(expected.values()) {
            for uri in recorded {
                status.extend(classify(size, computed, recorded_size, uri));
            }
        }
        if expected.is_empty() {
            status.extend(classify(size, &DigestUri::missing(), recorded_size, &DigestUri::missing()));
        }

        let failed = status.contains(&FixityState::BadSize) || status.contains(&FixityState::BadChecksum);
        if failed || status.contains(&FixityState::MissingExpected) {
            status.remove(&FixityState::Success);
        }

        let report = FixityReport {
            subject_identifier: subject.to_string(),
            computed_size: size,
            digests,
            status,
            checked_at: Utc::now(),
        };

        if report.is_success() {
            info!(subject = %subject, size = size, "Fixity check passed");
        } else {
            warn!(subject = %subject, size = size, status = ?report.status, "Fixity check failed");
        }

        Ok(report)
    }

    /// Run [`FixityService::check_fixity`] on the blocking thread pool
    pub async fn check_fixity_async<R>(
        self: Arc<Self>,
        subject: String,
        content: R,
        algorithm: String,
    ) -> Result<FixityResult, KernelError>
    where
        R: Read + Send + 'static,
    {
        tokio::task::spawn_blocking(move || self.check_fixity(&subject, content, &algorithm))
            .await
            .map_err(|e| KernelError::Internal(format!("fixity task failed: {}", e)))?
    }
}

/// `Read` adapter that digests content while someone else consumes it.
///
/// Built from the digests a client declared for the content plus any extra
/// algorithms the repository wants recorded. After the wrapped stream has
/// been consumed, [`MultiDigestReader::check_fixity`] verifies every declared
/// digest.
pub struct MultiDigestReader<R> {
    inner: R,
    states: Vec<DigestState>,
    declared: BTreeMap<DigestAlgorithm, DigestUri>,
    bytes_read: u64,
    computed: Option<Vec<DigestUri>>,
}

impl<R: Read> MultiDigestReader<R> {
    pub fn new(
        inner: R,
        registry: &DigestRegistry,
        declared: &[DigestUri],
        wanted: &[DigestAlgorithm],
    ) -> Result<Self, KernelError> {
        let mut algorithms = BTreeSet::new();
        let mut declared_by_alg = BTreeMap::new();

        for uri in declared {
            let alg = uri.algorithm(registry);
            if alg.is_missing() {
                return Err(KernelError::UnsupportedAlgorithm(uri.scheme().to_string()));
            }
            algorithms.insert(alg);
            declared_by_alg.insert(alg, uri.clone());
        }
        for alg in wanted {
            if alg.is_missing() {
                return Err(KernelError::UnsupportedAlgorithm(alg.algorithm().to_string()));
            }
            algorithms.insert(*alg);
        }

        let states = algorithms
            .into_iter()
            .map(DigestState::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            inner,
            states,
            declared: declared_by_alg,
            bytes_read: 0,
            computed: None,
        })
    }

    /// Bytes passed through so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Computed digests, consuming any unread remainder first
    pub fn digests(&mut self) -> Result<Vec<DigestUri>, KernelError> {
        self.finish()?;
        Ok(self.computed.clone().unwrap_or_default())
    }

    /// Computed digest for one algorithm, if it was computed
    pub fn digest(&mut self, algorithm: DigestAlgorithm) -> Result<Option<DigestUri>, KernelError> {
        let scheme = algorithm.scheme();
        Ok(self.digests()?.into_iter().find(|d| d.scheme() == scheme))
    }

    /// Verify every declared digest against the computed value
    pub fn check_fixity(&mut self) -> Result<(), KernelError> {
        let computed = self.digests()?;

        for (alg, expected) in &self.declared {
            let actual = computed.iter().find(|d| d.scheme() == alg.scheme());
            match actual {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    warn!(algorithm = %alg, expected = %expected, actual = %actual, "Declared digest mismatch");
                    return Err(KernelError::InvalidChecksum {
                        algorithm: alg.algorithm().to_string(),
                        expected: expected.value().to_string(),
                        actual: actual.value().to_string(),
                    });
                }
                None => {
                    return Err(KernelError::Internal(format!("no digest computed for {}", alg)));
                }
            }
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<(), KernelError> {
        if self.computed.is_some() {
            return Ok(());
        }

        let mut buf = vec![0u8; DEFAULT_BUFFER_SIZE];
        loop {
            match self.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(KernelError::Io(e)),
            }
        }

        let states = std::mem::take(&mut self.states);
        self.computed = Some(states.into_iter().map(DigestState::finalize).collect());
        Ok(())
    }
}

impl<R: Read> Read for MultiDigestReader<R> {
    /// Reports end of stream once the digests have been finalized.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.computed.is_some() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        for state in self.states.iter_mut() {
            state.update(&buf[..n]);
        }
        self.bytes_read += n as u64;
        Ok(n)
    }
}
