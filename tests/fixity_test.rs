//! Fixity engine integration tests

use archive_kernel::{
    DigestAlgorithm, DigestRegistry, DigestUri, FixityOptions, FixityService, FixityState, KernelError, MultiDigestReader,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const CONTENT: &[u8] = b"Test binary content";
const CONTENT_SHA1: &str = "urn:sha1:e070a846e478723070bd3c84cf83281acdb1cb09";
const CONTENT_MD5: &str = "urn:md5:effd5cdb18646d898596e683a2b8d9ea";
const XYZ_MD5: &str = "urn:md5:d16fb36f0911f878998c136191af705e";

fn service() -> FixityService {
    FixityService::new(Arc::new(DigestRegistry::standard()))
}

fn uri(s: &str) -> DigestUri {
    s.parse().unwrap()
}

#[test]
fn test_known_digests() {
    let svc = service();

    let sha1 = svc.check_fixity("info:fedora/binary", CONTENT, "SHA").unwrap();
    assert_eq!(sha1.computed_checksum, uri(CONTENT_SHA1));
    assert_eq!(sha1.computed_size, CONTENT.len() as u64);
    assert_eq!(sha1.algorithm, "SHA");
    assert_eq!(sha1.subject_identifier, "info:fedora/binary");

    let md5 = svc.check_fixity("info:fedora/binary", CONTENT, "md5").unwrap();
    assert_eq!(md5.computed_checksum, uri(CONTENT_MD5));
}

#[test]
fn test_xyz_scenarios() {
    let svc = service();
    let result = svc.check_fixity("xyz", &b"xyz"[..], "MD5").unwrap();

    let status = result.status(Some(3), &uri(XYZ_MD5));
    assert_eq!(status, BTreeSet::from([FixityState::Success]));

    let status = result.status(Some(4), &uri(XYZ_MD5));
    assert!(status.contains(&FixityState::BadSize));
    assert!(!status.contains(&FixityState::Success));

    let status = result.status(Some(3), &uri("urn:md5:00000000000000000000000000000000"));
    assert!(status.contains(&FixityState::BadChecksum));
    assert!(!status.contains(&FixityState::Success));
}

#[test]
fn test_multi_algorithm_matches_single() {
    let svc = service();
    let single = svc.check_fixity("x", CONTENT, "MD5").unwrap();
    let all = svc.check_fixity_all(CONTENT, &["MD5", "SHA-256"]).unwrap();

    assert_eq!(all.len(), 2);
    assert!(all.contains(&single.computed_checksum));
    assert!(all.iter().any(|d| d.scheme() == "urn:sha-256"));
}

/// Reader that records whether it was ever read from
struct TrackingReader {
    inner: Cursor<Vec<u8>>,
    touched: Arc<std::sync::atomic::AtomicBool>,
}

impl Read for TrackingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.touched.store(true, std::sync::atomic::Ordering::SeqCst);
        self.inner.read(buf)
    }
}

#[test]
fn test_unknown_algorithm_reads_nothing() {
    let touched = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let reader = TrackingReader {
        inner: Cursor::new(CONTENT.to_vec()),
        touched: touched.clone(),
    };

    let err = service().check_fixity_all(reader, &["MD5", "whirlpool"]).unwrap_err();
    assert!(matches!(err, KernelError::UnsupportedAlgorithm(name) if name == "whirlpool"));
    assert!(!touched.load(std::sync::atomic::Ordering::SeqCst));
}

/// Reader that fails after the first chunk
struct FailingReader {
    served: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.served {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection reset"));
        }
        self.served = true;
        buf[0] = b'x';
        Ok(1)
    }
}

#[test]
fn test_stream_failure_propagates() {
    let err = service()
        .check_fixity("x", FailingReader { served: false }, "SHA-256")
        .unwrap_err();
    assert!(matches!(err, KernelError::Io(_)));
}

#[test]
fn test_file_content() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CONTENT).unwrap();
    file.flush().unwrap();

    let content = std::fs::File::open(file.path()).unwrap();
    let result = service().check_fixity("file", content, "sha1").unwrap();
    assert_eq!(result.computed_checksum, uri(CONTENT_SHA1));
}

#[test]
fn test_recorded_fixity() {
    let svc = service();

    let report = svc
        .check_recorded_fixity("binary", CONTENT, Some(19), &[uri(CONTENT_SHA1), uri(CONTENT_MD5)])
        .unwrap();
    assert!(report.is_success());
    assert_eq!(report.digests.len(), 2);

    let report = svc
        .check_recorded_fixity("binary", CONTENT, Some(19), &[uri("urn:sha1:0000")])
        .unwrap();
    assert!(report.status.contains(&FixityState::BadChecksum));
    assert!(!report.is_success());
}

#[test]
fn test_recorded_fixity_without_digests() {
    let report = service().check_recorded_fixity("binary", CONTENT, Some(19), &[]).unwrap();
    assert_eq!(report.status, BTreeSet::from([FixityState::MissingExpected]));
    assert!(!report.is_success());
    assert!(report.digests.is_empty());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"][0], "MISSING_EXPECTED");
}

#[test]
fn test_recorded_fixity_only_unknown_algorithm() {
    let report = service()
        .check_recorded_fixity("binary", CONTENT, Some(19), &[uri("urn:crc32:deadbeef")])
        .unwrap();
    assert!(report.status.contains(&FixityState::MissingExpected));
    assert!(!report.is_success());
    assert!(report.digests.is_empty());
}

#[test]
fn test_recorded_fixity_compares_every_digest_of_an_algorithm() {
    let report = service()
        .check_recorded_fixity(
            "binary",
            CONTENT,
            Some(19),
            &[uri(CONTENT_MD5), uri("urn:md5:00000000000000000000000000000000")],
        )
        .unwrap();
    assert!(report.status.contains(&FixityState::BadChecksum));
    assert!(!report.is_success());
    assert_eq!(report.digests, vec![uri(CONTENT_MD5)]);
}

#[test]
fn test_deadline_expiry() {
    let svc = service().with_options(FixityOptions::default().with_deadline(Duration::ZERO));
    let err = svc.check_fixity("slow", CONTENT, "SHA-256").unwrap_err();
    assert!(matches!(err, KernelError::Timeout(_)));
}

#[test]
fn test_recorded_fixity_skips_unknown_algorithm() {
    let report = service()
        .check_recorded_fixity("binary", CONTENT, Some(19), &[uri("urn:crc32:abcd"), uri(CONTENT_MD5)])
        .unwrap();
    assert!(report.is_success());
    assert_eq!(report.digests, vec![uri(CONTENT_MD5)]);
}

#[test]
fn test_multi_digest_reader_with_wanted_algorithm() {
    let registry = DigestRegistry::standard();
    let mut reader = MultiDigestReader::new(
        Cursor::new(CONTENT.to_vec()),
        &registry,
        &[uri(CONTENT_SHA1)],
        &[DigestAlgorithm::Sha512],
    )
    .unwrap();

    let mut half = [0u8; 5];
    reader.read_exact(&mut half).unwrap();
    assert_eq!(reader.bytes_read(), 5);

    // remainder is drained before digests are reported
    reader.check_fixity().unwrap();
    assert_eq!(reader.bytes_read(), CONTENT.len() as u64);
    assert!(reader.digest(DigestAlgorithm::Sha512).unwrap().is_some());
}

#[tokio::test]
async fn test_async_check() {
    let svc = Arc::new(service());
    let result = svc
        .check_fixity_async("async".to_string(), Cursor::new(CONTENT.to_vec()), "MD5".to_string())
        .await
        .unwrap();
    assert_eq!(result.computed_checksum, uri(CONTENT_MD5));
}

proptest! {
    #[test]
    fn test_digest_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..4096), buffer in 1usize..512) {
        let svc = service();
        let first = svc.check_fixity("p", &data[..], "SHA-512").unwrap();
        let second = svc.with_buffer_size(buffer).check_fixity("p", &data[..], "SHA-512").unwrap();
        prop_assert_eq!(first.computed_size, data.len() as u64);
        prop_assert_eq!(first, second);
    }
}
