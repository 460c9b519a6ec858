//! Artifact checksums.
//!
//! Checksums are hex-encoded SHA-256 digests. This is the only algorithm the
//! orchestrator accepts; artifact producers compute the same value with
//! `appliance-deploy checksum <file>`.

use sha2::{Digest, Sha256};

/// Computes the hex SHA-256 digest of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Outcome of comparing fetched bytes to an expected checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumOutcome {
    /// Digests are equal.
    Match,
    /// Digests differ; carries the computed hex digest.
    Mismatch(String),
}

/// Compares the SHA-256 digest of `bytes` against a hex checksum.
///
/// The expected value is trimmed and decoded, so letter case does not matter.
///
/// # Errors
///
/// Returns a description if `expected` is not a valid 32-byte hex digest.
pub fn verify(bytes: &[u8], expected: &str) -> Result<ChecksumOutcome, String> {
    let expected = hex::decode(expected.trim()).map_err(|e| format!("not valid hex: {e}"))?;
    if expected.len() != 32 {
        return Err(format!(
            "expected a 32-byte SHA-256 digest, got {} bytes",
            expected.len()
        ));
    }

    let actual = Sha256::digest(bytes);
    if digests_match(&expected, &actual) {
        Ok(ChecksumOutcome::Match)
    } else {
        Ok(ChecksumOutcome::Mismatch(hex::encode(actual)))
    }
}

/// Compares two digests without short-circuiting on the first difference.
fn digests_match(expected: &[u8], actual: &[u8]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }

    expected
        .iter()
        .zip(actual)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
