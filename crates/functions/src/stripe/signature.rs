//! `Stripe-Signature` header verification.
//!
//! The header looks like `t=1700000000,v1=<hex>,v1=<hex>,v0=<hex>`. Each
//! `v1` value is a hex HMAC-SHA256 of `"{t}.{payload}"` keyed with the
//! endpoint's signing secret. Several `v1` entries appear while a secret is
//! being rolled; any one matching is enough.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum accepted age of a signed payload.
pub const TOLERANCE_SECS: i64 = 300;

/// Why a signature was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing timestamp")]
    MissingTimestamp,
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("no v1 signature in header")]
    MissingSignature,
    #[error("timestamp outside tolerance")]
    TimestampOutsideTolerance,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// `now` is the current unix time in seconds.
///
/// # Errors
///
/// Returns [`SignatureError`] describing the first check that failed.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    if now.abs_diff(ts) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    let expected = sign(payload, timestamp, secret);

    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        tracing::debug!("Stripe signature verified");
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Compute the hex `v1` signature for a payload.
#[must_use]
pub fn sign(payload: &[u8], timestamp: &str, secret: &str) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Build a complete header value, for tests and local tooling.
#[must_use]
pub fn signature_header(payload: &[u8], timestamp: i64, secret: &str) -> String {
    let ts = timestamp.to_string();
    format!("t={ts},v1={}", sign(payload, &ts, secret))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_8Jd3kPq1Zx7Lm5Nv";
    const NOW: i64 = 1_760_000_000;
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn accepts_valid_signature() {
        let header = signature_header(PAYLOAD, NOW, SECRET);
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW, TOLERANCE_SECS), Ok(()));
    }

    #[test]
    fn accepts_any_matching_v1_during_secret_roll() {
        let good = sign(PAYLOAD, &NOW.to_string(), SECRET);
        let header = format!("t={NOW},v1={},v1={good},v0=deadbeef", "0".repeat(64));
        assert!(verify_signature(PAYLOAD, &header, SECRET, NOW, TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = signature_header(PAYLOAD, NOW, "whsec_other");
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW, TOLERANCE_SECS),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_modified_payload() {
        let header = signature_header(PAYLOAD, NOW, SECRET);
        let tampered = br#"{"id":"evt_2","type":"checkout.session.completed"}"#;
        assert_eq!(
            verify_signature(tampered, &header, SECRET, NOW, TOLERANCE_SECS),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_old_timestamp() {
        let header = signature_header(PAYLOAD, NOW - 600, SECRET);
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW, TOLERANCE_SECS),
            Err(SignatureError::TimestampOutsideTolerance)
        );
    }

    #[test]
    fn rejects_extreme_timestamps_without_overflow() {
        for ts in [i64::MIN, i64::MAX] {
            let header = format!("t={ts},v1=00");
            assert_eq!(
                verify_signature(PAYLOAD, &header, SECRET, NOW, TOLERANCE_SECS),
                Err(SignatureError::TimestampOutsideTolerance)
            );
        }
        assert_eq!(
            verify_signature(PAYLOAD, "t=0,v1=00", SECRET, i64::MIN, TOLERANCE_SECS),
            Err(SignatureError::TimestampOutsideTolerance)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(
            verify_signature(PAYLOAD, "v1=abc", SECRET, NOW, TOLERANCE_SECS),
            Err(SignatureError::MissingTimestamp)
        );
        assert_eq!(
            verify_signature(PAYLOAD, &format!("t={NOW}"), SECRET, NOW, TOLERANCE_SECS),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verify_signature(PAYLOAD, "t=yesterday,v1=abc", SECRET, NOW, TOLERANCE_SECS),
            Err(SignatureError::InvalidTimestamp)
        );
        assert_eq!(
            verify_signature(PAYLOAD, "", SECRET, NOW, TOLERANCE_SECS),
            Err(SignatureError::MissingTimestamp)
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
