//! Webhook signatures
//!
//! Provider notifications carry a header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`. The HMAC-SHA256 is
//! computed over `"<t>.<payload>"` with the endpoint's signing secret.

use hmac::{Hmac, Mac};
use jiff::{SignedDuration, Timestamp};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme accepted in the header.
pub const SIGNATURE_SCHEME: &str = "v1";

/// Default maximum distance between the signed timestamp and now.
pub const DEFAULT_TOLERANCE: SignedDuration = SignedDuration::from_secs(300);

/// Reasons a webhook signature is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// The header is missing its timestamp or is not `key=value` pairs.
    #[error("signature header is malformed")]
    MalformedHeader,

    /// The header carries no signature for the accepted scheme.
    #[error("signature header has no v1 signatures")]
    NoSignatures,

    /// The signed timestamp is too far from the current time.
    #[error("signature timestamp is outside the tolerance window")]
    TimestampOutsideTolerance,

    /// No signature in the header matches the payload.
    #[error("no signature matches the payload")]
    Mismatch,

    /// The signing secret could not be used as an HMAC key.
    #[error("signing secret is unusable")]
    InvalidSecret,
}

#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for pair in header.split(',') {
        let (key, value) = pair
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;

        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_invalid| SignatureError::MalformedHeader)?,
                );
            }
            SIGNATURE_SCHEME => {
                // Undecodable entries can never match, so they are skipped.
                if let Ok(signature) = hex::decode(value) {
                    signatures.push(signature);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;

    if signatures.is_empty() {
        return Err(SignatureError::NoSignatures);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn mac_for(payload: &[u8], secret: &str, timestamp: i64) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_invalid| SignatureError::InvalidSecret)?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(mac)
}

/// Verify `header` signs `payload` with `secret`, within `tolerance` of `now`.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing why verification failed.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: Timestamp,
    tolerance: SignedDuration,
) -> Result<(), SignatureError> {
    let header = parse_header(header)?;

    let signed_at = Timestamp::from_second(header.timestamp)
        .map_err(|_out_of_range| SignatureError::MalformedHeader)?;

    if now.duration_since(signed_at).abs() > tolerance {
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    let mac = mac_for(payload, secret, header.timestamp)?;

    let matched = header
        .signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Produce a signature header for `payload`, signed at `timestamp`.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidSecret`] when the secret cannot key the HMAC.
pub fn sign(payload: &[u8], secret: &str, timestamp: Timestamp) -> Result<String, SignatureError> {
    let seconds = timestamp.as_second();
    let digest = mac_for(payload, secret, seconds)?.finalize().into_bytes();

    Ok(format!(
        "t={seconds},{SIGNATURE_SCHEME}={}",
        hex::encode(digest)
    ))
}
