//! Structural JWT decoding.
//!
//! Splits a compact token into header / payload / signature and parses the
//! JSON parts. Nothing here checks the signature: that is `TokenVerifier`'s job,
//! and claims from a decoded-but-unverified layer are only trusted according to
//! the extractor's policy.

use std::borrow::Cow;
use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use sha2::{Digest, Sha256};

use super::error::DecodeError;
use super::types::ClaimValue;

/// A decoded (not verified) token.
///
/// Serializes as `{header, payload}`. The raw token, the signature and any
/// nested token carried in the payload are never written out; a nested token
/// shows up as its fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    raw: String,
    pub header: BTreeMap<String, ClaimValue>,
    pub payload: BTreeMap<String, ClaimValue>,
    pub signature: Vec<u8>,
    wrapped: Option<String>,
}

impl DecodedToken {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(ClaimValue::as_str)
    }

    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(ClaimValue::as_str)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.payload.get("iss").and_then(ClaimValue::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(ClaimValue::as_str)
    }

    /// base64url(SHA-256(token)), safe to put in logs instead of the token.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.raw)
    }

    /// Record the nested token found in this layer's payload (exactly as it
    /// appears there) so serialization can mask it.
    pub(crate) fn set_wrapped(&mut self, inner: &str) {
        self.wrapped = Some(inner.to_string());
    }

    fn masked_payload(&self) -> Cow<'_, BTreeMap<String, ClaimValue>> {
        match &self.wrapped {
            Some(inner) => {
                let masked = fingerprint(inner);
                Cow::Owned(
                    self.payload
                        .iter()
                        .map(|(k, v)| (k.clone(), mask(v, inner, &masked)))
                        .collect(),
                )
            }
            None => Cow::Borrowed(&self.payload),
        }
    }
}

fn mask(value: &ClaimValue, inner: &str, masked: &str) -> ClaimValue {
    match value {
        ClaimValue::String(s) if s == inner => ClaimValue::String(masked.to_string()),
        ClaimValue::Array(items) => {
            ClaimValue::Array(items.iter().map(|v| mask(v, inner, masked)).collect())
        }
        ClaimValue::Object(map) => ClaimValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), mask(v, inner, masked)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl Serialize for DecodedToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DecodedToken", 2)?;
        state.serialize_field("header", &self.header)?;
        state.serialize_field("payload", &self.masked_payload())?;
        state.end()
    }
}

pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenProcessor;

impl TokenProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, token: &str) -> Result<DecodedToken, DecodeError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        if segments.len() != 3 {
            return Err(DecodeError::SegmentCount {
                found: segments.len(),
            });
        }

        let header = decode_object(segments[0], "header")?;
        let payload = decode_object(segments[1], "payload")?;
        let signature = decode_segment(segments[2], "signature")?;

        Ok(DecodedToken {
            raw: token.trim().to_string(),
            header,
            payload,
            signature,
            wrapped: None,
        })
    }
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Vec<u8>, DecodeError> {
    // Some issuers keep the padding; the alphabet is what matters.
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|source| DecodeError::Base64 {
            segment: name,
            source,
        })
}

fn decode_object(
    segment: &str,
    name: &'static str,
) -> Result<BTreeMap<String, ClaimValue>, DecodeError> {
    let bytes = decode_segment(segment, name)?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|source| DecodeError::Json {
            segment: name,
            source,
        })?;

    match ClaimValue::from(value) {
        ClaimValue::Object(map) => Ok(map),
        _ => Err(DecodeError::NotAnObject { segment: name }),
    }
}
