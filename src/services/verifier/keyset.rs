//! Key-set backed `JwtVerifier`.
//!
//! Keys come from a JWKS document, an Ed25519 public key PEM or a shared HMAC
//! secret. They are loaded once by the caller; verification is purely local.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::services::claims::token_verifier::{JwtVerifier, VerificationError};

#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("failed to parse JWKS: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("JWKS contains no keys")]
    Empty,

    #[error("could not construct a decoding key for {key_id:?}: {error}")]
    Decoding {
        key_id: Option<String>,
        error: jsonwebtoken::errors::Error,
    },

    #[error("invalid ed25519 public key pem: {0}")]
    Pem(jsonwebtoken::errors::Error),
}

/// Claim checks applied on top of the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSettings {
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            leeway_seconds: 60,
        }
    }
}

impl ValidationSettings {
    fn build(&self, algorithms: Vec<Algorithm>) -> Validation {
        // `new` wants one algorithm; the full list is set right after.
        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms;
        validation.leeway = self.leeway_seconds;
        validation.validate_nbf = true;
        // exp/nbf are checked when present, none is mandatory.
        validation.required_spec_claims = HashSet::new();

        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        validation
    }
}

struct VerificationKey {
    key_id: Option<String>,
    decoding: DecodingKey,
    validation: Validation,
}

#[derive(Clone)]
pub struct KeySetVerifier {
    keys: Arc<Vec<VerificationKey>>,
    settings: ValidationSettings,
}

impl std::fmt::Debug for KeySetVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("KeySetVerifier")
            .field(
                "key_ids",
                &self.keys.iter().map(|k| &k.key_id).collect::<Vec<_>>(),
            )
            .field("settings", &self.settings)
            .finish()
    }
}

impl KeySetVerifier {
    pub fn from_jwks(jwks: JwkSet, settings: ValidationSettings) -> Result<Self, KeySetError> {
        let to_supported_alg = |key_algorithm: Option<KeyAlgorithm>| match key_algorithm {
            Some(key_alg) => Algorithm::from_str(key_alg.to_string().as_str()).ok(),
            None => None,
        };

        let mut keys = Vec::with_capacity(jwks.keys.len());
        for jwk in jwks.keys {
            let key_id = jwk.common.key_id.clone();
            let decoding = DecodingKey::from_jwk(&jwk).map_err(|error| KeySetError::Decoding {
                key_id: key_id.clone(),
                error,
            })?;

            let algorithms = match to_supported_alg(jwk.common.key_algorithm) {
                Some(explicit) => vec![explicit],
                // `alg` is optional in a JWK; fall back to the key family.
                None => match &jwk.algorithm {
                    AlgorithmParameters::RSA(_) => {
                        vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512]
                    }
                    AlgorithmParameters::EllipticCurve(_) => {
                        vec![Algorithm::ES256, Algorithm::ES384]
                    }
                    AlgorithmParameters::OctetKeyPair(_) => vec![Algorithm::EdDSA],
                    // oct
                    _ => vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
                },
            };

            keys.push(VerificationKey {
                key_id,
                decoding,
                validation: settings.build(algorithms),
            });
        }

        if keys.is_empty() {
            return Err(KeySetError::Empty);
        }

        Ok(Self {
            keys: Arc::new(keys),
            settings,
        })
    }

    pub fn from_jwks_json(json: &str, settings: ValidationSettings) -> Result<Self, KeySetError> {
        let jwks: JwkSet = serde_json::from_str(json)?;
        Self::from_jwks(jwks, settings)
    }

    /// Single Ed25519 public key (PEM, SPKI), as used for EdDSA access tokens.
    pub fn from_ed_pem(pem: &str, settings: ValidationSettings) -> Result<Self, KeySetError> {
        let decoding = DecodingKey::from_ed_pem(pem.as_bytes()).map_err(KeySetError::Pem)?;
        Ok(Self::single(decoding, vec![Algorithm::EdDSA], settings))
    }

    /// Single shared HMAC secret.
    pub fn from_secret(secret: &[u8], settings: ValidationSettings) -> Self {
        Self::single(
            DecodingKey::from_secret(secret),
            vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
            settings,
        )
    }

    fn single(
        decoding: DecodingKey,
        algorithms: Vec<Algorithm>,
        settings: ValidationSettings,
    ) -> Self {
        let key = VerificationKey {
            key_id: None,
            decoding,
            validation: settings.build(algorithms),
        };
        Self {
            keys: Arc::new(vec![key]),
            settings,
        }
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    fn select(&self, kid: Option<&str>) -> Result<&VerificationKey, VerificationError> {
        match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|k| k.key_id.as_deref() == Some(kid))
                .or_else(|| {
                    // A lone anonymous key accepts any kid.
                    match self.keys.as_slice() {
                        [only] if only.key_id.is_none() => Some(only),
                        _ => None,
                    }
                })
                .ok_or_else(|| VerificationError::UnknownKeyId(kid.to_string())),
            None => match self.keys.as_slice() {
                [only] => Ok(only),
                _ => Err(VerificationError::MissingKeyId),
            },
        }
    }
}

impl JwtVerifier for KeySetVerifier {
    fn verify(&self, token: &str) -> Result<(), VerificationError> {
        let header = decode_header(token)?;
        let key = self.select(header.kid.as_deref())?;

        if !key.validation.algorithms.contains(&header.alg) {
            return Err(VerificationError::AlgorithmNotAllowed(header.alg));
        }

        decode::<Map<String, Value>>(token, &key.decoding, &key.validation)?;
        Ok(())
    }
}
