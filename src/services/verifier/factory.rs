/// Factory: build `JwtSecurityConfig` (with its verifier) from application `Config`.
use std::sync::Arc;

use tracing::warn;

use crate::config::{Config, ConfigError, KeySource};
use crate::services::claims::{JwtSecurityConfig, JwtVerifier};
use crate::services::verifier::{KeySetVerifier, ValidationSettings};

pub fn build_security_config(config: &Config) -> Result<JwtSecurityConfig, ConfigError> {
    let settings = ValidationSettings {
        issuer: config.issuer.clone(),
        audience: config.audience.clone(),
        leeway_seconds: config.leeway_seconds,
    };

    let verifier: Option<Arc<dyn JwtVerifier>> = match &config.key_source {
        Some(source) => Some(Arc::new(build_verifier(source, settings)?) as Arc<dyn JwtVerifier>),
        None if config.issuer.is_some() || config.audience.is_some() => {
            // iss/aud checks without keys would silently never run
            return Err(ConfigError::Missing("JWT_JWKS"));
        }
        None => None,
    };

    Ok(JwtSecurityConfig {
        required_claims: config.required_claims.clone(),
        namespaces: config.namespaces.clone(),
        max_chain_depth: config.max_chain_depth,
        verifier,
    })
}

fn build_verifier(
    source: &KeySource,
    settings: ValidationSettings,
) -> Result<KeySetVerifier, ConfigError> {
    match source {
        KeySource::JwksInline(json) => KeySetVerifier::from_jwks_json(json, settings).map_err(|e| {
            warn!(error = %e, "failed to load inline JWKS");
            ConfigError::Invalid("JWT_JWKS")
        }),
        KeySource::JwksFile(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| {
                warn!(error = %e, path = %path, "failed to read JWKS file");
                ConfigError::Invalid("JWT_JWKS_FILE")
            })?;
            KeySetVerifier::from_jwks_json(&json, settings).map_err(|e| {
                warn!(error = %e, path = %path, "failed to parse JWKS file");
                ConfigError::Invalid("JWT_JWKS_FILE")
            })
        }
        KeySource::Ed25519Pem(pem) => KeySetVerifier::from_ed_pem(pem, settings).map_err(|e| {
            warn!(error = %e, "failed to parse JWT public key PEM (expected Ed25519 SPKI PEM)");
            ConfigError::Invalid("JWT_PUBLIC_KEY_PEM")
        }),
        KeySource::HmacSecret(secret) => Ok(KeySetVerifier::from_secret(secret.as_bytes(), settings)),
    }
}
