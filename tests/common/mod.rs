#![allow(dead_code)]

use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::Value;

use hierarchical_jwt::{KeySetVerifier, ValidationSettings};

pub const SECRET: &[u8] = b"integration-test-secret";
pub const OTHER_SECRET: &[u8] = b"someone-elses-secret";

pub fn sign(claims: Value) -> String {
    sign_with(claims, SECRET)
}

pub fn sign_with(claims: Value, secret: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}

pub fn verifier() -> Arc<KeySetVerifier> {
    Arc::new(KeySetVerifier::from_secret(
        SECRET,
        ValidationSettings::default(),
    ))
}
