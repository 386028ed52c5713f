use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Why a single layer failed verification.
///
/// Never fatal on its own: a failed layer just does not count as verified.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token header does not name a key (`kid`) and the key set has several keys")]
    MissingKeyId,

    #[error("token uses the unknown key {0:?}")]
    UnknownKeyId(String),

    #[error("algorithm {0:?} is not allowed for the selected key")]
    AlgorithmNotAllowed(jsonwebtoken::Algorithm),
}

/// Cryptographic check of one compact token.
///
/// Implementations hold pre-loaded key material; `verify` must not block.
pub trait JwtVerifier: Send + Sync + fmt::Debug {
    fn verify(&self, token: &str) -> Result<(), VerificationError>;
}

#[derive(Debug)]
pub enum VerificationOutcome {
    /// No verifier configured; the layer is trusted structurally.
    NotApplicable,
    Verified,
    Failed(VerificationError),
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Either a configured verifier or none at all.
#[derive(Clone, Debug, Default)]
pub enum TokenVerifier {
    #[default]
    Disabled,
    Enabled(Arc<dyn JwtVerifier>),
}

impl TokenVerifier {
    pub fn new(verifier: Option<Arc<dyn JwtVerifier>>) -> Self {
        match verifier {
            Some(v) => Self::Enabled(v),
            None => Self::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    pub fn verify(&self, token: &str) -> VerificationOutcome {
        match self {
            Self::Disabled => VerificationOutcome::NotApplicable,
            Self::Enabled(verifier) => match verifier.verify(token) {
                Ok(()) => VerificationOutcome::Verified,
                Err(err) => {
                    debug!(error = %err, "token layer failed verification");
                    VerificationOutcome::Failed(err)
                }
            },
        }
    }
}
