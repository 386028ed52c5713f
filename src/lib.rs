//! Hierarchical JWT claims extraction.
//!
//! A token may carry another complete token in its `jwt` claim (for example a
//! service token wrapping the end-user token it acts for). This crate walks
//! such a chain, verifies every layer when keys are configured, merges the
//! claims by namespace precedence and enforces presence / verification policy.
//!
//! ```ignore
//! let config = Config::from_env()?;
//! let extractor = ValidatingHierarchicalClaimsExtractor::new(build_security_config(&config)?);
//! let claims = extractor.extract_claims(token)?;
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod services;

pub use config::{Config, ConfigError};
pub use services::claims::{
    Claim, ClaimValue, ClaimsError, DecodeError, ExtractError, JwtClaims, JwtSecurityConfig,
    ValidatingHierarchicalClaimsExtractor,
};
pub use services::verifier::{KeySetVerifier, ValidationSettings, build_security_config};
