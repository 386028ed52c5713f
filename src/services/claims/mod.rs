pub mod error;
pub mod extractor;
pub mod hierarchical;
pub mod inner_claims;
pub mod token_processor;
pub mod token_verifier;
pub mod types;
pub mod validator;

pub use error::{ClaimsError, DecodeError, ExtractError};
pub use extractor::{DEFAULT_MAX_CHAIN_DEPTH, JwtSecurityConfig, ValidatingHierarchicalClaimsExtractor};
pub use token_processor::DecodedToken;
pub use token_verifier::{JwtVerifier, TokenVerifier, VerificationError, VerificationOutcome};
pub use types::{Claim, ClaimValue, JwtClaims, Namespaces, WRAPPED_TOKEN_KEY};
