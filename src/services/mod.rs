pub mod claims;
pub mod verifier;
