use std::collections::BTreeMap;

use super::error::ClaimsError;
use super::types::Claim;

/// Post-walk policy checks.
#[derive(Debug, Clone, Default)]
pub struct ClaimsValidator {
    required_claims: Vec<String>,
}

impl ClaimsValidator {
    pub fn new(required_claims: Vec<String>) -> Self {
        Self { required_claims }
    }

    pub fn required_claims(&self) -> &[String] {
        &self.required_claims
    }

    /// Presence only: a claim holding `false`, `null` or `""` is present.
    pub fn ensure_presence_of_required_claims(
        &self,
        claims: &BTreeMap<String, Claim>,
    ) -> Result<(), ClaimsError> {
        let missing: Vec<String> = self
            .required_claims
            .iter()
            .filter(|name| !claims.contains_key(name.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClaimsError::MissingRequiredClaims { names: missing })
        }
    }

    pub fn ensure_at_least_one_verified_token(&self, verified_count: usize) -> Result<(), ClaimsError> {
        if verified_count == 0 {
            return Err(ClaimsError::UnverifiedChain);
        }
        Ok(())
    }
}
