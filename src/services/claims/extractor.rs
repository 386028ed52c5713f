/*
 * Responsibility
 * - 公開エントリポイント: config から各部品を組み立て、呼び出しごとに検証付き抽出を 1 回行う
 * - 構築後は不変。Arc で包んでリクエスト間で共有してよい
 */
use std::sync::Arc;

use tracing::info;

use super::error::ExtractError;
use super::hierarchical::HierarchicalClaimsExtractor;
use super::inner_claims::InnerClaimsWrapper;
use super::token_processor::TokenProcessor;
use super::token_verifier::{JwtVerifier, TokenVerifier};
use super::types::{JwtClaims, Namespaces};
use super::validator::ClaimsValidator;

pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 8;

/// What an extractor is built from.
#[derive(Debug, Clone)]
pub struct JwtSecurityConfig {
    pub required_claims: Vec<String>,
    pub namespaces: Vec<String>,
    pub max_chain_depth: usize,
    pub verifier: Option<Arc<dyn JwtVerifier>>,
}

impl Default for JwtSecurityConfig {
    fn default() -> Self {
        Self {
            required_claims: Vec::new(),
            namespaces: Vec::new(),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            verifier: None,
        }
    }
}

impl JwtSecurityConfig {
    pub fn with_required_claims<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_claims = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_chain_depth(mut self, max: usize) -> Self {
        self.max_chain_depth = max;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn JwtVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValidatingHierarchicalClaimsExtractor {
    processor: TokenProcessor,
    verifier: TokenVerifier,
    wrapper: InnerClaimsWrapper,
    validator: ClaimsValidator,
    namespaces: Namespaces,
    max_depth: usize,
}

impl ValidatingHierarchicalClaimsExtractor {
    pub fn new(config: JwtSecurityConfig) -> Self {
        let verifier = TokenVerifier::new(config.verifier);
        if let TokenVerifier::Enabled(v) = &verifier {
            info!(verifier = ?v, "using JWT verifier");
        }

        Self {
            processor: TokenProcessor::new(),
            verifier,
            wrapper: InnerClaimsWrapper::new(),
            validator: ClaimsValidator::new(config.required_claims),
            namespaces: Namespaces::new(config.namespaces),
            max_depth: config.max_chain_depth,
        }
    }

    /// Decode, verify and merge the whole token chain, then apply policy.
    ///
    /// Policy runs only after the chain has been walked: with a verifier the
    /// verified-count check first, then required-claim presence.
    pub fn extract_claims(&self, token: &str) -> Result<JwtClaims, ExtractError> {
        let chain = HierarchicalClaimsExtractor::new(
            &self.processor,
            &self.verifier,
            &self.wrapper,
            &self.namespaces,
            self.max_depth,
        )
        .extract(token)?;

        if self.has_verifier() {
            self.validator
                .ensure_at_least_one_verified_token(chain.verified_count)?;
        }
        self.validator
            .ensure_presence_of_required_claims(&chain.claims)?;

        Ok(JwtClaims::new(
            chain.claims,
            chain.verified_count,
            chain.depth,
            chain.outer,
        ))
    }

    pub fn has_verifier(&self) -> bool {
        self.verifier.is_enabled()
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn required_claims(&self) -> &[String] {
        self.validator.required_claims()
    }
}
