//! Walks a chain of nested tokens.
//!
//! Each layer is decoded, verified, flattened and merged into one accumulator.
//! A layer whose payload carries a `jwt` claim hands that token to the next
//! iteration. The walk is a loop, not recursion, and is bounded by
//! `max_depth`.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tracing::debug;

use super::error::DecodeError;
use super::inner_claims::{InnerClaimsWrapper, NormalizedClaim};
use super::token_processor::{DecodedToken, TokenProcessor};
use super::token_verifier::TokenVerifier;
use super::types::{Claim, ClaimValue, Namespaces, WRAPPED_TOKEN_KEY};

/// Raw outcome of a chain walk, before policy checks.
#[derive(Debug, Clone)]
pub struct ChainExtraction {
    pub claims: BTreeMap<String, Claim>,
    pub verified_count: usize,
    pub depth: usize,
    pub outer: DecodedToken,
}

/// Borrowing view over the collaborators; cheap to build per call.
#[derive(Debug, Clone, Copy)]
pub struct HierarchicalClaimsExtractor<'a> {
    processor: &'a TokenProcessor,
    verifier: &'a TokenVerifier,
    wrapper: &'a InnerClaimsWrapper,
    namespaces: &'a Namespaces,
    max_depth: usize,
}

impl<'a> HierarchicalClaimsExtractor<'a> {
    pub fn new(
        processor: &'a TokenProcessor,
        verifier: &'a TokenVerifier,
        wrapper: &'a InnerClaimsWrapper,
        namespaces: &'a Namespaces,
        max_depth: usize,
    ) -> Self {
        Self {
            processor,
            verifier,
            wrapper,
            namespaces,
            max_depth,
        }
    }

    pub fn extract(&self, token: &str) -> Result<ChainExtraction, DecodeError> {
        let mut claims: BTreeMap<String, Claim> = BTreeMap::new();
        let mut verified_count = 0;
        let mut outer: Option<DecodedToken> = None;
        let mut next: Option<String> = Some(token.to_string());
        let mut depth = 0;

        while let Some(current) = next.take() {
            if depth >= self.max_depth {
                return Err(DecodeError::ChainTooDeep {
                    max: self.max_depth,
                });
            }

            let mut decoded = self
                .processor
                .decode(&current)
                .map_err(|err| at_depth(depth, err))?;

            // Verify exactly what was decoded (surrounding whitespace stripped).
            let outcome = self.verifier.verify(decoded.raw());
            let verified = outcome.is_verified();
            if verified {
                verified_count += 1;
            }
            debug!(
                depth,
                verified,
                token = %decoded.fingerprint(),
                "extracting claims from token layer"
            );

            let issuer = decoded.issuer().map(str::to_string);
            let flat = self.wrapper.flatten(&decoded.payload, self.namespaces);

            next = wrapped_token(&flat, depth)?;
            if let Some(inner) = &next {
                decoded.set_wrapped(inner);
            }

            for entry in flat {
                if entry.name == WRAPPED_TOKEN_KEY {
                    continue;
                }
                let claim = Claim {
                    namespace: self
                        .namespaces
                        .get(entry.priority)
                        .unwrap_or_default()
                        .to_string(),
                    name: entry.name,
                    value: entry.value,
                    issuer: issuer.clone(),
                    verified,
                    depth,
                    inner: None,
                    priority: entry.priority,
                };
                merge(&mut claims, claim);
            }

            if outer.is_none() {
                outer = Some(decoded);
            }
            depth += 1;
        }

        // The loop runs at least once, so `outer` is set unless max_depth is 0,
        // which already returned ChainTooDeep.
        let outer = outer.ok_or(DecodeError::ChainTooDeep {
            max: self.max_depth,
        })?;

        Ok(ChainExtraction {
            claims,
            verified_count,
            depth,
            outer,
        })
    }
}

fn at_depth(depth: usize, err: DecodeError) -> DecodeError {
    if depth == 0 {
        err
    } else {
        DecodeError::Layer {
            depth,
            source: Box::new(err),
        }
    }
}

/// The nested token of a layer, if any. `flat` is priority-sorted, so the
/// first `jwt` entry is the highest-priority one.
fn wrapped_token(flat: &[NormalizedClaim], depth: usize) -> Result<Option<String>, DecodeError> {
    let Some(entry) = flat.iter().find(|c| c.name == WRAPPED_TOKEN_KEY) else {
        return Ok(None);
    };
    match &entry.value {
        ClaimValue::Null => Ok(None),
        ClaimValue::String(s) if s.trim().is_empty() => Ok(None),
        ClaimValue::String(s) => Ok(Some(s.clone())),
        _ => Err(DecodeError::WrappedTokenNotString { depth }),
    }
}

fn merge(claims: &mut BTreeMap<String, Claim>, claim: Claim) {
    match claims.entry(claim.name.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(claim);
        }
        Entry::Occupied(mut slot) => slot.get_mut().absorb(claim),
    }
}
