use thiserror::Error;

/// Structural failure of a token layer. Always fatal to the extraction.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token must have 3 segments, found {found}")]
    SegmentCount { found: usize },

    #[error("invalid base64url in token {segment}: {source}")]
    Base64 {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("invalid JSON in token {segment}: {source}")]
    Json {
        segment: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("token {segment} is not a JSON object")]
    NotAnObject { segment: &'static str },

    #[error("wrapped token claim at depth {depth} is not a string")]
    WrappedTokenNotString { depth: usize },

    #[error("token chain exceeds the maximum depth of {max}")]
    ChainTooDeep { max: usize },

    #[error("invalid token at depth {depth}: {source}")]
    Layer {
        depth: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

/// Policy failure raised after the full chain has been walked.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("missing required claims: {}", .names.join(", "))]
    MissingRequiredClaims { names: Vec<String> },

    #[error("no token in the chain could be verified")]
    UnverifiedChain,
}

/// Everything `extract_claims` can fail with.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Claims(#[from] ClaimsError),
}
