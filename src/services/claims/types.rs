/*
 * Responsibility
 * - claim の値 / claim レコード / namespace の優先順 / 抽出結果の型
 * - チェーン走査の各ステップ (decode → verify → flatten → merge → validate) で共有する
 */
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::token_processor::DecodedToken;

/// Claim name whose value carries a complete nested token.
pub const WRAPPED_TOKEN_KEY: &str = "jwt";

/// Structured claim value.
///
/// Payloads are heterogeneous JSON, but the set of shapes is closed, so the
/// merge and presence checks can match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ClaimValue>),
    Object(BTreeMap<String, ClaimValue>),
}

impl ClaimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ClaimValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ClaimValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ClaimValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ClaimValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// Ordered namespace prefixes, always terminated by the empty namespace.
///
/// Index in the list is the merge priority: lower index wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces(Vec<String>);

impl Namespaces {
    pub fn new<I, S>(configured: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for ns in configured {
            let ns = ns.into();
            if ns.is_empty() || list.contains(&ns) {
                continue;
            }
            list.push(ns);
        }
        list.push(String::new());
        Self(list)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Priority of the unprefixed namespace (always the last one).
    pub fn default_priority(&self) -> usize {
        self.0.len() - 1
    }

    pub fn get(&self, priority: usize) -> Option<&str> {
        self.0.get(priority).map(String::as_str)
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

/// One resolved claim.
///
/// The head of a chain is the value that won the namespace-ordered merge;
/// `inner` links the next occurrence of the same logical name found elsewhere
/// in the token chain, in precedence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claim {
    pub name: String,
    pub value: ClaimValue,
    pub namespace: String,
    pub issuer: Option<String>,
    pub verified: bool,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner: Option<Box<Claim>>,
    #[serde(skip)]
    pub(crate) priority: usize,
}

impl Claim {
    /// Merge another occurrence of the same logical name into this chain.
    ///
    /// A strictly higher-priority namespace takes the head; equal priority keeps
    /// whatever was seen first (outer layers are walked first).
    pub(crate) fn absorb(&mut self, mut other: Claim) {
        debug_assert_eq!(self.name, other.name);
        if other.priority < self.priority {
            std::mem::swap(self, &mut other);
            match self.inner.take() {
                Some(mut rest) => {
                    rest.absorb(other);
                    self.inner = Some(rest);
                }
                None => self.inner = Some(Box::new(other)),
            }
            return;
        }
        match self.inner.as_mut() {
            Some(inner) => inner.absorb(other),
            None => self.inner = Some(Box::new(other)),
        }
    }

    /// Iterate this claim followed by every lower-precedence occurrence.
    pub fn chain(&self) -> impl Iterator<Item = &Claim> {
        std::iter::successors(Some(self), |c| c.inner.as_deref())
    }
}

/// Validated result of one extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JwtClaims {
    claims: BTreeMap<String, Claim>,
    verified_count: usize,
    depth: usize,
    token: DecodedToken,
}

impl JwtClaims {
    pub(crate) fn new(
        claims: BTreeMap<String, Claim>,
        verified_count: usize,
        depth: usize,
        token: DecodedToken,
    ) -> Self {
        Self {
            claims,
            verified_count,
            depth,
            token,
        }
    }

    pub fn claims(&self) -> &BTreeMap<String, Claim> {
        &self.claims
    }

    pub fn get(&self, name: &str) -> Option<&Claim> {
        self.claims.get(name)
    }

    /// Winning value for a logical claim name.
    pub fn value(&self, name: &str) -> Option<&ClaimValue> {
        self.claims.get(name).map(|c| &c.value)
    }

    pub fn verified_count(&self) -> usize {
        self.verified_count
    }

    /// Number of token layers walked (1 for an unwrapped token).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The decoded outermost token.
    pub fn token(&self) -> &DecodedToken {
        &self.token
    }
}
