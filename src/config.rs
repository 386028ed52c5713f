/*
 * Responsibility
 * - 環境変数から JWT のセキュリティ設定を読む (.env は dotenvy で対応)
 * - 値の検証は起動時にまとめて行う (リクエストごとではなく)
 *
 * 鍵の読み込みはここで 1 回だけ。extractor は参照するだけ。
 */
use std::fmt;

use crate::services::claims::DEFAULT_MAX_CHAIN_DEPTH;

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
    Conflict(&'static str, &'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::Conflict(a, b) => {
                write!(f, "conflicting configuration: {} and {} are both set", a, b)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where verification keys come from. At most one source may be configured.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    JwksInline(String),
    JwksFile(String),
    Ed25519Pem(String),
    HmacSecret(String),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 鍵そのものは出さない
        match self {
            KeySource::JwksInline(_) => f.write_str("JwksInline"),
            KeySource::JwksFile(path) => f.debug_tuple("JwksFile").field(path).finish(),
            KeySource::Ed25519Pem(_) => f.write_str("Ed25519Pem"),
            KeySource::HmacSecret(_) => f.write_str("HmacSecret"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub required_claims: Vec<String>,
    pub namespaces: Vec<String>,
    pub anonymous_paths: Vec<String>,
    pub max_chain_depth: usize,

    pub key_source: Option<KeySource>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            required_claims: Vec::new(),
            namespaces: Vec::new(),
            anonymous_paths: Vec::new(),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            key_source: None,
            issuer: None,
            audience: None,
            leeway_seconds: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let list = |key: &str| {
            lookup(key)
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        };
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required_claims = list("JWT_REQUIRED_CLAIMS");
        let namespaces = list("JWT_NAMESPACES");
        let anonymous_paths = list("JWT_ANONYMOUS_PATHS");

        let max_chain_depth = match non_empty("JWT_MAX_CHAIN_DEPTH") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("JWT_MAX_CHAIN_DEPTH"))?,
            None => DEFAULT_MAX_CHAIN_DEPTH,
        };

        let leeway_seconds = match non_empty("JWT_LEEWAY_SECONDS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("JWT_LEEWAY_SECONDS"))?,
            None => 60,
        };

        let sources = [
            ("JWT_JWKS", non_empty("JWT_JWKS").map(KeySource::JwksInline)),
            (
                "JWT_JWKS_FILE",
                non_empty("JWT_JWKS_FILE").map(KeySource::JwksFile),
            ),
            (
                "JWT_PUBLIC_KEY_PEM",
                non_empty("JWT_PUBLIC_KEY_PEM").map(|pem| KeySource::Ed25519Pem(pem.replace("\\n", "\n"))),
            ),
            (
                "JWT_HMAC_SECRET",
                non_empty("JWT_HMAC_SECRET").map(KeySource::HmacSecret),
            ),
        ];

        let mut key_source: Option<(&'static str, KeySource)> = None;
        for (key, source) in sources {
            let Some(source) = source else { continue };
            if let Some((first, _)) = &key_source {
                return Err(ConfigError::Conflict(*first, key));
            }
            key_source = Some((key, source));
        }

        Ok(Self {
            required_claims,
            namespaces,
            anonymous_paths,
            max_chain_depth,
            key_source: key_source.map(|(_, source)| source),
            issuer: non_empty("JWT_ISSUER"),
            audience: non_empty("JWT_AUDIENCE"),
            leeway_seconds,
        })
    }
}
