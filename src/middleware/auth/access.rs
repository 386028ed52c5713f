//! Bearer token → `JwtClaims` を extensions に入れる
//!
//! - anonymous paths (完全一致、または `prefix/**`) は素通り
//! - それ以外は `Authorization: Bearer <jwt>` が必須
//! - チェーン全体の抽出 (decode/verify/merge/validate) をここで実行する。
//!   失敗はすべて 401、理由はログにだけ出す

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::claims::ValidatingHierarchicalClaimsExtractor;
use crate::services::claims::token_processor::fingerprint;

#[derive(Clone, Debug)]
pub struct AuthLayer {
    extractor: Arc<ValidatingHierarchicalClaimsExtractor>,
    anonymous_paths: Arc<[String]>,
}

impl AuthLayer {
    pub fn new(
        extractor: Arc<ValidatingHierarchicalClaimsExtractor>,
        anonymous_paths: Vec<String>,
    ) -> Self {
        Self {
            extractor,
            anonymous_paths: anonymous_paths.into(),
        }
    }

    pub fn is_anonymous(&self, path: &str) -> bool {
        self.anonymous_paths.iter().any(|pattern| match pattern.strip_suffix("/**") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => path == pattern.as_str(),
        })
    }
}

/// `router` の全ルートに JWT 認証を掛ける。
///
/// 例：
/// ```ignore
/// let auth = AuthLayer::new(Arc::new(extractor), config.anonymous_paths.clone());
/// let app = middleware::auth::apply(api_router, auth);
/// ```
pub fn apply<S>(router: Router<S>, auth: AuthLayer) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(auth, access_middleware))
}

async fn access_middleware(
    State(auth): State<AuthLayer>,
    OriginalUri(original_uri): OriginalUri,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if auth.is_anonymous(original_uri.path()) {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let claims = auth.extractor.extract_claims(token).inspect_err(|err| {
        tracing::warn!(
            error = %err,
            token = %fingerprint(token),
            "jwt claims extraction failed"
        );
    })?;

    if !auth.extractor.has_verifier() {
        tracing::debug!(
            depth = claims.depth(),
            "no JWT verifier configured, claims trusted structurally"
        );
    }

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::claims::JwtSecurityConfig;

    fn layer(paths: &[&str]) -> AuthLayer {
        AuthLayer::new(
            Arc::new(ValidatingHierarchicalClaimsExtractor::new(
                JwtSecurityConfig::default(),
            )),
            paths.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn exact_anonymous_path_matches_only_itself() {
        let auth = layer(&["/health"]);
        assert!(auth.is_anonymous("/health"));
        assert!(!auth.is_anonymous("/health/deep"));
        assert!(!auth.is_anonymous("/healthz"));
    }

    #[test]
    fn wildcard_anonymous_path_matches_subtree() {
        let auth = layer(&["/public/**"]);
        assert!(auth.is_anonymous("/public"));
        assert!(auth.is_anonymous("/public/a/b"));
        assert!(!auth.is_anonymous("/publicity"));
        assert!(!auth.is_anonymous("/api"));
    }
}
