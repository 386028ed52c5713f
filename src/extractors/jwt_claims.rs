use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::services::claims::JwtClaims;

/// Handler-side access to the validated claim set.
/// The auth middleware must have inserted `JwtClaims` into the request
/// extensions; if it did not (route not behind the middleware, anonymous
/// path) this rejects with 401.
pub struct JwtClaimsExtractor(pub JwtClaims);

impl<S> FromRequestParts<S> for JwtClaimsExtractor
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<JwtClaims>()
            .cloned()
            .map(JwtClaimsExtractor)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
