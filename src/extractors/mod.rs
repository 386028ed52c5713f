/*!
 * 認証済み claims の extractor
 *
 * Responsibility:
 * - auth middleware が extensions に入れた `JwtClaims` を handler に渡す
 *
 * Public API:
 * - JwtClaimsExtractor
 */

mod jwt_claims;

pub use jwt_claims::JwtClaimsExtractor;
