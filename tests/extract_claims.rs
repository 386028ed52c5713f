mod common;

use serde_json::json;

use hierarchical_jwt::{
    ClaimValue, ClaimsError, DecodeError, ExtractError, JwtSecurityConfig,
    ValidatingHierarchicalClaimsExtractor,
};

use hierarchical_jwt::services::claims::token_processor::fingerprint;

use common::{OTHER_SECRET, sign, sign_with, verifier};

fn extractor(config: JwtSecurityConfig) -> ValidatingHierarchicalClaimsExtractor {
    ValidatingHierarchicalClaimsExtractor::new(config)
}

#[test]
fn plain_token_extracts_all_claims_without_verifier() {
    let token = sign(json!({"a": 1, "b": 2}));
    let claims = extractor(JwtSecurityConfig::default().with_required_claims(["a", "b"]))
        .extract_claims(&token)
        .unwrap();

    assert_eq!(claims.value("a"), Some(&ClaimValue::from(1i64)));
    assert_eq!(claims.value("b"), Some(&ClaimValue::from(2i64)));
    assert_eq!(claims.claims().len(), 2);
    assert_eq!(claims.verified_count(), 0);
    assert_eq!(claims.depth(), 1);
    assert_eq!(claims.token().raw(), token);
}

#[test]
fn outer_layer_wins_at_equal_namespace_priority() {
    let inner = sign(json!({"role": "user", "sub": "u1"}));
    let outer = sign(json!({"jwt": inner, "role": "service"}));

    let claims = extractor(JwtSecurityConfig::default().with_required_claims(["sub"]))
        .extract_claims(&outer)
        .unwrap();

    assert_eq!(claims.depth(), 2);
    assert_eq!(claims.value("role"), Some(&ClaimValue::from("service")));
    assert_eq!(claims.value("sub"), Some(&ClaimValue::from("u1")));

    let role = claims.get("role").unwrap();
    let chain: Vec<_> = role.chain().map(|c| (c.depth, c.value.clone())).collect();
    assert_eq!(
        chain,
        vec![
            (0, ClaimValue::from("service")),
            (1, ClaimValue::from("user"))
        ]
    );
    assert!(claims.get("jwt").is_none());
}

#[test]
fn highest_priority_namespace_wins_regardless_of_depth() {
    let ns = "https://acme.example/";
    let leaf = sign(json!({format!("{ns}tenant"): "t-leaf", "tenant": "leaf-default"}));
    let middle = sign(json!({"jwt": leaf, "tenant": "middle-default"}));
    let outer = sign(json!({"jwt": middle, "tenant": "outer-default"}));

    let claims = extractor(JwtSecurityConfig::default().with_namespaces([ns]))
        .extract_claims(&outer)
        .unwrap();

    let tenant = claims.get("tenant").unwrap();
    assert_eq!(tenant.value, ClaimValue::from("t-leaf"));
    assert_eq!(tenant.namespace, ns);
    assert_eq!(tenant.depth, 2);

    let depths: Vec<_> = tenant.chain().map(|c| c.depth).collect();
    assert_eq!(depths, vec![2, 0, 1, 2]);
}

#[test]
fn verified_layers_are_counted() {
    let inner = sign(json!({"sub": "u1"}));
    let outer = sign(json!({"jwt": inner}));

    let claims = extractor(JwtSecurityConfig::default().with_verifier(verifier()))
        .extract_claims(&outer)
        .unwrap();

    assert_eq!(claims.verified_count(), 2);
    assert!(claims.get("sub").unwrap().verified);
}

#[test]
fn nested_token_with_surrounding_whitespace_is_still_verified() {
    let inner = sign(json!({"sub": "u1"}));
    let outer = sign(json!({"jwt": format!(" {inner}\n")}));

    let claims = extractor(JwtSecurityConfig::default().with_verifier(verifier()))
        .extract_claims(&outer)
        .unwrap();

    assert_eq!(claims.verified_count(), 2);
    assert!(claims.get("sub").unwrap().verified);
}

#[test]
fn one_verified_layer_is_enough() {
    let inner = sign_with(json!({"sub": "u1"}), OTHER_SECRET);
    let outer = sign(json!({"jwt": inner, "iss": "gateway"}));

    let claims = extractor(JwtSecurityConfig::default().with_verifier(verifier()))
        .extract_claims(&outer)
        .unwrap();

    assert_eq!(claims.verified_count(), 1);
    assert!(!claims.get("sub").unwrap().verified);
    assert_eq!(claims.get("iss").unwrap().issuer.as_deref(), Some("gateway"));
}

#[test]
fn all_layers_rejected_is_an_unverified_chain() {
    let inner = sign_with(json!({"sub": "u1"}), OTHER_SECRET);
    let outer = sign_with(json!({"jwt": inner}), OTHER_SECRET);

    let err = extractor(JwtSecurityConfig::default().with_verifier(verifier()))
        .extract_claims(&outer)
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractError::Claims(ClaimsError::UnverifiedChain)
    ));
}

#[test]
fn unverified_chain_is_reported_before_missing_claims() {
    let token = sign_with(json!({"other": "x"}), OTHER_SECRET);

    let err = extractor(
        JwtSecurityConfig::default()
            .with_verifier(verifier())
            .with_required_claims(["missing"]),
    )
    .extract_claims(&token)
    .unwrap_err();

    assert!(matches!(
        err,
        ExtractError::Claims(ClaimsError::UnverifiedChain)
    ));
}

#[test]
fn without_verifier_signature_validity_is_irrelevant() {
    let token = sign_with(json!({"sub": "u1"}), OTHER_SECRET);
    let claims = extractor(JwtSecurityConfig::default())
        .extract_claims(&token)
        .unwrap();
    assert_eq!(claims.verified_count(), 0);
}

#[test]
fn missing_required_claim_is_named() {
    let token = sign(json!({"other": "x"}));
    let err = extractor(JwtSecurityConfig::default().with_required_claims(["missing"]))
        .extract_claims(&token)
        .unwrap_err();

    match err {
        ExtractError::Claims(ClaimsError::MissingRequiredClaims { names }) => {
            assert_eq!(names, vec!["missing"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn required_claim_may_come_from_any_layer() {
    let inner = sign(json!({"sub": "u1"}));
    let outer = sign(json!({"jwt": inner, "scope": "read"}));

    let claims = extractor(JwtSecurityConfig::default().with_required_claims(["sub", "scope"]))
        .extract_claims(&outer)
        .unwrap();

    assert_eq!(claims.get("sub").unwrap().depth, 1);
    assert_eq!(claims.get("scope").unwrap().depth, 0);
}

#[test]
fn malformed_outer_token_is_a_decode_error() {
    let err = extractor(JwtSecurityConfig::default())
        .extract_claims("definitely-not-a-jwt")
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Decode(DecodeError::SegmentCount { found: 1 })
    ));
}

#[test]
fn malformed_nested_token_is_not_skipped() {
    let outer = sign(json!({"jwt": "garbage.token", "sub": "u1"}));
    let err = extractor(JwtSecurityConfig::default())
        .extract_claims(&outer)
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Decode(DecodeError::Layer { depth: 1, .. })
    ));
}

#[test]
fn chain_depth_is_bounded() {
    let mut token = sign(json!({"sub": "leaf"}));
    for _ in 0..4 {
        token = sign(json!({ "jwt": token }));
    }

    let err = extractor(JwtSecurityConfig::default().with_max_chain_depth(3))
        .extract_claims(&token)
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Decode(DecodeError::ChainTooDeep { max: 3 })
    ));
}

#[test]
fn extraction_is_repeatable() {
    let inner = sign(json!({"sub": "u1", "role": "user"}));
    let outer = sign(json!({"jwt": inner, "role": "service"}));
    let extractor = extractor(JwtSecurityConfig::default().with_verifier(verifier()));

    let first = extractor.extract_claims(&outer).unwrap();
    let second = extractor.extract_claims(&outer).unwrap();
    assert_eq!(first, second);
}

#[test]
fn extractor_can_be_shared_between_threads() {
    let extractor = std::sync::Arc::new(extractor(
        JwtSecurityConfig::default()
            .with_verifier(verifier())
            .with_required_claims(["sub"]),
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let extractor = extractor.clone();
            std::thread::spawn(move || {
                let token = sign(json!({"sub": format!("u{i}")}));
                extractor.extract_claims(&token).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let claims = handle.join().unwrap();
        assert_eq!(claims.value("sub"), Some(&ClaimValue::from(format!("u{i}"))));
    }
}

#[test]
fn claims_serialize_without_raw_tokens() {
    let inner = sign(json!({"sub": "u1"}));
    let outer = sign(json!({"jwt": inner, "act": "svc"}));
    let claims = extractor(JwtSecurityConfig::default())
        .extract_claims(&outer)
        .unwrap();

    let json = serde_json::to_value(&claims).unwrap();
    assert_eq!(json["claims"]["sub"]["value"], "u1");
    assert_eq!(json["verified_count"], 0);
    assert_eq!(json["token"]["payload"]["act"], "svc");
    assert_eq!(json["token"]["payload"]["jwt"], fingerprint(&inner));

    let text = json.to_string();
    assert!(!text.contains(&outer));
    assert!(!text.contains(&inner));
}
