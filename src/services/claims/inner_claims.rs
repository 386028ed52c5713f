/*
 * Responsibility
 * - 1 レイヤ分の payload を、namespace 解決済みのフラットな claim 列にする
 * - 各 claim の merge 優先度 (解決された namespace の index) を決める
 *
 * payload のキーの解決 (最初に一致したものを採用):
 *  1. 空でない namespace がキーの真の prefix → prefix を外す
 *  2. キーが空でない namespace と一致し、値が object → 各メンバーを claim とする
 *  3. それ以外はキーそのまま、デフォルト (空) namespace 扱い
 */
use std::collections::BTreeMap;

use super::types::{ClaimValue, Namespaces};

/// A claim from a single layer, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedClaim {
    pub name: String,
    pub value: ClaimValue,
    pub priority: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InnerClaimsWrapper;

impl InnerClaimsWrapper {
    pub fn new() -> Self {
        Self
    }

    /// Flatten `payload` against `namespaces`.
    ///
    /// Entries come out sorted by priority, then by name, so the first entry
    /// for a logical name is the one this layer would contribute.
    pub fn flatten(
        &self,
        payload: &BTreeMap<String, ClaimValue>,
        namespaces: &Namespaces,
    ) -> Vec<NormalizedClaim> {
        let mut out = Vec::with_capacity(payload.len());

        for (key, value) in payload {
            match resolve_prefixed(key, namespaces) {
                Some((name, priority)) => out.push(NormalizedClaim {
                    name: name.to_string(),
                    value: value.clone(),
                    priority,
                }),
                None => match (namespace_priority(key, namespaces), value) {
                    (Some(priority), ClaimValue::Object(members)) => {
                        out.extend(members.iter().map(|(name, value)| NormalizedClaim {
                            name: name.clone(),
                            value: value.clone(),
                            priority,
                        }))
                    }
                    _ => out.push(NormalizedClaim {
                        name: key.clone(),
                        value: value.clone(),
                        priority: namespaces.default_priority(),
                    }),
                },
            }
        }

        // stable: equal (priority, name) keeps payload order
        out.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        out
    }
}

fn resolve_prefixed<'a>(key: &'a str, namespaces: &Namespaces) -> Option<(&'a str, usize)> {
    namespaces
        .iter()
        .enumerate()
        .filter(|(_, ns)| !ns.is_empty())
        .find_map(|(priority, ns)| match key.strip_prefix(ns) {
            Some(rest) if !rest.is_empty() => Some((rest, priority)),
            _ => None,
        })
}

fn namespace_priority(key: &str, namespaces: &Namespaces) -> Option<usize> {
    namespaces
        .iter()
        .position(|ns| !ns.is_empty() && ns == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> BTreeMap<String, ClaimValue> {
        match ClaimValue::from(value) {
            ClaimValue::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn entries(claims: &[NormalizedClaim]) -> Vec<(&str, usize)> {
        claims.iter().map(|c| (c.name.as_str(), c.priority)).collect()
    }

    #[test]
    fn unprefixed_keys_land_in_default_namespace() {
        let ns = Namespaces::default();
        let flat = InnerClaimsWrapper::new().flatten(&payload(serde_json::json!({"a": 1, "b": 2})), &ns);
        assert_eq!(entries(&flat), vec![("a", 0), ("b", 0)]);
    }

    #[test]
    fn prefixed_keys_take_namespace_priority() {
        let ns = Namespaces::new(["https://acme/", "urn:x:"]);
        let flat = InnerClaimsWrapper::new().flatten(
            &payload(serde_json::json!({
                "https://acme/role": "admin",
                "urn:x:role": "user",
                "role": "guest",
            })),
            &ns,
        );

        assert_eq!(entries(&flat), vec![("role", 0), ("role", 1), ("role", 2)]);
        assert_eq!(flat[0].value, ClaimValue::from("admin"));
    }

    #[test]
    fn first_matching_namespace_wins_for_overlapping_prefixes() {
        let ns = Namespaces::new(["https://acme/app/", "https://acme/"]);
        let flat = InnerClaimsWrapper::new().flatten(
            &payload(serde_json::json!({"https://acme/app/tenant": "t1"})),
            &ns,
        );
        assert_eq!(entries(&flat), vec![("tenant", 0)]);
    }

    #[test]
    fn namespace_objects_are_flattened() {
        let ns = Namespaces::new(["https://acme/"]);
        let flat = InnerClaimsWrapper::new().flatten(
            &payload(serde_json::json!({
                "https://acme/": {"role": "admin", "tenant": "t1"},
                "sub": "u1",
            })),
            &ns,
        );
        assert_eq!(
            entries(&flat),
            vec![("role", 0), ("tenant", 0), ("sub", 1)]
        );
    }

    #[test]
    fn bare_namespace_key_with_scalar_is_a_plain_claim() {
        let ns = Namespaces::new(["acme"]);
        let flat =
            InnerClaimsWrapper::new().flatten(&payload(serde_json::json!({"acme": "x"})), &ns);
        assert_eq!(entries(&flat), vec![("acme", 1)]);
    }
}
