//! JSON-safe serialization — big integers become decimal strings.
//!
//! JSON numbers are only reliably interoperable up to 2^53; wei-scale
//! quantities overflow that. [`json_safe`] rewrites any integer outside the
//! safe range to its decimal-string form, recursing through objects and
//! arrays. Already-safe values pass through untouched, so the function is
//! idempotent.

use serde::Serialize;
use serde_json::Value;

/// Largest integer magnitude exactly representable in a JSON number.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Recursively convert a JSON value into a wire-safe one.
pub fn json_safe(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                if u > MAX_SAFE_INTEGER {
                    return Value::String(u.to_string());
                }
            } else if let Some(i) = n.as_i64() {
                if i < -(MAX_SAFE_INTEGER as i64) {
                    return Value::String(i.to_string());
                }
            }
            Value::Number(n)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(json_safe).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, json_safe(v))).collect())
        }
        other => other,
    }
}

/// Serialize any value and make it wire-safe in one step.
pub fn to_wire<T: Serialize>(value: &T) -> eyre::Result<Value> {
    Ok(json_safe(serde_json::to_value(value)?))
}

/// Serde helper for u128 fields: number when safe, decimal string otherwise.
pub fn big_uint<S: serde::Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    if *value <= MAX_SAFE_INTEGER as u128 {
        serializer.serialize_u64(*value as u64)
    } else {
        serializer.serialize_str(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_numbers_untouched() {
        let v = json!({"a": 42, "b": -7, "c": 1.5});
        assert_eq!(json_safe(v.clone()), v);
    }

    #[test]
    fn test_large_integers_become_strings() {
        let v = json!({"balance": u64::MAX, "nested": {"gas": 9007199254740993u64}});
        let safe = json_safe(v);
        assert_eq!(safe["balance"], json!(u64::MAX.to_string()));
        assert_eq!(safe["nested"]["gas"], json!("9007199254740993"));
    }

    #[test]
    fn test_boundary_values() {
        let max_safe = (1u64 << 53) - 1;
        let v = json!([max_safe, max_safe + 1]);
        let safe = json_safe(v);
        assert_eq!(safe[0], json!(max_safe));
        assert_eq!(safe[1], json!((max_safe + 1).to_string()));
    }

    #[test]
    fn test_idempotent() {
        let v = json!({
            "big": u64::MAX,
            "list": [1, u64::MAX, "already"],
            "deep": {"x": {"y": 18446744073709551615u64}},
            "scalar": null
        });
        let once = json_safe(v);
        let twice = json_safe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_top_level_scalars() {
        assert_eq!(json_safe(json!("s")), json!("s"));
        assert_eq!(json_safe(json!(null)), json!(null));
        assert_eq!(json_safe(json!(u64::MAX)), json!(u64::MAX.to_string()));
    }

    #[test]
    fn test_big_uint_field_serializer() {
        let details = crate::types::AddressDetails {
            address_type: crate::types::AddressType::Wallet,
            balance: 2_500_000_000_000_000_000_000u128,
        };
        let v = serde_json::to_value(&details).unwrap();
        assert_eq!(v["addressType"], json!("Wallet"));
        assert_eq!(v["balance"], json!("2500000000000000000000"));
    }
}
