use serde_json::{Map, Value};

/// Drops `null` members from a JSON object. Non-object values are returned
/// untouched.
pub fn remove_none(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Flattens a JSON object into string pairs for headers and query strings,
/// skipping `null` members.
pub fn to_string_pairs(value: &Value) -> Vec<(String, String)> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };

    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remove_none() {
        let cleaned = remove_none(json!({"name": "general", "topic": null, "nsfw": false}));
        assert_eq!(cleaned, json!({"name": "general", "nsfw": false}));

        assert_eq!(remove_none(json!([1, null])), json!([1, null]));
    }

    #[test]
    fn test_to_string_pairs() {
        let pairs = to_string_pairs(&json!({"with_counts": true, "limit": 5, "x": null, "q": "a"}));
        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&("with_counts".to_string(), "true".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "5".to_string())));
        assert!(pairs.contains(&("q".to_string(), "a".to_string())));
    }
}
