//! Cache key derivation.
//!
//! A key is `endpoint` alone when there are no parameters (they serialize to
//! `null`), otherwise `endpoint:<json>` with object keys sorted at every
//! level. Logically equal parameter sets therefore produce the same key no
//! matter how they were built, and distinct sets never share one.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

pub fn cache_key<P: Serialize + ?Sized>(endpoint: &str, params: &P) -> String {
    match serde_json::to_value(params) {
        Ok(Value::Null) => endpoint.to_string(),
        Ok(value) => format!("{}:{}", endpoint, canonicalize(value)),
        Err(e) => {
            // Only maps with non-string keys fail here. The error text keeps
            // them away from the bare endpoint's entry.
            warn!(endpoint = endpoint, error = %e, "Failed to serialize cache key params");
            format!("{}:!{}", endpoint, e)
        }
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventsQuery, IdQuery};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_no_params_is_bare_endpoint() {
        assert_eq!(cache_key("categories", &()), "categories");
        assert_eq!(cache_key("categories", &None::<EventsQuery>), "categories");
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"page": 1, "municipality_id": 4, "filters": {"b": 2, "a": 1}});
        let b = json!({"filters": {"a": 1, "b": 2}, "municipality_id": 4, "page": 1});
        assert_eq!(cache_key("events", &a), cache_key("events", &b));

        let mut first: HashMap<&str, i64> = HashMap::new();
        first.insert("page", 2);
        first.insert("category_id", 9);
        let mut second: HashMap<&str, i64> = HashMap::new();
        second.insert("category_id", 9);
        second.insert("page", 2);
        assert_eq!(cache_key("events", &first), cache_key("events", &second));
        assert_eq!(cache_key("events", &first), r#"events:{"category_id":9,"page":2}"#);
    }

    #[test]
    fn test_struct_and_map_agree() {
        let query = EventsQuery::by_category(9).with_page(2);
        let map = json!({"category_id": 9, "page": 2});
        assert_eq!(cache_key("events", &query), cache_key("events", &map));
    }

    #[test]
    fn test_distinct_params_do_not_collide() {
        let keys = [
            cache_key("events", &EventsQuery::default().with_page(1)),
            cache_key("events", &EventsQuery::default().with_page(11)),
            cache_key("events", &EventsQuery::by_category(1).with_page(1)),
            cache_key("events", &EventsQuery::by_municipality(1).with_page(1)),
            cache_key("events", &json!({"page": "1"})),
            cache_key("event", &IdQuery { id: 1 }),
            cache_key("events", &()),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
