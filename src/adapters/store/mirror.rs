//! Local copy of one subscribed subtree, rebuilt from streaming `put`/`patch`
//! events and turned into ordered snapshots.
//!
//! Snapshot order follows the hosted store's default child order: keys that
//! parse as 32-bit integers first, numerically, then all other keys
//! lexicographically.

use crate::domain::Snapshot;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Integer value of `key` if it is a canonical 32-bit integer ("7", "-3"; not "07").
fn integer_key(key: &str) -> Option<i32> {
    key.parse::<i32>()
        .ok()
        .filter(|n| n.to_string() == key)
}

/// Default child ordering of the realtime store.
pub fn key_order(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// `(key, value)` pairs in store order.
pub fn ordered_children<'a>(
    children: impl IntoIterator<Item = (&'a String, &'a Value)>,
) -> Vec<(String, Value)> {
    let mut ordered: Vec<(String, Value)> = children
        .into_iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    ordered.sort_by(|(a, _), (b, _)| key_order(a, b));
    ordered
}

/// Children of a subscribed path.
#[derive(Debug, Default)]
pub struct SubtreeMirror {
    path: String,
    children: BTreeMap<String, Value>,
}

impl SubtreeMirror {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            children: BTreeMap::new(),
        }
    }

    /// Set the value at `relative` ("/" is the subtree root). `null` deletes.
    pub fn put(&mut self, relative: &str, data: Value) {
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        match segments.split_first() {
            None => self.replace_all(data),
            Some((key, rest)) => self.put_child(key, rest, data),
        }
    }

    /// Merge each entry of `data` under `relative`, as Firebase `patch` does.
    pub fn patch(&mut self, relative: &str, data: Value) {
        let Value::Object(entries) = data else {
            return;
        };
        let base = relative.trim_end_matches('/');
        for (key, value) in entries {
            self.put(&format!("{base}/{key}"), value);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.path.clone(), ordered_children(&self.children))
    }

    fn replace_all(&mut self, data: Value) {
        self.children.clear();
        if let Value::Object(entries) = data {
            self.children
                .extend(entries.into_iter().filter(|(_, v)| !v.is_null()));
        }
    }

    fn put_child(&mut self, key: &str, rest: &[&str], data: Value) {
        if rest.is_empty() {
            if data.is_null() {
                self.children.remove(key);
            } else {
                self.children.insert(key.to_string(), data);
            }
            return;
        }
        let child = self
            .children
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        set_nested(child, rest, data);
        if is_empty_node(child) {
            self.children.remove(key);
        }
    }
}

fn set_nested(node: &mut Value, segments: &[&str], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = data;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        if data.is_null() {
            map.remove(*head);
        } else {
            map.insert(head.to_string(), data);
        }
        return;
    }
    let child = map
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    set_nested(child, rest, data);
    if is_empty_node(child) {
        map.remove(*head);
    }
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(mirror: &SubtreeMirror) -> Vec<String> {
        mirror.snapshot().children.into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_root_put_replaces_everything() {
        let mut mirror = SubtreeMirror::new("expenses");
        mirror.put("/", json!({"b": {"amount": 2}, "a": {"amount": 1}}));
        assert_eq!(keys(&mirror), vec!["a", "b"]);

        mirror.put("/", Value::Null);
        assert!(mirror.snapshot().is_empty());
    }

    #[test]
    fn test_child_put_and_delete() {
        let mut mirror = SubtreeMirror::new("travelers");
        mirror.put("/", Value::Null);
        mirror.put("/k1", json!({"name": "Alice"}));
        mirror.put("/k2", json!({"name": "Bob"}));
        assert_eq!(keys(&mirror), vec!["k1", "k2"]);

        mirror.put("/k1", Value::Null);
        assert_eq!(keys(&mirror), vec!["k2"]);
        assert_eq!(mirror.snapshot().path, "travelers");
    }

    #[test]
    fn test_nested_put_updates_field() {
        let mut mirror = SubtreeMirror::new("expenses");
        mirror.put("/k1", json!({"category": "Food", "amount": 3}));
        mirror.put("/k1/amount", json!(30));
        assert_eq!(
            mirror.snapshot().children,
            vec![("k1".to_string(), json!({"category": "Food", "amount": 30}))]
        );

        mirror.put("/k1/amount", Value::Null);
        mirror.put("/k1/category", Value::Null);
        assert!(mirror.snapshot().is_empty());
    }

    #[test]
    fn test_integer_keys_sort_numerically_first() {
        let mut mirror = SubtreeMirror::new("expenses");
        mirror.put(
            "/",
            json!({"b": 1, "10": 1, "-NaXy": 1, "9": 1, "-2": 1, "09": 1, "a": 1}),
        );
        assert_eq!(keys(&mirror), vec!["-2", "9", "10", "-NaXy", "09", "a", "b"]);
    }

    #[test]
    fn test_key_order() {
        assert_eq!(key_order("9", "10"), Ordering::Less);
        assert_eq!(key_order("10", "-Nabc"), Ordering::Less);
        assert_eq!(key_order("-Nabc", "-Nabd"), Ordering::Less);
        assert_eq!(key_order("2147483648", "9"), Ordering::Greater);
    }

    #[test]
    fn test_patch_merges_children() {
        let mut mirror = SubtreeMirror::new("expenses");
        mirror.put("/", json!({"a": {"amount": 1}}));
        mirror.patch("/", json!({"b": {"amount": 2}, "a": null}));
        assert_eq!(keys(&mirror), vec!["b"]);
    }
}
