//! Generic message tree.
//!
//! Messages are arbitrary `Serialize` types. Projection needs to walk them
//! structurally, so they are first lowered into a [`Node`]: a tagged tree of
//! scalars, lists, and string-keyed maps. Map keys are kept sorted, which is
//! also the order they serialize in.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Number, Value};

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or float, kept in `serde_json`'s lossless representation.
    Number(Number),
    /// String.
    String(String),
}

/// A node in a message tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Leaf value.
    Scalar(Scalar),
    /// Ordered list of child nodes.
    List(Vec<Node>),
    /// String-keyed children, sorted by key.
    Map(BTreeMap<String, Node>),
}

impl Node {
    /// Lower any serializable value into a tree.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    /// Serialize the tree to JSON bytes.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Child node at `key`, if this is a map containing it.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Follow a dotted path through nested maps.
    ///
    /// Lists are not traversed; the path addresses map keys only.
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        path.split('.').try_fold(self, |node, key| node.get(key))
    }

    /// Whether this node is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Scalar(Scalar::Null) => Value::Null,
            Node::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Node::Scalar(Scalar::Number(n)) => Value::Number(n),
            Node::Scalar(Scalar::String(s)) => Value::String(s),
            Node::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Node::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn lowers_nested_value() {
        let node = Node::from(json!({"a": [1, "x", null], "b": {"c": true}}));
        let Node::Map(entries) = &node else {
            panic!("expected map");
        };
        assert_eq!(entries.len(), 2);
        assert_matches!(entries.get("a"), Some(Node::List(items)) if items.len() == 3);
        assert_matches!(
            node.get_path("b.c"),
            Some(Node::Scalar(Scalar::Bool(true)))
        );
    }

    #[test]
    fn serializes_like_value() {
        let value = json!({"z": 1.5, "a": [{"k": "v"}], "m": null});
        let node = Node::from(value.clone());
        let bytes = node.to_json_vec().unwrap();
        assert_eq!(bytes, serde_json::to_vec(&value).unwrap());
    }

    #[test]
    fn map_keys_serialize_sorted() {
        let mut entries = BTreeMap::new();
        let _ = entries.insert("b".to_string(), Node::Scalar(Scalar::Null));
        let _ = entries.insert("a".to_string(), Node::Scalar(Scalar::Null));
        let json = serde_json::to_string(&Node::Map(entries)).unwrap();
        assert_eq!(json, r#"{"a":null,"b":null}"#);
    }

    #[test]
    fn from_serialize_struct() {
        #[derive(serde::Serialize)]
        struct Item {
            name: &'static str,
            count: u32,
        }
        let node = Node::from_serialize(&Item {
            name: "x",
            count: 3,
        })
        .unwrap();
        assert!(node.is_map());
        assert_eq!(
            node.get("count"),
            Some(&Node::Scalar(Scalar::Number(3.into())))
        );
    }

    #[test]
    fn from_serialize_rejects_non_string_keys() {
        let mut map = std::collections::HashMap::new();
        let _ = map.insert(vec![1u8], 1);
        assert!(Node::from_serialize(&map).is_err());
    }

    #[test]
    fn get_path_missing() {
        let node = Node::from(json!({"a": {"b": 1}}));
        assert!(node.get_path("a.c").is_none());
        assert!(node.get_path("a.b.c").is_none());
    }

    #[test]
    fn roundtrip_through_value() {
        let value = json!([{"a": [1, 2]}, "s", false]);
        let back = Value::from(Node::from(value.clone()));
        assert_eq!(back, value);
    }
}
