//! Field projection over message trees.
//!
//! A projection is built from the `fields` query parameter:
//!
//! - `fields=items.metadata.name,items.spec` keeps only those paths (and the
//!   ancestors needed to reach them)
//! - `fields=-items.metadata.name` drops that path and keeps everything else
//!
//! Paths are dotted map keys. List indices never extend a path, so
//! `items.metadata.name` addresses the `metadata.name` of every element of an
//! `items` list.

use std::collections::BTreeSet;

use crate::node::Node;

/// Parsed `fields` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: BTreeSet<String>,
    exclude: bool,
}

/// What the visitor does with one map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Drop,
    KeepWhole,
    Descend,
}

impl Projection {
    /// Build a projection from explicit paths.
    pub fn new<I, S>(fields: I, exclude: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            exclude,
        }
    }

    /// Parse a `fields` query value.
    ///
    /// A leading `-` switches to exclusion. Entries are comma separated and
    /// trimmed; empty entries are skipped, so a value with no usable paths
    /// yields an empty (pass-through) projection instead of an error.
    pub fn parse(query: &str) -> Self {
        let (body, exclude) = match query.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (query, false),
        };
        let fields = body
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(ToString::to_string)
            .collect::<BTreeSet<_>>();
        if fields.is_empty() {
            return Self::default();
        }
        Self { fields, exclude }
    }

    /// Parse an optional `fields` query value; `None` means no filtering.
    pub fn from_query(query: Option<&str>) -> Self {
        query.map(Self::parse).unwrap_or_default()
    }

    /// Whether no paths were given (projection is a no-op).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the named paths are dropped rather than kept.
    pub fn is_exclude(&self) -> bool {
        self.exclude
    }

    /// The configured paths, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Prune `node` in place.
    ///
    /// A top-level list is projected element by element from the root path;
    /// a top-level scalar is left untouched.
    pub fn apply(&self, node: &mut Node) {
        if self.is_empty() {
            return;
        }
        self.visit("", node);
    }

    fn visit(&self, path: &str, node: &mut Node) {
        match node {
            Node::Map(entries) => entries.retain(|key, child| {
                let child_path = join_path(path, key);
                match self.decide(&child_path) {
                    Decision::Drop => false,
                    Decision::KeepWhole => true,
                    Decision::Descend => {
                        self.visit(&child_path, child);
                        true
                    }
                }
            }),
            Node::List(items) => {
                for item in items {
                    self.visit(path, item);
                }
            }
            Node::Scalar(_) => {}
        }
    }

    fn decide(&self, path: &str) -> Decision {
        let exact = self.fields.contains(path);
        let keep = if self.exclude {
            !exact
        } else {
            exact || self.fields.iter().any(|f| f.starts_with(path))
        };
        match (keep, exact) {
            (false, _) => Decision::Drop,
            (true, true) => Decision::KeepWhole,
            (true, false) => Decision::Descend,
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn sample() -> Node {
        Node::from(json!({
            "metadata": {"name": "test"},
            "spec": {"source": {"path": "p"}},
            "status": {"message": "Failed"}
        }))
    }

    fn project(projection: &Projection, node: Node) -> Value {
        let mut node = node;
        projection.apply(&mut node);
        Value::from(node)
    }

    #[test]
    fn include_keeps_named_paths_and_ancestors() {
        let p = Projection::new(["metadata.name", "spec.source"], false);
        assert_eq!(
            project(&p, sample()),
            json!({"metadata": {"name": "test"}, "spec": {"source": {"path": "p"}}})
        );
    }

    #[test]
    fn exclude_drops_only_named_paths() {
        let p = Projection::new(["metadata.name"], true);
        assert_eq!(
            project(&p, sample()),
            json!({
                "metadata": {},
                "spec": {"source": {"path": "p"}},
                "status": {"message": "Failed"}
            })
        );
    }

    #[test]
    fn list_elements_share_parent_path() {
        let node = Node::from(json!({
            "items": [
                {"metadata": {"name": "a", "uid": "1"}, "spec": {}},
                {"metadata": {"name": "b", "uid": "2"}, "spec": {}}
            ]
        }));
        let p = Projection::parse("items.metadata.name");
        assert_eq!(
            project(&p, node),
            json!({"items": [{"metadata": {"name": "a"}}, {"metadata": {"name": "b"}}]})
        );
    }

    #[test]
    fn top_level_list_projects_each_element() {
        let node = Node::from(json!([{"a": 1, "b": 2}, {"a": 3, "c": 4}]));
        let p = Projection::parse("a");
        assert_eq!(project(&p, node), json!([{"a": 1}, {"a": 3}]));
    }

    #[test]
    fn top_level_scalar_untouched() {
        let p = Projection::parse("a");
        assert_eq!(project(&p, Node::from(json!("x"))), json!("x"));
    }

    #[test]
    fn exact_match_keeps_subtree_whole() {
        let node = Node::from(json!({"spec": {"source": {"path": "p", "repo": "r"}}}));
        let p = Projection::parse("spec.source");
        assert_eq!(
            project(&p, node),
            json!({"spec": {"source": {"path": "p", "repo": "r"}}})
        );
    }

    #[test]
    fn prefix_is_plain_string_prefix() {
        // "meta" is a string prefix of "metadata.name" and so survives.
        let node = Node::from(json!({"meta": {"x": 1}, "metadata": {"name": "n"}, "other": 1}));
        let p = Projection::parse("metadata.name");
        assert_eq!(
            project(&p, node),
            json!({"meta": {}, "metadata": {"name": "n"}})
        );
    }

    #[test]
    fn parse_include() {
        let p = Projection::parse("a.b,c");
        assert!(!p.is_exclude());
        assert_eq!(p.fields().collect::<Vec<_>>(), vec!["a.b", "c"]);
    }

    #[test]
    fn parse_exclude() {
        let p = Projection::parse("-a.b,c");
        assert!(p.is_exclude());
        assert_eq!(p.fields().collect::<Vec<_>>(), vec!["a.b", "c"]);
    }

    #[test]
    fn parse_trims_and_skips_empty_entries() {
        let p = Projection::parse(" a , ,b,");
        assert_eq!(p.fields().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn malformed_values_degrade_to_no_filtering() {
        for raw in ["", "-", ",", "-,,", " "] {
            let p = Projection::parse(raw);
            assert!(p.is_empty(), "{raw:?} should not filter");
            assert_eq!(project(&p, sample()), Value::from(sample()));
        }
    }

    #[test]
    fn from_query_none_is_empty() {
        assert!(Projection::from_query(None).is_empty());
        assert!(!Projection::from_query(Some("a")).is_empty());
    }

    #[test]
    fn missing_path_in_include_mode_drops_everything_else() {
        let p = Projection::parse("nope");
        assert_eq!(project(&p, sample()), json!({}));
    }

    // ── Properties ──────────────────────────────────────────────────────────

    static KEYS: [&str; 3] = ["a", "b", "c"];

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,4}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
                prop::collection::btree_map(prop::sample::select(&KEYS[..]), inner, 0..3)
                    .prop_map(|m| {
                        Value::Object(m.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
                    }),
            ]
        })
    }

    fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(&KEYS[..]), 1..4).prop_map(|keys| keys.join("."))
    }

    fn arb_projection() -> impl Strategy<Value = Projection> {
        (prop::collection::vec(arb_path(), 1..4), any::<bool>())
            .prop_map(|(fields, exclude)| Projection::new(fields, exclude))
    }

    proptest! {
        #[test]
        fn projection_is_idempotent(value in arb_value(), p in arb_projection()) {
            let once = project(&p, Node::from(value));
            let twice = project(&p, Node::from(once.clone()));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn include_keeps_every_existing_path(value in arb_value(), p in arb_projection()) {
            let p = Projection::new(p.fields().map(ToString::to_string).collect::<Vec<_>>(), false);
            let input = Node::from(value);
            let output = Node::from(project(&p, input.clone()));
            for field in p.fields() {
                if let Some(original) = input.get_path(field) {
                    prop_assert_eq!(output.get_path(field), Some(original));
                }
            }
            if let Node::Map(entries) = &output {
                for key in entries.keys() {
                    prop_assert!(p.fields().any(|f| f.starts_with(key.as_str())));
                }
            }
        }

        #[test]
        fn exclude_removes_named_top_level_keys(value in arb_value(), key in prop::sample::select(&KEYS[..])) {
            let p = Projection::new([key], true);
            let input = Node::from(value);
            let output = Node::from(project(&p, input.clone()));
            if let (Node::Map(before), Node::Map(after)) = (&input, &output) {
                prop_assert!(!after.contains_key(key));
                for (k, v) in before {
                    if k != key {
                        prop_assert_eq!(after.get(k), Some(v));
                    }
                }
            }
        }
    }
}
