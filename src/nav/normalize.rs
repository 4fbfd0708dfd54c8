// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tree normalization.
//!
//! Flatten raw navigation documents into the canonical two-level shape of
//! categories holding websites.
//!
//! # Legacy Documents
//!
//! Older documents nest sub-categories inside categories up to four levels
//! deep. There is no explicit type marker on a node, so the distinction is
//! structural: a node with a `url` key is a website, a node without a `url`
//! key but with a `nav` array is a sub-category, and anything else is treated
//! as a website as well. Every website found beneath a top-level category is
//! collected into that category in depth-first, left-to-right order.
//! Sub-category nodes are dropped once their websites have been harvested.
//!
//! # Degradation
//!
//! Normalization never fails. Missing or malformed fields are replaced with
//! their defaults, and nodes that are not JSON objects are skipped.

use crate::nav::model::{
    Category, CategoryId, IdSpace, TagRef, Website, WebsiteId, MAX_RATE, NORMALIZED_DEFAULT_RATE,
    UNKNOWN_CATEGORY, UNKNOWN_WEBSITE,
};

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Website keys that the normalizer interprets itself.
///
/// Everything else on a website node is passed through as-is.
const CONSUMED_KEYS: &[&str] = &[
    "id",
    "name",
    "title",
    "desc",
    "url",
    "icon",
    "tags",
    "rate",
    "top",
    "ownVisible",
    "topTypes",
    "nav",
];

type Object = Map<String, Value>;

/// Float bounds of integral values that fit into `i64`.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Normalize raw navigation document into canonical form.
///
/// Category order follows the input. Website order follows depth-first
/// discovery beneath each category. Normalizing an already canonical document
/// yields the same document.
pub fn normalize(raw: &[Value]) -> Vec<Category> {
    let mut harvested = Vec::with_capacity(raw.len());
    for node in raw {
        match node.as_object() {
            Some(category) => {
                let mut leaves = Vec::new();
                if let Some(nav) = category.get("nav").and_then(Value::as_array) {
                    collect_leaves(nav, &mut leaves);
                }
                harvested.push((category, leaves));
            }
            None => warn!("skip non-object category node: {node}"),
        }
    }

    let mut ids = IdAllocator::scan(&harvested);
    let categories = harvested
        .into_iter()
        .map(|(category, leaves)| Category {
            id: ids.category(category),
            title: first_text(category, ["title", "name"])
                .unwrap_or_else(|| UNKNOWN_CATEGORY.into()),
            icon: Some(text(category, "icon").unwrap_or_default()),
            nav: leaves
                .into_iter()
                .map(|leaf| materialize_website(leaf, &mut ids))
                .collect(),
        })
        .collect::<Vec<_>>();

    debug!(
        "normalized {} categories holding {} websites",
        categories.len(),
        categories.iter().map(|c| c.nav.len()).sum::<usize>()
    );

    categories
}

/// Parse JSON text, then normalize it.
///
/// # Errors
///
/// - Return [`serde_json::Error`] if the text is not a JSON array.
pub fn normalize_str(text: impl AsRef<str>) -> serde_json::Result<Vec<Category>> {
    let raw: Vec<Value> = serde_json::from_str(text.as_ref())?;
    Ok(normalize(&raw))
}

/// Determine if node is a website rather than a sub-category.
fn is_leaf(node: &Object) -> bool {
    node.contains_key("url") || !node.get("nav").is_some_and(Value::is_array)
}

fn collect_leaves<'a>(nav: &'a [Value], leaves: &mut Vec<&'a Object>) {
    for node in nav {
        let Some(object) = node.as_object() else {
            warn!("skip non-object navigation node: {node}");
            continue;
        };

        if is_leaf(object) {
            leaves.push(object);
        } else if let Some(children) = object.get("nav").and_then(Value::as_array) {
            collect_leaves(children, leaves);
        }
    }
}

fn materialize_website(leaf: &Object, ids: &mut IdAllocator) -> Website {
    let extra = leaf
        .iter()
        .filter(|(key, _)| !CONSUMED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<Object>();

    Website {
        id: ids.website(leaf),
        name: first_text(leaf, ["name", "title"]).unwrap_or_else(|| UNKNOWN_WEBSITE.into()),
        desc: text(leaf, "desc").unwrap_or_default(),
        url: text(leaf, "url").unwrap_or_default(),
        icon: Some(text(leaf, "icon").unwrap_or_default()),
        tags: Some(tags(leaf)),
        rate: Some(rate(leaf.get("rate")).unwrap_or(NORMALIZED_DEFAULT_RATE)),
        top: Some(flag(leaf, "top")),
        own_visible: Some(flag(leaf, "ownVisible")),
        top_types: top_types(leaf),
        extra,
    }
}

fn text(object: &Object, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// First non-empty string among keys.
fn first_text<const N: usize>(object: &Object, keys: [&str; N]) -> Option<String> {
    keys.into_iter()
        .filter_map(|key| object.get(key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_owned)
}

fn flag(object: &Object, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn tags(object: &Object) -> Vec<TagRef> {
    object
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().cloned().map(TagRef::from).collect())
        .unwrap_or_default()
}

fn top_types(object: &Object) -> Option<Vec<i64>> {
    object
        .get("topTypes")
        .and_then(Value::as_array)
        .map(|types| types.iter().filter_map(Value::as_i64).collect())
}

fn rate(value: Option<&Value>) -> Option<u8> {
    let number = value?.as_number()?;
    let rate = match number.as_u64() {
        Some(rate) => rate,
        None => number
            .as_f64()
            .filter(|rate| rate.is_finite() && *rate >= 0.0)?
            .round() as u64,
    };

    Some(rate.min(u64::from(MAX_RATE)) as u8)
}

fn parse_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|id| id.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(id))
                .map(|id| id as i64)
        }),
        Value::String(id) => id.trim().parse().ok(),
        _ => None,
    }
}

/// Hand out ids to nodes that lack a usable one.
///
/// Categories and websites draw from separate [`IdSpace`]s seeded with every
/// id already present in the document.
#[derive(Debug, Default)]
struct IdAllocator {
    categories: IdSpace,
    websites: IdSpace,
}

impl IdAllocator {
    fn scan(harvested: &[(&Object, Vec<&Object>)]) -> Self {
        let categories = harvested
            .iter()
            .filter_map(|(category, _)| parse_id(category.get("id")));
        let websites = harvested
            .iter()
            .flat_map(|(_, leaves)| leaves.iter())
            .filter_map(|leaf| parse_id(leaf.get("id")));

        Self {
            categories: IdSpace::new(categories),
            websites: IdSpace::new(websites),
        }
    }

    fn category(&mut self, node: &Object) -> CategoryId {
        CategoryId::new(parse_id(node.get("id")).unwrap_or_else(|| {
            let id = self.categories.allocate();
            warn!("category without usable id, assigned {id}");
            id
        }))
    }

    fn website(&mut self, node: &Object) -> WebsiteId {
        WebsiteId::new(parse_id(node.get("id")).unwrap_or_else(|| {
            let id = self.websites.allocate();
            warn!("website without usable id, assigned {id}");
            id
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use simple_test_case::test_case;

    fn raw(value: Value) -> Vec<Value> {
        match value {
            Value::Array(nodes) => nodes,
            other => vec![other],
        }
    }

    #[test]
    fn flatten_four_level_tree() -> anyhow::Result<()> {
        let input = raw(json!([{
            "id": 1,
            "title": "A",
            "nav": [{ "nav": [{ "nav": [{ "id": 10, "url": "http://x" }] }] }]
        }]));

        let result = serde_json::to_value(normalize(&input))?;
        let expect = json!([{
            "id": 1,
            "title": "A",
            "icon": "",
            "nav": [{
                "id": 10,
                "name": "未知网站",
                "desc": "",
                "url": "http://x",
                "icon": "",
                "tags": [],
                "rate": 0,
                "top": false,
                "ownVisible": false
            }]
        }]);
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn depth_first_left_to_right_order() {
        let input = raw(json!([{
            "id": 1,
            "title": "Dev",
            "nav": [
                { "id": 1, "url": "a" },
                { "title": "Sub", "nav": [
                    { "id": 2, "url": "b" },
                    { "nav": [{ "id": 3, "url": "c" }] },
                    { "id": 4, "url": "d" }
                ]},
                { "id": 5, "url": "e" }
            ]
        }]));

        let result = normalize(&input)[0]
            .nav
            .iter()
            .map(|website| website.url.clone())
            .collect::<Vec<_>>();
        assert_eq!(result, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn canonical_document_is_fixed_point() {
        let input = raw(json!([
            { "id": 1, "title": "Dev", "icon": "🛠", "nav": [
                { "id": 1, "name": "crates.io", "desc": "registry", "url": "https://crates.io",
                  "icon": "", "tags": [1, "rust"], "rate": 5, "top": true, "ownVisible": false,
                  "topTypes": [2], "color": "red" },
                { "id": 2, "name": "docs.rs", "desc": "", "url": "https://docs.rs",
                  "icon": "https://docs.rs/favicon.ico", "tags": [], "rate": 3, "top": false,
                  "ownVisible": true }
            ]},
            { "id": 2, "title": "Empty", "icon": "", "nav": [] }
        ]));

        let once = normalize(&input);
        let twice = normalize(&raw(serde_json::to_value(&once).unwrap()));
        assert_eq!(twice, once);
        assert_eq!(serde_json::to_value(&once).unwrap(), Value::Array(input));
    }

    #[test]
    fn title_and_name_fallbacks() {
        let input = raw(json!([
            { "id": 1, "name": "From name", "nav": [{ "id": 1, "title": "Site title", "url": "u" }] },
            { "id": 2, "nav": [{ "id": 2, "name": "", "url": "u" }] },
            { "id": 3, "title": "", "name": "" }
        ]));

        let result = normalize(&input);
        assert_eq!(result[0].title, "From name");
        assert_eq!(result[0].nav[0].name, "Site title");
        assert_eq!(result[1].title, UNKNOWN_CATEGORY);
        assert_eq!(result[1].nav[0].name, UNKNOWN_WEBSITE);
        assert_eq!(result[2].title, UNKNOWN_CATEGORY);
        assert!(result[2].nav.is_empty());
    }

    #[test]
    fn missing_url_and_nav_is_still_a_website() {
        let input = raw(json!([{ "id": 1, "title": "A", "nav": [{ "id": 9, "name": "No url" }] }]));

        let result = normalize(&input);
        assert_eq!(result[0].nav.len(), 1);
        assert_eq!(result[0].nav[0].url, "");
        assert_eq!(result[0].nav[0].name, "No url");
    }

    #[test]
    fn url_wins_over_nav() {
        let input = raw(json!([{ "id": 1, "title": "A", "nav": [
            { "id": 4, "url": "u", "nav": [{ "id": 5, "url": "hidden" }] }
        ]}]));

        let result = normalize(&input);
        assert_eq!(result[0].nav.len(), 1);
        assert_eq!(result[0].nav[0].id, WebsiteId::new(4));
        assert!(!result[0].nav[0].extra.contains_key("nav"));
    }

    #[test]
    fn unknown_fields_pass_through() {
        let input = raw(json!([{ "id": 1, "title": "A", "nav": [
            { "id": 4, "name": "n", "url": "u", "breadcrumb": ["x", "y"], "hits": 3 }
        ]}]));

        let result = &normalize(&input)[0].nav[0].extra;
        assert_eq!(result.get("breadcrumb"), Some(&json!(["x", "y"])));
        assert_eq!(result.get("hits"), Some(&json!(3)));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn ids_are_parsed_or_allocated_per_id_space() {
        let input = raw(json!([
            { "id": "7", "title": "A", "nav": [{ "url": "a" }, { "id": 40, "url": "b" }] },
            { "title": "B", "nav": [{ "id": "x", "url": "c" }] }
        ]));

        let result = normalize(&input);
        assert_eq!(result[0].id, CategoryId::new(7));
        assert_eq!(result[1].id, CategoryId::new(8));
        assert_eq!(result[0].nav[0].id, WebsiteId::new(41));
        assert_eq!(result[0].nav[1].id, WebsiteId::new(40));
        assert_eq!(result[1].nav[0].id, WebsiteId::new(42));
    }

    #[test]
    fn allocation_survives_largest_possible_id() {
        let input = raw(json!([
            { "id": i64::MAX, "title": "A", "nav": [
                { "id": i64::MAX, "url": "a" },
                { "url": "b" },
                { "id": 1e300, "url": "c" }
            ]},
            { "title": "B" },
            { "id": 1, "title": "C" }
        ]));

        let result = normalize(&input);
        let categories = result.iter().map(|c| c.id.get()).collect::<Vec<_>>();
        assert_eq!(categories, [i64::MAX, 2, 1]);

        let websites = result[0].nav.iter().map(|w| w.id.get()).collect::<Vec<_>>();
        assert_eq!(websites, [i64::MAX, 1, 2]);
    }

    #[test]
    fn tags_of_unknown_shape_survive() {
        let input = raw(json!([{ "id": 1, "title": "A", "nav": [
            { "id": 1, "url": "u", "tags": [{ "id": 3, "name": "rust" }, 2.5, 7, "cli"] }
        ]}]));

        let result = normalize(&input);
        assert_eq!(
            serde_json::to_value(&result[0].nav[0].tags).ok(),
            Some(json!([{ "id": 3, "name": "rust" }, 2.5, 7, "cli"]))
        );
        assert_eq!(result[0].nav[0].tags.as_ref().map(Vec::len), Some(4));
    }

    #[test_case(json!(3), 3; "integer")]
    #[test_case(json!(4.6), 5; "rounded float")]
    #[test_case(json!(12), 5; "clamped")]
    #[test_case(json!(-1), 0; "negative")]
    #[test_case(json!("5"), 0; "string")]
    #[test_case(Value::Null, 0; "null")]
    #[test]
    fn rate_materialization(input: Value, expect: u8) {
        let nodes = raw(json!([{ "id": 1, "title": "A", "nav": [{ "id": 1, "url": "u", "rate": input }] }]));
        pretty_assertions::assert_eq!(normalize(&nodes)[0].nav[0].rate, Some(expect));
    }

    #[test]
    fn malformed_nodes_degrade() {
        let input = raw(json!([
            42,
            { "id": 1, "title": "A", "icon": 5, "nav": [null, "x", { "id": 2, "url": "u",
              "tags": "nope", "top": "yes", "topTypes": [1, "2", 3] }] },
            { "id": 2, "title": "B", "nav": "not-an-array" }
        ]));

        let result = normalize(&input);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].icon.as_deref(), Some(""));
        assert_eq!(result[0].nav.len(), 1);
        assert_eq!(result[0].nav[0].tags, Some(Vec::new()));
        assert_eq!(result[0].nav[0].top, Some(false));
        assert_eq!(result[0].nav[0].top_types, Some(vec![1, 3]));
        assert!(result[1].nav.is_empty());
    }

    #[test]
    fn empty_document() -> anyhow::Result<()> {
        assert_eq!(normalize(&[]), Vec::new());
        assert_eq!(normalize_str("[]")?, Vec::new());
        assert!(normalize_str("{}").is_err());

        Ok(())
    }
}
