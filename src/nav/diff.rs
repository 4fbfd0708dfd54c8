// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Snapshot comparison.
//!
//! Compare a local navigation document against a remote one and classify
//! every difference as an addition, a removal, or a field-level modification.
//! Nothing is merged here. The result only describes what differs so that a
//! human can decide which side wins.
//!
//! # Identity
//!
//! Categories are matched by [`CategoryId`]. Websites are matched by
//! [`WebsiteId`] across the whole document, not per category. As a
//! consequence, a website that moved to another category without any field
//! edits produces no entry at all.
//!
//! # Ordering
//!
//! Removed and modified entries follow the order of the local document.
//! Added entries follow the order of the remote document. When a document
//! repeats an id, the last occurrence wins but keeps the position of the
//! first one.

use crate::nav::{
    model::{Category, CategoryId, Website, WebsiteId},
    normalize::normalize,
};

use indexmap::{map::Iter as IndexIter, IndexMap};
use serde::Serialize;
use serde_json::{json, Value};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    hash::Hash,
};

/// Compare two normalized snapshots.
pub fn diff(local: &[Category], remote: &[Category]) -> DiffResult {
    let local_categories = category_index(local);
    let remote_categories = category_index(remote);
    let local_websites = website_index(local);
    let remote_websites = website_index(remote);

    let mut result = DiffResult::default();

    for (id, category) in &remote_categories {
        if !local_categories.contains_key(id) {
            result.categories_added.push((*category).clone());
        }
    }

    for (id, local) in &local_categories {
        match remote_categories.get(id) {
            None => result.categories_removed.push((*local).clone()),
            Some(remote) => {
                let changes = Changes::compare(CategoryField::ALL, *local, *remote);
                if !changes.is_empty() {
                    result.categories_modified.push(CategoryChange {
                        category: (*local).clone(),
                        changes,
                    });
                }
            }
        }
    }

    for (id, (category_title, website)) in &remote_websites {
        if !local_websites.contains_key(id) {
            result.websites_added.push(WebsiteEntry::new(category_title, website));
        }
    }

    for (id, (category_title, local)) in &local_websites {
        match remote_websites.get(id) {
            None => result
                .websites_removed
                .push(WebsiteEntry::new(category_title, local)),
            Some((_, remote)) => {
                let changes = Changes::compare(WebsiteField::ALL, *local, *remote);
                if !changes.is_empty() {
                    result.websites_modified.push(WebsiteChange {
                        category_title: category_title.to_string(),
                        website_id: *id,
                        changes,
                    });
                }
            }
        }
    }

    result
}

/// Normalize two raw documents, then compare them.
///
/// Both sides go through the same normalization, so a default that one side
/// spells out and the other side leaves implicit does not count as a change.
pub fn diff_raw(local: &[Value], remote: &[Value]) -> DiffResult {
    diff(&normalize(local), &normalize(remote))
}

/// Index categories by id.
///
/// Later duplicates overwrite earlier ones.
pub fn category_index(doc: &[Category]) -> IndexMap<CategoryId, &Category> {
    doc.iter().map(|category| (category.id, category)).collect()
}

/// Index every website in document by id, along with its category title.
///
/// Category boundaries are flattened away. Later duplicates overwrite earlier
/// ones.
pub fn website_index(doc: &[Category]) -> IndexMap<WebsiteId, (&str, &Website)> {
    doc.iter()
        .flat_map(|category| {
            category
                .nav
                .iter()
                .map(move |website| (website.id, (category.title.as_str(), website)))
        })
        .collect()
}

/// Outcome of comparing a local and a remote snapshot.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// Remote-only categories.
    pub categories_added: Vec<Category>,

    /// Local-only categories.
    pub categories_removed: Vec<Category>,

    /// Categories whose title or icon differ.
    pub categories_modified: Vec<CategoryChange>,

    /// Remote-only websites.
    pub websites_added: Vec<WebsiteEntry>,

    /// Local-only websites.
    pub websites_removed: Vec<WebsiteEntry>,

    /// Websites with at least one differing field.
    pub websites_modified: Vec<WebsiteChange>,
}

impl DiffResult {
    /// Check if both snapshots are equivalent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of reported entries.
    pub fn len(&self) -> usize {
        self.categories_added.len()
            + self.categories_removed.len()
            + self.categories_modified.len()
            + self.websites_added.len()
            + self.websites_removed.len()
            + self.websites_modified.len()
    }
}

impl Display for DiffResult {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        if self.is_empty() {
            return writeln!(fmt, "local and remote are identical");
        }

        for category in &self.categories_added {
            writeln!(fmt, "+ category {} {:?}", category.id, category.title)?;
        }
        for category in &self.categories_removed {
            writeln!(fmt, "- category {} {:?}", category.id, category.title)?;
        }
        for change in &self.categories_modified {
            writeln!(
                fmt,
                "~ category {} {:?}",
                change.category.id, change.category.title
            )?;
            write!(fmt, "{}", change.changes)?;
        }
        for entry in &self.websites_added {
            writeln!(
                fmt,
                "+ website {} {:?} in {:?}",
                entry.website.id, entry.website.name, entry.category_title
            )?;
        }
        for entry in &self.websites_removed {
            writeln!(
                fmt,
                "- website {} {:?} in {:?}",
                entry.website.id, entry.website.name, entry.category_title
            )?;
        }
        for change in &self.websites_modified {
            writeln!(
                fmt,
                "~ website {} in {:?}",
                change.website_id, change.category_title
            )?;
            write!(fmt, "{}", change.changes)?;
        }

        Ok(())
    }
}

/// Category present on both sides with differing fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryChange {
    /// Local version of the category.
    pub category: Category,
    pub changes: Changes<CategoryField>,
}

/// Website present on one side only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteEntry {
    /// Title of the owning category on the side the website came from.
    pub category_title: String,
    #[serde(flatten)]
    pub website: Website,
}

impl WebsiteEntry {
    fn new(category_title: &str, website: &Website) -> Self {
        Self {
            category_title: category_title.to_string(),
            website: website.clone(),
        }
    }
}

/// Website present on both sides with differing fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteChange {
    /// Title of the owning category in the local snapshot.
    pub category_title: String,
    pub website_id: WebsiteId,
    pub changes: Changes<WebsiteField>,
}

/// Before and after value of one field.
///
/// Absent optional values show up as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

/// Entity field that can be compared between snapshots.
pub trait Field<T>: Copy + Eq + Hash {
    /// Extract value of this field from entity.
    fn value_of(self, entity: &T) -> Value;
}

/// Differing fields of one entity, keyed by field.
///
/// Only fields that actually differ are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Changes<F>(IndexMap<F, FieldChange>)
where
    F: Eq + Hash;

impl<F> Changes<F>
where
    F: Eq + Hash,
{
    /// Compare listed fields of two entities.
    pub fn compare<T>(fields: impl IntoIterator<Item = F>, from: &T, to: &T) -> Self
    where
        F: Field<T>,
    {
        let changes = fields
            .into_iter()
            .filter_map(|field| {
                let before = field.value_of(from);
                let after = field.value_of(to);
                (before != after).then_some((
                    field,
                    FieldChange {
                        from: before,
                        to: after,
                    },
                ))
            })
            .collect();

        Self(changes)
    }

    /// Change record of field, if it differs.
    pub fn get(&self, field: &F) -> Option<&FieldChange> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &F) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> IndexIter<'_, F, FieldChange> {
        self.0.iter()
    }
}

impl<F> Display for Changes<F>
where
    F: Eq + Hash + Display,
{
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for (field, change) in self.iter() {
            writeln!(fmt, "    {field}: {} -> {}", change.from, change.to)?;
        }

        Ok(())
    }
}

/// Comparable category fields.
///
/// The `nav` list is deliberately absent. Website differences are reported
/// through the website-level entries instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryField {
    Title,
    Icon,
}

impl CategoryField {
    pub const ALL: [Self; 2] = [Self::Title, Self::Icon];
}

impl Field<Category> for CategoryField {
    fn value_of(self, category: &Category) -> Value {
        match self {
            Self::Title => json!(category.title),
            Self::Icon => json!(category.icon),
        }
    }
}

impl Display for CategoryField {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Title => "title",
            Self::Icon => "icon",
        })
    }
}

/// Comparable website fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WebsiteField {
    Name,
    Desc,
    Url,
    Icon,
    Rate,
    Top,
    OwnVisible,
}

impl WebsiteField {
    pub const ALL: [Self; 7] = [
        Self::Name,
        Self::Desc,
        Self::Url,
        Self::Icon,
        Self::Rate,
        Self::Top,
        Self::OwnVisible,
    ];
}

impl Field<Website> for WebsiteField {
    fn value_of(self, website: &Website) -> Value {
        match self {
            Self::Name => json!(website.name),
            Self::Desc => json!(website.desc),
            Self::Url => json!(website.url),
            Self::Icon => json!(website.icon),
            Self::Rate => json!(website.rate),
            Self::Top => json!(website.top),
            Self::OwnVisible => json!(website.own_visible),
        }
    }
}

impl Display for WebsiteField {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Name => "name",
            Self::Desc => "desc",
            Self::Url => "url",
            Self::Icon => "icon",
            Self::Rate => "rate",
            Self::Top => "top",
            Self::OwnVisible => "ownVisible",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document(value: Value) -> Vec<Category> {
        normalize(value.as_array().unwrap())
    }

    fn sample() -> Vec<Category> {
        document(json!([
            { "id": 1, "title": "Dev", "icon": "🛠", "nav": [
                { "id": 1, "name": "crates.io", "url": "https://crates.io", "rate": 5 },
                { "id": 2, "name": "docs.rs", "url": "https://docs.rs", "top": true }
            ]},
            { "id": 2, "title": "News", "nav": [
                { "id": 3, "name": "lobste.rs", "url": "https://lobste.rs" }
            ]}
        ]))
    }

    #[test]
    fn identical_snapshots_have_no_difference() {
        let doc = sample();
        let result = diff(&doc, &doc);
        assert_eq!(result, DiffResult::default());
        assert!(result.is_empty());
        assert_eq!(diff(&[], &[]), DiffResult::default());
    }

    #[test]
    fn pure_category_addition() {
        let remote = document(json!([{ "id": 1, "title": "A", "icon": "", "nav": [] }]));

        let result = diff(&[], &remote);
        let expect = DiffResult {
            categories_added: remote.clone(),
            ..Default::default()
        };
        assert_eq!(result, expect);
    }

    #[test]
    fn category_removal_carries_websites_as_removed() {
        let local = sample();
        let remote = local[..1].to_vec();

        let result = diff(&local, &remote);
        assert_eq!(result.categories_removed, vec![local[1].clone()]);
        assert_eq!(result.websites_removed.len(), 1);
        assert_eq!(result.websites_removed[0].category_title, "News");
        assert_eq!(result.websites_removed[0].website.id, WebsiteId::new(3));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn single_field_website_modification() -> anyhow::Result<()> {
        let local = document(json!([{ "id": 1, "title": "A", "nav": [
            { "id": 5, "name": "Old", "url": "u" }
        ]}]));
        let remote = document(json!([{ "id": 1, "title": "A", "nav": [
            { "id": 5, "name": "New", "url": "u" }
        ]}]));

        let result = diff(&local, &remote);
        assert_eq!(result.len(), 1);
        assert_eq!(
            serde_json::to_value(&result.websites_modified)?,
            json!([{
                "categoryTitle": "A",
                "websiteId": 5,
                "changes": { "name": { "from": "Old", "to": "New" } }
            }])
        );

        Ok(())
    }

    #[test]
    fn category_title_and_icon_changes() -> anyhow::Result<()> {
        let local = document(json!([
            { "id": 1, "title": "A", "icon": "x", "nav": [] },
            { "id": 2, "title": "B", "nav": [{ "id": 1, "url": "u" }] }
        ]));
        let remote = document(json!([
            { "id": 1, "title": "A", "icon": "y", "nav": [] },
            { "id": 2, "title": "Bee", "nav": [] }
        ]));

        let result = diff(&local, &remote);
        assert_eq!(result.categories_modified.len(), 2);
        assert_eq!(
            serde_json::to_value(&result.categories_modified[0].changes)?,
            json!({ "icon": { "from": "x", "to": "y" } })
        );
        let renamed = &result.categories_modified[1];
        assert_eq!(renamed.category.title, "B");
        assert!(renamed.changes.contains(&CategoryField::Title));
        assert!(!renamed.changes.contains(&CategoryField::Icon));

        // Emptied nav only surfaces at website level.
        assert_eq!(result.websites_removed.len(), 1);
        assert_eq!(result.len(), 3);

        Ok(())
    }

    #[test]
    fn moved_website_without_edits_is_invisible() {
        let local = document(json!([
            { "id": 1, "title": "A", "nav": [{ "id": 7, "name": "n", "url": "u" }] },
            { "id": 2, "title": "B", "nav": [] }
        ]));
        let remote = document(json!([
            { "id": 1, "title": "A", "nav": [] },
            { "id": 2, "title": "B", "nav": [{ "id": 7, "name": "n", "url": "u" }] }
        ]));

        let result = diff(&local, &remote);
        assert!(result.websites_added.is_empty());
        assert!(result.websites_removed.is_empty());
        assert!(result.websites_modified.is_empty());
    }

    #[test]
    fn moved_and_edited_website_reports_local_category() {
        let local = document(json!([
            { "id": 1, "title": "A", "nav": [{ "id": 7, "name": "n", "url": "u" }] },
            { "id": 2, "title": "B", "nav": [] }
        ]));
        let remote = document(json!([
            { "id": 1, "title": "A", "nav": [] },
            { "id": 2, "title": "B", "nav": [{ "id": 7, "name": "n", "url": "u2" }] }
        ]));

        let result = diff(&local, &remote);
        assert_eq!(result.websites_modified.len(), 1);
        assert_eq!(result.websites_modified[0].category_title, "A");
        assert_eq!(
            result.websites_modified[0].changes.get(&WebsiteField::Url),
            Some(&FieldChange {
                from: json!("u"),
                to: json!("u2")
            })
        );
    }

    #[test]
    fn duplicate_ids_resolve_last_write_wins() {
        let local = document(json!([
            { "id": 1, "title": "First", "nav": [] },
            { "id": 2, "title": "Other", "nav": [] },
            { "id": 1, "title": "Second", "nav": [] }
        ]));

        let index = category_index(&local);
        assert_eq!(index.len(), 2);
        assert_eq!(index[&CategoryId::new(1)].title, "Second");
        assert_eq!(index.keys().copied().collect::<Vec<_>>(), [CategoryId::new(1), CategoryId::new(2)]);

        let remote = document(json!([
            { "id": 1, "title": "Second", "nav": [] },
            { "id": 2, "title": "Other", "nav": [] }
        ]));
        assert!(diff(&local, &remote).is_empty());
    }

    #[test]
    fn entries_follow_snapshot_order() {
        let local = document(json!([{ "id": 1, "title": "A", "nav": [
            { "id": 30, "url": "a" }, { "id": 10, "url": "b" }, { "id": 20, "url": "c" }
        ]}]));
        let remote = document(json!([{ "id": 1, "title": "A", "nav": [
            { "id": 90, "url": "x" }, { "id": 70, "url": "y" }, { "id": 80, "url": "z" }
        ]}]));

        let result = diff(&local, &remote);
        let removed = result
            .websites_removed
            .iter()
            .map(|entry| entry.website.id.get())
            .collect::<Vec<_>>();
        let added = result
            .websites_added
            .iter()
            .map(|entry| entry.website.id.get())
            .collect::<Vec<_>>();
        assert_eq!(removed, [30, 10, 20]);
        assert_eq!(added, [90, 70, 80]);
    }

    #[test]
    fn raw_diff_ignores_implicit_defaults() {
        let local = [json!({ "id": 1, "title": "A", "nav": [{ "id": 1, "name": "n", "url": "u" }] })];
        let remote = [json!({ "id": 1, "title": "A", "icon": "", "nav": [{
            "id": 1, "name": "n", "url": "u", "desc": "", "icon": "", "top": false,
            "ownVisible": false, "rate": 0, "tags": []
        }]})];

        assert!(diff_raw(&local, &remote).is_empty());
    }

    #[test]
    fn absent_and_explicit_values_differ_on_typed_snapshots() {
        let mut local = sample();
        let mut remote = sample();
        local[0].nav[0].top = None;
        remote[0].nav[0].top = Some(false);

        let result = diff(&local, &remote);
        assert_eq!(
            result.websites_modified[0].changes.get(&WebsiteField::Top),
            Some(&FieldChange {
                from: Value::Null,
                to: json!(false)
            })
        );
    }

    #[test]
    fn summary_lists_every_entry() {
        let local = sample();
        let mut remote = sample();
        remote[0].nav[1].name = "docs".into();
        remote.remove(1);

        let result = diff(&local, &remote).to_string();
        let expect = concat!(
            "- category 2 \"News\"\n",
            "- website 3 \"lobste.rs\" in \"News\"\n",
            "~ website 2 in \"Dev\"\n",
            "    name: \"docs.rs\" -> \"docs\"\n",
        );
        assert_eq!(result, expect);
    }
}
