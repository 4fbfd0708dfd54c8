// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Navigation document layout.
//!
//! A navigation document is an ordered list of [`Category`] entries, each of
//! which holds an ordered list of [`Website`] entries. This is the canonical
//! two-level shape. Legacy documents nest further, but those only ever reach
//! the normalizer as raw JSON.
//!
//! # Absent Versus Default
//!
//! Optional fields are modeled as [`Option`] so that "key not present" and
//! "key present with its default value" stay distinguishable. The normalizer
//! fills every optional field in, while the cleaner strips default values back
//! out before the document is persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Rate the normalizer materializes for websites that lack one.
pub const NORMALIZED_DEFAULT_RATE: u8 = 0;

/// Rate given to websites created through the editor.
///
/// The cleaner elides this value, not [`NORMALIZED_DEFAULT_RATE`]. Both are
/// kept as-is on purpose, and tests pin the resulting asymmetry.
pub const EDITOR_DEFAULT_RATE: u8 = 5;

/// Highest rate a website can carry.
pub const MAX_RATE: u8 = 5;

/// Title given to categories that have neither a title nor a name.
pub const UNKNOWN_CATEGORY: &str = "未知分类";

/// Name given to websites that have neither a name nor a title.
pub const UNKNOWN_WEBSITE: &str = "未知网站";

/// Identity of a category, unique across the whole document.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct CategoryId(i64);

impl CategoryId {
    /// Construct new category id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for CategoryId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.0)
    }
}

/// Identity of a website, unique across the whole document.
///
/// Websites are matched by this id regardless of which category owns them.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct WebsiteId(i64);

impl WebsiteId {
    /// Construct new website id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for WebsiteId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.0)
    }
}

/// Reference to a tag, either by numeric id or by name.
///
/// Tags of any other shape are kept verbatim in [`TagRef::Other`], so they
/// survive a load and save cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TagRef {
    Id(i64),
    Name(String),
    Other(Value),
}

impl From<Value> for TagRef {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(number) => match number.as_i64() {
                Some(id) => Self::Id(id),
                None => Self::Other(Value::Number(number)),
            },
            Value::String(name) => Self::Name(name),
            other => Self::Other(other),
        }
    }
}

/// Ids in use within one id space, handing out fresh ones.
///
/// # Invariant
///
/// - A fresh id never collides with an id already in the space.
/// - Fresh ids are one past the largest positive id in use. Once the top of
///   the range is taken, the smallest unused positive id is handed out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdSpace {
    used: HashSet<i64>,
    next: Option<i64>,
}

impl IdSpace {
    /// Construct id space from ids already in use.
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let used = ids.into_iter().collect::<HashSet<_>>();
        let next = used.iter().copied().max().unwrap_or(0).max(0).checked_add(1);

        Self { used, next }
    }

    /// Hand out fresh id and mark it as used.
    pub fn allocate(&mut self) -> i64 {
        let id = match self.next {
            Some(id) => {
                self.next = id.checked_add(1);
                id
            }
            None => (1..=i64::MAX)
                .find(|id| !self.used.contains(id))
                .unwrap_or_default(),
        };
        self.used.insert(id);

        id
    }
}

/// A bookmarked website.
#[derive(Default, Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: WebsiteId,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub url: String,

    /// Icon URL or emoji.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,

    /// Rating in `0..=5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<u8>,

    /// Pin to the top of its category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<bool>,

    /// Only visible to the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_visible: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_types: Option<Vec<i64>>,

    /// Unrecognized fields, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A category of websites.
#[derive(Default, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub nav: Vec<Website>,
}

impl Category {
    /// Find website owned by this category.
    pub fn website(&self, id: WebsiteId) -> Option<&Website> {
        self.nav.iter().find(|website| website.id == id)
    }
}
