// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Navigation documents.
//!
//! A __navigation document__ is the JSON file that backs a guidebook site. It
//! lists categories of bookmarked websites. Three pieces of logic operate on
//! it:
//!
//! 1. [`normalize`] flattens raw documents, legacy nesting included, into the
//!    canonical categories-holding-websites shape and fills in defaults.
//! 2. [`elide_defaults`] strips those defaults back out before persisting.
//! 3. [`diff`] compares two canonical snapshots, typically the local working
//!    copy against the copy stored on GitHub.
//!
//! All three are pure functions over in-memory data. Loading and storing
//! documents is handled by [`store`](crate::store) and [`sync`](crate::sync).

pub mod clean;
pub mod diff;
pub mod model;
pub mod normalize;

pub use clean::{elide_defaults, to_document};
pub use diff::{
    diff, diff_raw, CategoryChange, CategoryField, Changes, DiffResult, FieldChange,
    WebsiteChange, WebsiteEntry, WebsiteField,
};
pub use model::{Category, CategoryId, TagRef, Website, WebsiteId};
pub use normalize::{normalize, normalize_str};
