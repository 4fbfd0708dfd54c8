// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Default elision.
//!
//! Strip optional fields that hold their default value before a document is
//! persisted. The normalizer puts them back when the document is loaded again.

use crate::nav::model::{Category, Website, EDITOR_DEFAULT_RATE};

/// Remove default-valued optional fields from document.
///
/// Mandatory fields (`id`, `title`, `name`, `desc`, `url`) are always kept,
/// whatever their value. Eliding an already elided document changes nothing.
pub fn elide_defaults(doc: &[Category]) -> Vec<Category> {
    doc.iter()
        .map(|category| Category {
            id: category.id,
            title: category.title.clone(),
            icon: category.icon.clone().filter(|icon| !icon.is_empty()),
            nav: category.nav.iter().map(elide_website).collect(),
        })
        .collect()
}

/// Render document into its persisted JSON form.
///
/// Defaults are elided first, then the document is pretty printed with two
/// space indentation.
///
/// # Errors
///
/// - Return [`serde_json::Error`] if serialization fails.
pub fn to_document(doc: &[Category]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&elide_defaults(doc))
}

fn elide_website(website: &Website) -> Website {
    let mut website = website.clone();
    website.tags = website.tags.filter(|tags| !tags.is_empty());
    website.rate = website.rate.filter(|rate| *rate != EDITOR_DEFAULT_RATE);
    website.top = website.top.filter(|top| *top);
    website.own_visible = website.own_visible.filter(|own_visible| *own_visible);
    website.top_types = website.top_types.filter(|types| !types.is_empty());
    website
}
