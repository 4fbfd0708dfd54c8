// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Website icon resolution.
//!
//! Icons are either remote images referenced by URL, or short text glyphs
//! such as emoji. Remote images break all the time, so every session keeps a
//! [`FailedIcons`] cache of URLs that are known not to load. Icons in that
//! cache are not tried again until the cache is cleared, and the first
//! character of the website name is shown in their place.

use crate::nav::Category;

use indexmap::IndexSet;
use reqwest::{Client, StatusCode};
use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// How long a single icon probe may take.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Character shown when website name is empty.
pub const PLACEHOLDER: char = '?';

/// Session cache of icon URLs that failed to load.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FailedIcons {
    urls: HashSet<String>,
}

impl FailedIcons {
    /// Construct new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that icon URL failed to load.
    ///
    /// Returns `false` if the URL was already known to fail.
    pub fn mark_failed(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    /// Check if icon URL is known to fail.
    pub fn is_failed(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Forget every failure, e.g., when the document is reloaded.
    pub fn clear(&mut self) {
        self.urls.clear();
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// What to show in place of an icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconView {
    /// Text icon shown as is.
    Glyph(String),

    /// Image to load from URL.
    Remote(String),

    /// Stand-in character derived from website name.
    Fallback(char),
}

impl Display for IconView {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Glyph(glyph) => fmt.write_str(glyph),
            Self::Remote(url) => fmt.write_str(url),
            Self::Fallback(letter) => write!(fmt, "[{letter}]"),
        }
    }
}

/// Check if icon is a reference to a remote image.
pub fn is_remote(icon: &str) -> bool {
    ["http://", "https://", "//", "data:"]
        .iter()
        .any(|prefix| icon.starts_with(prefix))
}

/// Decide what to show for icon of entity with given name.
pub fn resolve_icon(icon: Option<&str>, name: &str, failed: &FailedIcons) -> IconView {
    match icon.map(str::trim) {
        Some(icon) if icon.is_empty() => fallback(name),
        Some(icon) if is_remote(icon) => {
            if failed.is_failed(icon) {
                fallback(name)
            } else {
                IconView::Remote(icon.into())
            }
        }
        Some(icon) => IconView::Glyph(icon.into()),
        None => fallback(name),
    }
}

fn fallback(name: &str) -> IconView {
    let letter = name
        .trim()
        .chars()
        .next()
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or(PLACEHOLDER);

    IconView::Fallback(letter)
}

/// Collect remote icon URLs of document that still need probing.
///
/// URLs are deduplicated and kept in document order. URLs already known to
/// fail are left out.
pub fn pending_icons(doc: &[Category], failed: &FailedIcons) -> Vec<String> {
    let categories = doc.iter().filter_map(|category| category.icon.as_deref());
    let websites = doc
        .iter()
        .flat_map(|category| category.nav.iter())
        .filter_map(|website| website.icon.as_deref());

    categories
        .chain(websites)
        .map(str::trim)
        .filter(|icon| icon.starts_with("http://") || icon.starts_with("https://"))
        .filter(|icon| !failed.is_failed(icon))
        .map(String::from)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Probe remote icons of document and record the ones that fail to load.
///
/// Every pending icon gets a HEAD request. Hosts that refuse HEAD get a GET
/// instead, so only a missing image or no successful answer within
/// [`PROBE_TIMEOUT`] counts as a failure. Returns the number of newly failed
/// icons.
#[instrument(skip_all, level = "debug")]
pub async fn probe_icons(client: &Client, doc: &[Category], failed: &mut FailedIcons) -> usize {
    let mut probes = JoinSet::new();
    for url in pending_icons(doc, failed) {
        let client = client.clone();
        probes.spawn(async move {
            let loads = icon_loads(&client, &url).await;
            (url, loads)
        });
    }

    let mut count = 0;
    while let Some(result) = probes.join_next().await {
        match result {
            Ok((url, false)) => {
                warn!("icon {url} does not load");
                if failed.mark_failed(url) {
                    count += 1;
                }
            }
            Ok((_, true)) => {}
            Err(error) => warn!("icon probe did not finish: {error}"),
        }
    }
    info!("{count} icons failed to load");

    count
}

async fn icon_loads(client: &Client, url: &str) -> bool {
    let status = match client.head(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => response.status(),
        Err(error) => {
            debug!("probe of {url} failed: {error}");
            return false;
        }
    };

    if status.is_success() {
        return true;
    }
    if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
        return false;
    }

    debug!("HEAD {url} answered {status}, retrying with GET");
    match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => response.status().is_success(),
        Err(error) => {
            debug!("probe of {url} failed: {error}");
            false
        }
    }
}
