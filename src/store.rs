// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local navigation store.
//!
//! The __store__ owns the working snapshot of the navigation document. It is
//! loaded once from a JSON file, normalized, and then kept in memory. Every
//! mutation produces a new snapshot that replaces the old one wholesale, and
//! nothing touches the file until [`NavStore::save`] is called.
//!
//! # Store Layout
//!
//! The store is a single JSON file holding the canonical document with its
//! defaults elided. The default location is `$XDG_DATA_HOME/guidebook/db.json`.
//! A missing file is treated as an empty document, so a fresh store needs no
//! setup.

use crate::nav::{
    model::{
        Category, CategoryId, IdSpace, TagRef, Website, WebsiteId, EDITOR_DEFAULT_RATE, MAX_RATE,
    },
    normalize_str, to_document,
};

use serde_json::Map;
use std::{
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Working copy of navigation document backed by a JSON file.
#[derive(Debug, Clone, PartialEq)]
pub struct NavStore {
    path: PathBuf,
    snapshot: Vec<Category>,
}

impl NavStore {
    /// Open store at target path.
    ///
    /// Reads and normalizes the document. Legacy nested documents are
    /// flattened on the way in.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Read`] if the file exists but cannot be read.
    /// - Return [`Error::Parse`] if the file is not a JSON array.
    #[instrument(skip(path), level = "debug")]
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match read_to_string(&path) {
            Ok(content) => normalize_str(content).map_err(|err| Error::Parse {
                source: err,
                path: path.clone(),
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("no document at {:?}, starting empty", path.display());
                Vec::new()
            }
            Err(err) => {
                return Err(Error::Read {
                    source: err,
                    path,
                })
            }
        };
        debug!("loaded {} categories from {:?}", snapshot.len(), path.display());

        Ok(Self { path, snapshot })
    }

    /// Construct store around existing snapshot.
    ///
    /// Nothing is read from the path until the store is saved.
    pub fn with_snapshot(path: impl Into<PathBuf>, snapshot: Vec<Category>) -> Self {
        Self {
            path: path.into(),
            snapshot,
        }
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Current working snapshot.
    pub fn snapshot(&self) -> &[Category] {
        &self.snapshot
    }

    /// Replace working snapshot wholesale.
    pub fn replace(&mut self, snapshot: Vec<Category>) {
        self.snapshot = snapshot;
    }

    /// Edit working snapshot.
    ///
    /// The editor works on a copy of the snapshot. If the editor fails, the
    /// copy is thrown away. Otherwise, the copy replaces the snapshot when
    /// something actually changed.
    ///
    /// # Errors
    ///
    /// - Return whatever error the editor returns.
    pub fn edit<T, E>(&mut self, editor: E) -> Result<T>
    where
        E: FnOnce(&mut NavEdit) -> Result<T>,
    {
        let mut draft = NavEdit::from(self.snapshot.clone());
        let output = editor(&mut draft)?;

        if draft.changed {
            self.snapshot = draft.categories;
        }

        Ok(output)
    }

    /// Render snapshot into its persisted form.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Serialize`] if serialization fails.
    pub fn to_document(&self) -> Result<String> {
        Ok(to_document(&self.snapshot)?)
    }

    /// Write snapshot to backing file.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Serialize`] if serialization fails.
    /// - Return [`Error::Write`] if the file or its parents cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn save(&self) -> Result<()> {
        let content = self.to_document()?;

        // INVARIANT: Parent directory must exist before writing.
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            mkdirp::mkdirp(parent).map_err(|err| Error::Write {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        write(&self.path, content.as_bytes()).map_err(|err| Error::Write {
            source: err,
            path: self.path.clone(),
        })?;
        info!("saved {} categories to {:?}", self.snapshot.len(), self.path.display());

        Ok(())
    }
}

/// Fields for a website created through the editor.
///
/// Defaults mirror what the editor offers a human, so the rate starts at
/// [`EDITOR_DEFAULT_RATE`].
#[derive(Debug, Clone, PartialEq)]
pub struct WebsiteDraft {
    pub name: String,
    pub url: String,
    pub desc: String,
    pub icon: Option<String>,
    pub tags: Vec<TagRef>,
    pub rate: u8,
    pub top: bool,
    pub own_visible: bool,
}

impl WebsiteDraft {
    /// Construct new website draft.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            desc: String::new(),
            icon: None,
            tags: Vec::new(),
            rate: EDITOR_DEFAULT_RATE,
            top: false,
            own_visible: false,
        }
    }
}

/// Navigation snapshot editor.
///
/// # Invariant
///
/// - Category ids and website ids stay unique within their own id space.
/// - New ids are one past the largest id currently in use, falling back to
///   the smallest free id once the largest possible id is taken.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NavEdit {
    categories: Vec<Category>,
    changed: bool,
}

impl NavEdit {
    /// Current state of the draft.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Append new category.
    ///
    /// # Errors
    ///
    /// - Return [`Error::EmptyField`] if title is empty.
    pub fn add_category(
        &mut self,
        title: impl Into<String>,
        icon: Option<String>,
    ) -> Result<CategoryId> {
        let title = not_empty("title", title.into())?;
        let id = CategoryId::new(
            IdSpace::new(self.categories.iter().map(|category| category.id.get())).allocate(),
        );

        self.categories.push(Category {
            id,
            title,
            icon,
            nav: Vec::new(),
        });
        self.changed = true;

        Ok(id)
    }

    /// Rename category.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownCategory`] if no category has that id.
    /// - Return [`Error::EmptyField`] if title is empty.
    pub fn rename_category(&mut self, id: CategoryId, title: impl Into<String>) -> Result<()> {
        let title = not_empty("title", title.into())?;
        let category = self.category_mut(id)?;
        if category.title != title {
            category.title = title;
            self.changed = true;
        }

        Ok(())
    }

    /// Set or clear category icon.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownCategory`] if no category has that id.
    pub fn set_category_icon(&mut self, id: CategoryId, icon: Option<String>) -> Result<()> {
        let category = self.category_mut(id)?;
        if category.icon != icon {
            category.icon = icon;
            self.changed = true;
        }

        Ok(())
    }

    /// Remove category along with all of its websites.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownCategory`] if no category has that id.
    pub fn remove_category(&mut self, id: CategoryId) -> Result<Category> {
        let index = self.category_index(id)?;
        self.changed = true;

        Ok(self.categories.remove(index))
    }

    /// Move category to new position.
    ///
    /// Positions past the end place the category last.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownCategory`] if no category has that id.
    pub fn reorder_category(&mut self, id: CategoryId, position: usize) -> Result<()> {
        let index = self.category_index(id)?;
        let category = self.categories.remove(index);
        let position = position.min(self.categories.len());
        self.categories.insert(position, category);
        self.changed |= position != index;

        Ok(())
    }

    /// Append new website to category.
    ///
    /// Every optional field is spelled out, the way the editor stores them.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownCategory`] if no category has that id.
    /// - Return [`Error::EmptyField`] if name or url is empty.
    pub fn add_website(&mut self, category: CategoryId, draft: WebsiteDraft) -> Result<WebsiteId> {
        let name = not_empty("name", draft.name)?;
        let url = not_empty("url", draft.url)?;
        let id =
            WebsiteId::new(IdSpace::new(self.websites().map(|website| website.id.get())).allocate());

        let website = Website {
            id,
            name,
            desc: draft.desc,
            url,
            icon: Some(draft.icon.unwrap_or_default()),
            tags: Some(draft.tags),
            rate: Some(draft.rate.min(MAX_RATE)),
            top: Some(draft.top),
            own_visible: Some(draft.own_visible),
            top_types: None,
            extra: Map::new(),
        };
        self.category_mut(category)?.nav.push(website);
        self.changed = true;

        Ok(id)
    }

    /// Edit website in place.
    ///
    /// The website keeps its id regardless of what the editor does to it.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownWebsite`] if no website has that id.
    pub fn edit_website<E>(&mut self, id: WebsiteId, editor: E) -> Result<()>
    where
        E: FnOnce(&mut Website),
    {
        let (category, index) = self.website_position(id)?;
        let website = &mut self.categories[category].nav[index];
        let before = website.clone();
        editor(website);

        // INVARIANT: Identity is fixed.
        website.id = id;
        if *website != before {
            self.changed = true;
        }

        Ok(())
    }

    /// Remove website.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownWebsite`] if no website has that id.
    pub fn remove_website(&mut self, id: WebsiteId) -> Result<Website> {
        let (category, index) = self.website_position(id)?;
        self.changed = true;

        Ok(self.categories[category].nav.remove(index))
    }

    /// Move website into category at position.
    ///
    /// Positions past the end place the website last. When no position is
    /// given, the website is appended.
    ///
    /// # Errors
    ///
    /// - Return [`Error::UnknownWebsite`] if no website has that id.
    /// - Return [`Error::UnknownCategory`] if target category does not exist.
    pub fn move_website(
        &mut self,
        id: WebsiteId,
        target: CategoryId,
        position: Option<usize>,
    ) -> Result<()> {
        let target = self.category_index(target)?;
        let (source, index) = self.website_position(id)?;
        let website = self.categories[source].nav.remove(index);

        let nav = &mut self.categories[target].nav;
        let position = position.unwrap_or(nav.len()).min(nav.len());
        nav.insert(position, website);
        self.changed |= source != target || position != index;

        Ok(())
    }

    fn websites(&self) -> impl Iterator<Item = &Website> {
        self.categories.iter().flat_map(|category| category.nav.iter())
    }

    fn category_index(&self, id: CategoryId) -> Result<usize> {
        self.categories
            .iter()
            .position(|category| category.id == id)
            .ok_or(Error::UnknownCategory(id))
    }

    fn category_mut(&mut self, id: CategoryId) -> Result<&mut Category> {
        let index = self.category_index(id)?;
        Ok(&mut self.categories[index])
    }

    fn website_position(&self, id: WebsiteId) -> Result<(usize, usize)> {
        self.categories
            .iter()
            .enumerate()
            .find_map(|(category, entry)| {
                entry
                    .nav
                    .iter()
                    .position(|website| website.id == id)
                    .map(|index| (category, index))
            })
            .ok_or(Error::UnknownWebsite(id))
    }
}

impl From<Vec<Category>> for NavEdit {
    fn from(categories: Vec<Category>) -> Self {
        Self {
            categories,
            changed: false,
        }
    }
}

fn not_empty(field: &'static str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::EmptyField(field));
    }

    Ok(value)
}

/// Navigation store error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Document file cannot be read from.
    #[error("failed to read navigation document at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Document file is not a JSON array.
    #[error("failed to parse navigation document at {:?}", path.display())]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Document file or its parent directory cannot be written to.
    #[error("failed to write navigation document at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Snapshot cannot be serialized.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// No category carries the id.
    #[error("no category with id {0}")]
    UnknownCategory(CategoryId),

    /// No website carries the id.
    #[error("no website with id {0}")]
    UnknownWebsite(WebsiteId),

    /// Mandatory field left empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
