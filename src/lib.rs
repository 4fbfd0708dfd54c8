// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep the navigation document of a guidebook site in shape.
//!
//! A guidebook site is a bookmark portal backed by one JSON file. This crate
//! normalizes that file (including its legacy nested shape), persists it with
//! defaults elided, and keeps a local working copy in sync with the copy
//! committed to a GitHub repository. Differences between the two are shown
//! to a human, who decides which side wins.

pub mod config;
pub mod icon;
pub mod nav;
pub mod path;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::GuidebookConfig;
pub use store::{Error as StoreError, NavEdit, NavStore, WebsiteDraft};
pub use sync::{github::GithubRemote, RemoteDocument, Resolution, SyncError};
