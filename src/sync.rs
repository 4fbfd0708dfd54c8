// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote synchronization.
//!
//! The local store can be kept in sync with a copy of the navigation document
//! that lives somewhere else, normally a file in a GitHub repository. Syncing
//! is always a two step affair:
//!
//! 1. [`compare`] fetches the remote copy, normalizes it, and diffs it against
//!    the local snapshot.
//! 2. A human looks at the differences and picks a [`Resolution`], which
//!    [`apply`] then carries out.
//!
//! Nothing is ever merged automatically.
//!
//! # Optimistic Concurrency
//!
//! Every fetched copy comes with a content hash. Writing back requires the
//! hash of the copy the write is based on. If somebody else changed the remote
//! copy in the meantime, the write is rejected with [`SyncError::Conflict`],
//! and the caller has to compare again before retrying.

pub mod github;

use crate::{
    nav::{diff, normalize_str, Category, DiffResult},
    store::NavStore,
};

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, info, instrument, warn};

/// Raw remote copy of navigation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// JSON text of the document.
    pub content: String,

    /// Content hash used to detect concurrent writes.
    pub sha: String,
}

/// Layer of indirection for remote document access.
#[allow(async_fn_in_trait)]
pub trait RemoteDocument {
    /// Fetch current remote copy.
    ///
    /// Returns `None` if there is no remote copy yet.
    async fn fetch(&self) -> Result<Option<RemoteFile>>;

    /// Replace remote copy with content.
    ///
    /// The `sha` is the hash of the copy this write is based on, or `None`
    /// when creating the remote copy. Returns the hash of the new copy.
    async fn write(&self, content: &str, sha: Option<&str>) -> Result<String>;
}

/// Outcome of comparing local store with remote copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Normalized remote snapshot.
    pub remote: Vec<Category>,

    /// Hash of the fetched remote copy, if any.
    pub sha: Option<String>,

    /// Differences from local to remote.
    pub diff: DiffResult,
}

impl Comparison {
    /// Check if local and remote agree.
    pub fn is_in_sync(&self) -> bool {
        self.diff.is_empty()
    }
}

/// Decision on how to settle differences between local and remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Replace local snapshot with remote copy.
    UseRemote,

    /// Replace remote copy with local snapshot.
    PushLocal,

    /// Leave both sides alone.
    Cancel,
}

impl Resolution {
    pub const ALL: [Self; 3] = [Self::UseRemote, Self::PushLocal, Self::Cancel];
}

impl Display for Resolution {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::UseRemote => "use remote (overwrite local document)",
            Self::PushLocal => "push local (overwrite remote document)",
            Self::Cancel => "cancel (change nothing)",
        })
    }
}

/// What [`apply`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Local snapshot replaced and saved.
    Pulled,

    /// Remote copy replaced, carrying new hash.
    Pushed { sha: String },

    /// Nothing changed.
    Unchanged,
}

/// Compare local store with remote copy.
///
/// A missing remote copy compares as an empty document.
///
/// # Errors
///
/// - Return [`SyncError::Parse`] if remote copy is not a JSON array.
/// - Return whatever error the remote returns on fetch.
#[instrument(skip_all, level = "debug")]
pub async fn compare<R>(store: &NavStore, remote: &R) -> Result<Comparison>
where
    R: RemoteDocument,
{
    let (snapshot, sha) = match remote.fetch().await? {
        Some(file) => (
            normalize_str(&file.content).map_err(SyncError::Parse)?,
            Some(file.sha),
        ),
        None => {
            info!("remote document does not exist yet");
            (Vec::new(), None)
        }
    };

    let diff = diff(store.snapshot(), &snapshot);
    info!("found {} differences between local and remote", diff.len());

    Ok(Comparison {
        remote: snapshot,
        sha,
        diff,
    })
}

/// Write local snapshot to remote.
///
/// # Errors
///
/// - Return [`SyncError::Conflict`] if remote changed since `sha` was fetched.
/// - Return [`SyncError::Store`] if local snapshot cannot be serialized.
#[instrument(skip(store, remote), level = "debug")]
pub async fn push_local<R>(store: &NavStore, remote: &R, sha: Option<&str>) -> Result<String>
where
    R: RemoteDocument,
{
    let content = store.to_document()?;
    let sha = remote.write(&content, sha).await?;
    info!("pushed {} categories to remote", store.snapshot().len());
    debug!("remote document now at {sha}");

    Ok(sha)
}

/// Carry out resolution picked for comparison.
///
/// # Errors
///
/// - Return [`SyncError::Store`] if local snapshot cannot be saved.
/// - Return [`SyncError::Conflict`] if remote changed since comparing.
pub async fn apply<R>(
    store: &mut NavStore,
    remote: &R,
    comparison: Comparison,
    resolution: Resolution,
) -> Result<Outcome>
where
    R: RemoteDocument,
{
    match resolution {
        Resolution::UseRemote => {
            store.replace(comparison.remote);
            store.save()?;
            Ok(Outcome::Pulled)
        }
        Resolution::PushLocal => {
            let sha = push_local(store, remote, comparison.sha.as_deref()).await?;
            Ok(Outcome::Pushed { sha })
        }
        Resolution::Cancel => {
            warn!("sync cancelled, {} differences left", comparison.diff.len());
            Ok(Outcome::Unchanged)
        }
    }
}

/// Remote synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Request could not be sent or its response could not be read.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Credentials were rejected.
    #[error("remote rejected the access token, check that it is valid and can write contents")]
    Unauthorized,

    /// Remote copy changed since it was fetched.
    #[error("remote document changed since it was fetched, compare again and retry")]
    Conflict,

    /// Remote answered with an unexpected status.
    #[error("remote answered with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Remote content uses an encoding that cannot be decoded.
    #[error("remote document has unsupported encoding {0:?}")]
    Encoding(String),

    /// Remote content is not valid base64.
    #[error(transparent)]
    Decode(#[from] base64::DecodeError),

    /// Remote content is not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Remote content is not a navigation document.
    #[error("remote document is not a JSON array")]
    Parse(#[source] serde_json::Error),

    /// Local store operation fails.
    #[error(transparent)]
    Store(#[from] crate::store::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
