// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that guidebook uses to
//! simplify the process of serialization and deserialization. File I/O is left
//! to the caller to figure out.
//!
//! # General Layout
//!
//! The configuration file is composed of two tables: `store` and `github`. The
//! store table says where the local navigation document lives. The github
//! table says which repository file the document is synchronized with. Leave
//! the github table out to work purely locally.
//!
//! ```toml
//! [store]
//! path = "~/sites/guidebook/public/data/db.json"
//!
//! [github]
//! owner = "someone"
//! repo = "guidebook"
//! branch = "main"
//! path = "public/data/db.json"
//! token = "$GUIDEBOOK_TOKEN"
//! ```
//!
//! Both `store.path` and `github.token` go through shell expansion, so
//! environment variables and `~` can be used instead of literal values.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default branch to synchronize with.
pub const DEFAULT_BRANCH: &str = "main";

/// Default path of navigation document inside repository.
pub const DEFAULT_REMOTE_PATH: &str = "public/data/db.json";

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Guidebook configuration layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct GuidebookConfig {
    /// Settings for the local navigation store.
    #[serde(default)]
    pub store: StoreSettings,

    /// Settings for GitHub synchronization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubSettings>,
}

impl FromStr for GuidebookConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: GuidebookConfig = toml::de::from_str(data)?;

        // INVARIANT: Perform shell expansion on document path and token.
        if let Some(path) = &config.store.path {
            config.store.path = Some(DocumentPath::new(
                shellexpand::full(path.to_string().as_str())?.into_owned(),
            ));
        }
        if let Some(github) = &mut config.github {
            github.token = Token::new(shellexpand::full(github.token.expose())?.into_owned());
        }

        Ok(config)
    }
}

impl Display for GuidebookConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Local store settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct StoreSettings {
    /// Path to local navigation document.
    ///
    /// Falls back to the XDG data directory when left out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<DocumentPath>,
}

/// GitHub synchronization settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct GithubSettings {
    /// Owner of the repository.
    pub owner: String,

    /// Name of the repository.
    pub repo: String,

    /// Branch to read from and commit to.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Path of the navigation document inside the repository.
    #[serde(default = "default_remote_path")]
    pub path: String,

    /// Personal access token.
    ///
    /// Left empty, the token is asked for when needed. Never serialized, so
    /// rendering the configuration cannot leak it.
    #[serde(default, skip_serializing)]
    pub token: Token,

    /// REST API endpoint, for GitHub Enterprise hosts.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl GithubSettings {
    /// Construct new settings for repository with defaults everywhere else.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: default_branch(),
            path: default_remote_path(),
            token: Token::default(),
            api_url: default_api_url(),
        }
    }
}

fn default_branch() -> String {
    DEFAULT_BRANCH.into()
}

fn default_remote_path() -> String {
    DEFAULT_REMOTE_PATH.into()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

/// Path to local navigation document.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DocumentPath(PathBuf);

impl DocumentPath {
    /// Construct new document path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat document path as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for DocumentPath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Personal access token.
///
/// Debug output never shows the token itself.
#[derive(Default, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Construct new token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Debug for Token {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        if self.is_empty() {
            fmt.write_str("Token(<unset>)")
        } else {
            fmt.write_str("Token(<redacted>)")
        }
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}
