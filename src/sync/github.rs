// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! GitHub contents API remote.
//!
//! Read and write the navigation document as a single file in a GitHub
//! repository through the [contents API][contents]. The blob SHA that GitHub
//! hands out with every read doubles as the content hash for optimistic
//! concurrency: writes based on a stale SHA are answered with 409.
//!
//! [contents]: https://docs.github.com/en/rest/repos/contents

use crate::{
    config::{GithubSettings, Token},
    sync::{RemoteDocument, RemoteFile, Result, SyncError},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{ACCEPT, USER_AGENT},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Navigation document stored in a GitHub repository.
#[derive(Debug, Clone)]
pub struct GithubRemote {
    client: Client,
    settings: GithubSettings,
    token: Token,
}

impl GithubRemote {
    /// Construct new remote for repository file.
    ///
    /// The token is passed separately so callers can prompt for it when the
    /// configuration leaves it out.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Http`] if HTTP client cannot be initialized.
    pub fn new(settings: GithubSettings, token: Token) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, settings, token))
    }

    /// Construct new remote on top of existing HTTP client.
    pub fn with_client(client: Client, settings: GithubSettings, token: Token) -> Self {
        Self {
            client,
            settings,
            token,
        }
    }

    /// Settings this remote was built from.
    pub fn settings(&self) -> &GithubSettings {
        &self.settings
    }

    /// Contents API endpoint of the document.
    pub fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.owner,
            self.settings.repo,
            self.settings.path.trim_start_matches('/'),
        )
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.contents_url())
            .bearer_auth(self.token.expose())
            .header(ACCEPT, MEDIA_TYPE)
            .header(USER_AGENT, AGENT)
            .header(API_VERSION_HEADER, API_VERSION)
    }
}

impl RemoteDocument for GithubRemote {
    #[instrument(skip(self), fields(url = %self.contents_url()), level = "debug")]
    async fn fetch(&self) -> Result<Option<RemoteFile>> {
        let response = self
            .request(Method::GET)
            .query(&[("ref", self.settings.branch.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("no document on branch {}", self.settings.branch);
            return Ok(None);
        }

        let body: ContentsResponse = check_status(response).await?.json().await?;
        let content = decode_content(&body)?;
        info!("fetched remote document at {}", body.sha);

        Ok(Some(RemoteFile {
            content,
            sha: body.sha,
        }))
    }

    #[instrument(skip(self, content), fields(url = %self.contents_url()), level = "debug")]
    async fn write(&self, content: &str, sha: Option<&str>) -> Result<String> {
        let payload = UpdateRequest {
            message: commit_message(Utc::now()),
            content: STANDARD.encode(content),
            branch: self.settings.branch.as_str(),
            sha,
        };

        let response = self.request(Method::PUT).json(&payload).send().await?;
        let body: UpdateResponse = check_status(response).await?.json().await?;
        info!("committed remote document at {}", body.content.sha);

        Ok(body.content.sha)
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,

    #[serde(default)]
    content: String,

    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    content: UpdatedContent,
}

#[derive(Debug, Deserialize)]
struct UpdatedContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Commit message for a document update made at the given time.
pub fn commit_message(now: DateTime<Utc>) -> String {
    format!(
        "Update navigation data {}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn decode_content(body: &ContentsResponse) -> Result<String> {
    if body.encoding != "base64" {
        return Err(SyncError::Encoding(body.encoding.clone()));
    }

    // GitHub wraps base64 content at 60 columns.
    let packed: String = body
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    Ok(String::from_utf8(STANDARD.decode(packed)?)?)
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    Err(status_error(status, message))
}

fn status_error(status: StatusCode, message: String) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthorized,
        StatusCode::CONFLICT => SyncError::Conflict,
        _ => SyncError::Status {
            status: status.as_u16(),
            message,
        },
    }
}
