use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::dto::{
    BlobResponse, CommitInfo, ContentHash, DeleteContentRequest, DeleteResponse, ErrorBody,
    FileMeta, FileOrDir, PutContentRequest, Versioned, WriteOutcome, WriteResponse,
};
use crate::codec;
use crate::config::{Identity, RepoConfig};
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

/// Whether a failed call was reading or changing the repository. A 403 means
/// "too large" on reads and "no permission" on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Read,
    Write,
}

/// The one place remote status codes become [`Error`] values.
pub(crate) fn status_error(
    status: StatusCode,
    kind: CallKind,
    path: &str,
    expected: Option<&ContentHash>,
    message: String,
) -> Error {
    let path = path.to_string();
    match (status, kind) {
        (StatusCode::NOT_FOUND, _) => Error::NotFound { path },
        (StatusCode::FORBIDDEN, CallKind::Read) => Error::TooLarge { path },
        (StatusCode::FORBIDDEN, CallKind::Write) => Error::NoPermission { path },
        (StatusCode::CONFLICT, CallKind::Write) => Error::Conflict {
            path,
            expected: expected.cloned(),
            message,
        },
        // Creating over an existing file without presenting its hash.
        (StatusCode::UNPROCESSABLE_ENTITY, CallKind::Write) if expected.is_none() => {
            Error::Conflict {
                path,
                expected: None,
                message,
            }
        }
        _ => Error::Unknown {
            status: Some(status.as_u16()),
            message: format!("{path}: {message}"),
        },
    }
}

/// Failures that never produced a usable response: refused connections,
/// timeouts, truncated bodies.
pub(crate) fn transport_error(path: &str, err: &reqwest::Error) -> Error {
    Error::Unknown {
        status: err.status().map(|s| s.as_u16()),
        message: format!("{path}: {err}"),
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Base64 body of a file entry. Files above the inline ceiling come back
/// without a body, which is reported as [`Error::TooLarge`].
pub fn file_body(meta: &FileMeta) -> Result<Vec<u8>> {
    if meta.encoding.as_deref() == Some("none") {
        return Err(Error::TooLarge {
            path: meta.path.clone(),
        });
    }
    match meta.content.as_deref() {
        Some(content) => codec::decode(content),
        None => Ok(Vec::new()),
    }
}

/// Thin async client over the repository contents API.
#[derive(Clone)]
pub struct ContentClient {
    http: Client,
    repo_url: String,
    token: String,
    branch: String,
    message_prefix: String,
    identity: Identity,
}

impl ContentClient {
    pub fn new(config: &RepoConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(
            "x-github-api-version",
            header::HeaderValue::from_static(API_VERSION),
        );

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("repodb/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            repo_url: format!(
                "{}/repos/{}/{}",
                config.api_url,
                urlencoding::encode(&config.owner),
                urlencoding::encode(&config.repo)
            ),
            token: config.token.clone(),
            branch: config.branch.clone(),
            message_prefix: config.message_prefix.clone(),
            identity: config.committer.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<_> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(urlencoding::encode)
            .collect();
        format!("{}/contents/{}", self.repo_url, encoded.join("/"))
    }

    fn commit_message(&self, message: &str) -> String {
        if self.message_prefix.is_empty() {
            message.to_string()
        } else {
            format!("{} {message}", self.message_prefix)
        }
    }

    async fn send(&self, req: RequestBuilder, path: &str) -> Result<Response> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport_error(path, &e))?;
        Ok(resp)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: Response,
        kind: CallKind,
        path: &str,
        expected: Option<&ContentHash>,
    ) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await.map_err(|e| transport_error(path, &e))?;
            return serde_json::from_slice(&bytes).map_err(|e| Error::Unknown {
                status: Some(status.as_u16()),
                message: format!("{path}: unexpected response body: {e}"),
            });
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        let err = status_error(status, kind, path, expected, message);
        if err.is_not_found() {
            debug!("{} on {path}: {err}", status.as_u16());
        } else {
            warn!("{} failed on {path}: {err}", status.as_u16());
        }
        Err(err)
    }

    /// Raw blob by content hash, parsed as JSON. Not subject to the inline
    /// size ceiling of [`Self::fetch_file_or_dir`].
    pub async fn fetch_blob(
        &self,
        hash: &ContentHash,
        cancel: &CancellationToken,
    ) -> Result<Versioned<Value>> {
        cancellable(cancel, async {
            let path = format!("git/blobs/{hash}");
            let url = format!("{}/{path}", self.repo_url);
            debug!("GET {path}");

            let resp = self.send(self.http.get(&url), &path).await?;
            let blob: BlobResponse = self
                .handle_response(resp, CallKind::Read, &path, None)
                .await?;

            let bytes = match blob.encoding.as_deref() {
                Some("utf-8") => blob.content.into_bytes(),
                _ => codec::decode(&blob.content)?,
            };
            Ok(Versioned {
                content: codec::parse_json_body(&bytes)?,
                hash: blob.sha,
            })
        })
        .await
    }

    /// A file with its body, or a directory listing, depending on what
    /// `path` addresses.
    pub async fn fetch_file_or_dir(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<FileOrDir> {
        cancellable(cancel, async {
            debug!("GET contents {path}");
            let req = self
                .http
                .get(self.contents_url(path))
                .query(&[("ref", self.branch.as_str())]);
            let resp = self.send(req, path).await?;
            self.handle_response(resp, CallKind::Read, path, None).await
        })
        .await
    }

    pub async fn fetch_file(&self, path: &str, cancel: &CancellationToken) -> Result<FileMeta> {
        match self.fetch_file_or_dir(path, cancel).await? {
            FileOrDir::File(meta) => Ok(meta),
            FileOrDir::Dir(_) => Err(Error::Unknown {
                status: None,
                message: format!("{path}: expected a file, found a directory"),
            }),
        }
    }

    pub async fn fetch_dir(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileMeta>> {
        match self.fetch_file_or_dir(path, cancel).await? {
            FileOrDir::Dir(entries) => Ok(entries),
            FileOrDir::File(_) => Err(Error::Unknown {
                status: None,
                message: format!("{path}: expected a directory, found a file"),
            }),
        }
    }

    /// Fetches a file and decodes its body as JSON.
    pub async fn fetch_json(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Versioned<Value>> {
        let meta = self.fetch_file(path, cancel).await?;
        let bytes = file_body(&meta)?;
        Ok(Versioned {
            content: codec::parse_json_body(&bytes)?,
            hash: meta.sha,
        })
    }

    /// Creates `path` when `expected` is `None`, otherwise replaces it if the
    /// remote still holds `expected`. Each call is one commit.
    pub async fn create_or_update(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&ContentHash>,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome> {
        cancellable(cancel, async {
            debug!("PUT contents {path} (expected {expected:?})");
            let body = PutContentRequest {
                message: self.commit_message(message),
                content: codec::encode(content),
                sha: expected.map(ContentHash::as_str),
                branch: &self.branch,
                committer: &self.identity,
                author: &self.identity,
            };
            let req = self.http.put(self.contents_url(path)).json(&body);
            let resp = self.send(req, path).await?;
            let written: WriteResponse = self
                .handle_response(resp, CallKind::Write, path, expected)
                .await?;

            let hash = written.content.map(|c| c.sha).ok_or_else(|| Error::Unknown {
                status: None,
                message: format!("{path}: write response carried no content hash"),
            })?;
            Ok(WriteOutcome {
                hash,
                commit: written.commit,
            })
        })
        .await
    }

    pub async fn delete(
        &self,
        path: &str,
        expected: &ContentHash,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<CommitInfo> {
        cancellable(cancel, async {
            debug!("DELETE contents {path} (expected {expected})");
            let body = DeleteContentRequest {
                message: self.commit_message(message),
                sha: expected.as_str(),
                branch: &self.branch,
                committer: &self.identity,
                author: &self.identity,
            };
            let req = self.http.delete(self.contents_url(path)).json(&body);
            let resp = self.send(req, path).await?;
            let deleted: DeleteResponse = self
                .handle_response(resp, CallKind::Write, path, Some(expected))
                .await?;
            Ok(deleted.commit)
        })
        .await
    }
}
