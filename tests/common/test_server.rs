use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;

use repodb::RepoConfig;

pub const TOKEN: &str = "test-token";
pub const OWNER: &str = "octo";
pub const REPO: &str = "data";
pub const ROOT: &str = "dbs";

/// The remote wraps base64 bodies at 60 columns.
const WRAP: usize = 60;

#[derive(Debug, Clone)]
pub struct RecordedCommit {
    pub message: String,
    pub branch: String,
    pub author: String,
}

#[derive(Default)]
struct Repo {
    files: BTreeMap<String, Vec<u8>>,
    inline_limit: Option<usize>,
    read_only: bool,
    stall: bool,
    requests: Vec<String>,
    commits: Vec<RecordedCommit>,
}

type Shared = Arc<Mutex<Repo>>;

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn wrapped_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / WRAP + 1);
    for chunk in encoded.as_bytes().chunks(WRAP) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 is ascii"));
        out.push('\n');
    }
    out
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

fn file_entry(path: &str, bytes: &[u8]) -> Value {
    json!({
        "type": "file",
        "name": name_of(path),
        "path": path,
        "sha": content_hash(bytes),
        "size": bytes.len(),
    })
}

fn commit_json(repo: &Repo, message: &str) -> Value {
    let sha = content_hash(format!("commit {} {message}", repo.commits.len()).as_bytes());
    json!({
        "sha": sha,
        "html_url": format!("https://github.com/{OWNER}/{REPO}/commit/{sha}"),
        "message": message,
        "author": {
            "name": repo.commits.last().map(|c| c.author.clone()).unwrap_or_default(),
            "email": "bot@example.com",
            "date": "2024-01-01T00:00:00Z",
        },
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn gate(state: &Shared, headers: &HeaderMap, request: String) -> Option<Response> {
    let stall = {
        let mut repo = state.lock().expect("lock");
        repo.requests.push(request);
        repo.stall
    };
    if stall {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    if !authorized(headers) {
        return Some(error(StatusCode::UNAUTHORIZED, "Bad credentials"));
    }
    None
}

async fn get_contents(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
) -> Response {
    if let Some(resp) = gate(&state, &headers, format!("GET contents {path}")).await {
        return resp;
    }
    let repo = state.lock().expect("lock");

    if let Some(bytes) = repo.files.get(&path) {
        if repo.inline_limit.is_some_and(|limit| bytes.len() > limit) {
            return error(
                StatusCode::FORBIDDEN,
                "This API returns blobs up to 1 MB in size. The requested blob is too large to fetch via the API, but you can use the Git Data API to request blobs up to 100 MB in size.",
            );
        }
        let mut entry = file_entry(&path, bytes);
        entry["content"] = json!(wrapped_base64(bytes));
        entry["encoding"] = json!("base64");
        return Json(entry).into_response();
    }

    let prefix = format!("{path}/");
    let mut entries: BTreeMap<String, Value> = BTreeMap::new();
    for (file_path, bytes) in repo.files.range(prefix.clone()..) {
        let Some(rest) = file_path.strip_prefix(&prefix) else {
            break;
        };
        match rest.split_once('/') {
            None => {
                entries.insert(rest.to_string(), file_entry(file_path, bytes));
            }
            Some((dir, _)) => {
                let dir_path = format!("{prefix}{dir}");
                let sha = content_hash(dir_path.as_bytes());
                entries.entry(dir.to_string()).or_insert_with(|| {
                    json!({
                        "type": "dir",
                        "name": dir,
                        "path": dir_path,
                        "sha": sha,
                        "size": 0,
                    })
                });
            }
        }
    }

    if entries.is_empty() {
        return error(StatusCode::NOT_FOUND, "Not Found");
    }
    Json(Value::Array(entries.into_values().collect())).into_response()
}

async fn get_blob(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_owner, _repo, sha)): Path<(String, String, String)>,
) -> Response {
    if let Some(resp) = gate(&state, &headers, format!("GET blob {sha}")).await {
        return resp;
    }
    let repo = state.lock().expect("lock");
    match repo.files.values().find(|bytes| content_hash(bytes) == sha) {
        Some(bytes) => Json(json!({
            "sha": sha,
            "size": bytes.len(),
            "content": wrapped_base64(bytes),
            "encoding": "base64",
        }))
        .into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

#[derive(Debug, Deserialize)]
struct PutBody {
    message: String,
    content: String,
    sha: Option<String>,
    branch: String,
    author: Identity,
}

#[derive(Debug, Deserialize)]
struct DeleteBody {
    message: String,
    sha: String,
    branch: String,
    author: Identity,
}

#[derive(Debug, Deserialize)]
struct Identity {
    name: String,
}

async fn put_contents(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<PutBody>,
) -> Response {
    if let Some(resp) = gate(&state, &headers, format!("PUT contents {path}")).await {
        return resp;
    }
    let mut repo = state.lock().expect("lock");
    if repo.read_only {
        return error(
            StatusCode::FORBIDDEN,
            "Resource not accessible by personal access token",
        );
    }

    let current = repo.files.get(&path).map(|bytes| content_hash(bytes));
    match (&current, &body.sha) {
        (Some(_), None) => {
            return error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid request.\n\n\"sha\" wasn't supplied.",
            );
        }
        (Some(current), Some(given)) if current != given => {
            return error(StatusCode::CONFLICT, format!("{path} does not match {given}"));
        }
        (None, Some(given)) => {
            return error(StatusCode::CONFLICT, format!("{path} does not match {given}"));
        }
        _ => {}
    }

    let Ok(bytes) = STANDARD.decode(&body.content) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "content is not valid Base64");
    };
    let status = if current.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    repo.commits.push(RecordedCommit {
        message: body.message.clone(),
        branch: body.branch,
        author: body.author.name,
    });
    let content = file_entry(&path, &bytes);
    repo.files.insert(path, bytes);
    let commit = commit_json(&repo, &body.message);

    (status, Json(json!({ "content": content, "commit": commit }))).into_response()
}

async fn delete_contents(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<DeleteBody>,
) -> Response {
    if let Some(resp) = gate(&state, &headers, format!("DELETE contents {path}")).await {
        return resp;
    }
    let mut repo = state.lock().expect("lock");
    if repo.read_only {
        return error(
            StatusCode::FORBIDDEN,
            "Resource not accessible by personal access token",
        );
    }

    let Some(current) = repo.files.get(&path).map(|bytes| content_hash(bytes)) else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };
    if current != body.sha {
        return error(
            StatusCode::CONFLICT,
            format!("{path} does not match {}", body.sha),
        );
    }

    repo.files.remove(&path);
    repo.commits.push(RecordedCommit {
        message: body.message.clone(),
        branch: body.branch,
        author: body.author.name,
    });
    let commit = commit_json(&repo, &body.message);

    Json(json!({ "content": null, "commit": commit })).into_response()
}

/// In-process stand-in for the repository contents API, backed by an
/// in-memory file map.
pub struct TestServer {
    pub base_url: String,
    state: Shared,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        super::init_tracing();

        let state: Shared = Arc::default();
        let router = Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(get_contents).put(put_contents).delete(delete_contents),
            )
            .route("/repos/{owner}/{repo}/git/blobs/{sha}", get(get_blob))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            state,
            handle,
        }
    }

    pub fn config(&self) -> RepoConfig {
        RepoConfig::new(TOKEN, OWNER, REPO, ROOT)
            .expect("config")
            .with_api_url(&self.base_url)
    }

    pub fn put_file(&self, path: &str, bytes: impl Into<Vec<u8>>) -> String {
        let bytes = bytes.into();
        let hash = content_hash(&bytes);
        self.state
            .lock()
            .expect("lock")
            .files
            .insert(path.to_string(), bytes);
        hash
    }

    pub fn put_json(&self, path: &str, value: &Value) -> String {
        self.put_file(path, serde_json::to_vec(value).expect("serialize"))
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().expect("lock").files.get(path).cloned()
    }

    pub fn file_string(&self, path: &str) -> Option<String> {
        self.file(path)
            .map(|bytes| String::from_utf8(bytes).expect("utf-8 file"))
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().expect("lock").requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().expect("lock").requests.clear();
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.state.lock().expect("lock").commits.clone()
    }

    /// Files larger than `limit` bytes are refused by the contents endpoint.
    pub fn set_inline_limit(&self, limit: usize) {
        self.state.lock().expect("lock").inline_limit = Some(limit);
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().expect("lock").read_only = read_only;
    }

    /// Every request hangs long enough for a caller to cancel it.
    pub fn set_stall(&self, stall: bool) {
        self.state.lock().expect("lock").stall = stall;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
