// API client module: a small blocking HTTP client that talks to the
// Appstax backend, plus the `Transport` trait the account and hosting
// modules are written against. Tests swap in their own `Transport`.

use crate::error::ApiError;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;

/// Fallback backend when neither the environment nor `appstax.conf`
/// names one.
pub const DEFAULT_BASE_URL: &str = "https://appstax.com/api/latest";

/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "APPSTAX_API_URL";

pub const SESSION_HEADER: &str = "x-appstax-sessionid";
pub const APP_KEY_HEADER: &str = "x-appstax-appkey";

/// A completed HTTP exchange with a success status.
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Streaming body for a file upload. `len` is the exact number of bytes
/// `reader` yields.
pub struct UploadBody {
    pub file_name: String,
    pub len: u64,
    pub reader: Box<dyn Read + Send>,
}

/// The operations the rest of the crate needs from the backend. Paths
/// are relative to the API base URL and start with `/`.
pub trait Transport {
    fn get(&self, path: &str) -> Result<ApiResponse, ApiError>;
    fn post(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError>;
    fn put(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError>;
    fn delete(&self, path: &str) -> Result<ApiResponse, ApiError>;
    /// Upload one file as `multipart/form-data` under the field `file`.
    fn post_file(&self, path: &str, body: UploadBody) -> Result<ApiResponse, ApiError>;
}

/// Blocking client holding a reqwest client, the base URL of the backend
/// and the optional session id and app key sent with every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session_id: Option<String>,
    app_key: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url`. Uploads can take a while, so no
    /// overall request timeout is set.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an already configured reqwest client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ApiClient {
            client,
            base_url,
            session_id: None,
            app_key: None,
        }
    }

    /// Pick the base URL from `APPSTAX_API_URL`, then the configured
    /// `apiBaseUrl`, then `DEFAULT_BASE_URL`.
    pub fn from_env(configured: Option<&str>) -> Result<Self, ApiError> {
        let base_url = resolve_base_url(std::env::var(BASE_URL_ENV).ok().as_deref(), configured);
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store a session id for subsequent authenticated requests.
    pub fn set_session(&mut self, session_id: &str) {
        self.session_id = Some(session_id.to_string());
    }

    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn set_app_key(&mut self, app_key: &str) {
        if app_key.is_empty() {
            self.app_key = None;
        } else {
            self.app_key = Some(app_key.to_string());
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Session and app key headers for the current client state.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(session) = &self.session_id {
            if let Ok(val) = HeaderValue::from_str(session) {
                headers.insert(SESSION_HEADER, val);
            }
        }
        if let Some(key) = &self.app_key {
            if let Ok(val) = HeaderValue::from_str(key) {
                headers.insert(APP_KEY_HEADER, val);
            }
        }
        headers
    }

    /// Send a prepared request and turn non-success statuses into
    /// `ApiError::Status` carrying the response body.
    fn send(&self, req: RequestBuilder) -> Result<ApiResponse, ApiError> {
        let res = req.headers(self.auth_headers()).send()?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes()?.to_vec();
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "response received");
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(ApiResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

impl Transport for ApiClient {
    fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        tracing::debug!("GET {}", path);
        self.send(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError> {
        tracing::debug!("POST {}", path);
        self.send(self.client.post(self.url(path)).json(body))
    }

    fn put(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError> {
        tracing::debug!("PUT {}", path);
        self.send(self.client.put(self.url(path)).json(body))
    }

    fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        tracing::debug!("DELETE {}", path);
        self.send(self.client.delete(self.url(path)))
    }

    fn post_file(&self, path: &str, body: UploadBody) -> Result<ApiResponse, ApiError> {
        tracing::debug!("POST {} ({} bytes from {})", path, body.len, body.file_name);
        let part = multipart::Part::reader_with_length(body.reader, body.len)
            .file_name(body.file_name)
            .mime_str("application/gzip")?;
        let form = multipart::Form::new().part("file", part);
        self.send(self.client.post(self.url(path)).multipart(form))
    }
}

/// Env var wins over the configured value; blanks count as unset.
pub fn resolve_base_url(env: Option<&str>, configured: Option<&str>) -> String {
    env.filter(|s| !s.trim().is_empty())
        .or(configured.filter(|s| !s.trim().is_empty()))
        .unwrap_or(DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string()
}
