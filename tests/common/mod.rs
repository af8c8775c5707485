// Shared test helpers: an in-memory `Transport` and archive readers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::path::Path;

use appstax_cli::api::{ApiResponse, Transport, UploadBody};
use appstax_cli::error::ApiError;
use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Reply {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// Scripted backend. Replies are queued per `METHOD path`; an unscripted
/// request gets a 404.
#[derive(Default)]
pub struct FakeTransport {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    pub calls: RefCell<Vec<Call>>,
    /// Bytes received by each `post_file`, with the file name sent.
    pub uploads: RefCell<Vec<(String, String, Vec<u8>)>>,
    /// Read the upload body in chunks of this size.
    pub chunk_size: usize,
}

impl FakeTransport {
    pub fn new() -> Self {
        FakeTransport {
            chunk_size: 1024,
            ..Default::default()
        }
    }

    pub fn reply(&self, method: &str, path: &str, reply: Reply) -> &Self {
        self.replies
            .borrow_mut()
            .entry(format!("{} {}", method, path))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn answer(
        &self,
        method: &'static str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, ApiError> {
        self.calls.borrow_mut().push(Call {
            method,
            path: path.to_string(),
            body,
        });
        let reply = self
            .replies
            .borrow_mut()
            .get_mut(&format!("{} {}", method, path))
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Reply::status(404, "not scripted"));
        if !(200..300).contains(&reply.status) {
            return Err(ApiError::Status {
                status: reply.status,
                body: reply.body,
            });
        }
        let mut headers = HeaderMap::new();
        for (name, value) in reply.headers {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(&value).unwrap(),
            );
        }
        Ok(ApiResponse {
            status: reply.status,
            headers,
            body: reply.body.into_bytes(),
        })
    }
}

impl Transport for FakeTransport {
    fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.answer("GET", path, None)
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError> {
        self.answer("POST", path, Some(body.clone()))
    }

    fn put(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError> {
        self.answer("PUT", path, Some(body.clone()))
    }

    fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.answer("DELETE", path, None)
    }

    fn post_file(&self, path: &str, mut body: UploadBody) -> Result<ApiResponse, ApiError> {
        let mut received = Vec::new();
        let mut buf = vec![0u8; self.chunk_size.max(1)];
        loop {
            let n = body.reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received.len() as u64, body.len, "declared length matches body");
        self.uploads
            .borrow_mut()
            .push((path.to_string(), body.file_name, received));
        self.answer("POST", path, None)
    }
}

/// (path, size, content) of every entry in a `.tar.gz` byte buffer.
pub fn entries_of(gz: &[u8]) -> Vec<(String, u64, Vec<u8>)> {
    let mut archive = tar::Archive::new(GzDecoder::new(gz));
    archive
        .entries()
        .unwrap()
        .map(|e| {
            let mut e = e.unwrap();
            let path = e.path().unwrap().to_string_lossy().into_owned();
            let size = e.header().size().unwrap();
            let mut data = Vec::new();
            e.read_to_end(&mut data).unwrap();
            (path, size, data)
        })
        .collect()
}

pub fn entries_of_file(path: &Path) -> Vec<(String, u64, Vec<u8>)> {
    entries_of(&std::fs::read(path).unwrap())
}

/// Write `contents` at `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}
