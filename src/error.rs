// Error types shared by the API client and the deploy pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the Appstax backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (DNS, connect, TLS, body stream).
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Request failed: {status} - {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local I/O while preparing a request.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lookup that the backend answered but that matched nothing.
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    /// Status code of a rejected request, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised by packaging and uploading a deployable archive.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The directory to package does not exist.
    #[error("Directory not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Reading a source file or writing the archive failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload request failed.
    #[error("Upload failed: {0}")]
    Network(#[from] ApiError),

    /// The job was cancelled between entries or upload chunks.
    #[error("Operation cancelled")]
    Cancelled,

    /// The upload failed and the archive was kept on disk for inspection.
    #[error("Upload failed, archive kept at {}: {source}", kept_at.display())]
    UploadFailed {
        kept_at: PathBuf,
        #[source]
        source: Box<DeployError>,
    },
}

impl DeployError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_for_rejected_requests() {
        let err = ApiError::Status {
            status: 404,
            body: "nope".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Request failed: 404 - nope");
        assert_eq!(ApiError::NotFound("App not found".into()).status(), None);
    }

    #[test]
    fn test_deploy_error_messages_name_the_path() {
        let err = DeployError::NotFound {
            path: PathBuf::from("/tmp/missing"),
        };
        assert_eq!(err.to_string(), "Directory not found: /tmp/missing");

        let err = DeployError::io(
            "/tmp/a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("I/O error at /tmp/a.txt"));
    }
}
