// Package-then-upload for the two hosting targets.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::api::Transport;
use crate::error::DeployError;
use crate::hosting::packager::Packager;
use crate::hosting::progress::{CancelToken, ProgressSink};
use crate::hosting::upload::upload_archive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployTarget {
    /// Files served as-is from the app's subdomain.
    Static,
    /// Code run by the app's hosted server.
    Server,
}

impl DeployTarget {
    pub fn endpoint(self) -> &'static str {
        match self {
            DeployTarget::Static => "/appstax/hosting/static",
            DeployTarget::Server => "/appstax/hosting/server/code",
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployTarget::Static => write!(f, "static files"),
            DeployTarget::Server => write!(f, "server code"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub target: DeployTarget,
    /// Files in the uploaded archive.
    pub entries: usize,
    /// Compressed archive size in bytes.
    pub archive_size: u64,
}

/// Packages a directory and uploads it through `transport`.
///
/// The temporary archive is deleted once the upload finishes, whether it
/// succeeded or not. With [`Deployer::keep_failed_artifacts`] a failed
/// upload keeps the archive and the error says where it is.
pub struct Deployer<'a, T: Transport + ?Sized> {
    transport: &'a T,
    packager: Packager,
    cancel: CancelToken,
    keep_failed_artifacts: bool,
}

impl<'a, T: Transport + ?Sized> Deployer<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Deployer {
            transport,
            packager: Packager::new(),
            cancel: CancelToken::new(),
            keep_failed_artifacts: false,
        }
    }

    pub fn with_packager(mut self, packager: Packager) -> Self {
        self.packager = packager.with_cancel(self.cancel.clone());
        self
    }

    /// Use `cancel` for both packaging and uploading.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.packager = self.packager.with_cancel(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub fn keep_failed_artifacts(mut self, keep: bool) -> Self {
        self.keep_failed_artifacts = keep;
        self
    }

    pub fn deploy_static(
        &self,
        root: &Path,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DeployReport, DeployError> {
        self.deploy(DeployTarget::Static, root, progress)
    }

    pub fn deploy_server(
        &self,
        root: &Path,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DeployReport, DeployError> {
        self.deploy(DeployTarget::Server, root, progress)
    }

    /// Package `root` and upload it to `target`. Nothing is sent if
    /// packaging fails.
    pub fn deploy(
        &self,
        target: DeployTarget,
        root: &Path,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DeployReport, DeployError> {
        tracing::info!("Deploying {} from {}", target, root.display());
        let archive = self.packager.package(root)?;
        let report = DeployReport {
            target,
            entries: archive.entries,
            archive_size: archive.size,
        };

        match upload_archive(
            self.transport,
            target.endpoint(),
            archive.path(),
            progress,
            &self.cancel,
        ) {
            Ok(_) => {
                if let Err(e) = archive.remove() {
                    tracing::warn!("Could not remove uploaded archive: {}", e);
                }
                tracing::info!("Deployed {} ({} files)", target, report.entries);
                Ok(report)
            }
            Err(e) if self.keep_failed_artifacts => {
                let kept_at = archive.keep()?;
                tracing::warn!("Upload failed, archive kept at {}", kept_at.display());
                Err(DeployError::UploadFailed {
                    kept_at,
                    source: Box::new(e),
                })
            }
            Err(e) => {
                if let Err(rm) = archive.remove() {
                    tracing::warn!("Could not remove failed archive: {}", rm);
                }
                Err(e)
            }
        }
    }
}
