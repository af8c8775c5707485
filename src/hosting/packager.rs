// Turns a directory tree into a `.tar.gz` in the temp directory.

use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use tempfile::NamedTempFile;
use walkdir::{DirEntry, WalkDir};

use crate::error::DeployError;
use crate::hosting::archive::{ArchiveEntry, ArchiveWriter};
use crate::hosting::filter;
use crate::hosting::progress::CancelToken;

/// A finished archive. The file is deleted when this value is dropped
/// unless [`PackagedArchive::keep`] is called first.
#[derive(Debug)]
pub struct PackagedArchive {
    file: NamedTempFile,
    /// Compressed size in bytes.
    pub size: u64,
    /// Number of files archived.
    pub entries: usize,
}

impl PackagedArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the archive now, reporting failures instead of ignoring them
    /// the way drop does.
    pub fn remove(self) -> Result<(), DeployError> {
        let path = self.file.path().to_path_buf();
        self.file.close().map_err(|e| DeployError::io(path, e))
    }

    /// Persist the archive past the lifetime of this value.
    pub fn keep(self) -> Result<PathBuf, DeployError> {
        let path = self.file.path().to_path_buf();
        self.file
            .keep()
            .map(|(_, path)| path)
            .map_err(|e| DeployError::io(path, e.error))
    }
}

/// Packages directories into temporary archives.
#[derive(Debug, Clone, Default)]
pub struct Packager {
    temp_dir: Option<PathBuf>,
    cancel: CancelToken,
}

impl Packager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create archives in `dir` instead of the platform temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Archive every non-hidden file under `root`.
    ///
    /// # Errors
    /// `NotFound` if `root` does not exist (nothing is written in that
    /// case), `Io` if any file or the archive cannot be read or written,
    /// `Cancelled` if the token fires between entries. On error the
    /// temporary file is removed.
    pub fn package(&self, root: &Path) -> Result<PackagedArchive, DeployError> {
        if !root.exists() {
            return Err(DeployError::NotFound {
                path: root.to_path_buf(),
            });
        }
        let root = absolute_root(root).map_err(|e| DeployError::io(root, e))?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("appstax-").suffix(".tar.gz");
        let temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| DeployError::io(std::env::temp_dir(), e))?;
        let temp_path = temp.path().to_path_buf();

        let mut writer = ArchiveWriter::open(temp.as_file());
        write_tree(&root, &mut writer, &self.cancel)?;
        let entries = writer.len();
        let mut file = writer
            .finish()
            .map_err(|e| DeployError::io(&temp_path, e))?;
        file.flush().map_err(|e| DeployError::io(&temp_path, e))?;

        let size = std::fs::metadata(&temp_path)
            .map_err(|e| DeployError::io(&temp_path, e))?
            .len();
        tracing::info!(
            "Packaged {} files from {} into {} ({} bytes)",
            entries,
            root.display(),
            temp_path.display(),
            size
        );
        Ok(PackagedArchive {
            file: temp,
            size,
            entries,
        })
    }
}

/// Walk `root` in file-name order and write each included file.
/// Hidden directories are pruned so nothing under them is opened.
pub fn write_tree<W: Write>(
    root: &Path,
    writer: &mut ArchiveWriter<W>,
    cancel: &CancelToken,
) -> Result<(), DeployError> {
    tracing::debug!("Creating archive by walking from root path {}", root.display());
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !filter::is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            match e.into_io_error() {
                Some(io) => DeployError::io(path, io),
                None => DeployError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop detected"),
                ),
            }
        })?;
        if !filter::include(entry.file_name(), entry.file_type().is_dir()) {
            tracing::debug!("Ignoring path {}", entry.path().display());
            continue;
        }
        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }
        add_file(root, &entry, writer)?;
    }
    Ok(())
}

fn add_file<W: Write>(
    root: &Path,
    entry: &DirEntry,
    writer: &mut ArchiveWriter<W>,
) -> Result<(), DeployError> {
    let path = entry.path();
    let archive_path = archive_path(root, path)?;
    tracing::debug!("Adding file {} from {}", archive_path, path.display());

    let file = File::open(path).map_err(|e| DeployError::io(path, e))?;
    let metadata = file.metadata().map_err(|e| DeployError::io(path, e))?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    writer
        .write_entry(ArchiveEntry {
            path: archive_path,
            size: metadata.len(),
            mode: file_mode(&metadata),
            mtime,
            content: file,
        })
        .map_err(|e| DeployError::io(path, e))
}

/// Absolute form of `root` with `.` components dropped. Symlinks are not
/// resolved, so archive paths match what the user sees.
fn absolute_root(root: &Path) -> std::io::Result<PathBuf> {
    let abs = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    Ok(abs
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

/// `path` relative to `root`, joined with `/` on every platform. Names
/// that are not valid UTF-8 are rejected rather than rewritten.
pub fn archive_path(root: &Path, path: &Path) -> Result<String, DeployError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        DeployError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not under {}", root.display()),
            ),
        )
    })?;
    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                DeployError::io(
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "file name is not valid UTF-8",
                    ),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
