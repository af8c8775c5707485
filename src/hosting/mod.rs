// Hosting: packaging a directory into a `.tar.gz`, uploading it, and
// managing the hosted server.
//
// The pipeline, leaf first:
//
// - `filter`: which filesystem entries end up in an archive.
// - `archive`: tar over gzip, one entry at a time.
// - `packager`: walks a root directory into a temporary archive.
// - `upload`: streams a finished archive to the backend.
// - `deploy`: packages then uploads, for static files or server code.
//
// `server` wraps the server lifecycle endpoints.

pub mod archive;
pub mod deploy;
pub mod filter;
pub mod packager;
pub mod progress;
pub mod server;
pub mod upload;

pub use archive::{ArchiveEntry, ArchiveWriter};
pub use deploy::{DeployReport, DeployTarget, Deployer};
pub use packager::{PackagedArchive, Packager};
pub use progress::{CancelToken, NoProgress, ProgressSink};
pub use upload::upload_archive;
