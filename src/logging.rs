// File logging for the CLI.
//
// The log path is decided once in `main` and the resulting `Logging`
// value is passed to whoever needs to mention it (error messages point
// users at the file). Nothing resolves or changes the path lazily.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding an `EnvFilter` directive for the log.
pub const LOG_FILTER_ENV: &str = "APPSTAX_LOG";

const DEFAULT_FILTER: &str = "debug,hyper=info,reqwest=info";

#[derive(Debug, Clone)]
pub struct Logging {
    path: PathBuf,
    echo_stderr: bool,
}

/// `<home>/.appstax/appstax.log`, or `appstax.log` in the working
/// directory when there is no home directory.
pub fn log_file_path(home: Option<&Path>) -> PathBuf {
    match home {
        Some(home) => home.join(".appstax").join("appstax.log"),
        None => PathBuf::from("appstax.log"),
    }
}

impl Logging {
    pub fn new(path: impl Into<PathBuf>, echo_stderr: bool) -> Self {
        Logging {
            path: path.into(),
            echo_stderr,
        }
    }

    /// Resolve the log location for this user.
    pub fn for_user(echo_stderr: bool) -> Self {
        Self::new(log_file_path(dirs::home_dir().as_deref()), echo_stderr)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the subscriber: every event goes to the log file, and to
    /// stderr as well when `echo_stderr` is set.
    pub fn subscriber(&self) -> Result<Box<dyn Subscriber + Send + Sync>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file {}", self.path.display()))?;

        let filter =
            EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        let stderr_layer = self
            .echo_stderr
            .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

        Ok(Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(stderr_layer),
        ))
    }

    /// Install the subscriber for the whole process.
    pub fn init(&self) -> Result<()> {
        tracing::subscriber::set_global_default(self.subscriber()?)
            .context("Logging was already initialized")?;
        if self.echo_stderr {
            tracing::info!("Log enabled");
        }
        Ok(())
    }
}
