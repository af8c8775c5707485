// `appstax.conf`: the per-project settings file kept next to the
// project's sources.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FILE_NAME: &str = "appstax.conf";
pub const DEFAULT_PUBLIC_DIR: &str = "./public";
pub const DEFAULT_SERVER_DIR: &str = "./server";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub app_key: String,
    #[serde(default)]
    pub public_dir: String,
    #[serde(default)]
    pub server_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_base_url: String,
}

/// The values `init` writes; everything else in the file is preserved.
#[derive(Debug, Clone, Default)]
pub struct ConfigValues {
    pub app_key: String,
    pub public_dir: String,
    pub server_dir: String,
}

impl Config {
    /// Location of the config file inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(FILE_NAME)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::path_in(dir).is_file()
    }

    /// Read the config in `dir`. A missing file yields the defaults.
    pub fn read(dir: &Path) -> Result<Config, ConfigError> {
        let path = Self::path_in(dir);
        let mut config = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)
                .map_err(|source| ConfigError::Parse { path: path.clone(), source })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Could not find {}", path.display());
                Config::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        config.insert_defaults();
        Ok(config)
    }

    /// Merge `values` into the config in `dir` and write it back.
    pub fn write(dir: &Path, values: &ConfigValues) -> Result<Config, ConfigError> {
        let path = Self::path_in(dir);
        let mut config = Self::read(dir)?;
        config.app_key = values.app_key.clone();
        config.public_dir = values.public_dir.clone();
        config.server_dir = values.server_dir.clone();
        config.insert_defaults();

        let encoded = config.to_pretty_json();
        std::fs::write(&path, &encoded).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Wrote config file: {}", encoded);
        Ok(config)
    }

    /// Directory holding the static files, resolved against `dir`.
    pub fn public_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.public_dir)
    }

    pub fn server_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.server_dir)
    }

    fn insert_defaults(&mut self) {
        if self.public_dir.is_empty() {
            self.public_dir = DEFAULT_PUBLIC_DIR.to_string();
        }
        if self.server_dir.is_empty() {
            self.server_dir = DEFAULT_SERVER_DIR.to_string();
        }
    }

    /// JSON with four-space indentation, the layout the file has always had.
    fn to_pretty_json(&self) -> String {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // Serializing plain strings into a Vec cannot fail.
        if self.serialize(&mut ser).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
