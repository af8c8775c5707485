// Decisions behind the interactive prompts, kept free of terminal I/O so
// they can be tested directly. `ui` gathers the input and acts on the
// result.

use std::path::Path;

use crate::config::DEFAULT_PUBLIC_DIR;
use crate::hosting::DeployTarget;

/// What the user picked from the app menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppChoice {
    /// Index into the list of existing apps.
    Existing(usize),
    CreateNew,
}

/// Map a zero-based menu index to a choice. The menu lists the existing
/// apps followed by a single "Create a new app" item; anything past that
/// is rejected so the caller can ask again. With no apps the only choice
/// is to create one.
pub fn choose_app(app_count: usize, selected: usize) -> Option<AppChoice> {
    if selected < app_count {
        Some(AppChoice::Existing(selected))
    } else if selected == app_count {
        Some(AppChoice::CreateNew)
    } else {
        None
    }
}

/// Labels for the app menu, in the order `choose_app` expects.
pub fn app_menu_items<'a>(app_names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut items: Vec<String> = app_names.into_iter().map(str::to_string).collect();
    items.push("Create a new app".to_string());
    items
}

/// Directory typed by the user, or the default when left blank.
pub fn public_dir_or_default(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        DEFAULT_PUBLIC_DIR.to_string()
    } else {
        trimmed.to_string()
    }
}

/// CORS origin allowed for a hosting subdomain.
pub fn hosting_origin(subdomain: &str) -> String {
    format!("http://{}.appstax.io", subdomain)
}

/// Result of one attempt at configuring a hosting subdomain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubdomainOutcome {
    Configured,
    /// Ask again; the messages explain what failed.
    Retry(Vec<String>),
}

/// Both saving the app and registering its origin must succeed.
pub fn subdomain_outcome<E: std::fmt::Display>(
    save: Result<(), E>,
    cors: Result<(), E>,
) -> SubdomainOutcome {
    let errors: Vec<String> = [save, cors]
        .into_iter()
        .filter_map(|r| r.err().map(|e| e.to_string()))
        .collect();
    if errors.is_empty() {
        SubdomainOutcome::Configured
    } else {
        SubdomainOutcome::Retry(errors)
    }
}

pub const DEFAULT_LOG_LINES: u64 = 10;

/// Number of log lines requested on the command line; anything that is
/// not a positive number falls back to the default.
pub fn log_line_count(arg: Option<&str>) -> u64 {
    arg.and_then(|a| a.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LOG_LINES)
}

/// Which deploy scope the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployScope {
    Static,
    Server,
    /// Static files, plus server code if the server directory exists.
    #[default]
    All,
}

pub fn deploy_targets(scope: DeployScope, server_dir: &Path) -> Vec<DeployTarget> {
    match scope {
        DeployScope::Static => vec![DeployTarget::Static],
        DeployScope::Server => vec![DeployTarget::Server],
        DeployScope::All if server_dir.is_dir() => {
            vec![DeployTarget::Static, DeployTarget::Server]
        }
        DeployScope::All => vec![DeployTarget::Static],
    }
}
