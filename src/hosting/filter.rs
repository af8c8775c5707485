// Which filesystem entries go into a deployable archive.

use std::ffi::OsStr;

/// Names starting with `.` (`.git`, `.DS_Store`, `.env`, ...).
pub fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Directories are walked, never archived; hidden entries are skipped.
pub fn include(name: &OsStr, is_dir: bool) -> bool {
    !is_dir && !is_hidden(name)
}
