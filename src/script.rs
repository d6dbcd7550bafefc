//! Script loading.
//!
//! A script is a text file with one command per line. Blank lines are
//! dropped here; comments are stripped when each line is staged.

use std::path::Path;

use crate::error::{Result, TelloError};

/// Reads script files into command lines.
#[cfg_attr(test, mockall::automock)]
pub trait ScriptSource: Send + Sync {
    /// Load the lines of the script at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TelloError::Script`] if the file cannot be read.
    fn load(&self, path: &str) -> Result<Vec<String>>;
}

/// Scripts read from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileScripts;

impl ScriptSource for FileScripts {
    fn load(&self, path: &str) -> Result<Vec<String>> {
        read_script(path)
    }
}

/// Read a script file.
///
/// # Errors
///
/// Returns [`TelloError::Script`] if the file cannot be read.
pub fn read_script<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| TelloError::Script {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(script_lines(&contents))
}

/// Split script text into trimmed, non-blank lines.
///
/// # Examples
///
/// ```
/// use tello_console::script::script_lines;
///
/// let lines = script_lines("takeoff\n\n  up 50  # climb\r\nland\n");
/// assert_eq!(lines, vec!["takeoff", "up 50  # climb", "land"]);
/// ```
#[must_use]
pub fn script_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
