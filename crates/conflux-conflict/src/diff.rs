//! External diff tools for the interactive prompt
//!
//! Conflux never merges content; it only shows two candidates side by side
//! through whatever diff tool the operator has installed.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::ConflictError;

/// Known diff tools in order of preference, with their extra arguments
const DIFF_TOOLS: &[(&str, &[&str])] = &[
    ("meld", &[]),
    ("kdiff3", &[]),
    ("vimdiff", &[]),
    ("diff", &["--color=auto", "-u"]),
];

/// A diff tool resolved to an executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffTool {
    name: String,
    program: PathBuf,
}

impl DiffTool {
    /// Finds the diff tool to use
    ///
    /// A configured tool must exist; otherwise the first known tool found
    /// on `PATH` wins.
    pub fn detect(configured: Option<&str>) -> Result<Self, ConflictError> {
        let path = std::env::var_os("PATH").unwrap_or_default();
        Self::detect_in(configured, &path)
    }

    /// [`detect`](Self::detect) against an explicit search path
    pub fn detect_in(configured: Option<&str>, search_path: &OsStr) -> Result<Self, ConflictError> {
        if let Some(tool) = configured {
            return find_executable(tool, search_path)
                .map(|program| Self {
                    name: tool.to_string(),
                    program,
                })
                .ok_or_else(|| {
                    ConflictError::DiffToolNotFound(format!(
                        "configured diff tool '{tool}' not found in PATH"
                    ))
                });
        }

        DIFF_TOOLS
            .iter()
            .find_map(|(tool, _)| {
                find_executable(tool, search_path).map(|program| {
                    debug!(tool, program = %program.display(), "Detected diff tool");
                    Self {
                        name: tool.to_string(),
                        program,
                    }
                })
            })
            .ok_or_else(|| {
                ConflictError::DiffToolNotFound(
                    "no diff tool found; install meld, kdiff3, vimdiff or diff".to_string(),
                )
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shows `left` against `right`
    ///
    /// GUI tools are left running in the background; terminal tools block
    /// until the operator quits them.
    pub fn launch(&self, left: &Path, right: &Path) -> Result<(), ConflictError> {
        info!(
            tool = %self.name,
            left = %left.display(),
            right = %right.display(),
            "Launching diff tool"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(self.extra_args()).arg(left).arg(right);

        if self.is_gui() {
            cmd.spawn().map_err(|e| {
                ConflictError::DiffToolNotFound(format!("failed to launch {}: {e}", self.name))
            })?;
        } else {
            // diff exits 1 when files differ, which is not a failure here
            cmd.status().map_err(|e| {
                ConflictError::DiffToolNotFound(format!("failed to run {}: {e}", self.name))
            })?;
        }
        Ok(())
    }

    fn extra_args(&self) -> &'static [&'static str] {
        DIFF_TOOLS
            .iter()
            .find(|(name, _)| *name == self.name)
            .map(|(_, args)| *args)
            .unwrap_or(&[])
    }

    fn is_gui(&self) -> bool {
        matches!(self.name.as_str(), "meld" | "kdiff3" | "kompare" | "diffuse")
    }
}

/// Resolves a tool name (or path) to an executable file
fn find_executable(tool: &str, search_path: &OsStr) -> Option<PathBuf> {
    let direct = Path::new(tool);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }
    std::env::split_paths(search_path)
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
