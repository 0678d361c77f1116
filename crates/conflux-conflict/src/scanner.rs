//! Single-pass tree scanner
//!
//! Walks a synchronized folder once, classifies every regular file by name and
//! stats each conflict copy together with its original. Unreadable entries
//! become [`ClassifyWarning`]s instead of aborting the walk.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use conflux_core::config::{
    backup_dir_problem, normalize_backup_dir, Config, DEFAULT_MARKER,
};
use conflux_core::domain::{ConflictArtifact, FileStat};
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::classifier::PathClassifier;
use crate::error::ScanError;

/// Settings that shape a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Glob patterns matched against root-relative paths and bare names
    pub exclude: Vec<String>,
    /// Refuse roots lacking `marker`
    pub require_marker: bool,
    pub marker: String,
    /// Backup directory, relative to the root; never scanned
    pub backup_dir: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude: vec![".stversions".to_string()],
            require_marker: false,
            marker: DEFAULT_MARKER.to_string(),
            backup_dir: None,
        }
    }
}

impl ScanOptions {
    /// Derives scan options from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            exclude: config.scan.exclude.clone(),
            require_marker: config.scan.require_marker,
            marker: config.scan.marker.clone(),
            backup_dir: config.execution.backup_dir.clone(),
        }
    }
}

/// A file that was skipped because it could not be inspected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifyWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Counters accumulated by one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files_visited: u64,
    pub artifacts: u64,
    pub excluded: u64,
    pub warnings: Vec<ClassifyWarning>,
    pub cancelled: bool,
}

/// A conflict copy paired with the stat of its original (`None` when absent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedArtifact {
    pub artifact: ConflictArtifact,
    pub original: Option<FileStat>,
}

/// Scanner bound to a validated root
#[derive(Debug, Clone)]
pub struct TreeScanner {
    root: PathBuf,
    exclude: Vec<Pattern>,
    backup_dir: Option<PathBuf>,
    cancel: CancellationToken,
}

impl TreeScanner {
    /// Validates the root and compiles exclusion patterns
    ///
    /// The root is canonicalized here, once; every artifact path produced
    /// later is absolute.
    pub fn new(
        root: &Path,
        options: &ScanOptions,
        cancel: CancellationToken,
    ) -> Result<Self, ScanError> {
        let root = match root.canonicalize() {
            Ok(root) => root,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ScanError::RootNotFound(root.to_path_buf()))
            }
            Err(source) => {
                return Err(ScanError::Unreadable {
                    path: root.to_path_buf(),
                    source,
                })
            }
        };

        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root));
        }

        if options.require_marker && !root.join(&options.marker).exists() {
            return Err(ScanError::MissingMarker {
                root,
                marker: options.marker.clone(),
            });
        }

        let exclude = options
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let backup_dir = match options.backup_dir.as_deref() {
            Some(dir) => match backup_dir_problem(dir) {
                Some(reason) => {
                    return Err(ScanError::InvalidBackupDir {
                        dir: dir.to_string(),
                        reason,
                    })
                }
                None => normalize_backup_dir(Path::new(dir)),
            },
            None => None,
        };

        Ok(Self {
            root,
            exclude,
            backup_dir,
            cancel,
        })
    }

    /// Canonical scan root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a fresh walk of the tree
    pub fn scan(&self) -> Scan<'_> {
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        Scan {
            scanner: self,
            walker,
            stats: ScanStats::default(),
        }
    }

    /// Walks the whole tree and returns every artifact with the final stats
    pub fn collect(&self) -> (Vec<ScannedArtifact>, ScanStats) {
        let mut scan = self.scan();
        let artifacts = scan.by_ref().collect();
        (artifacts, scan.into_stats())
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        if let Some(backup) = &self.backup_dir {
            if relative.starts_with(backup) {
                return true;
            }
        }

        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        let name = relative.file_name().map(Path::new);
        self.exclude.iter().any(|pattern| {
            pattern.matches_path_with(relative, options)
                || name.is_some_and(|n| pattern.matches_path_with(n, options))
        })
    }
}

/// Lazy, one-pass iterator over the conflict copies under a root
pub struct Scan<'a> {
    scanner: &'a TreeScanner,
    walker: walkdir::IntoIter,
    stats: ScanStats,
}

impl Scan<'_> {
    /// Counters so far
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }

    fn warn(&mut self, path: PathBuf, reason: String) {
        warn!(path = %path.display(), reason = %reason, "Skipping unreadable entry");
        self.stats.warnings.push(ClassifyWarning { path, reason });
    }

    fn inspect(&mut self, path: &Path, metadata: std::fs::Metadata) -> Option<ScannedArtifact> {
        let name = PathClassifier::classify(path)?;

        let original = match std::fs::symlink_metadata(name.original_path()) {
            Ok(meta) if meta.is_file() => Some(file_stat(&meta)),
            Ok(_) => {
                self.warn(
                    path.to_path_buf(),
                    format!(
                        "original {} is not a regular file",
                        name.original_path().display()
                    ),
                );
                return None;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                self.warn(
                    path.to_path_buf(),
                    format!("cannot stat original {}: {e}", name.original_path().display()),
                );
                return None;
            }
        };

        debug!(
            conflict = %path.display(),
            original = %name.original_path().display(),
            original_exists = original.is_some(),
            "Found conflict copy"
        );
        self.stats.artifacts += 1;
        Some(ScannedArtifact {
            artifact: ConflictArtifact::new(name, file_stat(&metadata)),
            original,
        })
    }
}

impl Iterator for Scan<'_> {
    type Item = ScannedArtifact;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stats.cancelled {
                return None;
            }
            if self.scanner.cancel.is_cancelled() {
                debug!("Scan cancelled");
                self.stats.cancelled = true;
                return None;
            }

            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.scanner.root.clone());
                    self.warn(path, e.to_string());
                    continue;
                }
            };

            if entry.depth() > 0 {
                let relative = entry
                    .path()
                    .strip_prefix(&self.scanner.root)
                    .unwrap_or(entry.path());
                if self.scanner.is_excluded(relative) {
                    self.stats.excluded += 1;
                    if entry.file_type().is_dir() {
                        self.walker.skip_current_dir();
                    }
                    continue;
                }
            }

            if !entry.file_type().is_file() {
                continue;
            }
            self.stats.files_visited += 1;

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    self.warn(entry.path().to_path_buf(), e.to_string());
                    continue;
                }
            };

            if let Some(found) = self.inspect(entry.path(), metadata) {
                return Some(found);
            }
        }
    }
}

fn file_stat(metadata: &std::fs::Metadata) -> FileStat {
    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
    FileStat::new(metadata.len(), modified)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn scanner(root: &Path, options: ScanOptions) -> TreeScanner {
        TreeScanner::new(root, &options, CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = TreeScanner::new(
            &dir.path().join("nope"),
            &ScanOptions::default(),
            CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::RootNotFound(_)));
    }

    #[test]
    fn test_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        let err =
            TreeScanner::new(&file, &ScanOptions::default(), CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[test]
    fn test_marker_required() {
        let dir = TempDir::new().unwrap();
        let options = ScanOptions {
            require_marker: true,
            ..ScanOptions::default()
        };
        let err = TreeScanner::new(dir.path(), &options, CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ScanError::MissingMarker { .. }));

        fs::create_dir(dir.path().join(".stfolder")).unwrap();
        assert!(TreeScanner::new(dir.path(), &options, CancellationToken::new()).is_ok());
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = TempDir::new().unwrap();
        let options = ScanOptions {
            exclude: vec!["[".to_string()],
            ..ScanOptions::default()
        };
        let err = TreeScanner::new(dir.path(), &options, CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ScanError::InvalidPattern { .. }));
    }

    #[test]
    fn test_backup_dir_outside_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        for bad in ["../bak", "/tmp/bak", "."] {
            let options = ScanOptions {
                backup_dir: Some(bad.to_string()),
                ..ScanOptions::default()
            };
            let err = TreeScanner::new(dir.path(), &options, CancellationToken::new()).unwrap_err();
            assert!(matches!(err, ScanError::InvalidBackupDir { .. }), "{bad}");
        }
    }

    #[test]
    fn test_scan_finds_nested_conflicts() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("deep/er");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("a.txt"), "X").unwrap();
        fs::write(sub.join("a.sync-conflict-20240101-D1.txt"), "YY").unwrap();
        fs::write(dir.path().join("b.sync-conflict-20240101-D2.txt"), "Z").unwrap();
        fs::write(dir.path().join("plain.txt"), "P").unwrap();

        let scanner = scanner(dir.path(), ScanOptions::default());
        let (artifacts, stats) = scanner.collect();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(stats.files_visited, 4);
        assert_eq!(stats.artifacts, 2);
        assert!(stats.warnings.is_empty());
        assert!(!stats.cancelled);

        let a = artifacts
            .iter()
            .find(|s| s.artifact.device().as_str() == "D1")
            .unwrap();
        assert!(a.artifact.conflict_path().is_absolute());
        assert_eq!(a.artifact.size(), 2);
        assert_eq!(a.original.map(|o| o.size), Some(1));

        let b = artifacts
            .iter()
            .find(|s| s.artifact.device().as_str() == "D2")
            .unwrap();
        assert!(b.original.is_none());
    }

    #[test]
    fn test_excluded_directories_are_not_entered() {
        let dir = TempDir::new().unwrap();
        let versions = dir.path().join(".stversions");
        let backup = dir.path().join(".conflux-backup/x");
        fs::create_dir_all(&versions).unwrap();
        fs::create_dir_all(&backup).unwrap();
        fs::write(versions.join("a.sync-conflict-20240101-D1.txt"), "Y").unwrap();
        fs::write(backup.join("b.sync-conflict-20240101-D1.txt"), "Y").unwrap();
        fs::write(dir.path().join("skip.tmp"), "t").unwrap();

        let options = ScanOptions {
            exclude: vec![".stversions".to_string(), "*.tmp".to_string()],
            backup_dir: Some(".conflux-backup".to_string()),
            ..ScanOptions::default()
        };
        let (artifacts, stats) = scanner(dir.path(), options).collect();

        assert!(artifacts.is_empty());
        assert_eq!(stats.excluded, 3);
        assert_eq!(stats.files_visited, 0);
    }

    #[test]
    fn test_dot_slash_backup_dir_is_excluded() {
        let dir = TempDir::new().unwrap();
        let backup = dir.path().join(".bak/docs");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("a.sync-conflict-20240101-D1.txt"), "Y").unwrap();

        let options = ScanOptions {
            backup_dir: Some("./.bak/".to_string()),
            ..ScanOptions::default()
        };
        let (artifacts, stats) = scanner(dir.path(), options).collect();
        assert!(artifacts.is_empty());
        assert_eq!(stats.excluded, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_a_warning() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("a.sync-conflict-20240101-D1.txt"), "Y").unwrap();
        fs::write(dir.path().join("b.sync-conflict-20240101-D1.txt"), "Y").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through mode bits.
        let readable = fs::read_dir(&locked).is_ok();
        let (artifacts, stats) = scanner(dir.path(), ScanOptions::default()).collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        assert_eq!(artifacts.len(), 1);
        assert_eq!(stats.warnings.len(), 1);
        assert!(stats.warnings[0].path.ends_with("locked"));
        assert!(!stats.cancelled);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("o.sync-conflict-20240101-D1.txt"), "Y").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("o.sync-conflict-20240101-D1.txt"),
            dir.path().join("l.sync-conflict-20240101-D1.txt"),
        )
        .unwrap();

        let (artifacts, _) = scanner(dir.path(), ScanOptions::default()).collect();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_original_directory_is_a_warning() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a.txt")).unwrap();
        fs::write(dir.path().join("a.sync-conflict-20240101-D1.txt"), "Y").unwrap();

        let (artifacts, stats) = scanner(dir.path(), ScanOptions::default()).collect();
        assert!(artifacts.is_empty());
        assert_eq!(stats.warnings.len(), 1);
        assert!(stats.warnings[0].reason.contains("not a regular file"));
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.sync-conflict-20240101-D1.txt"), "Y").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let scanner = TreeScanner::new(dir.path(), &ScanOptions::default(), cancel).unwrap();
        let (artifacts, stats) = scanner.collect();
        assert!(artifacts.is_empty());
        assert!(stats.cancelled);
    }

    #[test]
    fn test_rescan_rewalks_tree() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner(dir.path(), ScanOptions::default());
        assert_eq!(scanner.scan().count(), 0);

        fs::write(dir.path().join("a.sync-conflict-20240101-D1.txt"), "Y").unwrap();
        assert_eq!(scanner.scan().count(), 1);
    }
}
