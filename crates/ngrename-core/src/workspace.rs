//! Workspace buffers: the in-memory file set a rename reads and rewrites.
//!
//! - Deterministic ordering (sorted by workspace-relative path)
//! - Paths always use forward slashes
//! - Loaded from disk with `walkdir`, filtered by extension and exclude globs
//! - Persisted after a successful apply with atomic temp-file writes

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::apply::AppliedSummary;
use crate::patch::ContentHash;

/// Directory names that are never scanned.
pub const ALWAYS_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "dist", ".angular"];

/// Extensions loaded by default: analyzed files plus related stylesheets.
pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "html", "css", "scss", "sass", "less"];

/// Errors while loading or persisting a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace root not found: {path}")]
    RootNotFound { path: String },

    #[error("invalid exclude pattern '{pattern}': {message}")]
    BadPattern { pattern: String, message: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path}: file is not valid UTF-8")]
    NotUtf8 { path: String },

    #[error("{path}: no buffered content to write")]
    MissingBuffer { path: String },
}

impl WorkspaceError {
    fn io(path: &Path, source: io::Error) -> Self {
        WorkspaceError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Options for [`WorkspaceBuffers::from_dir`].
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    /// File extensions to load (without the dot).
    pub extensions: Vec<String>,
    /// Glob patterns matched against workspace-relative paths.
    pub exclude: Vec<String>,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        WorkspaceOptions {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            exclude: Vec::new(),
        }
    }
}

// ============================================================================
// WorkspaceBuffers
// ============================================================================

/// File contents keyed by workspace-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceBuffers {
    files: BTreeMap<String, String>,
}

impl WorkspaceBuffers {
    pub fn new() -> Self {
        WorkspaceBuffers::default()
    }

    /// Insert or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(normalize_path(&path.into()), content.into());
    }

    /// Builder form of [`WorkspaceBuffers::insert`].
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }

    /// Move a buffer to a new path. Returns false if `old_path` is unknown.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> bool {
        match self.files.remove(old_path) {
            Some(content) => {
                self.files.insert(new_path.to_string(), content);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// `(path, content)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn content_hash(&self, path: &str) -> Option<ContentHash> {
        self.get(path).map(|c| ContentHash::compute(c.as_bytes()))
    }

    // ------------------------------------------------------------------------
    // Disk
    // ------------------------------------------------------------------------

    /// Load every matching file under `root`.
    ///
    /// Files are read as UTF-8; anything else is an error.
    pub fn from_dir(root: &Path, options: &WorkspaceOptions) -> Result<Self, WorkspaceError> {
        if !root.is_dir() {
            return Err(WorkspaceError::RootNotFound {
                path: root.display().to_string(),
            });
        }
        let exclude = build_globset(&options.exclude)?;
        let mut buffers = WorkspaceBuffers::new();

        let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && ALWAYS_EXCLUDED_DIRS.contains(&name.as_ref()))
        });

        for entry in walker {
            let entry = entry.map_err(|e| WorkspaceError::Io {
                path: root.display().to_string(),
                source: io::Error::other(e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let full_path = entry.path();
            let ext = full_path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !options.extensions.iter().any(|x| x == ext) {
                continue;
            }

            let relative = full_path
                .strip_prefix(root)
                .map_err(|e| WorkspaceError::io(full_path, io::Error::other(e)))?
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            if exclude.is_match(&relative) {
                continue;
            }

            let bytes = fs::read(full_path).map_err(|e| WorkspaceError::io(full_path, e))?;
            let content =
                String::from_utf8(bytes).map_err(|_| WorkspaceError::NotUtf8 {
                    path: relative.clone(),
                })?;
            buffers.files.insert(relative, content);
        }

        debug!(root = %root.display(), files = buffers.len(), "loaded workspace");
        Ok(buffers)
    }

    /// Write the result of an apply back to disk under `root`.
    ///
    /// Edited files are rewritten in place first (temp file + rename), then
    /// file renames run in two phases: every source moves to a temp name, then
    /// every temp name moves to its target. Chains and swaps therefore never
    /// overwrite a file that is itself being moved. Parent directories of
    /// rename targets are created.
    pub fn persist(&self, root: &Path, summary: &AppliedSummary) -> Result<(), WorkspaceError> {
        for path in &summary.files_touched {
            let current = summary.final_path(path);
            let content = self
                .get(current)
                .ok_or_else(|| WorkspaceError::MissingBuffer {
                    path: current.to_string(),
                })?;
            write_atomic(&root.join(path), content)?;
        }

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        for rename in &summary.renames_performed {
            let from = root.join(&rename.old_path);
            match stage_move(&from) {
                Ok(temp) => staged.push((temp, from)),
                Err(err) => {
                    // Put already staged sources back before failing.
                    for (temp, from) in staged.iter().rev() {
                        let _ = fs::rename(temp, from);
                    }
                    return Err(err);
                }
            }
        }
        for ((temp, _), rename) in staged.iter().zip(&summary.renames_performed) {
            let to = root.join(&rename.new_path);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
            }
            fs::rename(temp, &to).map_err(|e| WorkspaceError::io(&to, e))?;
        }

        debug!(
            files = summary.files_touched.len(),
            renames = summary.renames_performed.len(),
            "persisted workspace changes"
        );
        Ok(())
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, WorkspaceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| WorkspaceError::BadPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| WorkspaceError::BadPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// Move `from` to a fresh temp name next to it and return that name.
fn stage_move(from: &Path) -> Result<PathBuf, WorkspaceError> {
    let dir = from.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let temp = tempfile::Builder::new()
        .prefix(".ngrename-move-")
        .tempfile_in(&dir)
        .map_err(|e| WorkspaceError::io(&dir, e))?
        .into_temp_path()
        .keep()
        .map_err(|e| WorkspaceError::io(&dir, e.error))?;
    if let Err(err) = fs::rename(from, &temp) {
        let _ = fs::remove_file(&temp);
        return Err(WorkspaceError::io(from, err));
    }
    Ok(temp)
}

fn write_atomic(path: &Path, content: &str) -> Result<(), WorkspaceError> {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| WorkspaceError::io(&dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| WorkspaceError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| WorkspaceError::io(path, e.error))?;
    Ok(())
}

// ============================================================================
// Path Helpers
// ============================================================================

/// Collapse `.` and `..` segments and backslashes in a workspace-relative path.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Directory part of a workspace-relative path (empty for top-level files).
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Final component of a workspace-relative path.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map(|i| &path[i + 1..]).unwrap_or(path)
}

/// Join a directory and a file name.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Resolve a `./` or `../` specifier written in `from_file`.
///
/// Bare specifiers (package imports) return `None`.
pub fn resolve_relative_path(from_file: &str, specifier: &str) -> Option<String> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    Some(normalize_path(&join_path(parent_dir(from_file), specifier)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::FileRename;
    use tempfile::TempDir;

    mod path_tests {
        use super::*;

        #[test]
        fn resolve_relative_specifiers() {
            assert_eq!(
                resolve_relative_path("src/app/app.module.ts", "./foo/foo.component"),
                Some("src/app/foo/foo.component".to_string())
            );
            assert_eq!(
                resolve_relative_path("src/app/a/a.ts", "../b.pipe"),
                Some("src/app/b.pipe".to_string())
            );
            assert_eq!(resolve_relative_path("a.ts", "@angular/core"), None);
        }

        #[test]
        fn path_parts() {
            assert_eq!(parent_dir("src/app/x.ts"), "src/app");
            assert_eq!(parent_dir("x.ts"), "");
            assert_eq!(file_name("src/app/x.ts"), "x.ts");
            assert_eq!(join_path("", "x.ts"), "x.ts");
            assert_eq!(normalize_path("./a\\b/../c.ts"), "a/c.ts");
        }
    }

    mod buffer_tests {
        use super::*;

        #[test]
        fn rename_moves_content() {
            let mut buffers = WorkspaceBuffers::new().with_file("a.ts", "x");
            assert!(buffers.rename("a.ts", "b.ts"));
            assert_eq!(buffers.get("b.ts"), Some("x"));
            assert!(!buffers.contains("a.ts"));
            assert!(!buffers.rename("a.ts", "c.ts"));
        }

        #[test]
        fn insert_normalizes_paths() {
            let buffers = WorkspaceBuffers::new().with_file("./src/../a.ts", "x");
            assert_eq!(buffers.paths().collect::<Vec<_>>(), vec!["a.ts"]);
        }
    }

    mod disk_tests {
        use super::*;

        fn setup_workspace(files: &[(&str, &str)]) -> TempDir {
            let dir = TempDir::new().unwrap();
            for (path, content) in files {
                let full = dir.path().join(path);
                fs::create_dir_all(full.parent().unwrap()).unwrap();
                fs::write(full, content).unwrap();
            }
            dir
        }

        #[test]
        fn from_dir_filters_extensions_and_excludes() {
            let dir = setup_workspace(&[
                ("src/app.component.ts", "ts"),
                ("src/app.component.html", "html"),
                ("src/app.component.spec.ts", "spec"),
                ("README.md", "docs"),
                ("node_modules/lib/index.ts", "dep"),
            ]);
            let options = WorkspaceOptions {
                exclude: vec!["**/*.spec.ts".to_string()],
                ..WorkspaceOptions::default()
            };
            let buffers = WorkspaceBuffers::from_dir(dir.path(), &options).unwrap();
            assert_eq!(
                buffers.paths().collect::<Vec<_>>(),
                vec!["src/app.component.html", "src/app.component.ts"]
            );
        }

        #[test]
        fn from_dir_requires_existing_root() {
            let dir = TempDir::new().unwrap();
            let missing = dir.path().join("nope");
            let err = WorkspaceBuffers::from_dir(&missing, &WorkspaceOptions::default());
            assert!(matches!(err, Err(WorkspaceError::RootNotFound { .. })));
        }

        #[test]
        fn persist_writes_edits_then_renames() {
            let dir = setup_workspace(&[("foo.pipe.ts", "old"), ("use.ts", "old use")]);
            let mut buffers =
                WorkspaceBuffers::from_dir(dir.path(), &WorkspaceOptions::default()).unwrap();
            buffers.insert("foo.pipe.ts", "new");
            buffers.insert("use.ts", "new use");
            buffers.rename("foo.pipe.ts", "pipes/bar.pipe.ts");

            let summary = AppliedSummary {
                files_touched: vec!["foo.pipe.ts".to_string(), "use.ts".to_string()],
                renames_performed: vec![FileRename::new("foo.pipe.ts", "pipes/bar.pipe.ts")],
                edits_applied: 2,
            };
            buffers.persist(dir.path(), &summary).unwrap();

            assert!(!dir.path().join("foo.pipe.ts").exists());
            assert_eq!(
                fs::read_to_string(dir.path().join("pipes/bar.pipe.ts")).unwrap(),
                "new"
            );
            assert_eq!(
                fs::read_to_string(dir.path().join("use.ts")).unwrap(),
                "new use"
            );
        }

        #[test]
        fn persist_handles_rename_chains_and_swaps() {
            let dir = setup_workspace(&[("a.ts", "A"), ("b.ts", "B"), ("x.ts", "X"), ("y.ts", "Y")]);
            let buffers =
                WorkspaceBuffers::from_dir(dir.path(), &WorkspaceOptions::default()).unwrap();

            let summary = AppliedSummary {
                files_touched: Vec::new(),
                renames_performed: vec![
                    FileRename::new("a.ts", "b.ts"),
                    FileRename::new("b.ts", "c.ts"),
                    FileRename::new("x.ts", "y.ts"),
                    FileRename::new("y.ts", "x.ts"),
                ],
                edits_applied: 0,
            };
            buffers.persist(dir.path(), &summary).unwrap();

            let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
            assert!(!dir.path().join("a.ts").exists());
            assert_eq!(read("b.ts"), "A");
            assert_eq!(read("c.ts"), "B");
            assert_eq!(read("x.ts"), "Y");
            assert_eq!(read("y.ts"), "X");

            let leftovers: Vec<_> = fs::read_dir(dir.path())
                .unwrap()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(".ngrename-move-"))
                .collect();
            assert!(leftovers.is_empty());
        }
    }
}
