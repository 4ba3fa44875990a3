//! Corpus discovery
//!
//! Locates scenario files under a root directory and opens them. Files that
//! cannot be read are skipped with a warning; a scan over a corpus where
//! nothing opens simply sees no documents.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::ResolvedConfig;
use crate::document::{Document, TextDocument};

/// Source of the documents a corpus scan reads
pub trait Corpus {
    type Doc: Document;

    /// Open every corpus document, silently dropping the ones that fail
    fn open_documents(&self) -> Vec<Self::Doc>;
}

/// Corpus of files on disk under `root`, filtered by the resolved config
pub struct FsCorpus<'a> {
    root: PathBuf,
    config: &'a ResolvedConfig,
}

impl<'a> FsCorpus<'a> {
    pub fn new(root: impl Into<PathBuf>, config: &'a ResolvedConfig) -> Self {
        FsCorpus {
            root: root.into(),
            config,
        }
    }
}

impl Corpus for FsCorpus<'_> {
    type Doc = TextDocument;

    fn open_documents(&self) -> Vec<TextDocument> {
        let files = match discover_files(&self.root, self.config) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("failed to enumerate corpus under {}: {e:#}", self.root.display());
                return Vec::new();
            }
        };

        let total = files.len();
        let documents: Vec<TextDocument> = files
            .into_iter()
            .filter_map(|path| match TextDocument::open(&path) {
                Ok(document) => Some(document.with_uri(relative_uri(&self.root, &path))),
                Err(e) => {
                    tracing::warn!("skipping corpus file {}: {e:#}", path.display());
                    None
                }
            })
            .collect();

        if documents.is_empty() && total > 0 {
            tracing::warn!("no valid documents opened under {}", self.root.display());
        }
        tracing::debug!(opened = documents.len(), discovered = total, "opened corpus");
        documents
    }
}

/// Collect corpus files under `root`, sorted for deterministic order
pub fn discover_files(root: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if root.is_file() {
        files.push(root.to_path_buf());
    } else if root.is_dir() {
        collect_files_recursive(root, root, config, &mut files)?;
    }

    files.sort();
    Ok(files)
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.')
        || name == "__pycache__"
        || name == "node_modules"
        || name == "venv"
        || name == "build"
        || name == "dist"
}

/// Walk `dir`, collecting included files
///
/// Only a failure to read `root` itself is an error. Unreadable
/// subdirectories and entries are skipped with a warning so the rest of the
/// corpus is still scanned.
fn collect_files_recursive(
    root: &Path,
    dir: &Path,
    config: &ResolvedConfig,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if dir == root => {
            return Err(e)
                .with_context(|| format!("Failed to read directory: {}", dir.display()));
        }
        Err(e) => {
            tracing::warn!("skipping unreadable directory {}: {e}", dir.display());
            return Ok(());
        }
    };

    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };

        if metadata.is_symlink() {
            continue;
        }

        if metadata.is_dir() {
            if path
                .file_name()
                .and_then(OsStr::to_str)
                .is_some_and(is_skipped_dir)
            {
                continue;
            }
            collect_files_recursive(root, &path, config, files)?;
        } else if metadata.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            if config.should_include(relative) {
                files.push(path);
            }
        }
    }

    Ok(())
}

/// Corpus-relative, `/`-separated identifier for `path`
pub fn relative_uri(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => {
            relative.to_string_lossy().replace('\\', "/")
        }
        _ => path.to_string_lossy().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discovers_only_included_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "scenarios/b.py", "");
        write(dir.path(), "scenarios/a.py", "");
        write(dir.path(), "scenarios/nested/c.py", "");
        write(dir.path(), "scenarios/notes.txt", "");
        write(dir.path(), "helpers/steps.py", "");
        write(dir.path(), ".hidden/scenarios/d.py", "");

        let config = ResolvedConfig::defaults().unwrap();
        let files = discover_files(dir.path(), &config).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| relative_uri(dir.path(), p))
            .collect();
        assert_eq!(
            relative,
            vec!["scenarios/a.py", "scenarios/b.py", "scenarios/nested/c.py"]
        );
    }

    #[test]
    fn test_open_documents_uses_relative_uris() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "scenarios/login.py", "def given_user():\n    pass\n");

        let config = ResolvedConfig::defaults().unwrap();
        let corpus = FsCorpus::new(dir.path(), &config);
        let documents = corpus.open_documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].uri(), "scenarios/login.py");
        assert!(documents[0].text().starts_with("def given_user"));
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "scenarios/good.py", "def given_a():\n    pass\n");
        // Invalid UTF-8 cannot be opened as a text document
        let bad = dir.path().join("scenarios/bad.py");
        fs::write(&bad, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let config = ResolvedConfig::defaults().unwrap();
        let documents = FsCorpus::new(dir.path(), &config).open_documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].uri(), "scenarios/good.py");
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_does_not_hide_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "scenarios/ok/a.py", "def given_a():\n    pass\n");
        write(dir.path(), "scenarios/locked/b.py", "def given_b():\n    pass\n");
        let locked = dir.path().join("scenarios/locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users can still read the directory
        let locked_readable = fs::read_dir(&locked).is_ok();

        let config = ResolvedConfig::defaults().unwrap();
        let files = discover_files(dir.path(), &config);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let relative: Vec<_> = files
            .unwrap()
            .iter()
            .map(|p| relative_uri(dir.path(), p))
            .collect();
        if locked_readable {
            assert_eq!(relative, vec!["scenarios/locked/b.py", "scenarios/ok/a.py"]);
        } else {
            assert_eq!(relative, vec!["scenarios/ok/a.py"]);
        }
    }

    #[test]
    fn test_unreadable_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResolvedConfig::defaults().unwrap();
        let mut files = Vec::new();
        let missing = dir.path().join("gone");
        assert!(collect_files_recursive(&missing, &missing, &config, &mut files).is_err());
        assert!(files.is_empty());
    }

    #[test]
    fn test_missing_root_yields_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResolvedConfig::defaults().unwrap();
        let corpus = FsCorpus::new(dir.path().join("does-not-exist"), &config);
        assert!(corpus.open_documents().is_empty());
    }
}
