// Workspace file helpers
//
// Reading scripts, writing fixes back with a single .bak copy, creating new
// files, and finding Python files under a directory.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names never descended into when listing
const SKIPPED_DIRS: [&str; 4] = ["__pycache__", ".venv", "venv", ".git"];

/// Depth limit for `list_python_files`
const MAX_DEPTH: usize = 10;

/// File operations relative to a base directory
#[derive(Debug, Clone)]
pub struct Workspace {
    base_dir: PathBuf,
}

/// Size and age of a file
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub size: u64,
    pub lines: usize,
    pub modified: Option<DateTime<Local>>,
}

impl Workspace {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Workspace rooted at the process working directory
    pub fn current() -> Result<Self> {
        let dir = std::env::current_dir().context("Could not determine current directory")?;
        Ok(Self::new(dir))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute paths are kept as-is; relative ones join the base directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn read_source(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = self.resolve(path);
        if !path.exists() {
            bail!("File not found: {}", path.display());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Read source");
        Ok(content)
    }

    /// Overwrite `path`, first copying any existing content to `<path>.bak`.
    ///
    /// Returns the backup path when one was made.
    pub fn write_with_backup(&self, path: impl AsRef<Path>, content: &str) -> Result<Option<PathBuf>> {
        let path = self.resolve(path);

        let backup = if path.exists() {
            let backup = backup_path(&path);
            fs::copy(&path, &backup)
                .with_context(|| format!("Failed to create backup: {}", backup.display()))?;
            tracing::info!(backup = %backup.display(), "Created backup");
            Some(backup)
        } else {
            None
        };

        write_creating_parents(&path, content)?;
        Ok(backup)
    }

    /// Write a new file. Refuses to replace an existing file unless
    /// `overwrite` is set (no backup is made in that case).
    pub fn create_file(&self, path: impl AsRef<Path>, content: &str, overwrite: bool) -> Result<PathBuf> {
        let path = self.resolve(path);
        if path.exists() && !overwrite {
            bail!("File already exists: {}", path.display());
        }
        write_creating_parents(&path, content)?;
        Ok(path)
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).exists()
    }

    /// Python files under `dir`, relative to the base directory, sorted.
    /// Skips caches, virtualenvs and .git.
    pub fn list_python_files(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let root = self.resolve(dir);
        if !root.is_dir() {
            bail!("Not a directory: {}", root.display());
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&root)
            .max_depth(MAX_DEPTH)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !(entry.file_type().is_dir()
                        && SKIPPED_DIRS.iter().any(|skip| entry.file_name() == *skip))
            })
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "py"))
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.base_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| entry.path().to_path_buf())
            })
            .collect();

        files.sort();
        Ok(files)
    }

    pub fn file_info(&self, path: impl AsRef<Path>) -> Result<FileInfo> {
        let path = self.resolve(path);
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to stat file: {}", path.display()))?;
        let content = fs::read_to_string(&path).unwrap_or_default();

        Ok(FileInfo {
            size: metadata.len(),
            lines: content.lines().count(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        })
    }
}

/// foo.py -> foo.py.bak
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

fn write_creating_parents(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for: {}", path.display()))?;
        }
    }
    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(backup_path(Path::new("dir/foo.py")), PathBuf::from("dir/foo.py.bak"));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        let err = ws.read_source("nope.py").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_write_with_backup_keeps_original() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        fs::write(dir.path().join("foo.py"), "print(x)\n").unwrap();

        let backup = ws.write_with_backup("foo.py", "print(1)\n").unwrap();

        assert_eq!(backup, Some(dir.path().join("foo.py.bak")));
        assert_eq!(fs::read_to_string(dir.path().join("foo.py.bak")).unwrap(), "print(x)\n");
        assert_eq!(ws.read_source("foo.py").unwrap(), "print(1)\n");
    }

    #[test]
    fn test_write_new_file_makes_no_backup() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        let backup = ws.write_with_backup("pkg/new.py", "x = 1\n").unwrap();
        assert!(backup.is_none());
        assert!(dir.path().join("pkg/new.py").exists());
    }

    #[test]
    fn test_create_file_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        ws.create_file("a.py", "one", false).unwrap();
        assert!(ws.create_file("a.py", "two", false).is_err());
        ws.create_file("a.py", "two", true).unwrap();
        assert_eq!(ws.read_source("a.py").unwrap(), "two");
    }

    #[test]
    fn test_list_python_files_skips_caches_and_venvs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for path in [
            "main.py",
            "pkg/util.py",
            "pkg/notes.txt",
            "__pycache__/main.cpython-311.py",
            ".venv/lib/site.py",
            "venv/lib/site.py",
            ".git/hooks/x.py",
        ] {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, "").unwrap();
        }

        let ws = Workspace::new(root);
        let files = ws.list_python_files(".").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/").trim_start_matches("./").to_string())
            .collect();
        assert_eq!(names, vec!["main.py", "pkg/util.py"]);
    }

    #[test]
    fn test_file_info_counts_lines() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        fs::write(dir.path().join("f.py"), "a = 1\nb = 2\n").unwrap();
        let info = ws.file_info("f.py").unwrap();
        assert_eq!(info.lines, 2);
        assert_eq!(info.size, 12);
        assert!(info.modified.is_some());
    }
}
