use std::{fs, path::{Path, PathBuf}};

use log::{info, warn};
use regex::Regex;

use crate::errors::Result;

const SUMMARY_LIMIT: usize = 5;

/// A `*.<extension>` file pattern. Discovery and the bulk engine share it, so the files we
/// count are the files the engine expands the glob to.
#[derive(Debug, Clone)]
pub struct FilePattern {
    extension: String,
    matcher: Regex,
}

impl FilePattern {
    pub fn new(extension: &str) -> Result<FilePattern> {
        let matcher = Regex::new(&format!(r"^[^/\\]+\.{}$", regex::escape(extension)))?;
        Ok(FilePattern {
            extension: extension.to_string(),
            matcher,
        })
    }

    pub fn parquet() -> Result<FilePattern> {
        FilePattern::new("parquet")
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }

    /// Glob string for every matching file directly inside `dir`.
    pub fn glob_in(&self, dir: &Path) -> String {
        dir.join(format!("*.{}", self.extension))
            .to_string_lossy()
            .into_owned()
    }
}

/// The set of columnar files found in one directory for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub dir: PathBuf,
    /// Sorted by file name.
    pub files: Vec<PathBuf>,
}

impl Batch {
    /// Lists the matching files in `dir` (symlinks followed), creating the directory when it is
    /// missing.
    pub fn discover(dir: &Path, pattern: &FilePattern) -> Result<Batch> {
        if !dir.try_exists()? {
            warn!("Directory {} does not exist, creating it", dir.display());
            fs::create_dir_all(dir)?;
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let name = file_name.to_string_lossy();
            if pattern.matches(&name) {
                if file_name.to_str().is_none() {
                    warn!("File name is not valid UTF-8: {}", path.display());
                }
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(Batch {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let names = self.file_names();
        let mut lines = vec![format!("{} Parquet files detected:", names.len())];
        lines.extend(names.iter().take(SUMMARY_LIMIT).map(|name| format!("  - {name}")));
        if names.len() > SUMMARY_LIMIT {
            lines.push(format!("  ... and {} others", names.len() - SUMMARY_LIMIT));
        }
        lines
    }

    pub fn log_summary(&self) {
        for line in self.summary_lines() {
            info!(files = self.len(); "{line}");
        }
    }
}
