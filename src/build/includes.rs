//! Quoted include extraction and resolution.
//!
//! Resolution is first-match over an ordered [`SearchPath`]. The directory of
//! the including file is always tried first.

use super::scan::{DirectiveScanner, TextualScanner};
use super::utils::normalize_path;
use crate::error::{BuildError, BuildResult};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered list of directories consulted for a quoted include.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Search path for expanding `file`: its own directory, then `self`.
    pub fn rooted_at(&self, file: &Path) -> SearchPath {
        let mut dirs = Vec::with_capacity(self.dirs.len() + 1);
        if let Some(parent) = file.parent() {
            dirs.push(parent.to_path_buf());
        }
        for dir in &self.dirs {
            if dirs.last() != Some(dir) {
                dirs.push(dir.clone());
            }
        }
        SearchPath { dirs }
    }
}

pub struct IncludeResolver<S = TextualScanner> {
    scanner: S,
}

impl IncludeResolver<TextualScanner> {
    pub fn new() -> Self {
        Self {
            scanner: TextualScanner,
        }
    }
}

impl Default for IncludeResolver<TextualScanner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DirectiveScanner> IncludeResolver<S> {
    pub fn with_scanner(scanner: S) -> Self {
        Self { scanner }
    }

    /// Raw quoted include strings of `file`, sorted and deduplicated.
    pub fn extract_includes(&self, file: &Path) -> BuildResult<BTreeSet<String>> {
        let text = read_text(file)?;
        Ok(self.scanner.quoted_includes(&text))
    }

    /// Whether `file` defines the program entry point.
    pub fn defines_entry_point(&self, file: &Path) -> BuildResult<bool> {
        let text = read_text(file)?;
        Ok(self.scanner.defines_entry_point(&text))
    }

    /// First existing `dir/raw_include` over `search_path`.
    ///
    /// `from` only feeds the error message.
    pub fn resolve(
        &self,
        raw_include: &str,
        from: &Path,
        search_path: &SearchPath,
    ) -> BuildResult<PathBuf> {
        if search_path.dirs().is_empty() {
            return Err(BuildError::Configuration(format!(
                "empty search path while resolving \"{}\" from {}",
                raw_include,
                from.display()
            )));
        }

        for dir in search_path.dirs() {
            let candidate = dir.join(raw_include);
            if candidate.is_file() {
                return normalize_path(&candidate);
            }
        }

        Err(BuildError::Resolution {
            include: raw_include.to_string(),
            from: from.to_path_buf(),
            searched: search_path.dirs().to_vec(),
        })
    }

    /// Resolved includes of `file` in lexicographic order of their raw text.
    ///
    /// `search_path` must already be rooted at `file`. Any unresolvable
    /// include fails the whole call.
    pub fn resolved_includes(
        &self,
        file: &Path,
        search_path: &SearchPath,
    ) -> BuildResult<Vec<PathBuf>> {
        self.extract_includes(file)?
            .iter()
            .map(|raw| self.resolve(raw, file, search_path))
            .collect()
    }

    /// Walk the full include closure of `root`, recording every header in
    /// `visited`. Headers already in `visited` are not expanded again, so one
    /// set can be shared across several roots.
    pub fn closure(
        &self,
        root: &Path,
        search_path: &SearchPath,
        visited: &mut HashSet<PathBuf>,
    ) -> BuildResult<()> {
        let rooted = search_path.rooted_at(root);
        let mut stack = vec![(root.to_path_buf(), rooted)];

        while let Some((file, path)) = stack.pop() {
            for include in self.resolved_includes(&file, &path)? {
                if visited.insert(include.clone()) {
                    let nested = path.rooted_at(&include);
                    stack.push((include, nested));
                }
            }
        }
        Ok(())
    }
}

fn read_text(file: &Path) -> BuildResult<String> {
    let bytes = fs::read(file).map_err(|e| BuildError::io(file, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
