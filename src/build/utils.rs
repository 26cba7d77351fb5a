use crate::config::ProjectFile;
use crate::error::{BuildError, BuildResult};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

pub const CONFIG_FILE: &str = "incbuild.toml";

// --- Helper: Load Config ---
pub fn load_config(path: &Path) -> Result<ProjectFile> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "{} not found.\n\n\
            💡 Tip: Create it with a [project] table and at least one [variants.<name>] table.",
            path.display()
        ));
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} - check file permissions", path.display()))?;

    let config: ProjectFile = toml::from_str(&config_str).with_context(|| {
        format!(
            "Failed to parse {} - check for syntax errors (missing quotes, brackets)",
            path.display()
        )
    })?;

    Ok(config)
}

/// Modification time, read fresh on every call.
pub fn mtime(path: &Path) -> BuildResult<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| BuildError::io(path, e))
}

/// Absolute form of `path` with `.` and `..` removed lexically.
///
/// Symlinks are not followed, so two spellings of one file through a link
/// stay distinct.
pub fn normalize_path(path: &Path) -> BuildResult<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| BuildError::io(path, e))?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Path shown to the user: relative to `base` when possible.
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

// --- Helper: Collect Source Files ---
/// Files under each root whose extension is in `extensions`, walked in
/// file-name order. A root naming a file is taken as-is.
pub fn collect_sources(roots: &[PathBuf], extensions: &[String]) -> BuildResult<Vec<PathBuf>> {
    let mut sources = Vec::new();
    let mut seen = HashSet::new();

    for root in roots {
        if root.is_file() {
            if seen.insert(root.clone()) {
                sources.push(root.clone());
            }
            continue;
        }
        if !root.is_dir() {
            return Err(BuildError::Configuration(format!(
                "source location {} does not exist",
                root.display()
            )));
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                BuildError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let matches = path.extension().is_some_and(|ext| {
                let s = ext.to_string_lossy();
                extensions.iter().any(|e| e == s.as_ref())
            });
            if matches && seen.insert(path.to_path_buf()) {
                sources.push(path.to_path_buf());
            }
        }
    }

    Ok(sources)
}

// --- Helper: Alias Copy ---
/// Copy a built binary to its alias location.
///
/// Returns `false` without touching anything when both paths name the same
/// file; copying a file onto itself would truncate it.
pub fn copy_alias(output: &Path, alias: &Path) -> BuildResult<bool> {
    if same_file(output, alias)? {
        return Ok(false);
    }
    fs::copy(output, alias).map_err(|e| BuildError::io(alias, e))?;
    Ok(true)
}

fn same_file(a: &Path, b: &Path) -> BuildResult<bool> {
    if normalize_path(a)? == normalize_path(b)? {
        return Ok(true);
    }
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    let a = fs::canonicalize(a).map_err(|e| BuildError::io(a, e))?;
    let b = fs::canonicalize(b).map_err(|e| BuildError::io(b, e))?;
    Ok(a == b)
}
