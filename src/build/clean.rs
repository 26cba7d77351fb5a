//! Build artifact cleanup.
//!
//! Removes the whole build directory: every variant's objects, binaries and
//! the generated compile_commands.json.

use super::utils::display_path;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

pub fn clean(build_dir: &Path, project_root: &Path) -> Result<bool> {
    if !build_dir.exists() {
        println!("{} Nothing to clean", "!".yellow());
        return Ok(false);
    }

    println!(
        "{} Cleaning: {}",
        "🗑️".red(),
        display_path(build_dir, project_root)
    );
    fs::remove_dir_all(build_dir)
        .with_context(|| format!("Failed to remove {}", build_dir.display()))?;
    println!("{} Clean complete.", "✓".green());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removes_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(bin.join(".app-debug").join("src")).unwrap();
        fs::write(bin.join("app-debug"), "").unwrap();

        assert!(clean(&bin, dir.path()).unwrap());
        assert!(!bin.exists());
    }

    #[test]
    fn test_clean_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!clean(&dir.path().join("bin"), dir.path()).unwrap());
    }
}
