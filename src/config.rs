//! `incbuild.toml` model.
//!
//! A project names its build directory, shared flags and a set of variants.
//! Each variant resolves to one [`BuildTarget`].

use crate::build::{BuildTarget, SearchPath, collect_sources, normalize_path};
use crate::error::{BuildError, BuildResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    pub project: ProjectConfig,
    #[serde(default)]
    pub variants: BTreeMap<String, VariantConfig>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    /// Compiler driver; detected when absent
    pub compiler: Option<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub ldflags: Vec<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct VariantConfig {
    pub entry: String,
    /// Directories to walk, or individual files
    pub sources: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    /// Appended to the project cflags
    #[serde(default)]
    pub cflags: Vec<String>,
    /// Appended to the project ldflags
    #[serde(default)]
    pub ldflags: Vec<String>,
    /// Binary name; defaults to `<project>-<variant>`
    pub output: Option<String>,
    /// Copy the binary to `<build_dir>/<project>` after building
    #[serde(default)]
    pub alias: bool,
}

fn default_build_dir() -> String {
    "bin".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["c".to_string()]
}

impl ProjectFile {
    pub fn variant(&self, name: &str) -> BuildResult<&VariantConfig> {
        self.variants.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.variants.keys().map(String::as_str).collect();
            BuildError::Configuration(if known.is_empty() {
                format!("unknown variant '{}' (no variants are defined)", name)
            } else {
                format!("unknown variant '{}' (available: {})", name, known.join(", "))
            })
        })
    }

    pub fn build_dir(&self, root: &Path) -> BuildResult<PathBuf> {
        normalize_path(&root.join(&self.project.build_dir))
    }

    pub fn output_name(&self, variant: &str) -> BuildResult<String> {
        let cfg = self.variant(variant)?;
        Ok(cfg
            .output
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.project.name, variant)))
    }

    /// Where an `alias = true` variant copies its binary.
    pub fn alias_path(&self, root: &Path) -> BuildResult<PathBuf> {
        Ok(self
            .build_dir(root)?
            .join(executable_name(&self.project.name)))
    }

    /// Search path for a variant: its include_dirs in order.
    pub fn search_path(&self, root: &Path, variant: &str) -> BuildResult<SearchPath> {
        let cfg = self.variant(variant)?;
        let dirs = cfg
            .include_dirs
            .iter()
            .map(|d| normalize_path(&root.join(d)))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(SearchPath::new(dirs))
    }

    /// Resolve `variant` against the project directory `root`.
    pub fn target(&self, root: &Path, variant: &str) -> BuildResult<BuildTarget> {
        let cfg = self.variant(variant)?;
        let root = normalize_path(root)?;
        let build_root = self.build_dir(&root)?;
        let name = self.output_name(variant)?;

        let entry = normalize_path(&root.join(&cfg.entry))?;
        if !entry.is_file() {
            return Err(BuildError::Configuration(format!(
                "entry file {} of variant '{}' does not exist",
                entry.display(),
                variant
            )));
        }

        let roots = cfg
            .sources
            .iter()
            .map(|s| normalize_path(&root.join(s)))
            .collect::<BuildResult<Vec<_>>>()?;
        let sources = collect_sources(&roots, &self.project.extensions)?;
        if sources.is_empty() {
            return Err(BuildError::Configuration(format!(
                "variant '{}' has no source files",
                variant
            )));
        }

        let mut cflags = self.project.cflags.clone();
        cflags.extend(cfg.cflags.iter().cloned());
        let mut ldflags = self.project.ldflags.clone();
        ldflags.extend(cfg.ldflags.iter().cloned());

        Ok(BuildTarget {
            output: build_root.join(executable_name(&name)),
            name,
            search_path: self.search_path(&root, variant)?,
            project_root: root,
            entry,
            sources,
            build_root,
            cflags,
            ldflags,
        })
    }
}

pub fn executable_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}
