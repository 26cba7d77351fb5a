//! Source path to object path mapping.

use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};

pub const OBJECT_EXTENSION: &str = "o";

/// Maps sources into `build_root/<variant>/<mirrored path>.o`.
#[derive(Debug, Clone)]
pub struct ArtifactPathMapper {
    build_root: PathBuf,
    variant: String,
}

impl ArtifactPathMapper {
    pub fn new(build_root: impl Into<PathBuf>, variant: impl Into<String>) -> Self {
        Self {
            build_root: build_root.into(),
            variant: variant.into(),
        }
    }

    pub fn map(&self, source: &Path) -> BuildResult<PathBuf> {
        object_path(source, &self.build_root, &self.variant)
    }
}

/// Object path for `source`, mirrored relative to the nearest common
/// ancestor of `source` and `build_root`.
pub fn object_path(source: &Path, build_root: &Path, variant: &str) -> BuildResult<PathBuf> {
    let ancestor = common_ancestor(source, build_root).ok_or_else(|| {
        BuildError::Configuration(format!(
            "{} and build directory {} share no common ancestor",
            source.display(),
            build_root.display()
        ))
    })?;

    let relative = source
        .strip_prefix(&ancestor)
        .map_err(|_| BuildError::Configuration(format!("cannot map {}", source.display())))?;
    if relative.as_os_str().is_empty() {
        return Err(BuildError::Configuration(format!(
            "source {} is an ancestor of the build directory",
            source.display()
        )));
    }

    Ok(build_root
        .join(variant)
        .join(relative)
        .with_extension(OBJECT_EXTENSION))
}

fn common_ancestor(a: &Path, b: &Path) -> Option<PathBuf> {
    let mut ancestor = PathBuf::new();
    let mut shared = 0;
    for (x, y) in a.components().zip(b.components()) {
        if x != y {
            break;
        }
        ancestor.push(x.as_os_str());
        shared += 1;
    }
    (shared > 0).then_some(ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_object_path_mirrors_source_tree() {
        let obj = object_path(
            Path::new("/proj/src/types/list.c"),
            Path::new("/proj/bin"),
            ".app-debug",
        )
        .unwrap();
        assert_eq!(obj, PathBuf::from("/proj/bin/.app-debug/src/types/list.o"));
    }

    #[test]
    fn test_variants_are_isolated() {
        let mapper_debug = ArtifactPathMapper::new("/proj/bin", "debug");
        let mapper_release = ArtifactPathMapper::new("/proj/bin", "release");
        let src = Path::new("/proj/src/main.c");
        assert_ne!(
            mapper_debug.map(src).unwrap(),
            mapper_release.map(src).unwrap()
        );
        assert!(mapper_debug.map(src).unwrap().starts_with("/proj/bin/debug"));
    }

    #[test]
    fn test_distinct_sources_do_not_collide() {
        let sources = [
            "/proj/src/main.c",
            "/proj/src/value.c",
            "/proj/src/types/value.c",
            "/proj/modules/value.c",
            "/proj/tests/test.c",
        ];
        let variants = ["debug", "release", "test"];
        let mut seen = HashSet::new();
        for variant in variants {
            for src in sources {
                let obj = object_path(Path::new(src), Path::new("/proj/bin"), variant).unwrap();
                assert!(seen.insert(obj), "collision for {src} in {variant}");
            }
        }
    }

    #[test]
    fn test_relative_paths_without_shared_root_fail() {
        let err = object_path(Path::new("src/a.c"), Path::new("bin"), "debug").unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }
}
