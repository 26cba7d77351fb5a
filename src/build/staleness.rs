//! Header-aware staleness of a translation unit.
//!
//! A unit is stale when its object is missing, when the source is at least as
//! new as the object, or when any header in the transitive include closure is
//! at least as new as a fixed threshold (the object's mtime, or the source's
//! when there is no object to compare against).
//!
//! Equal timestamps count as stale to tolerate coarse filesystem clocks.

use super::includes::{IncludeResolver, SearchPath};
use super::scan::DirectiveScanner;
use super::utils::mtime;
use crate::error::BuildResult;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub struct StalenessOracle<'r, S> {
    resolver: &'r IncludeResolver<S>,
}

impl<'r, S: DirectiveScanner> StalenessOracle<'r, S> {
    pub fn new(resolver: &'r IncludeResolver<S>) -> Self {
        Self { resolver }
    }

    /// Decide whether `source` must be recompiled.
    ///
    /// Headers are visited at most once per call, even when reached through
    /// different parents with different local search paths.
    pub fn is_stale(
        &self,
        source: &Path,
        object: Option<&Path>,
        search_path: &SearchPath,
    ) -> BuildResult<bool> {
        let source_mtime = mtime(source)?;

        let threshold = match object {
            None => source_mtime,
            Some(obj) => {
                if !obj.exists() {
                    return Ok(true);
                }
                let obj_mtime = mtime(obj)?;
                if source_mtime >= obj_mtime {
                    return Ok(true);
                }
                obj_mtime
            }
        };

        let mut visited = HashSet::new();
        self.any_include_newer(
            source,
            &search_path.rooted_at(source),
            threshold,
            &mut visited,
        )
    }

    fn any_include_newer(
        &self,
        file: &Path,
        search_path: &SearchPath,
        threshold: SystemTime,
        visited: &mut HashSet<PathBuf>,
    ) -> BuildResult<bool> {
        for include in self.resolver.resolved_includes(file, search_path)? {
            if !visited.insert(include.clone()) {
                continue;
            }
            if threshold <= mtime(&include)? {
                return Ok(true);
            }
            let nested = search_path.rooted_at(&include);
            if self.any_include_newer(&include, &nested, threshold, visited)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
