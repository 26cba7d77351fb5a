//! Include tree visualization.
//!
//! This module provides the `incbuild deps` command which displays the
//! resolved quoted-include graph of one file in an ASCII tree format.
//!
//! ## Example Output
//!
//! ```text
//! src/modelgen.c
//! ├── src/modelgen.h
//! │   └── src/value.h
//! └── src/value.h (*)
//! ```
//!
//! `(*)` marks a header already expanded earlier in the tree.

use crate::build::{DirectiveScanner, IncludeResolver, SearchPath, display_path};
use crate::error::BuildResult;
use colored::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Render the include tree of `file` as lines (without colors).
pub fn include_tree<S: DirectiveScanner>(
    resolver: &IncludeResolver<S>,
    file: &Path,
    search_path: &SearchPath,
    base: &Path,
) -> BuildResult<Vec<String>> {
    let mut lines = vec![display_path(file, base)];
    let mut seen = HashSet::new();
    walk(
        resolver,
        file,
        &search_path.rooted_at(file),
        base,
        "",
        &mut seen,
        &mut lines,
    )?;
    Ok(lines)
}

fn walk<S: DirectiveScanner>(
    resolver: &IncludeResolver<S>,
    file: &Path,
    search_path: &SearchPath,
    base: &Path,
    prefix: &str,
    seen: &mut HashSet<PathBuf>,
    lines: &mut Vec<String>,
) -> BuildResult<()> {
    let includes = resolver.resolved_includes(file, search_path)?;
    let count = includes.len();

    for (i, include) in includes.into_iter().enumerate() {
        let is_last = i == count - 1;
        let branch = if is_last { "└──" } else { "├──" };
        let shown = display_path(&include, base);

        if !seen.insert(include.clone()) {
            lines.push(format!("{}{} {} (*)", prefix, branch, shown));
            continue;
        }
        lines.push(format!("{}{} {}", prefix, branch, shown));

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        let nested = search_path.rooted_at(&include);
        walk(resolver, &include, &nested, base, &child_prefix, seen, lines)?;
    }
    Ok(())
}

pub fn print_tree<S: DirectiveScanner>(
    resolver: &IncludeResolver<S>,
    file: &Path,
    search_path: &SearchPath,
    base: &Path,
) -> BuildResult<()> {
    let lines = include_tree(resolver, file, search_path, base)?;
    let mut iter = lines.into_iter();
    if let Some(root) = iter.next() {
        println!("{}", root.bold().cyan());
    }
    for line in iter {
        if let Some(stripped) = line.strip_suffix(" (*)") {
            println!("{} {}", stripped, "(*)".dimmed());
        } else {
            println!("{}", line);
        }
    }
    Ok(())
}
