use std::path::{Path, PathBuf};

/// Supported compiler families. All of them take GCC-style flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerType {
    /// GNU Compiler Collection (gcc)
    Gcc,
    /// Clang/LLVM (clang)
    Clang,
    /// Whatever `cc` points at
    Generic,
}

impl CompilerType {
    /// Guess the family from a `--version` banner.
    pub fn from_version_banner(banner: &str) -> Self {
        let lower = banner.to_lowercase();
        if lower.contains("clang") {
            CompilerType::Clang
        } else if lower.contains("gcc") || lower.contains("free software foundation") {
            CompilerType::Gcc
        } else {
            CompilerType::Generic
        }
    }
}

impl std::fmt::Display for CompilerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompilerType::Gcc => write!(f, "gcc"),
            CompilerType::Clang => write!(f, "clang"),
            CompilerType::Generic => write!(f, "cc"),
        }
    }
}

/// One "compile this" request.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub source: &'a Path,
    pub object: &'a Path,
    pub flags: &'a [String],
    pub include_dirs: &'a [PathBuf],
}

/// One "link this" request. Object order is preserved on the command line.
#[derive(Debug, Clone, Copy)]
pub struct LinkRequest<'a> {
    pub objects: &'a [PathBuf],
    pub flags: &'a [String],
    pub output: &'a Path,
}

/// What came back from a compiler or linker run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit code; `None` when killed by a signal.
    pub code: Option<i32>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stderr: stderr.into(),
        }
    }
}

impl From<std::process::Output> for ToolOutput {
    fn from(output: std::process::Output) -> Self {
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            stderr.push_str(&stdout);
        }
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stderr,
        }
    }
}
