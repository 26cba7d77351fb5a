//! Compiler and linker collaborators.
//!
//! The build engine only decides *what* to compile and link; a [`Toolchain`]
//! carries it out and reports a status. [`CommandToolchain`] drives a
//! GCC-compatible driver (`gcc`, `clang`, `cc`) as a child process.

pub mod types;

pub use types::{CompileRequest, CompilerType, LinkRequest, ToolOutput};

use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Executes compile and link requests.
///
/// `Sync` so independent compile requests may run on worker threads.
pub trait Toolchain: Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> BuildResult<ToolOutput>;
    fn link(&self, request: &LinkRequest<'_>) -> BuildResult<ToolOutput>;

    /// Full command line for a compile request (compile_commands.json).
    fn compile_command(&self, request: &CompileRequest<'_>) -> Vec<String>;
}

/// A GCC-style compiler driver used for both compiling and linking.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    pub compiler_type: CompilerType,
    pub program: PathBuf,
    pub version: String,
}

impl CommandToolchain {
    pub fn new(compiler_type: CompilerType, program: PathBuf, version: String) -> Self {
        Self {
            compiler_type,
            program,
            version,
        }
    }

    fn compile_args(request: &CompileRequest<'_>) -> Vec<String> {
        let mut args: Vec<String> = request.flags.to_vec();
        for dir in request.include_dirs {
            args.push(format!("-I{}", dir.display()));
        }
        args.push("-c".to_string());
        args.push(request.source.to_string_lossy().to_string());
        args.push("-o".to_string());
        args.push(request.object.to_string_lossy().to_string());
        args
    }

    fn run(&self, args: &[String]) -> BuildResult<ToolOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| BuildError::ToolUnavailable {
                program: self.program.display().to_string(),
                source: e,
            })?;
        Ok(output.into())
    }
}

impl Toolchain for CommandToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> BuildResult<ToolOutput> {
        self.run(&Self::compile_args(request))
    }

    fn link(&self, request: &LinkRequest<'_>) -> BuildResult<ToolOutput> {
        let mut args: Vec<String> = request
            .objects
            .iter()
            .map(|o| o.to_string_lossy().to_string())
            .collect();
        args.extend(request.flags.iter().cloned());
        args.push("-o".to_string());
        args.push(request.output.to_string_lossy().to_string());
        self.run(&args)
    }

    fn compile_command(&self, request: &CompileRequest<'_>) -> Vec<String> {
        let mut cmd = vec![self.program.to_string_lossy().to_string()];
        cmd.extend(Self::compile_args(request));
        cmd
    }
}

/// Find a usable compiler driver.
///
/// Order: `preferred` (from config), `$CC`, then `gcc`, `clang`, `cc`.
pub fn detect_toolchain(preferred: Option<&str>) -> BuildResult<CommandToolchain> {
    let candidates: Vec<String> = match preferred {
        Some(p) => vec![p.to_string()],
        None => std::env::var("CC")
            .ok()
            .filter(|cc| !cc.trim().is_empty())
            .into_iter()
            .chain(["gcc", "clang", "cc"].map(String::from))
            .collect(),
    };

    for cmd in &candidates {
        if let Some(banner) = probe(Path::new(cmd)) {
            return Ok(CommandToolchain::new(
                CompilerType::from_version_banner(&banner),
                PathBuf::from(cmd),
                banner,
            ));
        }
    }

    Err(BuildError::ToolUnavailable {
        program: candidates.join(", "),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no C compiler found. Please install gcc or clang, or set 'compiler' in incbuild.toml",
        ),
    })
}

fn probe(program: &Path) -> Option<String> {
    let output = Command::new(program).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("unknown")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_command_layout() {
        let tc = CommandToolchain::new(CompilerType::Gcc, PathBuf::from("gcc"), "gcc 13".into());
        let flags = vec!["-std=c99".to_string(), "-Wall".to_string()];
        let include_dirs = vec![PathBuf::from("/p/src")];
        let request = CompileRequest {
            source: Path::new("/p/src/main.c"),
            object: Path::new("/p/bin/.app/src/main.o"),
            flags: &flags,
            include_dirs: &include_dirs,
        };
        assert_eq!(
            tc.compile_command(&request),
            vec![
                "gcc",
                "-std=c99",
                "-Wall",
                "-I/p/src",
                "-c",
                "/p/src/main.c",
                "-o",
                "/p/bin/.app/src/main.o"
            ]
        );
    }

    #[test]
    fn test_missing_program_is_tool_unavailable() {
        let tc = CommandToolchain::new(
            CompilerType::Generic,
            PathBuf::from("definitely-not-a-compiler-xyz"),
            String::new(),
        );
        let objects = vec![PathBuf::from("a.o")];
        let err = tc
            .link(&LinkRequest {
                objects: &objects,
                flags: &[],
                output: Path::new("app"),
            })
            .unwrap_err();
        assert!(matches!(err, BuildError::ToolUnavailable { .. }));
    }

    #[test]
    fn test_detect_rejects_unknown_preferred_compiler() {
        assert!(detect_toolchain(Some("definitely-not-a-compiler-xyz")).is_err());
    }
}
