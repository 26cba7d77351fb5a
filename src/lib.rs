//! # incbuild - Incremental C Build Driver
//!
//! incbuild decides which C translation units need recompiling and whether
//! the final binary needs relinking, using nothing but quoted `#include`
//! directives and file modification times. There is no persisted build
//! graph and no content hashing: the objects and binaries on disk are the
//! only cache.
//!
//! ## Quick Start
//!
//! ```bash
//! # Build the debug variant described in incbuild.toml
//! incbuild build debug
//!
//! # Build and run, passing arguments through
//! incbuild run debug -- input.mg
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Include resolution, staleness checks and orchestration
//! - [`config`] - Configuration parsing (`incbuild.toml`)
//! - [`toolchain`] - Compiler/linker invocation and detection
//! - [`error`] - Error types shared by every stage

/// Incremental build engine.
pub mod build;

/// Configuration file parsing (`incbuild.toml`).
pub mod config;

/// Error types.
pub mod error;

/// Compiler and linker collaborators.
pub mod toolchain;

/// Include tree visualization.
pub mod tree;

/// Terminal UI utilities (tables).
pub mod ui;

pub use error::{BuildError, BuildResult};
