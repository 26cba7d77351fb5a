//! # incbuild CLI Entry Point
//!
//! Parses CLI arguments using clap, loads `incbuild.toml` and routes commands
//! to the build engine.
//!
//! ## Command Structure
//!
//! - **Build**: `build`, `run`, `clean`
//! - **Inspect**: `variants`, `deps`
//! - **Shell**: `completion`

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::Command;

use incbuild::build::{self, BuildOptions, Builder, IncludeResolver, SearchPath};
use incbuild::config::{ProjectFile, executable_name};
use incbuild::error::BuildError;
use incbuild::toolchain::{self, CommandToolchain, CompilerType};
use incbuild::tree;
use incbuild::ui;

#[derive(Parser)]
#[command(name = "incbuild")]
#[command(about = "Incremental C builds driven by #include directives", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the project configuration
    #[arg(long, global = true, default_value = build::CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one or more variants
    Build {
        /// Variant names from incbuild.toml, built in order
        #[arg(required = true, num_args = 1..)]
        variants: Vec<String>,
        /// Show staleness decisions and skipped files
        #[arg(short, long)]
        verbose: bool,
        /// Show what would be compiled and linked without running anything
        #[arg(long)]
        dry_run: bool,
        /// Number of concurrent compile jobs
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
        /// Remove the build directory first
        #[arg(long)]
        clean: bool,
    },
    /// Build a variant and run its binary
    Run {
        variant: String,
        #[arg(short, long)]
        verbose: bool,
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
        /// Arguments passed to the program (after `--`)
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Remove the build directory
    Clean,
    /// List configured variants
    Variants,
    /// Print the resolved include tree of a file
    Deps {
        file: PathBuf,
        /// Use this variant's include_dirs
        #[arg(long)]
        variant: Option<String>,
    },
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match dispatch(&cli) {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if let Some(build_err) = e.downcast_ref::<BuildError>() {
                eprintln!("{} {}", "x".red(), build_err);
                std::process::exit(build_err.exit_code());
            }
            Err(e)
        }
    }
}

fn dispatch(cli: &Cli) -> Result<i32> {
    if let Commands::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(0);
    }

    let config = build::load_config(&cli.config)?;
    let root = project_root(&cli.config)?;

    match &cli.command {
        Commands::Build {
            variants,
            verbose,
            dry_run,
            jobs,
            clean,
        } => {
            let options = BuildOptions {
                verbose: *verbose,
                dry_run: *dry_run,
                jobs: *jobs,
            };
            build_variants(&config, &root, variants, &options, *clean)?;
            Ok(0)
        }

        Commands::Run {
            variant,
            verbose,
            jobs,
            args,
        } => {
            let options = BuildOptions {
                verbose: *verbose,
                dry_run: false,
                jobs: *jobs,
            };
            let outputs = build_variants(&config, &root, std::slice::from_ref(variant), &options, false)?;
            let Some(bin) = outputs.last() else {
                return Ok(0);
            };

            println!("{} Running...\n", "▶".green());
            let status = Command::new(bin)
                .args(args)
                .status()
                .with_context(|| format!("Failed to run {}", bin.display()))?;
            Ok(status.code().unwrap_or(1))
        }

        Commands::Clean => {
            build::clean(&config.build_dir(&root)?, &root)?;
            Ok(0)
        }

        Commands::Variants => {
            print_variants(&config, &root);
            Ok(0)
        }

        Commands::Deps { file, variant } => {
            let search_path = match variant {
                Some(v) => config.search_path(&root, v)?,
                None => SearchPath::default(),
            };
            let file = build::normalize_path(file)?;
            tree::print_tree(&IncludeResolver::new(), &file, &search_path, &root)?;
            Ok(0)
        }

        Commands::Completion { .. } => Ok(0),
    }
}

fn project_root(config_path: &Path) -> Result<PathBuf> {
    let config_path = build::normalize_path(config_path)?;
    config_path
        .parent()
        .map(Path::to_path_buf)
        .context("Configuration file has no parent directory")
}

/// Build each variant in order; returns the produced binaries.
///
/// Every variant is resolved before the build directory is cleaned, so a
/// configuration error leaves the filesystem untouched.
fn build_variants(
    config: &ProjectFile,
    root: &Path,
    variants: &[String],
    options: &BuildOptions,
    clean_first: bool,
) -> Result<Vec<PathBuf>> {
    let targets = variants
        .iter()
        .map(|v| Ok((config.target(root, v)?, config.variant(v)?.alias)))
        .collect::<Result<Vec<_>, BuildError>>()?;

    let tc = if options.dry_run {
        let program = config.project.compiler.clone().unwrap_or_else(|| "cc".into());
        CommandToolchain::new(CompilerType::Generic, PathBuf::from(program), String::new())
    } else {
        let tc = toolchain::detect_toolchain(config.project.compiler.as_deref())?;
        if options.verbose {
            println!(
                "   {} Detected toolchain: {} [{}] ({})",
                "🔧".cyan(),
                tc.program.display(),
                tc.compiler_type,
                tc.version
            );
        }
        tc
    };

    if clean_first {
        let build_dir = config.build_dir(root)?;
        if options.dry_run {
            println!(
                "   {} Would remove {}",
                "-".dimmed(),
                build::display_path(&build_dir, root)
            );
        } else {
            build::clean(&build_dir, root)?;
        }
    }

    let mut outputs = Vec::new();
    for (target, alias) in &targets {
        let report = Builder::new(&tc, options.clone()).build(target)?;

        if *alias && !options.dry_run {
            let alias = config.alias_path(root)?;
            if build::copy_alias(&report.output, &alias)? {
                println!(
                    "   {} Copied to {}",
                    "📦".blue(),
                    build::display_path(&alias, root)
                );
            } else if options.verbose {
                println!(
                    "   {} Alias is the binary itself: {}",
                    "-".dimmed(),
                    build::display_path(&alias, root)
                );
            }
        }
        outputs.push(report.output);
    }
    Ok(outputs)
}

fn print_variants(config: &ProjectFile, root: &Path) {
    if config.variants.is_empty() {
        println!("{} No variants defined in the configuration.", "!".yellow());
        return;
    }

    println!("{} {}", "📦".blue(), config.project.name.bold());
    let mut table = ui::Table::new(&["Variant", "Entry", "Sources", "Output"]);
    for (name, variant) in &config.variants {
        let output_name = config
            .output_name(name)
            .unwrap_or_else(|_| name.clone());
        let output_path = root
            .join(&config.project.build_dir)
            .join(executable_name(&output_name));
        let mut output = build::display_path(&output_path, root);
        if variant.alias {
            output.push_str(" (alias)");
        }
        table.add_row(vec![
            name.bold().green().to_string(),
            variant.entry.clone(),
            variant.sources.join(", "),
            output,
        ]);
    }
    table.print();
}
