use super::artifact::ArtifactPathMapper;
use super::feedback::FeedbackAnalyzer;
use super::includes::{IncludeResolver, SearchPath};
use super::scan::{DirectiveScanner, TextualScanner};
use super::staleness::StalenessOracle;
use super::utils::{display_path, mtime};
use crate::error::{BuildError, BuildResult};
use crate::toolchain::{CompileRequest, LinkRequest, ToolOutput, Toolchain};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One linkable program: an entry file plus candidate library sources.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    /// Output name; objects live under `build_root/.<name>/`.
    pub name: String,
    /// Base for printed paths and the `directory` of compile commands.
    pub project_root: PathBuf,
    pub entry: PathBuf,
    /// Candidate sources. May contain the entry and other files with a `main`.
    pub sources: Vec<PathBuf>,
    pub search_path: SearchPath,
    pub build_root: PathBuf,
    pub output: PathBuf,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl BuildTarget {
    pub fn object_namespace(&self) -> String {
        format!(".{}", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Show staleness decisions and skipped files
    pub verbose: bool,
    /// Plan only; never invoke the toolchain or write files
    pub dry_run: bool,
    /// Concurrent compile requests (1 = sequential)
    pub jobs: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            jobs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    pub source: PathBuf,
    pub object: PathBuf,
    pub stale: bool,
}

/// Staleness decisions for every unit of a target, entry first.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub units: Vec<CompileUnit>,
    /// Candidates dropped because they define their own `main`.
    pub excluded: Vec<PathBuf>,
}

impl BuildPlan {
    pub fn stale_units(&self) -> impl Iterator<Item = &CompileUnit> {
        self.units.iter().filter(|u| u.stale)
    }

    /// Objects in link order.
    pub fn objects(&self) -> Vec<PathBuf> {
        self.units.iter().map(|u| u.object.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output: PathBuf,
    pub compiled: Vec<PathBuf>,
    pub linked: bool,
    pub excluded: Vec<PathBuf>,
}

impl BuildReport {
    pub fn up_to_date(&self) -> bool {
        self.compiled.is_empty() && !self.linked
    }
}

pub struct Builder<'t, T: ?Sized, S = TextualScanner> {
    toolchain: &'t T,
    resolver: IncludeResolver<S>,
    options: BuildOptions,
}

impl<'t, T: Toolchain + ?Sized> Builder<'t, T, TextualScanner> {
    pub fn new(toolchain: &'t T, options: BuildOptions) -> Self {
        Self::with_resolver(toolchain, IncludeResolver::new(), options)
    }
}

impl<'t, T: Toolchain + ?Sized, S: DirectiveScanner> Builder<'t, T, S> {
    pub fn with_resolver(toolchain: &'t T, resolver: IncludeResolver<S>, options: BuildOptions) -> Self {
        Self {
            toolchain,
            resolver,
            options,
        }
    }

    pub fn resolver(&self) -> &IncludeResolver<S> {
        &self.resolver
    }

    /// Classify sources, map objects and decide which units are stale.
    ///
    /// Every unit's include closure is resolved up front, so an unresolvable
    /// include fails here before any compile request is made.
    pub fn plan(&self, target: &BuildTarget) -> BuildResult<BuildPlan> {
        validate(target)?;
        let root = &target.project_root;

        // 1. Entry first, then library sources without their own main
        let mut sources = vec![target.entry.clone()];
        let mut seen: HashSet<&Path> = HashSet::from([target.entry.as_path()]);
        let mut excluded = Vec::new();
        for src in &target.sources {
            if !seen.insert(src.as_path()) {
                continue;
            }
            if self.resolver.defines_entry_point(src)? {
                if self.options.verbose {
                    println!(
                        "   {} Skipping (defines main): {}",
                        "-".dimmed(),
                        display_path(src, root)
                    );
                }
                excluded.push(src.clone());
                continue;
            }
            sources.push(src.clone());
        }

        // 2. Object paths
        let mapper = ArtifactPathMapper::new(&target.build_root, target.object_namespace());
        let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
        let mut objects = Vec::with_capacity(sources.len());
        for src in &sources {
            let obj = mapper.map(src)?;
            if let Some(other) = claimed.insert(obj.clone(), src) {
                return Err(BuildError::Configuration(format!(
                    "{} and {} both map to object {}",
                    other.display(),
                    src.display(),
                    obj.display()
                )));
            }
            objects.push(obj);
        }

        // 3. Preflight include resolution
        let mut visited = HashSet::new();
        for src in &sources {
            self.resolver
                .closure(src, &target.search_path, &mut visited)?;
        }

        // 4. Staleness
        let oracle = StalenessOracle::new(&self.resolver);
        let mut units = Vec::with_capacity(sources.len());
        for (source, object) in sources.into_iter().zip(objects) {
            let stale = oracle.is_stale(&source, Some(&object), &target.search_path)?;
            if self.options.verbose {
                let state = if stale { "stale".yellow() } else { "fresh".green() };
                println!("   {} {}", state, display_path(&source, root));
            }
            units.push(CompileUnit {
                source,
                object,
                stale,
            });
        }

        Ok(BuildPlan { units, excluded })
    }

    /// Compile every stale unit once, then link when any object is at least
    /// as new as the output.
    pub fn build(&self, target: &BuildTarget) -> BuildResult<BuildReport> {
        let start_time = Instant::now();
        let root = &target.project_root;
        println!(
            "{} Building: {}",
            "🚀".cyan(),
            display_path(&target.output, root)
        );

        let plan = self.plan(target)?;
        let stale: Vec<&CompileUnit> = plan.stale_units().collect();

        if self.options.dry_run {
            return self.dry_run(target, &plan, &stale);
        }

        self.compile_all(target, &stale)?;

        let objects = plan.objects();
        let linked = if needs_link(&target.output, &objects)? {
            self.link(target, &objects)?;
            true
        } else {
            false
        };

        if !target.output.is_file() {
            return Err(BuildError::MissingOutput {
                path: target.output.clone(),
            });
        }

        self.write_compile_commands(target, &plan)?;

        let report = BuildReport {
            output: target.output.clone(),
            compiled: stale.iter().map(|u| u.source.clone()).collect(),
            linked,
            excluded: plan.excluded.clone(),
        };

        if report.up_to_date() {
            println!("{} Up to date", "⚡".green());
        } else {
            println!(
                "{} Finished: {} in {:.2?}",
                "✓".green(),
                display_path(&target.output, root),
                start_time.elapsed()
            );
        }

        Ok(report)
    }

    fn dry_run(
        &self,
        target: &BuildTarget,
        plan: &BuildPlan,
        stale: &[&CompileUnit],
    ) -> BuildResult<BuildReport> {
        let root = &target.project_root;
        println!("{} DRY RUN - nothing will be executed", "!".yellow());
        for unit in stale {
            println!(
                "   Would compile: {} -> {}",
                display_path(&unit.source, root),
                display_path(&unit.object, root)
            );
        }

        // Fresh units always have an object on disk.
        let linked = !stale.is_empty() || needs_link(&target.output, &plan.objects())?;
        if linked {
            println!("   Would link: {}", display_path(&target.output, root));
        }

        Ok(BuildReport {
            output: target.output.clone(),
            compiled: stale.iter().map(|u| u.source.clone()).collect(),
            linked,
            excluded: plan.excluded.clone(),
        })
    }

    fn compile_all(&self, target: &BuildTarget, stale: &[&CompileUnit]) -> BuildResult<()> {
        if self.options.jobs <= 1 || stale.len() <= 1 {
            for unit in stale {
                self.compile_unit(target, unit, None)?;
            }
            return Ok(());
        }

        let pb = ProgressBar::new(stale.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message("Compiling...");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
            .map_err(|e| BuildError::Configuration(format!("cannot start compile workers: {}", e)))?;

        let result = pool.install(|| {
            stale
                .par_iter()
                .try_for_each(|unit| self.compile_unit(target, unit, Some(&pb)))
        });

        match &result {
            Ok(()) => pb.finish_with_message("Compilation complete"),
            Err(_) => pb.abandon_with_message("Compilation failed"),
        }
        result
    }

    fn compile_unit(
        &self,
        target: &BuildTarget,
        unit: &CompileUnit,
        pb: Option<&ProgressBar>,
    ) -> BuildResult<()> {
        let root = &target.project_root;
        if let Some(parent) = unit.object.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        say(
            pb,
            format!(
                "   {} Compiling: {} -> {}",
                "⚙".blue(),
                display_path(&unit.source, root),
                display_path(&unit.object, root)
            ),
        );

        let request = CompileRequest {
            source: &unit.source,
            object: &unit.object,
            flags: &target.cflags,
            include_dirs: target.search_path.dirs(),
        };
        let output = self.toolchain.compile(&request)?;
        report_tool_output(&output, &unit.source, root, pb);

        if let Some(pb) = pb {
            pb.inc(1);
        }

        if !output.success {
            return Err(BuildError::Compilation {
                file: unit.source.clone(),
                code: output.code,
            });
        }
        Ok(())
    }

    fn link(&self, target: &BuildTarget, objects: &[PathBuf]) -> BuildResult<()> {
        let root = &target.project_root;
        if let Some(parent) = target.output.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        println!(
            "   {} Linking: {}",
            "🔗".cyan(),
            display_path(&target.output, root)
        );
        let request = LinkRequest {
            objects,
            flags: &target.ldflags,
            output: &target.output,
        };
        let output = self.toolchain.link(&request)?;
        report_tool_output(&output, &target.output, root, None);

        if !output.success {
            return Err(BuildError::Link {
                output: target.output.clone(),
                code: output.code,
            });
        }
        Ok(())
    }

    fn write_compile_commands(&self, target: &BuildTarget, plan: &BuildPlan) -> BuildResult<()> {
        let directory = target.project_root.to_string_lossy().to_string();
        let entries: Vec<serde_json::Value> = plan
            .units
            .iter()
            .map(|unit| {
                let request = CompileRequest {
                    source: &unit.source,
                    object: &unit.object,
                    flags: &target.cflags,
                    include_dirs: target.search_path.dirs(),
                };
                json!({
                    "directory": directory,
                    "arguments": self.toolchain.compile_command(&request),
                    "file": unit.source.to_string_lossy(),
                    "output": unit.object.to_string_lossy(),
                })
            })
            .collect();

        let path = target.build_root.join("compile_commands.json");
        let json_str = serde_json::to_string_pretty(&entries)
            .map_err(|e| BuildError::io(&path, e.into()))?;
        fs::create_dir_all(&target.build_root).map_err(|e| BuildError::io(&target.build_root, e))?;
        fs::write(&path, json_str).map_err(|e| BuildError::io(&path, e))
    }
}

/// True when `output` is missing or some object is at least as new as it.
pub fn needs_link(output: &Path, objects: &[PathBuf]) -> BuildResult<bool> {
    if !output.exists() {
        return Ok(true);
    }
    let bin_time = mtime(output)?;
    for obj in objects {
        if mtime(obj)? >= bin_time {
            return Ok(true);
        }
    }
    Ok(false)
}

fn validate(target: &BuildTarget) -> BuildResult<()> {
    if !target.entry.is_file() {
        return Err(BuildError::Configuration(format!(
            "entry file {} does not exist",
            target.entry.display()
        )));
    }
    if target.sources.is_empty() {
        return Err(BuildError::Configuration(format!(
            "target '{}' has no candidate sources",
            target.name
        )));
    }
    if target.build_root.as_os_str().is_empty() {
        return Err(BuildError::Configuration(
            "build directory is not set".to_string(),
        ));
    }
    Ok(())
}

fn say(pb: Option<&ProgressBar>, msg: String) {
    match pb {
        Some(pb) => pb.println(msg),
        None => println!("{}", msg),
    }
}

fn report_tool_output(output: &ToolOutput, subject: &Path, root: &Path, pb: Option<&ProgressBar>) {
    let stderr = output.stderr.trim_end();
    if stderr.is_empty() {
        return;
    }
    let shown = display_path(subject, root);
    if output.success {
        say(pb, format!("{} Warning in {}:\n{}", "!".yellow(), shown, stderr));
        return;
    }
    say(pb, format!("{} Error in {}:\n{}", "x".red(), shown, stderr));
    if let Some(hint) = FeedbackAnalyzer::analyze(stderr) {
        say(pb, format!("{} {}", "💡".yellow(), hint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::utils::normalize_path;
    use std::fs::File;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    /// Writes an empty object/binary for every request and records it.
    #[derive(Default)]
    struct FakeToolchain {
        compiled: Mutex<Vec<PathBuf>>,
        links: Mutex<Vec<Vec<PathBuf>>>,
        fail_on: Option<PathBuf>,
    }

    impl Toolchain for FakeToolchain {
        fn compile(&self, request: &CompileRequest<'_>) -> BuildResult<ToolOutput> {
            self.compiled.lock().unwrap().push(request.source.to_path_buf());
            if self.fail_on.as_deref() == Some(request.source) {
                return Ok(ToolOutput::failed(3, "error: expected ';'"));
            }
            fs::write(request.object, "obj").unwrap();
            Ok(ToolOutput::ok())
        }

        fn link(&self, request: &LinkRequest<'_>) -> BuildResult<ToolOutput> {
            self.links.lock().unwrap().push(request.objects.to_vec());
            fs::write(request.output, "bin").unwrap();
            Ok(ToolOutput::ok())
        }

        fn compile_command(&self, request: &CompileRequest<'_>) -> Vec<String> {
            vec!["fakecc".into(), request.source.to_string_lossy().to_string()]
        }
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn project() -> (tempfile::TempDir, BuildTarget) {
        let dir = tempfile::tempdir().unwrap();
        let root = normalize_path(dir.path()).unwrap();
        let src = root.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.c"), "#include \"util.h\"\nint main(void) { return 0; }\n").unwrap();
        fs::write(src.join("util.h"), "int twice(int);\n").unwrap();
        fs::write(src.join("util.c"), "#include \"util.h\"\nint twice(int x) { return 2 * x; }\n").unwrap();
        fs::write(src.join("tool.c"), "int main(void) { return 1; }\n").unwrap();

        let old = UNIX_EPOCH + Duration::from_secs(1_000);
        for f in ["main.c", "util.h", "util.c", "tool.c"] {
            set_mtime(&src.join(f), old);
        }

        let target = BuildTarget {
            name: "app-debug".into(),
            project_root: root.clone(),
            entry: src.join("main.c"),
            sources: vec![src.join("main.c"), src.join("tool.c"), src.join("util.c")],
            search_path: SearchPath::new(vec![src.clone()]),
            build_root: root.join("bin"),
            output: root.join("bin").join("app-debug"),
            cflags: vec!["-Wall".into()],
            ldflags: vec!["-lm".into()],
        };
        (dir, target)
    }

    #[test]
    fn test_plan_excludes_other_entry_points() {
        let (_dir, target) = project();
        let tc = FakeToolchain::default();
        let plan = Builder::new(&tc, BuildOptions::default()).plan(&target).unwrap();

        let sources: Vec<_> = plan.units.iter().map(|u| u.source.clone()).collect();
        assert_eq!(sources, vec![target.entry.clone(), target.project_root.join("src/util.c")]);
        assert_eq!(plan.excluded, vec![target.project_root.join("src/tool.c")]);
        assert!(plan.units.iter().all(|u| u.stale));
        assert_eq!(
            plan.units[0].object,
            target.build_root.join(".app-debug/src/main.o")
        );
    }

    #[test]
    fn test_first_build_compiles_everything_and_links() {
        let (_dir, target) = project();
        let tc = FakeToolchain::default();
        let report = Builder::new(&tc, BuildOptions::default()).build(&target).unwrap();

        assert_eq!(report.compiled.len(), 2);
        assert!(report.linked);
        assert!(target.output.is_file());
        assert_eq!(
            tc.links.lock().unwrap()[0],
            vec![
                target.build_root.join(".app-debug/src/main.o"),
                target.build_root.join(".app-debug/src/util.o"),
            ]
        );
        assert!(target.build_root.join("compile_commands.json").is_file());
    }

    #[test]
    fn test_second_build_is_up_to_date() {
        let (_dir, target) = project();
        let tc = FakeToolchain::default();
        Builder::new(&tc, BuildOptions::default()).build(&target).unwrap();

        // Objects and binary strictly newer than every input, binary newest.
        let now = SystemTime::now();
        for unit in Builder::new(&tc, BuildOptions::default()).plan(&target).unwrap().units {
            set_mtime(&unit.object, now - Duration::from_secs(10));
        }
        set_mtime(&target.output, now);

        let tc2 = FakeToolchain::default();
        let report = Builder::new(&tc2, BuildOptions::default()).build(&target).unwrap();
        assert!(report.up_to_date());
        assert!(tc2.compiled.lock().unwrap().is_empty());
        assert!(tc2.links.lock().unwrap().is_empty());
    }

    #[test]
    fn test_compile_failure_aborts_before_link() {
        let (_dir, target) = project();
        let tc = FakeToolchain {
            fail_on: Some(target.entry.clone()),
            ..Default::default()
        };
        let err = Builder::new(&tc, BuildOptions::default()).build(&target).unwrap_err();
        match err {
            BuildError::Compilation { file, code } => {
                assert_eq!(file, target.entry);
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Sequential mode stops at the first failing unit.
        assert_eq!(tc.compiled.lock().unwrap().len(), 1);
        assert!(tc.links.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parallel_build_compiles_each_stale_unit_once() {
        let (_dir, target) = project();
        let tc = FakeToolchain::default();
        let options = BuildOptions {
            jobs: 4,
            ..Default::default()
        };
        let report = Builder::new(&tc, options).build(&target).unwrap();
        assert!(report.linked);
        let mut compiled = tc.compiled.lock().unwrap().clone();
        compiled.sort();
        assert_eq!(
            compiled,
            vec![target.entry.clone(), target.project_root.join("src/util.c")]
        );
    }

    #[test]
    fn test_parallel_failure_returns_compilation_error_without_link() {
        let (_dir, target) = project();
        let util = target.project_root.join("src/util.c");
        let tc = FakeToolchain {
            fail_on: Some(util.clone()),
            ..Default::default()
        };
        let options = BuildOptions {
            jobs: 4,
            ..Default::default()
        };
        let err = Builder::new(&tc, options).build(&target).unwrap_err();
        match err {
            BuildError::Compilation { file, code } => {
                assert_eq!(file, util);
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(tc.links.lock().unwrap().is_empty());
        assert!(!target.output.exists());
    }

    #[test]
    fn test_sources_sharing_an_object_path_are_rejected() {
        let (_dir, mut target) = project();
        let src = target.project_root.join("src");
        fs::write(src.join("a.c"), "int a(void) { return 1; }\n").unwrap();
        fs::write(src.join("a.s"), ".globl b\nb:\n    ret\n").unwrap();
        target.sources = vec![target.entry.clone(), src.join("a.c"), src.join("a.s")];

        let tc = FakeToolchain::default();
        let err = Builder::new(&tc, BuildOptions::default()).plan(&target).unwrap_err();
        match err {
            BuildError::Configuration(msg) => assert!(msg.contains("a.o"), "message: {msg}"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(tc.compiled.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (_dir, target) = project();
        let tc = FakeToolchain::default();
        let options = BuildOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = Builder::new(&tc, options).build(&target).unwrap();
        assert_eq!(report.compiled.len(), 2);
        assert!(report.linked);
        assert!(tc.compiled.lock().unwrap().is_empty());
        assert!(!target.build_root.exists());
    }

    #[test]
    fn test_missing_entry_is_configuration_error() {
        let (_dir, mut target) = project();
        target.entry = target.project_root.join("src/absent.c");
        let tc = FakeToolchain::default();
        let err = Builder::new(&tc, BuildOptions::default()).plan(&target).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }

    #[test]
    fn test_empty_candidate_set_is_configuration_error() {
        let (_dir, mut target) = project();
        target.sources.clear();
        let tc = FakeToolchain::default();
        let err = Builder::new(&tc, BuildOptions::default()).plan(&target).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }

    #[test]
    fn test_needs_link_on_equal_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("a.o");
        let bin = dir.path().join("app");
        fs::write(&obj, "").unwrap();
        fs::write(&bin, "").unwrap();
        let t = UNIX_EPOCH + Duration::from_secs(5_000);
        set_mtime(&obj, t);
        set_mtime(&bin, t);
        assert!(needs_link(&bin, &[obj.clone()]).unwrap());

        set_mtime(&bin, t + Duration::from_secs(1));
        assert!(!needs_link(&bin, &[obj]).unwrap());
        assert!(needs_link(&dir.path().join("missing"), &[]).unwrap());
    }
}
