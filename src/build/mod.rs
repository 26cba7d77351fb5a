pub mod artifact;
mod clean;
mod core;
mod feedback;
pub mod includes;
pub mod scan;
pub mod staleness;
mod utils;

pub use artifact::{ArtifactPathMapper, object_path};
pub use clean::clean;
pub use self::core::{
    BuildOptions, BuildPlan, BuildReport, BuildTarget, Builder, CompileUnit, needs_link,
};
pub use feedback::FeedbackAnalyzer;
pub use includes::{IncludeResolver, SearchPath};
pub use scan::{DirectiveScanner, TextualScanner};
pub use staleness::StalenessOracle;
pub use utils::{CONFIG_FILE, collect_sources, copy_alias, display_path, load_config, mtime, normalize_path};
