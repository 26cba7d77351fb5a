use colored::*;

/// Turns compiler/linker stderr into a short hint for the user.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Two translation units define main
        if output.contains("multiple definition of `main'")
            || output.contains("duplicate symbol _main")
            || output.contains("duplicate symbol '_main'")
        {
            return Some(format!(
                "More than one linked file defines {}.\nFiles are only dropped automatically when {} starts a line.",
                "main()".bold().yellow(),
                "int main(".bold().green()
            ));
        }

        // 2. Entry file has no main
        if output.contains("undefined reference to `main'")
            || output.contains("Undefined symbols for architecture")
                && output.contains("_main")
        {
            return Some(format!(
                "The linked program has no {} function.\nCheck the {} of this variant in {}.",
                "main()".bold().yellow(),
                "entry".bold().green(),
                "incbuild.toml".bold().yellow()
            ));
        }

        // 3. Generic unresolved symbol
        if output.contains("undefined reference to") {
            return Some(format!(
                "It looks like a {} error.\nA source directory or a library in {} may be missing.",
                "Linker".bold().red(),
                "ldflags".bold().yellow()
            ));
        }

        // 4. Header the compiler could not find
        if output.contains("fatal error: ") && output.contains("No such file or directory")
            || output.contains("file not found")
        {
            return Some(format!(
                "It looks like a {} error.\nAdd the header's directory to {} in {}.",
                "Missing Header".bold().red(),
                "include_dirs".bold().yellow(),
                "incbuild.toml".bold().yellow()
            ));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_main() {
        colored::control::set_override(false);
        let err = "helper.c:(.text+0x0): multiple definition of `main'";
        let msg = FeedbackAnalyzer::analyze(err).unwrap();
        assert!(msg.contains("More than one linked file"));
    }

    #[test]
    fn test_missing_main() {
        colored::control::set_override(false);
        let err = "crt1.o: in function `_start': undefined reference to `main'";
        let msg = FeedbackAnalyzer::analyze(err).unwrap();
        assert!(msg.contains("no main() function"));
    }

    #[test]
    fn test_linker_error() {
        colored::control::set_override(false);
        let err = "undefined reference to `sqrt'";
        let msg = FeedbackAnalyzer::analyze(err).unwrap();
        assert!(msg.contains("Linker error"));
    }

    #[test]
    fn test_include_error() {
        let err = "fatal error: foo.h: No such file or directory";
        let msg = FeedbackAnalyzer::analyze(err).unwrap();
        assert!(msg.contains("Missing Header"));
    }

    #[test]
    fn test_unknown_output() {
        assert!(FeedbackAnalyzer::analyze("warning: unused variable 'x'").is_none());
    }
}
