use std::path::PathBuf;

use clap::Parser;

use crate::diagnostic::Severity;

#[derive(Parser, Debug)]
#[command(
    name = "dotspace",
    version,
    about = "Checks and fixes spaces around Ruby method call operators"
)]
pub struct Args {
    /// Files or directories to lint
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "progress", value_parser = ["progress", "text", "json", "github", "quiet", "emacs", "simple"])]
    pub format: String,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Read source from stdin, use PATH for display and config matching
    #[arg(long, value_name = "PATH")]
    pub stdin: Option<PathBuf>,

    /// Minimum severity for a non-zero exit code (convention, warning, error, fatal, or C/W/E/F)
    #[arg(long, value_name = "SEVERITY", default_value = "convention")]
    pub fail_level: String,

    /// Stop after first file with offenses
    #[arg(short = 'F', long)]
    pub fail_fast: bool,

    /// Apply AllCops.Exclude to explicitly-passed files (by default, explicit files bypass exclusion)
    #[arg(long)]
    pub force_exclusion: bool,

    /// Print files that would be linted, then exit
    #[arg(short = 'L', long)]
    pub list_target_files: bool,

    /// Autocorrect offenses
    #[arg(short = 'a', long = "autocorrect")]
    pub autocorrect: bool,
}

impl Args {
    /// Parse `--fail-level`. Unknown values fall back to convention so
    /// any offense fails the run.
    pub fn fail_level(&self) -> Severity {
        Severity::from_str(&self.fail_level).unwrap_or_else(|| {
            tracing::warn!(value = %self.fail_level, "unknown --fail-level, using convention");
            Severity::Convention
        })
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            config: None,
            format: "progress".to_string(),
            debug: false,
            stdin: None,
            fail_level: "convention".to_string(),
            fail_fast: false,
            force_exclusion: false,
            list_target_files: false,
            autocorrect: false,
        }
    }
}
