pub mod cli;
pub mod config;
pub mod cop;
pub mod correction;
pub mod diagnostic;
pub mod formatter;
pub mod fs;
pub mod linter;
pub mod parse;

#[cfg(test)]
pub mod testutil;

use std::io::Read;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use cli::Args;
use config::{ResolvedConfig, load_config};
use cop::default_cops;
use diagnostic::{Diagnostic, Severity};
use formatter::create_formatter;
use fs::{DiscoveredFiles, discover_files};
use linter::{lint_source, run_linter};
use parse::source::SourceFile;

/// Separates the report from the corrected source in `--stdin -a` mode.
pub const STDIN_SEPARATOR: &str = "====================";

/// Install the stderr subscriber. `RUST_LOG` wins over `--debug`.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second call (as in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the linter. Returns the exit code: 0 = clean, 1 = offenses at or
/// above the fail level.
pub fn run(args: Args) -> Result<i32> {
    let target_dir = args.paths.first().map(|p| {
        if p.is_file() {
            p.parent().unwrap_or(p)
        } else {
            p.as_path()
        }
    });
    let config_start = Instant::now();
    let config = load_config(args.config.as_deref(), target_dir)?;
    tracing::debug!(
        path = ?config.config_path(),
        global_excludes = ?config.global_excludes(),
        elapsed = ?config_start.elapsed(),
        "config loaded"
    );

    let cops = default_cops();
    let fail_level = args.fail_level();

    // --stdin: read from stdin and lint a single source
    if let Some(ref display_path) = args.stdin {
        let mut input = Vec::new();
        std::io::stdin()
            .read_to_end(&mut input)
            .context("failed to read stdin")?;
        let source = SourceFile::from_vec(display_path.clone(), input);
        let outcome = lint_source(&source, &config, &cops, &args)?;
        let formatter = create_formatter(&args.format);
        formatter.print(&outcome.diagnostics, std::slice::from_ref(display_path));
        if args.autocorrect {
            let text = match outcome.corrected {
                Some(ref corrected) => corrected.as_str(),
                None => source.text()?,
            };
            print!("{STDIN_SEPARATOR}\n{text}");
        }
        return Ok(exit_code(&outcome.diagnostics, fail_level));
    }

    let files = discover_files(&args.paths, &config)?;
    tracing::debug!(files = files.files.len(), cops = cops.len(), "files discovered");

    if args.list_target_files {
        for file in &files.files {
            if is_listed(file, &files, &config, &args) {
                println!("{}", file.display());
            }
        }
        return Ok(0);
    }

    let result = run_linter(&files, &config, &cops, &args);
    let formatter = create_formatter(&args.format);
    formatter.print(&result.diagnostics, &files.files);
    if result.corrected_count > 0 {
        tracing::debug!(corrected = result.corrected_count, "autocorrect finished");
    }

    Ok(exit_code(&result.diagnostics, fail_level))
}

// Same exclusion rule the linter applies, so -L lists what would be linted.
fn is_listed(path: &Path, files: &DiscoveredFiles, config: &ResolvedConfig, args: &Args) -> bool {
    (files.is_explicit(path) && !args.force_exclusion) || !config.is_globally_excluded(path)
}

/// 1 if any offense left uncorrected is at or above `fail_level`.
pub fn exit_code(diagnostics: &[Diagnostic], fail_level: Severity) -> i32 {
    let failing = diagnostics
        .iter()
        .any(|d| !d.corrected && d.severity >= fail_level);
    i32::from(failing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Location;

    fn diag(severity: Severity, corrected: bool) -> Diagnostic {
        Diagnostic {
            path: "a.rb".to_string(),
            location: Location { line: 1, column: 3 },
            severity,
            cop_name: "Layout/SpaceAroundMethodCallOperator".to_string(),
            message: "m".to_string(),
            corrected,
        }
    }

    #[test]
    fn exit_code_respects_fail_level() {
        assert_eq!(exit_code(&[], Severity::Convention), 0);
        assert_eq!(exit_code(&[diag(Severity::Convention, false)], Severity::Convention), 1);
        assert_eq!(exit_code(&[diag(Severity::Convention, false)], Severity::Warning), 0);
        assert_eq!(exit_code(&[diag(Severity::Error, false)], Severity::Warning), 1);
    }

    #[test]
    fn corrected_offenses_do_not_fail() {
        assert_eq!(exit_code(&[diag(Severity::Convention, true)], Severity::Convention), 0);
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
    }
}
