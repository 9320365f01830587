use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::cli::Args;
use crate::config::ResolvedConfig;
use crate::cop::Cop;
use crate::correction::{Correction, CorrectionPlan};
use crate::diagnostic::Diagnostic;
use crate::fs::DiscoveredFiles;
use crate::parse::lexer::tokenize;
use crate::parse::source::SourceFile;

pub struct LintResult {
    pub diagnostics: Vec<Diagnostic>,
    pub file_count: usize,
    /// Number of offenses corrected across all files.
    pub corrected_count: usize,
}

/// Outcome of linting one source.
#[derive(Debug)]
pub struct SourceOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Corrected text, present only when autocorrect changed something.
    pub corrected: Option<String>,
}

impl SourceOutcome {
    pub fn corrected_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.corrected).count()
    }
}

/// Lint every discovered file in parallel.
///
/// Files that can't be read or decoded are logged and skipped. Under
/// autocorrect, changed files are written back in place.
pub fn run_linter(
    files: &DiscoveredFiles,
    config: &ResolvedConfig,
    cops: &[Box<dyn Cop>],
    args: &Args,
) -> LintResult {
    let start = Instant::now();
    let stop = AtomicBool::new(false);
    let total_corrected = AtomicUsize::new(0);

    let mut diagnostics: Vec<Diagnostic> = files
        .files
        .par_iter()
        .flat_map(|path| {
            if args.fail_fast && stop.load(Ordering::Relaxed) {
                return Vec::new();
            }
            let diags = lint_file(path, files, config, cops, args, &total_corrected);
            if args.fail_fast && !diags.is_empty() {
                stop.store(true, Ordering::Relaxed);
            }
            diags
        })
        .collect();

    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    tracing::debug!(
        files = files.files.len(),
        offenses = diagnostics.len(),
        elapsed = ?start.elapsed(),
        "lint finished"
    );

    LintResult {
        diagnostics,
        file_count: files.files.len(),
        corrected_count: total_corrected.load(Ordering::Relaxed),
    }
}

fn lint_file(
    path: &Path,
    files: &DiscoveredFiles,
    config: &ResolvedConfig,
    cops: &[Box<dyn Cop>],
    args: &Args,
    total_corrected: &AtomicUsize,
) -> Vec<Diagnostic> {
    // Explicitly named files bypass AllCops.Exclude unless --force-exclusion.
    let bypass = files.is_explicit(path) && !args.force_exclusion;
    if !bypass && config.is_globally_excluded(path) {
        tracing::debug!(path = %path.display(), "excluded by AllCops.Exclude");
        return Vec::new();
    }

    let source = match SourceFile::from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{e:#}");
            return Vec::new();
        }
    };

    let mut outcome = match lint_source(&source, config, cops, args) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("skipping {}: {e:#}", path.display());
            return Vec::new();
        }
    };

    if let Some(corrected) = outcome.corrected.take() {
        match std::fs::write(path, corrected) {
            Ok(()) => {
                total_corrected.fetch_add(outcome.corrected_count(), Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to write corrected file {}: {e}", path.display());
                for d in &mut outcome.diagnostics {
                    d.corrected = false;
                }
            }
        }
    }

    outcome.diagnostics
}

/// Run every enabled cop over one source, correcting it when `-a` is given.
///
/// Fails only if the source is not valid UTF-8. A correction plan that
/// fails validation is logged and dropped; the offenses are then reported
/// uncorrected.
pub fn lint_source(
    source: &SourceFile,
    config: &ResolvedConfig,
    cops: &[Box<dyn Cop>],
    args: &Args,
) -> Result<SourceOutcome> {
    let text = source
        .text()
        .with_context(|| format!("cannot decode {}", source.path.display()))?;

    let (mut diagnostics, corrections) = run_cops(source, text, config, cops, args.autocorrect);
    if corrections.is_empty() {
        return Ok(SourceOutcome {
            diagnostics,
            corrected: None,
        });
    }

    let correcting: Vec<&'static str> = {
        let mut names: Vec<_> = corrections.iter().map(|c| c.cop_name).collect();
        names.sort_unstable();
        names.dedup();
        names
    };

    let plan = match CorrectionPlan::new(corrections, text) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::warn!("discarding corrections for {}: {e}", source.path.display());
            for d in &mut diagnostics {
                d.corrected = false;
            }
            return Ok(SourceOutcome {
                diagnostics,
                corrected: None,
            });
        }
    };
    let corrected = plan.apply(text);

    // One re-check of the corrected text with the cops that edited it.
    let recheck = SourceFile::from_string(source.path.clone(), corrected.clone());
    let remaining = recheck_cops(&recheck, &corrected, config, cops, &correcting);
    if !remaining.is_empty() {
        tracing::warn!(
            path = %source.path.display(),
            remaining = remaining.len(),
            "offenses remain after autocorrect"
        );
        diagnostics.extend(remaining);
    }

    Ok(SourceOutcome {
        diagnostics,
        corrected: Some(corrected),
    })
}

fn run_cops(
    source: &SourceFile,
    text: &str,
    config: &ResolvedConfig,
    cops: &[Box<dyn Cop>],
    autocorrect: bool,
) -> (Vec<Diagnostic>, Vec<Correction>) {
    let tokens = tokenize(text);
    let mut diagnostics = Vec::new();
    let mut corrections = Vec::new();

    for cop in cops {
        let name = cop.name();
        if !config.is_cop_enabled(name, &source.path) {
            continue;
        }
        let cop_config = config.cop_config(name);
        let correct = autocorrect && cop.supports_autocorrect() && cop_config.autocorrect;

        let first = diagnostics.len();
        cop.check_source(
            source,
            &tokens,
            &cop_config,
            &mut diagnostics,
            correct.then_some(&mut corrections),
        );
        if let Some(severity) = cop_config.severity {
            for d in &mut diagnostics[first..] {
                d.severity = severity;
            }
        }
    }

    (diagnostics, corrections)
}

fn recheck_cops(
    source: &SourceFile,
    text: &str,
    config: &ResolvedConfig,
    cops: &[Box<dyn Cop>],
    names: &[&str],
) -> Vec<Diagnostic> {
    let tokens = tokenize(text);
    let mut diagnostics = Vec::new();
    for cop in cops.iter().filter(|c| names.contains(&c.name())) {
        let cop_config = config.cop_config(cop.name());
        let first = diagnostics.len();
        cop.check_source(source, &tokens, &cop_config, &mut diagnostics, None);
        if let Some(severity) = cop_config.severity {
            for d in &mut diagnostics[first..] {
                d.severity = severity;
            }
        }
    }
    diagnostics
}
