use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use crate::diagnostic::{Diagnostic, Severity};
use crate::formatter::{Formatter, summary_line};

/// One character per file (`.` or the worst severity letter), then the
/// offense list and a summary.
pub struct ProgressFormatter;

impl Formatter for ProgressFormatter {
    fn format_to(&self, diagnostics: &[Diagnostic], files: &[PathBuf], out: &mut dyn Write) {
        let mut worst_by_file: HashMap<&str, Severity> = HashMap::new();
        for d in diagnostics {
            worst_by_file
                .entry(&d.path)
                .and_modify(|s| *s = (*s).max(d.severity))
                .or_insert(d.severity);
        }

        let progress: String = files
            .iter()
            .map(|f| {
                let path_str = f.to_string_lossy();
                worst_by_file
                    .get(path_str.as_ref())
                    .map_or('.', Severity::letter)
            })
            .collect();
        let _ = writeln!(out, "{progress}");

        if !diagnostics.is_empty() {
            let _ = writeln!(out, "\nOffenses:\n");
        }
        for d in diagnostics {
            let _ = writeln!(out, "{d}");
        }

        let _ = writeln!(out, "\n{}", summary_line(diagnostics, files.len()));
    }
}
