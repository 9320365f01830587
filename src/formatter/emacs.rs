use std::io::Write;
use std::path::PathBuf;

use crate::diagnostic::Diagnostic;
use crate::formatter::Formatter;

/// `path:line:col: C: [Corrected] Cop: message`, one per line, with a
/// 1-based column as compilation-mode expects. No summary.
pub struct EmacsFormatter;

impl Formatter for EmacsFormatter {
    fn format_to(&self, diagnostics: &[Diagnostic], _files: &[PathBuf], out: &mut dyn Write) {
        for d in diagnostics {
            let corrected = if d.corrected { "[Corrected] " } else { "" };
            let _ = writeln!(
                out,
                "{}:{}:{}: {}: {corrected}{}: {}",
                d.path,
                d.location.line,
                d.location.column + 1,
                d.severity,
                d.cop_name,
                d.message,
            );
        }
    }
}
