use std::io::Write;
use std::path::PathBuf;

use crate::diagnostic::{Diagnostic, Severity};
use crate::formatter::Formatter;

/// GitHub Actions workflow commands, one annotation per offense.
pub struct GithubFormatter;

impl Formatter for GithubFormatter {
    fn format_to(&self, diagnostics: &[Diagnostic], _files: &[PathBuf], out: &mut dyn Write) {
        for d in diagnostics {
            let level = match d.severity {
                Severity::Convention | Severity::Warning => "warning",
                Severity::Error | Severity::Fatal => "error",
            };
            // Workflow command columns are 1-based.
            let _ = writeln!(
                out,
                "::{level} file={},line={},col={}::{}: {}",
                escape_property(&d.path),
                d.location.line,
                d.location.column + 1,
                d.cop_name,
                escape_data(&d.message),
            );
        }
    }
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
