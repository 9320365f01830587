use std::io::Write;
use std::path::PathBuf;

use crate::diagnostic::Diagnostic;
use crate::formatter::{Formatter, summary_line};

/// Offenses grouped under a `== path ==` header per file.
///
/// Expects diagnostics sorted by path, which the linter guarantees.
pub struct SimpleFormatter;

impl Formatter for SimpleFormatter {
    fn format_to(&self, diagnostics: &[Diagnostic], files: &[PathBuf], out: &mut dyn Write) {
        let mut current: Option<&str> = None;
        for d in diagnostics {
            if current != Some(d.path.as_str()) {
                let _ = writeln!(out, "== {} ==", d.path);
                current = Some(d.path.as_str());
            }
            let corrected = if d.corrected { "[Corrected] " } else { "" };
            let _ = writeln!(
                out,
                "{}:{:>3}:{:>3}: {corrected}{}: {}",
                d.severity, d.location.line, d.location.column, d.cop_name, d.message,
            );
        }
        let _ = writeln!(out, "\n{}", summary_line(diagnostics, files.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::formatter::tests::{diag, render};

    #[test]
    fn groups_by_file() {
        let diags = vec![
            diag("a.rb", 1, 4, Severity::Convention),
            diag("a.rb", 12, 10, Severity::Convention),
            diag("b.rb", 2, 3, Severity::Warning),
        ];
        let files = vec![PathBuf::from("a.rb"), PathBuf::from("b.rb")];
        let out = render(&SimpleFormatter, &diags, &files);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "== a.rb ==");
        assert!(lines[1].starts_with("C:  1:  4: Layout/SpaceAroundMethodCallOperator: "));
        assert!(lines[2].starts_with("C: 12: 10: "));
        assert_eq!(lines[3], "== b.rb ==");
        assert!(lines[4].starts_with("W:  2:  3: "));
        assert_eq!(lines.last(), Some(&"2 files inspected, 3 offenses detected"));
    }
}
