use std::io::Write;
use std::path::PathBuf;

use crate::diagnostic::Diagnostic;
use crate::formatter::{Formatter, summary_line};

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_to(&self, diagnostics: &[Diagnostic], files: &[PathBuf], out: &mut dyn Write) {
        for d in diagnostics {
            let _ = writeln!(out, "{d}");
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
    fn lists_offenses_then_summary() {
        let diags = vec![
            diag("lib/a.rb", 1, 4, Severity::Convention),
            diag("lib/a.rb", 3, 7, Severity::Warning),
        ];
        let out = render(&TextFormatter, &diags, &[PathBuf::from("lib/a.rb")]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "lib/a.rb:1:4: C: Layout/SpaceAroundMethodCallOperator: \
                 Avoid using spaces around a method call operator.",
                "lib/a.rb:3:7: W: Layout/SpaceAroundMethodCallOperator: \
                 Avoid using spaces around a method call operator.",
                "",
                "1 file inspected, 2 offenses detected",
            ]
        );
    }

    #[test]
    fn clean_run_prints_summary_only() {
        let out = render(&TextFormatter, &[], &[PathBuf::from("a.rb"), PathBuf::from("b.rb")]);
        assert_eq!(out, "\n2 files inspected, 0 offenses detected\n");
    }
}
