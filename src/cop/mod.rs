pub mod layout;

use std::collections::HashMap;

use crate::correction::Correction;
use crate::diagnostic::{Diagnostic, Location, Severity};
use crate::parse::lexer::Token;
use crate::parse::source::SourceFile;

/// Per-cop configuration extracted from .rubocop.yml.
#[derive(Debug, Clone)]
pub struct CopConfig {
    pub enabled: bool,
    pub severity: Option<Severity>,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    /// `AutoCorrect: false` keeps the cop reporting under `-a`.
    pub autocorrect: bool,
    pub options: HashMap<String, serde_yml::Value>,
}

impl Default for CopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            exclude: Vec::new(),
            include: Vec::new(),
            autocorrect: true,
            options: HashMap::new(),
        }
    }
}

/// A lint rule. Implementations must be Send + Sync so they can be shared
/// across rayon worker threads.
pub trait Cop: Send + Sync {
    /// The fully-qualified cop name, e.g. "Layout/SpaceAroundMethodCallOperator".
    fn name(&self) -> &'static str;

    fn default_severity(&self) -> Severity {
        Severity::Convention
    }

    fn supports_autocorrect(&self) -> bool {
        false
    }

    /// Token-based check over one file.
    ///
    /// When `corrections` is `Some`, the cop also pushes the edits that fix
    /// what it reports and marks those diagnostics as corrected.
    fn check_source(
        &self,
        source: &SourceFile,
        tokens: &[Token<'_>],
        config: &CopConfig,
        diagnostics: &mut Vec<Diagnostic>,
        corrections: Option<&mut Vec<Correction>>,
    );

    /// Build a diagnostic for this cop at a 1-based line and 0-based column.
    fn diagnostic(
        &self,
        source: &SourceFile,
        line: usize,
        column: usize,
        message: String,
    ) -> Diagnostic {
        Diagnostic {
            path: source.path_str().to_string(),
            location: Location { line, column },
            severity: self.default_severity(),
            cop_name: self.name().to_string(),
            message,
            corrected: false,
        }
    }
}

/// Every built-in cop, in reporting order.
pub fn default_cops() -> Vec<Box<dyn Cop>> {
    let mut cops = Vec::new();
    layout::register_all(&mut cops);
    cops
}
