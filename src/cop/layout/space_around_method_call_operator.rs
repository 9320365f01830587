use crate::cop::{Cop, CopConfig};
use crate::correction::Correction;
use crate::diagnostic::{Diagnostic, Location, Offense};
use crate::parse::lexer::{Token, tokenize};
use crate::parse::operators::{OperatorOccurrence, locate_operators};
use crate::parse::source::SourceFile;
use crate::parse::span::SourceSpan;

pub const COP_NAME: &str = "Layout/SpaceAroundMethodCallOperator";

const MSG: &str = "Avoid using spaces around a method call operator.";

/// Checks method call operators (`.`, `&.`, `::`) for surrounding spaces.
///
/// ```ruby
/// # bad
/// foo. bar
/// foo .bar
/// RuboCop:: Cop
///
/// # good
/// foo.bar
/// foo
///   .bar
/// foo.
///   bar
/// RuboCop::Cop
/// ```
pub struct SpaceAroundMethodCallOperator;

impl Cop for SpaceAroundMethodCallOperator {
    fn name(&self) -> &'static str {
        COP_NAME
    }

    fn supports_autocorrect(&self) -> bool {
        true
    }

    fn check_source(
        &self,
        source: &SourceFile,
        tokens: &[Token<'_>],
        _config: &CopConfig,
        diagnostics: &mut Vec<Diagnostic>,
        mut corrections: Option<&mut Vec<Correction>>,
    ) {
        let occurrences = locate_operators(tokens);
        for offense in detect_offenses(&occurrences) {
            let Location { line, column } = Location::from_span(&offense.span);
            let mut diag = self.diagnostic(source, line, column, offense.message.to_string());
            if let Some(ref mut corr) = corrections {
                corr.push(Correction::from(&offense));
                diag.corrected = true;
            }
            diagnostics.push(diag);
        }
    }
}

/// Judge the whitespace around each operator, returning offenses sorted by
/// start offset.
pub fn detect_offenses(occurrences: &[OperatorOccurrence]) -> Vec<Offense> {
    let mut offenses = Vec::new();
    for occ in occurrences {
        if flags_space_before(occ) {
            offenses.push(offense(occ.space_before));
        }
        if flags_space_after(occ) {
            offenses.push(offense(occ.space_after));
        }
    }
    offenses.sort_by_key(|o| o.span.start.offset);
    offenses
}

/// Tokenize `text` and detect offenses in one go.
pub fn check_text(text: &str) -> Vec<Offense> {
    detect_offenses(&locate_operators(&tokenize(text)))
}

// Leading indentation (`foo\n  .bar`) and the space before a constant
// prefix (`include ::Foo`) are fine. Without a receiver on the same line the
// operator is not a binary call, so nothing before it is judged.
fn flags_space_before(occ: &OperatorOccurrence) -> bool {
    !occ.space_before.is_empty()
        && !occ.starts_line
        && occ.has_receiver
        && !occ.is_constant_prefix()
}

// Trailing whitespace after a suffix-chained operator is another cop's
// business.
fn flags_space_after(occ: &OperatorOccurrence) -> bool {
    !occ.space_after.is_empty() && !occ.ends_line
}

fn offense(span: SourceSpan) -> Offense {
    Offense {
        span,
        cop_name: COP_NAME,
        message: MSG,
    }
}
