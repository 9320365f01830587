use crate::cop::{Cop, CopConfig};
use crate::correction::{Correction, CorrectionPlan};
use crate::diagnostic::Diagnostic;
use crate::parse::lexer::tokenize;
use crate::parse::source::SourceFile;

/// Generate `offense_fixture` and `no_offense_fixture` tests reading
/// `testdata/<dir>/offense.rb` and `no_offense.rb`.
#[macro_export]
macro_rules! cop_fixture_tests {
    ($cop:expr, $dir:literal) => {
        #[test]
        fn offense_fixture() {
            $crate::testutil::assert_cop_offenses(
                &$cop,
                include_bytes!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/testdata/",
                    $dir,
                    "/offense.rb"
                )),
            );
        }

        #[test]
        fn no_offense_fixture() {
            $crate::testutil::assert_cop_no_offenses(
                &$cop,
                include_bytes!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/testdata/",
                    $dir,
                    "/no_offense.rb"
                )),
            );
        }
    };
}

/// Generate an `autocorrect_fixture` test: correcting the clean source of
/// `offense.rb` must yield `corrected.rb` exactly.
#[macro_export]
macro_rules! cop_autocorrect_fixture_tests {
    ($cop:expr, $dir:literal) => {
        #[test]
        fn autocorrect_fixture() {
            $crate::testutil::assert_cop_autocorrect(
                &$cop,
                include_bytes!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/testdata/",
                    $dir,
                    "/offense.rb"
                )),
                include_bytes!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/testdata/",
                    $dir,
                    "/corrected.rb"
                )),
            );
        }
    };
}

/// An expected offense parsed from a fixture annotation.
#[derive(Debug, Clone)]
pub struct ExpectedOffense {
    pub line: usize,
    pub column: usize,
    pub cop_name: String,
    pub message: String,
}

struct RawAnnotation {
    column: usize,
    cop_name: String,
    message: String,
}

/// Try to parse an annotation line: optional indentation, one or more `^`,
/// a space, then `Department/CopName: Message`. The offense column is the
/// position of the first `^`.
///
/// Lines that merely contain `^` (`x ^ y`, `/^foo/`) are rejected: the caret
/// must come first and the cop name must contain a `/`.
fn try_parse_annotation(line: &str) -> Option<RawAnnotation> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('^') {
        return None;
    }

    let caret_count = trimmed.bytes().take_while(|&b| b == b'^').count();
    let rest = trimmed[caret_count..].strip_prefix(' ')?.trim_end();
    let (cop_name, message) = rest.split_once(": ")?;
    if !cop_name.contains('/') {
        return None;
    }

    Some(RawAnnotation {
        column: line.len() - trimmed.len(),
        cop_name: cop_name.to_string(),
        message: message.to_string(),
    })
}

/// Parse fixture content into clean source bytes and expected offenses.
///
/// Annotations must appear *after* the source line they reference and are
/// stripped from the clean source. Line numbers refer to the clean source.
///
/// # Panics
///
/// Panics if an annotation appears before any source line.
pub fn parse_fixture(raw: &[u8]) -> (Vec<u8>, Vec<ExpectedOffense>) {
    let text = std::str::from_utf8(raw).expect("fixture must be valid UTF-8");

    let mut source_lines: Vec<&str> = Vec::new();
    let mut expected: Vec<ExpectedOffense> = Vec::new();

    for (raw_idx, element) in text.split('\n').enumerate() {
        match try_parse_annotation(element) {
            Some(annotation) => {
                assert!(
                    !source_lines.is_empty(),
                    "Annotation on raw line {} appears before any source line: {:?}",
                    raw_idx + 1,
                    element,
                );
                expected.push(ExpectedOffense {
                    line: source_lines.len(),
                    column: annotation.column,
                    cop_name: annotation.cop_name,
                    message: annotation.message,
                });
            }
            None => source_lines.push(element),
        }
    }

    (source_lines.join("\n").into_bytes(), expected)
}

/// Run a cop on raw source bytes and return the diagnostics.
pub fn run_cop(cop: &dyn Cop, source_bytes: &[u8]) -> Vec<Diagnostic> {
    run_cop_with_config(cop, source_bytes, CopConfig::default())
}

/// Run a cop on raw source bytes with a specific config and return diagnostics.
pub fn run_cop_with_config(
    cop: &dyn Cop,
    source_bytes: &[u8],
    config: CopConfig,
) -> Vec<Diagnostic> {
    let source = SourceFile::from_bytes("test.rb", source_bytes.to_vec());
    let text = source.text().expect("test source must be valid UTF-8");
    let tokens = tokenize(text);
    let mut diagnostics = Vec::new();
    cop.check_source(&source, &tokens, &config, &mut diagnostics, None);
    diagnostics
}

/// Run a cop with corrections enabled; returns diagnostics and raw edits.
pub fn run_cop_autocorrect(
    cop: &dyn Cop,
    source_bytes: &[u8],
) -> (Vec<Diagnostic>, Vec<Correction>) {
    let source = SourceFile::from_bytes("test.rb", source_bytes.to_vec());
    let text = source.text().expect("test source must be valid UTF-8");
    let tokens = tokenize(text);
    let mut diagnostics = Vec::new();
    let mut corrections = Vec::new();
    cop.check_source(
        &source,
        &tokens,
        &CopConfig::default(),
        &mut diagnostics,
        Some(&mut corrections),
    );
    (diagnostics, corrections)
}

/// Run a cop on fixture bytes (with annotations) and assert offenses match.
///
/// Both sides are sorted by (line, column), so annotation order in the
/// fixture doesn't need to match the cop's emission order.
pub fn assert_cop_offenses(cop: &dyn Cop, fixture_bytes: &[u8]) {
    let (clean_source, mut expected) = parse_fixture(fixture_bytes);
    let mut diagnostics = run_cop(cop, &clean_source);

    expected.sort_by_key(|e| (e.line, e.column));
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    assert_eq!(
        diagnostics.len(),
        expected.len(),
        "Expected {} offense(s) but got {}.\nExpected:\n{}\nActual:\n{}",
        expected.len(),
        diagnostics.len(),
        format_expected(&expected),
        format_diagnostics(&diagnostics),
    );

    for (i, (diag, exp)) in diagnostics.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            (diag.location.line, diag.location.column),
            (exp.line, exp.column),
            "Offense #{}: position mismatch\n  expected: {}:{} {}: {}\n  actual:   {}",
            i + 1,
            exp.line,
            exp.column,
            exp.cop_name,
            exp.message,
            diag,
        );
        assert_eq!(diag.cop_name, exp.cop_name, "Offense #{}: cop name mismatch", i + 1);
        assert_eq!(diag.message, exp.message, "Offense #{}: message mismatch", i + 1);
    }
}

/// Assert a cop produces no offenses on the given source bytes.
pub fn assert_cop_no_offenses(cop: &dyn Cop, source_bytes: &[u8]) {
    let diagnostics = run_cop(cop, source_bytes);
    assert!(
        diagnostics.is_empty(),
        "Expected no offenses but got {}:\n{}",
        diagnostics.len(),
        format_diagnostics(&diagnostics),
    );
}

/// Correct the clean source of `fixture_bytes` and compare with `expected`.
/// The corrected text must also be clean.
pub fn assert_cop_autocorrect(cop: &dyn Cop, fixture_bytes: &[u8], expected: &[u8]) {
    let (clean_source, _) = parse_fixture(fixture_bytes);
    let (_, corrections) = run_cop_autocorrect(cop, &clean_source);
    let text = std::str::from_utf8(&clean_source).expect("fixture must be valid UTF-8");
    let plan = CorrectionPlan::new(corrections, text)
        .unwrap_or_else(|e| panic!("invalid correction plan: {e}"));
    let corrected = plan.apply(text);
    let expected = std::str::from_utf8(expected).expect("fixture must be valid UTF-8");
    assert_eq!(corrected, expected, "autocorrected source mismatch");
    assert_cop_no_offenses(cop, corrected.as_bytes());
}

fn format_expected(expected: &[ExpectedOffense]) -> String {
    expected
        .iter()
        .map(|e| format!("  {}:{} {}: {}", e.line, e.column, e.cop_name, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cop::layout::space_around_method_call_operator::SpaceAroundMethodCallOperator;

    #[test]
    fn parse_annotation_with_carets() {
        let ann = try_parse_annotation("     ^^^ Layout/Foo: some message").unwrap();
        assert_eq!(ann.column, 5);
        assert_eq!(ann.cop_name, "Layout/Foo");
        assert_eq!(ann.message, "some message");
    }

    #[test]
    fn parse_annotation_message_keeps_punctuation() {
        let ann = try_parse_annotation("^ Layout/X: Avoid `a. b`: really.").unwrap();
        assert_eq!(ann.column, 0);
        assert_eq!(ann.message, "Avoid `a. b`: really.");
    }

    #[test]
    fn rejects_non_annotation_lines() {
        assert!(try_parse_annotation("x = 1").is_none());
        assert!(try_parse_annotation("# just a comment").is_none());
        assert!(try_parse_annotation("").is_none());
        assert!(try_parse_annotation("x ^ y").is_none());
        assert!(try_parse_annotation("/^foo/").is_none());
        assert!(try_parse_annotation("^^^ no slash here").is_none());
        assert!(try_parse_annotation("^^^Layout/Foo: msg").is_none());
        assert!(try_parse_annotation("^^^ Layout/Foo:msg").is_none());
    }

    #[test]
    fn parse_fixture_strips_annotations() {
        let raw = b"foo. bar\n    ^ Layout/Foo: msg\nbaz\n";
        let (clean, expected) = parse_fixture(raw);
        assert_eq!(clean, b"foo. bar\nbaz\n");
        assert_eq!(expected.len(), 1);
        assert_eq!((expected[0].line, expected[0].column), (1, 4));
    }

    #[test]
    fn parse_fixture_multiple_annotations_same_line() {
        let raw = b"foo . bar\n   ^ A/B: m1\n     ^ A/B: m2\nnext\n";
        let (clean, expected) = parse_fixture(raw);
        assert_eq!(clean, b"foo . bar\nnext\n");
        let positions: Vec<_> = expected.iter().map(|e| (e.line, e.column)).collect();
        assert_eq!(positions, vec![(1, 3), (1, 5)]);
    }

    #[test]
    fn parse_fixture_preserves_trailing_whitespace_in_source() {
        let raw = b"foo.   \n    ^^^ Layout/Foo: msg\n";
        let (clean, _) = parse_fixture(raw);
        assert_eq!(clean, b"foo.   \n");
    }

    #[test]
    #[should_panic(expected = "Annotation on raw line 1 appears before any source line")]
    fn parse_fixture_annotation_before_source_panics() {
        parse_fixture(b"^^^ A/B: should panic\nx = 1\n");
    }

    #[test]
    fn run_cop_returns_diagnostics() {
        let diags = run_cop(&SpaceAroundMethodCallOperator, b"x = foo .bar\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location.line, 1);
        assert_eq!(diags[0].location.column, 7);
        assert_eq!(diags[0].cop_name, "Layout/SpaceAroundMethodCallOperator");
        assert!(!diags[0].corrected);
    }

    #[test]
    fn run_cop_autocorrect_marks_corrected() {
        let (diags, corrections) =
            run_cop_autocorrect(&SpaceAroundMethodCallOperator, b"a. b. c\n");
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.corrected));
        assert_eq!(corrections.len(), 2);
    }

    #[test]
    fn assert_helpers_accept_matching_fixture() {
        let fixture = b"a :: B\n ^ Layout/SpaceAroundMethodCallOperator: Avoid using spaces around a method call operator.\n    ^ Layout/SpaceAroundMethodCallOperator: Avoid using spaces around a method call operator.\n";
        assert_cop_offenses(&SpaceAroundMethodCallOperator, fixture);
        assert_cop_autocorrect(&SpaceAroundMethodCallOperator, fixture, b"a::B\n");
        assert_cop_no_offenses(&SpaceAroundMethodCallOperator, b"a::B\n");
    }
}
