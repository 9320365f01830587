use thiserror::Error;

use crate::diagnostic::Offense;

/// A single source-level edit: replace byte range [start..end) with replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// Byte offset, inclusive.
    pub start: usize,
    /// Byte offset, exclusive.
    pub end: usize,
    /// Replacement text (empty string = deletion).
    pub replacement: String,
    /// Cop that produced this correction.
    pub cop_name: &'static str,
}

impl Correction {
    pub fn deletion(start: usize, end: usize, cop_name: &'static str) -> Self {
        Self {
            start,
            end,
            replacement: String::new(),
            cop_name,
        }
    }
}

impl From<&Offense> for Correction {
    fn from(offense: &Offense) -> Self {
        let range = offense.span.range();
        Correction::deletion(range.start, range.end, offense.cop_name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrectionError {
    #[error("{cop_name} correction {start}..{end} is outside the source (length {len})")]
    OutOfBounds {
        cop_name: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("{cop_name} correction {start}..{end} splits a UTF-8 character")]
    NotCharBoundary {
        cop_name: &'static str,
        start: usize,
        end: usize,
    },
    #[error("{cop_name} correction {start}..{end} overlaps correction {prev_start}..{prev_end}")]
    Overlap {
        cop_name: &'static str,
        start: usize,
        end: usize,
        prev_start: usize,
        prev_end: usize,
    },
}

/// A validated set of non-overlapping corrections, sorted by start offset.
///
/// Overlap means the detector is broken, so it is reported rather than
/// resolved by dropping edits.
#[derive(Debug)]
pub struct CorrectionPlan {
    corrections: Vec<Correction>,
    source_len: usize,
}

impl CorrectionPlan {
    /// Sort `raw` by start offset and check it against `source`.
    pub fn new(mut raw: Vec<Correction>, source: &str) -> Result<Self, CorrectionError> {
        raw.sort_by_key(|c| (c.start, c.end));

        let mut prev: Option<&Correction> = None;
        for c in &raw {
            if c.start > c.end || c.end > source.len() {
                return Err(CorrectionError::OutOfBounds {
                    cop_name: c.cop_name,
                    start: c.start,
                    end: c.end,
                    len: source.len(),
                });
            }
            if !source.is_char_boundary(c.start) || !source.is_char_boundary(c.end) {
                return Err(CorrectionError::NotCharBoundary {
                    cop_name: c.cop_name,
                    start: c.start,
                    end: c.end,
                });
            }
            if let Some(p) = prev {
                if c.start < p.end {
                    return Err(CorrectionError::Overlap {
                        cop_name: c.cop_name,
                        start: c.start,
                        end: c.end,
                        prev_start: p.start,
                        prev_end: p.end,
                    });
                }
            }
            prev = Some(c);
        }

        Ok(Self {
            corrections: raw,
            source_len: source.len(),
        })
    }

    /// Apply the plan to the source it was validated against.
    ///
    /// Uses a single O(n) linear scan:
    /// ```text
    /// cursor = 0
    /// for each correction c (sorted by start):
    ///     copy source[cursor..c.start]
    ///     copy c.replacement
    ///     cursor = c.end
    /// copy source[cursor..]
    /// ```
    pub fn apply(&self, source: &str) -> String {
        debug_assert_eq!(source.len(), self.source_len, "plan applied to a different source");
        let mut result = String::with_capacity(source.len());
        let mut cursor = 0;

        for c in &self.corrections {
            result.push_str(&source[cursor..c.start]);
            result.push_str(&c.replacement);
            cursor = c.end;
        }
        result.push_str(&source[cursor..]);

        result
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }
}

/// Remove every offense span from `source`.
pub fn autocorrect(source: &str, offenses: &[Offense]) -> Result<String, CorrectionError> {
    let plan = CorrectionPlan::new(offenses.iter().map(Correction::from).collect(), source)?;
    Ok(plan.apply(source))
}
