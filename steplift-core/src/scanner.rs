//! Block boundary scanning
//!
//! Finds step definitions by matching their header token and computes each
//! block's extent from indentation alone. The scripting language has no block
//! terminators: a block runs through every following line that is blank or
//! indented deeper than its header, and stops before the first line that is
//! neither.
//!
//! Global invariants enforced:
//! - Matches are reported in left-to-right text order and never overlap
//! - Extent scanning never moves the match cursor, so nested headers are found too
//! - No syntax validation: only header tokens and indentation are inspected

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::StepError;
use crate::normalize::{is_blank, leading_width};
use crate::position::{utf16_len, SourcePosition, SourceSpan};

/// Which step blocks a scan targets
///
/// Also the key under which scan results are cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Blocks whose name starts with this prefix; the empty prefix matches any name
    Kind(String),
    /// Blocks of every configured step kind
    All,
}

impl Category {
    pub fn kind(prefix: impl Into<String>) -> Self {
        Category::Kind(prefix.into())
    }

    /// Short label used in logs and cache listings
    pub fn label(&self) -> &str {
        match self {
            Category::Kind(prefix) => prefix,
            Category::All => "*",
        }
    }
}

/// Compiled header pattern: `(async\s+)?def\s+(<prefix>)(\w*)`
#[derive(Debug, Clone)]
pub struct StepPattern {
    regex: Regex,
}

impl StepPattern {
    /// Build the header pattern for a category
    ///
    /// `kinds` supplies the alternation for [`Category::All`]; every prefix is
    /// matched literally.
    pub fn new(category: &Category, kinds: &[String]) -> Result<Self, StepError> {
        let alternation = match category {
            Category::Kind(prefix) => regex::escape(prefix),
            Category::All => {
                if kinds.is_empty() {
                    return Err(StepError::InvalidArgument(
                        "at least one step kind is required to scan all categories".to_string(),
                    ));
                }
                kinds
                    .iter()
                    .map(|kind| regex::escape(kind))
                    .collect::<Vec<_>>()
                    .join("|")
            }
        };
        let regex = Regex::new(&format!(r"(async\s+)?def\s+({alternation})(\w*)"))
            .map_err(|e| StepError::InvalidArgument(format!("invalid step pattern: {e}")))?;
        Ok(StepPattern { regex })
    }
}

/// One header match together with the extent of its block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedBlock {
    /// The matched step kind (the prefix group)
    pub kind: String,
    /// Identifier characters following the kind
    pub suffix: String,
    /// `kind` + `suffix`
    pub name: String,
    /// The full header token, including any `async` qualifier
    pub name_span: SourceSpan,
    /// From the header token through the end of the block's last line
    pub body_span: SourceSpan,
}

/// Find every block in `document` whose header matches `pattern`
pub fn scan<D: Document + ?Sized>(document: &D, pattern: &StepPattern) -> Vec<ScannedBlock> {
    pattern
        .regex
        .captures_iter(document.text())
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let kind = captures.get(2).map_or("", |m| m.as_str());
            let suffix = captures.get(3).map_or("", |m| m.as_str());

            let start = document.position_at(whole.start());
            let name_span = SourceSpan::new(start, document.position_at(whole.end()));
            let end_line = block_end_line(document, start.line as usize);
            let end_column = document.line(end_line).map_or(0, utf16_len);
            let body_span = SourceSpan::new(
                start,
                SourcePosition::new(u32::try_from(end_line).unwrap_or(u32::MAX), end_column),
            );

            Some(ScannedBlock {
                kind: kind.to_string(),
                suffix: suffix.to_string(),
                name: format!("{kind}{suffix}"),
                name_span,
                body_span,
            })
        })
        .collect()
}

/// Last line belonging to the block whose header sits on `start_line`
///
/// Blank lines and lines indented deeper than the header extend the block.
/// Without a terminating line the block runs to the final line of the
/// document, trailing blank lines included.
fn block_end_line<D: Document + ?Sized>(document: &D, start_line: usize) -> usize {
    let start_indent = document.line(start_line).map_or(0, leading_width);
    let line_count = document.line_count();

    let mut end_line = start_line;
    for index in start_line + 1..line_count {
        let line = document.line(index).unwrap_or("");
        if is_blank(line) || leading_width(line) > start_indent {
            end_line = index;
        } else {
            return end_line;
        }
    }
    line_count.saturating_sub(1).max(start_line)
}

/// Every step header in `document` for the configured kinds
pub fn find_step_headers<D: Document + ?Sized>(
    document: &D,
    kinds: &[String],
) -> Result<Vec<ScannedBlock>, StepError> {
    let pattern = StepPattern::new(&Category::All, kinds)?;
    Ok(scan(document, &pattern))
}

/// The step header whose name span covers `position`, if any
pub fn header_at<D: Document + ?Sized>(
    document: &D,
    kinds: &[String],
    position: SourcePosition,
) -> Result<Option<ScannedBlock>, StepError> {
    Ok(find_step_headers(document, kinds)?
        .into_iter()
        .find(|header| header.name_span.contains(&SourceSpan::new(position, position))))
}

/// The first step header starting on `line`, wherever it sits on that line
pub fn header_on_line<D: Document + ?Sized>(
    document: &D,
    kinds: &[String],
    line: u32,
) -> Result<Option<ScannedBlock>, StepError> {
    Ok(find_step_headers(document, kinds)?
        .into_iter()
        .find(|header| header.name_span.start.line == line))
}
