//! Host document abstraction
//!
//! The engine never owns editor lifecycle. It reads documents and hands them
//! edit batches through the [`Document`] trait. [`TextDocument`] is the
//! in-memory implementation used by the CLI and the tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::StepError;
use crate::position::{utf16_len, SourcePosition, SourceSpan};

/// One operation in an atomic edit batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Remove the text covered by the span
    Delete(SourceSpan),
    /// Insert text at a position (before any deletion starting there)
    Insert { at: SourcePosition, text: String },
}

/// An opened document as seen by the engine
pub trait Document {
    /// Identifier of the document (a path for files on disk)
    fn uri(&self) -> &str;

    /// Full document text
    fn text(&self) -> &str;

    /// Number of lines; a trailing newline starts one more (empty) line
    fn line_count(&self) -> usize;

    /// Text of line `index` without its terminator
    fn line(&self, index: usize) -> Option<&str>;

    /// Convert a byte offset into a position, clamping to the document end
    fn position_at(&self, offset: usize) -> SourcePosition;

    /// Convert a position into a byte offset, or `None` if it is outside the document
    fn offset_at(&self, position: SourcePosition) -> Option<usize>;

    /// Apply a batch of edits atomically: either every operation lands or none does
    fn apply_edits(&mut self, edits: Vec<EditOp>) -> Result<(), StepError>;

    /// Text covered by `span`
    fn text_in(&self, span: &SourceSpan) -> Option<&str> {
        let start = self.offset_at(span.start)?;
        let end = self.offset_at(span.end)?;
        self.text().get(start..end)
    }
}

/// In-memory document, optionally backed by a file
#[derive(Debug, Clone)]
pub struct TextDocument {
    uri: String,
    path: Option<PathBuf>,
    text: String,
    line_starts: Vec<usize>,
}

impl TextDocument {
    /// Create a document from text that has no backing file
    pub fn from_text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        TextDocument {
            uri: uri.into(),
            path: None,
            text,
            line_starts,
        }
    }

    /// Read a document from disk
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read document: {}", path.display()))?;
        let mut document = Self::from_text(path.to_string_lossy(), text);
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    /// Replace the identifier reported by [`Document::uri`]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Write the current text back to the file the document was opened from
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("document {} has no backing file", self.uri))?;
        std::fs::write(path, &self.text)
            .with_context(|| format!("failed to write document: {}", path.display()))
    }

    /// Path the document was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn line_bounds(&self, index: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(index)?;
        let end = match self.line_starts.get(index + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        };
        let line = &self.text[start..end];
        let end = if line.ends_with('\r') { end - 1 } else { end };
        Some((start, end))
    }
}

impl Document for TextDocument {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        let (start, end) = self.line_bounds(index)?;
        Some(&self.text[start..end])
    }

    fn position_at(&self, offset: usize) -> SourcePosition {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        SourcePosition::new(
            u32::try_from(line).unwrap_or(u32::MAX),
            utf16_len(&self.text[line_start..offset]),
        )
    }

    fn offset_at(&self, position: SourcePosition) -> Option<usize> {
        let (start, end) = self.line_bounds(position.line as usize)?;
        let mut column = 0u32;
        for (index, ch) in self.text[start..end].char_indices() {
            if column == position.column {
                return Some(start + index);
            }
            column += u32::try_from(ch.len_utf16()).unwrap_or(2);
            if column > position.column {
                // Column points into the middle of a surrogate pair
                return None;
            }
        }
        (column == position.column).then_some(end)
    }

    fn apply_edits(&mut self, edits: Vec<EditOp>) -> Result<(), StepError> {
        let mut replacements = Vec::with_capacity(edits.len());
        for edit in edits {
            let replacement = match edit {
                EditOp::Delete(span) => {
                    let start = self
                        .offset_at(span.start)
                        .ok_or_else(|| StepError::out_of_bounds(span.start))?;
                    let end = self
                        .offset_at(span.end)
                        .ok_or_else(|| StepError::out_of_bounds(span.end))?;
                    if end < start {
                        return Err(StepError::Document(format!(
                            "delete span ends before it starts ({}:{} > {}:{})",
                            span.start.line, span.start.column, span.end.line, span.end.column
                        )));
                    }
                    (start, end, String::new())
                }
                EditOp::Insert { at, text } => {
                    let offset = self
                        .offset_at(at)
                        .ok_or_else(|| StepError::out_of_bounds(at))?;
                    (offset, offset, text)
                }
            };
            replacements.push(replacement);
        }

        // Stable sort keeps inserts ahead of a deletion that starts at the same offset
        replacements.sort_by_key(|(start, end, _)| (*start, *end));
        for pair in replacements.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(StepError::Document(
                    "edit batch contains overlapping operations".to_string(),
                ));
            }
        }

        let mut output = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for (start, end, text) in &replacements {
            output.push_str(&self.text[cursor..*start]);
            output.push_str(text);
            cursor = *end;
        }
        output.push_str(&self.text[cursor..]);

        self.line_starts = compute_line_starts(&output);
        self.text = output;
        Ok(())
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(index, _)| index + 1))
        .collect()
}
