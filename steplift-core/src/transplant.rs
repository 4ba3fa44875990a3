//! Transplanting step blocks into documents
//!
//! Both operations take canonical block text and submit one atomic edit batch
//! to the destination document. Records are never mutated; only the
//! destination changes.
//!
//! Re-indentation quirks that existing scenario files depend on:
//! - `replace` indents every line except the first and the last. The first
//!   line inherits the destination's leading context; the last line (usually
//!   the empty segment after a trailing newline) is left untouched.
//! - `append_to_end` drops the text's last line before indenting, assuming it
//!   is the empty segment after a trailing newline.

use crate::document::{Document, EditOp};
use crate::error::StepError;
use crate::position::{utf16_len, SourcePosition, SourceSpan};
use crate::scanner::{scan, Category, StepPattern};

/// Indent given to blocks appended at the end of a container
pub const APPEND_INDENT: usize = 4;

/// Overwrite the block at `destination` with `replacement`
///
/// Returns `Ok(false)` without touching the document when the destination
/// could not be resolved.
pub fn replace<D: Document + ?Sized>(
    document: &mut D,
    destination: Option<SourceSpan>,
    replacement: &str,
) -> Result<bool, StepError> {
    let Some(span) = destination else {
        tracing::debug!(file = document.uri(), "replace skipped: destination unresolved");
        return Ok(false);
    };

    let text = indent_inner_lines(replacement, span.start.column as usize);
    document.apply_edits(vec![
        EditOp::Delete(span),
        EditOp::Insert {
            at: span.start,
            text,
        },
    ])?;
    tracing::debug!(
        file = document.uri(),
        line = span.start.line,
        "replaced step block"
    );
    Ok(true)
}

/// Append `text` as a new block after the document's final line
pub fn append_to_end<D: Document + ?Sized>(
    document: &mut D,
    text: &str,
) -> Result<bool, StepError> {
    let last_line = document.line_count().saturating_sub(1);
    let end = SourcePosition::new(
        u32::try_from(last_line).unwrap_or(u32::MAX),
        document.line(last_line).map_or(0, utf16_len),
    );

    let mut lines: Vec<&str> = text.split('\n').collect();
    lines.pop();
    let indent = " ".repeat(APPEND_INDENT);
    let body = lines
        .iter()
        .map(|line| format!("{indent}{line}"))
        .collect::<Vec<_>>()
        .join("\n");

    document.apply_edits(vec![EditOp::Insert {
        at: end,
        text: format!("\n{body}\n"),
    }])?;
    tracing::debug!(file = document.uri(), "appended step block");
    Ok(true)
}

/// Body span of the block whose header token sits exactly at `name_span`
///
/// Always re-scans the live document: the destination may have been edited
/// since any cached corpus scan.
pub fn resolve_destination<D: Document + ?Sized>(
    document: &D,
    category: &Category,
    kinds: &[String],
    name_span: SourceSpan,
) -> Result<Option<SourceSpan>, StepError> {
    let pattern = StepPattern::new(category, kinds)?;
    Ok(scan(document, &pattern)
        .into_iter()
        .find(|block| block.name_span == name_span)
        .map(|block| block.body_span))
}

/// Prefix every line but the first and last with `column` spaces
fn indent_inner_lines(text: &str, column: usize) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let last = lines.len().saturating_sub(1);
    let indent = " ".repeat(column);
    for line in lines.iter_mut().take(last).skip(1) {
        line.insert_str(0, &indent);
    }
    lines.join("\n")
}
