//! Indentation normalization
//!
//! Rewrites a block to a canonical base indentation so that the same block
//! compares equal no matter how deeply it was nested in its file.
//!
//! Global invariants enforced:
//! - Pure function of (text, target indent)
//! - Re-normalizing with the same target reproduces the same text

use crate::error::StepError;

/// Base indentation used for canonical block text
pub const CANONICAL_INDENT: usize = 4;

/// Re-indent `text` so its shallowest indented line sits at `target_indent` columns
///
/// The base indent is the smallest non-zero leading-whitespace width among
/// lines that are not blank. Lines at or deeper than the base keep their
/// relative depth on top of `target_indent`. Shallower lines (typically the
/// header line, which is extracted from its first token and so carries no
/// indentation) lose their leading whitespace and are not re-padded. When no
/// line is indented at all every line is shifted right by `target_indent`.
///
/// # Errors
///
/// Returns [`StepError::InvalidArgument`] if `target_indent` is zero.
pub fn normalize_indent(text: &str, target_indent: usize) -> Result<String, StepError> {
    if target_indent == 0 {
        return Err(StepError::InvalidArgument(
            "indent must be a positive number".to_string(),
        ));
    }

    let base_indent = text
        .split('\n')
        .filter(|line| !is_blank(line))
        .map(leading_width)
        .filter(|&width| width > 0)
        .min()
        .unwrap_or(0);

    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let width = leading_width(line);
            let rest = line.trim_start();
            if width >= base_indent {
                format!("{}{}", " ".repeat(target_indent + width - base_indent), rest)
            } else {
                rest.to_string()
            }
        })
        .collect();

    Ok(lines.join("\n"))
}

/// True if the line contains nothing but whitespace
pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Number of leading whitespace characters
pub(crate) fn leading_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}
