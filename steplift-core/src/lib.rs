//! Steplift core library - find, rank and transplant reusable scenario steps

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Blocks are delimited by indentation only; no syntax tree is built
// - Canonical text is the only identity a step block has across files
// - The scan cache is the only state shared between calls
// - Transplant destinations are always resolved against the live document
// - Identical input yields byte-for-byte identical output

pub mod cache;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod index;
pub mod normalize;
pub mod position;
pub mod report;
pub mod scanner;
pub mod transplant;

pub use cache::ScanCache;
pub use config::ResolvedConfig;
pub use corpus::{Corpus, FsCorpus};
pub use document::{Document, EditOp, TextDocument};
pub use error::StepError;
pub use index::{filter_by_name, index, ScanResult, StepRecord};
pub use normalize::{normalize_indent, CANONICAL_INDENT};
pub use position::{SourcePosition, SourceSpan};
pub use report::{render_json, render_text, sort_by_usage};
pub use scanner::{
    find_step_headers, header_at, header_on_line, scan, Category, ScannedBlock, StepPattern,
};
pub use transplant::{append_to_end, replace, resolve_destination};

/// Candidate records for a category, most used first
///
/// Serves from `cache` when the category was scanned before, otherwise scans
/// `corpus` and caches the result. `name_filter` narrows the cached list
/// without affecting usage counts, which always reflect the whole corpus.
pub fn list_steps<'a, C: Corpus>(
    cache: &'a mut ScanCache,
    category: &Category,
    kinds: &[String],
    corpus: &C,
    name_filter: &str,
) -> Result<Vec<&'a StepRecord>, StepError> {
    let result = cache.get_or_scan(category, kinds, corpus)?;
    Ok(sort_by_usage(filter_by_name(result.records(), name_filter)))
}

/// Replace the block headed at `name_span` with the record `id` from `result`
///
/// The destination block is found by re-scanning `document`, never through a
/// cached result. Returns `Ok(false)`, leaving `document` untouched, when `id`
/// is not in `result` or the header no longer heads a block of `category`.
pub fn replace_step<D: Document + ?Sized>(
    document: &mut D,
    result: &ScanResult,
    id: usize,
    category: &Category,
    kinds: &[String],
    name_span: SourceSpan,
) -> Result<bool, StepError> {
    let record = match result.find(id) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(file = document.uri(), "replace skipped: {e}");
            return Ok(false);
        }
    };
    let destination = resolve_destination(document, category, kinds, name_span)?;
    replace(document, destination, &record.canonical_text)
}
