//! Deduplication and usage counting
//!
//! Structurally identical blocks (equal canonical text) collapse into one
//! record that remembers where the block was first seen and how many times it
//! recurs across the corpus.
//!
//! Global invariants enforced:
//! - Canonical text is unique within one scan result
//! - Ids are assigned sequentially in first-seen order (documents in corpus
//!   order, matches in text order) and are only meaningful within one result
//! - The sum of usage counts equals the number of raw matches kept by the filter

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::StepError;
use crate::normalize::{normalize_indent, CANONICAL_INDENT};
use crate::position::SourceSpan;
use crate::scanner::{scan, StepPattern};

/// One discovered step block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: usize,
    pub name: String,
    pub name_span: SourceSpan,
    pub body_span: SourceSpan,
    pub canonical_text: String,
    pub source_file: String,
    pub usage_count: usize,
}

/// Records of one scan, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    records: Vec<StepRecord>,
}

impl ScanResult {
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by the id this scan assigned to it
    pub fn find(&self, id: usize) -> Result<&StepRecord, StepError> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| StepError::UnresolvedTarget(format!("no step with id {id}")))
    }

    /// Number of raw matches the result was built from
    pub fn total_matches(&self) -> usize {
        self.records.iter().map(|record| record.usage_count).sum()
    }
}

/// Scan `documents` and merge identical blocks
///
/// Matches whose name does not contain `name_filter` are dropped before
/// deduplication; an empty filter keeps everything. The first occurrence of a
/// canonical text fixes the record's id, name, file and spans; later
/// occurrences only bump its usage count.
pub fn index<D: Document>(
    documents: &[D],
    pattern: &StepPattern,
    name_filter: &str,
) -> Result<ScanResult, StepError> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut records: Vec<StepRecord> = Vec::new();
    let mut raw_matches = 0usize;

    for document in documents {
        for block in scan(document, pattern) {
            if !name_filter.is_empty() && !block.name.contains(name_filter) {
                continue;
            }
            let Some(body) = document.text_in(&block.body_span) else {
                tracing::warn!(
                    file = document.uri(),
                    name = %block.name,
                    "block span does not resolve to document text, skipping"
                );
                continue;
            };
            let canonical_text = normalize_indent(body, CANONICAL_INDENT)?;
            raw_matches += 1;

            if let Some(&position) = positions.get(&canonical_text) {
                records[position].usage_count += 1;
                continue;
            }
            positions.insert(canonical_text.clone(), records.len());
            records.push(StepRecord {
                id: records.len(),
                name: block.name,
                name_span: block.name_span,
                body_span: block.body_span,
                canonical_text,
                source_file: document.uri().to_string(),
                usage_count: 1,
            });
        }
    }

    tracing::debug!(
        documents = documents.len(),
        matches = raw_matches,
        records = records.len(),
        "indexed step blocks"
    );
    Ok(ScanResult { records })
}

/// Keep records whose name contains `name`; the empty string keeps all
pub fn filter_by_name<'a>(records: &'a [StepRecord], name: &str) -> Vec<&'a StepRecord> {
    records
        .iter()
        .filter(|record| name.is_empty() || record.name.contains(name))
        .collect()
}
