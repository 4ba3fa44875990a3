//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::index::StepRecord;
use crate::position::SourceSpan;
use crate::scanner::ScannedBlock;

/// Sort records for display: most used first, then by id
pub fn sort_by_usage<'a>(records: impl IntoIterator<Item = &'a StepRecord>) -> Vec<&'a StepRecord> {
    let mut sorted: Vec<&StepRecord> = records.into_iter().collect();
    sorted.sort_by(|a, b| {
        // 1. Usage count descending
        b.usage_count
            .cmp(&a.usage_count)
            // 2. Id ascending (first-seen order)
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}

/// Drop the record whose header is the one being replaced
pub fn exclude_span<'a>(
    records: Vec<&'a StepRecord>,
    source_file: &str,
    name_span: &SourceSpan,
) -> Vec<&'a StepRecord> {
    records
        .into_iter()
        .filter(|record| !(record.source_file == source_file && record.name_span == *name_span))
        .collect()
}

/// Keep records whose name or canonical text contains `query`, ignoring case
///
/// An empty query keeps everything.
pub fn search_text<'a>(records: Vec<&'a StepRecord>, query: &str) -> Vec<&'a StepRecord> {
    let query = query.to_lowercase();
    records
        .into_iter()
        .filter(|record| {
            record.name.to_lowercase().contains(&query)
                || record.canonical_text.to_lowercase().contains(&query)
        })
        .collect()
}

/// Render records as a text table
pub fn render_text(records: &[&StepRecord]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<5} {:<5} {:<40} {:<30} {}\n",
        "ID", "USES", "NAME", "FILE", "LINE"
    ));

    for record in records {
        output.push_str(&format!(
            "{:<5} {:<5} {:<40} {:<30} {}\n",
            record.id,
            record.usage_count,
            truncate_or_pad(&record.name, 40),
            truncate_or_pad(&record.source_file, 30),
            record.name_span.start.line + 1,
        ));
    }

    output
}

/// Render records as JSON output
pub fn render_json(records: &[&StepRecord]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
}

/// Render one record with its canonical text
pub fn render_record(record: &StepRecord) -> String {
    format!(
        "# {} (id {}, used {}x, {}:{})\n{}\n",
        record.name,
        record.id,
        record.usage_count,
        record.source_file,
        record.name_span.start.line + 1,
        record.canonical_text.trim_end_matches('\n'),
    )
}

/// Render step headers found in one document
pub fn render_headers(headers: &[ScannedBlock]) -> String {
    let mut output = String::new();
    for header in headers {
        output.push_str(&format!(
            "{}:{} {:<6} {}\n",
            header.name_span.start.line + 1,
            header.name_span.start.column + 1,
            header.kind,
            header.name,
        ));
    }
    output
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SourcePosition;

    fn record(id: usize, name: &str, usage_count: usize) -> StepRecord {
        let span = SourceSpan::new(
            SourcePosition::new(id as u32, 0),
            SourcePosition::new(id as u32, 10),
        );
        StepRecord {
            id,
            name: name.to_string(),
            name_span: span,
            body_span: span,
            canonical_text: format!("def {name}():\n    pass\n"),
            source_file: "scenarios/a.py".to_string(),
            usage_count,
        }
    }

    #[test]
    fn test_sort_by_usage_then_id() {
        let records = vec![
            record(0, "given_a", 1),
            record(1, "given_b", 3),
            record(2, "given_c", 3),
            record(3, "given_d", 2),
        ];
        let sorted: Vec<_> = sort_by_usage(&records).iter().map(|r| r.id).collect();
        assert_eq!(sorted, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_exclude_span() {
        let records = vec![record(0, "given_a", 1), record(1, "given_b", 1)];
        let span = records[1].name_span;
        let kept = exclude_span(records.iter().collect(), "scenarios/a.py", &span);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "given_a");

        // Same position in another file is a different block
        let kept = exclude_span(records.iter().collect(), "scenarios/b.py", &span);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_search_text_matches_name_or_body_ignoring_case() {
        let mut records = vec![record(0, "given_user", 1), record(1, "then_ok", 1)];
        records[1].canonical_text = "def then_ok():\n    assert Response.OK\n".to_string();

        let names: Vec<_> = search_text(records.iter().collect(), "USER")
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(names, vec![0]);

        let bodies: Vec<_> = search_text(records.iter().collect(), "response.ok")
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(bodies, vec![1]);

        assert_eq!(search_text(records.iter().collect(), "").len(), 2);
    }

    #[test]
    fn test_render_text_columns() {
        let records = vec![record(4, "given_user", 2)];
        let refs: Vec<_> = records.iter().collect();
        let text = render_text(&refs);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID    USES  NAME"));
        assert!(lines[1].starts_with("4     2     given_user"));
        assert!(lines[1].ends_with(" 5"));
    }

    #[test]
    fn test_render_json_is_array() {
        let records = vec![record(0, "given_a", 1)];
        let refs: Vec<_> = records.iter().collect();
        let value: serde_json::Value = serde_json::from_str(&render_json(&refs)).unwrap();
        assert_eq!(value[0]["name"], "given_a");
        assert_eq!(value[0]["usage_count"], 1);
    }

    #[test]
    fn test_render_record() {
        let text = render_record(&record(2, "then_ok", 4));
        assert_eq!(
            text,
            "# then_ok (id 2, used 4x, scenarios/a.py:3)\ndef then_ok():\n    pass\n"
        );
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate_or_pad("abcdefghij", 6), "abc...");
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
    }
}
