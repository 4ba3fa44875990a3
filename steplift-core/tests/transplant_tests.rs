//! End-to-end transplant tests: scan a corpus, then edit a scenario file

use std::fs;
use std::path::{Path, PathBuf};
use steplift_core::config::ResolvedConfig;
use steplift_core::corpus::relative_uri;
use steplift_core::{
    append_to_end, header_at, header_on_line, replace_step, Category, Document, FsCorpus,
    ScanCache, SourcePosition, TextDocument,
};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn kinds() -> Vec<String> {
    ["given", "when", "then", "and"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

/// Copy the fixture corpus into a scratch directory so tests can edit it
fn scratch_corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    copy_dir(&fixture_path("corpus"), dir.path());
    dir
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

fn open(root: &Path, relative: &str) -> TextDocument {
    let path = root.join(relative);
    TextDocument::open(&path)
        .unwrap()
        .with_uri(relative_uri(root, &path))
}

#[test]
fn test_replace_step_from_header_position() {
    let dir = scratch_corpus();
    let config = ResolvedConfig::defaults().unwrap();
    let corpus = FsCorpus::new(dir.path(), &config);
    let mut cache = ScanCache::new();

    let mut document = open(dir.path(), "scenarios/login.py");
    let header = header_at(&document, &kinds(), SourcePosition::new(5, 10))
        .unwrap()
        .unwrap();
    assert_eq!(header.name, "when_the_user_logs_in");

    let category = Category::kind(header.kind.as_str());
    let result = cache.get_or_scan(&category, &kinds(), &corpus).unwrap();
    let replacement = result
        .records()
        .iter()
        .find(|r| r.name == "when_the_user_checks_out")
        .unwrap();

    let applied = replace_step(
        &mut document,
        result,
        replacement.id,
        &category,
        &kinds(),
        header.name_span,
    )
    .unwrap();
    assert!(applied);
    document.save().unwrap();

    let on_disk = fs::read_to_string(dir.path().join("scenarios/login.py")).unwrap();
    assert_eq!(
        on_disk,
        "class LoginScenario:\n    def given_a_registered_user(self):\n        self.user = make_user(\"alice\")\n        self.user.save()\n\n    def when_the_user_checks_out(self):\n        self.response = self.cart.checkout()\n\n    def then_the_dashboard_is_shown(self):\n        assert self.response.status == 200\n"
    );
}

#[test]
fn test_line_only_target_finds_indented_header() {
    let dir = scratch_corpus();
    let document = open(dir.path(), "scenarios/login.py");

    // Column 0 is left of every method header in the fixture
    assert!(header_at(&document, &kinds(), SourcePosition::new(5, 0))
        .unwrap()
        .is_none());

    let header = header_on_line(&document, &kinds(), 5).unwrap().unwrap();
    assert_eq!(header.name, "when_the_user_logs_in");
    assert_eq!(header.name_span.start, SourcePosition::new(5, 4));
    assert!(header_on_line(&document, &kinds(), 6).unwrap().is_none());
}

#[test]
fn test_replaced_file_is_picked_up_after_reset() {
    let dir = scratch_corpus();
    let config = ResolvedConfig::defaults().unwrap();
    let corpus = FsCorpus::new(dir.path(), &config);
    let mut cache = ScanCache::new();
    let category = Category::kind("when");

    let mut document = open(dir.path(), "scenarios/login.py");
    let header = header_at(&document, &kinds(), SourcePosition::new(5, 4))
        .unwrap()
        .unwrap();
    {
        let result = cache.get_or_scan(&category, &kinds(), &corpus).unwrap();
        assert_eq!(result.len(), 2);
        replace_step(&mut document, result, 0, &category, &kinds(), header.name_span).unwrap();
    }
    document.save().unwrap();

    // Still the pre-edit scan
    assert_eq!(cache.get_or_scan(&category, &kinds(), &corpus).unwrap().len(), 2);

    cache.reset();
    let fresh = cache.get_or_scan(&category, &kinds(), &corpus).unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh.records()[0].name, "when_the_user_checks_out");
    assert_eq!(fresh.records()[0].usage_count, 2);
}

#[test]
fn test_replace_is_a_no_op_when_header_moved() {
    let dir = scratch_corpus();
    let config = ResolvedConfig::defaults().unwrap();
    let corpus = FsCorpus::new(dir.path(), &config);
    let mut cache = ScanCache::new();
    let category = Category::kind("given");

    let document = open(dir.path(), "scenarios/login.py");
    let header = header_at(&document, &kinds(), SourcePosition::new(1, 4))
        .unwrap()
        .unwrap();

    // Someone inserts a line above the header after it was located
    let mut edited = TextDocument::from_text(
        document.uri(),
        format!("import fixtures\n{}", document.text()),
    );
    let result = cache.get_or_scan(&category, &kinds(), &corpus).unwrap();
    let applied =
        replace_step(&mut edited, result, 1, &category, &kinds(), header.name_span).unwrap();

    assert!(!applied);
    assert!(edited.text().starts_with("import fixtures\nclass LoginScenario:\n"));
}

#[test]
fn test_replace_with_unknown_id_is_a_no_op() {
    let dir = scratch_corpus();
    let config = ResolvedConfig::defaults().unwrap();
    let corpus = FsCorpus::new(dir.path(), &config);
    let mut cache = ScanCache::new();
    let category = Category::kind("then");

    let mut document = open(dir.path(), "scenarios/login.py");
    let before = document.text().to_string();
    let header = header_at(&document, &kinds(), SourcePosition::new(8, 4))
        .unwrap()
        .unwrap();
    let result = cache.get_or_scan(&category, &kinds(), &corpus).unwrap();

    assert!(result.find(42).is_err());
    let applied =
        replace_step(&mut document, result, 42, &category, &kinds(), header.name_span).unwrap();
    assert!(!applied);
    assert_eq!(document.text(), before);
}

#[test]
fn test_append_step_to_new_scenario() {
    let dir = scratch_corpus();
    fs::write(
        dir.path().join("scenarios/profile.py"),
        "class ProfileScenario:\n    def given_x(self):\n        x()\n",
    )
    .unwrap();

    let config = ResolvedConfig::defaults().unwrap();
    let corpus = FsCorpus::new(dir.path(), &config);
    let mut cache = ScanCache::new();
    let result = cache
        .get_or_scan(&Category::kind("then"), &kinds(), &corpus)
        .unwrap();
    let record = result.find(0).unwrap();
    assert_eq!(record.name, "then_the_dashboard_is_shown");

    let mut document = open(dir.path(), "scenarios/profile.py");
    assert!(append_to_end(&mut document, &record.canonical_text).unwrap());
    document.save().unwrap();

    let on_disk = fs::read_to_string(dir.path().join("scenarios/profile.py")).unwrap();
    assert_eq!(
        on_disk,
        "class ProfileScenario:\n    def given_x(self):\n        x()\n\n    def then_the_dashboard_is_shown(self):\n        assert self.response.status == 200\n"
    );
}
