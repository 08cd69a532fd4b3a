//! Integration tests for three-way content merge.

use kit_merge::content::merge_content;

#[test]
fn clean_merge_non_overlapping() {
    let base = b"line1\nline2\nline3\nline4\nline5\n";
    let ours = b"MODIFIED1\nline2\nline3\nline4\nline5\n";
    let theirs = b"line1\nline2\nline3\nline4\nMODIFIED5\n";

    let result = merge_content(base, ours, theirs);
    assert!(result.is_clean());
    let content = String::from_utf8_lossy(result.content());
    assert!(content.contains("MODIFIED1"), "Expected MODIFIED1 in: {}", content);
    assert!(content.contains("MODIFIED5"), "Expected MODIFIED5 in: {}", content);
}

#[test]
fn conflict_same_region() {
    let base = b"a\nb\nc\n";
    let ours = b"a\nX\nc\n";
    let theirs = b"a\nY\nc\n";

    let result = merge_content(base, ours, theirs);
    assert!(!result.is_clean());

    let content = String::from_utf8_lossy(result.content());
    assert!(content.contains("<<<<<<< HEAD"));
    assert!(content.contains("======="));
    assert!(content.contains(">>>>>>> MERGE_HEAD"));
}

#[test]
fn conflict_always_includes_base_section() {
    let base = b"a\noriginal\nc\n";
    let ours = b"a\nours_change\nc\n";
    let theirs = b"a\ntheirs_change\nc\n";

    let result = merge_content(base, ours, theirs);
    assert!(!result.is_clean());

    let content = String::from_utf8_lossy(result.content());
    assert!(content.contains("||||||| BASE"));
    assert!(content.contains("original"));
}

#[test]
fn identical_changes_are_clean() {
    let base = b"a\nold\nc\n";
    let ours = b"a\nnew\nc\n";
    let theirs = b"a\nnew\nc\n";

    let result = merge_content(base, ours, theirs);
    assert!(result.is_clean());
    assert_eq!(result.content(), ours);
}

#[test]
fn base_equals_ours_takes_theirs() {
    let base = b"unchanged\n";
    let ours = b"unchanged\n";
    let theirs = b"modified\n";

    let result = merge_content(base, ours, theirs);
    assert!(result.is_clean());
    assert_eq!(result.content(), theirs);
}

#[test]
fn base_equals_theirs_takes_ours() {
    let base = b"unchanged\n";
    let ours = b"modified\n";
    let theirs = b"unchanged\n";

    let result = merge_content(base, ours, theirs);
    assert!(result.is_clean());
    assert_eq!(result.content(), ours);
}

#[test]
fn multiple_conflicts() {
    let base = b"a\nb\nc\nd\ne\n";
    let ours = b"X\nb\nY\nd\ne\n";
    let theirs = b"A\nb\nB\nd\ne\n";

    let result = merge_content(base, ours, theirs);
    assert!(!result.is_clean());

    let content = String::from_utf8_lossy(result.content());
    let conflict_marker_count = content.matches("<<<<<<< HEAD").count();
    assert!(conflict_marker_count >= 2, "Expected 2+ conflicts, got {}", conflict_marker_count);
}
