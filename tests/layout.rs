use proptest::prelude::*;
use proptest::sample::Index;
use std::ops::Range;
use std::sync::Arc;
use tiny_text_core::typesetter::TextMeasurer;
use tiny_text_core::{EditorConfig, LayoutManager, LayoutPos, LayoutRect, SharedViewport, TextBuffer, TextStorage, Viewport};

/// Every visible character is 10 wide, every line 20 tall
struct Monospace;

impl TextMeasurer for Monospace {
    fn advance(&self, ch: char, _x: f32) -> f32 {
        if ch == '\n' {
            0.0
        } else {
            10.0
        }
    }

    fn natural_line_height(&self) -> f32 {
        20.0
    }
}

fn config(wrap_lines: bool) -> EditorConfig {
    EditorConfig {
        line_height_multiplier: 1.0,
        vertical_layout_padding: 0.0,
        wrap_lines,
        ..Default::default()
    }
}

fn layout_for(storage: &TextStorage, viewport: &SharedViewport, config: &EditorConfig) -> LayoutManager {
    LayoutManager::new(storage, config, Arc::new(Monospace), Some(Box::new(viewport.clone())))
}

fn line_ranges(layout: &LayoutManager) -> Vec<Range<usize>> {
    layout.line_index().iter().map(|line| line.range).collect()
}

/// Line ranges of `text` computed directly
fn expected_line_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            ranges.push(start..i + 1);
            start = i + 1;
        }
    }
    ranges.push(start..text.len());
    ranges
}

#[test]
fn test_nested_transactions_lay_out_once() {
    let storage = TextStorage::new("one\ntwo\nthree");
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(false));
    let before = layout.layout_pass_count();

    layout.begin_transaction();
    layout.begin_transaction();
    layout.begin_transaction();
    layout.end_transaction(&storage, false);
    layout.end_transaction(&storage, false);
    assert_eq!(layout.layout_pass_count(), before);
    layout.end_transaction(&storage, false);

    assert_eq!(layout.layout_pass_count(), before + 1);
    assert!(!layout.is_in_transaction());
}

#[test]
fn test_open_transaction_suppresses_layout() {
    let storage = TextStorage::new("one\ntwo");
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(false));
    let before = layout.layout_pass_count();

    layout.begin_transaction();
    layout.begin_transaction();
    layout.end_transaction(&storage, false);
    layout.layout_lines(&storage);

    assert!(layout.is_in_transaction());
    assert_eq!(layout.layout_pass_count(), before);
}

#[test]
fn test_detached_host_skips_layout() {
    let storage = TextStorage::new("one\ntwo");
    let viewport = Viewport::new(400.0, 300.0).shared();
    viewport.lock().attached = false;
    let mut layout = layout_for(&storage, &viewport, &config(false));

    layout.layout_lines(&storage);
    assert_eq!(layout.layout_pass_count(), 0);
}

#[test]
fn test_layout_reports_height_to_host() {
    let storage = TextStorage::new("one\ntwo\nthree");
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(false));

    layout.layout_lines(&storage);
    assert_eq!(layout.line_count(), 3);
    assert_eq!(layout.line_index().height(), 60.0);
    assert_eq!(viewport.lock().content_size.height, 60.0);
}

#[test]
fn test_wrapped_line_grows() {
    let storage = TextStorage::new("aaaaaaaaaa\nb");
    let viewport = Viewport::new(50.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(true));
    assert_eq!(layout.line_index().height(), 40.0);

    layout.layout_lines(&storage);

    let first = layout.text_line_for_index(0).unwrap();
    assert_eq!(first.data.typesetter.fragment_count(), 2);
    assert_eq!(first.height, 40.0);
    assert_eq!(layout.line_index().height(), 60.0);
    assert_eq!(layout.text_line_for_index(1).unwrap().y_pos, 40.0);

    // The second fragment starts a row down
    let rect = layout.rect_for_offset(7, &storage).unwrap();
    assert_eq!(rect, LayoutRect::new(20.0, 20.0, 1.0, 20.0));
}

#[test]
fn test_point_and_rect_mapping() {
    let storage = TextStorage::new("abc\ndef");
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(false));
    layout.layout_lines(&storage);

    assert_eq!(layout.rect_for_offset(5, &storage), Some(LayoutRect::new(10.0, 20.0, 1.0, 20.0)));
    assert_eq!(layout.text_offset_at_point(LayoutPos::new(20.0, 25.0), &storage), Some(6));
    // Past the end of a line clamps to its content end
    assert_eq!(layout.text_offset_at_point(LayoutPos::new(300.0, 5.0), &storage), Some(3));
    assert_eq!(layout.text_offset_at_point(LayoutPos::new(0.0, 1000.0), &storage), None);
}

#[test]
fn test_replacement_spanning_lines() {
    let mut storage = TextStorage::new("ab\ncd\nef");
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(false));

    layout.will_replace_characters(1..4, "X\nY");
    storage.replace_characters(1..4, "X\nY");

    assert_eq!(storage.as_str(), "aX\nYd\nef");
    assert_eq!(line_ranges(&layout), vec![0..3, 3..6, 6..8]);
}

#[test]
fn test_delete_everything_leaves_one_line() {
    let mut storage = TextStorage::new("ab\ncd");
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(false));

    layout.will_replace_characters(0..5, "");
    storage.replace_characters(0..5, "");

    assert_eq!(line_ranges(&layout), vec![0..0]);
    assert_eq!(layout.line_index().length(), 0);
}

#[test]
fn test_newline_at_end() {
    let mut storage = TextStorage::new("ab");
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = layout_for(&storage, &viewport, &config(false));

    layout.will_replace_characters(2..2, "\n");
    storage.replace_characters(2..2, "\n");

    assert_eq!(line_ranges(&layout), vec![0..3, 3..3]);
}

fn edit_strategy() -> impl Strategy<Value = (Index, Index, String)> {
    (any::<Index>(), any::<Index>(), "[xy\n]{0,6}")
}

proptest! {
    #[test]
    fn edits_keep_line_ranges_in_sync(
        text in "[ab\n]{0,40}",
        edits in prop::collection::vec(edit_strategy(), 1..8),
    ) {
        let mut storage = TextStorage::new(text);
        let viewport = Viewport::new(400.0, 300.0).shared();
        let mut layout = layout_for(&storage, &viewport, &config(false));

        for (a, b, replacement) in edits {
            let length = storage.len();
            let (a, b) = (a.index(length + 1), b.index(length + 1));
            let range = a.min(b)..a.max(b);

            layout.will_replace_characters(range.clone(), &replacement);
            storage.replace_characters(range, &replacement);
            layout.layout_lines(&storage);

            prop_assert_eq!(line_ranges(&layout), expected_line_ranges(storage.as_str()));
            prop_assert_eq!(layout.line_index().length(), storage.len());
        }
    }
}
