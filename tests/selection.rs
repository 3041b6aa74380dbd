use proptest::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tiny_text_core::selection::remap_offset;
use tiny_text_core::typesetter::TextMeasurer;
use tiny_text_core::{
    Destination, Direction, EditorConfig, LayoutManager, LayoutRect, SelectionManager, TextStorage, Viewport,
};

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

fn setup(text: &str) -> (TextStorage, LayoutManager, SelectionManager) {
    let storage = TextStorage::new(text);
    let config = EditorConfig {
        line_height_multiplier: 1.0,
        vertical_layout_padding: 0.0,
        wrap_lines: false,
        ..Default::default()
    };
    let viewport = Viewport::new(400.0, 300.0).shared();
    let mut layout = LayoutManager::new(&storage, &config, Arc::new(Monospace), Some(Box::new(viewport)));
    layout.layout_lines(&storage);
    let selection = SelectionManager::new(true, Duration::from_millis(500));
    (storage, layout, selection)
}

#[test]
fn test_set_selected_ranges_drops_invalid_and_duplicates() {
    let (storage, layout, mut selection) = setup("hello world");

    selection.set_selected_ranges(vec![0..2, 4..20, 0..2, 6..6], &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..2, 6..6]);
}

#[test]
fn test_add_selected_range_merges_touching() {
    let (storage, layout, mut selection) = setup("0123456789abcdef");
    selection.set_selected_range(0..0, &layout, &storage);

    selection.add_selected_range(5..8, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..0, 5..8]);

    selection.add_selected_range(7..10, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..0, 5..10]);

    // Touching the end still merges
    selection.add_selected_range(10..12, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..0, 5..12]);

    // Out of range is ignored
    selection.add_selected_range(14..30, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..0, 5..12]);
}

#[test]
fn test_edit_collapses_and_dedupes() {
    let (storage, layout, mut selection) = setup("abcdef");
    selection.set_selected_ranges(vec![2..2, 4..4, 5..6], &layout, &storage);

    // "bcde" deleted: the cursors inside and the selection after it all land at 1
    selection.did_replace_characters(1..5, 0, 2);
    assert_eq!(selection.selected_ranges(), vec![1..1]);
}

#[test]
fn test_selection_after_edit_shifts() {
    let (storage, layout, mut selection) = setup("abcdef");
    selection.set_selected_ranges(vec![0..1, 5..6], &layout, &storage);

    // "XY" inserted at 3
    selection.did_replace_characters(3..3, 2, 8);
    assert_eq!(selection.selected_ranges(), vec![0..0, 7..7]);
}

#[test]
fn test_horizontal_movement() {
    let (storage, layout, mut selection) = setup("hello world\nsecond line");
    selection.set_selected_range(0..0, &layout, &storage);

    selection.move_selections(Direction::Forward, Destination::Word, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![5..5]);

    selection.move_selections(Direction::Forward, Destination::Line, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![11..11]);

    // Already at the line end: the end of the next line
    selection.move_selections(Direction::Forward, Destination::Line, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![23..23]);

    selection.move_selections(Direction::Backward, Destination::Document, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..0]);

    // Nowhere to go
    selection.move_selections(Direction::Backward, Destination::Character, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..0]);
}

#[test]
fn test_word_movement_across_lines() {
    let (storage, layout, mut selection) = setup("ab  \n\n\ncd,ef");
    selection.set_selected_range(2..2, &layout, &storage);

    selection.move_selections(Direction::Forward, Destination::Word, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![4..4]);

    // A run of blank lines is crossed in one step
    selection.move_selections(Direction::Forward, Destination::Word, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![7..7]);

    selection.move_selections(Direction::Forward, Destination::Word, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![9..9]);

    selection.move_selections(Direction::Backward, Destination::Word, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![7..7]);

    selection.move_selections(Direction::Backward, Destination::Word, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![4..4]);

    // At the document end there is nothing to cross
    selection.set_selected_range(12..12, &layout, &storage);
    selection.move_selections(Direction::Forward, Destination::Word, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![12..12]);
}

#[test]
fn test_extending_keeps_pivot() {
    let (storage, layout, mut selection) = setup("abcdef");
    selection.set_selected_range(0..0, &layout, &storage);

    selection.move_selections(Direction::Forward, Destination::Character, true, &layout, &storage);
    selection.move_selections(Direction::Forward, Destination::Character, true, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..2]);

    selection.move_selections(Direction::Backward, Destination::Character, true, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![0..1]);

    // A plain move collapses toward the direction of travel
    selection.move_selections(Direction::Forward, Destination::Character, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![1..1]);
}

#[test]
fn test_vertical_movement_keeps_column() {
    let (storage, layout, mut selection) = setup("abc\ndef");
    selection.set_selected_range(2..2, &layout, &storage);

    selection.move_selections(Direction::Down, Destination::Character, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![6..6]);

    // Below the last line: the document end
    selection.move_selections(Direction::Down, Destination::Character, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![7..7]);

    // Back up to the remembered column
    selection.move_selections(Direction::Up, Destination::Character, false, &layout, &storage);
    assert_eq!(selection.selected_ranges(), vec![2..2]);
}

#[test]
fn test_fill_rects_cover_middle_lines() {
    let (storage, layout, mut selection) = setup("abc\ndef\nghi");
    selection.set_selected_range(1..9, &layout, &storage);

    let bounds = LayoutRect::new(0.0, 0.0, 400.0, 300.0);
    let rects = selection.selection_rects(bounds, &layout, &storage);
    assert_eq!(
        rects,
        vec![
            LayoutRect::new(10.0, 0.0, 390.0, 20.0),
            LayoutRect::new(0.0, 40.0, 10.0, 20.0),
            LayoutRect::new(0.0, 20.0, 400.0, 20.0),
        ]
    );
    assert_eq!(
        selection.selections()[0].bounding_rect,
        LayoutRect::new(0.0, 0.0, 400.0, 60.0)
    );
}

#[test]
fn test_highlighted_line_once_per_line() {
    let (storage, layout, mut selection) = setup("abc\ndef");
    selection.set_selected_ranges(vec![0..0, 2..2, 5..5], &layout, &storage);

    let bounds = LayoutRect::new(0.0, 0.0, 400.0, 300.0);
    let rects = selection.highlighted_line_rects(bounds, &layout);
    assert_eq!(
        rects,
        vec![
            LayoutRect::new(0.0, 0.0, 400.0, 20.0),
            LayoutRect::new(0.0, 20.0, 400.0, 20.0),
        ]
    );
}

fn range_in(length: usize) -> impl Strategy<Value = Range<usize>> {
    (0..=length, 0..=length).prop_map(|(a, b)| a.min(b)..a.max(b))
}

proptest! {
    #[test]
    fn remap_stays_inside_document(
        selection in range_in(50),
        edit in range_in(50),
        replacement in 0usize..10,
    ) {
        let new_length = 50 - edit.len() + replacement;
        let offset = remap_offset(&selection, &edit, replacement);
        prop_assert!(offset >= 0);
        prop_assert!(offset as usize <= new_length);

        if selection.start < edit.end && edit.start < selection.end {
            // Intersecting: collapse to the end of the replacement
            prop_assert_eq!(offset as usize, edit.start + replacement);
        } else if selection.is_empty() && (edit.start..=edit.end).contains(&selection.start) {
            // Cursors inside or touching either end of the edit
            prop_assert_eq!(offset as usize, edit.start + replacement);
        } else if selection.start >= edit.end {
            prop_assert_eq!(offset, selection.start as isize + replacement as isize - edit.len() as isize);
        } else {
            prop_assert!(selection.end <= edit.start);
            prop_assert_eq!(offset as usize, selection.start);
        }
    }
}
