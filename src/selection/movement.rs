//! Distance queries behind cursor movement
//!
//! Each query returns the offset a cursor at `offset` moves to, or None when
//! the move is impossible (document start or end). None means no-op.

use super::Selection;
use crate::buffer::TextBuffer;
use crate::coordinates::LayoutPos;
use crate::layout::LayoutManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Forward,
    Backward,
}

impl Direction {
    fn is_backward(self) -> bool {
        matches!(self, Direction::Up | Direction::Backward)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Character,
    Word,
    /// Logical line, start or end
    Line,
    /// Wrapped fragment, start or end
    VisualLine,
    /// One viewport height
    Container,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterClass {
    Alphanumeric,
    Whitespace,
    Newline,
    Punctuation,
}

impl CharacterClass {
    pub fn of(ch: char) -> Self {
        if ch == '\n' || ch == '\r' {
            Self::Newline
        } else if ch.is_whitespace() {
            Self::Whitespace
        } else if ch.is_alphanumeric() || ch == '_' {
            Self::Alphanumeric
        } else {
            Self::Punctuation
        }
    }
}

pub(super) fn move_selection(
    selection: &mut Selection,
    direction: Direction,
    destination: Destination,
    modify_selection: bool,
    layout: &LayoutManager,
    buffer: &dyn TextBuffer,
) {
    let vertical = matches!(direction, Direction::Up | Direction::Down);

    if !modify_selection {
        selection.pivot = None;
        // A plain horizontal character move collapses a ranged selection
        if !selection.is_cursor() && destination == Destination::Character && !vertical {
            let offset = if direction.is_backward() {
                selection.range.start
            } else {
                selection.range.end
            };
            selection.range = offset..offset;
            selection.suggested_x = layout.rect_for_offset(offset, buffer).map(|r| r.min_x());
            return;
        }
    }

    let pivot = modify_selection.then(|| {
        *selection.pivot.get_or_insert(if direction.is_backward() {
            selection.range.end
        } else {
            selection.range.start
        })
    });
    let moving = match pivot {
        Some(pivot) if selection.range.start == pivot => selection.range.end,
        Some(_) => selection.range.start,
        None if direction.is_backward() => selection.range.start,
        None => selection.range.end,
    };

    let Some(target) = destination_offset(moving, direction, destination, selection.suggested_x, layout, buffer) else {
        return;
    };

    selection.range = match pivot {
        Some(pivot) => pivot.min(target)..pivot.max(target),
        None => target..target,
    };

    let moved_vertically = vertical && matches!(destination, Destination::Character | Destination::Container);
    if !moved_vertically || selection.suggested_x.is_none() {
        selection.suggested_x = layout.rect_for_offset(target, buffer).map(|r| r.min_x());
    }
}

/// Offset reached by moving from `offset`
pub fn destination_offset(
    offset: usize,
    direction: Direction,
    destination: Destination,
    suggested_x: Option<f32>,
    layout: &LayoutManager,
    buffer: &dyn TextBuffer,
) -> Option<usize> {
    let length = buffer.len();
    let target = match (destination, direction) {
        (Destination::Character, Direction::Forward) => next_boundary(offset, buffer),
        (Destination::Character, Direction::Backward) => previous_boundary(offset, buffer),
        (Destination::Character, _) => vertical_offset(offset, direction, suggested_x, None, layout, buffer),
        (Destination::Word, _) => word_boundary(offset, direction.is_backward(), layout, buffer),
        (Destination::Line, _) => line_boundary(offset, direction.is_backward(), layout, buffer),
        (Destination::VisualLine, _) => visual_line_boundary(offset, direction.is_backward(), layout, buffer),
        (Destination::Container, _) => {
            let page = layout.host()?.visible_rect()?.height;
            let direction = if direction.is_backward() { Direction::Up } else { Direction::Down };
            vertical_offset(offset, direction, suggested_x, Some(page), layout, buffer)
        }
        (Destination::Document, _) => Some(if direction.is_backward() { 0 } else { length }),
    }?;

    (target != offset && target <= length).then_some(target)
}

fn next_boundary(offset: usize, buffer: &dyn TextBuffer) -> Option<usize> {
    let length = buffer.len();
    if offset >= length {
        return None;
    }
    // Characters are at most four bytes
    let text = buffer.substring(offset..(offset + 4).min(length))
        .or_else(|| buffer.substring(offset..length))?;
    text.chars().next().map(|ch| offset + ch.len_utf8())
}

fn previous_boundary(offset: usize, buffer: &dyn TextBuffer) -> Option<usize> {
    if offset == 0 {
        return None;
    }
    let text = buffer.substring(offset.saturating_sub(4)..offset)
        .or_else(|| buffer.substring(0..offset))?;
    text.chars().next_back().map(|ch| offset - ch.len_utf8())
}

/// Extend over the run of characters sharing the class of the one being crossed
///
/// Reads one line at a time. Only a run of line terminators carries on into
/// the next line.
fn word_boundary(offset: usize, backward: bool, layout: &LayoutManager, buffer: &dyn TextBuffer) -> Option<usize> {
    let mut class = None;
    let mut position = offset;
    loop {
        let segment = if backward {
            if position == 0 {
                break;
            }
            layout.text_line_for_offset(position - 1)?.range.start..position
        } else {
            if position >= buffer.len() {
                break;
            }
            position..layout.text_line_for_offset(position)?.range.end
        };
        if segment.is_empty() {
            break;
        }

        let text = buffer.substring(segment.clone())?;
        let run = if backward {
            class_run(text.chars().rev(), &mut class)
        } else {
            class_run(text.chars(), &mut class)
        };
        if backward {
            position -= run;
        } else {
            position += run;
        }
        if run < segment.len() {
            break;
        }
    }
    class.map(|_| position)
}

/// Byte length of the leading run of `class`, fixing the class from the first character if unset
fn class_run(chars: impl Iterator<Item = char>, class: &mut Option<CharacterClass>) -> usize {
    let mut run = 0;
    for ch in chars {
        let ch_class = CharacterClass::of(ch);
        if *class.get_or_insert(ch_class) != ch_class {
            break;
        }
        run += ch.len_utf8();
    }
    run
}

/// Start of the logical line, or the end of its content before the terminator
fn line_boundary(offset: usize, backward: bool, layout: &LayoutManager, buffer: &dyn TextBuffer) -> Option<usize> {
    let line = layout.text_line_for_offset(offset)?;
    if backward {
        if offset == line.range.start && line.index > 0 {
            // Already at the start: go to the start of the line above
            return layout.text_line_for_index(line.index - 1).map(|above| above.range.start);
        }
        Some(line.range.start)
    } else {
        let text = buffer.substring(line.range.clone())?;
        let end = line.range.start + content_length(&text);
        if end != offset {
            return Some(end);
        }
        // Already at the end: go to the end of the line below
        let below = layout.text_line_for_index(line.index + 1)?;
        let text = buffer.substring(below.range.clone())?;
        Some(below.range.start + content_length(&text))
    }
}

/// Start or content end of the wrapped fragment holding `offset`
fn visual_line_boundary(offset: usize, backward: bool, layout: &LayoutManager, buffer: &dyn TextBuffer) -> Option<usize> {
    let line = layout.text_line_for_offset(offset)?;
    let relative = offset - line.range.start;
    let fragment = match line.data.typesetter.line_fragments.line_at_offset(relative) {
        Some(fragment) => line.range.start + fragment.range.start..line.range.start + fragment.range.end,
        None => line.range.clone(),
    };
    if backward {
        Some(fragment.start)
    } else {
        let text = buffer.substring(fragment.clone())?;
        Some(fragment.start + content_length(&text))
    }
}

/// Move one row (or `distance` pixels) up or down, aiming for `suggested_x`
fn vertical_offset(
    offset: usize,
    direction: Direction,
    suggested_x: Option<f32>,
    distance: Option<f32>,
    layout: &LayoutManager,
    buffer: &dyn TextBuffer,
) -> Option<usize> {
    let rect = layout.rect_for_offset(offset, buffer)?;
    let x = suggested_x.unwrap_or(rect.min_x());
    let y = match (direction, distance) {
        (Direction::Up, Some(distance)) => rect.min_y() - distance,
        (Direction::Up, None) => rect.min_y() - 1.0,
        (_, Some(distance)) => rect.min_y() + distance,
        (_, None) => rect.max_y() + 1.0,
    };

    if y < 0.0 {
        return Some(0);
    }
    if y >= layout.line_index().height() {
        return Some(buffer.len());
    }
    layout.text_offset_at_point(LayoutPos::new(x, y), buffer)
}

/// Byte length of `line` without its terminator
fn content_length(line: &str) -> usize {
    line.trim_end_matches(['\n', '\r']).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_classes() {
        assert_eq!(CharacterClass::of('a'), CharacterClass::Alphanumeric);
        assert_eq!(CharacterClass::of('_'), CharacterClass::Alphanumeric);
        assert_eq!(CharacterClass::of('7'), CharacterClass::Alphanumeric);
        assert_eq!(CharacterClass::of(' '), CharacterClass::Whitespace);
        assert_eq!(CharacterClass::of('\t'), CharacterClass::Whitespace);
        assert_eq!(CharacterClass::of('\n'), CharacterClass::Newline);
        assert_eq!(CharacterClass::of('{'), CharacterClass::Punctuation);
    }

    #[test]
    fn test_content_length() {
        assert_eq!(content_length("abc\r\n"), 3);
        assert_eq!(content_length("abc"), 3);
        assert_eq!(content_length("\n"), 0);
    }
}
