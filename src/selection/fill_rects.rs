use crate::buffer::TextBuffer;
use crate::coordinates::LayoutRect;
use crate::layout::LayoutManager;
use crate::line_index::LinePosition;
use crate::text_line::TextLine;
use std::ops::Range;

/// Rects covering `range`, clipped horizontally to `bounds`
///
/// The first and last lines get per-fragment rects; every line in between is
/// covered by one full-width rect.
pub(super) fn fill_rects(
    bounds: LayoutRect,
    range: &Range<usize>,
    layout: &LayoutManager,
    buffer: &dyn TextBuffer,
) -> Vec<LayoutRect> {
    let index = layout.line_index();
    let first = index.line_at_offset(range.start);
    let last = if range.end == index.length() {
        index.last()
    } else {
        index.line_at_offset(range.end)
    };
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };

    let mut rects = line_fill_rects(bounds, range, &first, layout, buffer);
    if last.range != first.range {
        rects.extend(line_fill_rects(bounds, range, &last, layout, buffer));
    }

    if first.max_y() < last.y_pos {
        rects.push(LayoutRect::new(
            bounds.min_x(),
            first.max_y(),
            bounds.width,
            last.y_pos - first.max_y(),
        ));
    }
    rects
}

fn line_fill_rects(
    bounds: LayoutRect,
    range: &Range<usize>,
    line: &LinePosition<&TextLine>,
    layout: &LayoutManager,
    buffer: &dyn TextBuffer,
) -> Vec<LayoutRect> {
    let document_length = layout.line_index().length();
    let fragments: Vec<(Range<usize>, f32, f32)> = if line.data.typesetter.line_fragments.is_empty() {
        vec![(line.range.clone(), line.y_pos, line.height)]
    } else {
        line.data
            .typesetter
            .line_fragments
            .iter()
            .map(|f| {
                let start = line.range.start + f.range.start;
                (start..line.range.start + f.range.end, line.y_pos + f.y_pos, f.height)
            })
            .collect()
    };

    let mut rects = Vec::new();
    for (fragment, y_pos, height) in fragments {
        let intersection = fragment.start.max(range.start)..fragment.end.min(range.end);
        if intersection.is_empty() {
            continue;
        }
        let Some(min_rect) = layout.rect_for_offset(intersection.start, buffer) else {
            continue;
        };

        // Selection runs past the fragment end: fill to the right edge
        let max_x = if fragment.end <= range.end && intersection.end != document_length {
            bounds.max_x()
        } else if let Some(max_rect) = layout.rect_for_offset(intersection.end, buffer) {
            max_rect.min_x()
        } else {
            continue;
        };

        rects.push(LayoutRect::new(
            min_rect.min_x(),
            y_pos,
            max_x - min_rect.min_x(),
            min_rect.height.max(height),
        ));
    }
    rects
}
