//! Benchmarks for the line index and the edit pipeline
//!
//! Sizes cover a short file up to a large generated source file:
//! - building the index from a buffer
//! - offset and y lookups (caret placement, hit testing)
//! - single keystrokes through the whole text view

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tiny_text_core::line_index::LineIndex;
use tiny_text_core::{EditorConfig, TextStorage, TextView, Viewport};

/// Generate a realistic document with mixed content
fn generate_document(lines: usize) -> String {
    let mut doc = String::new();
    for i in 0..lines {
        match i % 5 {
            0 => doc.push_str(&format!("fn function_{}() {{\n", i)),
            1 => doc.push_str(&format!(
                "    let variable_{} = \"string literal with some text\";\n",
                i
            )),
            2 => doc.push_str(&format!("    // Comment explaining line {}\n", i)),
            3 => doc.push_str(&format!("    process_data({}, {}, {});\n", i, i * 2, i * 3)),
            _ => doc.push_str("}\n"),
        }
    }
    doc
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_from_buffer");

    for size in [100, 1000, 10000, 100000].iter() {
        let storage = TextStorage::new(generate_document(*size));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let index: LineIndex<()> = LineIndex::build_from_buffer(&storage, 19.6);
                std::hint::black_box(index.count());
            });
        });
    }
    group.finish();
}

/// Offset and y lookups spread over the document
fn bench_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookups");

    for size in [1000, 10000, 100000].iter() {
        let storage = TextStorage::new(generate_document(*size));
        let index: LineIndex<()> = LineIndex::build_from_buffer(&storage, 19.6);
        let length = index.length();
        let height = index.height();

        group.bench_with_input(BenchmarkId::new("offset", size), size, |b, _| {
            b.iter(|| {
                for step in 0..100 {
                    let line = index.line_at_offset(length * step / 100);
                    std::hint::black_box(line.map(|l| l.index));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("position", size), size, |b, _| {
            b.iter(|| {
                for step in 0..100 {
                    let line = index.line_at_position(height * step as f32 / 100.0);
                    std::hint::black_box(line.map(|l| l.range));
                }
            });
        });
    }
    group.finish();
}

/// Insert and remove lines in the middle, the shape of typing Enter then Backspace
fn bench_line_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_edits");

    for size in [1000, 10000, 100000].iter() {
        let storage = TextStorage::new(generate_document(*size));
        let mut index: LineIndex<()> = LineIndex::build_from_buffer(&storage, 19.6);
        let middle = index.line_at_index(size / 2).map_or(0, |line| line.range.start);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                index.insert((), middle, 1, 19.6);
                index.update(middle, 4, 0.0);
                index.update(middle, -4, 0.0);
                std::hint::black_box(index.delete(middle));
            });
        });
    }
    group.finish();
}

/// A keystroke through the full pipeline, undone so the document stays the same size
fn bench_keystroke(c: &mut Criterion) {
    let mut group = c.benchmark_group("keystroke");
    group.sample_size(20);

    for size in [1000, 10000].iter() {
        let viewport = Viewport::new(800.0, 600.0).shared();
        let mut view = TextView::new(generate_document(*size), "rust", EditorConfig::default(), viewport)
            .with_tree_sitter();
        let middle = view.text().len() / 2;
        let middle = (0..=middle).rev().find(|&offset| view.text().is_char_boundary(offset)).unwrap_or(0);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                view.set_selected_ranges(vec![middle..middle]);
                view.insert_text("x");
                view.undo();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_lookups, bench_line_edits, bench_keystroke);
criterion_main!(benches);
