use std::path::Path;
use tiny_text_core::highlight::tree_sitter::TreeSitterClient;
use tiny_text_core::{
    CaptureName, EditorConfig, HighlightProvider, TextAttributes, TextBuffer, TextStorage, TextView, Theme, Viewport,
};

fn rust_view(text: &str) -> TextView {
    TextView::new(text, "rust", EditorConfig::default(), Viewport::new(800.0, 600.0).shared()).with_tree_sitter()
}

fn attributes(capture: CaptureName) -> TextAttributes {
    Theme::default().attributes_for(Some(capture))
}

#[test]
fn test_keywords_and_strings() {
    let text = "fn main() {\n    let s = \"hi\";\n}\n";
    let view = rust_view(text);

    assert_eq!(view.storage().attributes_at(0), Some(attributes(CaptureName::Keyword)));
    let let_offset = text.find("let").unwrap();
    assert_eq!(view.storage().attributes_at(let_offset), Some(attributes(CaptureName::Keyword)));
    let string_offset = text.find("\"hi\"").unwrap();
    assert_eq!(view.storage().attributes_at(string_offset + 1), Some(attributes(CaptureName::String)));

    assert!(!view.highlighter().has_outstanding_requests());
    assert!(view.highlighter().pending_set().is_empty());
}

#[test]
fn test_commenting_out_rehighlights() {
    let mut view = rust_view("fn main() {}\n");
    assert_eq!(view.storage().attributes_at(0), Some(attributes(CaptureName::Keyword)));

    view.set_selected_ranges(vec![0..0]);
    view.insert_text("// ");
    assert_eq!(view.text(), "// fn main() {}\n");
    assert_eq!(view.storage().attributes_at(3), Some(attributes(CaptureName::Comment)));
    assert_eq!(view.storage().attributes_at(10), Some(attributes(CaptureName::Comment)));

    assert!(view.undo());
    assert_eq!(view.text(), "fn main() {}\n");
    assert_eq!(view.storage().attributes_at(0), Some(attributes(CaptureName::Keyword)));
    assert_ne!(view.storage().attributes_at(5), Some(attributes(CaptureName::Comment)));
}

#[test]
fn test_open_without_config_file() {
    let view = TextView::open(
        "fn f() {}",
        "rust",
        Path::new("does-not-exist/editor.toml"),
        Viewport::new(800.0, 600.0).shared(),
    )
    .unwrap();

    assert!(view.highlighter().has_provider());
    assert_eq!(view.storage().attributes_at(0), Some(attributes(CaptureName::Keyword)));
}

#[test]
fn test_unknown_language_stays_plain() {
    let view = TextView::new("fn f() {}", "usda", EditorConfig::default(), Viewport::new(800.0, 600.0).shared())
        .with_tree_sitter();

    assert!(view.highlighter().has_provider());
    assert_eq!(view.storage().attributes_at(0), Some(Theme::default().text));
}

#[test]
fn test_client_edit_reports_changes() {
    let mut storage = TextStorage::new("fn a() {}\n");
    let mut client = TreeSitterClient::new(&EditorConfig::default());
    client.set_up(&storage, "rust").unwrap();

    client.will_apply_edit(&storage, &(0..0));
    storage.replace_characters(0..0, "pub ");

    let (sender, receiver) = crossbeam::channel::unbounded();
    client.apply_edit(
        &storage,
        0..0,
        4,
        Box::new(move |result| {
            let _ = sender.send(result);
        }),
    );
    // Tree-sitter answers before returning
    let changed = receiver.try_recv().unwrap().unwrap();
    assert!(!changed.is_empty());

    let text = storage.as_str().as_bytes();
    let highlights = client.highlights_for_range(text, 0..storage.len());
    assert!(highlights
        .iter()
        .any(|h| h.range == (0..3) && h.capture == Some(CaptureName::Keyword)));
    assert!(highlights
        .iter()
        .any(|h| h.range == (4..6) && h.capture == Some(CaptureName::Keyword)));
}

#[test]
fn test_macro_arguments_get_an_injected_layer() {
    let storage = TextStorage::new("fn f() {\n    foo!(1 + 2);\n}\n");
    let mut client = TreeSitterClient::new(&EditorConfig::default());
    client.set_up(&storage, "rust").unwrap();

    assert!(client.primary_layer().is_some_and(|layer| !layer.is_injected()));
    let injected: Vec<_> = client.layers().iter().filter(|layer| layer.is_injected()).collect();
    assert_eq!(injected.len(), 1);
    assert_eq!(injected[0].name, "rust");
    assert!(injected[0].ranges().iter().all(|range| range.end <= storage.len()));
}
