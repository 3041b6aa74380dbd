//! Text editing core for a code editor view
//!
//! A line index maps byte offsets to lines and heights, the layout manager
//! typesets only what is visible, and selection, undo and incremental syntax
//! highlighting track every edit through one pipeline in [`TextView`].

pub mod buffer;
pub mod config;
pub mod coordinates; // Coordinate system abstraction
pub mod editor;
pub mod error;
pub mod highlight;
pub mod layout;
pub mod line_ending;
pub mod line_index;
pub mod selection;
pub mod text_line;
pub mod typesetter;
pub mod undo;

// Re-export core types
pub use buffer::{TextAttributes, TextBuffer, TextStorage};
pub use config::EditorConfig;
pub use coordinates::{LayoutPos, LayoutRect, LayoutSize, SharedViewport, TextMetrics, Viewport};
pub use editor::TextView;
pub use error::{Error, Result};
pub use highlight::{CaptureName, HighlightProvider, HighlightRange, Highlighter, IndexSet, Theme};
pub use layout::{LayoutHost, LayoutManager};
pub use line_ending::LineEnding;
pub use line_index::{LineIndex, LinePosition};
pub use selection::{Destination, Direction, Selection, SelectionManager};
pub use undo::{TextMutation, UndoManager};
