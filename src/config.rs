//! Editor configuration
//!
//! Every field has a serde default so a partial `editor.toml` only needs to
//! name the values it overrides.

use crate::coordinates::HorizontalEdgeInsets;
use crate::error::Result;
use crate::typesetter::LineBreakStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorConfig {
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_line_height_multiplier")]
    pub line_height_multiplier: f32,
    #[serde(default = "default_true")]
    pub wrap_lines: bool,
    #[serde(default)]
    pub line_break_strategy: LineBreakStrategy,
    /// Extra layout margin above and below the visible rect, in logical pixels
    #[serde(default = "default_vertical_layout_padding")]
    pub vertical_layout_padding: f32,
    #[serde(default = "default_tab_width")]
    pub tab_width: u32,
    #[serde(default)]
    pub edge_insets: HorizontalEdgeInsets,
    /// Largest range handed to the highlight provider in one request
    #[serde(default = "default_highlight_chunk_size")]
    pub highlight_chunk_size: usize,
    #[serde(default = "default_parser_timeout_ms")]
    pub parser_timeout_ms: u64,
    #[serde(default = "default_match_limit")]
    pub tree_sitter_match_limit: u32,
    #[serde(default = "default_cursor_blink_interval_ms")]
    pub cursor_blink_interval_ms: u64,
    /// Maximum undo groups kept; 0 keeps everything
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,
    #[serde(default = "default_true")]
    pub highlight_selected_line: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            line_height_multiplier: default_line_height_multiplier(),
            wrap_lines: true,
            line_break_strategy: LineBreakStrategy::default(),
            vertical_layout_padding: default_vertical_layout_padding(),
            tab_width: default_tab_width(),
            edge_insets: HorizontalEdgeInsets::default(),
            highlight_chunk_size: default_highlight_chunk_size(),
            parser_timeout_ms: default_parser_timeout_ms(),
            tree_sitter_match_limit: default_match_limit(),
            cursor_blink_interval_ms: default_cursor_blink_interval_ms(),
            undo_limit: default_undo_limit(),
            highlight_selected_line: true,
        }
    }
}

fn default_font_size() -> f32 { 14.0 }
fn default_line_height_multiplier() -> f32 { 1.4 }
fn default_true() -> bool { true }
fn default_vertical_layout_padding() -> f32 { 350.0 }
fn default_tab_width() -> u32 { 4 }
fn default_highlight_chunk_size() -> usize { 1024 }
fn default_parser_timeout_ms() -> u64 { 25 }
fn default_match_limit() -> u32 { 256 }
fn default_cursor_blink_interval_ms() -> u64 { 500 }
fn default_undo_limit() -> usize { 1000 }

impl EditorConfig {
    /// Load configuration from a TOML file, falling back to defaults when it is missing
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no editor config found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded editor config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn parser_timeout(&self) -> Duration {
        Duration::from_millis(self.parser_timeout_ms)
    }

    pub fn cursor_blink_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_interval_ms)
    }

    pub fn undo_limit(&self) -> Option<usize> {
        (self.undo_limit > 0).then_some(self.undo_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
            font_size = 16.0
            wrap_lines = false
            line_break_strategy = "character"

            [edge_insets]
            left = 8.0
            "#,
        )
        .unwrap();

        assert_eq!(config.font_size, 16.0);
        assert!(!config.wrap_lines);
        assert_eq!(config.line_break_strategy, LineBreakStrategy::Character);
        assert_eq!(config.edge_insets.left, 8.0);
        assert_eq!(config.edge_insets.right, 0.0);
        assert_eq!(config.vertical_layout_padding, 350.0);
        assert_eq!(config.highlight_chunk_size, 1024);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(EditorConfig::from_toml_str("font_size = \"big\"").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = EditorConfig::load("does/not/exist/editor.toml").unwrap();
        assert_eq!(config.tab_width, 4);
        assert_eq!(config.undo_limit(), Some(1000));
    }
}
