//! Terminal engine options.
//!
//! The bridge never interprets these; they are serialized as-is into the
//! `registerTerminal` command. Unset fields are omitted so the engine applies
//! its own defaults. Options the engine supports but this struct does not model
//! can be carried in [`TerminalOptions::extra`].

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorStyle {
    Block,
    Underline,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorInactiveStyle {
    Outline,
    Block,
    Bar,
    Underline,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FastScrollModifier {
    None,
    Alt,
    Ctrl,
    Shift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_proposed_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_transparency: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_click_moves_cursor: Option<bool>,
    /// Treat `\n` as `\r\n`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_eol: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_blink: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_style: Option<CursorStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_inactive_style: Option<CursorInactiveStyle>,
    /// Width of the bar cursor in CSS pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_glyphs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_stdin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_bold_text_in_bright_colors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_scroll_modifier: Option<FastScrollModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_scroll_sensitivity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// CSS weight, either a keyword (`"bold"`) or a number (`600`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight_bold: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_option_is_meta: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_option_click_forces_selection: Option<bool>,
    /// 1 disables contrast adjustment, 21 forces black/white.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_contrast_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_click_selects_word: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_reader_mode: Option<bool>,
    /// Lines retained above the viewport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrollback: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_sensitivity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smooth_scroll_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_stop_width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TerminalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = Some(cols);
        self.rows = Some(rows);
        self
    }

    pub fn with_scrollback(mut self, lines: u32) -> Self {
        self.scrollback = Some(lines);
        self
    }

    pub fn with_cursor(mut self, style: CursorStyle, blink: bool) -> Self {
        self.cursor_style = Some(style);
        self.cursor_blink = Some(blink);
        self
    }

    pub fn with_font(mut self, family: impl Into<String>, size: f64) -> Self {
        self.font_family = Some(family.into());
        self.font_size = Some(size);
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Forwards an option this struct does not model.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Colours as CSS colour strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_foreground: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_inactive_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yellow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magenta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cyan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_black: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_red: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_green: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_yellow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_blue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_magenta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_cyan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_white: Option<String>,
    /// Colours 16..=255 of the 256-colour palette.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extended_ansi: Vec<String>,
}
