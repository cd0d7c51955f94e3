//! Color configuration: `TOG_COLORS`/`TOG_COLOR_*` environment variables,
//! per-category color slots, and a parser for the named-color/attribute
//! values they carry.
//!
//! Grounded on the teacher's `git_utils::color` module (`ColorMode`,
//! `Color`, `parse_color_value`'s word-by-word attribute parser) with its
//! git-config-file backing (`ColorConfig::from_config`, `color.ui`,
//! `color.<command>`) replaced by spec §6's environment-variable surface
//! — this browser has no config file layer in scope.

use std::collections::HashMap;
use std::io::IsTerminal;

/// Whether color output is requested at all (spec §6: "any non-empty
/// value enables color").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// The eight named colors spec §6 allows per category, plus `default`
/// (no color override — inherits the terminal's foreground).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Default,
}

impl NamedColor {
    fn ansi_fg(self) -> Option<&'static str> {
        match self {
            NamedColor::Black => Some("30"),
            NamedColor::Red => Some("31"),
            NamedColor::Green => Some("32"),
            NamedColor::Yellow => Some("33"),
            NamedColor::Blue => Some("34"),
            NamedColor::Magenta => Some("35"),
            NamedColor::Cyan => Some("36"),
            NamedColor::White => Some("37"),
            NamedColor::Default => None,
        }
    }

    fn parse(word: &str) -> Option<Self> {
        Some(match word {
            "black" => NamedColor::Black,
            "red" => NamedColor::Red,
            "green" => NamedColor::Green,
            "yellow" => NamedColor::Yellow,
            "blue" => NamedColor::Blue,
            "magenta" => NamedColor::Magenta,
            "cyan" => NamedColor::Cyan,
            "white" => NamedColor::White,
            "default" => NamedColor::Default,
            _ => return None,
        })
    }
}

/// A rendering style: foreground color plus the two attributes the
/// views need (bold for emphasis, inverted for selection/search/`(END)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Option<NamedColor>,
    pub bold: bool,
    pub inverted: bool,
}

impl Style {
    pub const NORMAL: Style = Style { fg: None, bold: false, inverted: false };

    pub const fn fg(color: NamedColor) -> Self {
        Style { fg: Some(color), bold: false, inverted: false }
    }

    pub const fn inverted() -> Self {
        Style { fg: None, bold: false, inverted: true }
    }

    pub fn ansi_prefix(self) -> String {
        let mut codes = Vec::new();
        if self.bold {
            codes.push("1".to_string());
        }
        if self.inverted {
            codes.push("7".to_string());
        }
        if let Some(color) = self.fg {
            if let Some(code) = color.ansi_fg() {
                codes.push(code.to_string());
            }
        }
        if codes.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", codes.join(";"))
        }
    }

    pub const ANSI_RESET: &'static str = "\x1b[0m";
}

/// Semantic coloring points a view can ask the current `ColorConfig`
/// for, one per spec §4.7's diff color rule plus the tree/ref decorators
/// the other views use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSlot {
    DiffMinus,
    DiffPlus,
    DiffChunkHeader,
    DiffMeta,
    DiffAuthor,
    DiffDate,
    TreeDirectory,
    TreeSymlink,
    TreeExecutable,
    TreeSubmodule,
    RefBackup,
}

impl ColorSlot {
    fn env_suffix(self) -> &'static str {
        match self {
            ColorSlot::DiffMinus => "DIFF_MINUS",
            ColorSlot::DiffPlus => "DIFF_PLUS",
            ColorSlot::DiffChunkHeader => "DIFF_CHUNK_HEADER",
            ColorSlot::DiffMeta => "DIFF_META",
            ColorSlot::DiffAuthor => "AUTHOR",
            ColorSlot::DiffDate => "DATE",
            ColorSlot::TreeDirectory => "TREE_DIRECTORY",
            ColorSlot::TreeSymlink => "TREE_SYMLINK",
            ColorSlot::TreeExecutable => "TREE_EXECUTABLE",
            ColorSlot::TreeSubmodule => "TREE_SUBMODULE",
            ColorSlot::RefBackup => "REFS_BACKUP",
        }
    }

    fn default_style(self) -> Style {
        match self {
            ColorSlot::DiffMinus => Style::fg(NamedColor::Red),
            ColorSlot::DiffPlus => Style::fg(NamedColor::Green),
            ColorSlot::DiffChunkHeader => Style::fg(NamedColor::Cyan),
            ColorSlot::DiffMeta => Style { fg: None, bold: true, inverted: false },
            ColorSlot::DiffAuthor => Style::fg(NamedColor::Magenta),
            ColorSlot::DiffDate => Style::fg(NamedColor::Yellow),
            ColorSlot::TreeDirectory => Style::fg(NamedColor::Blue),
            ColorSlot::TreeSymlink => Style::fg(NamedColor::Cyan),
            ColorSlot::TreeExecutable => Style::fg(NamedColor::Green),
            ColorSlot::TreeSubmodule => Style::fg(NamedColor::Yellow),
            ColorSlot::RefBackup => Style::fg(NamedColor::Black),
        }
    }
}

/// Resolved color configuration: whether color is enabled at all, and
/// each slot's style (default, or a `TOG_COLOR_*` override).
pub struct ColorConfig {
    enabled: bool,
    overrides: HashMap<ColorSlot, Style>,
}

impl ColorConfig {
    /// Build the configuration from the process environment, the way
    /// `tog` itself is invoked (spec §6).
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok(), std::io::stdout().is_terminal())
    }

    /// Testable constructor taking an explicit variable lookup and
    /// terminal-ness, so tests don't depend on the process environment.
    pub fn from_env_with<F>(get_var: F, is_terminal: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match get_var("TOG_COLORS") {
            Some(v) if !v.is_empty() => ColorMode::Always,
            Some(_) => ColorMode::Never,
            None => ColorMode::Auto,
        };
        let enabled = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => is_terminal,
        };

        let mut overrides = HashMap::new();
        for slot in [
            ColorSlot::DiffMinus,
            ColorSlot::DiffPlus,
            ColorSlot::DiffChunkHeader,
            ColorSlot::DiffMeta,
            ColorSlot::DiffAuthor,
            ColorSlot::DiffDate,
            ColorSlot::TreeDirectory,
            ColorSlot::TreeSymlink,
            ColorSlot::TreeExecutable,
            ColorSlot::TreeSubmodule,
            ColorSlot::RefBackup,
        ] {
            let key = format!("TOG_COLOR_{}", slot.env_suffix());
            if let Some(value) = get_var(&key) {
                if let Some(style) = parse_color_value(&value) {
                    overrides.insert(slot, style);
                }
            }
        }

        Self { enabled, overrides }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The effective style for `slot`: a `TOG_COLOR_*` override if set,
    /// else the fixed per-category default; `Style::NORMAL` if color is
    /// disabled entirely.
    pub fn style(&self, slot: ColorSlot) -> Style {
        if !self.enabled {
            return Style::NORMAL;
        }
        self.overrides.get(&slot).copied().unwrap_or_else(|| slot.default_style())
    }
}

/// Parse a `TOG_COLOR_*` value into a `Style`. Spec §6 restricts the
/// vocabulary to the eight named colors plus `default`; unknown words
/// are ignored rather than rejected outright, matching the teacher's
/// forgiving `parse_color_value`.
fn parse_color_value(s: &str) -> Option<Style> {
    let mut style = Style::default();
    let mut saw_any = false;
    for word in s.split_whitespace() {
        match word {
            "bold" => {
                style.bold = true;
                saw_any = true;
            }
            _ => {
                if let Some(color) = NamedColor::parse(word) {
                    style.fg = Some(color);
                    saw_any = true;
                }
            }
        }
    }
    saw_any.then_some(style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tog_colors_unset_and_not_a_terminal_disables_color() {
        let cfg = ColorConfig::from_env_with(|_| None, false);
        assert!(!cfg.is_enabled());
    }

    #[test]
    fn non_empty_tog_colors_forces_color_on() {
        let cfg = ColorConfig::from_env_with(
            |k| if k == "TOG_COLORS" { Some("1".to_string()) } else { None },
            false,
        );
        assert!(cfg.is_enabled());
    }

    #[test]
    fn per_slot_override_wins_over_default() {
        let cfg = ColorConfig::from_env_with(
            |k| match k {
                "TOG_COLORS" => Some("1".to_string()),
                "TOG_COLOR_DIFF_MINUS" => Some("blue".to_string()),
                _ => None,
            },
            false,
        );
        assert_eq!(cfg.style(ColorSlot::DiffMinus).fg, Some(NamedColor::Blue));
    }

    #[test]
    fn default_style_used_when_no_override() {
        let cfg = ColorConfig::from_env_with(
            |k| if k == "TOG_COLORS" { Some("1".to_string()) } else { None },
            false,
        );
        assert_eq!(cfg.style(ColorSlot::DiffPlus).fg, Some(NamedColor::Green));
    }

    #[test]
    fn disabled_color_returns_normal_style_regardless_of_slot() {
        let cfg = ColorConfig::from_env_with(|_| None, false);
        assert_eq!(cfg.style(ColorSlot::DiffMinus), Style::NORMAL);
    }
}
