// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Terminal display utilities for the facetdex CLI.
//!
//! OneDark colors on dark terminals, One Light on light ones. Colors are only
//! emitted to a TTY, and never when `NO_COLOR` is set.
//!
//! # Theme detection order
//!
//! 1. `FACETDEX_THEME` env var ("dark" or "light")
//! 2. `COLORFGBG` env var (terminal background hint)
//! 3. Default to dark theme

use std::sync::OnceLock;

// Box drawing constants - width between │ and │ (excluding border chars)
pub const BOX_WIDTH: usize = 72;

// ═══════════════════════════════════════════════════════════════════════════
// THEME DETECTION
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

static THEME: OnceLock<Theme> = OnceLock::new();

fn detect_theme() -> Theme {
    if let Ok(theme) = std::env::var("FACETDEX_THEME") {
        match theme.to_lowercase().as_str() {
            "light" | "l" => return Theme::Light,
            "dark" | "d" => return Theme::Dark,
            _ => {}
        }
    }

    // COLORFGBG is "fg;bg"; backgrounds 7 and up (except 8) are light
    if let Ok(colorfgbg) = std::env::var("COLORFGBG") {
        if let Some(Ok(bg)) = colorfgbg.split(';').next_back().map(str::parse::<u8>) {
            if bg >= 7 && bg != 8 {
                return Theme::Light;
            }
        }
    }

    Theme::Dark
}

pub fn theme() -> Theme {
    *THEME.get_or_init(detect_theme)
}

// ═══════════════════════════════════════════════════════════════════════════
// PALETTES (True Color)
// ═══════════════════════════════════════════════════════════════════════════
//
// OneDark: https://github.com/joshdick/onedark.vim
// One Light: https://github.com/sonph/onehalf

fn rgb((r, g, b): (u8, u8, u8)) -> String {
    format!("\x1b[38;2;{};{};{}m", r, g, b)
}

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";

/// Semantic colors used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Accent,
    Good,
    Warn,
    Bad,
    Muted,
    Value,
}

impl Tone {
    fn rgb(self, theme: Theme) -> (u8, u8, u8) {
        match (theme, self) {
            (Theme::Dark, Tone::Accent) => (86, 182, 194),  // #56b6c2
            (Theme::Dark, Tone::Good) => (152, 195, 121),   // #98c379
            (Theme::Dark, Tone::Warn) => (229, 192, 123),   // #e5c07b
            (Theme::Dark, Tone::Bad) => (224, 108, 117),    // #e06c75
            (Theme::Dark, Tone::Muted) => (92, 99, 112),    // #5c6370
            (Theme::Dark, Tone::Value) => (198, 120, 221),  // #c678dd
            (Theme::Light, Tone::Accent) => (1, 132, 188),  // #0184bc
            (Theme::Light, Tone::Good) => (80, 161, 79),    // #50a14f
            (Theme::Light, Tone::Warn) => (193, 132, 1),    // #c18401
            (Theme::Light, Tone::Bad) => (228, 86, 73),     // #e45649
            (Theme::Light, Tone::Muted) => (160, 161, 167), // #a0a1a7
            (Theme::Light, Tone::Value) => (166, 38, 164),  // #a626a4
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CORE UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// Check if colors should be used (TTY detection)
pub fn use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty::is(atty::Stream::Stdout)
}

/// Paint `text` in `tone`, bold if asked, when colors are on.
pub fn paint(tone: Tone, bold: bool, text: &str) -> String {
    if !use_colors() {
        return text.to_string();
    }
    let weight = if bold { BOLD } else { "" };
    format!("{}{}{}{}", weight, rgb(tone.rgb(theme())), text, RESET)
}

/// Calculate visible length (excluding ANSI codes)
pub fn visible_len(s: &str) -> usize {
    let mut in_escape = false;
    let mut len = 0;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape && c == 'm' {
            in_escape = false;
        } else if !in_escape {
            len += 1;
        }
    }
    len
}

/// Right-pad a styled string to a fixed visible width
pub fn pad_right(s: &str, width: usize) -> String {
    let visible = visible_len(s);
    if visible >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visible))
    }
}

/// Left-pad a styled string to a fixed visible width
pub fn pad_left(s: &str, width: usize) -> String {
    let visible = visible_len(s);
    if visible >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - visible), s)
    }
}

/// Shorten to `max` visible characters, ending in `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

// ═══════════════════════════════════════════════════════════════════════════
// BOX DRAWING
// ═══════════════════════════════════════════════════════════════════════════

fn border(text: &str) -> String {
    paint(Tone::Muted, false, text)
}

/// Print a content line: │ content          │
pub fn row(content: &str) {
    let content = truncate_styled(content);
    let pad = BOX_WIDTH.saturating_sub(visible_len(&content));
    println!("{}{}{}{}", border("│"), content, " ".repeat(pad), border("│"));
}

fn truncate_styled(content: &str) -> String {
    if visible_len(content) <= BOX_WIDTH {
        content.to_string()
    } else {
        // Styled text that overflows loses its colors.
        let mut plain = String::new();
        let mut in_escape = false;
        for c in content.chars() {
            if c == '\x1b' {
                in_escape = true;
            } else if in_escape && c == 'm' {
                in_escape = false;
            } else if !in_escape {
                plain.push(c);
            }
        }
        truncate(&plain, BOX_WIDTH)
    }
}

/// Print section header: ┌─ LABEL ──────────┐
pub fn section_top(label: &str) {
    section_line("┌", "┐", label);
}

/// Print section divider: ├─ LABEL ──────────┤
pub fn section_mid(label: &str) {
    section_line("├", "┤", label);
}

fn section_line(left: &str, right: &str, label: &str) {
    let label_part = format!("─ {} ", paint(Tone::Accent, true, label));
    let remaining = BOX_WIDTH.saturating_sub(visible_len(&label_part));
    println!(
        "{}{}{}{}",
        border(left),
        label_part,
        border(&"─".repeat(remaining)),
        border(right)
    );
}

/// Print section footer: └──────────────────┘
pub fn section_bot() {
    println!("{}", border(&format!("└{}┘", "─".repeat(BOX_WIDTH))));
}

/// `label` left, `value` right-aligned in the remaining space.
pub fn key_value(label: &str, value: &str) {
    let left = format!("  {}", paint(Tone::Muted, false, label));
    let right = format!("{}  ", paint(Tone::Value, false, value));
    let pad = BOX_WIDTH.saturating_sub(visible_len(&left) + visible_len(&right));
    row(&format!("{}{}{}", left, " ".repeat(pad), right));
}

// ═══════════════════════════════════════════════════════════════════════════
// SEMANTIC FORMATTERS
// ═══════════════════════════════════════════════════════════════════════════

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Right-aligned count, muted when zero.
pub fn count(value: usize, width: usize) -> String {
    let text = pad_left(&value.to_string(), width);
    if value == 0 {
        paint(Tone::Muted, false, &text)
    } else {
        paint(Tone::Good, true, &text)
    }
}

/// Horizontal bar proportional to `value / max`.
pub fn bar(value: usize, max: usize, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = (value * width).div_ceil(max).min(width);
    paint(Tone::Accent, false, &"━".repeat(filled))
}

/// Color-coded timing value in ms (green=fast, yellow=medium, red=slow)
pub fn timing_ms(value: f64) -> String {
    let text = format!("{:.1} ms", value);
    let tone = if value < 5.0 {
        Tone::Good
    } else if value < 100.0 {
        Tone::Warn
    } else {
        Tone::Bad
    };
    paint(tone, false, &text)
}

/// "OK" in green or "N failed" in red.
pub fn failures(n: usize) -> String {
    if n == 0 {
        paint(Tone::Good, true, "OK")
    } else {
        paint(Tone::Bad, true, &format!("{} failed", n))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
