//! Greyscale theme for terranaut
//! A high-contrast monochrome palette with green/red reserved for verdicts

use ratatui::style::{Color, Modifier, Style};

/// The greyscale color palette
pub struct Theme;

impl Theme {
    // ─────────────────────────────────────────────────────────────────────
    // Core greyscale palette - from brightest to darkest
    // ─────────────────────────────────────────────────────────────────────

    /// Pure white - maximum emphasis
    pub const WHITE: Color = Color::Rgb(255, 255, 255);

    /// Near white - headers, focused elements
    pub const GREY_50: Color = Color::Rgb(250, 250, 250);

    /// Bright grey - primary text
    pub const GREY_100: Color = Color::Rgb(220, 220, 220);

    /// Light grey - secondary text
    pub const GREY_200: Color = Color::Rgb(180, 180, 180);

    /// Medium grey - muted text
    pub const GREY_300: Color = Color::Rgb(140, 140, 140);

    /// Dark grey - subtle elements
    pub const GREY_400: Color = Color::Rgb(100, 100, 100);

    /// Darker grey - borders, separators
    pub const GREY_500: Color = Color::Rgb(70, 70, 70);

    /// Very dark grey - panel backgrounds
    pub const GREY_600: Color = Color::Rgb(45, 45, 45);

    /// Near black - main background
    pub const GREY_800: Color = Color::Rgb(28, 28, 28);

    /// True black - deepest background
    pub const GREY_900: Color = Color::Rgb(18, 18, 18);

    // ─────────────────────────────────────────────────────────────────────
    // Accent colors for verdicts and warnings
    // ─────────────────────────────────────────────────────────────────────

    /// Green for a passing verdict
    pub const GREEN: Color = Color::Rgb(100, 200, 100);

    /// Red for a failing verdict
    pub const RED: Color = Color::Rgb(200, 100, 100);

    /// Yellow for warnings (non-fenced output, stale tool path)
    pub const YELLOW: Color = Color::Rgb(210, 190, 100);

    // ─────────────────────────────────────────────────────────────────────
    // Pre-built styles for common UI elements
    // ─────────────────────────────────────────────────────────────────────

    /// Main background style
    pub fn bg() -> Style {
        Style::default().bg(Self::GREY_900)
    }

    /// Primary text style
    pub fn text() -> Style {
        Style::default().fg(Self::GREY_100)
    }

    /// Secondary/muted text
    pub fn text_muted() -> Style {
        Style::default().fg(Self::GREY_300)
    }

    /// Dimmed text for hints
    pub fn text_dim() -> Style {
        Style::default().fg(Self::GREY_400)
    }

    /// Bold emphasis
    pub fn bold() -> Style {
        Style::default()
            .fg(Self::GREY_50)
            .add_modifier(Modifier::BOLD)
    }

    /// Border style for unfocused panels
    pub fn border() -> Style {
        Style::default().fg(Self::GREY_500)
    }

    /// Border style for the focused panel
    pub fn border_focused() -> Style {
        Style::default().fg(Self::GREY_100)
    }

    /// Key-cap style for footer hints
    pub fn keycap() -> Style {
        Style::default().fg(Self::GREY_900).bg(Self::GREY_500)
    }
}
