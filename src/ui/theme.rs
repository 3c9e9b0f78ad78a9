//! Theme and styling for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Color palette for a theme.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Brand Colors
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,

    // Semantic Colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    // Background Colors
    pub bg_dark: Color,
    pub bg_card: Color,
    pub bg_highlight: Color,

    // Text Colors
    pub text: Color,
    pub text_muted: Color,
    pub text_dim: Color,

    // Answer Colors
    pub know: Color,
    pub dont_know: Color,

    // Gamification
    pub points: Color,
    pub streak: Color,
    pub token: Color,
    pub badge: Color,
}

/// Available theme names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Default,
    KanagawaWave,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Default => "default",
            ThemeName::KanagawaWave => "kanagawa-wave",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeName::Default => "Default",
            ThemeName::KanagawaWave => "Kanagawa Wave",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "kanagawa-wave" | "kanagawa_wave" | "kanagawa" => ThemeName::KanagawaWave,
            _ => ThemeName::Default,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ThemeName::Default => ThemeName::KanagawaWave,
            ThemeName::KanagawaWave => ThemeName::Default,
        }
    }
}

/// Theme struct that holds colors and provides style methods.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    pub colors: ThemeColors,
}

impl Theme {
    pub fn new(name: ThemeName) -> Self {
        let colors = match name {
            ThemeName::Default => Self::default_colors(),
            ThemeName::KanagawaWave => Self::kanagawa_wave_colors(),
        };
        Self { name, colors }
    }

    pub fn from_name(name: &str) -> Self {
        Self::new(ThemeName::parse(name))
    }

    fn default_colors() -> ThemeColors {
        ThemeColors {
            primary: Color::Rgb(99, 102, 241),      // Indigo
            secondary: Color::Rgb(139, 92, 246),    // Violet
            accent: Color::Rgb(236, 72, 153),       // Pink

            success: Color::Rgb(34, 197, 94),       // Green
            warning: Color::Rgb(250, 204, 21),      // Yellow
            error: Color::Rgb(239, 68, 68),         // Red
            info: Color::Rgb(59, 130, 246),         // Blue

            bg_dark: Color::Rgb(15, 23, 42),        // Slate 900
            bg_card: Color::Rgb(30, 41, 59),        // Slate 800
            bg_highlight: Color::Rgb(71, 85, 105),  // Slate 600

            text: Color::Rgb(248, 250, 252),        // Slate 50
            text_muted: Color::Rgb(148, 163, 184),  // Slate 400
            text_dim: Color::Rgb(100, 116, 139),    // Slate 500

            know: Color::Rgb(34, 197, 94),          // Green
            dont_know: Color::Rgb(239, 68, 68),     // Red

            points: Color::Rgb(250, 204, 21),       // Yellow
            streak: Color::Rgb(249, 115, 22),       // Orange
            token: Color::Rgb(56, 189, 248),        // Sky
            badge: Color::Rgb(168, 85, 247),        // Purple
        }
    }

    /// Kanagawa Wave theme - inspired by the famous painting and kanagawa.nvim
    fn kanagawa_wave_colors() -> ThemeColors {
        ThemeColors {
            primary: Color::Rgb(0x7E, 0x9C, 0xD8),      // crystalBlue
            secondary: Color::Rgb(0x95, 0x7F, 0xB8),    // oniViolet
            accent: Color::Rgb(0xD2, 0x7E, 0x99),       // sakuraPink

            success: Color::Rgb(0x98, 0xBB, 0x6C),      // springGreen
            warning: Color::Rgb(0xFF, 0x9E, 0x3B),      // roninYellow
            error: Color::Rgb(0xE8, 0x24, 0x24),        // samuraiRed
            info: Color::Rgb(0x7F, 0xB4, 0xCA),         // springBlue

            bg_dark: Color::Rgb(0x16, 0x16, 0x1D),      // sumiInk0
            bg_card: Color::Rgb(0x1F, 0x1F, 0x28),      // sumiInk1
            bg_highlight: Color::Rgb(0x36, 0x36, 0x46), // sumiInk3

            text: Color::Rgb(0xDC, 0xD7, 0xBA),         // fujiWhite
            text_muted: Color::Rgb(0xC8, 0xC0, 0x93),   // oldWhite
            text_dim: Color::Rgb(0x54, 0x54, 0x6D),     // sumiInk4

            know: Color::Rgb(0x98, 0xBB, 0x6C),         // springGreen
            dont_know: Color::Rgb(0xE8, 0x24, 0x24),    // samuraiRed

            points: Color::Rgb(0xE6, 0xC3, 0x84),       // carpYellow
            streak: Color::Rgb(0xFF, 0xA0, 0x66),       // surimiOrange
            token: Color::Rgb(0x7F, 0xB4, 0xCA),        // springBlue
            badge: Color::Rgb(0x95, 0x7F, 0xB8),        // oniViolet
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Styles
    // ══════════════════════════════════════════════════════════════════════

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.colors.text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn subtitle(&self) -> Style {
        Style::default().fg(self.colors.text_muted)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.colors.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.colors.bg_highlight)
            .fg(self.colors.text)
    }

    pub fn card_front(&self) -> Style {
        Style::default()
            .fg(self.colors.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn card_back(&self) -> Style {
        Style::default()
            .fg(self.colors.success)
            .add_modifier(Modifier::BOLD)
    }

    pub fn stat_value(&self, color: Color) -> Style {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Countdown gauge color, urgent in the last seconds.
    pub fn timer(&self, warning: bool) -> Style {
        let color = if warning {
            self.colors.error
        } else {
            self.colors.info
        };
        Style::default().fg(color).bg(self.colors.bg_card)
    }

    pub fn key_hint(&self) -> Style {
        Style::default().fg(self.colors.text_dim)
    }

    pub fn key_highlight(&self) -> Style {
        Style::default()
            .fg(self.colors.accent)
            .add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeName::Default)
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Icons
// ══════════════════════════════════════════════════════════════════════════

pub mod icons {
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const STAR: &str = "★";
    pub const FIRE: &str = "🔥";
    pub const SHIELD: &str = "🛡";
    pub const CLOCK: &str = "⏱";
    pub const LOCK: &str = "🔒";

    /// Glyph for a badge's stored icon name.
    pub fn badge(name: &str) -> &'static str {
        match name {
            "award" => "🏅",
            "star" => "⭐",
            "trophy" => "🏆",
            "zap" => "⚡",
            "brain" => "🧠",
            _ => STAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_names_cycle() {
        assert_eq!(ThemeName::parse("Kanagawa"), ThemeName::KanagawaWave);
        assert_eq!(ThemeName::parse("nope"), ThemeName::Default);
        let name = ThemeName::Default.next();
        assert_eq!(Theme::from_name(name.as_str()).name, name);
        assert_eq!(name.next(), ThemeName::Default);
    }

    #[test]
    fn test_badge_icons() {
        assert_eq!(icons::badge("trophy"), "🏆");
        assert_eq!(icons::badge("unknown"), icons::STAR);
    }
}
