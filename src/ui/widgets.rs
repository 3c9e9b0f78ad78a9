//! Custom widgets for the flashcard TUI.

use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{block::BorderType, Block, Borders, Clear, LineGauge, Paragraph, Widget, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::theme::{icons, Theme};
use crate::engine::stats;
use crate::models::{Answer, Badge, UserStats};

// ══════════════════════════════════════════════════════════════════════════
// Logo Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct Logo<'a> {
    theme: &'a Theme,
}

impl<'a> Logo<'a> {
    const ART: &'static str = r#"
    ╭──────────────────────────────────────────────╮
    │  ___ _               _       ___             │
    │ / __| |_ _ _ ___ __ _| |__  / __|__ _ _ _ __| │
    │ \__ \  _| '_/ -_) _` | / / | (__/ _` | '_/ _` │
    │ |___/\__|_| \___\__,_|_\_\  \___\__,_|_| \__,_│
    │                                              │
    │        know it  ·  keep the streak  🔥        │
    ╰──────────────────────────────────────────────╯"#;

    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }
}

impl Widget for Logo<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines: Vec<Line> = Self::ART
            .lines()
            .skip(1)
            .map(|line| Line::from(Span::styled(line, Style::default().fg(self.theme.colors.primary))))
            .collect();

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Stats Bar Widget
// ══════════════════════════════════════════════════════════════════════════

/// Points, streak, tokens and answers-so-far in one row.
pub struct StatsBar<'a> {
    stats: &'a UserStats,
    theme: &'a Theme,
}

impl<'a> StatsBar<'a> {
    pub fn new(stats: &'a UserStats, theme: &'a Theme) -> Self {
        Self { stats, theme }
    }

    fn cell(&self, icon: &'a str, label: &'a str, value: String, color: ratatui::style::Color) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("{} ", icon), Style::default().fg(color)),
            Span::styled(label, Style::default().fg(self.theme.colors.text_muted)),
            Span::styled(value, self.theme.stat_value(color)),
        ])
    }
}

impl Widget for StatsBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(area);
        let colors = &self.theme.colors;

        let cells = [
            self.cell(icons::STAR, "Points: ", self.stats.points.to_string(), colors.points),
            self.cell(icons::FIRE, "Streak: ", self.stats.streak.to_string(), colors.streak),
            self.cell(
                icons::SHIELD,
                "Tokens: ",
                format!(
                    "{} (+1 in {})",
                    self.stats.streak_saver_tokens,
                    stats::answers_until_token(self.stats)
                ),
                colors.token,
            ),
            self.cell(icons::CHECK, "Reviewed: ", self.stats.total_reviewed.to_string(), colors.text),
        ];

        for (cell, chunk) in cells.into_iter().zip(chunks.iter()) {
            Paragraph::new(cell)
                .alignment(Alignment::Center)
                .render(*chunk, buf);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Flashcard Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct FlashcardWidget<'a> {
    content: &'a str,
    category: &'a str,
    is_front: bool,
    theme: &'a Theme,
}

impl<'a> FlashcardWidget<'a> {
    pub fn new(content: &'a str, category: &'a str, is_front: bool, theme: &'a Theme) -> Self {
        Self {
            content,
            category,
            is_front,
            theme,
        }
    }
}

impl Widget for FlashcardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (label, label_style, border_color) = if self.is_front {
            ("QUESTION", self.theme.card_front(), self.theme.colors.accent)
        } else {
            ("ANSWER", self.theme.card_back(), self.theme.colors.success)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled(label, label_style),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center)
            .title_bottom(
                Line::from(Span::styled(
                    format!(" {} ", self.category),
                    Style::default().fg(self.theme.colors.text_muted),
                ))
                .right_aligned(),
            );

        let inner = block.inner(area);
        block.render(area, buf);

        let text_width = inner.width.saturating_sub(4);
        let content_height = wrapped_height(self.content, text_width);
        let vertical_padding = inner.height.saturating_sub(content_height) / 2;

        let content_area = Rect {
            x: inner.x + 2,
            y: inner.y + vertical_padding,
            width: text_width,
            height: inner.height.saturating_sub(vertical_padding),
        };

        Paragraph::new(self.content)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(self.theme.colors.text))
            .render(content_area, buf);
    }
}

/// Number of rows `text` takes when wrapped to `width` columns.
fn wrapped_height(text: &str, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    textwrap::wrap(text, width as usize).len() as u16
}

// ══════════════════════════════════════════════════════════════════════════
// Answer Buttons Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct AnswerButtons<'a> {
    enabled: bool,
    theme: &'a Theme,
}

impl<'a> AnswerButtons<'a> {
    pub fn new(enabled: bool, theme: &'a Theme) -> Self {
        Self { enabled, theme }
    }
}

impl Widget for AnswerButtons<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::horizontal([Constraint::Percentage(50); 2]).split(area);

        for (i, (answer, icon)) in [(Answer::Know, icons::CHECK), (Answer::DontKnow, icons::CROSS)]
            .into_iter()
            .enumerate()
        {
            let color = if self.enabled {
                answer.color_for_theme(self.theme)
            } else {
                self.theme.colors.text_dim
            };

            let button = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color));
            let inner = button.inner(chunks[i]);
            button.render(chunks[i], buf);

            let text = vec![
                Line::from(Span::styled(
                    format!("{} {}", icon, answer.name()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    if i == 0 { "1 / y" } else { "2 / n" },
                    Style::default().fg(self.theme.colors.text_muted),
                )),
            ];
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .render(inner, buf);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Timer Gauge Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct TimerGauge<'a> {
    remaining: Duration,
    total: Duration,
    warning: bool,
    theme: &'a Theme,
}

impl<'a> TimerGauge<'a> {
    pub fn new(remaining: Duration, total: Duration, warning: bool, theme: &'a Theme) -> Self {
        Self {
            remaining,
            total,
            warning,
            theme,
        }
    }
}

impl Widget for TimerGauge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let ratio = if self.total.is_zero() {
            0.0
        } else {
            (self.remaining.as_secs_f64() / self.total.as_secs_f64()).clamp(0.0, 1.0)
        };
        let style = self.theme.timer(self.warning);

        LineGauge::default()
            .label(Span::styled(
                format!("{} {:>2}s", icons::CLOCK, self.remaining.as_secs()),
                style.add_modifier(Modifier::BOLD),
            ))
            .filled_style(style)
            .unfilled_style(Style::default().fg(self.theme.colors.text_dim))
            .ratio(ratio)
            .render(area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Streak Saver Dialog
// ══════════════════════════════════════════════════════════════════════════

pub struct StreakSaverDialog<'a> {
    streak: u32,
    tokens: u32,
    theme: &'a Theme,
}

impl<'a> StreakSaverDialog<'a> {
    pub fn new(streak: u32, tokens: u32, theme: &'a Theme) -> Self {
        Self {
            streak,
            tokens,
            theme,
        }
    }
}

impl Widget for StreakSaverDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(self.theme.colors.streak))
            .style(Style::default().bg(self.theme.colors.bg_card))
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled(
                    format!("{} SAVE YOUR STREAK?", icons::SHIELD),
                    self.theme.stat_value(self.theme.colors.streak),
                ),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center);

        let inner = block.inner(area);
        block.render(area, buf);

        let muted = Style::default().fg(self.theme.colors.text_muted);
        let text = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("You are on a ", muted),
                Span::styled(
                    format!("{} {}-card streak", icons::FIRE, self.streak),
                    self.theme.stat_value(self.theme.colors.streak),
                ),
            ]),
            Line::from(vec![
                Span::styled("Spend 1 of your ", muted),
                Span::styled(self.tokens.to_string(), self.theme.stat_value(self.theme.colors.token)),
                Span::styled(" tokens to count this card as known?", muted),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Enter/y", self.theme.key_highlight()),
                Span::styled(" use token   ", self.theme.key_hint()),
                Span::styled("Esc/n", self.theme.key_highlight()),
                Span::styled(" let it go", self.theme.key_hint()),
            ]),
        ];

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Badge Shelf Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct BadgeShelf<'a> {
    badges: &'a [Badge],
    theme: &'a Theme,
}

impl<'a> BadgeShelf<'a> {
    pub fn new(badges: &'a [Badge], theme: &'a Theme) -> Self {
        Self { badges, theme }
    }
}

impl Widget for BadgeShelf<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let unlocked = self.badges.iter().filter(|b| b.is_unlocked).count();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.theme.colors.badge))
            .title(format!(" Badges {}/{} ", unlocked, self.badges.len()))
            .title_style(self.theme.stat_value(self.theme.colors.badge));
        let inner = block.inner(area);
        block.render(area, buf);

        let name_width = inner.width.saturating_sub(4) as usize / 3;
        let lines: Vec<Line> = self
            .badges
            .iter()
            .map(|badge| {
                let (icon, name_style) = if badge.is_unlocked {
                    (icons::badge(&badge.icon), self.theme.stat_value(self.theme.colors.badge))
                } else {
                    (icons::LOCK, Style::default().fg(self.theme.colors.text_dim))
                };
                Line::from(vec![
                    Span::raw(format!("{} ", icon)),
                    Span::styled(pad_to_width(&badge.name, name_width), name_style),
                    Span::styled(
                        format!(" {}", badge.unlock_condition),
                        Style::default().fg(self.theme.colors.text_muted),
                    ),
                ])
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Key Hints Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct KeyHints<'a> {
    hints: &'a [(&'a str, &'a str)],
    theme: &'a Theme,
}

impl<'a> KeyHints<'a> {
    pub fn new(hints: &'a [(&'a str, &'a str)], theme: &'a Theme) -> Self {
        Self { hints, theme }
    }
}

impl Widget for KeyHints<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let spans: Vec<Span> = self
            .hints
            .iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(*key, self.theme.key_highlight()),
                    Span::styled(format!(" {} ", desc), self.theme.key_hint()),
                    Span::styled("│ ", Style::default().fg(self.theme.colors.text_dim)),
                ]
            })
            .collect();

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Text Helpers
// ══════════════════════════════════════════════════════════════════════════

/// Cut `s` to at most `width` terminal columns, ending in `…` when shortened.
pub fn truncate_to_width(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Truncate or right-pad `s` to exactly `width` columns.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let mut out = truncate_to_width(s, width);
    let pad = width.saturating_sub(out.width());
    out.extend(std::iter::repeat(' ').take(pad));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_wide_chars() {
        assert_eq!(truncate_to_width("Geography", 20), "Geography");
        assert_eq!(truncate_to_width("Geography", 5), "Geog…");
        // Each CJK character is two columns wide.
        assert_eq!(truncate_to_width("日本語です", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn test_pad_to_width() {
        assert_eq!(pad_to_width("Math", 6), "Math  ");
        assert_eq!(pad_to_width("日本", 5).width(), 5);
    }

    #[test]
    fn test_wrapped_height() {
        assert_eq!(wrapped_height("What is the capital of France?", 10), 4);
        assert_eq!(wrapped_height("2 + 2", 40), 1);
        assert_eq!(wrapped_height("anything", 0), 0);
    }
}
