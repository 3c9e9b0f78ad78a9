//! Main application state and logic.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::BorderType, Bar, BarChart, BarGroup, Block, Borders, Clear, List, ListItem,
        ListState, Paragraph,
    },
    Frame,
};

use super::theme::{icons, Theme};
use super::widgets::{
    truncate_to_width, AnswerButtons, BadgeShelf, FlashcardWidget, KeyHints, Logo, StatsBar,
    StreakSaverDialog, TimerGauge,
};
use crate::catalog;
use crate::config::Config;
use crate::engine::{stats, CategoryFilter, Moment, ReviewEngine, SessionPhase, SessionSignal};
use crate::models::{Answer, AppSettings, Flashcard};
use crate::storage::{JsonFileStore, SessionStore};

/// Countdown lengths the settings screen cycles through.
const TIMER_CHOICES: [u32; 4] = [10, 20, 30, 60];

/// How long a status message stays on screen.
const STATUS_SECS: u64 = 4;

// ══════════════════════════════════════════════════════════════════════════
// Application State
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    CategorySelect,
    Study,
    AddCard,
    Stats,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AddCardField {
    Question,
    Answer,
    Category,
}

impl AddCardField {
    fn next(self) -> Self {
        match self {
            Self::Question => Self::Answer,
            Self::Answer => Self::Category,
            Self::Category => Self::Question,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SettingsItem {
    Timer,
    TimerDuration,
    SoundEffects,
    Theme,
    ExportBackup,
}

const SETTINGS_ITEMS: [SettingsItem; 5] = [
    SettingsItem::Timer,
    SettingsItem::TimerDuration,
    SettingsItem::SoundEffects,
    SettingsItem::Theme,
    SettingsItem::ExportBackup,
];

pub struct App {
    pub screen: Screen,
    pub running: bool,

    // Config and theme
    pub config: Config,
    pub theme: Theme,

    pub engine: ReviewEngine<JsonFileStore>,

    // Category selection
    category_list_state: ListState,

    // Study state
    showing_answer: bool,
    shown_card: Option<String>,
    answered_this_run: u32,

    // Add card state
    add_card_question: String,
    add_card_answer: String,
    add_card_category: usize,
    add_card_focus: AddCardField,
    add_card_return: Screen,

    settings_list_state: ListState,

    // Status message (shown temporarily)
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(store: SessionStore<JsonFileStore>, filter: CategoryFilter, config: Config) -> Self {
        let theme = Theme::from_name(&config.theme);
        let engine = ReviewEngine::open(store, filter);

        let selected = match engine.session().filter() {
            CategoryFilter::All => 0,
            CategoryFilter::Category(id) => engine
                .categories()
                .iter()
                .position(|c| &c.id == id)
                .map_or(0, |i| i + 1),
        };

        Self {
            screen: Screen::CategorySelect,
            running: true,
            config,
            theme,
            engine,
            category_list_state: ListState::default().with_selected(Some(selected)),
            showing_answer: false,
            shown_card: None,
            answered_this_run: 0,
            add_card_question: String::new(),
            add_card_answer: String::new(),
            add_card_category: 0,
            add_card_focus: AddCardField::Question,
            add_card_return: Screen::CategorySelect,
            settings_list_state: ListState::default().with_selected(Some(0)),
            status_message: None,
        }
    }

    pub fn cycle_theme(&mut self) {
        let new_theme_name = self.theme.name.next();
        self.theme = Theme::new(new_theme_name);
        self.config.theme = new_theme_name.as_str().to_string();
        if let Err(e) = self.config.save() {
            tracing::warn!(error = %e, "failed to save config");
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    fn selected_filter(&self) -> CategoryFilter {
        match self.category_list_state.selected() {
            Some(i) if i > 0 => self
                .engine
                .categories()
                .get(i - 1)
                .map_or(CategoryFilter::All, |c| CategoryFilter::Category(c.id.clone())),
            _ => CategoryFilter::All,
        }
    }

    fn filter_label(&self, filter: &CategoryFilter) -> String {
        match filter {
            CategoryFilter::All => "All Categories".to_string(),
            CategoryFilter::Category(id) => catalog::category_name(self.engine.categories(), id),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Study
    // ══════════════════════════════════════════════════════════════════════

    pub fn start_study(&mut self) {
        let filter = self.selected_filter();
        if &filter != self.engine.session().filter() {
            self.engine.set_filter(filter, Moment::now());
        }
        self.screen = Screen::Study;
    }

    fn leave_study(&mut self, to: Screen) {
        self.engine.pause();
        self.screen = to;
    }

    /// Drive the countdown; called once per frame.
    pub fn tick(&mut self) {
        if self.screen != Screen::Study {
            return;
        }
        let before = self.engine.stats().total_reviewed;
        let was_pending = self.engine.pending().is_some();

        let signals = self.engine.tick(Moment::now());

        let offered = !was_pending && self.engine.pending().is_some();
        if self.count_answer(before) || offered {
            self.set_status(format!("{} Time's up!", icons::CLOCK));
        }
        self.handle_signals(signals);
        self.sync_shown_card();
    }

    fn answer(&mut self, answer: Answer) {
        let at = Moment::now();
        let before = self.engine.stats().total_reviewed;
        let signals = match answer {
            Answer::Know => self.engine.know(at),
            Answer::DontKnow => self.engine.dont_know(at),
        };
        self.count_answer(before);
        self.handle_signals(signals);
        self.sync_shown_card();
    }

    fn confirm_streak_saver(&mut self) {
        let before = self.engine.stats().total_reviewed;
        let signals = self.engine.confirm_streak_saver(Moment::now());
        if !self.count_answer(before) {
            self.set_status("No streak saver tokens left".to_string());
        }
        self.handle_signals(signals);
        self.sync_shown_card();
    }

    fn cancel_streak_saver(&mut self) {
        let before = self.engine.stats().total_reviewed;
        let signals = self.engine.cancel_streak_saver(Moment::now());
        self.count_answer(before);
        self.handle_signals(signals);
        self.sync_shown_card();
    }

    /// Bump the per-run counter if an answer was recorded since `before`.
    fn count_answer(&mut self, before: u32) -> bool {
        let recorded = self.engine.stats().total_reviewed > before;
        if recorded {
            self.answered_this_run += 1;
        }
        recorded
    }

    /// A new card always starts on its question side.
    fn sync_shown_card(&mut self) {
        let current = self.engine.current_card().map(|c| c.id.clone());
        if current != self.shown_card {
            self.shown_card = current;
            self.showing_answer = false;
        }
    }

    fn handle_signals(&mut self, signals: Vec<SessionSignal>) {
        let mut messages = Vec::new();
        let mut ring = false;

        for signal in signals {
            match signal {
                SessionSignal::TokenEarned { tokens } => {
                    messages.push(format!("{} Streak saver earned ({} held)", icons::SHIELD, tokens));
                }
                SessionSignal::BadgeUnlocked(kind) => {
                    let name = self
                        .engine
                        .stats()
                        .badge(kind)
                        .map_or_else(|| format!("{:?}", kind), |b| format!("{} {}", icons::badge(&b.icon), b.name));
                    messages.push(format!("{} Badge unlocked: {}", icons::STAR, name));
                    ring = true;
                }
                SessionSignal::CompletionBonus { points } => {
                    messages.push(format!("Deck complete! +{} bonus", points));
                }
                SessionSignal::DeckCompleted { completed_decks } => {
                    tracing::debug!(completed_decks, "starting next deck");
                }
                SessionSignal::StreakSaverOffered { .. } => {}
                SessionSignal::StreakSaved { tokens_left } => {
                    messages.push(format!("{} Streak saved ({} tokens left)", icons::FIRE, tokens_left));
                }
            }
        }

        if ring && self.engine.settings().sound_effects {
            ring_bell();
        }
        if !messages.is_empty() {
            self.set_status(messages.join("  ·  "));
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Add Card
    // ══════════════════════════════════════════════════════════════════════

    fn open_add_card(&mut self) {
        if self.screen == Screen::Study {
            self.engine.pause();
        }
        self.add_card_return = self.screen;
        self.add_card_category = match self.engine.session().filter() {
            CategoryFilter::Category(id) => self
                .engine
                .categories()
                .iter()
                .position(|c| &c.id == id)
                .unwrap_or(0),
            CategoryFilter::All => 0,
        };
        self.add_card_focus = AddCardField::Question;
        self.screen = Screen::AddCard;
    }

    fn add_card(&mut self) {
        let question = self.add_card_question.trim();
        let answer = self.add_card_answer.trim();
        if question.is_empty() || answer.is_empty() {
            self.set_status("Question and answer are both required".to_string());
            return;
        }
        let Some(category) = self.engine.categories().get(self.add_card_category) else {
            return;
        };

        let card = Flashcard::custom(question.to_string(), answer.to_string(), category.id.clone());
        let name = category.name.clone();
        self.engine.add_custom_card(card, Moment::now());
        self.sync_shown_card();

        self.add_card_question.clear();
        self.add_card_answer.clear();
        self.add_card_focus = AddCardField::Question;
        self.set_status(format!("{} Card added to {}", icons::CHECK, name));
    }

    fn cycle_add_card_category(&mut self, forward: bool) {
        let count = self.engine.categories().len();
        if count == 0 {
            return;
        }
        self.add_card_category = if forward {
            (self.add_card_category + 1) % count
        } else {
            (self.add_card_category + count - 1) % count
        };
    }

    // ══════════════════════════════════════════════════════════════════════
    // Settings
    // ══════════════════════════════════════════════════════════════════════

    fn activate_setting(&mut self) {
        let Some(item) = self
            .settings_list_state
            .selected()
            .and_then(|i| SETTINGS_ITEMS.get(i).copied())
        else {
            return;
        };

        let mut settings = self.engine.settings().clone();
        match item {
            SettingsItem::Timer => settings.timer_enabled = !settings.timer_enabled,
            SettingsItem::TimerDuration => {
                settings.timer_duration_secs = next_timer_choice(settings.timer_duration_secs);
            }
            SettingsItem::SoundEffects => settings.sound_effects = !settings.sound_effects,
            SettingsItem::Theme => {
                self.cycle_theme();
                return;
            }
            SettingsItem::ExportBackup => {
                self.export_backup();
                return;
            }
        }
        self.engine.update_settings(settings, Moment::now());
        // Countdown restarts when the study screen is shown again.
        self.engine.pause();
        tracing::debug!(setting = ?item, "setting changed");
    }

    pub fn export_backup(&mut self) {
        let path = SessionStore::<JsonFileStore>::default_backup_path();
        match self.engine.store().export_backup(&path) {
            Ok(count) => {
                self.set_status(format!("Exported {} entries to {}", count, path.display()));
            }
            Err(e) => {
                self.set_status(format!("Export failed: {}", e));
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Event Handling
    // ══════════════════════════════════════════════════════════════════════

    pub fn handle_events(&mut self) -> anyhow::Result<()> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(());
                }

                match self.screen {
                    Screen::CategorySelect => self.handle_category_keys(key.code),
                    Screen::Study => self.handle_study_keys(key.code),
                    Screen::AddCard => self.handle_add_card_keys(key.code),
                    Screen::Stats => self.handle_stats_keys(key.code),
                    Screen::Settings => self.handle_settings_keys(key.code),
                }
            }
        }
        Ok(())
    }

    fn handle_category_keys(&mut self, key: KeyCode) {
        let len = self.engine.categories().len() + 1;
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Up | KeyCode::Char('k') => {
                let i = self.category_list_state.selected().unwrap_or(0);
                self.category_list_state
                    .select(Some(if i == 0 { len - 1 } else { i - 1 }));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let i = self.category_list_state.selected().unwrap_or(0);
                self.category_list_state
                    .select(Some(if i + 1 >= len { 0 } else { i + 1 }));
            }
            KeyCode::Enter => self.start_study(),
            KeyCode::Char('a') => self.open_add_card(),
            KeyCode::Char('s') => self.screen = Screen::Stats,
            KeyCode::Char('o') => self.screen = Screen::Settings,
            KeyCode::Char('x') => self.export_backup(),
            _ => {}
        }
    }

    fn handle_study_keys(&mut self, key: KeyCode) {
        if self.engine.pending().is_some() {
            match key {
                KeyCode::Enter | KeyCode::Char('y') => self.confirm_streak_saver(),
                KeyCode::Esc | KeyCode::Char('n') => self.cancel_streak_saver(),
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.leave_study(Screen::CategorySelect),
            KeyCode::Char(' ') => self.showing_answer = !self.showing_answer,
            KeyCode::Char('a') => self.open_add_card(),
            KeyCode::Char('s') => self.leave_study(Screen::Stats),
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Char(c) => {
                if let Some(answer) = Answer::from_key(c) {
                    self.answer(answer);
                }
            }
            _ => {}
        }
    }

    fn handle_add_card_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.screen = self.add_card_return,
            KeyCode::Tab => self.add_card_focus = self.add_card_focus.next(),
            KeyCode::Enter => match self.add_card_focus {
                AddCardField::Category => self.add_card(),
                field => self.add_card_focus = field.next(),
            },
            KeyCode::Left if self.add_card_focus == AddCardField::Category => {
                self.cycle_add_card_category(false);
            }
            KeyCode::Right if self.add_card_focus == AddCardField::Category => {
                self.cycle_add_card_category(true);
            }
            KeyCode::Char(c) => match self.add_card_focus {
                AddCardField::Question => self.add_card_question.push(c),
                AddCardField::Answer => self.add_card_answer.push(c),
                AddCardField::Category => {}
            },
            KeyCode::Backspace => match self.add_card_focus {
                AddCardField::Question => {
                    self.add_card_question.pop();
                }
                AddCardField::Answer => {
                    self.add_card_answer.pop();
                }
                AddCardField::Category => {}
            },
            _ => {}
        }
    }

    fn handle_stats_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::CategorySelect,
            KeyCode::Char('t') => self.cycle_theme(),
            _ => {}
        }
    }

    fn handle_settings_keys(&mut self, key: KeyCode) {
        let len = SETTINGS_ITEMS.len();
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::CategorySelect,
            KeyCode::Up | KeyCode::Char('k') => {
                let i = self.settings_list_state.selected().unwrap_or(0);
                self.settings_list_state
                    .select(Some(if i == 0 { len - 1 } else { i - 1 }));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let i = self.settings_list_state.selected().unwrap_or(0);
                self.settings_list_state
                    .select(Some(if i + 1 >= len { 0 } else { i + 1 }));
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_setting(),
            _ => {}
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Rendering
    // ══════════════════════════════════════════════════════════════════════

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.colors.bg_dark)),
            area,
        );

        match self.screen {
            Screen::CategorySelect => self.render_category_select(frame, area),
            Screen::Study => self.render_study(frame, area),
            Screen::AddCard => self.render_add_card(frame, area),
            Screen::Stats => self.render_stats(frame, area),
            Screen::Settings => self.render_settings(frame, area),
        }
    }

    /// Show the status message, if recent, on the row just above `hints`.
    fn render_status(&self, frame: &mut Frame, hints: Rect) {
        let Some((ref msg, time)) = self.status_message else {
            return;
        };
        if time.elapsed().as_secs() >= STATUS_SECS {
            return;
        }

        let status = Paragraph::new(truncate_to_width(msg, hints.width as usize))
            .alignment(Alignment::Center)
            .style(Style::default().fg(self.theme.colors.success));
        let status_area = Rect {
            y: hints.y.saturating_sub(1),
            height: 1,
            ..hints
        };
        frame.render_widget(status, status_area);
    }

    fn render_category_select(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(2), // Top padding
            Constraint::Length(7), // Logo
            Constraint::Length(1), // Stats
            Constraint::Length(1), // Spacing
            Constraint::Min(5),    // Category list
            Constraint::Length(3), // Help
        ])
        .split(area);

        frame.render_widget(Logo::new(&self.theme), chunks[1]);
        frame.render_widget(StatsBar::new(self.engine.stats(), &self.theme), chunks[2]);

        let list_area = centered_rect(60, 100, chunks[4]);
        let name_width = list_area.width.saturating_sub(16) as usize;
        let cards = self.engine.cards();
        let queue = self.engine.queue();

        let row = |name: &str, total: usize, queued: usize| {
            let mut spans = vec![
                Span::styled(
                    truncate_to_width(name, name_width),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" ({} cards)", total),
                    Style::default().fg(self.theme.colors.text_muted),
                ),
            ];
            if queued > 0 {
                spans.push(Span::styled(
                    format!(" {} to review", queued),
                    Style::default().fg(self.theme.colors.warning),
                ));
            }
            ListItem::new(Line::from(spans))
        };

        let mut items = vec![row("All Categories", cards.len(), queue.len())];
        for category in self.engine.categories() {
            let total = cards.iter().filter(|c| c.category == category.id).count();
            let queued = queue
                .iter()
                .filter(|id| cards.iter().any(|c| c.id == *id && c.category == category.id))
                .count();
            items.push(row(&category.name, total, queued));
        }

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.colors.primary))
                    .title(" Categories ")
                    .title_style(self.theme.highlight()),
            )
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, list_area, &mut self.category_list_state);

        let theme_hint = format!("[{}]", self.theme.name.display_name());
        let hints_data: [(&str, &str); 8] = [
            ("j/k", "nav"),
            ("Enter", "study"),
            ("a", "add card"),
            ("s", "stats"),
            ("o", "settings"),
            ("x", "export"),
            ("t", &theme_hint),
            ("q", "quit"),
        ];
        frame.render_widget(KeyHints::new(&hints_data, &self.theme), chunks[5]);
        self.render_status(frame, chunks[5]);
    }

    fn render_study(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Stats
            Constraint::Length(1), // Timer
            Constraint::Min(10),   // Card
            Constraint::Length(1), // Separator
            Constraint::Length(4), // Buttons
            Constraint::Length(2), // Hints
        ])
        .split(area);

        let session = self.engine.session();
        let label = self.filter_label(session.filter());
        let progress = match session.phase() {
            SessionPhase::Active => format!("  Card {} of {}", session.cursor() + 1, session.deck().len()),
            SessionPhase::Empty => String::new(),
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(label, self.theme.title()),
            Span::styled(progress, self.theme.subtitle()),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(header, chunks[0]);

        frame.render_widget(StatsBar::new(self.engine.stats(), &self.theme), chunks[1]);

        let now = Instant::now();
        if self.engine.settings().timer_enabled {
            if let Some(remaining) = self.engine.timer().remaining(now) {
                let total = self.engine.settings().timer_duration();
                let warning = self.engine.timer().is_warning(now);
                frame.render_widget(
                    TimerGauge::new(remaining, total, warning, &self.theme),
                    centered_rect(60, 100, chunks[2]),
                );
            }
        }

        let card_area = centered_rect(80, 100, chunks[3]);
        match self.engine.current_card() {
            Some(card) => {
                let category = catalog::category_name(self.engine.categories(), &card.category);
                let content = if self.showing_answer {
                    &card.answer
                } else {
                    &card.question
                };
                frame.render_widget(
                    FlashcardWidget::new(content, &category, !self.showing_answer, &self.theme),
                    card_area,
                );
            }
            None => {
                let empty = Paragraph::new(vec![
                    Line::from(""),
                    Line::from(Span::styled("No cards in this category yet.", self.theme.title())),
                    Line::from(Span::styled("Press a to add one.", self.theme.subtitle())),
                ])
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(Style::default().fg(self.theme.colors.text_dim)),
                );
                frame.render_widget(empty, card_area);
            }
        }

        let pending = self.engine.pending().is_some();
        let can_answer = !pending && self.engine.current_card().is_some();
        frame.render_widget(
            AnswerButtons::new(can_answer, &self.theme),
            centered_rect(60, 100, chunks[5]),
        );

        let answered = format!("{} answered", self.answered_this_run);
        let hints_data: [(&str, &str); 6] = [
            ("Space", if self.showing_answer { "question" } else { "answer" }),
            ("1/2", "know / don't"),
            ("a", "add"),
            ("s", "stats"),
            ("Esc", "back"),
            ("·", &answered),
        ];
        frame.render_widget(KeyHints::new(&hints_data, &self.theme), chunks[6]);
        self.render_status(frame, chunks[6]);

        if pending {
            let stats = self.engine.stats();
            frame.render_widget(
                StreakSaverDialog::new(stats.streak, stats.streak_saver_tokens, &self.theme),
                centered_rect(60, 40, area),
            );
        }
    }

    fn render_add_card(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3), // Title
            Constraint::Length(1), // Spacing
            Constraint::Length(5), // Question
            Constraint::Length(1), // Spacing
            Constraint::Length(5), // Answer
            Constraint::Length(1), // Spacing
            Constraint::Length(3), // Category
            Constraint::Min(1),    // Spacer
            Constraint::Length(2), // Hints
        ])
        .split(centered_rect(60, 100, area));

        let title = Paragraph::new("Add Card")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let field_style = |field: AddCardField| {
            if self.add_card_focus == field {
                Style::default().fg(self.theme.colors.accent)
            } else {
                Style::default().fg(self.theme.colors.text_muted)
            }
        };
        let input = |text: &str, title: &'static str, field: AddCardField| {
            Paragraph::new(text.to_string())
                .wrap(ratatui::widgets::Wrap { trim: false })
                .style(Style::default().fg(self.theme.colors.text))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(field_style(field))
                        .title(title)
                        .title_style(field_style(field)),
                )
        };

        frame.render_widget(
            input(&self.add_card_question, " Question ", AddCardField::Question),
            chunks[2],
        );
        frame.render_widget(
            input(&self.add_card_answer, " Answer ", AddCardField::Answer),
            chunks[4],
        );

        let category = self
            .engine
            .categories()
            .get(self.add_card_category)
            .map_or("-", |c| c.name.as_str());
        let picker = Paragraph::new(Line::from(vec![
            Span::styled("← ", self.theme.key_hint()),
            Span::styled(category, self.theme.highlight()),
            Span::styled(" →", self.theme.key_hint()),
        ]))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(field_style(AddCardField::Category))
                .title(" Category ")
                .title_style(field_style(AddCardField::Category)),
        );
        frame.render_widget(picker, chunks[6]);

        let hints = KeyHints::new(
            &[
                ("Tab", "next field"),
                ("←/→", "category"),
                ("Enter", "next / add"),
                ("Esc", "done"),
            ],
            &self.theme,
        );
        frame.render_widget(hints, chunks[8]);
        self.render_status(frame, chunks[8]);
    }

    fn render_stats(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3), // Title
            Constraint::Min(10),   // Content
            Constraint::Length(2), // Hints
        ])
        .split(area);

        let title = Paragraph::new("Stats")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let content = centered_rect(90, 100, chunks[1]);
        let columns = Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(content);
        let left = Layout::vertical([Constraint::Length(11), Constraint::Min(7)]).split(columns[0]);
        let right = Layout::vertical([Constraint::Min(8), Constraint::Length(7)]).split(columns[1]);

        let user = self.engine.stats();
        let colors = &self.theme.colors;
        let label = |text: &'static str| Span::styled(text, Style::default().fg(colors.text_muted));
        let value = |text: String, color| Span::styled(text, self.theme.stat_value(color));

        let overview_lines = vec![
            Line::from(vec![label("Points:          "), value(user.points.to_string(), colors.points)]),
            Line::from(vec![label("Current streak:  "), value(user.streak.to_string(), colors.streak)]),
            Line::from(vec![
                label("Streak savers:   "),
                value(user.streak_saver_tokens.to_string(), colors.token),
            ]),
            Line::from(""),
            Line::from(vec![
                label("Reviewed:        "),
                value(user.total_reviewed.to_string(), colors.primary),
            ]),
            Line::from(vec![
                label("Known / not:     "),
                value(user.known_count.to_string(), colors.know),
                Span::styled(" / ", Style::default().fg(colors.text_dim)),
                value(user.not_known_count.to_string(), colors.dont_know),
            ]),
            Line::from(vec![
                label("Success rate:    "),
                value(format!("{}%", stats::success_rate(user)), colors.success),
            ]),
            Line::from(vec![
                label("Avg. time:       "),
                value(format!("{}s", stats::average_review_time(self.engine.log())), colors.info),
            ]),
            Line::from(vec![
                label("Decks finished:  "),
                value(user.completed_decks.to_string(), colors.secondary),
            ]),
        ];
        let overview = Paragraph::new(overview_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(colors.primary))
                .title(" Overview ")
                .title_style(self.theme.highlight()),
        );
        frame.render_widget(overview, left[0]);

        let breakdown = stats::category_breakdown(
            self.engine.log(),
            self.engine.cards(),
            self.engine.categories(),
        );
        let breakdown_lines: Vec<Line> = breakdown
            .iter()
            .map(|row| {
                Line::from(vec![
                    Span::styled(format!("{:<12}", row.name), Style::default().fg(colors.text)),
                    value(format!("{:>4}", row.known), colors.know),
                    Span::styled(" / ", Style::default().fg(colors.text_dim)),
                    value(format!("{:<4}", row.not_known), colors.dont_know),
                ])
            })
            .collect();
        let breakdown_block = Paragraph::new(breakdown_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(colors.accent))
                .title(" By Category ")
                .title_style(Style::default().fg(colors.accent)),
        );
        frame.render_widget(breakdown_block, left[1]);

        let today = chrono::Local::now().date_naive();
        let bars: Vec<Bar> = stats::recent_history(user, today, 7)
            .iter()
            .map(|day| {
                Bar::default()
                    .value(day.total() as u64)
                    .label(Line::from(day.date.format("%a").to_string()))
                    .text_value(format!("{}", day.total()))
                    .style(Style::default().fg(colors.primary))
                    .value_style(Style::default().fg(colors.text).bg(colors.primary))
            })
            .collect();
        let chart = BarChart::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(colors.info))
                    .title(" Last 7 Days ")
                    .title_style(Style::default().fg(colors.info)),
            )
            .data(BarGroup::default().bars(&bars))
            .bar_width(5)
            .bar_gap(2);
        frame.render_widget(chart, right[0]);

        frame.render_widget(BadgeShelf::new(&user.badges, &self.theme), right[1]);

        let hints = KeyHints::new(&[("t", "theme"), ("Esc", "back")], &self.theme);
        frame.render_widget(hints, chunks[2]);
    }

    fn render_settings(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3), // Title
            Constraint::Length(1), // Spacing
            Constraint::Length(SETTINGS_ITEMS.len() as u16 + 2),
            Constraint::Min(1),    // Spacer
            Constraint::Length(2), // Hints
        ])
        .split(area);

        let title = Paragraph::new("Settings")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let settings = self.engine.settings();
        let items: Vec<ListItem> = SETTINGS_ITEMS
            .iter()
            .map(|item| {
                let (name, value) = setting_row(item, settings, &self.theme);
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<20}", name), Style::default().fg(self.theme.colors.text)),
                    Span::styled(value, self.theme.highlight()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.colors.primary)),
            )
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");
        frame.render_stateful_widget(
            list,
            centered_rect(50, 100, chunks[2]),
            &mut self.settings_list_state,
        );

        let hints = KeyHints::new(
            &[("j/k", "nav"), ("Enter", "change"), ("Esc", "back")],
            &self.theme,
        );
        frame.render_widget(hints, chunks[4]);
        self.render_status(frame, chunks[4]);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helper Functions
// ══════════════════════════════════════════════════════════════════════════

fn ring_bell() {
    use std::io::Write;
    let mut out = io::stdout();
    let _ = out.write_all(b"\x07").and_then(|_| out.flush());
}

fn next_timer_choice(current: u32) -> u32 {
    TIMER_CHOICES
        .iter()
        .copied()
        .find(|&secs| secs > current)
        .unwrap_or(TIMER_CHOICES[0])
}

fn setting_row(item: &SettingsItem, settings: &AppSettings, theme: &Theme) -> (&'static str, String) {
    let on_off = |on: bool| if on { "On" } else { "Off" }.to_string();
    match item {
        SettingsItem::Timer => ("Answer timer", on_off(settings.timer_enabled)),
        SettingsItem::TimerDuration => ("Seconds per card", settings.timer_duration_secs.to_string()),
        SettingsItem::SoundEffects => ("Sound effects", on_off(settings.sound_effects)),
        SettingsItem::Theme => ("Theme", theme.name.display_name().to_string()),
        SettingsItem::ExportBackup => ("Export backup", "Enter".to_string()),
    }
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_choices_wrap() {
        assert_eq!(next_timer_choice(10), 20);
        assert_eq!(next_timer_choice(20), 30);
        assert_eq!(next_timer_choice(60), 10);
        assert_eq!(next_timer_choice(45), 60);
    }

    #[test]
    fn test_add_card_focus_cycles() {
        let field = AddCardField::Question.next().next();
        assert_eq!(field, AddCardField::Category);
        assert_eq!(field.next(), AddCardField::Question);
    }

    #[test]
    fn test_centered_rect_is_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(60, 50, outer);
        assert_eq!(inner.width, 60);
        assert_eq!(inner.height, 20);
        assert_eq!(inner.x, 20);
    }
}
