//! TUI application state and event loop
//!
//! Each user action (generate, validate, correct) runs to completion before
//! the interface accepts the next key: there is no background queue. The
//! only suspension points are the model client's backoff sleeps and the
//! child-process waits inside validation.

use crate::config::Config;
use crate::provider::CloudProvider;
use crate::session::{ActionReport, DraftOrigin, Session};
use crate::toolchain;
use crate::ui;
use crate::util::CancelFlag;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Input mode: plain keys are commands in Normal, text in the edit modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    EditRequest,
    EditDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
}

/// A minimal editable text buffer with a char-indexed cursor.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.chars().count();
    }

    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index();
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.text.remove(at);
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Text for rendering; a cursor marker is spliced in while editing.
    pub fn display(&self, editing: bool) -> String {
        if !editing {
            return self.text.clone();
        }
        let at = self.byte_index();
        let mut out = String::with_capacity(self.text.len() + 3);
        out.push_str(&self.text[..at]);
        out.push('▌');
        out.push_str(&self.text[at..]);
        out
    }
}

/// An action the event loop should run after key handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Generate,
    Validate,
    Correct,
}

pub struct App {
    pub config: Config,
    pub session: Session,
    pub api_key: Option<String>,
    pub mode: Mode,
    pub request_input: TextBuffer,
    pub editor: TextBuffer,
    pub status: Option<StatusLine>,
    pub busy: Option<&'static str>,
    pub tool_notice_shown: bool,
    pub should_quit: bool,
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub cancel: CancelFlag,
}

impl App {
    pub fn new(config: Config, provider: CloudProvider, api_key: Option<String>) -> Self {
        let session = Session::new(provider);
        let request_input = TextBuffer::new(session.request.clone());
        let editor = TextBuffer::new(session.draft.content.clone());
        let workdir = config.validate_workdir();
        let timeout = Duration::from_secs(config.validate_timeout_secs);
        Self {
            config,
            session,
            api_key,
            mode: Mode::Normal,
            request_input,
            editor,
            status: None,
            busy: None,
            tool_notice_shown: false,
            should_quit: false,
            workdir,
            timeout,
            cancel: CancelFlag::new(),
        }
    }

    fn set_status(&mut self, text: impl Into<String>, tone: Tone) {
        self.status = Some(StatusLine {
            text: text.into(),
            tone,
        });
    }

    /// Mirror the session draft into the editor buffer after a replacement.
    fn sync_editor(&mut self) {
        self.editor.set_text(self.session.draft.content.clone());
    }

    fn apply_report(&mut self, report: ActionReport) {
        match report {
            ActionReport::DraftReplaced { origin, warning } => {
                self.sync_editor();
                match warning {
                    Some(text) => self.set_status(text, Tone::Warning),
                    None => match origin {
                        DraftOrigin::Corrected => self.set_status(
                            "The model attempted a correction. Validate again.",
                            Tone::Success,
                        ),
                        _ => self.set_status("Draft ready. Review and validate.", Tone::Success),
                    },
                }
            }
            ActionReport::Validated { succeeded } => {
                if succeeded {
                    self.set_status("Validation successful.", Tone::Success);
                } else {
                    self.set_status(
                        "Validation failed. Press c to request a correction.",
                        Tone::Error,
                    );
                }
            }
            ActionReport::Failed(message) => {
                self.sync_editor();
                self.set_status(message, Tone::Error);
            }
        }
    }

    /// Route one key press. Returns an action for the event loop to run.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<PendingAction> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::EditRequest => {
                self.handle_request_key(key);
                None
            }
            Mode::EditDraft => {
                self.handle_draft_key(key);
                None
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<PendingAction> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('g') => Some(PendingAction::Generate),
            KeyCode::Char('v') => Some(PendingAction::Validate),
            KeyCode::Char('c') => Some(PendingAction::Correct),
            KeyCode::Char('i') => {
                self.mode = Mode::EditRequest;
                None
            }
            KeyCode::Char('e') => {
                if self.session.draft.is_placeholder() {
                    self.editor.set_text("");
                }
                self.mode = Mode::EditDraft;
                None
            }
            KeyCode::Char('p') => {
                let next = self.session.provider.next();
                self.session.set_provider(next);
                self.request_input.set_text(self.session.request.clone());
                self.sync_editor();
                self.set_status(format!("Provider: {}", next.label()), Tone::Info);
                None
            }
            _ => None,
        }
    }

    fn handle_request_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.session.request = self.request_input.text().to_string();
                self.mode = Mode::Normal;
            }
            KeyCode::Esc => {
                self.request_input.set_text(self.session.request.clone());
                self.mode = Mode::Normal;
            }
            KeyCode::Char(c) => self.request_input.insert(c),
            KeyCode::Backspace => self.request_input.backspace(),
            KeyCode::Left => self.request_input.left(),
            KeyCode::Right => self.request_input.right(),
            KeyCode::Home => self.request_input.home(),
            KeyCode::End => self.request_input.end(),
            _ => {}
        }
    }

    fn handle_draft_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                // committing an edit invalidates any verdict for the old text
                self.session.edit_draft(self.editor.text().to_string());
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => self.editor.insert('\n'),
            KeyCode::Char(c) => self.editor.insert(c),
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Left => self.editor.left(),
            KeyCode::Right => self.editor.right(),
            KeyCode::Home => self.editor.home(),
            KeyCode::End => self.editor.end(),
            _ => {}
        }
    }

    async fn run_action(&mut self, action: PendingAction) {
        match action {
            PendingAction::Generate => {
                let Some(api_key) = self.api_key.clone() else {
                    self.set_status(
                        "Cannot generate: configure your API key with terranaut --setup.",
                        Tone::Error,
                    );
                    return;
                };
                let report = self.session.generate(&api_key).await;
                self.apply_report(report);
            }
            PendingAction::Correct => {
                let Some(api_key) = self.api_key.clone() else {
                    self.set_status(
                        "Cannot correct: configure your API key with terranaut --setup.",
                        Tone::Error,
                    );
                    return;
                };
                if !self.session.can_correct() {
                    self.set_status("Correction needs a failed validation first.", Tone::Info);
                    return;
                }
                let report = self.session.correct(&api_key).await;
                self.apply_report(report);
            }
            PendingAction::Validate => {
                if !self.session.can_validate() {
                    self.set_status("Nothing to validate yet.", Tone::Info);
                    return;
                }
                let terraform = match toolchain::resolve().await {
                    Ok(path) => path,
                    Err(err) => {
                        toolchain::invalidate();
                        self.set_status(
                            format!("Failed to set up Terraform: {:#}", err),
                            Tone::Error,
                        );
                        return;
                    }
                };
                if !self.tool_notice_shown {
                    self.tool_notice_shown = true;
                    self.set_status("Terraform is ready.", Tone::Info);
                }
                let report =
                    self.session
                        .run_validation(&terraform, &self.workdir, self.timeout, &self.cancel);
                self.apply_report(report);
            }
        }
    }

    fn busy_label(&self, action: PendingAction) -> &'static str {
        match action {
            PendingAction::Generate => "The model is drafting your configuration...",
            PendingAction::Validate => "Running terraform init and validate...",
            PendingAction::Correct => "The model is correcting the configuration...",
        }
    }
}

/// Run the TUI until the user quits.
pub async fn run_tui(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(action) = app.handle_key(key) {
            // show what is happening, then run the action to completion
            app.busy = Some(app.busy_label(action));
            terminal.draw(|f| ui::render(f, app))?;
            app.run_action(action).await;
            app.busy = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> App {
        App::new(Config::default(), CloudProvider::Aws, Some("sk-test".to_string()))
    }

    #[test]
    fn test_text_buffer_insert_and_backspace() {
        let mut buf = TextBuffer::new("ab");
        buf.insert('c');
        assert_eq!(buf.text(), "abc");
        buf.backspace();
        assert_eq!(buf.text(), "ab");
    }

    #[test]
    fn test_text_buffer_cursor_navigation() {
        let mut buf = TextBuffer::new("héllo");
        buf.home();
        buf.insert('x');
        assert_eq!(buf.text(), "xhéllo");
        buf.end();
        buf.insert('!');
        assert_eq!(buf.text(), "xhéllo!");
        buf.left();
        buf.left();
        buf.insert('y');
        assert_eq!(buf.text(), "xhéllyo!");
    }

    #[test]
    fn test_text_buffer_display_cursor_marker() {
        let mut buf = TextBuffer::new("ab");
        buf.left();
        assert_eq!(buf.display(true), "a▌b");
        assert_eq!(buf.display(false), "ab");
    }

    #[test]
    fn test_normal_mode_dispatches_actions() {
        let mut app = test_app();
        assert_eq!(app.handle_key(key(KeyCode::Char('g'))), Some(PendingAction::Generate));
        assert_eq!(app.handle_key(key(KeyCode::Char('v'))), Some(PendingAction::Validate));
        assert_eq!(app.handle_key(key(KeyCode::Char('c'))), Some(PendingAction::Correct));
    }

    #[test]
    fn test_quit_key() {
        let mut app = test_app();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_edit_request_commit_updates_session() {
        let mut app = test_app();
        app.handle_key(key(KeyCode::Char('i')));
        assert_eq!(app.mode, Mode::EditRequest);
        for _ in 0..app.request_input.text().chars().count() {
            app.handle_key(key(KeyCode::Backspace));
        }
        for c in "two buckets".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.session.request, "two buckets");
    }

    #[test]
    fn test_edit_request_escape_discards() {
        let mut app = test_app();
        let original = app.session.request.clone();
        app.handle_key(key(KeyCode::Char('i')));
        app.handle_key(key(KeyCode::Char('x')));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.session.request, original);
        assert_eq!(app.request_input.text(), original);
    }

    #[test]
    fn test_edit_draft_clears_placeholder_and_invalidates_verdict() {
        let mut app = test_app();
        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.mode, Mode::EditDraft);
        assert_eq!(app.editor.text(), "");
        for c in "resource {}".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.session.draft.content, "resource {}");
        assert!(app.session.verdict.is_none());
        assert!(app.session.can_validate());
    }

    #[test]
    fn test_provider_cycle_updates_buffers() {
        let mut app = test_app();
        app.handle_key(key(KeyCode::Char('p')));
        assert_eq!(app.session.provider, CloudProvider::Azure);
        assert_eq!(app.request_input.text(), CloudProvider::Azure.example_request());
    }
}
