//! Terranaut UI - request on the left, results on the right
//!
//! Layout:
//! ┌───────────────────────────────┬──────────────────────────────┐
//! │ Your Infrastructure Request   │ Results                      │
//! ├───────────────────────────────┤  verdict / raw model output  │
//! │ Terraform Code (editable)     │                              │
//! └───────────────────────────────┴──────────────────────────────┘
//! plus a header with the provider and a footer with key hints.

pub mod theme;

use crate::app::{App, Mode, Tone};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use theme::Theme;

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Theme::bg()), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(2),
        ])
        .split(area);

    render_header(frame, rows[0], app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(4)])
        .split(columns[0]);

    render_request(frame, left[0], app);
    render_editor(frame, left[1], app);
    render_results(frame, columns[1], app);
    render_footer(frame, rows[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled("  terranaut ", Theme::bold()),
        Span::styled("· terraform drafting companion", Theme::text_dim()),
        Span::styled("   provider: ", Theme::text_dim()),
        Span::styled(app.session.provider.label(), Theme::text()),
    ];
    if app.api_key.is_none() {
        spans.push(Span::styled(
            "   no API key - run terranaut --setup",
            Style::default().fg(Theme::YELLOW),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_request(frame: &mut Frame, area: Rect, app: &App) {
    let editing = app.mode == Mode::EditRequest;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if editing {
            Theme::border_focused()
        } else {
            Theme::border()
        })
        .title(Span::styled(" Your Infrastructure Request ", Theme::text_muted()));
    let text = app.request_input.display(editing);
    frame.render_widget(
        Paragraph::new(text).style(Theme::text()).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_editor(frame: &mut Frame, area: Rect, app: &App) {
    let editing = app.mode == Mode::EditDraft;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if editing {
            Theme::border_focused()
        } else {
            Theme::border()
        })
        .title(Span::styled(" Terraform Code ", Theme::text_muted()));
    let style = if app.session.draft.is_placeholder() {
        Theme::text_dim()
    } else {
        Theme::text()
    };
    let text = app.editor.display(editing);
    frame.render_widget(
        Paragraph::new(text).style(style).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_results(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .title(Span::styled(" Results ", Theme::text_muted()));

    let mut lines: Vec<Line> = Vec::new();

    if let Some(busy) = app.busy {
        lines.push(Line::from(Span::styled(busy, Theme::text_muted())));
    } else if let Some(verdict) = &app.session.verdict {
        if verdict.succeeded {
            lines.push(Line::from(Span::styled(
                "Validation Successful",
                Style::default().fg(Theme::GREEN),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Validation Failed",
                Style::default().fg(Theme::RED),
            )));
        }
        lines.push(Line::from(Span::styled(
            format!("ran at {}", verdict.ran_at.format("%H:%M:%S UTC")),
            Theme::text_dim(),
        )));
        lines.push(Line::from(""));
        for l in verdict.message.lines() {
            lines.push(Line::from(Span::styled(l.to_string(), Theme::text())));
        }
    } else if let Some(debug) = &app.session.debug_response {
        lines.push(Line::from(Span::styled(
            "Raw model output (no usable code block)",
            Style::default().fg(Theme::YELLOW),
        )));
        lines.push(Line::from(""));
        for l in debug.lines() {
            lines.push(Line::from(Span::styled(l.to_string(), Theme::text_muted())));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "Generate and validate code to see results here.",
            Theme::text_dim(),
        )));
    }

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn hint(spans: &mut Vec<Span<'static>>, key: &'static str, label: &'static str, enabled: bool) {
    spans.push(Span::styled(format!(" {} ", key), Theme::keycap()));
    spans.push(Span::styled(
        format!(" {} ", label),
        if enabled { Theme::text_muted() } else { Theme::text_dim() },
    ));
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let status_line = match &app.status {
        Some(status) => {
            let style = match status.tone {
                Tone::Info => Theme::text_muted(),
                Tone::Success => Style::default().fg(Theme::GREEN),
                Tone::Warning => Style::default().fg(Theme::YELLOW),
                Tone::Error => Style::default().fg(Theme::RED),
            };
            Line::from(Span::styled(format!("  {}", status.text), style))
        }
        None => Line::from(""),
    };

    let mut spans: Vec<Span> = vec![Span::styled("  ", Style::default())];
    match app.mode {
        Mode::Normal => {
            hint(&mut spans, "g", "generate", app.api_key.is_some());
            hint(&mut spans, "v", "validate", app.session.can_validate());
            hint(&mut spans, "c", "correct", app.session.can_correct());
            hint(&mut spans, "i", "request", true);
            hint(&mut spans, "e", "edit code", true);
            hint(&mut spans, "p", "provider", true);
            hint(&mut spans, "q", "quit", true);
        }
        Mode::EditRequest => {
            hint(&mut spans, "↵", "done", true);
            hint(&mut spans, "Esc", "cancel", true);
        }
        Mode::EditDraft => {
            hint(&mut spans, "Esc", "done", true);
        }
    }

    let footer =
        Paragraph::new(vec![status_line, Line::from(spans)]).style(Style::default().bg(Theme::GREY_900));
    frame.render_widget(footer, area);
}
