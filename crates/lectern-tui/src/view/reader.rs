use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};

use lectern_core::{Phase, Slider};

use crate::app::{App, SliderFocus};
use crate::view::spinner_char;

/// Render the reader screen: status, preview, playback buttons and sliders.
pub fn render_in(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(1), // header
        Constraint::Length(1), // status
        Constraint::Min(3),    // preview
        Constraint::Length(3), // buttons
        Constraint::Length(2), // sliders
        Constraint::Length(1), // footer
    ])
    .split(area);

    render_header(f, app, chunks[0]);
    f.render_widget(Paragraph::new(status_line(app)), chunks[1]);
    render_preview(f, app, chunks[2]);
    render_buttons(f, app, chunks[3]);
    render_sliders(f, app, chunks[4]);

    let footer = Line::from(Span::styled(
        " o:open  p:play  Space:pause  s:stop  Tab:slider  \u{2190}/\u{2192}:adjust  j/k:scroll  ?:help  q:quit",
        app.theme.footer_style(),
    ));
    f.render_widget(Paragraph::new(footer), chunks[5]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mut spans = vec![
        Span::styled(" lectern ", theme.header_style()),
        Span::styled(
            " PDF reader",
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(name) = app.session.file_name() {
        spans.push(Span::styled(format!("  {name}"), Style::default().fg(theme.dim)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// The status row: latest message, with a spinner and page count while
/// extracting.
pub fn status_line(app: &App) -> Line<'static> {
    let theme = &app.theme;
    let Some(status) = app.session.status() else {
        return Line::from(Span::styled(
            " Open a PDF to begin",
            Style::default().fg(theme.dim),
        ));
    };

    let style = Style::default().fg(theme.severity_color(status.severity));
    let mut spans = Vec::new();
    if app.session.phase() == Phase::Extracting {
        spans.push(Span::styled(format!(" {} ", spinner_char(app.tick)), style));
    } else {
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(status.message.clone(), style));
    if app.session.phase() == Phase::Extracting
        && let Some((done, total)) = app.extraction_progress
        && total > 0
    {
        spans.push(Span::styled(
            format!(" ({done}/{total} pages)"),
            Style::default().fg(theme.dim),
        ));
    }
    Line::from(spans)
}

fn render_preview(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let title = match app.session.text() {
        Some(text) => format!(" Preview ({} characters) ", text.chars().count()),
        None => " Preview ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(title);

    let paragraph = match app.session.preview() {
        Some(preview) => Paragraph::new(preview.to_string())
            .style(Style::default().fg(theme.text))
            .wrap(Wrap { trim: false })
            .scroll((app.preview_scroll, 0)),
        None => Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Press o to browse for a PDF, or drop one onto this window.",
                Style::default().fg(theme.dim),
            )),
        ])
        .alignment(Alignment::Center),
    };
    f.render_widget(paragraph.block(block), area);
}

fn render_buttons(f: &mut Frame, app: &App, area: Rect) {
    let controls = app.session.controls();
    let columns = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(area);

    let buttons = [
        ("\u{25B6} Play [p]", controls.play),
        ("\u{23F8} Pause [Space]", controls.pause),
        ("\u{25A0} Stop [s]", controls.stop),
    ];
    for ((label, enabled), column) in buttons.into_iter().zip(columns.iter()) {
        let style = app.theme.button_style(enabled);
        let button = Paragraph::new(Span::styled(label, style))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(style));
        f.render_widget(button, *column);
    }
}

fn render_sliders(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).split(area);
    render_slider(
        f,
        app,
        rows[0],
        "Speed",
        &app.session.rate,
        app.focus == SliderFocus::Rate,
    );
    render_slider(
        f,
        app,
        rows[1],
        "Pitch",
        &app.session.pitch,
        app.focus == SliderFocus::Pitch,
    );
}

fn render_slider(f: &mut Frame, app: &App, area: Rect, name: &str, slider: &Slider, focused: bool) {
    let theme = &app.theme;
    let columns = Layout::horizontal([Constraint::Length(9), Constraint::Min(10)]).split(area);

    let (marker, label_style) = if focused {
        (
            "\u{25B8}",
            Style::default().fg(theme.active).add_modifier(Modifier::BOLD),
        )
    } else {
        (" ", Style::default().fg(theme.dim))
    };
    f.render_widget(
        Paragraph::new(Span::styled(format!(" {marker}{name}"), label_style)),
        columns[0],
    );

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(theme.active).bg(theme.highlight_bg))
        .ratio(slider.fraction().clamp(0.0, 1.0))
        .label(format!("{}x", slider.label()));
    f.render_widget(gauge, columns[1]);
}
