use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use canopy_core::view::{ImageBlock, Raster};
use canopy_core::Slot;
use crate::app::{App, Focus, InputMode, NoticeKind};

const ACCENT: Color = Color::Rgb(84, 210, 45);
const MUTED: Color = Color::Rgb(162, 195, 152);

/// Widest a generated image is drawn, in terminal columns.
const MAX_IMAGE_COLS: u16 = 64;
const MAX_IMAGE_ROWS: u16 = 20;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    let [upload_area, button_area, busy_area, results_area] = Layout::vertical([
        Constraint::Length(6),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_upload(app, frame, upload_area);
    render_submit_button(app, frame, button_area);
    render_busy_line(app, frame, busy_area);
    render_results(app, frame, results_area);

    render_footer(app, frame, footer_area);

    if app.notice.is_some() {
        render_notice(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Deforestation Detection Dashboard ", Style::default().fg(ACCENT).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_upload(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Upload Images ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [past_area, recent_area] =
        Layout::vertical([Constraint::Length(2), Constraint::Length(2)]).areas(inner);

    render_slot(app, frame, past_area, Slot::Past, Focus::PastImage);
    render_slot(app, frame, recent_area, Slot::Recent, Focus::RecentImage);
}

fn render_slot(app: &App, frame: &mut Frame, area: Rect, slot: Slot, focus: Focus) {
    let focused = app.focus == focus;
    let editing = focused && app.input_mode == InputMode::Editing;

    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let path = app.path_input(slot);
    let path_span = if editing {
        Span::styled(format!("{}_", path), Style::default().fg(Color::Yellow))
    } else if path.is_empty() {
        Span::styled("Enter to type a path", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(path.to_string())
    };

    let selection = app.dashboard.input.get(slot);
    let mut name_line = vec![Span::styled(
        format!("  {}", selection.display_name()),
        Style::default().fg(MUTED),
    )];
    if let Some(image) = selection.staged() {
        name_line.push(Span::styled(
            format!(" ({} bytes)", image.bytes.len()),
            Style::default().fg(Color::DarkGray),
        ));
        if !image.looks_like_image() {
            name_line.push(Span::styled(" not an image type", Style::default().fg(Color::Yellow)));
        }
    }

    let text = Text::from(vec![
        Line::from(vec![
            Span::styled(format!("{:<14}", slot.label()), label_style),
            path_span,
        ]),
        Line::from(name_line),
    ]);

    frame.render_widget(Paragraph::new(text), area);
}

fn render_submit_button(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.dashboard.is_busy();
    let focused = app.focus == Focus::Submit;

    let (label, style) = if busy {
        ("Processing...", Style::default().fg(Color::Black).bg(Color::Gray))
    } else if focused {
        ("Predict Deforestation", Style::default().fg(Color::Black).bg(ACCENT).bold())
    } else {
        ("Predict Deforestation", Style::default().fg(ACCENT))
    };

    let width = (label.len() as u16 + 4).min(area.width);
    let button_area = Rect::new(area.x, area.y, width, area.height);

    let button = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL).border_style(style));

    frame.render_widget(button, button_area);
}

fn render_busy_line(app: &App, frame: &mut Frame, area: Rect) {
    if !app.dashboard.is_busy() {
        return;
    }

    // Animated ellipsis: cycles through ".", "..", "..."
    let dots = ".".repeat((app.animation_frame as usize) + 1);
    let line = Paragraph::new(format!("Please wait, analyzing images{}", dots))
        .style(Style::default().fg(MUTED).add_modifier(Modifier::ITALIC));
    frame.render_widget(line, area);
}

fn render_results(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(view) = app.result_view.as_ref() else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(" Prediction Results ");

    let inner_width = block.inner(area).width;

    let mut lines: Vec<Line> = Vec::new();
    for row in &view.metrics {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<14}", row.label), Style::default().fg(MUTED)),
            Span::styled(row.value.clone(), Style::default().fg(Color::White)),
        ]));
    }

    for image in &view.images {
        lines.push(Line::default());
        lines.extend(image_block_lines(image, inner_width));
    }

    // Keep the scroll inside the content
    let max_scroll = (lines.len() as u16).saturating_sub(1);
    app.results_scroll = app.results_scroll.min(max_scroll);

    let results = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.results_scroll, 0));

    frame.render_widget(results, area);
}

fn image_block_lines(image: &ImageBlock, width: u16) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        image.title,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ))];

    match &image.raster {
        Ok(raster) => {
            let (cols, rows) = fit_raster(raster, width.min(MAX_IMAGE_COLS), MAX_IMAGE_ROWS);
            lines.extend(raster_lines(raster, cols, rows));
        }
        Err(reason) => lines.push(Line::from(Span::styled(
            format!("Image could not be displayed: {}", reason),
            Style::default().fg(Color::Red),
        ))),
    }

    lines
}

/// Cell size for a raster, keeping its aspect ratio. Each cell holds two pixel rows.
fn fit_raster(raster: &Raster, max_cols: u16, max_rows: u16) -> (u16, u16) {
    if raster.width == 0 || raster.height == 0 || max_cols == 0 || max_rows == 0 {
        return (0, 0);
    }

    let mut cols = raster.width.min(max_cols as u32) as u16;
    let mut rows = ((raster.height as f32 * cols as f32 / raster.width as f32) / 2.0).ceil() as u16;
    if rows > max_rows {
        rows = max_rows;
        cols = ((raster.width as f32 * rows as f32 * 2.0 / raster.height as f32).round() as u16)
            .clamp(1, max_cols);
    }
    (cols, rows.max(1))
}

/// Half-block rendering: `▀` with the upper pixel as foreground, lower as background.
fn raster_lines(raster: &Raster, cols: u16, rows: u16) -> Vec<Line<'static>> {
    let pixel_rows = rows as u32 * 2;
    (0..rows as u32)
        .map(|row| {
            let top_y = (row * 2) * raster.height / pixel_rows;
            let bottom_y = (row * 2 + 1) * raster.height / pixel_rows;
            let spans: Vec<Span<'static>> = (0..cols as u32)
                .map(|col| {
                    let x = col * raster.width / cols as u32;
                    Span::styled(
                        "▀",
                        Style::default()
                            .fg(to_color(raster.pixel(x, top_y)))
                            .bg(to_color(raster.pixel(x, bottom_y))),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Composite over black.
fn to_color([r, g, b, a]: [u8; 4]) -> Color {
    let blend = |c: u8| ((c as u16 * a as u16) / 255) as u8;
    Color::Rgb(blend(r), blend(g), blend(b))
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" PATH ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Editing => vec![("Enter", "load"), ("Esc", "cancel")],
        InputMode::Normal if app.dashboard.is_busy() => {
            vec![("Esc", "cancel request"), ("Tab", "focus"), ("q", "quit")]
        }
        InputMode::Normal => {
            let mut hints = vec![("Tab", "focus"), ("Enter", "edit/submit"), ("s", "submit"), ("x", "clear")];
            if app.dashboard.result().is_some() {
                hints.push(("e", "export"));
                hints.push(("J/K", "scroll"));
            }
            hints.push(("q", "quit"));
            hints
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = &app.notice else {
        return;
    };

    let (title, color) = match notice.kind {
        NoticeKind::Info => (" Info ", Color::Cyan),
        NoticeKind::Warning => (" Warning ", Color::Yellow),
        NoticeKind::Error => (" Error ", Color::Red),
    };

    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let text = Text::from(vec![
        Line::from(notice.message.as_str()),
        Line::default(),
        Line::from(Span::styled("Press any key to continue", Style::default().fg(Color::DarkGray))),
    ]);

    let popup = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{Config, ImageSelection, StagedImage};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_button_reads_processing_while_pending() {
        let mut app = App::new(&Config {
            endpoint: Some("http://127.0.0.1:9/predict".to_string()),
            timeout_secs: Some(1),
        });
        assert!(draw(&mut app).contains("Predict Deforestation"));

        app.dashboard
            .input
            .set_past(ImageSelection::Selected(StagedImage::from_bytes("a.png", vec![1])));
        app.dashboard
            .input
            .set_recent(ImageSelection::Selected(StagedImage::from_bytes("b.png", vec![2])));
        app.dashboard.begin_submit().unwrap();

        let screen = draw(&mut app);
        assert!(screen.contains("Processing..."));
        assert!(!screen.contains("Predict Deforestation"));
        assert!(screen.contains("Please wait, analyzing images"));
    }

    fn red_green() -> Raster {
        Raster {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 255, 0, 255],
        }
    }

    #[test]
    fn test_raster_lines_use_half_blocks() {
        let lines = raster_lines(&red_green(), 2, 1);
        assert_eq!(lines.len(), 1);
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].content, "▀");
        assert_eq!(spans[0].style.fg, Some(Color::Rgb(255, 0, 0)));
        assert_eq!(spans[1].style.bg, Some(Color::Rgb(0, 255, 0)));
    }

    #[test]
    fn test_fit_raster_keeps_aspect() {
        let wide = Raster { width: 128, height: 128, rgba: vec![0; 128 * 128 * 4] };
        assert_eq!(fit_raster(&wide, 64, 40), (64, 32));
        // Height-limited
        assert_eq!(fit_raster(&wide, 64, 20), (40, 20));
        assert_eq!(fit_raster(&wide, 0, 20), (0, 0));
    }

    #[test]
    fn test_transparent_pixels_blend_to_black() {
        assert_eq!(to_color([200, 100, 50, 0]), Color::Rgb(0, 0, 0));
        assert_eq!(to_color([200, 100, 50, 255]), Color::Rgb(200, 100, 50));
    }

    #[test]
    fn test_undecodable_image_shows_reason() {
        let block = ImageBlock {
            title: canopy_core::view::PAST_IMAGE_TITLE,
            raster: Err("invalid base64".to_string()),
        };
        let lines = image_block_lines(&block, 40);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans[0].content, "Image could not be displayed: invalid base64");
    }
}
