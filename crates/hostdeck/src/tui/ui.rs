//! TUI rendering using ratatui.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use super::app::{App, Prompt, ViewMode};
use super::host::{HostTab, SUBTLE};

/// Draw the TUI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Body
            Constraint::Length(1), // Hint bar
        ])
        .split(frame.area());

    match app.view_mode.clone() {
        ViewMode::Hosts => draw_hosts_view(frame, app, chunks[0]),
        ViewMode::Help => draw_help(frame, app, chunks[0]),
        ViewMode::Error(detail) => draw_error(frame, &detail, chunks[0]),
    }
    draw_hint(frame, app, chunks[1]);
}

fn draw_hosts_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let list_width = app
        .visible_names()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0)
        .max(app.filter.chars().count() + 1)
        .clamp(12, 40) as u16
        + 4;

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(list_width), Constraint::Min(10)])
        .split(area);

    draw_host_list(frame, app, columns[0]);
    draw_host_detail(frame, app, columns[1]);
}

/// Draw the host list, keeping the selection in view.
fn draw_host_list(frame: &mut Frame, app: &App, area: Rect) {
    let mut items = Vec::new();
    if app.filtering || !app.filter.is_empty() {
        let style = if app.filtering {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(SUBTLE)
        };
        items.push(ListItem::new(Line::styled(format!("/{}", app.filter), style)));
    }

    let rows = (area.height.saturating_sub(2) as usize)
        .saturating_sub(items.len())
        .max(1);
    let skip = app.selected.saturating_sub(rows - 1);

    for (i, name) in app.visible_names().enumerate().skip(skip).take(rows) {
        let item = if i == app.selected {
            Line::styled(
                format!("> {}", name),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Line::raw(format!("  {}", name))
        };
        items.push(ListItem::new(item));
    }

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Hosts "));
    frame.render_widget(list, area);
}

fn draw_host_detail(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tabs
            Constraint::Min(1),    // Output
            Constraint::Length(1), // Footer
        ])
        .split(area);

    app.content_height = chunks[1].height as usize;
    let height = app.content_height;

    let Some(host) = app.selected_host() else {
        let empty = Paragraph::new("No hosts").style(Style::default().fg(SUBTLE));
        frame.render_widget(empty, chunks[1]);
        return;
    };

    let titles: Vec<Line> = HostTab::ALL.iter().map(|t| Line::raw(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(host.tab.index())
        .style(Style::default().fg(SUBTLE))
        .highlight_style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    frame.render_widget(tabs, chunks[0]);

    let panel = host.visible_panel();
    let offset = panel.view_offset(height).min(u16::MAX as usize) as u16;
    let output = Paragraph::new(panel.text().clone()).scroll((offset, 0));
    frame.render_widget(output, chunks[1]);

    let state = panel
        .runner()
        .map(|r| r.state().to_string())
        .unwrap_or_default();
    let footer = format!(
        " {} │ {} │ {} │ {} ",
        host.name,
        host.tab.title(),
        state,
        panel.scroll_label(height)
    );
    let footer = Paragraph::new(footer).style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(footer, chunks[2]);
}

/// Draw the hint bar: prompts first, then flash messages, then key help.
fn draw_hint(frame: &mut Frame, app: &App, area: Rect) {
    let line = match (&app.prompt, app.flash()) {
        (Some(Prompt::JumpLetter), _) => Line::raw("Jump to letter: "),
        (Some(Prompt::ConfirmReboot { text, .. }), _) => {
            Line::styled(text.clone(), Style::default().fg(Color::Yellow))
        }
        (Some(Prompt::RunCommand { prompt, input, .. }), _) => Line::from(vec![
            Span::styled(prompt.clone(), Style::default().fg(Color::Yellow)),
            Span::raw(input.clone()),
        ]),
        (None, Some(flash)) => Line::styled(flash.to_string(), Style::default().fg(Color::Red)),
        (None, None) if app.view_mode == ViewMode::Hosts => {
            Line::styled(app.keys.short_help(), Style::default().fg(SUBTLE))
        }
        (None, None) => Line::styled("esc back", Style::default().fg(SUBTLE)),
    };

    let width = line.width() as u16;
    frame.render_widget(Paragraph::new(line), area);

    if let Some(Prompt::RunCommand { .. } | Prompt::JumpLetter) = app.prompt {
        frame.set_cursor_position((area.x + width.min(area.width.saturating_sub(1)), area.y));
    }
}

/// Full key help in columns.
fn draw_help(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Help ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let groups = app.keys.full_help();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, groups.len() as u32); groups.len()])
        .split(inner);

    for (group, column) in groups.iter().zip(columns.iter()) {
        let lines: Vec<Line> = group
            .iter()
            .map(|b| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<8}", b.key_help),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(b.help, Style::default().fg(SUBTLE)),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), *column);
    }
}

fn draw_error(frame: &mut Frame, detail: &str, area: Rect) {
    let error = Paragraph::new(detail.to_string())
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title(" Error "));
    frame.render_widget(error, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    use hostdeck_core::{Paths, Settings};
    use hostdeck_nix::NixEvaluator;

    use crate::context::Context;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_draw_host_list_and_hint() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let ctx = Context::with_settings(
            Paths::with_state_dir("/tmp/hostdeck-test"),
            Settings::default(),
            "/lab",
        );
        let mut app = App::new(
            ctx,
            rt.handle().clone(),
            NixEvaluator::with_path("/nonexistent/nix"),
            vec!["web1".to_string(), "db1".to_string()],
        );

        let mut terminal = Terminal::new(TestBackend::new(160, 12)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();

        let screen = buffer_text(&terminal);
        assert!(screen.contains("Hosts"));
        assert!(screen.contains("> web1"));
        assert!(screen.contains("  db1"));
        assert!(screen.contains("Status"));
        assert!(screen.contains("? help"));
        assert_eq!(app.content_height, 9);
    }
}
