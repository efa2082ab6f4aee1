//! Terminal user interface with ratatui, plus plain stdout output.

use alertwatch::app::{App, NoticeLevel};
use alertwatch::export::format_price;
use alertwatch::models::Alert;
use alertwatch::reconcile::{format_created, notified_badge};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

/// Colors for the UI.
pub struct UiColors {
    pub armed: Color,
    pub notified: Color,
    pub error: Color,
    pub info: Color,
    pub header_bg: Color,
    pub selected_bg: Color,
    pub border: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            armed: Color::Gray,
            notified: Color::Green,
            error: Color::Red,
            info: Color::Cyan,
            header_bg: Color::DarkGray,
            selected_bg: Color::Rgb(40, 40, 60),
            border: Color::DarkGray,
        }
    }
}

/// Render the main UI.
pub fn render<S, L>(frame: &mut Frame, app: &App<S, L>) {
    let colors = UiColors::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Alerts table
            Constraint::Length(1), // Notice / load error
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0], &colors);
    render_alerts_table(frame, app, chunks[1], &colors);
    render_status(frame, app, chunks[2], &colors);
    render_footer(frame, app, chunks[3], &colors);

    if app.show_help {
        render_help_overlay(frame, &colors);
    }

    if let Some(alert) = app.pending_delete.and_then(|id| app.list.get(id)) {
        render_confirm_delete(frame, alert, &colors);
    }
}

fn render_header<S, L>(frame: &mut Frame, app: &App<S, L>, area: Rect, colors: &UiColors) {
    let header_text = vec![
        Line::from(vec![
            Span::styled(
                "ALERTWATCH ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("- user {} - {} alerts", app.user(), app.list.len())),
        ]),
        Line::from(vec![
            Span::styled(
                format!("{} ", app.list.armed_count()),
                Style::default().fg(colors.armed),
            ),
            Span::raw("armed  "),
            Span::styled(
                format!("{} ", app.list.notified_count()),
                Style::default().fg(colors.notified),
            ),
            Span::raw("notified  "),
            Span::raw(format!("Updated: {}", app.time_since_refresh())),
        ]),
    ];

    let header = Paragraph::new(header_text).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(header, area);
}

fn render_alerts_table<S, L>(frame: &mut Frame, app: &App<S, L>, area: Rect, colors: &UiColors) {
    if app.list.is_loaded() && app.list.is_empty() {
        let empty = Paragraph::new("No alerts found.").style(Style::default().fg(colors.armed));
        frame.render_widget(empty, area);
        return;
    }

    let header_cells = ["#", "TICKER", "PRICE", "DIRECTION", "NOTIFIED", "CREATED AT"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::White)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(colors.header_bg))
        .height(1);

    let rows = app.rows().into_iter().enumerate().map(|(i, row)| {
        let row_style = if i == app.selected {
            Style::default().bg(colors.selected_bg)
        } else {
            Style::default()
        };
        let badge_color = if row.can_reset {
            colors.notified
        } else {
            colors.armed
        };

        Row::new(vec![
            Cell::from(row.index.to_string()),
            Cell::from(row.ticker).style(Style::default().add_modifier(Modifier::UNDERLINED)),
            Cell::from(format_price(row.limit_price)),
            Cell::from(row.direction),
            Cell::from(row.notified).style(Style::default().fg(badge_color)),
            Cell::from(row.created_at),
        ])
        .style(row_style)
    });

    let widths = [
        Constraint::Length(4),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Length(9),
        Constraint::Min(19),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::NONE))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(Some(app.selected));

    frame.render_stateful_widget(table, area, &mut state);
}

/// Load errors take precedence over notices; the table stays visible either way.
fn render_status<S, L>(frame: &mut Frame, app: &App<S, L>, area: Rect, colors: &UiColors) {
    let line = if let Some(error) = app.list.error() {
        Line::from(Span::styled(
            format!(" {error} Showing last loaded alerts."),
            Style::default().fg(colors.error),
        ))
    } else if let Some(notice) = &app.notice {
        let color = match notice.level {
            NoticeLevel::Success => colors.notified,
            NoticeLevel::Info => colors.info,
            NoticeLevel::Error => colors.error,
        };
        Line::from(Span::styled(
            format!(" {}", notice.message),
            Style::default().fg(color),
        ))
    } else {
        Line::from("")
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer<S, L>(frame: &mut Frame, app: &App<S, L>, area: Rect, colors: &UiColors) {
    let footer = Line::from(vec![
        Span::styled(" q", Style::default().fg(Color::Yellow)),
        Span::raw(":quit "),
        Span::styled("h", Style::default().fg(Color::Yellow)),
        Span::raw(":help "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(":reset "),
        Span::styled("d", Style::default().fg(Color::Yellow)),
        Span::raw(":delete "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(":open "),
        Span::styled("Space", Style::default().fg(Color::Yellow)),
        Span::raw(":refresh "),
        Span::raw(format!("| Iter: {}", app.iteration)),
    ]);

    let footer_widget = Paragraph::new(footer).style(Style::default().bg(colors.header_bg));

    frame.render_widget(footer_widget, area);
}

fn render_help_overlay(frame: &mut Frame, colors: &UiColors) {
    let area = centered_rect(60, 60, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "ALERTWATCH HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  ↑/k       Move up"),
        Line::from("  ↓/j       Move down"),
        Line::from("  g/Home    Go to top"),
        Line::from("  G/End     Go to bottom"),
        Line::from(""),
        Line::from("Alerts:"),
        Line::from("  r         Reactivate selected (notified only)"),
        Line::from("  d         Delete selected (asks first)"),
        Line::from("  Enter     Show dashboard route for ticker"),
        Line::from(""),
        Line::from("Actions:"),
        Line::from("  Space/R   Force refresh"),
        Line::from("  x         Dismiss message"),
        Line::from("  q/Esc     Quit"),
        Line::from("  h/?       Toggle help"),
        Line::from(""),
        Line::from("Create and edit with `alertwatch create` / `alertwatch edit`."),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

fn render_confirm_delete(frame: &mut Frame, alert: &Alert, colors: &UiColors) {
    let area = centered_rect(50, 20, frame.area());

    let text = vec![
        Line::from(format!(
            "Are you sure you want to delete the alert for {}?",
            alert.ticker
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Yellow)),
            Span::raw(":delete  "),
            Span::styled("n", Style::default().fg(Color::Yellow)),
            Span::raw(":cancel"),
        ]),
    ];

    let dialog = Paragraph::new(text)
        .block(
            Block::default()
                .title(" Delete Alert ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.error)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(dialog, area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Render batch mode output (non-interactive).
pub fn render_batch<S, L>(app: &App<S, L>) {
    use chrono::Local;

    println!(
        "\n=== ALERTWATCH {} === user {} | {} armed | {} notified",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        app.user(),
        app.list.armed_count(),
        app.list.notified_count()
    );

    if let Some(error) = app.list.error() {
        println!("!! {error}");
    }
    if let Some(notice) = &app.notice {
        println!("-- {}", notice.message);
    }

    println!(
        "{:>3} {:<8} {:>12} {:<9} {:<8} {:<19}",
        "#", "TICKER", "PRICE", "DIRECTION", "NOTIFIED", "CREATED AT"
    );
    println!("{}", "-".repeat(64));

    for row in app.rows() {
        println!(
            "{:>3} {:<8} {:>12} {:<9} {:<8} {:<19}",
            row.index,
            row.ticker,
            format_price(row.limit_price),
            row.direction,
            row.notified,
            row.created_at
        );
    }

    println!();
}

/// Print one alert's details.
pub fn print_alert(alert: &Alert, date_format: &str) {
    println!("Id:        {}", alert.id);
    println!("Ticker:    {}", alert.ticker);
    println!("Price:     {}", format_price(alert.limit_price));
    println!("Direction: {}", alert.direction.label());
    println!("Notified:  {}", notified_badge(alert.is_notified));
    println!("Created:   {}", format_created(alert.created_at, date_format));
}

/// Print the last notice, if any, to stdout.
pub fn print_notice<S, L>(app: &App<S, L>) {
    if let Some(notice) = &app.notice {
        println!("{}", notice.message);
    }
}
