use crate::state::{App, DisplayRow, FocusMode, InputMode};
use crate::theme::{self, icons};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame,
};
use site_client::EntityKey;
use site_core::format::{format_category_name, format_currency, format_date, progress_bar};
use site_core::BoardColumn;

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.size();
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    render_title(f, app, outer[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(outer[1]);
    render_tasks(f, app, main[0]);
    if app.show_help {
        render_help(f, main[1]);
    } else if app.show_comments {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main[1]);
        render_board(f, app, right[0]);
        render_comments(f, app, right[1]);
    } else {
        render_board(f, app, main[1]);
    }

    render_footer(f, app, outer[2]);
}

fn focus_border(app: &App, focus: FocusMode) -> Style {
    if app.focus == focus {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn render_title(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(" Site board ", theme::HEADER_STYLE)];
    spans.push(Span::raw(app.build_title()));
    if app.loading {
        spans.push(Span::styled("  loading…", theme::PENDING_STYLE));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Tasks")
        .border_style(focus_border(app, FocusMode::Tasks));

    if app.rows.is_empty() {
        let message = app.last_error.clone().unwrap_or_else(|| {
            if app.loading {
                "Loading tasks…".to_string()
            } else {
                "No tasks found".to_string()
            }
        });
        let text = vec![
            Line::from(Span::styled(message, Color::Yellow)),
            Line::from(""),
            Line::from("Press r to retry, q to quit."),
        ];
        f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(block), area);
        return;
    }

    let project = app.project_id;
    let mut task_tone = 0usize;
    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|row| match row {
            DisplayRow::Tier1 {
                name,
                total,
                percent,
            } => {
                let resolved = app.resolver.resolve(name, project);
                Row::new(vec![
                    Cell::from(""),
                    Cell::from(Line::from(vec![Span::styled(
                        resolved.display_name,
                        theme::category_style(&resolved.color),
                    )])),
                    Cell::from(Span::styled(
                        format!("{} {percent}% ({total})", progress_bar(*percent, 8)),
                        theme::GROUP_STYLE,
                    )),
                ])
            }
            DisplayRow::Tier2 {
                name,
                total,
                percent,
            } => {
                let color = app.resolver.color(name, project);
                Row::new(vec![
                    Cell::from(""),
                    Cell::from(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(format_category_name(name), theme::category_style(&color)),
                    ])),
                    Cell::from(Span::styled(
                        format!("{percent}% ({total})"),
                        theme::SUBGROUP_STYLE,
                    )),
                ])
            }
            DisplayRow::Task { index } => {
                let task = &app.tasks[*index];
                let mark = if app.is_pending(EntityKey::Task(task.id)) {
                    Span::styled(icons::SAVING, theme::PENDING_STYLE)
                } else if app.marked.contains(&task.id) {
                    Span::styled(icons::MARKED, Color::Magenta)
                } else if task.is_completed() {
                    Span::styled(icons::CHECK, theme::status_color(task.status))
                } else {
                    Span::raw(icons::OPEN)
                };
                let progress = task.progress(app.now);
                let style = theme::zebra_row_style(task_tone);
                task_tone += 1;
                Row::new(vec![
                    Cell::from(mark),
                    Cell::from(Line::from(vec![
                        Span::raw("    "),
                        Span::raw(task.title.clone()),
                    ])),
                    Cell::from(Line::from(vec![
                        Span::raw(format!("{} ", progress_bar(progress, 8))),
                        Span::styled(task.status.label(), theme::status_color(task.status)),
                    ])),
                ])
                .style(style)
            }
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Min(16),
        Constraint::Length(24),
    ];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "Task", "Progress"]).style(theme::HEADER_STYLE))
        .block(block)
        .highlight_style(theme::SELECTED_STYLE);

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_board(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.selected_task() {
        Some(task) => {
            let mut title = format!(
                "Checklist: {} ({} → {})",
                task.title,
                format_date(task.start_date),
                format_date(task.end_date)
            );
            if let Some(cost) = task.estimated_cost {
                title.push_str(&format!(" | Budget {}", format_currency(cost)));
            }
            title
        }
        None => "Checklist".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(focus_border(app, FocusMode::Board));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(inner);
    let board = app.board();
    let summary = board.summary();

    for column in BoardColumn::ALL {
        let items: Vec<ListItem> = board
            .column(column)
            .iter()
            .map(|item| {
                let saving = app.is_pending(EntityKey::ChecklistItem(item.id));
                let check = if item.completed {
                    icons::CHECK
                } else {
                    icons::OPEN
                };
                let mut spans = vec![Span::raw(format!("[{check}] "))];
                let title_style = if saving {
                    theme::PENDING_STYLE
                } else if item.completed {
                    Style::default().add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default()
                };
                spans.push(Span::styled(item.title.clone(), title_style));
                if let Some(due) = item.due_date {
                    spans.push(Span::styled(
                        format!(" {}", format_date(due)),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let counts = summary.column(column);
        let active = app.focus == FocusMode::Board && app.column == column;
        let border = if active {
            Style::default().fg(theme::column_color(column))
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(Span::styled(
                        format!("{} {}/{}", column, counts.completed, counts.total),
                        Style::default().fg(theme::column_color(column)),
                    )),
            )
            .highlight_style(theme::SELECTED_STYLE);

        let mut state = ListState::default();
        if app.column == column && !board.column(column).is_empty() {
            state.select(Some(app.column_rows[column.index()]));
        }
        f.render_stateful_widget(list, columns[column.index()], &mut state);
    }
}

fn render_comments(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Comments")
        .border_style(focus_border(app, FocusMode::Comments));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let threads = app.threads();
    if threads.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(
                "No comments yet. Press a to add one.",
                Color::DarkGray,
            )),
            inner,
        );
        return;
    }

    let mut lines = Vec::new();
    for (idx, thread) in threads.iter().enumerate() {
        let header_style = if idx == app.thread_index && app.focus == FocusMode::Comments {
            theme::SELECTED_STYLE
        } else {
            theme::HEADER_STYLE
        };
        lines.push(Line::from(vec![
            Span::styled(thread.root.author_name.clone(), header_style),
            Span::styled(
                format!("  {}", format_date(thread.root.created_at)),
                Color::DarkGray,
            ),
        ]));
        lines.push(Line::from(thread.root.content.clone()));
        for reply in &thread.replies {
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", icons::REPLY), Color::DarkGray),
                Span::styled(reply.author_name.clone(), Color::Cyan),
                Span::raw(": "),
                Span::raw(reply.content.clone()),
            ]));
        }
        lines.push(Line::from(""));
    }

    let scroll = wrapped_offset(&threads, app.thread_index);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        inner,
    );
}

/// Line offset of the selected thread, so it stays near the top of the pane.
fn wrapped_offset(threads: &[site_core::CommentThread<'_>], selected: usize) -> u16 {
    let lines: usize = threads
        .iter()
        .take(selected)
        .map(|thread| thread.replies.len() + 3)
        .sum();
    u16::try_from(lines).unwrap_or(u16::MAX)
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(prompt) = &app.prompt {
        Line::from(vec![
            Span::styled(
                prompt.prompt.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  [y/n]"),
        ])
    } else if app.input == InputMode::Search {
        Line::from(vec![
            Span::styled("/", Color::Cyan),
            Span::raw(app.input_buffer.clone()),
        ])
    } else if app.input == InputMode::Comment {
        let label = if app.reply_to.is_some() {
            "reply> "
        } else {
            "comment> "
        };
        Line::from(vec![
            Span::styled(label, Color::Cyan),
            Span::raw(app.input_buffer.clone()),
        ])
    } else if let Some(toast) = app.toasts.back() {
        Line::from(Span::styled(
            toast.notice.message.clone(),
            Style::default().fg(theme::severity_color(toast.notice.severity)),
        ))
    } else if let Some(note) = &app.status_note {
        Line::from(Span::styled(note.clone(), Color::DarkGray))
    } else {
        Line::from(Span::styled("? help  q quit", Color::DarkGray))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{k:<11}"), Color::Cyan),
            Span::raw(what),
        ])
    };
    let text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        key("j / Down", "Next row"),
        key("k / Up", "Previous row"),
        key("Enter", "Open checklist / comments"),
        key("Tab", "Switch focus"),
        key("Left/Right", "Switch board column"),
        key("h / l", "Move item to previous / next column"),
        key("x", "Toggle complete"),
        key("d", "Delete"),
        key("Space", "Mark task"),
        key("D", "Delete marked tasks"),
        key("c", "Show comments"),
        key("a", "Add comment"),
        key("/", "Search"),
        key("f", "Cycle status filter"),
        key("r", "Refresh"),
        key("?", "Toggle help"),
        key("q", "Quit"),
    ];

    let p = Paragraph::new(text).wrap(Wrap { trim: true });
    f.render_widget(p, inner_area);
}
