use ratatui::style::{Color, Modifier, Style};
use site_client::Severity;
use site_core::{BoardColumn, CategoryColor, TaskStatus, ThemeSlot};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const GROUP_STYLE: Style = Style::new()
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::BOLD);
pub const SUBGROUP_STYLE: Style = Style::new().fg(Color::Rgb(189, 174, 147));
pub const PENDING_STYLE: Style = Style::new()
    .fg(Color::Rgb(146, 131, 116))
    .add_modifier(Modifier::ITALIC);

const MUTED: Color = Color::Rgb(146, 131, 116);

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub fn slot_color(slot: ThemeSlot) -> Color {
    match slot {
        ThemeSlot::Primary => Color::Rgb(131, 165, 152),
        ThemeSlot::Secondary => Color::Rgb(142, 192, 124),
        ThemeSlot::Accent => Color::Rgb(254, 128, 25),
        ThemeSlot::Muted => MUTED,
    }
}

/// `#rrggbb` or `#rgb`; anything else falls back to the muted slot.
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim().trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let parsed = match digits.len() {
        6 => channel(&digits[0..2])
            .zip(channel(&digits[2..4]))
            .zip(channel(&digits[4..6]))
            .map(|((r, g), b)| (r, g, b)),
        3 => {
            let short = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            short(0).zip(short(1)).zip(short(2)).map(|((r, g), b)| (r, g, b))
        }
        _ => None,
    };
    parsed.map_or(MUTED, |(r, g, b)| Color::Rgb(r, g, b))
}

pub fn category_style(color: &CategoryColor) -> Style {
    let fg = match color {
        CategoryColor::Theme(slot) => slot_color(*slot),
        CategoryColor::Hex(hex) => hex_color(hex),
    };
    Style::new().fg(fg).add_modifier(Modifier::BOLD)
}

pub mod icons {
    pub const CHECK: &str = "x";
    pub const OPEN: &str = " ";
    pub const MARKED: &str = "*";
    pub const SAVING: &str = "~";
    pub const REPLY: &str = "└";
}

pub fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Completed => Color::Rgb(184, 187, 38),
        TaskStatus::InProgress => Color::Rgb(131, 165, 152),
        TaskStatus::OnHold => Color::Rgb(254, 128, 25),
        TaskStatus::NotStarted => MUTED,
    }
}

pub fn column_color(column: BoardColumn) -> Color {
    match column {
        BoardColumn::ToDo => Color::Rgb(189, 174, 147),
        BoardColumn::Planning => Color::Rgb(250, 189, 47),
        BoardColumn::Preparation => Color::Rgb(131, 165, 152),
        BoardColumn::Execution => Color::Rgb(184, 187, 38),
    }
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Success => Color::Rgb(184, 187, 38),
        Severity::Info => Color::Rgb(131, 165, 152),
        Severity::Error => Color::Rgb(251, 73, 52),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_long_and_short_forms() {
        assert_eq!(hex_color("#fabd2f"), Color::Rgb(250, 189, 47));
        assert_eq!(hex_color("#fff"), Color::Rgb(255, 255, 255));
        assert_eq!(hex_color("teal"), MUTED);
        assert_eq!(hex_color("#12345z"), MUTED);
    }
}
