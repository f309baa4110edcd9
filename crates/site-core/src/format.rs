use chrono::{DateTime, Utc};

/// "structural_framing" -> "Structural Framing".
pub fn format_category_name(raw: &str) -> String {
    raw.split(|ch: char| ch.is_whitespace() || ch == '_' || ch == '-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// US dollars with thousands separators, e.g. `-$1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = cents / 100;
    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y").to_string()
}

pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{hours:.0}h")
    } else {
        format!("{hours:.1}h")
    }
}

pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width) / 100;
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::day;

    #[test]
    fn category_names_are_title_cased() {
        assert_eq!(format_category_name("structural_framing"), "Structural Framing");
        assert_eq!(format_category_name("  HVAC "), "Hvac");
        assert_eq!(format_category_name("finish-carpentry"), "Finish Carpentry");
        assert_eq!(format_category_name(""), "");
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-987654.321), "-$987,654.32");
        assert_eq!(format_currency(100.0), "$100.00");
    }

    #[test]
    fn dates_and_bars() {
        assert_eq!(format_date(day(2024, 1, 6)), "Jan 6, 2024");
        assert_eq!(progress_bar(50, 10), "[=====     ]");
        assert_eq!(progress_bar(100, 4), "[====]");
        assert_eq!(format_hours(6.0), "6h");
        assert_eq!(format_hours(7.5), "7.5h");
    }
}
