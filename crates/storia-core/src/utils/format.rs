/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format an API timestamp for display
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y %H:%M").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        // Keep the YYYY-MM-DD prefix of anything else
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

pub fn format_location(location: Option<(f64, f64)>) -> String {
    match location {
        Some((lat, lon)) => format!("{:.5}, {:.5}", lat, lon),
        None => "No location".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Pantai Kuta di sore hari", 10), "Pantai ...");
        assert_eq!(truncate_string("ééééé", 4), "é...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\n\nb   c\t"), "a b c");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-01T10:05:00.000Z"), "Mar 01, 2024 10:05");
        assert_eq!(format_date("2024-03-01 garbage"), "2024-03-01");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_format_location() {
        assert_eq!(format_location(Some((-6.2, 106.816666))), "-6.20000, 106.81667");
        assert_eq!(format_location(None), "No location");
    }
}
