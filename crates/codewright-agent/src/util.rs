//! Small shared helpers: timestamps, slugs, char-safe truncation.

use time::OffsetDateTime;
use time::macros::format_description;

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `YYYYMMDD_HHMMSS`, used in backup file names.
pub fn timestamp_compact() -> String {
    now()
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_else(|_| "00000000_000000".to_string())
}

/// `YYYYMMDD-HHMM`, used in session branch names.
pub fn timestamp_minute() -> String {
    now()
        .format(format_description!("[year][month][day]-[hour][minute]"))
        .unwrap_or_else(|_| "00000000-0000".to_string())
}

/// `YYYY-MM-DD HH:MM:SS`, used in log banners and checkpoint messages.
pub fn timestamp_human() -> String {
    now()
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Lowercase, alphanumerics kept, everything else collapsed to single dashes,
/// truncated to `max` characters without a trailing dash.
pub fn slugify(text: &str, max: usize) -> String {
    let mut slug = String::with_capacity(max);
    let mut last_dash = true;
    for c in text.chars() {
        if slug.len() >= max {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Truncate to at most `max` characters, appending `…` when cut. Safe on
/// multi-byte input.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}…")
}

/// Collapse newlines so a value fits on one log/trace line.
pub fn single_line(text: &str) -> String {
    text.replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_truncates() {
        assert_eq!(slugify("Add a README file!", 30), "add-a-readme-file");
        assert_eq!(slugify("fix:  bug #42", 30), "fix-bug-42");
        assert_eq!(slugify("averylongdescription", 6), "averyl");
    }

    #[test]
    fn slugify_never_ends_with_dash() {
        assert_eq!(slugify("abc---", 30), "abc");
        assert_eq!(slugify("ab cd", 3), "ab");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo…");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn timestamps_have_expected_width() {
        assert_eq!(timestamp_compact().len(), 15);
        assert_eq!(timestamp_minute().len(), 13);
    }
}
