use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    // Colors 0-f, formats k-o, reset r.
    static ref LEGACY_CODES: HashSet<char> = "0123456789abcdefklmnor".chars().collect();
}

const SECTION_SIGN: char = '\u{00A7}';

/// Removes legacy `§x` formatting codes and ANSI escape sequences.
pub fn to_plain_text(formatted: &str) -> String {
    let mut out = String::with_capacity(formatted.len());
    let mut chars = formatted.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            SECTION_SIGN => {
                if let Some(next) = chars.peek() {
                    if LEGACY_CODES.contains(&next.to_ascii_lowercase()) {
                        chars.next();
                    }
                }
            }
            '\u{1b}' => {
                // CSI: ESC [ params final-byte
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out.trim().to_string()
}

pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now()
}

pub fn relative_time(then: DateTime<Utc>) -> String {
    relative_time_from(then, now_timestamp())
}

pub fn relative_time_from(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 5 {
        return "just now".to_string();
    }

    let (amount, unit) = match secs {
        s if s < 60 => (s, "second"),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 30 * 86_400 => (s / 86_400, "day"),
        s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
        s => (s / (365 * 86_400), "year"),
    };

    if amount == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_strips_legacy_codes() {
        assert_eq!(to_plain_text("§aA §lMinecraft§r Server"), "A Minecraft Server");
        assert_eq!(to_plain_text("§6§LGold"), "Gold");
    }

    #[test]
    fn test_keeps_unknown_codes_text() {
        assert_eq!(to_plain_text("50§z off"), "50z off");
        assert_eq!(to_plain_text("trailing§"), "trailing");
    }

    #[test]
    fn test_strips_ansi_sequences() {
        assert_eq!(to_plain_text("\u{1b}[0;32mgreen\u{1b}[0m text"), "green text");
    }

    #[test]
    fn test_relative_time_units() {
        let now = Utc::now();
        assert_eq!(relative_time_from(now, now), "just now");
        assert_eq!(relative_time_from(now + Duration::seconds(30), now), "just now");
        assert_eq!(relative_time_from(now - Duration::seconds(42), now), "42 seconds ago");
        assert_eq!(relative_time_from(now - Duration::seconds(60), now), "1 minute ago");
        assert_eq!(relative_time_from(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(relative_time_from(now - Duration::days(1), now), "1 day ago");
        assert_eq!(relative_time_from(now - Duration::days(65), now), "2 months ago");
        assert_eq!(relative_time_from(now - Duration::days(800), now), "2 years ago");
    }
}
