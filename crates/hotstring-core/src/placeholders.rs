//! `{{token}}` placeholders resolved when an expansion is typed.
//!
//! Tokens are substituted in a single left-to-right pass together with the
//! `\n`, `\r` and `\t` escapes. Substituted values are never scanned again,
//! so clipboard text containing `{{uuid}}` is pasted as-is. Unknown tokens
//! are left untouched.

use crate::clipboard::ClipboardService;
use chrono::{Datelike, Duration, Local, NaiveDateTime};
use std::cell::OnceCell;
use uuid::Uuid;

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Supported placeholders and their descriptions, in display order
pub const PLACEHOLDERS: &[(&str, &str)] = &[
    ("{{date}}", "Current date (DD/MM/YYYY)"),
    ("{{date-us}}", "Current date (MM/DD/YYYY)"),
    ("{{date-iso}}", "Current date (YYYY-MM-DD)"),
    ("{{time}}", "Current time 24h (HH:MM)"),
    ("{{time12}}", "Current time 12h (HH:MM AM/PM)"),
    ("{{datetime}}", "Date and time (DD/MM/YYYY HH:MM)"),
    ("{{day}}", "Day name (Monday, Tuesday...)"),
    ("{{month}}", "Month name (January, February...)"),
    ("{{year}}", "Current year (YYYY)"),
    ("{{week}}", "ISO week number"),
    ("{{yesterday}}", "Yesterday's date"),
    ("{{tomorrow}}", "Tomorrow's date"),
    ("{{lastweek}}", "Date 7 days ago"),
    ("{{nextweek}}", "Date in 7 days"),
    ("{{user}}", "Current username"),
    ("{{computer}}", "Computer name"),
    ("{{clipboard}}", "Current clipboard content"),
    ("{{uuid}}", "Random UUID"),
    ("{{random}}", "Random 4-digit number"),
];

/// Escape sequences recognised in templates
pub const ESCAPES: &[(&str, &str)] = &[
    ("\\n", "Newline"),
    ("\\r", "Carriage return"),
    ("\\t", "Tab"),
];

/// Expands templates against a fixed instant and a clipboard
pub struct PlaceholderExpander<'a> {
    now: NaiveDateTime,
    clipboard: &'a dyn ClipboardService,
}

impl<'a> PlaceholderExpander<'a> {
    /// Expander pinned to the current local time
    pub fn new(clipboard: &'a dyn ClipboardService) -> Self {
        Self::at(Local::now().naive_local(), clipboard)
    }

    pub fn at(now: NaiveDateTime, clipboard: &'a dyn ClipboardService) -> Self {
        Self { now, clipboard }
    }

    pub fn expand(&self, template: &str) -> String {
        let clipboard_text = OnceCell::new();
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['\\', '{']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix('\\') {
                let escaped = match after.chars().next() {
                    Some('n') => Some('\n'),
                    Some('r') => Some('\r'),
                    Some('t') => Some('\t'),
                    _ => None,
                };
                match escaped {
                    Some(c) => {
                        out.push(c);
                        rest = &after[1..];
                    }
                    None => {
                        out.push('\\');
                        rest = after;
                    }
                }
                continue;
            }

            if let Some(inner) = tail.strip_prefix("{{") {
                if let Some(end) = inner.find("}}") {
                    if let Some(value) = self.resolve(&inner[..end], &clipboard_text) {
                        out.push_str(&value);
                        rest = &inner[end + 2..];
                        continue;
                    }
                }
            }

            out.push('{');
            rest = &tail[1..];
        }

        out.push_str(rest);
        out
    }

    fn resolve(&self, token: &str, clipboard_text: &OnceCell<String>) -> Option<String> {
        let now = self.now;
        let value = match token {
            "date" => now.format(DATE_FORMAT).to_string(),
            "date-us" => now.format("%m/%d/%Y").to_string(),
            "date-iso" => now.format("%Y-%m-%d").to_string(),
            "time" => now.format("%H:%M").to_string(),
            "time12" => now.format("%I:%M %p").to_string(),
            "datetime" => now.format("%d/%m/%Y %H:%M").to_string(),
            "day" => now.format("%A").to_string(),
            "month" => now.format("%B").to_string(),
            "year" => now.format("%Y").to_string(),
            "week" => now.iso_week().week().to_string(),
            "yesterday" => shifted(now, -1),
            "tomorrow" => shifted(now, 1),
            "lastweek" => shifted(now, -7),
            "nextweek" => shifted(now, 7),
            "user" => whoami::username(),
            "computer" => whoami::fallible::hostname().unwrap_or_else(|_| whoami::devicename()),
            "clipboard" => clipboard_text
                .get_or_init(|| self.clipboard.get_text().unwrap_or_default())
                .clone(),
            "uuid" => Uuid::new_v4().to_string(),
            "random" => random_four_digits().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn shifted(now: NaiveDateTime, days: i64) -> String {
    (now + Duration::days(days)).format(DATE_FORMAT).to_string()
}

fn random_four_digits() -> u32 {
    1000 + (Uuid::new_v4().as_u128() % 9000) as u32
}
