//! Core notice-board model, date handling and text rendering.

use std::fmt;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "deska-core";

/// Rendering used for both publication dates, e.g. `Mon 04.03.2024`.
pub const DATE_DISPLAY_FORMAT: &str = "%a %d.%m.%Y";

/// Downloadable file linked from a notice's detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.filename, self.url)
    }
}

/// One notice-board record.
///
/// Everything except `attachments` is filled from the listing page and never
/// changes afterwards; `attachments` is appended to by the detail pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub published_on: NaiveDate,
    pub published_until: Option<NaiveDate>,
    pub title: String,
    pub entry_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Entry {
    pub fn new(
        title: impl Into<String>,
        entry_url: impl Into<String>,
        published_on: NaiveDate,
        published_until: Option<NaiveDate>,
    ) -> Self {
        Self {
            published_on,
            published_until,
            title: title.into(),
            entry_url: entry_url.into(),
            attachments: Vec::new(),
        }
    }

    pub fn push_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        writeln!(
            f,
            "Published on: {}",
            self.published_on.format(DATE_DISPLAY_FORMAT)
        )?;
        match self.published_until {
            Some(until) => writeln!(f, "Published until: {}", until.format(DATE_DISPLAY_FORMAT))?,
            None => writeln!(f, "Published until: -")?,
        }
        writeln!(f, "URL: {}", self.entry_url)?;
        if !self.attachments.is_empty() {
            writeln!(f, "Attachments:")?;
            for attachment in &self.attachments {
                writeln!(f, "  {attachment}")?;
            }
        }
        Ok(())
    }
}

/// Entries of one scrape run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notices(pub Vec<Entry>);

impl Notices {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self(entries)
    }

    /// Entries published on `cutoff` or later, keeping their relative order.
    pub fn since_including(&self, cutoff: NaiveDate) -> Notices {
        Notices(
            self.0
                .iter()
                .filter(|entry| entry.published_on >= cutoff)
                .cloned()
                .collect(),
        )
    }

    pub fn entries(&self) -> &[Entry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<Entry> {
        self.0
    }
}

impl From<Vec<Entry>> for Notices {
    fn from(entries: Vec<Entry>) -> Self {
        Self(entries)
    }
}

impl fmt::Display for Notices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, entry) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("unexpected date format: {0:?}")]
    UnexpectedFormat(String),
    #[error("invalid {component} {value:?} in date {input:?}")]
    InvalidComponent {
        component: &'static str,
        value: String,
        input: String,
    },
    #[error("date {0:?} is not a valid calendar date")]
    OutOfRange(String),
}

/// Parses the board's `D. M. YYYY` dates, e.g. `"1. 12. 2021"`.
pub fn parse_date(text: &str) -> Result<NaiveDate, DateParseError> {
    let parts: Vec<&str> = text.split('.').collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(DateParseError::UnexpectedFormat(text.to_string()));
    };

    let day: u32 = parse_component("day", day, text)?;
    let month: u32 = parse_component("month", month, text)?;
    let year: i32 = parse_component("year", year, text)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateParseError::OutOfRange(text.to_string()))
}

fn parse_component<T: std::str::FromStr>(
    component: &'static str,
    raw: &str,
    input: &str,
) -> Result<T, DateParseError> {
    raw.trim()
        .parse()
        .map_err(|_| DateParseError::InvalidComponent {
            component,
            value: raw.trim().to_string(),
            input: input.to_string(),
        })
}

/// Today's calendar date in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// First date still shown when looking `days` back from `today`.
pub fn cutoff_days_before(today: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|span| today.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn entry_on(date: NaiveDate) -> Entry {
        Entry::new(
            format!("Notice {date}"),
            format!("https://www.drasov.cz/uredni-deska/{date}"),
            date,
            None,
        )
    }

    fn sample_notices() -> Notices {
        Notices::new(vec![
            entry_on(ymd(2024, 1, 1)),
            entry_on(ymd(2024, 1, 15)),
            entry_on(ymd(2024, 2, 1)),
        ])
    }

    #[test]
    fn parses_board_dates_with_whitespace() {
        assert_eq!(parse_date("1. 12. 2021").unwrap(), ymd(2021, 12, 1));
        assert_eq!(parse_date(" 04 .03.  2024 ").unwrap(), ymd(2024, 3, 4));
    }

    #[test]
    fn parsed_dates_reformat_zero_padded() {
        for (input, expected) in [
            ("1. 2. 2023", "01.02.2023"),
            ("9. 9. 1999", "09.09.1999"),
            ("31. 12. 2024", "31.12.2024"),
            ("15. 10. 2022", "15.10.2022"),
        ] {
            let date = parse_date(input).unwrap();
            assert_eq!(date.format("%d.%m.%Y").to_string(), expected, "input {input}");
        }
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(matches!(
            parse_date("12/1/2021"),
            Err(DateParseError::UnexpectedFormat(_))
        ));
        assert!(matches!(
            parse_date("1. 2021"),
            Err(DateParseError::UnexpectedFormat(_))
        ));
        assert!(matches!(
            parse_date("a. 1. 2021"),
            Err(DateParseError::InvalidComponent { component: "day", .. })
        ));
        assert!(matches!(
            parse_date("1. 12. 2021."),
            Err(DateParseError::UnexpectedFormat(_))
        ));
    }

    #[test]
    fn impossible_calendar_dates_are_rejected() {
        assert!(matches!(
            parse_date("31. 2. 2024"),
            Err(DateParseError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_date("1. 13. 2024"),
            Err(DateParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn since_including_keeps_boundary_date() {
        let filtered = sample_notices().since_including(ymd(2024, 1, 15));
        let dates: Vec<_> = filtered.entries().iter().map(|e| e.published_on).collect();
        assert_eq!(dates, vec![ymd(2024, 1, 15), ymd(2024, 2, 1)]);
    }

    #[test]
    fn since_including_drops_earlier_dates() {
        let notices = sample_notices();
        let filtered = notices.since_including(ymd(2024, 1, 16));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.entries()[0].published_on, ymd(2024, 2, 1));
        assert_eq!(notices.len(), 3);
    }

    #[test]
    fn entry_without_attachments_renders_four_lines() {
        let entry = Entry::new(
            "Notice",
            "https://x/y",
            ymd(2024, 3, 4),
            Some(ymd(2024, 3, 11)),
        );
        let text = entry.to_string();
        assert_eq!(
            text,
            "Title: Notice\n\
             Published on: Mon 04.03.2024\n\
             Published until: Mon 11.03.2024\n\
             URL: https://x/y\n"
        );
        assert_eq!(text.lines().count(), 4);
        assert!(!text.contains("Attachments:"));
    }

    #[test]
    fn entry_with_attachment_appends_block() {
        let mut entry = Entry::new(
            "Notice",
            "https://x/y",
            ymd(2024, 3, 4),
            Some(ymd(2024, 3, 11)),
        );
        entry.push_attachment(Attachment::new("rozpocet.pdf", "/files/rozpocet.pdf"));
        let lines: Vec<_> = entry.to_string().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[4], "Attachments:");
        assert_eq!(lines[5], "  rozpocet.pdf: /files/rozpocet.pdf");
    }

    #[test]
    fn missing_expiry_renders_dash() {
        let entry = Entry::new("Notice", "https://x/y", ymd(2024, 3, 4), None);
        assert!(entry.to_string().contains("Published until: -\n"));
    }

    #[test]
    fn notices_are_separated_by_one_blank_line() {
        let notices = Notices::new(vec![entry_on(ymd(2024, 1, 1)), entry_on(ymd(2024, 1, 2))]);
        let text = notices.to_string();
        assert_eq!(text.matches("\n\n").count(), 1);
        assert!(text.starts_with("Title: Notice 2024-01-01\n"));
        assert!(text.ends_with("URL: https://www.drasov.cz/uredni-deska/2024-01-02\n"));
        assert_eq!(Notices::default().to_string(), "");
    }

    #[test]
    fn cutoff_counts_back_whole_days() {
        assert_eq!(cutoff_days_before(ymd(2024, 3, 1), 30), ymd(2024, 1, 31));
        assert_eq!(cutoff_days_before(ymd(2024, 3, 1), 0), ymd(2024, 3, 1));
    }

    #[test]
    fn entries_serialize_with_iso_dates() {
        let entry = Entry::new("Notice", "https://x/y", ymd(2024, 3, 4), None);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["published_on"], "2024-03-04");
        assert!(json["published_until"].is_null());
    }
}
