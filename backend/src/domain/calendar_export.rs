//! Calendar export of bill due dates.
//!
//! Every active bill gets one all-day event per covered month, on its due day
//! clamped to that month. Each occurrence has a stable UID built from the bill
//! id and the date, so calendar clients recognise re-exports as updates.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{Bill, YearMonth};

use crate::domain::models::TrackerState;

const PRODUCT_ID: &str = "-//Bill Tracker//EN";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalendarExportError {
    #[error("Invalid month: {0}")]
    InvalidMonth(String),
}

/// One all-day bill occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub uid: String,
    pub start: NaiveDate,
    /// Exclusive end date (the next calendar day)
    pub end: NaiveDate,
    pub summary: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarExportService;

impl CalendarExportService {
    pub fn new() -> Self {
        Self
    }

    /// Events for `months` consecutive months starting at `start_month` (`YYYY-MM`)
    pub fn build_events(
        &self,
        state: &TrackerState,
        start_month: &str,
        months: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarExportError> {
        let start: YearMonth = start_month
            .parse()
            .map_err(|_| CalendarExportError::InvalidMonth(start_month.to_string()))?;

        let events = (0..months)
            .map(|offset| start.add_months(offset))
            .flat_map(move |month| state.active_bills().map(move |bill| Self::event_for(bill, month)))
            .collect();
        Ok(events)
    }

    fn event_for(bill: &Bill, month: YearMonth) -> CalendarEvent {
        let start = month.date_for_day(bill.due_day);
        let end = start.succ_opt().unwrap_or(start);
        let bill_key = if bill.id.is_empty() { "bill" } else { bill.id.as_str() };

        let name = if bill.name.trim().is_empty() {
            "Bill due"
        } else {
            bill.name.as_str()
        };
        let summary = if bill.amount.is_finite() {
            format!("{} — ${:.2}", name, bill.amount)
        } else {
            name.to_string()
        };

        let mut parts = Vec::new();
        if !bill.category.is_empty() {
            parts.push(format!("Category: {}", bill.category));
        }
        if bill.autopay {
            parts.push("Autopay: Yes".to_string());
        }
        if !bill.notes.is_empty() {
            parts.push(format!("Notes: {}", bill.notes));
        }

        CalendarEvent {
            uid: format!("billtracker-{}-{}@local", bill_key, start.format("%Y%m%d")),
            start,
            end,
            summary,
            description: (!parts.is_empty()).then(|| parts.join("\n")),
        }
    }

    /// Render events as an iCalendar document with CRLF line endings
    pub fn render_ics(&self, events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
        let stamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();
        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{}", PRODUCT_ID),
            "CALSCALE:GREGORIAN".to_string(),
            "METHOD:PUBLISH".to_string(),
        ];

        for event in events {
            lines.push("BEGIN:VEVENT".to_string());
            lines.push(format!("UID:{}", event.uid));
            lines.push(format!("DTSTAMP:{}", stamp));
            lines.push(format!("DTSTART;VALUE=DATE:{}", event.start.format("%Y%m%d")));
            lines.push(format!("DTEND;VALUE=DATE:{}", event.end.format("%Y%m%d")));
            lines.push(format!("SUMMARY:{}", escape_text(&event.summary)));
            if let Some(description) = &event.description {
                lines.push(format!("DESCRIPTION:{}", escape_text(description)));
            }
            lines.push("END:VEVENT".to_string());
        }

        lines.push("END:VCALENDAR".to_string());
        lines.iter().map(|line| fold_line(line)).collect::<Vec<_>>().join("\r\n")
    }

    pub fn file_name(&self, start_month: YearMonth, months: u32) -> String {
        if months == 1 {
            format!("bill-tracker_{}_bills.ics", start_month)
        } else {
            format!("bill-tracker_{}_next_{}_months.ics", start_month, months)
        }
    }
}

const MAX_LINE_OCTETS: usize = 75;

/// RFC 5545 TEXT escaping
fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Content lines longer than 75 octets continue on lines starting with a space.
/// Breaks fall on char boundaries, so a line may end a few octets short.
fn fold_line(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / 37);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            folded.push_str("\r\n ");
            width = 1;
        }
        folded.push(c);
        width += len;
    }
    folded
}
