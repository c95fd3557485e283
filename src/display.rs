use std::fmt::Display;

use chrono::{Datelike, NaiveDateTime, Weekday};
use unicode_width::UnicodeWidthStr;

use crate::{
    config::DisplayLocale,
    schema::{EntryPair, Reconciliation, TimeEntry},
};

/// `HH:MM`
pub fn format_clock_time(timestamp: NaiveDateTime) -> String {
    timestamp.format("%H:%M").to_string()
}

/// Short weekday followed by the day of month, e.g. `Tue 15` or `火 15`.
pub fn format_weekday_day(timestamp: NaiveDateTime, locale: DisplayLocale) -> String {
    match locale {
        DisplayLocale::En => timestamp.format("%a %-d").to_string(),
        DisplayLocale::Ja => format!("{} {}", weekday_ja(timestamp.weekday()), timestamp.day()),
    }
}

fn weekday_ja(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

/// `8時間30分`.  Zero components are left out, so zero minutes is empty.
pub fn format_duration_ja(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.unsigned_abs();
    let (hours, minutes) = (minutes / 60, minutes % 60);
    let hours = if hours == 0 {
        String::new()
    } else {
        format!("{hours}時間")
    };
    let minutes = if minutes == 0 {
        String::new()
    } else {
        format!("{minutes}分")
    };
    if hours.is_empty() && minutes.is_empty() {
        return String::new();
    }
    format!("{sign}{hours}{minutes}")
}

pub fn describe_pair(pair: &EntryPair, locale: DisplayLocale) -> DisplayPair<'_> {
    DisplayPair { pair, locale }
}

pub fn describe_reconciliation(
    reconciliation: &Reconciliation,
    locale: DisplayLocale,
) -> DisplayReconciliation<'_> {
    DisplayReconciliation {
        reconciliation,
        locale,
    }
}

pub struct DisplayPair<'a> {
    pair: &'a EntryPair,
    locale: DisplayLocale,
}
impl Display for DisplayPair<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pair = self.pair;
        write!(
            f,
            "{}",
            format_weekday_day(pair.hibihou().started_at(), self.locale)
        )?;
        if !pair.is_matching() {
            write!(
                f,
                "  差：{}",
                format_duration_ja(pair.span_difference_minutes() as i64)
            )?;
        }
        writeln!(f)?;
        let marker = if pair.is_matching() { '|' } else { '!' };
        for entry in [pair.hibihou(), pair.kintai()] {
            writeln!(f, "  {marker} {}", DisplayEntry(entry))?;
        }
        Ok(())
    }
}

/// Terminal columns taken by the widest source label, `日々報`.
const LABEL_COLUMNS: usize = 6;

struct DisplayEntry<'a>(&'a TimeEntry);
impl Display for DisplayEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entry = self.0;
        let label = entry.source_type().label();
        // Labels are full-width, so pad by terminal columns rather than chars.
        let padding = LABEL_COLUMNS.saturating_sub(label.width());
        write!(f, "{label}{:padding$}", "")?;
        write!(
            f,
            " {} ~ {}",
            format_clock_time(entry.started_at()),
            format_clock_time(entry.ended_at())
        )?;
        write!(f, "  合計：{}", format_duration_ja(entry.span_minutes()))
    }
}

pub struct DisplayReconciliation<'a> {
    reconciliation: &'a Reconciliation,
    locale: DisplayLocale,
}
impl Display for DisplayReconciliation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sections = [
            ("問題あり", self.reconciliation.mismatching()),
            ("問題なし", self.reconciliation.matching()),
        ];
        for (i, (title, pairs)) in sections.into_iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{title} ({})", pairs.len())?;
            for pair in pairs {
                write!(f, "{}", describe_pair(pair, self.locale))?;
            }
        }
        Ok(())
    }
}
