//! Extraction of per-day time entries from the attendance comparison page.
//!
//! The page carries a single table whose body has one row per day.  Each row
//! starts with a `<th scope="row">` holding the date, followed by exactly two
//! cells: the hibihou column and the kintai column.  A cell looks like
//!
//! ```html
//! <td>
//!   <p>09:51～15:15</p>
//!   <p><b>合計: 5h24m</b></p>
//!   <ul><li>...</li></ul>   <!-- hibihou only -->
//!   <p>休憩: 0h00m</p>       <!-- kintai only -->
//! </td>
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use log::{debug, info};
use scraper::{ElementRef, Html};
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::ExtractorConfig,
    schema::{ReportMonth, SourceType, TimeEntry},
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Could not find the month (`?start=YYYY-MM`) in the document.")]
    MonthNotFound,
    #[error("Could not find an element matching `{0}`.")]
    PatternNotFound(&'static str),
    #[error("Could not parse time range from text: {0:?}")]
    InvalidTimeRange(String),
    #[error("Could not convert time string to a timestamp: {0:?}")]
    InvalidTimeFormat(String),
}

#[derive(Debug, Serialize)]
pub struct AttendancePage {
    pub month: ReportMonth,
    pub entries: Vec<TimeEntry>,
}

pub fn parse_str(html: &str) -> Result<AttendancePage, ParseError> {
    parse(&Html::parse_document(html))
}

pub fn parse(html: &Html) -> Result<AttendancePage, ParseError> {
    parse_with_config(html, &ExtractorConfig::default())
}

pub fn parse_with_config(
    html: &Html,
    config: &ExtractorConfig,
) -> Result<AttendancePage, ParseError> {
    let month = parse_month(html)?;
    // Tables without an explicit body get an implied one from the HTML parser,
    // so look for the first body that carries dated rows.
    let tbody = html
        .select(selector!("tbody"))
        .find(|tbody| {
            tbody
                .select(selector!(r#"th[scope="row"]"#))
                .next()
                .is_some()
        })
        .ok_or(ParseError::PatternNotFound("tbody"))?;

    let mut entries = vec![];
    for tr in tbody.select(selector!("tr")) {
        let Some(date) = parse_row_date(tr) else {
            debug!("Skipping a row without a valid date: {}", tr.html());
            continue;
        };
        let columns = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "td")
            .collect_vec();
        let &[hibihou, kintai] = &columns[..] else {
            debug!("Skipping {date}: expected 2 columns, found {}", columns.len());
            continue;
        };
        for (td, source_type) in [(hibihou, SourceType::Hibihou), (kintai, SourceType::Kintai)] {
            match parse_column(td, date, source_type, config)? {
                Some(entry) => entries.push(entry),
                None => debug!("No {source_type} entry on {date}"),
            }
        }
    }

    info!("Parsed {} entries for {month}", entries.len());
    Ok(AttendancePage { month, entries })
}

fn parse_month(html: &Html) -> Result<ReportMonth, ParseError> {
    html.select(selector!("[value]"))
        .filter_map(|e| e.value().attr("value"))
        .find_map(|value| regex!(r"\?start=([0-9]{4}-[0-9]{2})").captures(value))
        .map(|captures| captures[1].to_owned().into())
        .ok_or(ParseError::MonthNotFound)
}

fn parse_row_date(tr: ElementRef) -> Option<NaiveDate> {
    let th = tr.select(selector!(r#"th[scope="row"]"#)).next()?;
    NaiveDate::parse_from_str(text_of(th).trim(), "%Y-%m-%d").ok()
}

/// Returns `Ok(None)` when the cell lacks the time range or the total label.
fn parse_column(
    td: ElementRef,
    date: NaiveDate,
    source_type: SourceType,
    config: &ExtractorConfig,
) -> Result<Option<TimeEntry>, ParseError> {
    let Some(time_range) = td.select(selector!("p")).next() else {
        return Ok(None);
    };
    let (started_at, ended_at) = parse_time_range(&text_of(time_range), date)?;

    let Some(total) = td.select(selector!("b")).next() else {
        return Ok(None);
    };
    let total_duration_minutes = parse_total_duration(&text_of(total), &config.duration_prefix);

    let details = match source_type {
        SourceType::Hibihou => parse_hibihou_details(td),
        SourceType::Kintai => parse_kintai_details(td, &config.break_marker),
    };

    Ok(Some(
        TimeEntry::builder()
            .date(date)
            .source_type(source_type)
            .started_at(started_at)
            .ended_at(ended_at)
            .total_duration_minutes(total_duration_minutes)
            .details(details)
            .build(),
    ))
}

/// Parses `HH:MM～HH:MM` (full-width or half-width tilde, spaces allowed)
/// into two timestamps on `date`.
pub fn parse_time_range(
    text: &str,
    date: NaiveDate,
) -> Result<(NaiveDateTime, NaiveDateTime), ParseError> {
    let compact = text.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    let parts = compact
        .split(['～', '〜', '~'])
        .filter(|part| !part.is_empty())
        .collect_vec();
    let &[start, end] = &parts[..] else {
        return Err(ParseError::InvalidTimeRange(text.to_owned()));
    };
    Ok((combine(date, start)?, combine(date, end)?))
}

fn combine(date: NaiveDate, time: &str) -> Result<NaiveDateTime, ParseError> {
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| ParseError::InvalidTimeFormat(time.to_owned()))?;
    Ok(date.and_time(time))
}

/// Reads labels such as `合計: 5h24m`, `合計: +24m` or `合計: 5h` as minutes.
/// Missing or unreadable components count as zero.
pub fn parse_total_duration(text: &str, prefix: &str) -> u32 {
    let cleaned = text
        .replace(prefix, "")
        .replace([':', '：', '+'], "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    let Some(captures) = regex!(r"^(?:([0-9]+)h)?(?:([0-9]+)m)?").captures(&cleaned) else {
        return 0;
    };
    let component = |i: usize| {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    component(1).saturating_mul(60).saturating_add(component(2))
}

fn parse_hibihou_details(td: ElementRef) -> String {
    match td.select(selector!("ul")).next() {
        Some(ul) => ul
            .select(selector!("li"))
            .map(|li| text_of(li).trim().to_owned())
            .join("\n"),
        None => String::new(),
    }
}

fn parse_kintai_details(td: ElementRef, break_marker: &str) -> String {
    td.select(selector!("p"))
        .map(|p| text_of(p).trim().to_owned())
        .find(|text| text.contains(break_marker))
        .unwrap_or_default()
}

fn text_of(e: ElementRef) -> String {
    e.text().collect()
}
