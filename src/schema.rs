use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Which of the two attendance systems an entry was read from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum SourceType {
    /// Self-reported daily work log (日々報).
    Hibihou,
    /// Official attendance record (勤怠).
    Kintai,
}
impl SourceType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Hibihou => "日々報",
            Self::Kintai => "勤怠",
        }
    }
}
impl Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The reporting month of a page, in `YYYY-MM` form.
#[derive(
    Clone,
    PartialEq,
    Eq,
    Debug,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
pub struct ReportMonth(String);
impl ReportMonth {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq, Debug, TypedBuilder, CopyGetters, Getters, Serialize, Deserialize)]
pub struct TimeEntry {
    #[getset(get_copy = "pub")]
    date: NaiveDate,
    #[getset(get_copy = "pub")]
    source_type: SourceType,
    #[getset(get_copy = "pub")]
    started_at: NaiveDateTime,
    #[getset(get_copy = "pub")]
    ended_at: NaiveDateTime,
    #[getset(get_copy = "pub")]
    total_duration_minutes: u32,
    #[getset(get = "pub")]
    #[builder(default)]
    details: String,
}
impl TimeEntry {
    /// Minutes between `started_at` and `ended_at`.
    /// Negative if the recorded end precedes the start.
    pub fn span_minutes(&self) -> i64 {
        (self.ended_at - self.started_at).num_minutes()
    }
}

/// A hibihou entry and a kintai entry recorded for the same day.
#[derive(Clone, PartialEq, Eq, Debug, CopyGetters, Getters, Serialize, Deserialize)]
pub struct EntryPair {
    #[getset(get_copy = "pub")]
    date: NaiveDate,
    #[getset(get = "pub")]
    hibihou: TimeEntry,
    #[getset(get = "pub")]
    kintai: TimeEntry,
}
impl EntryPair {
    /// The pair takes its date from the hibihou side.
    /// Callers are responsible for checking that both sides agree.
    pub(crate) fn new(hibihou: TimeEntry, kintai: TimeEntry) -> Self {
        Self {
            date: hibihou.date(),
            hibihou,
            kintai,
        }
    }

    /// Whether both start times and both end times agree to the minute.
    /// Only the time of day is compared.
    pub fn is_matching(&self) -> bool {
        same_clock_minute(self.hibihou.started_at, self.kintai.started_at)
            && same_clock_minute(self.hibihou.ended_at, self.kintai.ended_at)
    }

    pub fn span_difference_minutes(&self) -> u64 {
        (self.hibihou.span_minutes() - self.kintai.span_minutes()).unsigned_abs()
    }
}

fn same_clock_minute(x: NaiveDateTime, y: NaiveDateTime) -> bool {
    (x.hour(), x.minute()) == (y.hour(), y.minute())
}

/// The outcome of pairing up one month of entries.
#[derive(Clone, Default, PartialEq, Eq, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct Reconciliation {
    matching: Vec<EntryPair>,
    mismatching: Vec<EntryPair>,
}
impl Reconciliation {
    pub(crate) fn push(&mut self, pair: EntryPair) {
        if pair.is_matching() {
            self.matching.push(pair);
        } else {
            self.mismatching.push(pair);
        }
    }

    pub fn len(&self) -> usize {
        self.matching.len() + self.mismatching.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
