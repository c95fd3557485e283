use std::collections::BTreeMap;

use chrono::NaiveDate;
use getset::Getters;
use itertools::Itertools;
use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::schema::{EntryPair, Reconciliation, SourceType, TimeEntry};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Both sources have different number of entries: hibihou={hibihou}, kintai={kintai}")]
    CountMismatch { hibihou: usize, kintai: usize },
    #[error("Dates diverge at pair #{index}: hibihou={hibihou}, kintai={kintai}")]
    DateMismatch {
        index: usize,
        hibihou: NaiveDate,
        kintai: NaiveDate,
        /// Pairs classified before the divergence.
        partial: Reconciliation,
    },
}
impl ReconcileError {
    /// Whatever was reconciled before giving up.
    pub fn partial(&self) -> Option<&Reconciliation> {
        match self {
            Self::CountMismatch { .. } => None,
            Self::DateMismatch { partial, .. } => Some(partial),
        }
    }

    pub fn into_partial(self) -> Reconciliation {
        match self {
            Self::CountMismatch { .. } => Reconciliation::default(),
            Self::DateMismatch { partial, .. } => partial,
        }
    }
}

/// Pairs hibihou and kintai entries by their position after sorting each
/// source by date.
///
/// Both sources are expected to cover exactly the same days.  If the counts
/// differ nothing is paired; if the dates diverge, pairing stops at the first
/// divergence and the pairs made so far are returned inside the error.
pub fn reconcile(entries: Vec<TimeEntry>) -> Result<Reconciliation, ReconcileError> {
    let (hibihou, kintai) = split_by_source(entries);
    if hibihou.len() != kintai.len() {
        let err = ReconcileError::CountMismatch {
            hibihou: hibihou.len(),
            kintai: kintai.len(),
        };
        warn!("{err}.  Abort process.");
        return Err(err);
    }

    let mut res = Reconciliation::default();
    for (index, (hibihou, kintai)) in hibihou.into_iter().zip(kintai).enumerate() {
        if hibihou.date() != kintai.date() {
            let err = ReconcileError::DateMismatch {
                index,
                hibihou: hibihou.date(),
                kintai: kintai.date(),
                partial: res,
            };
            warn!("{err}.  Abort process.");
            return Err(err);
        }
        res.push(EntryPair::new(hibihou, kintai));
    }
    Ok(res)
}

/// Stable partition by source, then stable sort of each side by date.
fn split_by_source(entries: Vec<TimeEntry>) -> (Vec<TimeEntry>, Vec<TimeEntry>) {
    let (hibihou, kintai): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|entry| entry.source_type() == SourceType::Hibihou);
    let sort = |entries: Vec<TimeEntry>| {
        entries
            .into_iter()
            .sorted_by_key(|e| e.date())
            .collect_vec()
    };
    (sort(hibihou), sort(kintai))
}

#[derive(Debug, Default, Getters, Serialize)]
#[getset(get = "pub")]
pub struct DateKeyedReconciliation {
    reconciliation: Reconciliation,
    /// Entries with no counterpart on the same day, plus repeated days.
    unpaired: Vec<TimeEntry>,
}
impl DateKeyedReconciliation {
    pub fn into_parts(self) -> (Reconciliation, Vec<TimeEntry>) {
        (self.reconciliation, self.unpaired)
    }
}

/// Pairs entries that share a date, regardless of what else either source
/// reports.  The first entry seen for a given day and source wins.
pub fn reconcile_by_date(entries: Vec<TimeEntry>) -> DateKeyedReconciliation {
    let mut unpaired = vec![];
    let mut by_date = BTreeMap::<NaiveDate, (Option<TimeEntry>, Option<TimeEntry>)>::new();
    for entry in entries {
        let slots = by_date.entry(entry.date()).or_default();
        let slot = match entry.source_type() {
            SourceType::Hibihou => &mut slots.0,
            SourceType::Kintai => &mut slots.1,
        };
        if slot.is_some() {
            unpaired.push(entry);
        } else {
            *slot = Some(entry);
        }
    }

    let mut reconciliation = Reconciliation::default();
    for slots in by_date.into_values() {
        match slots {
            (Some(hibihou), Some(kintai)) => reconciliation.push(EntryPair::new(hibihou, kintai)),
            (Some(lonely), None) | (None, Some(lonely)) => unpaired.push(lonely),
            (None, None) => {}
        }
    }
    if !unpaired.is_empty() {
        warn!("{} entries could not be paired", unpaired.len());
    }
    unpaired.sort_by_key(|e| (e.date(), e.source_type()));
    DateKeyedReconciliation {
        reconciliation,
        unpaired,
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::{reconcile, reconcile_by_date, ReconcileError};
    use crate::{
        parser::{
            parse_str,
            tests::{hibihou_cell, kintai_cell, page, row},
        },
        schema::{tests::entry, SourceType, TimeEntry},
    };

    fn h(date: &str, start: &str, end: &str) -> TimeEntry {
        entry(SourceType::Hibihou, date, start, end)
    }
    fn k(date: &str, start: &str, end: &str) -> TimeEntry {
        entry(SourceType::Kintai, date, start, end)
    }

    fn dates(pairs: &[crate::schema::EntryPair]) -> Vec<String> {
        pairs.iter().map(|p| p.date().to_string()).collect_vec()
    }

    #[test]
    fn balanced_inputs_pair_everything() {
        let entries = vec![
            k("2025-07-03", "09:00", "18:00"),
            h("2025-07-01", "09:00", "18:00"),
            h("2025-07-03", "09:00", "18:00"),
            k("2025-07-01", "09:00", "18:00"),
            h("2025-07-02", "10:00", "19:00"),
            k("2025-07-02", "10:00", "19:30"),
        ];
        let res = reconcile(entries).unwrap();
        assert_eq!(res.len(), 3);
        assert_eq!(dates(res.matching()), ["2025-07-01", "2025-07-03"]);
        assert_eq!(dates(res.mismatching()), ["2025-07-02"]);
        for pair in res.matching().iter().chain(res.mismatching()) {
            assert_eq!(pair.hibihou().source_type(), SourceType::Hibihou);
            assert_eq!(pair.kintai().source_type(), SourceType::Kintai);
            assert_eq!(pair.hibihou().date(), pair.kintai().date());
        }
    }

    #[test]
    fn unequal_counts_abort() {
        let mut entries = (1..=5)
            .map(|d| h(&format!("2025-07-0{d}"), "09:00", "18:00"))
            .collect_vec();
        entries.extend((1..=4).map(|d| k(&format!("2025-07-0{d}"), "09:00", "18:00")));
        let err = reconcile(entries).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::CountMismatch {
                hibihou: 5,
                kintai: 4
            }
        ));
        assert!(err.partial().is_none());
        assert!(err.into_partial().is_empty());
    }

    #[test]
    fn date_divergence_keeps_earlier_pairs() {
        // Kintai skips 07-03 and reports 07-04 instead.
        let entries = vec![
            h("2025-07-01", "09:00", "18:00"),
            h("2025-07-02", "09:00", "18:00"),
            h("2025-07-03", "09:00", "18:00"),
            h("2025-07-05", "09:00", "18:00"),
            k("2025-07-01", "09:00", "18:00"),
            k("2025-07-02", "09:00", "17:00"),
            k("2025-07-04", "09:00", "18:00"),
            k("2025-07-05", "09:00", "18:00"),
        ];
        let err = reconcile(entries).unwrap_err();
        match &err {
            ReconcileError::DateMismatch {
                index,
                hibihou,
                kintai,
                partial,
            } => {
                assert_eq!(*index, 2);
                assert_eq!(hibihou.to_string(), "2025-07-03");
                assert_eq!(kintai.to_string(), "2025-07-04");
                assert_eq!(dates(partial.matching()), ["2025-07-01"]);
                assert_eq!(dates(partial.mismatching()), ["2025-07-02"]);
            }
            otherwise => panic!("Unexpected error: {otherwise:?}"),
        }
        assert_eq!(err.into_partial().len(), 2);
    }

    #[test]
    fn empty_input_is_empty_result() {
        assert!(reconcile(vec![]).unwrap().is_empty());
    }

    #[test]
    fn end_to_end_matching() {
        let html = page(&[row(
            "2025-07-15",
            &hibihou_cell("09:00～18:00", "8h00m"),
            &kintai_cell("09:00～18:00", "8h00m"),
        )]);
        let res = reconcile(parse_str(&html).unwrap().entries).unwrap();
        assert_eq!(dates(res.matching()), ["2025-07-15"]);
        assert!(res.mismatching().is_empty());
    }

    #[test]
    fn end_to_end_mismatching() {
        let html = page(&[row(
            "2025-07-15",
            &hibihou_cell("09:00～18:00", "8h00m"),
            &kintai_cell("09:00～17:30", "8h00m"),
        )]);
        let res = reconcile(parse_str(&html).unwrap().entries).unwrap();
        assert!(res.matching().is_empty());
        assert_eq!(dates(res.mismatching()), ["2025-07-15"]);
        assert_eq!(res.mismatching()[0].span_difference_minutes(), 30);
    }

    #[test]
    fn by_date_reports_unpaired() {
        let entries = vec![
            h("2025-07-01", "09:00", "18:00"),
            h("2025-07-03", "09:00", "18:00"),
            h("2025-07-05", "09:00", "18:00"),
            h("2025-07-05", "10:00", "18:00"),
            k("2025-07-01", "09:00", "18:00"),
            k("2025-07-04", "09:00", "18:00"),
            k("2025-07-05", "09:00", "17:00"),
        ];
        let (res, unpaired) = reconcile_by_date(entries).into_parts();
        assert_eq!(dates(res.matching()), ["2025-07-01"]);
        assert_eq!(dates(res.mismatching()), ["2025-07-05"]);
        // The first hibihou entry of 07-05 is the one paired.
        assert_eq!(
            res.mismatching()[0].hibihou().started_at().to_string(),
            "2025-07-05 09:00:00"
        );
        let unpaired = unpaired
            .iter()
            .map(|e| (e.date().to_string(), e.source_type()))
            .collect_vec();
        assert_eq!(
            unpaired,
            [
                ("2025-07-03".to_owned(), SourceType::Hibihou),
                ("2025-07-04".to_owned(), SourceType::Kintai),
                ("2025-07-05".to_owned(), SourceType::Hibihou),
            ]
        );
    }

    #[test]
    fn by_date_agrees_with_positional_on_aligned_input() {
        let entries = vec![
            h("2025-07-02", "10:00", "19:00"),
            k("2025-07-01", "09:00", "18:00"),
            h("2025-07-01", "09:00", "18:00"),
            k("2025-07-02", "10:00", "19:30"),
        ];
        let positional = reconcile(entries.clone()).unwrap();
        let (by_date, unpaired) = reconcile_by_date(entries).into_parts();
        assert_eq!(positional, by_date);
        assert!(unpaired.is_empty());
    }
}
