//! Monthly rollups across reports.
//!
//! A record counts toward the month its report starts in, not the month of its
//! own transaction date.

use crate::domain::{RecordType, ReportWithRecords};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Longest window the dashboard will build.
pub const MAX_MONTHS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn months_back(self, n: u32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month) - 1 - i64::from(n);
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Short label such as "Jan 24".
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%b %y").to_string())
            .unwrap_or_else(|| format!("{:04}-{:02}", self.year, self.month))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MonthTotals {
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub label: String,
    #[serde(flatten)]
    pub key: MonthKey,
    /// Signed sum per category; every known category is present.
    pub amounts: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSnapshot {
    pub label: String,
    #[serde(flatten)]
    pub totals: MonthTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub categories: Vec<String>,
    /// Oldest month first, ending with the current month.
    pub months: Vec<MonthBucket>,
    pub current_month: MonthSnapshot,
    pub previous_month: MonthSnapshot,
    pub income_change_pct: Decimal,
    pub expense_change_pct: Decimal,
}

/// The `n` months ending with the month of `today`, oldest first.
/// `n` is capped at [`MAX_MONTHS`].
pub fn trailing_months(today: NaiveDate, n: u32) -> Vec<MonthKey> {
    let current = MonthKey::of(today);
    (0..n.min(MAX_MONTHS))
        .rev()
        .map(|back| current.months_back(back))
        .collect()
}

pub fn compute_dashboard(reports: &[ReportWithRecords], today: NaiveDate, months: u32) -> Dashboard {
    let categories: Vec<String> = reports
        .iter()
        .flat_map(|r| r.records.iter())
        .filter_map(|m| m.category_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let keys = trailing_months(today, months);
    let mut matrix: BTreeMap<MonthKey, BTreeMap<String, Decimal>> = keys
        .iter()
        .map(|k| {
            let zeroed = categories
                .iter()
                .map(|c| (c.clone(), Decimal::ZERO))
                .collect();
            (*k, zeroed)
        })
        .collect();

    for r in reports {
        let Some(row) = matrix.get_mut(&MonthKey::of(r.report.start_date)) else {
            continue;
        };
        for m in &r.records {
            if let Some(name) = &m.category_name {
                *row.entry(name.clone()).or_insert(Decimal::ZERO) += m.record.signed_amount();
            }
        }
    }

    let months = keys
        .iter()
        .map(|k| MonthBucket {
            label: k.label(),
            key: *k,
            amounts: matrix.remove(k).unwrap_or_default(),
        })
        .collect();

    let current_key = MonthKey::of(today);
    let previous_key = current_key.months_back(1);
    let current = month_totals(reports, current_key);
    let previous = month_totals(reports, previous_key);

    Dashboard {
        categories,
        months,
        current_month: MonthSnapshot {
            label: current_key.label(),
            totals: current,
        },
        previous_month: MonthSnapshot {
            label: previous_key.label(),
            totals: previous,
        },
        income_change_pct: pct_change(current.income, previous.income).round_dp(2),
        expense_change_pct: pct_change(current.expense, previous.expense).round_dp(2),
    }
}

/// Income, expense and net of every report starting in `key`'s month.
pub fn month_totals(reports: &[ReportWithRecords], key: MonthKey) -> MonthTotals {
    let mut out = MonthTotals::default();
    for r in reports
        .iter()
        .filter(|r| MonthKey::of(r.report.start_date) == key)
    {
        for m in &r.records {
            match m.record.record_type {
                RecordType::Income => out.income += m.record.amount,
                RecordType::Expense => out.expense += m.record.amount,
            }
        }
    }
    out.net = out.income - out.expense;
    out
}

pub fn pct_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return if current > Decimal::ZERO {
            Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
    }
    (current - previous) / previous.abs() * Decimal::ONE_HUNDRED
}
