//! Running balances and totals for a single report.
//!
//! Membership is whatever the store returns for the report's link rows; no
//! date filtering happens here. Records are put in canonical
//! `(transaction_date, id)` order before the prefix sum so the same member set
//! always produces the same balances.

use crate::domain::{CategorizedRecord, FinanceRecord, RecordType, Report};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

pub const UNCATEGORIZED: &str = "(uncategorized)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_amount: Decimal,
    pub total_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceLine {
    #[serde(flatten)]
    pub entry: CategorizedRecord,
    /// Starting amount plus every signed amount up to and including this line.
    pub running_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    #[serde(flatten)]
    pub totals: Totals,
    pub records: Vec<BalanceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    #[serde(flatten)]
    pub report: Report,
    #[serde(flatten)]
    pub totals: Totals,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CategoryTotals {
    pub income: BTreeMap<String, Decimal>,
    pub expense: BTreeMap<String, Decimal>,
}

pub fn compute_report_view(report: Report, members: Vec<CategorizedRecord>) -> ReportView {
    let totals = totals(report.starting_amount, members.iter().map(|m| &m.record));
    let records = running_balances(report.starting_amount, members);
    ReportView {
        report,
        totals,
        records,
    }
}

pub fn summarize(report: Report, members: &[CategorizedRecord]) -> ReportSummary {
    let totals = totals(report.starting_amount, members.iter().map(|m| &m.record));
    ReportSummary {
        report,
        totals,
        record_count: members.len(),
    }
}

pub fn totals<'a>(
    starting_amount: Decimal,
    records: impl IntoIterator<Item = &'a FinanceRecord>,
) -> Totals {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    for r in records {
        match r.record_type {
            RecordType::Income => total_income += r.amount,
            RecordType::Expense => total_expense += r.amount,
        }
    }
    let net_amount = total_income - total_expense;
    Totals {
        total_income,
        total_expense,
        net_amount,
        total_balance: starting_amount + net_amount,
    }
}

pub fn sort_canonical(members: &mut [CategorizedRecord]) {
    members.sort_by_key(|m| (m.record.transaction_date, m.record.id));
}

pub fn running_balances(
    starting_amount: Decimal,
    mut members: Vec<CategorizedRecord>,
) -> Vec<BalanceLine> {
    sort_canonical(&mut members);

    let mut balance = starting_amount;
    members
        .into_iter()
        .map(|entry| {
            balance += entry.record.signed_amount();
            BalanceLine {
                entry,
                running_balance: to_cents(balance),
            }
        })
        .collect()
}

/// Per-category sums split by type, keyed by category name.
pub fn category_totals(members: &[CategorizedRecord]) -> CategoryTotals {
    let mut out = CategoryTotals::default();
    for m in members {
        let name = m
            .category_name
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        let bucket = match m.record.record_type {
            RecordType::Income => &mut out.income,
            RecordType::Expense => &mut out.expense,
        };
        *bucket.entry(name).or_insert(Decimal::ZERO) += m.record.amount;
    }
    out
}

/// Rounds half away from zero and pins the scale to exactly 2 digits.
pub fn to_cents(value: Decimal) -> Decimal {
    let mut out = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    out.rescale(2);
    out
}
