use crate::batch::commit_batch;
use crate::config::today;
use crate::db::Db;
use crate::domain::{RecordSpec, RecurringTransaction};
use crate::error::LedgerResult;
use chrono::{Datelike, NaiveDate};
use tracing::info;

/// Materializes a template for a report starting on `report_start`.
///
/// Templates without a day of the month land on today's date.
pub fn project(template: &RecurringTransaction, report_start: NaiveDate) -> RecordSpec {
    project_on(template, report_start, today())
}

/// Same as [`project`] with an explicit "today".
pub fn project_on(
    template: &RecurringTransaction,
    report_start: NaiveDate,
    today: NaiveDate,
) -> RecordSpec {
    RecordSpec {
        description: template.description.clone(),
        amount: template.amount,
        record_type: template.record_type,
        transaction_date: projected_date(template.day_of_the_month, report_start, today),
        category_id: template.category_id,
    }
}

/// `day` in the year and month of `report_start`, clamped to the month's last day.
/// Never rejects: 0 is treated as 1 and anything past the month end as the month end.
pub fn projected_date(day: Option<u32>, report_start: NaiveDate, today: NaiveDate) -> NaiveDate {
    let Some(day) = day else {
        return today;
    };

    let (year, month) = (report_start.year(), report_start.month());
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(report_start)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

/// Projects the chosen templates against the report's start date and commits
/// them as one batch. Returns the new record ids in template order.
pub fn add_recurring_to_report(
    db: &mut Db,
    report_id: i64,
    template_ids: &[i64],
) -> LedgerResult<Vec<i64>> {
    let report = db.get_report(report_id)?;

    let mut specs = Vec::with_capacity(template_ids.len());
    for id in template_ids {
        let template = db.get_recurring(*id)?;
        specs.push(project(&template, report.start_date));
    }

    let ids = commit_batch(db, report_id, &specs)?;
    info!(
        report_id,
        count = ids.len(),
        "added recurring transactions to report"
    );
    Ok(ids)
}
