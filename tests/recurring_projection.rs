use chrono::{NaiveDate, Utc};
use ledgerbook::db::Db;
use ledgerbook::domain::{CategorySpec, RecordType, RecurringSpec, RecurringTransaction, ReportSpec};
use ledgerbook::error::LedgerError;
use ledgerbook::recurring::{add_recurring_to_report, days_in_month, project, project_on, projected_date};
use rust_decimal::Decimal;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
}

fn template(day: Option<u32>) -> RecurringTransaction {
    RecurringTransaction {
        id: 7,
        description: "Rent".to_string(),
        amount: Decimal::new(120000, 2),
        record_type: RecordType::Expense,
        category_id: 3,
        day_of_the_month: day,
        created_at: Utc::now(),
    }
}

#[test]
fn day_past_month_end_clamps_to_last_day() {
    let today = date("2024-06-10");
    assert_eq!(projected_date(Some(31), date("2024-04-01"), today), date("2024-04-30"));
    assert_eq!(projected_date(Some(30), date("2024-02-01"), today), date("2024-02-29"));
    assert_eq!(projected_date(Some(29), date("2023-02-01"), today), date("2023-02-28"));
    assert_eq!(projected_date(Some(31), date("2024-12-01"), today), date("2024-12-31"));
}

#[test]
fn day_within_month_is_used_as_is() {
    let today = date("2024-06-10");
    assert_eq!(projected_date(Some(15), date("2024-04-01"), today), date("2024-04-15"));
    assert_eq!(projected_date(Some(1), date("2024-04-01"), today), date("2024-04-01"));
}

#[test]
fn projection_uses_the_start_month_even_before_the_start_day() {
    let today = date("2024-06-10");
    assert_eq!(projected_date(Some(5), date("2024-04-20"), today), date("2024-04-05"));
}

#[test]
fn out_of_range_days_clamp_instead_of_failing() {
    let today = date("2024-06-10");
    assert_eq!(projected_date(Some(0), date("2024-04-01"), today), date("2024-04-01"));
    assert_eq!(projected_date(Some(45), date("2024-04-01"), today), date("2024-04-30"));
}

#[test]
fn unset_day_projects_to_today() {
    let today = date("2024-06-10");
    assert_eq!(projected_date(None, date("2024-04-01"), today), today);

    let before = Utc::now().date_naive();
    let spec = project(&template(None), date("2024-04-01"));
    let after = Utc::now().date_naive();
    assert!(spec.transaction_date == before || spec.transaction_date == after);
}

#[test]
fn projection_copies_template_fields_and_leaves_template_alone() {
    let t = template(Some(31));
    let original = t.clone();

    let spec = project_on(&t, date("2024-04-01"), date("2024-06-10"));

    assert_eq!(spec.description, "Rent");
    assert_eq!(spec.amount, Decimal::new(120000, 2));
    assert_eq!(spec.record_type, RecordType::Expense);
    assert_eq!(spec.category_id, 3);
    assert_eq!(spec.transaction_date, date("2024-04-30"));
    assert_eq!(t, original);
}

#[test]
fn days_in_month_handles_leap_years() {
    assert_eq!(days_in_month(2024, 2), 29);
    assert_eq!(days_in_month(2023, 2), 28);
    assert_eq!(days_in_month(1900, 2), 28);
    assert_eq!(days_in_month(2000, 2), 29);
    assert_eq!(days_in_month(2024, 4), 30);
    assert_eq!(days_in_month(2024, 12), 31);
}

fn seeded_db() -> (Db, i64, i64, i64) {
    let db = Db::open_in_memory().unwrap();
    let housing = db
        .create_category(&CategorySpec::new("Housing", None).unwrap())
        .unwrap()
        .id;
    let report = db
        .create_report(&ReportSpec::parse("April", "2024-04-01", "2024-04-30", Some("500")).unwrap())
        .unwrap()
        .id;
    let rent = db
        .create_recurring(&RecurringSpec::parse("Rent", "1200", "expense", housing, Some(31)).unwrap())
        .unwrap()
        .id;
    (db, housing, report, rent)
}

#[test]
fn add_recurring_creates_linked_records_on_projected_dates() {
    let (mut db, housing, report, rent) = seeded_db();
    let pay = db
        .create_recurring(&RecurringSpec::parse("Pay", "3000", "income", housing, Some(15)).unwrap())
        .unwrap()
        .id;

    let ids = add_recurring_to_report(&mut db, report, &[rent, pay]).unwrap();
    assert_eq!(ids.len(), 2);

    let members = db.list_report_members(report).unwrap();
    assert_eq!(members.len(), 2);

    let rent_record = db.get_finance_record(ids[0]).unwrap().record;
    assert_eq!(rent_record.description, "Rent");
    assert_eq!(rent_record.transaction_date, date("2024-04-30"));
    assert!(!rent_record.settled);

    let pay_record = db.get_finance_record(ids[1]).unwrap().record;
    assert_eq!(pay_record.record_type, RecordType::Income);
    assert_eq!(pay_record.transaction_date, date("2024-04-15"));

    // Templates are not consumed.
    assert_eq!(db.list_recurring_templates().unwrap().len(), 2);
}

#[test]
fn add_recurring_with_unknown_template_writes_nothing() {
    let (mut db, _, report, rent) = seeded_db();

    let err = add_recurring_to_report(&mut db, report, &[rent, 404]).unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {err}");
    assert!(db.list_report_members(report).unwrap().is_empty());
    assert!(db.list_finance_records().unwrap().is_empty());
}

#[test]
fn add_recurring_to_unknown_report_is_not_found() {
    let (mut db, _, _, rent) = seeded_db();

    let err = add_recurring_to_report(&mut db, 99, &[rent]).unwrap_err();

    assert!(matches!(err, LedgerError::NotFound { entity: "report", id: 99 }));
    assert!(db.list_finance_records().unwrap().is_empty());
}

#[test]
fn template_day_is_validated_on_create() {
    let (db, housing, _, _) = seeded_db();

    let err = RecurringSpec::parse("Bad", "10", "expense", housing, Some(32)).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "day_of_the_month", .. }));

    let spec = RecurringSpec {
        description: "Bad".to_string(),
        amount: Decimal::TEN,
        record_type: RecordType::Expense,
        category_id: housing,
        day_of_the_month: Some(0),
    };
    assert!(db.create_recurring(&spec).is_err());
}
