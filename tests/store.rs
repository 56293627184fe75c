use chrono::NaiveDate;
use ledgerbook::db::Db;
use ledgerbook::domain::{CategorySpec, RecordSpec, RecordType, RecurringSpec, ReportSpec};
use ledgerbook::error::LedgerError;
use rust_decimal::Decimal;

fn setup() -> (Db, i64) {
    let db = Db::open_in_memory().unwrap();
    let cat = db
        .create_category(&CategorySpec::new("Groceries", Some("Food at home")).unwrap())
        .unwrap()
        .id;
    (db, cat)
}

fn record(cat: i64) -> RecordSpec {
    RecordSpec::parse("Market", "12.40", "expense", "2024-02-10", cat).unwrap()
}

#[test]
fn category_names_are_unique_and_required() {
    let (db, _) = setup();

    let dup = db.create_category(&CategorySpec::new("Groceries", None).unwrap());
    assert!(matches!(dup, Err(LedgerError::Store(_))));

    let err = CategorySpec::new("   ", None).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "name", .. }));

    let found = db.find_category_by_name(" Groceries ").unwrap().unwrap();
    assert_eq!(found.description.as_deref(), Some("Food at home"));
    assert!(db.find_category_by_name("Travel").unwrap().is_none());
}

#[test]
fn category_in_use_cannot_be_deleted() {
    let (db, cat) = setup();
    db.create_finance_record(&record(cat)).unwrap();

    assert!(matches!(db.delete_category(cat), Err(LedgerError::Store(_))));
    assert!(db.get_category(cat).is_ok());

    let spare = db
        .create_category(&CategorySpec::new("Spare", None).unwrap())
        .unwrap()
        .id;
    db.delete_category(spare).unwrap();
    assert!(db.get_category(spare).unwrap_err().is_not_found());
}

#[test]
fn missing_rows_are_not_found() {
    let (db, cat) = setup();

    assert!(db.get_report(9).unwrap_err().is_not_found());
    assert!(db.get_finance_record(9).unwrap_err().is_not_found());
    assert!(db.get_recurring(9).unwrap_err().is_not_found());
    assert!(db.list_report_members(9).unwrap_err().is_not_found());
    assert!(db.delete_finance_record(9).unwrap_err().is_not_found());
    assert!(db.set_settled(9, true).unwrap_err().is_not_found());
    assert!(db.update_finance_record(9, &record(cat)).unwrap_err().is_not_found());
    assert!(db.link_record_to_report(9, 1).unwrap_err().is_not_found());
}

#[test]
fn add_to_unknown_report_creates_no_record() {
    let (db, cat) = setup();

    let err = db.add_record_to_report(5, &record(cat)).unwrap_err();

    assert!(matches!(err, LedgerError::NotFound { entity: "report", id: 5 }));
    assert!(db.list_finance_records().unwrap().is_empty());
}

#[test]
fn amounts_must_be_positive_with_two_decimals_at_most() {
    for bad in ["0", "-3", "1.005", "abc", ""] {
        let err = RecordSpec::parse("x", bad, "expense", "2024-01-01", 1).unwrap_err();
        assert!(
            matches!(err, LedgerError::Validation { field: "amount", .. }),
            "{bad}: {err}"
        );
    }
    assert!(RecordSpec::parse("x", "1.50", "expense", "2024-01-01", 1).is_ok());
    assert!(RecordSpec::parse("x", "1.500", "expense", "2024-01-01", 1).is_ok());

    let err = RecordSpec::parse("x", "1", "transfer", "2024-01-01", 1).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "type", .. }));

    let err = RecordSpec::parse("x", "1", "income", "2024-02-30", 1).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "date", .. }));
}

#[test]
fn settled_flag_survives_edits() {
    let (db, cat) = setup();
    let created = db.create_finance_record(&record(cat)).unwrap();
    assert!(!created.settled);

    db.set_settled(created.id, true).unwrap();
    let mut spec = created.to_spec();
    spec.amount = Decimal::new(1999, 2);
    spec.record_type = RecordType::Income;
    let updated = db.update_finance_record(created.id, &spec).unwrap();

    assert!(updated.settled);
    assert_eq!(updated.amount, Decimal::new(1999, 2));
    assert_eq!(updated.signed_amount(), Decimal::new(1999, 2));
    assert_eq!(updated.created_at, created.created_at);
}

#[test]
fn records_list_newest_first() {
    let (db, cat) = setup();
    for day in ["2024-01-05", "2024-03-01", "2024-02-14"] {
        db.create_finance_record(&RecordSpec::parse("r", "1", "expense", day, cat).unwrap())
            .unwrap();
    }

    let dates: Vec<NaiveDate> = db
        .list_finance_records()
        .unwrap()
        .iter()
        .map(|r| r.record.transaction_date)
        .collect();
    assert_eq!(
        dates,
        [
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        ]
    );
}

#[test]
fn deleting_a_report_keeps_its_records() {
    let (db, cat) = setup();
    let report = db
        .create_report(&ReportSpec::parse("Q1", "2024-01-01", "2024-03-31", Some("-20.5")).unwrap())
        .unwrap();
    assert_eq!(report.starting_amount, Decimal::new(-205, 1));
    let entry = db.add_record_to_report(report.id, &record(cat)).unwrap();
    assert_eq!(entry.category_name.as_deref(), Some("Groceries"));

    db.delete_report(report.id).unwrap();

    assert!(db.get_finance_record(entry.record.id).is_ok());
    assert!(db.list_reports_with_members().unwrap().is_empty());
}

#[test]
fn report_edit_bumps_updated_at_only() {
    let (db, _) = setup();
    let report = db
        .create_report(&ReportSpec::parse("Draft", "2024-01-01", "2024-01-31", None).unwrap())
        .unwrap();

    let spec = ReportSpec::parse("Final", "2024-01-01", "2024-01-31", Some("50")).unwrap();
    let updated = db.update_report(report.id, &spec).unwrap();

    assert_eq!(updated.name, "Final");
    assert_eq!(updated.created_at, report.created_at);
    assert!(updated.updated_at >= report.updated_at);
}

#[test]
fn recurring_templates_round_trip_through_the_store() {
    let (db, cat) = setup();
    let any_day = db
        .create_recurring(&RecurringSpec::parse("Gym", "30", "expense", cat, None).unwrap())
        .unwrap();
    assert_eq!(any_day.day_of_the_month, None);

    let spec = RecurringSpec::parse("Gym", "35", "expense", cat, Some(10)).unwrap();
    let updated = db.update_recurring(any_day.id, &spec).unwrap();
    assert_eq!(updated.day_of_the_month, Some(10));
    assert_eq!(updated.amount, Decimal::new(35, 0));

    db.delete_recurring(any_day.id).unwrap();
    assert!(db.list_recurring_templates().unwrap().is_empty());
}

#[test]
fn report_spec_rejects_unknown_json_fields() {
    let ok: ReportSpec =
        serde_json::from_str(r#"{"name": "Jan", "start_date": "2024-01-01", "end_date": "2024-01-31"}"#)
            .unwrap();
    assert_eq!(ok.starting_amount, Decimal::ZERO);

    let bad = serde_json::from_str::<ReportSpec>(
        r#"{"name": "Jan", "start_date": "2024-01-01", "end_date": "2024-01-31", "owner": "me"}"#,
    );
    assert!(bad.is_err());
}
