use chrono::NaiveDate;
use ledgerbook::batch::commit_batch;
use ledgerbook::db::Db;
use ledgerbook::domain::{CategorySpec, RecordSpec, RecordType, ReportSpec};
use ledgerbook::error::LedgerError;
use rust_decimal::Decimal;

fn spec(description: &str, cents: i64, record_type: RecordType, day: u32, category_id: i64) -> RecordSpec {
    RecordSpec {
        description: description.to_string(),
        amount: Decimal::new(cents, 2),
        record_type,
        transaction_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        category_id,
    }
}

fn setup() -> (Db, i64, i64) {
    let db = Db::open_in_memory().unwrap();
    let cat = db
        .create_category(&CategorySpec::new("Bills", None).unwrap())
        .unwrap()
        .id;
    let report = db
        .create_report(&ReportSpec::parse("May", "2024-05-01", "2024-05-31", None).unwrap())
        .unwrap()
        .id;
    (db, cat, report)
}

#[test]
fn valid_batch_creates_and_links_every_record() {
    let (mut db, cat, report) = setup();
    let specs = vec![
        spec("Power", 8_000, RecordType::Expense, 3, cat),
        spec("Water", 2_550, RecordType::Expense, 4, cat),
        spec("Refund", 1_000, RecordType::Income, 5, cat),
    ];

    let ids = commit_batch(&mut db, report, &specs).unwrap();

    assert_eq!(ids.len(), 3);
    let members = db.list_report_members(report).unwrap();
    assert_eq!(members.len(), 3);
    let mut member_ids: Vec<i64> = members.iter().map(|m| m.record.id).collect();
    member_ids.sort();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(member_ids, sorted);
    assert_eq!(db.list_finance_records().unwrap().len(), 3);
}

#[test]
fn store_failure_mid_batch_rolls_everything_back() {
    let (mut db, cat, report) = setup();
    let specs = vec![
        spec("Power", 8_000, RecordType::Expense, 3, cat),
        spec("Ghost", 100, RecordType::Expense, 4, 999),
        spec("Water", 2_550, RecordType::Expense, 5, cat),
    ];

    let err = commit_batch(&mut db, report, &specs).unwrap_err();

    match err {
        LedgerError::BatchPartialFailure { index, total, source } => {
            assert_eq!(index, 1);
            assert_eq!(total, 3);
            assert!(matches!(*source, LedgerError::Store(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(db.list_finance_records().unwrap().is_empty());
    assert!(db.list_report_members(report).unwrap().is_empty());
}

#[test]
fn invalid_item_rejects_the_batch_before_writing() {
    let (mut db, cat, report) = setup();
    let specs = vec![
        spec("Power", 8_000, RecordType::Expense, 3, cat),
        spec("Negative", -500, RecordType::Expense, 4, cat),
    ];

    let err = commit_batch(&mut db, report, &specs).unwrap_err();

    match err {
        LedgerError::BatchPartialFailure { index, source, .. } => {
            assert_eq!(index, 1);
            assert!(matches!(*source, LedgerError::Validation { field: "amount", .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(db.list_finance_records().unwrap().is_empty());
}

#[test]
fn unknown_report_is_not_found_and_writes_nothing() {
    let (mut db, cat, _) = setup();
    let specs = vec![spec("Power", 8_000, RecordType::Expense, 3, cat)];

    let err = commit_batch(&mut db, 42, &specs).unwrap_err();

    assert!(err.is_not_found());
    assert!(db.list_finance_records().unwrap().is_empty());
}

#[test]
fn empty_batch_is_a_no_op() {
    let (mut db, _, report) = setup();

    let ids = commit_batch(&mut db, report, &[]).unwrap();

    assert!(ids.is_empty());
    assert!(db.list_report_members(report).unwrap().is_empty());
}

#[test]
fn earlier_batches_survive_a_later_rollback() {
    let (mut db, cat, report) = setup();
    commit_batch(&mut db, report, &[spec("Power", 8_000, RecordType::Expense, 3, cat)]).unwrap();

    let bad = vec![
        spec("Water", 2_550, RecordType::Expense, 4, cat),
        spec("Ghost", 100, RecordType::Expense, 5, 999),
    ];
    assert!(commit_batch(&mut db, report, &bad).is_err());

    let members = db.list_report_members(report).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].record.description, "Power");
}

#[test]
fn batch_items_parse_from_json() {
    let raw = r#"[
        {"description": "Power", "amount": "80.00", "type": "expense", "date": "2024-05-03", "category_id": 1},
        {"description": "Refund", "amount": "10", "type": "income", "transaction_date": "2024-05-04", "category_id": 1}
    ]"#;
    let specs: Vec<RecordSpec> = serde_json::from_str(raw).unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[1].record_type, RecordType::Income);

    let unknown = r#"[{"description": "x", "amount": "1", "type": "expense", "date": "2024-05-03", "category_id": 1, "settled": true}]"#;
    assert!(serde_json::from_str::<Vec<RecordSpec>>(unknown).is_err());

    let bad_type = r#"[{"description": "x", "amount": "1", "type": "transfer", "date": "2024-05-03", "category_id": 1}]"#;
    assert!(serde_json::from_str::<Vec<RecordSpec>>(bad_type).is_err());
}
