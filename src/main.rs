use anyhow::{Context, Result, anyhow};
use clap::Parser;
use ledgerbook::cli::{
    CategoryCmd, Cli, Command, DashboardArgs, RecordCmd, RecordFields, RecordPatch, RecurringCmd,
    ReportCmd,
};
use ledgerbook::config::{AppConfig, app_paths, load_or_init_config, today};
use ledgerbook::dashboard::compute_dashboard;
use ledgerbook::db::Db;
use ledgerbook::domain::{
    CategorizedRecord, CategorySpec, RecordSpec, RecurringSpec, ReportSpec, parse_amount,
    parse_date,
};
use ledgerbook::error::LedgerError;
use ledgerbook::ledger::{category_totals, compute_report_view, summarize};
use ledgerbook::{batch, logging, recurring};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use tracing::debug;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = app_paths(cli.home.clone())?;
    let (cfg, _cfg_path) = load_or_init_config(&paths)?;
    logging::init(cfg.log_level());

    let (mut db, db_path) = Db::open(&paths, &cfg)?;
    debug!(path = %db_path.display(), "opened ledger");

    match cli.command {
        Command::Category(args) => handle_category(&db, args.cmd),
        Command::Record(args) => handle_record(&db, args.cmd),
        Command::Report(args) => handle_report(&mut db, args.cmd),
        Command::Recurring(args) => handle_recurring(&db, args.cmd),
        Command::Dashboard(args) => handle_dashboard(&db, &cfg, args),
    }
}

fn handle_category(db: &Db, cmd: CategoryCmd) -> Result<()> {
    match cmd {
        CategoryCmd::Add { name, description } => {
            let spec = CategorySpec::new(&name, description.as_deref())?;
            let category = db.create_category(&spec)?;
            println!("Created category {} '{}'.", category.id, category.name);
        }
        CategoryCmd::List => {
            let rows: Vec<Vec<String>> = db
                .list_categories()?
                .into_iter()
                .map(|c| {
                    vec![
                        c.id.to_string(),
                        c.name,
                        c.description.unwrap_or_default(),
                    ]
                })
                .collect();
            if rows.is_empty() {
                println!("(no categories)");
            } else {
                print_table(&["id", "name", "description"], &rows);
            }
        }
        CategoryCmd::Edit {
            id,
            name,
            description,
        } => {
            let current = db.get_category(id)?;
            let spec = CategorySpec::new(
                name.as_deref().unwrap_or(&current.name),
                description.as_deref().or(current.description.as_deref()),
            )?;
            let category = db.update_category(id, &spec)?;
            println!("Updated category {} '{}'.", category.id, category.name);
        }
        CategoryCmd::Rm { id } => {
            db.delete_category(id)
                .with_context(|| format!("Could not delete category {id}"))?;
            println!("Deleted category {id}.");
        }
    }
    Ok(())
}

fn handle_record(db: &Db, cmd: RecordCmd) -> Result<()> {
    match cmd {
        RecordCmd::Add(fields) => {
            let spec = record_spec_from_fields(db, &fields)?;
            let record = db.create_finance_record(&spec)?;
            println!("Created record {}.", record.id);
        }
        RecordCmd::Show { id, json } => {
            let entry = db.get_finance_record(id)?;
            if json {
                print_json(&entry)?;
            } else {
                print_table(&RECORD_HEADERS, &[record_row(&entry)]);
            }
        }
        RecordCmd::List { json } => {
            let entries = db.list_finance_records()?;
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("(no records)");
            } else {
                let rows: Vec<Vec<String>> = entries.iter().map(record_row).collect();
                print_table(&RECORD_HEADERS, &rows);
            }
        }
        RecordCmd::Edit { id, patch } => {
            let current = db.get_finance_record(id)?.record;
            let spec = apply_record_patch(db, &current.to_spec(), &patch)?;
            db.update_finance_record(id, &spec)?;
            println!("Updated record {id}.");
        }
        RecordCmd::Rm { id } => {
            db.delete_finance_record(id)?;
            println!("Deleted record {id}.");
        }
        RecordCmd::Settle { id, undo } => {
            let record = db.set_settled(id, !undo)?;
            let state = if record.settled { "settled" } else { "unsettled" };
            println!("Record {id} marked {state}.");
        }
    }
    Ok(())
}

fn handle_report(db: &mut Db, cmd: ReportCmd) -> Result<()> {
    match cmd {
        ReportCmd::Create {
            name,
            start,
            end,
            starting_amount,
        } => {
            let spec = ReportSpec::parse(&name, &start, &end, starting_amount.as_deref())?;
            let report = db.create_report(&spec)?;
            println!("Created report {} '{}'.", report.id, report.name);
        }
        ReportCmd::List { json } => {
            let mut summaries = Vec::new();
            for report in db.list_reports()? {
                let members = db.list_report_members(report.id)?;
                summaries.push(summarize(report, &members));
            }
            if json {
                print_json(&summaries)?;
            } else if summaries.is_empty() {
                println!("(no reports)");
            } else {
                let rows: Vec<Vec<String>> = summaries
                    .iter()
                    .map(|s| {
                        vec![
                            s.report.id.to_string(),
                            s.report.name.clone(),
                            s.report.start_date.to_string(),
                            s.report.end_date.to_string(),
                            money(s.report.starting_amount),
                            money(s.totals.total_income),
                            money(s.totals.total_expense),
                            money(s.totals.net_amount),
                            money(s.totals.total_balance),
                        ]
                    })
                    .collect();
                print_table(
                    &[
                        "id", "name", "start", "end", "starting", "income", "expense", "net",
                        "balance",
                    ],
                    &rows,
                );
            }
        }
        ReportCmd::Show {
            id,
            json,
            by_category,
        } => {
            let report = db.get_report(id)?;
            let members = db.list_report_members(id)?;
            let by_cat = by_category.then(|| category_totals(&members));
            let view = compute_report_view(report, members);

            if json {
                #[derive(Serialize)]
                struct Out<'a> {
                    #[serde(flatten)]
                    view: &'a ledgerbook::ledger::ReportView,
                    #[serde(skip_serializing_if = "Option::is_none")]
                    category_totals: Option<&'a ledgerbook::ledger::CategoryTotals>,
                }
                return print_json(&Out {
                    view: &view,
                    category_totals: by_cat.as_ref(),
                });
            }

            println!("report\t{}\t{}", view.report.id, view.report.name);
            println!(
                "period\t{}..{}",
                view.report.start_date, view.report.end_date
            );
            println!("starting_amount\t{}", money(view.report.starting_amount));
            println!("total_income\t{}", money(view.totals.total_income));
            println!("total_expense\t{}", money(view.totals.total_expense));
            println!("net_amount\t{}", money(view.totals.net_amount));
            println!("total_balance\t{}", money(view.totals.total_balance));

            if view.records.is_empty() {
                println!("(no records)");
            } else {
                let rows: Vec<Vec<String>> = view
                    .records
                    .iter()
                    .map(|line| {
                        let mut row = record_row(&line.entry);
                        row.push(line.running_balance.to_string());
                        row
                    })
                    .collect();
                let mut headers = RECORD_HEADERS.to_vec();
                headers.push("running_balance");
                print_table(&headers, &rows);
            }

            if let Some(totals) = by_cat {
                for (name, amount) in &totals.income {
                    println!("income\t{name}\t{}", money(*amount));
                }
                for (name, amount) in &totals.expense {
                    println!("expense\t{name}\t{}", money(*amount));
                }
            }
        }
        ReportCmd::Edit {
            id,
            name,
            start,
            end,
            starting_amount,
        } => {
            let current = db.get_report(id)?;
            let start = start.unwrap_or_else(|| current.start_date.to_string());
            let end = end.unwrap_or_else(|| current.end_date.to_string());
            let starting_amount =
                starting_amount.unwrap_or_else(|| current.starting_amount.to_string());
            let spec = ReportSpec::parse(
                name.as_deref().unwrap_or(&current.name),
                &start,
                &end,
                Some(&starting_amount),
            )?;
            db.update_report(id, &spec)?;
            println!("Updated report {id}.");
        }
        ReportCmd::Rm { id } => {
            db.delete_report(id)?;
            println!("Deleted report {id}.");
        }
        ReportCmd::AddRecord { report_id, fields } => {
            let spec = record_spec_from_fields(db, &fields)?;
            let entry = db.add_record_to_report(report_id, &spec)?;
            println!(
                "Created record {} in report {report_id}.",
                entry.record.id
            );
        }
        ReportCmd::Link {
            report_id,
            record_id,
        } => {
            if db.link_record_to_report(report_id, record_id)? {
                println!("Linked record {record_id} to report {report_id}.");
            } else {
                println!("Record {record_id} is already in report {report_id}.");
            }
        }
        ReportCmd::Unlink {
            report_id,
            record_id,
        } => {
            if db.unlink_record_from_report(report_id, record_id)? {
                println!("Unlinked record {record_id} from report {report_id}.");
            } else {
                println!("Record {record_id} is not in report {report_id}.");
            }
        }
        ReportCmd::Batch { report_id, file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let specs: Vec<RecordSpec> = serde_json::from_str(&raw)
                .map_err(|e| LedgerError::validation("batch", e.to_string()))
                .with_context(|| format!("Invalid record batch in {}", file.display()))?;
            let ids = batch::commit_batch(db, report_id, &specs)?;
            println!(
                "Committed {} records to report {report_id}.",
                ids.len()
            );
        }
        ReportCmd::AddRecurring {
            report_id,
            template_ids,
        } => {
            let ids = recurring::add_recurring_to_report(db, report_id, &template_ids)?;
            println!(
                "Added {} recurring records to report {report_id}.",
                ids.len()
            );
        }
    }
    Ok(())
}

fn handle_recurring(db: &Db, cmd: RecurringCmd) -> Result<()> {
    match cmd {
        RecurringCmd::Add {
            amount,
            record_type,
            description,
            category,
            day,
        } => {
            let category_id = resolve_category(db, &category)?;
            let spec = RecurringSpec::parse(&description, &amount, &record_type, category_id, day)?;
            let template = db.create_recurring(&spec)?;
            println!("Created recurring transaction {}.", template.id);
        }
        RecurringCmd::List { json } => {
            let templates = db.list_recurring_templates()?;
            if json {
                print_json(&templates)?;
            } else if templates.is_empty() {
                println!("(no recurring transactions)");
            } else {
                let rows: Vec<Vec<String>> = templates
                    .iter()
                    .map(|t| {
                        vec![
                            t.id.to_string(),
                            t.description.clone(),
                            t.record_type.to_string(),
                            money(t.amount),
                            t.category_id.to_string(),
                            t.day_of_the_month
                                .map(|d| d.to_string())
                                .unwrap_or_else(|| "any".to_string()),
                        ]
                    })
                    .collect();
                print_table(
                    &["id", "description", "type", "amount", "category", "day"],
                    &rows,
                );
            }
        }
        RecurringCmd::Edit {
            id,
            amount,
            record_type,
            description,
            category,
            day,
            clear_day,
        } => {
            let current = db.get_recurring(id)?;
            let category_id = match category {
                Some(raw) => resolve_category(db, &raw)?,
                None => current.category_id,
            };
            let day = if clear_day {
                None
            } else {
                day.or(current.day_of_the_month)
            };
            let spec = RecurringSpec {
                description: description.unwrap_or(current.description),
                amount: match amount {
                    Some(raw) => parse_amount(&raw)?,
                    None => current.amount,
                },
                record_type: match record_type {
                    Some(raw) => raw.parse()?,
                    None => current.record_type,
                },
                category_id,
                day_of_the_month: day,
            };
            db.update_recurring(id, &spec)?;
            println!("Updated recurring transaction {id}.");
        }
        RecurringCmd::Rm { id } => {
            db.delete_recurring(id)?;
            println!("Deleted recurring transaction {id}.");
        }
        RecurringCmd::Project {
            id,
            report,
            start,
            json,
        } => {
            let template = db.get_recurring(id)?;
            let report_start = match (report, start) {
                (Some(report_id), _) => db.get_report(report_id)?.start_date,
                (None, Some(raw)) => parse_date(&raw)?,
                (None, None) => return Err(anyhow!("Pass --report <id> or --start <date>")),
            };
            let spec = recurring::project(&template, report_start);
            if json {
                print_json(&spec)?;
            } else {
                println!(
                    "{}\t{}\t{}\t{}\tcategory {}",
                    spec.transaction_date,
                    spec.record_type,
                    money(spec.amount),
                    spec.description,
                    spec.category_id
                );
            }
        }
    }
    Ok(())
}

fn handle_dashboard(db: &Db, cfg: &AppConfig, args: DashboardArgs) -> Result<()> {
    let as_of = match args.as_of.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };
    let months = args.months.unwrap_or_else(|| cfg.dashboard_months());

    let reports = db.list_reports_with_members()?;
    let dashboard = compute_dashboard(&reports, as_of, months);

    if args.json {
        return print_json(&dashboard);
    }

    for snapshot in [&dashboard.current_month, &dashboard.previous_month] {
        println!(
            "{}\tincome\t{}\texpense\t{}\tnet\t{}",
            snapshot.label,
            money(snapshot.totals.income),
            money(snapshot.totals.expense),
            money(snapshot.totals.net)
        );
    }
    println!(
        "change\tincome\t{:.1}%\texpense\t{:.1}%",
        dashboard.income_change_pct, dashboard.expense_change_pct
    );

    if dashboard.categories.is_empty() {
        println!("(no categories)");
        return Ok(());
    }

    let mut headers = vec!["month"];
    headers.extend(dashboard.categories.iter().map(String::as_str));
    let rows: Vec<Vec<String>> = dashboard
        .months
        .iter()
        .map(|bucket| {
            let mut row = vec![bucket.label.clone()];
            row.extend(
                dashboard
                    .categories
                    .iter()
                    .map(|c| money(bucket.amounts.get(c).copied().unwrap_or_default())),
            );
            row
        })
        .collect();
    print_table(&headers, &rows);
    Ok(())
}

const RECORD_HEADERS: [&str; 7] = [
    "id",
    "date",
    "type",
    "amount",
    "category",
    "settled",
    "description",
];

fn record_row(entry: &CategorizedRecord) -> Vec<String> {
    let r = &entry.record;
    vec![
        r.id.to_string(),
        r.transaction_date.to_string(),
        r.record_type.to_string(),
        money(r.amount),
        entry
            .category_name
            .clone()
            .unwrap_or_else(|| r.category_id.to_string()),
        if r.settled { "yes" } else { "no" }.to_string(),
        r.description.clone(),
    ]
}

fn record_spec_from_fields(db: &Db, fields: &RecordFields) -> Result<RecordSpec> {
    let category_id = resolve_category(db, &fields.category)?;
    let date = fields
        .date
        .clone()
        .unwrap_or_else(|| today().to_string());
    Ok(RecordSpec::parse(
        &fields.description,
        &fields.amount,
        &fields.record_type,
        &date,
        category_id,
    )?)
}

fn apply_record_patch(db: &Db, current: &RecordSpec, patch: &RecordPatch) -> Result<RecordSpec> {
    let category_id = match patch.category.as_deref() {
        Some(raw) => resolve_category(db, raw)?,
        None => current.category_id,
    };
    Ok(RecordSpec::parse(
        patch.description.as_deref().unwrap_or(&current.description),
        &patch
            .amount
            .clone()
            .unwrap_or_else(|| current.amount.to_string()),
        patch
            .record_type
            .as_deref()
            .unwrap_or(current.record_type.as_str()),
        &patch
            .date
            .clone()
            .unwrap_or_else(|| current.transaction_date.to_string()),
        category_id,
    )?)
}

/// Accepts an exact category name, or a numeric id when no category has that name.
fn resolve_category(db: &Db, raw: &str) -> Result<i64> {
    if let Some(c) = db.find_category_by_name(raw)? {
        return Ok(c.id);
    }
    match raw.trim().parse::<i64>() {
        Ok(id) => Ok(db.get_category(id)?.id),
        Err(_) => Err(anyhow!("No such category: '{raw}'")),
    }
}

fn money(value: Decimal) -> String {
    format!("{value:.2}")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if headers.is_empty() {
        println!("(no columns)");
        return;
    }

    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();

    for row in rows {
        for (i, cell) in row.iter().take(cols).enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    fn print_row(cells: &[String], widths: &[usize]) {
        print!("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            print!(" {:width$} |", cell, width = *w);
        }
        println!();
    }

    fn print_sep(widths: &[usize]) {
        print!("|");
        for w in widths {
            print!("{}|", "-".repeat(w + 2));
        }
        println!();
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    print_row(&header_cells, &widths);
    print_sep(&widths);
    for row in rows {
        print_row(row, &widths);
    }
}
