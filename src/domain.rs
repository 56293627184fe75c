use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Exclusive bound on the magnitude of any amount, 10^12.
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Income,
    Expense,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Income => "income",
            RecordType::Expense => "expense",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(RecordType::Income),
            "expense" => Ok(RecordType::Expense),
            other => Err(LedgerError::validation(
                "type",
                format!("expected income or expense, got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceRecord {
    pub id: i64,
    pub description: String,
    /// Always non-negative; the sign comes from `record_type`.
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub transaction_date: NaiveDate,
    pub category_id: i64,
    pub settled: bool,
    pub created_at: DateTime<Utc>,
}

impl FinanceRecord {
    pub fn signed_amount(&self) -> Decimal {
        signed(self.record_type, self.amount)
    }

    pub fn to_spec(&self) -> RecordSpec {
        RecordSpec {
            description: self.description.clone(),
            amount: self.amount,
            record_type: self.record_type,
            transaction_date: self.transaction_date,
            category_id: self.category_id,
        }
    }
}

pub fn signed(record_type: RecordType, amount: Decimal) -> Decimal {
    match record_type {
        RecordType::Income => amount,
        RecordType::Expense => -amount,
    }
}

/// A record joined with its category name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedRecord {
    #[serde(flatten)]
    pub record: FinanceRecord,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub name: String,
    /// Display only. Membership comes from report links, never from dates.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub starting_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A report with its current members, as the dashboard consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWithRecords {
    pub report: Report,
    pub records: Vec<CategorizedRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: i64,
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub category_id: i64,
    pub day_of_the_month: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or editing a finance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordSpec {
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(alias = "date")]
    pub transaction_date: NaiveDate,
    pub category_id: i64,
}

impl RecordSpec {
    pub fn parse(
        description: &str,
        amount: &str,
        record_type: &str,
        date: &str,
        category_id: i64,
    ) -> LedgerResult<Self> {
        let spec = Self {
            description: description.trim().to_string(),
            amount: parse_amount(amount)?,
            record_type: record_type.parse()?,
            transaction_date: parse_date(date)?,
            category_id,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        require_text("description", &self.description)?;
        validate_amount("amount", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSpec {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub starting_amount: Decimal,
}

impl ReportSpec {
    pub fn parse(
        name: &str,
        start_date: &str,
        end_date: &str,
        starting_amount: Option<&str>,
    ) -> LedgerResult<Self> {
        let starting_amount = match starting_amount {
            None => Decimal::ZERO,
            Some(raw) => parse_decimal("starting_amount", raw)?,
        };
        let spec = Self {
            name: name.trim().to_string(),
            start_date: parse_date(start_date)?,
            end_date: parse_date(end_date)?,
            starting_amount,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        require_text("name", &self.name)?;
        check_limit("starting_amount", self.starting_amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecurringSpec {
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub category_id: i64,
    #[serde(default)]
    pub day_of_the_month: Option<u32>,
}

impl RecurringSpec {
    pub fn parse(
        description: &str,
        amount: &str,
        record_type: &str,
        category_id: i64,
        day_of_the_month: Option<u32>,
    ) -> LedgerResult<Self> {
        let spec = Self {
            description: description.trim().to_string(),
            amount: parse_amount(amount)?,
            record_type: record_type.parse()?,
            category_id,
            day_of_the_month,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        require_text("description", &self.description)?;
        validate_amount("amount", self.amount)?;
        if let Some(day) = self.day_of_the_month {
            if !(1..=31).contains(&day) {
                return Err(LedgerError::validation(
                    "day_of_the_month",
                    format!("expected 1-31 or unset, got {day}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategorySpec {
    pub fn new(name: &str, description: Option<&str>) -> LedgerResult<Self> {
        let spec = Self {
            name: name.trim().to_string(),
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        require_text("name", &self.name)
    }
}

pub fn parse_date(raw: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        LedgerError::validation("date", format!("expected YYYY-MM-DD, got '{raw}'"))
    })
}

pub fn parse_amount(raw: &str) -> LedgerResult<Decimal> {
    let amount = parse_decimal("amount", raw)?;
    validate_amount("amount", amount)?;
    Ok(amount)
}

fn parse_decimal(field: &'static str, raw: &str) -> LedgerResult<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| LedgerError::validation(field, format!("'{raw}' is not a decimal")))
}

fn validate_amount(field: &'static str, amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(
            field,
            format!("must be positive, got {amount}"),
        ));
    }
    if amount.normalize().scale() > 2 {
        return Err(LedgerError::validation(
            field,
            format!("at most 2 fractional digits, got {amount}"),
        ));
    }
    check_limit(field, amount)
}

fn check_limit(field: &'static str, amount: Decimal) -> LedgerResult<()> {
    if amount.abs() >= AMOUNT_LIMIT {
        return Err(LedgerError::validation(
            field,
            format!("must be below {AMOUNT_LIMIT} in magnitude, got {amount}"),
        ));
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(field, "must not be empty"));
    }
    Ok(())
}
