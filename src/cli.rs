use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ledgerbook")]
#[command(about = "Report-based income/expense ledger", long_about = None)]
pub struct Cli {
    /// Override Ledgerbook home directory (config/data subdirs will be created inside it).
    #[arg(long, env = "LEDGERBOOK_HOME")]
    pub home: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Category(CategoryArgs),
    Record(RecordArgs),
    Report(ReportArgs),
    Recurring(RecurringArgs),
    Dashboard(DashboardArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RecordFields {
    /// Positive amount with at most 2 decimals.
    pub amount: String,

    #[arg(long = "type", short = 't', default_value = "expense")]
    pub record_type: String,

    #[arg(long, short = 'm')]
    pub description: String,

    /// Category name, or id when no category has that name.
    #[arg(long, short = 'c')]
    pub category: String,

    /// Transaction date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct RecordPatch {
    #[arg(long)]
    pub amount: Option<String>,

    #[arg(long = "type", short = 't')]
    pub record_type: Option<String>,

    #[arg(long, short = 'm')]
    pub description: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCmd {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Rm {
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub cmd: CategoryCmd,
}

#[derive(Debug, Subcommand)]
pub enum RecordCmd {
    Add(RecordFields),
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    List {
        #[arg(long)]
        json: bool,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        patch: RecordPatch,
    },
    Rm {
        id: i64,
    },
    /// Marks a record settled (or unsettled with --undo).
    Settle {
        id: i64,
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    #[command(subcommand)]
    pub cmd: RecordCmd,
}

#[derive(Debug, Subcommand)]
pub enum ReportCmd {
    Create {
        name: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, allow_hyphen_values = true)]
        starting_amount: Option<String>,
    },
    List {
        #[arg(long)]
        json: bool,
    },
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
        /// Also print income/expense totals per category.
        #[arg(long)]
        by_category: bool,
    },
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        starting_amount: Option<String>,
    },
    Rm {
        id: i64,
    },
    /// Creates a record and links it to the report.
    AddRecord {
        report_id: i64,
        #[command(flatten)]
        fields: RecordFields,
    },
    /// Adds an existing record to the report.
    Link {
        report_id: i64,
        record_id: i64,
    },
    Unlink {
        report_id: i64,
        record_id: i64,
    },
    /// Creates records from a JSON array file in one all-or-nothing batch.
    Batch {
        report_id: i64,
        #[arg(long)]
        file: std::path::PathBuf,
    },
    /// Projects recurring templates into the report's start month and adds them as one batch.
    AddRecurring {
        report_id: i64,
        #[arg(required = true, num_args = 1..)]
        template_ids: Vec<i64>,
    },
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub cmd: ReportCmd,
}

#[derive(Debug, Subcommand)]
pub enum RecurringCmd {
    Add {
        amount: String,
        #[arg(long = "type", short = 't', default_value = "expense")]
        record_type: String,
        #[arg(long, short = 'm')]
        description: String,
        #[arg(long, short = 'c')]
        category: String,
        /// Day of the month (1-31). Unset means "any day".
        #[arg(long)]
        day: Option<u32>,
    },
    List {
        #[arg(long)]
        json: bool,
    },
    Edit {
        id: i64,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long = "type", short = 't')]
        record_type: Option<String>,
        #[arg(long, short = 'm')]
        description: Option<String>,
        #[arg(long, short = 'c')]
        category: Option<String>,
        #[arg(long, conflicts_with = "clear_day")]
        day: Option<u32>,
        #[arg(long)]
        clear_day: bool,
    },
    Rm {
        id: i64,
    },
    /// Shows the record a template would produce, without writing anything.
    Project {
        id: i64,
        /// Use this report's start date.
        #[arg(long, conflicts_with = "start")]
        report: Option<i64>,
        /// Report start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct RecurringArgs {
    #[command(subcommand)]
    pub cmd: RecurringCmd,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Trailing months to show (1-120), current month included. Defaults to the configured value.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub months: Option<u32>,

    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub as_of: Option<String>,

    #[arg(long)]
    pub json: bool,
}
