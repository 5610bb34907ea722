use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    process::exit,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use time::{Date, macros::format_description};
use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

use cashbook::{
    CashPage, CashTransaction, Error, ErrorKind, LedgerRepository, Settings, Store,
    backup::{BackupEvent, FolderBackupStorage, start_backup},
    format_amount, format_date, parse_date_offset,
};

/// Records cash operations and salary payments in a local ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long, env = "CASHBOOK_DB_PATH", default_value = "ba.sqlite")]
    db_path: PathBuf,

    /// Days from today that new records default to, e.g. -1 for yesterday.
    #[arg(long, env = "CASHBOOK_DEFAULT_DATE_OFFSET", allow_hyphen_values = true)]
    default_date_offset: Option<String>,

    /// The canonical name of the local timezone, e.g. "Europe/Moscow".
    #[arg(long, env = "CASHBOOK_TIMEZONE")]
    timezone: Option<String>,

    /// How many records the history shows before "--all" is needed.
    #[arg(long, default_value_t = cashbook::DEFAULT_PREVIEW_SIZE)]
    preview_size: usize,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the newest records.
    History {
        /// Show every record instead of the preview.
        #[arg(long)]
        all: bool,

        /// Print the records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Record income (positive sum) or an expense (negative sum).
    Record {
        /// The amount, e.g. 100.00 or -50,00.
        #[arg(allow_hyphen_values = true)]
        sum: String,

        /// The date of the record (YYYY-MM-DD). Defaults to today moved by
        /// the default date offset.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        /// A note about the record.
        #[arg(long, default_value = "")]
        comment: String,

        /// Pay the sum as salary to this employee.
        #[arg(long)]
        employee: Option<i64>,
    },
    /// Delete a record.
    Delete {
        /// The ID of the record.
        id: i64,

        /// Delete without printing the record first.
        #[arg(long)]
        yes: bool,
    },
    /// List the employees who can be paid a salary.
    Employees,
    /// Add an employee.
    AddEmployee {
        /// The employee's full name.
        full_name: String,
    },
    /// Record that an employee has left.
    DismissEmployee {
        /// The ID of the employee.
        id: i64,

        /// The last working day (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// Copy the database file into a backup folder.
    Backup {
        /// The backup folder.
        #[arg(long)]
        to: PathBuf,

        /// A sub-folder of the backup folder to store the file in.
        #[arg(long)]
        destination: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(args.log_file.as_deref());

    let settings = Settings {
        default_date_offset: parse_date_offset(args.default_date_offset.as_deref()),
        preview_size: args.preview_size,
        local_timezone: args.timezone.clone(),
    };

    if let Err(error) = run(args, settings).await {
        print_error(&error);
        exit(match error.kind() {
            ErrorKind::Validation => 2,
            _ => 1,
        });
    }
}

async fn run(args: Args, settings: Settings) -> Result<(), Error> {
    let Args {
        db_path, command, ..
    } = args;

    let command = match command {
        Command::Backup { to, destination } => return backup(&db_path, to, destination).await,
        command => command,
    };

    let store = Store::open(&db_path)?;
    let mut page = CashPage::open(LedgerRepository::new(store), &settings);

    match command {
        Command::History { all, json } => {
            if all {
                page.load_all();
            }
            print_history(&page, json);
        }
        Command::Record {
            sum,
            date,
            comment,
            employee,
        } => {
            let form = page.form_mut();
            form.date = date.or(form.date).or(Some(settings.today()));
            form.sum = sum;
            form.comment = comment;
            form.employee_id = employee;

            let id = page.save()?;
            println!("Recorded #{id}.");
            print_history(&page, false);
        }
        Command::Delete { id, yes } => {
            if !yes {
                match page.delete_confirmation(id) {
                    Some((_, text)) => println!("Deleting record #{id}:\n{text}"),
                    None => println!("Deleting record #{id}."),
                }
            }

            page.delete(id)?;
            println!("Deleted #{id}.");
        }
        Command::Employees => {
            for employee in page.employees() {
                println!("{:>5}  {}", employee.id, employee.full_name);
            }
        }
        Command::AddEmployee { full_name } => {
            let employee = page.ledger().add_employee(&full_name)?;
            println!("Added {} as #{}.", employee.full_name, employee.id);
        }
        Command::DismissEmployee { id, date } => {
            let date = date.unwrap_or_else(|| settings.today());
            page.ledger().dismiss_employee(id, date)?;
            println!("Dismissed #{id} as of {}.", format_date(date));
        }
        Command::Backup { .. } => unreachable!("handled before the store is opened"),
    }

    Ok(())
}

async fn backup(
    db_path: &Path,
    backup_folder: PathBuf,
    destination: Option<String>,
) -> Result<(), Error> {
    let storage = Arc::new(FolderBackupStorage::new(backup_folder));
    let mut events = start_backup(storage, db_path.to_path_buf(), destination);

    let mut failure = None;
    while let Some(event) = events.recv().await {
        match event {
            BackupEvent::Status(status) => println!("{status}"),
            BackupEvent::Failed(message) => failure = Some(message),
        }
    }

    match failure {
        Some(message) => Err(Error::Io(message)),
        None => Ok(()),
    }
}

fn print_history(page: &CashPage, json: bool) {
    let history = page.history();

    if json {
        match serde_json::to_string_pretty(history.entries()) {
            Ok(text) => println!("{text}"),
            Err(error) => tracing::error!("could not serialize history as JSON: {error}"),
        }
        return;
    }

    println!("{}", history.header());
    if let Some(reason) = history.unavailable_reason() {
        println!("({reason})");
        return;
    }

    for transaction in history.entries() {
        println!("{}", history_line(transaction));
    }

    if history.can_load_all() {
        println!("Use `history --all` to see every record.");
    }
}

fn history_line(transaction: &CashTransaction) -> String {
    format!(
        "{:>5}  {}  {:>12}  {}  {}",
        transaction.id,
        format_date(transaction.date),
        format_amount(transaction.sum),
        transaction.employee_full_name.as_deref().unwrap_or(""),
        transaction.comment.as_deref().unwrap_or(""),
    )
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected a date like 2024-01-05: {error}"))
}

fn setup_logging(log_file: Option<&Path>) {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        );

    let debug_log = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(Arc::new(file))
                    .with_filter(filter::LevelFilter::DEBUG),
            ),
            Err(error) => {
                eprintln!("Could not open log file {}: {error}", path.display());
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn print_error(error: &Error) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
