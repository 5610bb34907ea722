use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use time::{Duration, OffsetDateTime};

use cashbook::{LedgerRepository, Store};

/// A utility for creating a test ledger database for cashbook.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many days of sample records to create.
    #[arg(long, default_value_t = 45)]
    days: i64,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'ba.sqlite').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'ba.sqlite').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let ledger = LedgerRepository::new(Store::open(output_path)?);

    println!("Creating test employees...");
    let jane = ledger.add_employee("Jane Doe")?;
    let john = ledger.add_employee("John Smith")?;
    let former = ledger.add_employee("Alex Former")?;

    println!("Creating test records...");
    let today = OffsetDateTime::now_utc().date();
    let first_day = today - Duration::days(args.days.max(1) - 1);

    ledger.record_transaction(Some(first_day), "-700", "final pay", Some(former.id))?;
    ledger.dismiss_employee(former.id, first_day)?;

    for day in 0..args.days.max(1) {
        let date = first_day + Duration::days(day);

        ledger.record_transaction(Some(date), &format!("{}.50", 1000 + day * 25), "sales", None)?;

        if day % 3 == 0 {
            ledger.record_transaction(Some(date), "-120,75", "supplies", None)?;
        }

        if day % 14 == 13 {
            ledger.record_transaction(Some(date), "-1500", "", Some(jane.id))?;
            ledger.record_transaction(Some(date), "-1250", "overtime", Some(john.id))?;
        }
    }

    println!("Success!");

    Ok(())
}
