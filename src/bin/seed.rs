use std::{error::Error, process::exit, sync::Mutex};

use clap::Parser;
use rusqlite::Connection;

use salesboard::{HttpSeedSource, initialize_db, run_ingestion};

/// The default location of the product transaction seed feed.
const DEFAULT_SEED_URL: &str = "https://s3.amazonaws.com/roxiler.com/product_transaction.json";

/// A utility for seeding the dashboard database from the JSON feed without
/// starting the server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The URL of the JSON seed feed.
    #[arg(long, default_value = DEFAULT_SEED_URL)]
    seed_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("Opening database at {}", args.db_path);
    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    let source = HttpSeedSource::new(&args.seed_url);
    println!("Fetching seed data from {}", args.seed_url);

    match run_ingestion(&source, &Mutex::new(connection)).await {
        Ok(loaded) => {
            println!("Success! Loaded {loaded} transactions.");
            Ok(())
        }
        Err(error) => {
            eprintln!("Seeding failed: {error}");
            exit(1);
        }
    }
}
