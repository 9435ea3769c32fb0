// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use point_ledger_rs::{PointEngine, UserId};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::warn;

/// Point Ledger - Replay point operation CSV files
///
/// Reads charge/use operations from a CSV file, applies them through the
/// ledger engine, and outputs final balances to stdout.
#[derive(Parser, Debug)]
#[command(name = "point-ledger-rs")]
#[command(about = "Replays point charge/use operations from a CSV file", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,user,amount
    /// Example: cargo run -- operations.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Log level for diagnostic output (e.g. debug, warn)
    #[arg(long)]
    log_level: Option<tracing::Level>,
}

fn main() {
    let args = Args::parse();
    if let Some(log_level) = args.log_level {
        tracing_subscriber::fmt().with_max_level(log_level).init();
    }

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = match replay_operations(BufReader::new(file)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error replaying operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_balances(&engine, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, user, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op_type: String,
    user: i64,
    amount: i64,
}

/// Replays operations from a CSV reader through a fresh engine.
///
/// Parsing streams row by row, so arbitrarily large files never load fully
/// into memory. Malformed rows and rejected operations (invalid arguments,
/// insufficient balance) are logged and skipped; replay continues.
///
/// # CSV Format
///
/// Expected columns: `type, user, amount`
/// - `type`: Operation type (`charge` or `use`)
/// - `user`: User id (positive integer)
/// - `amount`: Point magnitude (positive integer)
///
/// # Example
///
/// ```csv
/// type,user,amount
/// charge,1,1000
/// use,1,300
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn replay_operations<R: Read>(reader: R) -> Result<PointEngine, csv::Error> {
    let engine = PointEngine::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let user_id = UserId(record.user);
                let outcome = match record.op_type.to_lowercase().as_str() {
                    "charge" => engine.charge(user_id, record.amount),
                    "use" => engine.use_points(user_id, record.amount),
                    other => {
                        warn!(op = other, "skipping unknown operation type");
                        continue;
                    }
                };

                if let Err(e) = outcome {
                    warn!(user = %user_id, error = %e, "skipping rejected operation");
                }
            }
            Err(e) => {
                warn!(error = %e, "skipping malformed row");
                continue;
            }
        }
    }

    Ok(engine)
}

/// Writes final balances to a CSV writer.
///
/// Outputs one row per user seen during replay, sorted by user id for
/// deterministic output.
///
/// # CSV Format
///
/// Columns: `user_id, balance, updated_at_millis`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_balances<W: Write>(engine: &PointEngine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut balances = engine.balances();
    balances.sort_by_key(|point| point.user_id);

    for point in balances {
        wtr.serialize(point)?;
    }

    wtr.flush()?;
    Ok(())
}
