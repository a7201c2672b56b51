// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>


use chrono::NaiveDate;
use clap::Parser;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};
use txc_uploader::{
    configuration::read_config,
    metrics::TracingMetrics,
    store,
    transxchange::bank_holidays::{read_bank_holidays, BankHolidayEntry},
    write_to_database, Configuration, Result, WriteOutcome,
};
use walkdir::WalkDir;

lazy_static::lazy_static! {
    pub static ref GIT_VERSION: String = txc_uploader::binary_full_version(env!("CARGO_PKG_VERSION"));
}

fn get_version() -> &'static str {
    &GIT_VERSION
}

#[derive(Debug, Parser)]
#[command(
    name = "txc2db",
    about = "Load TransXChange documents into a database.",
    version = get_version()
)]
struct Opt {
    /// A TransXChange document converted to JSON, or a directory of such
    /// documents.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Storage key of the document, like `20250213/tnds/WM/file.xml`.
    /// For a directory, the key of each document is this prefix followed by
    /// its path relative to the directory.
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Configuration file, replacing the configuration derived from the key.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// SQLite database, with the operators, localities and stops loaded.
    #[arg(short = 'd', long = "database")]
    database: PathBuf,

    /// Bank holidays file (the gov.uk JSON or a list of events).
    #[arg(short = 'b', long = "bank-holidays")]
    bank_holidays: Option<PathBuf>,

    /// Date used to compute whether the vehicle journeys run.
    #[arg(
        short = 'x',
        long,
        default_value = &**txc_uploader::CURRENT_DATE
    )]
    anchor_date: NaiveDate,

    /// Create the tables before loading.
    #[arg(long)]
    init_schema: bool,
}

fn init_logger() {
    let default_level = LevelFilter::INFO;
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter_subscriber = EnvFilter::try_new(rust_log).unwrap_or_else(|e| {
        eprintln!(
            "invalid {}, falling back to level '{}' - {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            e,
        );
        EnvFilter::new(default_level.to_string())
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter_subscriber)
        .init();
}

// Documents to load, with their storage key
fn documents(input: &Path, key: Option<&str>) -> Result<Vec<(PathBuf, String)>> {
    if input.is_file() {
        let key = key
            .map(str::to_string)
            .unwrap_or_else(|| input.to_string_lossy().into_owned());
        return Ok(vec![(input.to_path_buf(), key)]);
    }
    let mut documents = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let relative_path = path
            .strip_prefix(input)?
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let document_key = match key {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), relative_path),
            None => relative_path,
        };
        documents.push((path.to_path_buf(), document_key));
    }
    Ok(documents)
}

fn read_document(path: &Path) -> Result<serde_json::Value> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn run(opt: Opt) -> Result<()> {
    info!("Launching txc2db...");

    let mut connection = store::open(&opt.database)?;
    if opt.init_schema {
        store::create_schema(&connection)?;
    }
    let bank_holidays: Vec<BankHolidayEntry> = match &opt.bank_holidays {
        Some(path) => read_bank_holidays(path)?,
        None => {
            warn!("No bank holidays file, bank holiday rules are ignored");
            Vec::new()
        }
    };
    let base_configuration = opt.config.as_ref().map(read_config).transpose()?;
    let from_directory = opt.input.is_dir();
    let documents = documents(&opt.input, opt.key.as_deref())?;
    if documents.is_empty() {
        anyhow::bail!("No document found in {:?}", opt.input);
    }

    let metrics = TracingMetrics;
    let mut failures = 0;
    for (path, key) in documents {
        let configuration = match &base_configuration {
            Some(configuration) if from_directory => Configuration {
                key: key.clone(),
                ..configuration.clone()
            },
            Some(configuration) => configuration.clone(),
            None => Configuration::from_key(&key, opt.anchor_date)?,
        };
        let outcome = read_document(&path).and_then(|document| {
            write_to_database(
                &document,
                &configuration,
                &mut connection,
                &metrics,
                &bank_holidays,
            )
        });
        match outcome {
            Ok(WriteOutcome::Written) => {
                info!("Successfully wrote TXC file '{}' to database", key)
            }
            Ok(WriteOutcome::NotWritten(_)) => {
                info!("No data written to database for file '{}'", key)
            }
            Err(err) => {
                error!("Failed to write TXC file '{}': {:?}", key, err);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{} document(s) could not be written", failures);
    }
    Ok(())
}

fn main() {
    init_logger();
    if let Err(err) = run(Opt::parse()) {
        for cause in err.chain() {
            eprintln!("{cause}");
        }
        std::process::exit(1);
    }
}
