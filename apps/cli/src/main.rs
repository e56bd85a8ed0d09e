mod args;
mod config;
mod logging;

use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use ingest::{SshExecutor, run_extract};
use webextract_core::Credentials;
use webextract_db::{Db, NewTarget, format_interval_start};

use crate::args::{AddHostArgs, Cli, Command, UsageArgs};
use crate::config::CliConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "webextract failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.interval, cli.database, cli.working_file);
    let mut db = open_db(&config.database)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_once(&mut db, &config, cli.json),
        Command::AddHost(args) => add_host(&mut db, args),
        Command::Usage(args) => print_usage(&db, args, cli.json),
    }
}

fn open_db(path: &Path) -> Result<Db, Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(db)
}

fn run_once(db: &mut Db, config: &CliConfig, json: bool) -> Result<(), Box<dyn Error>> {
    let options = config.extract_options();
    let executor = SshExecutor::new(config.ssh_options());
    let stats = run_extract(db, &executor, &options)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "{} host(s), {} location(s) ({} skipped), {} file(s), {} record(s) -> {} bucket(s): {} inserted, {} updated",
            stats.hosts,
            stats.locations,
            stats.locations_skipped,
            stats.files_fetched,
            stats.lines.records_matched,
            stats.buckets,
            stats.rows_inserted,
            stats.rows_updated
        );
    }
    Ok(())
}

fn add_host(db: &mut Db, args: AddHostArgs) -> Result<(), Box<dyn Error>> {
    let target = db.add_target(&NewTarget {
        host: args.host,
        username: args.user,
        credentials: Credentials {
            password: args.password,
            key_file: args.key_file,
        },
        directories: args.directories,
    })?;
    tracing::info!(id = target.id, host = %target.label(), "registered host");
    println!(
        "registered {} (id {}) with {} log location(s)",
        target.label(),
        target.id,
        target.directories.len()
    );
    Ok(())
}

fn print_usage(db: &Db, args: UsageArgs, json: bool) -> Result<(), Box<dyn Error>> {
    let rows = db.list_data_usage(args.tenant)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in rows {
        println!(
            "{}\t{}\t{}\t{}",
            row.tenant_id,
            format_interval_start(&row.interval_start),
            row.interval_minutes,
            row.bytes
        );
    }
    Ok(())
}
