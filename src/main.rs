mod calc;
mod cli;
mod config;
mod db;
mod domain;
mod error;
mod ledger;
mod provider;
mod table;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Action, Cli};
use crate::config::{app_paths, load_or_init_config};
use crate::db::Db;
use crate::domain::{RateSnapshot, Report};
use crate::error::TargeterError;
use crate::ledger::{Ledger, LedgerInfo};
use crate::provider::OpenExchangeRates;
use crate::table::Column;

fn main() {
    // A missing .env is fine; the credential may come from the real environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        let code = err
            .downcast_ref::<TargeterError>()
            .map_or(1, TargeterError::exit_code);
        std::process::exit(code);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let action = cli.action()?;

    let paths = app_paths(cli.home.clone())?;
    let (cfg, deductions, cfg_path) = load_or_init_config(&paths)?;
    let (db, db_path) = Db::open(&paths, &cfg.db_filename)?;
    debug!(config = %cfg_path.display(), db = %db_path.display(), "ledger opened");

    let mut ledger = Ledger::new(db, deductions);
    let today = Local::now().date_naive();

    match action {
        Action::Print => print_report(&ledger.report()?),
        Action::Add { name, base_value } => {
            let provider = OpenExchangeRates::new(&cfg.api_base_url, cli.app_id.clone())?;
            let target = ledger.add(&name, base_value, today, &provider)?;
            println!(
                "Added target #{} '{}': base {:.2} -> target {:.2}.",
                target.id, target.name, target.base_value, target.target_value
            );
        }
        Action::Calc {
            base_value,
            target_rate,
        } => {
            let target = ledger.calc(base_value, target_rate)?;
            println!("{}", target.normalize());
        }
        Action::Reset => {
            let removed = ledger.reset()?;
            println!("Removed {removed} target(s).");
        }
        Action::Info => print_info(&ledger.info(today)?),
        Action::Rates { limit } => print_rates(&ledger.rates(limit)?),
    }

    Ok(())
}

fn print_report(report: &Report) {
    if report.is_empty() {
        println!("(no targets)");
        return;
    }

    let rows: Vec<Vec<String>> = report
        .targets
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.name.clone(),
                format!("{:.2}", t.base_value),
                format!("{:.2}", t.target_value),
            ]
        })
        .collect();
    let total = vec![
        String::new(),
        "TOTAL".to_string(),
        format!("{:.2}", report.total.base_value),
        format!("{:.2}", report.total.target_value),
    ];

    let columns = [
        Column::right("ID"),
        Column::left("NAME"),
        Column::right("BASE VALUE (EUR)"),
        Column::right("TARGET VALUE (USD)"),
    ];
    print!("{}", table::render(&columns, &rows, Some(total.as_slice())));
}

fn print_info(info: &LedgerInfo) {
    println!("Active coefficients:");
    let tax_rate = info.deductions.tax_rate();
    if !tax_rate.is_zero() {
        println!("TAX RATE: {tax_rate:.2}%");
    }
    let withhold = info.deductions.additional_withhold();
    if !withhold.is_zero() {
        println!("ADDITIONAL WITHHOLD: {withhold:.2}%");
    }

    match info.usd_eur {
        Some(rate) => println!("USD/EUR ({}): {rate:.4}", info.date),
        None => println!("USD/EUR ({}): not cached yet", info.date),
    }
}

fn print_rates(snapshots: &[RateSnapshot]) {
    if snapshots.is_empty() {
        println!("(no rates)");
        return;
    }

    let rows: Vec<Vec<String>> = snapshots
        .iter()
        .map(|s| {
            vec![
                s.date.to_string(),
                s.eur.to_string(),
                s.usd.to_string(),
                s.gbp.to_string(),
            ]
        })
        .collect();
    let columns = [
        Column::left("DATE"),
        Column::right("EUR"),
        Column::right("USD"),
        Column::right("GBP"),
    ];
    print!("{}", table::render(&columns, &rows, None));
}
