mod args;
mod output;

use std::io::{self, BufRead};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use mailprobe_lib::{ListKind, ReputationLists, Validator};
use tracing_subscriber::EnvFilter;

use args::Cli;
use output::{OutputRow, any_invalid, write_reports};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let addresses = collect_addresses(&cli)?;
    if addresses.is_empty() {
        bail!("no address given (pass addresses or --stdin)");
    }

    let validator = Validator::new(cli.config(), load_lists(&cli)?).context("build validator")?;
    let results = validator.validate_batch(addresses.iter().cloned());

    // input order, duplicates kept
    let rows: Vec<OutputRow> = addresses
        .iter()
        .filter_map(|address| {
            results.get(address).map(|outcome| OutputRow {
                address: address.clone(),
                outcome: outcome.clone(),
            })
        })
        .collect();

    write_reports(&rows, &cli)?;

    Ok(if any_invalid(&rows) {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "mailprobe_lib=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn collect_addresses(cli: &Cli) -> Result<Vec<String>> {
    let mut addresses = cli.addresses.clone();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                addresses.push(trimmed.to_string());
            }
        }
    }
    Ok(addresses)
}

fn load_lists(cli: &Cli) -> Result<ReputationLists> {
    let mut lists = if cli.no_builtin_lists {
        ReputationLists::new()
    } else {
        ReputationLists::builtin()
    };
    let files = [
        (ListKind::Banned, &cli.banned_list),
        (ListKind::Disposable, &cli.disposable_list),
        (ListKind::Free, &cli.free_list),
    ];
    for (kind, path) in files {
        if let Some(path) = path {
            lists = lists.with_file(kind, path)?;
        }
    }
    Ok(lists)
}
