#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};
#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use std::path::Path;

use mailprobe_lib::ValidationOutcome;
#[cfg(feature = "with-csv")]
use mailprobe_lib::CheckKind;

use crate::args::{Cli, OutputFormat};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct OutputRow {
    pub address: String,
    #[cfg_attr(feature = "with-serde", serde(flatten))]
    pub outcome: ValidationOutcome,
}

pub fn write_reports(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Human => write_human(rows, cli),
        OutputFormat::Json => write_json(rows, cli),
        OutputFormat::Ndjson => write_ndjson(rows, cli),
        OutputFormat::Csv => write_csv(rows, cli),
    }
}

pub fn any_invalid(rows: &[OutputRow]) -> bool {
    rows.iter().any(|row| !row.outcome.is_valid)
}

fn write_human(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if cli.out.is_some() {
        bail!("--out needs --format json, ndjson or csv");
    }
    for row in rows {
        println!("{:<40} {}", row.address, row.outcome);
        if cli.report {
            for (kind, check) in row.outcome.report.iter() {
                let mark = if check.status { "ok" } else { "FAIL" };
                println!("    {:<22} {mark:<4} {}", kind.name(), check.message);
            }
        }
    }
    Ok(())
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    match &cli.out {
        Some(path) => write_all_atomically(path, s.as_bytes()),
        None => {
            println!("{s}");
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("--format json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let mut buf = Vec::new();
    for row in rows {
        buf.extend_from_slice(serde_json::to_string(row)?.as_bytes());
        buf.push(b'\n');
    }
    match &cli.out {
        Some(path) => write_all_atomically(path, &buf),
        None => {
            print!("{}", String::from_utf8_lossy(&buf));
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("--format ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["address".to_string(), "is_valid".into(), "message".into()];
    header.extend(CheckKind::ALL.iter().map(|kind| kind.name().to_string()));
    wtr.write_record(&header)?;
    for row in rows {
        wtr.write_record(csv_record(row))?;
    }
    let data = wtr.into_inner().context("flush csv writer")?;
    match &cli.out {
        Some(path) => write_all_atomically(path, &data),
        None => {
            print!("{}", String::from_utf8_lossy(&data));
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("--format csv requires the 'with-csv' feature")
}

/// Address, verdict, message, then one status column per check (empty when
/// the check was never reached).
#[cfg(feature = "with-csv")]
fn csv_record(row: &OutputRow) -> Vec<String> {
    let mut record = vec![
        row.address.clone(),
        row.outcome.is_valid.to_string(),
        row.outcome.message.clone(),
    ];
    record.extend(CheckKind::ALL.iter().map(|kind| {
        row.outcome
            .report
            .get(*kind)
            .map(|check| check.status.to_string())
            .unwrap_or_default()
    }));
    record
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = path.with_extension("tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
