use std::path::PathBuf;

use anyhow::{Context, Result};

use club_risk::assessment::RiskService;
use club_risk::config::{self, ServiceConfig};
use club_risk::risk_export;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter())
        .with_writer(std::io::stderr)
        .init();

    let mut config = ServiceConfig::from_env();
    if let Some(path) = parse_path_arg("--data") {
        config.data_path = path;
    }
    if let Some(path) = parse_path_arg("--model") {
        config.model_path = path;
    }

    let service = RiskService::load(&config).context("load risk service")?;
    let clubs = parse_club_args();
    let clubs = if clubs.is_empty() {
        service.club_names()
    } else {
        clubs
    };
    let assessments = service.assess(&clubs)?;

    println!("Risk report");
    println!("Data: {}", config.data_path.display());
    println!("Model: {}", config.model_path.display());
    println!("Rows scored: {}", assessments.len());
    println!();
    for item in &assessments {
        println!(
            "{:<28} {:<9} {:>7} {}",
            item.record.club,
            item.record.season.as_deref().unwrap_or("n/a"),
            item.record
                .risk_score
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default(),
            item.risk_category.map(|c| c.label()).unwrap_or("n/a")
        );
        for line in item.strategies.iter().skip(1) {
            println!("   - {line}");
        }
    }

    if let Some(path) = parse_path_arg("--xlsx") {
        let report = risk_export::export_assessments(&path, &assessments)?;
        println!();
        println!(
            "Exported {} clubs / {} strategies to {}",
            report.clubs,
            report.strategies,
            path.display()
        );
    }

    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

/// Collects `--club=NAME` / `--club NAME` arguments in order.
fn parse_club_args() -> Vec<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut out = Vec::new();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(name) = arg.strip_prefix("--club=") {
            if !name.trim().is_empty() {
                out.push(name.trim().to_string());
            }
            continue;
        }
        if arg == "--club"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            out.push(next.trim().to_string());
        }
    }
    out
}
