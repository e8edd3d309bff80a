use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::assessment::ClubRisk;

pub struct ExportReport {
    pub clubs: usize,
    pub strategies: usize,
}

/// Writes scored clubs to an `.xlsx` workbook with a "Risk" summary sheet and
/// a "Strategies" sheet holding one advice line per row.
pub fn export_assessments(path: &Path, assessments: &[ClubRisk]) -> Result<ExportReport> {
    let mut risk_rows = vec![vec![
        "Club".to_string(),
        "Season".to_string(),
        "Risk Score".to_string(),
        "Risk Category".to_string(),
        "Wage to Revenue Ratio".to_string(),
        "Win Percentage".to_string(),
        "Rank".to_string(),
    ]];
    let mut strategy_rows = vec![vec![
        "Club".to_string(),
        "Season".to_string(),
        "#".to_string(),
        "Strategy".to_string(),
    ]];

    for item in assessments {
        risk_rows.push(risk_row(item));
        let season = item.record.season.clone().unwrap_or_default();
        for (idx, text) in item.strategies.iter().enumerate() {
            strategy_rows.push(vec![
                item.record.club.clone(),
                season.clone(),
                (idx + 1).to_string(),
                text.clone(),
            ]);
        }
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Risk")?;
        write_rows(sheet, &risk_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Strategies")?;
        write_rows(sheet, &strategy_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        clubs: assessments.len(),
        strategies: strategy_rows.len().saturating_sub(1),
    })
}

fn risk_row(item: &ClubRisk) -> Vec<String> {
    let record = &item.record;
    vec![
        record.club.clone(),
        record.season.clone().unwrap_or_default(),
        record
            .risk_score
            .map(|v| format!("{v:.2}"))
            .unwrap_or_default(),
        item.risk_category
            .map(|c| c.label().to_string())
            .unwrap_or_default(),
        opt_to_string(record.wage_to_revenue_ratio),
        opt_to_string(record.win_percentage),
        opt_to_string(record.rank),
    ]
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
