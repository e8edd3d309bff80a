use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize};

/// One club-season row of the statistics sheet. Field names on the wire are the
/// sheet's column headers so that rows round-trip to the frontend unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClubRecord {
    #[serde(rename = "Club")]
    pub club: String,
    #[serde(rename = "Wins", default, deserialize_with = "lenient_float")]
    pub wins: Option<f64>,
    #[serde(rename = "Matches Played", default, deserialize_with = "lenient_float")]
    pub matches_played: Option<f64>,
    #[serde(rename = "Total Revenue (£m)", default, deserialize_with = "lenient_float")]
    pub total_revenue: Option<f64>,
    #[serde(rename = "Annual Wages (£m)", default, deserialize_with = "lenient_float")]
    pub annual_wages: Option<f64>,
    #[serde(
        rename = "Transfer Expenditure (£m)",
        default,
        deserialize_with = "lenient_float"
    )]
    pub transfer_expenditure: Option<f64>,
    #[serde(rename = "Transfer Income (£m)", default, deserialize_with = "lenient_float")]
    pub transfer_income: Option<f64>,
    #[serde(rename = "Transfer Balance (£m)", default, deserialize_with = "lenient_float")]
    pub transfer_balance: Option<f64>,
    #[serde(rename = "Number of Players", default, deserialize_with = "lenient_float")]
    pub number_of_players: Option<f64>,
    #[serde(rename = "Weekly Wages (£m)", default, deserialize_with = "lenient_float")]
    pub weekly_wages: Option<f64>,
    #[serde(rename = "Season", default, deserialize_with = "lenient_text")]
    pub season: Option<String>,
    #[serde(rename = "Rank", default, deserialize_with = "lenient_float")]
    pub rank: Option<f64>,
    #[serde(rename = "Points", default, deserialize_with = "lenient_float")]
    pub points: Option<f64>,
    #[serde(rename = "Goal Difference", default, deserialize_with = "lenient_float")]
    pub goal_difference: Option<f64>,
    #[serde(rename = "Rank Change", default, deserialize_with = "lenient_float")]
    pub rank_change: Option<f64>,
    #[serde(rename = "Points Change", default, deserialize_with = "lenient_float")]
    pub points_change: Option<f64>,
    #[serde(
        rename = "Goal Difference Change",
        default,
        deserialize_with = "lenient_float"
    )]
    pub goal_difference_change: Option<f64>,
    #[serde(rename = "Rank Change Category", default, deserialize_with = "lenient_text")]
    pub rank_change_category: Option<String>,
    #[serde(
        rename = "Points Change Category",
        default,
        deserialize_with = "lenient_text"
    )]
    pub points_change_category: Option<String>,
    #[serde(
        rename = "Goal Difference Change Category",
        default,
        deserialize_with = "lenient_text"
    )]
    pub goal_difference_change_category: Option<String>,
    #[serde(rename = "European Competition", default, deserialize_with = "lenient_bool")]
    pub european_competition: Option<bool>,
    #[serde(rename = "Win Percentage", default, deserialize_with = "lenient_float")]
    pub win_percentage: Option<f64>,
    #[serde(rename = "Revenue per Win", default, deserialize_with = "lenient_float")]
    pub revenue_per_win: Option<f64>,
    #[serde(rename = "Wage to Revenue Ratio", default, deserialize_with = "lenient_float")]
    pub wage_to_revenue_ratio: Option<f64>,
    #[serde(rename = "Transfer Efficiency", default, deserialize_with = "lenient_float")]
    pub transfer_efficiency: Option<f64>,
    #[serde(
        rename = "Transfer Net Spend Ratio",
        default,
        deserialize_with = "lenient_float"
    )]
    pub transfer_net_spend_ratio: Option<f64>,
    #[serde(rename = "Revenue per Point", default, deserialize_with = "lenient_float")]
    pub revenue_per_point: Option<f64>,
    #[serde(rename = "Wage per Point", default, deserialize_with = "lenient_float")]
    pub wage_per_point: Option<f64>,
    #[serde(rename = "Points per Player", default, deserialize_with = "lenient_float")]
    pub points_per_player: Option<f64>,
    #[serde(rename = "Revenue per Player", default, deserialize_with = "lenient_float")]
    pub revenue_per_player: Option<f64>,
    #[serde(rename = "Adjusted Rank Change", default, deserialize_with = "lenient_float")]
    pub adjusted_rank_change: Option<f64>,
    #[serde(
        rename = "Adjusted Points Change",
        default,
        deserialize_with = "lenient_float"
    )]
    pub adjusted_points_change: Option<f64>,
    #[serde(rename = "Risk Score", default, deserialize_with = "lenient_float")]
    pub risk_score: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ClubDataset {
    rows: Vec<ClubRecord>,
}

impl ClubDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("open club dataset {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("parse club dataset {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = csv_reader.headers().context("read csv header")?.clone();
        if !headers.iter().any(|h| h == "Club") {
            return Err(anyhow!("missing required column \"Club\""));
        }

        let mut rows = Vec::new();
        for (idx, row) in csv_reader.deserialize::<ClubRecord>().enumerate() {
            let row = row.with_context(|| format!("decode row {}", idx + 1))?;
            rows.push(row);
        }
        Ok(Self::from_rows(rows))
    }

    /// Builds a dataset from already-decoded rows, filling numeric gaps with
    /// column means.
    pub fn from_rows(mut rows: Vec<ClubRecord>) -> Self {
        impute_mean_rows(&mut rows);
        Self { rows }
    }

    pub fn rows(&self) -> &[ClubRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn club_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if seen.insert(row.club.as_str()) {
                out.push(row.club.clone());
            }
        }
        out
    }

    pub fn rows_for_clubs<S: AsRef<str>>(&self, names: &[S]) -> Vec<&ClubRecord> {
        if names.is_empty() {
            return Vec::new();
        }
        let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        self.rows
            .iter()
            .filter(|row| wanted.contains(row.club.as_str()))
            .collect()
    }
}

fn impute_mean_rows(rows: &mut [ClubRecord]) {
    impute_float(rows, |r| &mut r.wins);
    impute_float(rows, |r| &mut r.matches_played);
    impute_float(rows, |r| &mut r.total_revenue);
    impute_float(rows, |r| &mut r.annual_wages);
    impute_float(rows, |r| &mut r.transfer_expenditure);
    impute_float(rows, |r| &mut r.transfer_income);
    impute_float(rows, |r| &mut r.transfer_balance);
    impute_float(rows, |r| &mut r.number_of_players);
    impute_float(rows, |r| &mut r.weekly_wages);
    impute_float(rows, |r| &mut r.rank);
    impute_float(rows, |r| &mut r.points);
    impute_float(rows, |r| &mut r.goal_difference);
    impute_float(rows, |r| &mut r.rank_change);
    impute_float(rows, |r| &mut r.points_change);
    impute_float(rows, |r| &mut r.goal_difference_change);
    impute_float(rows, |r| &mut r.win_percentage);
    impute_float(rows, |r| &mut r.revenue_per_win);
    impute_float(rows, |r| &mut r.wage_to_revenue_ratio);
    impute_float(rows, |r| &mut r.transfer_efficiency);
    impute_float(rows, |r| &mut r.transfer_net_spend_ratio);
    impute_float(rows, |r| &mut r.revenue_per_point);
    impute_float(rows, |r| &mut r.wage_per_point);
    impute_float(rows, |r| &mut r.points_per_player);
    impute_float(rows, |r| &mut r.revenue_per_player);
    impute_float(rows, |r| &mut r.adjusted_rank_change);
    impute_float(rows, |r| &mut r.adjusted_points_change);
    impute_float(rows, |r| &mut r.risk_score);
}

fn impute_float(rows: &mut [ClubRecord], field: impl Fn(&mut ClubRecord) -> &mut Option<f64>) {
    let mut sum = 0.0;
    let mut n = 0usize;
    for row in rows.iter_mut() {
        if let Some(v) = *field(row) {
            sum += v;
            n += 1;
        }
    }
    if n == 0 {
        return;
    }
    let mean = sum / n as f64;
    for row in rows.iter_mut() {
        field(row).get_or_insert(mean);
    }
}

fn raw_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

fn lenient_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_cell(deserializer)?
        .and_then(|s| s.replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_cell(deserializer)?.and_then(|s| {
        match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "1.0" => Some(true),
            "false" | "no" | "n" | "0" | "0.0" => Some(false),
            _ => None,
        }
    }))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    raw_cell(deserializer)
}
