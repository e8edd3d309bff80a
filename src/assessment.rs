use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::club_dataset::{ClubDataset, ClubRecord};
use crate::config::ServiceConfig;
use crate::risk_model::load_model;
use crate::strategy::{ScalingSource, StrategySuggester, Suggestion, SuggesterOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskCategory {
    pub fn from_score(score: f64) -> Self {
        if score <= 30.0 {
            RiskCategory::Low
        } else if score <= 60.0 {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Medium => "Medium Risk",
            RiskCategory::High => "High Risk",
        }
    }
}

/// One scored club-season as served to the frontend: the sheet row with its
/// `Risk Score` replaced by the model score, plus category and advice.
#[derive(Debug, Clone, Serialize)]
pub struct ClubRisk {
    #[serde(flatten)]
    pub record: ClubRecord,
    pub strategies: Vec<String>,
    // Key spelling is what the frontend reads.
    #[serde(rename = "Risk Catgeogry")]
    pub risk_category: Option<RiskCategory>,
}

impl ClubRisk {
    pub fn from_suggestion(record: &ClubRecord, suggestion: Suggestion) -> Self {
        let mut record = record.clone();
        record.risk_score = Some(suggestion.risk_score);
        Self {
            record,
            strategies: suggestion.strategies,
            risk_category: Some(RiskCategory::from_score(suggestion.risk_score)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub rows: usize,
    pub clubs: usize,
    pub model_type: &'static str,
    pub trees: usize,
    pub model_source: Option<String>,
    pub scaling: ScalingSource,
    pub loaded_at: String,
}

pub struct RiskService {
    dataset: ClubDataset,
    suggester: StrategySuggester,
    loaded_at: String,
}

impl RiskService {
    pub fn load(config: &ServiceConfig) -> Result<Self> {
        Self::load_from(&config.data_path, &config.model_path, config.suggester)
    }

    pub fn load_from(
        data_path: &Path,
        model_path: &Path,
        options: SuggesterOptions,
    ) -> Result<Self> {
        let dataset = ClubDataset::load(data_path)?;
        let model = load_model(model_path)?;
        let suggester = StrategySuggester::fit(model, &dataset, options)
            .context("prepare strategy suggester")?;
        let service = Self::new(dataset, suggester);
        info!(
            rows = service.dataset.len(),
            clubs = service.dataset.club_names().len(),
            trees = service.suggester.model().trees().len(),
            scaling = ?service.suggester.scaling_source(),
            model_source = service.suggester.model().source().unwrap_or("unknown"),
            "risk service loaded"
        );
        Ok(service)
    }

    pub fn new(dataset: ClubDataset, suggester: StrategySuggester) -> Self {
        Self {
            dataset,
            suggester,
            loaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn dataset(&self) -> &ClubDataset {
        &self.dataset
    }

    pub fn club_names(&self) -> Vec<String> {
        self.dataset.club_names()
    }

    /// Scores every dataset row belonging to one of `names`, in sheet order.
    pub fn assess<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ClubRisk>> {
        let rows = self.dataset.rows_for_clubs(names);
        debug!(requested = names.len(), matched = rows.len(), "assessing clubs");
        rows.par_iter()
            .map(|record| -> Result<ClubRisk> {
                let suggestion = self
                    .suggester
                    .generate(record)
                    .with_context(|| format!("assess {}", record.club))?;
                Ok(ClubRisk::from_suggestion(record, suggestion))
            })
            .collect()
    }

    pub fn status(&self) -> ServiceStatus {
        let model = self.suggester.model();
        ServiceStatus {
            status: "ok",
            rows: self.dataset.len(),
            clubs: self.dataset.club_names().len(),
            model_type: model.model_type().label(),
            trees: model.trees().len(),
            model_source: model.source().map(str::to_string),
            scaling: self.suggester.scaling_source(),
            loaded_at: self.loaded_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_thresholds_are_inclusive() {
        assert_eq!(RiskCategory::from_score(30.0), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(30.01), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(60.0), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(60.5), RiskCategory::High);
        assert_eq!(RiskCategory::from_score(-1.0), RiskCategory::Low);
    }

    #[test]
    fn club_risk_serializes_sheet_keys() {
        let record = ClubRecord {
            club: "Fulham".into(),
            total_revenue: Some(180.5),
            risk_score: Some(12.0),
            ..Default::default()
        };
        let row = ClubRisk {
            record,
            strategies: vec!["keep going".into()],
            risk_category: Some(RiskCategory::Medium),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Club"], "Fulham");
        assert_eq!(json["Total Revenue (£m)"], 180.5);
        assert_eq!(json["Risk Score"], 12.0);
        assert_eq!(json["Risk Catgeogry"], "Medium Risk");
        assert_eq!(json["strategies"][0], "keep going");
        assert!(json["Wins"].is_null());
    }
}
