use anyhow::{Result, anyhow};
use serde::Serialize;

use crate::attribution::{FactorContribution, rank_factors, shap_values};
use crate::club_dataset::{ClubDataset, ClubRecord};
use crate::features::{FEATURE_COUNT, FeatureRow, feature_vector};
use crate::risk_model::TreeEnsemble;
use crate::scaling::{MinMaxScaler, StandardScaler, train_test_split};

pub const DEFAULT_TOP_FACTORS: usize = 5;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskTier {
    High,
    Medium,
    Low,
    VeryLow,
}

impl RiskTier {
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            RiskTier::High
        } else if score > 50.0 {
            RiskTier::Medium
        } else if score > 20.0 {
            RiskTier::Low
        } else {
            RiskTier::VeryLow
        }
    }

    pub fn headline(self, score: f64) -> String {
        match self {
            RiskTier::High => {
                format!("High Risk (Score: {score:.2}). Urgent action required on key factors.")
            }
            RiskTier::Medium => format!(
                "Medium Risk (Score: {score:.2}). Close monitoring and targeted improvements needed."
            ),
            RiskTier::Low => format!(
                "Low Risk (Score: {score:.2}). Maintain current strategy with minor optimizations."
            ),
            RiskTier::VeryLow => format!(
                "Very Low Risk (Score: {score:.2}). Excellent position. Focus on sustaining performance and exploring growth opportunities."
            ),
        }
    }

    /// Advice for one contributing factor. Factors without canned advice get a
    /// target derived from the factor's SHAP value.
    pub fn factor_strategy(self, factor: &str, shap_value: f64) -> String {
        if let Some(text) = canned_strategy(self, factor) {
            return text.to_string();
        }
        match self {
            RiskTier::High => format!(
                "Address {factor} urgently with a target of {}% improvement to mitigate high risk",
                target_pct(shap_value, 100.0)
            ),
            RiskTier::Medium => format!(
                "Improve {factor} by approximately {}% to reduce risk level",
                target_pct(shap_value, 75.0)
            ),
            RiskTier::Low => format!(
                "Fine-tune {factor} with a target of {}% improvement for continued stability",
                target_pct(shap_value, 50.0)
            ),
            RiskTier::VeryLow => format!(
                "Maintain excellent performance in {factor}. Explore minor optimizations if beneficial"
            ),
        }
    }
}

fn target_pct(shap_value: f64, multiplier: f64) -> i64 {
    ((shap_value * multiplier).trunc() as i64).abs()
}

fn canned_strategy(tier: RiskTier, factor: &str) -> Option<&'static str> {
    let text = match (tier, factor) {
        (RiskTier::High, "Wage to Revenue Ratio") => {
            "Urgently reduce wage bill by 15% or increase revenue streams by 20%"
        }
        (RiskTier::High, "Transfer Efficiency") => {
            "Significantly improve scouting network and focus on selling players at peak value. Aim for 30% increase in transfer profits"
        }
        (RiskTier::High, "Revenue per Player") => {
            "Substantially increase commercial activities and optimize squad size. Target 25% increase in revenue per player"
        }
        (RiskTier::High, "Points Change") => {
            "Invest heavily in performance analytics and coaching staff to improve on-field results. Aim for 10-point improvement next season"
        }
        (RiskTier::High, "Rank") => {
            "Prioritize short-term performance boost to climb league table. Target moving up at least 3 positions"
        }
        (RiskTier::High, "Win Percentage") => {
            "Implement major tactical overhaul and squad improvements. Aim for at least 15% increase in win percentage"
        }
        (RiskTier::High, "Points per Player") => {
            "Focus on significant performance improvement or strategic squad reduction. Aim to increase points gained by at least 5 per player"
        }

        (RiskTier::Medium, "Points Change") => {
            "Invest in performance analytics to improve on-field results. Aim for at least a 5-point improvement"
        }
        (RiskTier::Medium, "Wage per Point") => {
            "Implement performance-based wage structure. Target 10% reduction in wage per point"
        }
        (RiskTier::Medium, "Transfer Net Spend Ratio") => {
            "Balance transfer activity with focus on youth development. Aim to reduce net spend by 20%"
        }
        (RiskTier::Medium, "Revenue per Point") => {
            "Optimize matchday and commercial revenues. Target 15% increase in revenue per point"
        }
        (RiskTier::Medium, "Win Percentage") => {
            "Focus on tactical improvements and player development. Aim for 10% increase in win percentage"
        }
        (RiskTier::Medium, "Rank") => {
            "Implement strategies to climb league table. Target moving up at least 2 positions"
        }

        (RiskTier::Low, "Wage to Revenue Ratio") => {
            "Fine-tune wage structure or explore new revenue streams. Aim for 5% improvement"
        }
        (RiskTier::Low, "Transfer Efficiency") => {
            "Optimize scouting and transfer strategies. Target 10% increase in efficiency"
        }
        (RiskTier::Low, "Revenue per Player") => {
            "Explore innovative commercial opportunities. Aim for 8% increase in revenue per player"
        }
        (RiskTier::Low, "Points Change") => {
            "Implement minor tactical adjustments. Target 2-3 point improvement"
        }
        (RiskTier::Low, "Rank") => {
            "Maintain current league position with an eye on moving up 1 spot"
        }
        (RiskTier::Low, "Win Percentage") => {
            "Focus on incremental improvements in team performance. Aim for 5% increase in win percentage"
        }
        (RiskTier::Low, "Points per Player") => {
            "Slight optimization of squad performance. Target 2-point increase per player"
        }

        (RiskTier::VeryLow, "Wage to Revenue Ratio") => {
            "Maintain current balance. Consider reinvesting in squad or facilities if opportunity arises"
        }
        (RiskTier::VeryLow, "Transfer Efficiency") => {
            "Sustain excellent transfer strategy. Explore opportunities for knowledge sharing within the club"
        }
        (RiskTier::VeryLow, "Revenue per Player") => {
            "Maintain high revenue per player. Explore innovative sponsorship or marketing campaigns"
        }
        (RiskTier::VeryLow, "Points Change") => {
            "Sustain excellent performance. Focus on squad depth and youth development for long-term success"
        }
        (RiskTier::VeryLow, "Rank") => {
            "Excellent league position. Focus on maintaining performance and planning for future seasons"
        }
        (RiskTier::VeryLow, "Win Percentage") => {
            "Outstanding win rate. Emphasize consistency and prepare for potential challenges next season"
        }
        (RiskTier::VeryLow, "Points per Player") => {
            "Excellent points per player ratio. Focus on maintaining squad harmony and gradual improvements"
        }
        _ => return None,
    };
    Some(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingSource {
    /// Statistics shipped inside the model artifact.
    Artifact,
    /// Fitted on the training split of the loaded dataset.
    Dataset,
}

#[derive(Debug, Clone, Copy)]
pub struct SuggesterOptions {
    pub top_factors: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for SuggesterOptions {
    fn default() -> Self {
        Self {
            top_factors: DEFAULT_TOP_FACTORS,
            test_fraction: DEFAULT_TEST_FRACTION,
            split_seed: DEFAULT_SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Prediction mapped onto the training target range, times 100.
    pub risk_score: f64,
    pub raw_prediction: f64,
    pub tier: RiskTier,
    pub strategies: Vec<String>,
    pub factors: Vec<FactorContribution>,
}

#[derive(Debug, Clone)]
pub struct StrategySuggester {
    model: TreeEnsemble,
    feature_scaler: StandardScaler,
    risk_scaler: MinMaxScaler,
    top_factors: usize,
    scaling_source: ScalingSource,
}

impl StrategySuggester {
    pub fn new(
        model: TreeEnsemble,
        feature_scaler: StandardScaler,
        risk_scaler: MinMaxScaler,
        top_factors: usize,
    ) -> Self {
        Self {
            model,
            feature_scaler,
            risk_scaler,
            top_factors: top_factors.clamp(1, FEATURE_COUNT),
            scaling_source: ScalingSource::Artifact,
        }
    }

    /// Prefers the scaler statistics stored with the model; otherwise fits
    /// both scalers on the training split of `dataset`.
    pub fn fit(
        model: TreeEnsemble,
        dataset: &ClubDataset,
        options: SuggesterOptions,
    ) -> Result<Self> {
        if let Some(params) = model.scaling().cloned() {
            let (feature_scaler, risk_scaler) = params.into_scalers()?;
            return Ok(Self::new(
                model,
                feature_scaler,
                risk_scaler,
                options.top_factors,
            ));
        }

        let labelled: Vec<&ClubRecord> = dataset
            .rows()
            .iter()
            .filter(|r| r.risk_score.is_some())
            .collect();
        if labelled.is_empty() {
            return Err(anyhow!(
                "model has no scaling block and the dataset has no Risk Score values"
            ));
        }
        let split = train_test_split(labelled.len(), options.test_fraction, options.split_seed)?;
        let train_x: Vec<FeatureRow> = split
            .train
            .iter()
            .map(|&idx| feature_vector(labelled[idx]))
            .collect();
        let train_y: Vec<f64> = split
            .train
            .iter()
            .filter_map(|&idx| labelled[idx].risk_score)
            .collect();

        let mut suggester = Self::new(
            model,
            StandardScaler::fit(&train_x)?,
            MinMaxScaler::fit(&train_y)?,
            options.top_factors,
        );
        suggester.scaling_source = ScalingSource::Dataset;
        Ok(suggester)
    }

    pub fn model(&self) -> &TreeEnsemble {
        &self.model
    }

    pub fn scaling_source(&self) -> ScalingSource {
        self.scaling_source
    }

    pub fn generate(&self, record: &ClubRecord) -> Result<Suggestion> {
        let scaled = self.feature_scaler.transform(&feature_vector(record));
        let raw_prediction = self.model.predict(&scaled);
        if !raw_prediction.is_finite() {
            return Err(anyhow!(
                "model produced a non-finite prediction for {}",
                record.club
            ));
        }
        let risk_score = self.risk_scaler.transform(raw_prediction) * 100.0;

        let attribution = shap_values(&self.model, &scaled);
        let factors = rank_factors(&attribution.values, self.top_factors);

        let tier = RiskTier::from_score(risk_score);
        let mut strategies = Vec::with_capacity(factors.len() + 1);
        strategies.push(tier.headline(risk_score));
        for factor in &factors {
            strategies.push(tier.factor_strategy(factor.feature, factor.value));
        }

        Ok(Suggestion {
            risk_score,
            raw_prediction,
            tier,
            strategies,
            factors,
        })
    }
}
