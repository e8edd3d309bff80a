use std::path::PathBuf;

use club_risk::assessment::{RiskCategory, RiskService};
use club_risk::strategy::{ScalingSource, SuggesterOptions};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn load_service() -> RiskService {
    RiskService::load_from(
        &fixture_path("clubs.csv"),
        &fixture_path("risk_model.json"),
        SuggesterOptions::default(),
    )
    .expect("fixture service should load")
}

#[test]
fn fixture_service_uses_artifact_scaling() {
    let service = load_service();
    let status = service.status();
    assert_eq!(status.rows, 5);
    assert_eq!(status.clubs, 4);
    assert_eq!(status.trees, 2);
    assert_eq!(status.model_type, "random_forest");
    assert_eq!(status.scaling, ScalingSource::Artifact);
    assert_eq!(status.model_source.as_deref(), Some("fixture forest"));
}

#[test]
fn club_names_are_unique_in_sheet_order() {
    let service = load_service();
    assert_eq!(
        service.club_names(),
        vec!["Arsenal", "Everton", "Fulham", "Brentford"]
    );
}

#[test]
fn empty_revenue_cell_is_imputed() {
    let service = load_service();
    let fulham = &service.dataset().rows()[2];
    let revenue = fulham.total_revenue.expect("imputed revenue");
    let expected = (464.6 + 186.9 + 166.5 + 181.8) / 4.0;
    assert!((revenue - expected).abs() < 1e-9);
}

#[test]
fn low_risk_club_gets_sustaining_advice() {
    let service = load_service();
    let out = service.assess(&["Arsenal"]).expect("assessment runs");
    assert_eq!(out.len(), 1);
    let arsenal = &out[0];
    assert_eq!(arsenal.record.risk_score, Some(18.75));
    assert_eq!(arsenal.risk_category, Some(RiskCategory::Low));
    assert_eq!(
        arsenal.strategies,
        vec![
            "Very Low Risk (Score: 18.75). Excellent position. Focus on sustaining performance and exploring growth opportunities.",
            "Outstanding win rate. Emphasize consistency and prepare for potential challenges next season",
            "Maintain current balance. Consider reinvesting in squad or facilities if opportunity arises",
            "Excellent league position. Focus on maintaining performance and planning for future seasons",
            "Sustain excellent transfer strategy. Explore opportunities for knowledge sharing within the club",
            "Maintain excellent performance in Points. Explore minor optimizations if beneficial",
        ]
    );
}

#[test]
fn every_season_of_a_club_is_scored() {
    let service = load_service();
    let out = service.assess(&["Everton"]).expect("assessment runs");
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].record.season.as_deref(), Some("2023-24"));
    assert_eq!(out[1].record.season.as_deref(), Some("2022-23"));

    let current = &out[0];
    assert_eq!(current.record.risk_score, Some(93.75));
    assert_eq!(current.risk_category, Some(RiskCategory::High));
    assert_eq!(
        current.strategies,
        vec![
            "High Risk (Score: 93.75). Urgent action required on key factors.",
            "Urgently reduce wage bill by 15% or increase revenue streams by 20%",
            "Implement major tactical overhaul and squad improvements. Aim for at least 15% increase in win percentage",
            "Prioritize short-term performance boost to climb league table. Target moving up at least 3 positions",
            "Significantly improve scouting network and focus on selling players at peak value. Aim for 30% increase in transfer profits",
            "Address Points urgently with a target of 0% improvement to mitigate high risk",
        ]
    );

    let previous = &out[1];
    assert_eq!(previous.record.risk_score, Some(50.0));
    assert_eq!(previous.risk_category, Some(RiskCategory::Medium));
    assert_eq!(
        previous.strategies[0],
        "Low Risk (Score: 50.00). Maintain current strategy with minor optimizations."
    );
    assert_eq!(
        previous.strategies[1],
        "Focus on incremental improvements in team performance. Aim for 5% increase in win percentage"
    );
}

#[test]
fn medium_tier_falls_back_to_shap_targets() {
    let service = load_service();
    let out = service.assess(&["Brentford"]).expect("assessment runs");
    let brentford = &out[0];
    assert_eq!(brentford.record.risk_score, Some(62.5));
    assert_eq!(brentford.risk_category, Some(RiskCategory::High));
    assert_eq!(
        brentford.strategies,
        vec![
            "Medium Risk (Score: 62.50). Close monitoring and targeted improvements needed.",
            "Improve Wage to Revenue Ratio by approximately 1406% to reduce risk level",
            "Focus on tactical improvements and player development. Aim for 10% increase in win percentage",
            "Implement strategies to climb league table. Target moving up at least 2 positions",
            "Improve Transfer Efficiency by approximately 0% to reduce risk level",
            "Improve Points by approximately 0% to reduce risk level",
        ]
    );
}

#[test]
fn results_follow_sheet_order_and_skip_unknown_clubs() {
    let service = load_service();
    let out = service
        .assess(&["Brentford", "Nowhere Town", "Fulham", "Arsenal"])
        .expect("assessment runs");
    let clubs: Vec<&str> = out.iter().map(|c| c.record.club.as_str()).collect();
    assert_eq!(clubs, vec!["Arsenal", "Fulham", "Brentford"]);

    let fulham = &out[1];
    assert_eq!(fulham.record.risk_score, Some(43.75));
    assert_eq!(fulham.risk_category, Some(RiskCategory::Medium));
    assert_eq!(
        fulham.strategies[1],
        "Fine-tune wage structure or explore new revenue streams. Aim for 5% improvement"
    );
    assert_eq!(
        fulham.strategies[5],
        "Fine-tune Points with a target of 0% improvement for continued stability"
    );
}

#[test]
fn names_must_match_exactly() {
    let service = load_service();
    let out = service.assess(&["arsenal", " Arsenal"]).expect("assessment runs");
    assert!(out.is_empty());
}

#[test]
fn empty_request_returns_no_rows() {
    let service = load_service();
    let names: Vec<String> = Vec::new();
    let out = service.assess(&names).expect("assessment runs");
    assert!(out.is_empty());
}

#[test]
fn missing_files_fail_to_load() {
    let err = RiskService::load_from(
        &fixture_path("missing.csv"),
        &fixture_path("risk_model.json"),
        SuggesterOptions::default(),
    );
    assert!(err.is_err());
}
