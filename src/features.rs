use crate::club_dataset::ClubRecord;

pub const FEATURE_COUNT: usize = 16;

/// Model inputs in training column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Wage to Revenue Ratio",
    "Transfer Efficiency",
    "Rank",
    "Points",
    "Goal Difference",
    "European Competition",
    "Rank Change",
    "Points Change",
    "Transfer Net Spend Ratio",
    "Win Percentage",
    "Revenue per Win",
    "Revenue per Point",
    "Wage per Point",
    "Points per Player",
    "Revenue per Player",
    "Transfer Expenditure (£m)",
];

pub type FeatureRow = [f64; FEATURE_COUNT];

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|f| *f == name)
}

/// Raw (unscaled) model inputs for one row. Absent statistics become zero.
pub fn feature_vector(record: &ClubRecord) -> FeatureRow {
    let float = |v: Option<f64>| v.unwrap_or(0.0);
    [
        float(record.wage_to_revenue_ratio),
        float(record.transfer_efficiency),
        float(record.rank),
        float(record.points),
        float(record.goal_difference),
        match record.european_competition {
            Some(true) => 1.0,
            _ => 0.0,
        },
        float(record.rank_change),
        float(record.points_change),
        float(record.transfer_net_spend_ratio),
        float(record.win_percentage),
        float(record.revenue_per_win),
        float(record.revenue_per_point),
        float(record.wage_per_point),
        float(record.points_per_player),
        float(record.revenue_per_player),
        float(record.transfer_expenditure),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::club_dataset::ClubDataset;

    #[test]
    fn vector_follows_training_order() {
        let record = ClubRecord {
            club: "Brentford".into(),
            wage_to_revenue_ratio: Some(0.8),
            rank: Some(15.0),
            european_competition: Some(true),
            win_percentage: Some(50.0),
            transfer_expenditure: Some(12.5),
            ..Default::default()
        };
        let x = feature_vector(&record);
        assert_eq!(x[feature_index("Wage to Revenue Ratio").unwrap()], 0.8);
        assert_eq!(x[feature_index("Rank").unwrap()], 15.0);
        assert_eq!(x[feature_index("European Competition").unwrap()], 1.0);
        assert_eq!(x[feature_index("Win Percentage").unwrap()], 50.0);
        assert_eq!(x[15], 12.5);
        assert_eq!(x[feature_index("Points").unwrap()], 0.0);
    }

    #[test]
    fn imputed_rank_reaches_the_model_unrounded() {
        let ds = ClubDataset::from_reader("Club,Rank\nA,2\nB,15\nC,\n".as_bytes())
            .expect("sheet parses");
        let x = feature_vector(&ds.rows()[2]);
        assert_eq!(x[feature_index("Rank").unwrap()], 8.5);
    }

    #[test]
    fn unknown_feature_has_no_index() {
        assert_eq!(feature_index("Risk Score"), None);
        assert_eq!(feature_index("Transfer Efficiency"), Some(1));
    }
}
