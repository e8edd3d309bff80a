use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::features::FEATURE_COUNT;
use crate::strategy::{
    DEFAULT_SPLIT_SEED, DEFAULT_TEST_FRACTION, DEFAULT_TOP_FACTORS, SuggesterOptions,
};

pub const DEFAULT_DATA_PATH: &str = "final_df.csv";
pub const DEFAULT_MODEL_PATH: &str = "football_risk_model.json";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

pub const DEFAULT_LOG_FILTER: &str = "info";

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://flashdash101.github.io",
    "http://localhost:5173",
    "http://localhost:5173/risk-football-model/",
];

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub bind: String,
    pub allowed_origins: Vec<String>,
    pub suggester: SuggesterOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            bind: DEFAULT_BIND.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            suggester: SuggesterOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads `RISK_*` variables from the process environment. Call after
    /// `dotenvy` has loaded any `.env` files.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| {
            lookup(key).and_then(|val| {
                let trimmed = val.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let allowed_origins = match opt("RISK_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split([',', ';', ' '])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let top_factors = opt("RISK_TOP_FACTORS")
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_FACTORS)
            .clamp(1, FEATURE_COUNT);
        let test_fraction = opt("RISK_TEST_FRACTION")
            .and_then(|val| val.parse::<f64>().ok())
            .filter(|v| (0.0..1.0).contains(v))
            .unwrap_or(DEFAULT_TEST_FRACTION);
        let split_seed = opt("RISK_SPLIT_SEED")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SPLIT_SEED);

        Self {
            data_path: opt("RISK_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            model_path: opt("RISK_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            bind: opt("RISK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            allowed_origins,
            suggester: SuggesterOptions {
                top_factors,
                test_fraction,
                split_seed,
            },
        }
    }
}

/// Log filter shared by the server and the report binary: `RUST_LOG` when it
/// parses, otherwise [`DEFAULT_LOG_FILTER`].
pub fn log_filter() -> EnvFilter {
    log_filter_from(env::var("RUST_LOG").ok().as_deref())
}

pub fn log_filter_from(raw: Option<&str>) -> EnvFilter {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
