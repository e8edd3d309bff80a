pub mod api;
pub mod assessment;
pub mod attribution;
pub mod club_dataset;
pub mod config;
pub mod features;
pub mod risk_export;
pub mod risk_model;
pub mod scaling;
pub mod strategy;
