#![deny(clippy::unwrap_used)]

pub mod config;
pub mod inventory;
pub mod kpi;
pub mod merge;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod velocity;
pub mod weekly;

pub use recon_types;

pub use config::ReconConfig;
pub use merge::merge_week_data;
pub use reconcile::reconcile_amazon_skus;
pub use velocity::VelocityEstimator;
pub use weekly::derive_weeks_from_days;
