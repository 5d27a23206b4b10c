//! Student mental-health risk scoring.
//!
//! A survey response is validated against the field catalog, aligned onto the
//! feature schema fixed at training time, scaled, and classified as high or
//! low risk. The training pipeline that produces the scaler, classifier and
//! schema lives in [`training`].

extern crate serde;

pub mod aligner;
pub mod artifacts;
pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod records;
pub mod report;
pub mod schema;
pub mod scoring;
pub mod training;

pub use aligner::{align, FeatureVector};
pub use config::AppConfig;
pub use context::ScoringContext;
pub use error::RiskError;
pub use records::{RawRecord, RawValue, SurveyResponse, SURVEY_FIELDS};
pub use schema::FeatureSchema;
pub use scoring::{Classifier, RiskLabel, Scaler, ScoringService};
