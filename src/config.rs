//! Configuration for training and scoring.

use std::path::{Path, PathBuf};

use config::{Config, File};
use log::info;
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Where the fitted model, scaler and feature names live.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    pub dir: String,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,
    #[serde(default = "default_features_file")]
    pub features_file: String,
}

fn default_model_file() -> String {
    "model.json".to_string()
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_features_file() -> String {
    "feature_names.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Survey responses CSV
    pub data_path: String,
    /// Fraction of rows held out for evaluation
    pub test_size: f32,
    pub seed: u64,
    pub n_trees: u16,
    /// k-fold cross-validation on the training split; 0 disables it
    #[serde(default)]
    pub cv_folds: usize,
    /// Mean of the target contributors at or above this is labelled high risk
    pub risk_threshold: f64,
    /// Extra CSV columns that are not survey answers (timestamps, ids)
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Optional parquet export of the encoded training frame
    #[serde(default)]
    pub gold_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl ArtifactsConfig {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.dir, self)
    }
}

/// Resolved artifact file locations.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub features: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P, names: &ArtifactsConfig) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(&names.model_file),
            scaler: dir.join(&names.scaler_file),
            features: dir.join(&names.features_file),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_path(path)
        } else {
            info!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactsConfig {
                dir: "artifacts".to_string(),
                model_file: default_model_file(),
                scaler_file: default_scaler_file(),
                features_file: default_features_file(),
            },
            training: TrainingConfig {
                data_path: "data/survey.csv".to_string(),
                test_size: 0.2,
                seed: 42,
                n_trees: 100,
                cv_folds: 0,
                risk_threshold: 3.0,
                drop_columns: Vec::new(),
                gold_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
