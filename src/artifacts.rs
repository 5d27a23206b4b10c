//! Persisted training artifacts: classifier, scaler and feature names.

use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ArtifactPaths;
use crate::error::{Result, RiskError};
use crate::schema::FeatureSchema;
use crate::scoring::{FittedScaler, ForestClassifier, Scaler};

/// Everything training produces and scoring needs.
pub struct TrainedArtifacts {
    pub classifier: ForestClassifier,
    pub scaler: FittedScaler,
    pub schema: FeatureSchema,
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let bytes = serde_json::to_vec(value).map_err(|e| RiskError::artifact(path, e))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| RiskError::artifact(path, e))?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RiskError::artifact(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| RiskError::artifact(path, e))
}

pub async fn save_artifacts(artifacts: &TrainedArtifacts, paths: &ArtifactPaths) -> Result<()> {
    write_json(&paths.model, &artifacts.classifier).await?;
    write_json(&paths.scaler, &artifacts.scaler).await?;
    write_json(&paths.features, &artifacts.schema).await?;

    info!(
        "Saved model to {}, scaler to {}, {} feature names to {}",
        paths.model.display(),
        paths.scaler.display(),
        artifacts.schema.len(),
        paths.features.display()
    );
    Ok(())
}

/// Loads all three artifacts. The feature list is read first so a missing or
/// empty schema is reported as a schema problem before the larger files are
/// parsed.
pub async fn load_artifacts(paths: &ArtifactPaths) -> Result<TrainedArtifacts> {
    let schema: FeatureSchema = match read_json(&paths.features).await {
        Ok(schema) => schema,
        Err(e) => {
            return Err(RiskError::SchemaMismatch(format!(
                "cannot load feature names: {}",
                e
            )))
        }
    };
    info!(
        "Loaded {} feature names from {}",
        schema.len(),
        paths.features.display()
    );

    let scaler: FittedScaler = read_json(&paths.scaler).await?;
    info!(
        "Loaded scaler ({} inputs) from {}",
        scaler.input_width(),
        paths.scaler.display()
    );

    let classifier: ForestClassifier = read_json(&paths.model).await?;
    info!("Loaded classifier from {}", paths.model.display());

    Ok(TrainedArtifacts {
        classifier,
        scaler,
        schema,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn paths_in(dir: &Path) -> ArtifactPaths {
        ArtifactPaths::in_dir(dir, &AppConfig::default().artifacts)
    }

    #[tokio::test]
    async fn test_missing_feature_names_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_artifacts(&paths_in(dir.path())).await;
        assert!(matches!(result, Err(RiskError::SchemaMismatch(_))));
    }

    #[tokio::test]
    async fn test_empty_feature_names_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        std::fs::write(&paths.features, "[]").unwrap();

        let result = load_artifacts(&paths).await;
        assert!(matches!(result, Err(RiskError::SchemaMismatch(_))));
    }

    #[tokio::test]
    async fn test_missing_scaler_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        std::fs::write(&paths.features, r#"["Age","Gender_Male"]"#).unwrap();

        let result = load_artifacts(&paths).await;
        match result {
            Err(RiskError::Artifact { path, .. }) => assert_eq!(path, paths.scaler),
            Err(other) => panic!("expected Artifact error, got {:?}", other),
            Ok(_) => panic!("expected Artifact error"),
        }
    }
}
