//! Process-wide scoring state, built once at startup and shared by reference.

use log::debug;

use crate::aligner::align;
use crate::artifacts::{load_artifacts, TrainedArtifacts};
use crate::config::ArtifactPaths;
use crate::error::{Result, RiskError};
use crate::records::{FieldCatalog, RawRecord, SURVEY_FIELDS};
use crate::schema::FeatureSchema;
use crate::scoring::{RiskLabel, ScoringService};

/// Field catalog, feature schema and scoring service. Read-only once built.
pub struct ScoringContext {
    catalog: FieldCatalog,
    schema: FeatureSchema,
    service: ScoringService,
}

impl ScoringContext {
    /// Fails with `SchemaMismatch` when the schema and the scaler disagree on
    /// the number of features.
    pub fn new(catalog: FieldCatalog, schema: FeatureSchema, service: ScoringService) -> Result<Self> {
        if schema.len() != service.input_width() {
            return Err(RiskError::SchemaMismatch(format!(
                "feature schema has {} columns but scaler expects {}",
                schema.len(),
                service.input_width()
            )));
        }
        Ok(Self {
            catalog,
            schema,
            service,
        })
    }

    pub fn from_artifacts(artifacts: TrainedArtifacts) -> Result<Self> {
        let service = ScoringService::new(
            Box::new(artifacts.scaler),
            Box::new(artifacts.classifier),
        );
        Self::new(SURVEY_FIELDS.clone(), artifacts.schema, service)
    }

    pub async fn load(paths: &ArtifactPaths) -> Result<Self> {
        Self::from_artifacts(load_artifacts(paths).await?)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Validate, align, scale and classify one record.
    pub fn score(&self, record: &RawRecord) -> Result<RiskLabel> {
        let record = self.catalog.normalize(record)?;
        let vector = align(&record, &self.schema)?;
        let scaled = self.service.transform(&vector)?;
        let label = self.service.predict(&scaled)?;
        debug!("Scored record with {} fields: {}", record.len(), label);
        Ok(label)
    }
}
