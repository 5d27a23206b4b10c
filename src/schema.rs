//! The ordered feature columns a trained model expects.

use std::collections::HashSet;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Name of the indicator column for one category of a categorical field.
/// Training and inference must both go through this.
pub fn column_name(field: &str, category: &str) -> String {
    format!("{}_{}", field, category)
}

/// Ordered, non-empty, duplicate-free list of column names fixed at training
/// time. Its length and order are the input contract of the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, RiskError> {
        if columns.is_empty() {
            return Err(RiskError::SchemaMismatch(
                "feature schema has no columns".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.is_empty() {
                return Err(RiskError::SchemaMismatch(
                    "feature schema contains an empty column name".to_string(),
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(RiskError::SchemaMismatch(format!(
                    "duplicate column {:?} in feature schema",
                    column
                )));
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = RiskError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        FeatureSchema::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}
