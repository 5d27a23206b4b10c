//! Schema alignment: turns one raw record into the fixed-width vector the
//! model was trained on.
//!
//! Alignment runs in two phases. The record is first expanded into a loose
//! map of candidate columns (one live indicator per categorical answer, one
//! passthrough column per numeric answer). That map is then read back in
//! schema order with an explicit zero default, so categories the record did
//! not trigger become zeros and columns the schema does not know are dropped.

use std::collections::BTreeMap;

use log::trace;

use crate::error::{Result, RiskError};
use crate::records::{RawRecord, RawValue};
use crate::schema::{column_name, FeatureSchema};

/// Numeric feature values in schema order. Length always equals the schema
/// it was aligned against.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Expands a record into candidate column values with no shape constraint.
pub fn candidate_columns(record: &RawRecord) -> Result<BTreeMap<String, f64>> {
    let mut candidates = BTreeMap::new();

    for (field, value) in record.iter() {
        match value {
            RawValue::Categorical(category) => {
                candidates.insert(column_name(field, category), 1.0);
            }
            RawValue::Numeric(v) => {
                if !v.is_finite() {
                    return Err(RiskError::invalid_input(field, "value is not finite"));
                }
                candidates.insert(field.to_string(), *v);
            }
        }
    }

    Ok(candidates)
}

/// Aligns `record` against `schema`.
///
/// Output index `i` always holds the value for `schema[i]`. Any schema column
/// not produced by the record is `0.0`; produced columns missing from the
/// schema are ignored.
pub fn align(record: &RawRecord, schema: &FeatureSchema) -> Result<FeatureVector> {
    if schema.is_empty() {
        return Err(RiskError::SchemaMismatch(
            "feature schema has no columns".to_string(),
        ));
    }

    let candidates = candidate_columns(record)?;

    let values: Vec<f64> = schema
        .iter()
        .map(|column| candidates.get(column).copied().unwrap_or(0.0))
        .collect();

    trace!(
        "aligned {} candidate columns onto {} schema columns",
        candidates.len(),
        values.len()
    );

    Ok(FeatureVector(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::sample_record;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn gender_schema() -> FeatureSchema {
        schema(&["Age", "Gender_Male", "Gender_Female"])
    }

    #[test]
    fn test_male_record() {
        let record = RawRecord::new().with("Gender", "Male").with("Age", 22);
        let vector = align(&record, &gender_schema()).unwrap();
        assert_eq!(vector.values(), &[22.0, 1.0, 0.0]);
    }

    #[test]
    fn test_female_record() {
        let record = RawRecord::new().with("Gender", "Female").with("Age", 19);
        let vector = align(&record, &gender_schema()).unwrap();
        assert_eq!(vector.values(), &[19.0, 0.0, 1.0]);
    }

    #[test]
    fn test_untriggered_indicator_is_zero() {
        let schema = schema(&[
            "Age",
            "Residential_status_On-campus",
            "Residential_status_Off-campus",
        ]);
        let record = RawRecord::new()
            .with("Age", 20)
            .with("Residential_status", "On-campus");

        let vector = align(&record, &schema).unwrap();
        assert_eq!(vector.values(), &[20.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_contributes_nothing() {
        let record = RawRecord::new().with("Gender", "Nonbinary").with("Age", 30);
        let vector = align(&record, &gender_schema()).unwrap();
        assert_eq!(vector.values(), &[30.0, 0.0, 0.0]);
    }

    #[test]
    fn test_columns_outside_schema_are_dropped() {
        let record = RawRecord::new()
            .with("Gender", "Male")
            .with("Age", 22)
            .with("Anxiety", 4);
        let vector = align(&record, &gender_schema()).unwrap();
        assert_eq!(vector.len(), 3);
        assert_eq!(vector.values(), &[22.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_numeric_field_is_zero() {
        let record = RawRecord::new().with("Gender", "Male");
        let vector = align(&record, &gender_schema()).unwrap();
        assert_eq!(vector.values(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_length_matches_schema_for_full_survey() {
        let schema = schema(&[
            "Age",
            "CGPA",
            "Sports_engagement",
            "Average_sleeptime",
            "Gender_Male",
            "Current_academic_year_200",
            "Current_academic_year_300",
            "Residential_status_On-campus",
        ]);
        let vector = align(&sample_record(), &schema).unwrap();
        assert_eq!(vector.len(), schema.len());
        assert_eq!(vector.values(), &[21.0, 3.8, 2.0, 6.5, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_align_is_idempotent() {
        let record = sample_record();
        let schema = schema(&["Age", "CGPA", "Gender_Female", "Diet_Quality"]);
        let first = align(&record, &schema).unwrap();
        let second = align(&record, &schema).unwrap();
        let first_bits: Vec<u64> = first.values().iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.values().iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_permuted_schema_permutes_output() {
        let names = ["Age", "Gender_Male", "Gender_Female", "CGPA", "Unused"];
        let record = RawRecord::new()
            .with("Gender", "Male")
            .with("Age", 22)
            .with("CGPA", 4.1);
        let base = align(&record, &schema(&names)).unwrap();

        let permutations: [[usize; 5]; 3] = [[4, 3, 2, 1, 0], [1, 0, 3, 4, 2], [2, 4, 0, 3, 1]];
        for perm in permutations {
            let permuted: Vec<&str> = perm.iter().map(|&i| names[i]).collect();
            let vector = align(&record, &schema(&permuted)).unwrap();
            for (out_idx, &src_idx) in perm.iter().enumerate() {
                assert_eq!(vector.values()[out_idx], base.values()[src_idx]);
            }
        }
    }

    #[test]
    fn test_non_finite_numeric_is_invalid() {
        let record = RawRecord::new().with("Age", f64::NAN);
        assert!(matches!(
            align(&record, &gender_schema()),
            Err(RiskError::InvalidInput { .. })
        ));
    }
}
