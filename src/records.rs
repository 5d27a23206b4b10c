//! Survey records: the raw answers a respondent submits and the catalog of
//! fields those answers are checked against.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Survey answers that define the training target. They are collected on the
/// form but never used as model inputs.
pub const TARGET_CONTRIBUTORS: [&str; 3] = ["Anxiety", "Academic_pressure", "Financial_pressure"];

/// One answer as submitted: either a category label or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Numeric(f64),
    Categorical(String),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Numeric(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Numeric(v as f64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Categorical(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Categorical(v)
    }
}

/// Field name to raw answer. Built once per request and not mutated after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<RawValue>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, RawValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        RawRecord(iter.into_iter().collect())
    }
}

/// A submitted survey: the respondent's name (only used when rendering the
/// result) and their answers keyed by field name.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub answers: RawRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Categorical { choices: &'static [&'static str] },
    Numeric { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Declared survey fields. Every declared field is required on input.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldSpec>,
}

lazy_static! {
    pub static ref SURVEY_FIELDS: FieldCatalog = FieldCatalog::new(vec![
        categorical("Gender", &["Male", "Female"]),
        numeric("Age", 10.0, 50.0),
        categorical("Current_academic_year", &["100", "200", "300", "400", "500"]),
        numeric("CGPA", 1.0, 5.0),
        categorical("Residential_status", &["On-campus", "Off-campus"]),
        numeric("Sports_engagement", 0.0, 5.0),
        numeric("Average_sleeptime", 1.0, 24.0),
        numeric("ExtraCurricular_Involvement", 0.0, 5.0),
        numeric("Academic_workload", 0.0, 5.0),
        numeric("Diet_Quality", 0.0, 5.0),
        numeric("Financial_pressure", 0.0, 5.0),
        numeric("Social_relationships", 0.0, 5.0),
        numeric("Anxiety", 0.0, 5.0),
        numeric("Academic_pressure", 0.0, 5.0),
    ]);
}

fn categorical(name: &'static str, choices: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Categorical { choices },
    }
}

fn numeric(name: &'static str, min: f64, max: f64) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Numeric { min, max },
    }
}

/// Canonical text for a number used as a category label, so that `100.0`
/// and `"100"` land on the same indicator column.
pub fn render_category(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(|f| &f.kind),
            Some(FieldKind::Categorical { .. })
        )
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        matches!(self.get(name).map(|f| &f.kind), Some(FieldKind::Numeric { .. }))
    }

    /// Checks a record against the declared fields and coerces each answer to
    /// its declared kind: numeric text is parsed, numbers given for a
    /// categorical field become their label text. Undeclared fields pass
    /// through unchanged. Category labels outside `choices` are accepted.
    pub fn normalize(&self, record: &RawRecord) -> Result<RawRecord> {
        let mut normalized: BTreeMap<String, RawValue> = record
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        for spec in &self.fields {
            let value = record
                .get(spec.name)
                .ok_or_else(|| RiskError::invalid_input(spec.name, "required field is missing"))?;

            let coerced = match (&spec.kind, value) {
                (FieldKind::Numeric { min, max }, raw) => {
                    let v = match raw {
                        RawValue::Numeric(v) => *v,
                        RawValue::Categorical(text) => text.trim().parse::<f64>().map_err(|_| {
                            RiskError::invalid_input(spec.name, format!("{:?} is not a number", text))
                        })?,
                    };
                    if !v.is_finite() {
                        return Err(RiskError::invalid_input(spec.name, "value is not finite"));
                    }
                    if v < *min || v > *max {
                        return Err(RiskError::invalid_input(
                            spec.name,
                            format!("{} is outside [{}, {}]", v, min, max),
                        ));
                    }
                    RawValue::Numeric(v)
                }
                (FieldKind::Categorical { .. }, RawValue::Numeric(v)) => {
                    if !v.is_finite() {
                        return Err(RiskError::invalid_input(spec.name, "value is not finite"));
                    }
                    RawValue::Categorical(render_category(*v))
                }
                (FieldKind::Categorical { .. }, RawValue::Categorical(text)) => {
                    let text = text.trim();
                    if text.is_empty() {
                        return Err(RiskError::invalid_input(spec.name, "required field is empty"));
                    }
                    RawValue::Categorical(text.to_string())
                }
            };
            normalized.insert(spec.name.to_string(), coerced);
        }

        Ok(RawRecord(normalized))
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> RawRecord {
    RawRecord::new()
        .with("Gender", "Female")
        .with("Age", 21)
        .with("Current_academic_year", "300")
        .with("CGPA", 3.8)
        .with("Residential_status", "Off-campus")
        .with("Sports_engagement", 2)
        .with("Average_sleeptime", 6.5)
        .with("ExtraCurricular_Involvement", 3)
        .with("Academic_workload", 4)
        .with("Diet_Quality", 3)
        .with("Financial_pressure", 2)
        .with("Social_relationships", 4)
        .with("Anxiety", 3)
        .with("Academic_pressure", 4)
}
