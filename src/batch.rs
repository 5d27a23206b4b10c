//! Scoring many survey responses from a CSV file.

use std::collections::HashMap;
use std::io;

use log::{info, warn};
use serde::Serialize;

use crate::context::ScoringContext;
use crate::error::Result;
use crate::records::{RawRecord, RawValue};
use crate::scoring::RiskLabel;

/// Column holding the respondent's name; not a survey answer.
pub const NAME_COLUMN: &str = "name";

#[derive(Debug, Serialize)]
struct PredictionRow<'a> {
    row: usize,
    name: &'a str,
    label: &'a str,
    detail: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub high: usize,
    pub low: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.high + self.low + self.failed
    }
}

/// Splits one CSV row into the respondent's name and their answers. Header
/// names are trimmed and blank cells are treated as absent.
fn record_from_row(row: &HashMap<String, String>) -> (String, RawRecord) {
    let mut name = String::new();
    let mut record = RawRecord::new();
    for (field, value) in row {
        let field = field.trim();
        if field == NAME_COLUMN {
            name = value.trim().to_string();
        } else if !value.trim().is_empty() {
            record = record.with(field, RawValue::Categorical(value.clone()));
        }
    }
    (name, record)
}

/// Scores every row of `reader` and writes one prediction row per input row
/// to `writer`. A row that fails is written with label `error` and does not
/// stop the batch.
pub fn score_batch<R: io::Read, W: io::Write>(
    context: &ScoringContext,
    reader: R,
    writer: W,
) -> Result<BatchSummary> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut wtr = csv::Writer::from_writer(writer);
    let mut summary = BatchSummary::default();

    for (idx, result) in rdr.deserialize::<HashMap<String, String>>().enumerate() {
        let row_number = idx + 1;
        let (name, outcome) = match result {
            Ok(row) => {
                let (name, record) = record_from_row(&row);
                let outcome = context.score(&record);
                (name, outcome)
            }
            Err(e) => (String::new(), Err(e.into())),
        };

        match outcome {
            Ok(label) => {
                let label_text = label.to_string();
                wtr.serialize(PredictionRow {
                    row: row_number,
                    name: &name,
                    label: &label_text,
                    detail: String::new(),
                })?;
                match label {
                    RiskLabel::High => summary.high += 1,
                    RiskLabel::Low => summary.low += 1,
                }
            }
            Err(e) => {
                warn!("Row {} could not be scored: {}", row_number, e);
                wtr.serialize(PredictionRow {
                    row: row_number,
                    name: &name,
                    label: "error",
                    detail: e.to_string(),
                })?;
                summary.failed += 1;
            }
        }
    }

    wtr.flush()?;
    info!(
        "Scored {} rows: {} high risk, {} low risk, {} failed",
        summary.total(),
        summary.high,
        summary.low,
        summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SURVEY_FIELDS;
    use crate::schema::FeatureSchema;
    use crate::scoring::fakes::{ConstantClassifier, IdentityScaler};
    use crate::scoring::ScoringService;

    const HEADER: &str = "name,Gender,Age,Current_academic_year,CGPA,Residential_status,\
Sports_engagement,Average_sleeptime,ExtraCurricular_Involvement,Academic_workload,\
Diet_Quality,Financial_pressure,Social_relationships,Anxiety,Academic_pressure";

    fn context() -> ScoringContext {
        let schema = FeatureSchema::new(vec![
            "Age".to_string(),
            "CGPA".to_string(),
            "Gender_Male".to_string(),
        ])
        .unwrap();
        let service = ScoringService::new(
            Box::new(IdentityScaler(3)),
            Box::new(ConstantClassifier(RiskLabel::High)),
        );
        ScoringContext::new(SURVEY_FIELDS.clone(), schema, service).unwrap()
    }

    #[test]
    fn test_batch_scores_rows_and_reports_failures() {
        let input = format!(
            "{}\nAda,Female,21,300,3.8,Off-campus,2,6.5,3,4,3,2,4,3,4\nBo,Male,,100,3.1,On-campus,1,7,2,3,3,1,3,2,2\n",
            HEADER
        );
        let mut output = Vec::new();

        let summary = score_batch(&context(), input.as_bytes(), &mut output).unwrap();
        assert_eq!(summary.high, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 2);

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "row,name,label,detail");
        assert_eq!(lines[1], "1,Ada,high,");
        assert!(lines[2].starts_with("2,Bo,error,"));
        assert!(lines[2].contains("Age"));
    }

    #[test]
    fn test_record_from_row_skips_name_and_blanks() {
        let mut row = HashMap::new();
        row.insert("name".to_string(), "Ada".to_string());
        row.insert("Age".to_string(), "21".to_string());
        row.insert("CGPA".to_string(), " ".to_string());

        let (name, record) = record_from_row(&row);
        assert_eq!(name, "Ada");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("Age"), Some(&RawValue::Categorical("21".to_string())));
    }

    #[test]
    fn test_record_from_row_trims_name_header() {
        let mut row = HashMap::new();
        row.insert(" name ".to_string(), "Ada".to_string());
        row.insert(" Age".to_string(), "21".to_string());

        let (name, record) = record_from_row(&row);
        assert_eq!(name, "Ada");
        assert!(record.get("name").is_none());
        assert_eq!(record.get("Age"), Some(&RawValue::Categorical("21".to_string())));
    }
}
