//! Scoring service: a fitted scaler followed by a fitted classifier.

use std::fmt;

use serde::{Deserialize, Serialize};
use smartcore::api::{Transformer, UnsupervisedEstimator};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::preprocessing::numerical::{StandardScaler, StandardScalerParameters};

use crate::aligner::FeatureVector;
use crate::error::{Result, RiskError};

pub type Forest = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Binary outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Low,
    High,
}

impl RiskLabel {
    pub fn from_class(class: i32) -> Result<Self> {
        match class {
            0 => Ok(RiskLabel::Low),
            1 => Ok(RiskLabel::High),
            other => Err(RiskError::Model(format!(
                "classifier produced unknown class {}",
                other
            ))),
        }
    }

    pub fn class(&self) -> i32 {
        match self {
            RiskLabel::Low => 0,
            RiskLabel::High => 1,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLabel::Low => write!(f, "low"),
            RiskLabel::High => write!(f, "high"),
        }
    }
}

/// A fitted numeric normalisation over rows of a fixed width.
pub trait Scaler: Send + Sync {
    fn input_width(&self) -> usize;

    fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>>;
}

/// A fitted binary classifier over scaled rows.
pub trait Classifier: Send + Sync {
    fn predict_row(&self, row: &[f64]) -> Result<RiskLabel>;
}

/// Immutable scaler + classifier pair.
pub struct ScoringService {
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
}

impl ScoringService {
    pub fn new(scaler: Box<dyn Scaler>, classifier: Box<dyn Classifier>) -> Self {
        Self { scaler, classifier }
    }

    pub fn input_width(&self) -> usize {
        self.scaler.input_width()
    }

    pub fn transform(&self, vector: &FeatureVector) -> Result<Vec<f64>> {
        let expected = self.scaler.input_width();
        if vector.len() != expected {
            return Err(RiskError::ShapeMismatch {
                expected,
                actual: vector.len(),
            });
        }
        self.scaler.transform_row(vector.values())
    }

    pub fn predict(&self, scaled: &[f64]) -> Result<RiskLabel> {
        self.classifier.predict_row(scaled)
    }
}

fn row_matrix(row: &[f64]) -> DenseMatrix<f64> {
    DenseMatrix::new(1, row.len(), row.to_vec(), false)
}

/// smartcore `StandardScaler` together with the width it was fitted on.
#[derive(Serialize, Deserialize)]
pub struct FittedScaler {
    width: usize,
    inner: StandardScaler<f64>,
}

impl FittedScaler {
    pub fn fit(x: &DenseMatrix<f64>) -> Result<Self> {
        let (_, width) = x.shape();
        let inner = StandardScaler::fit(x, StandardScalerParameters::default())?;
        Ok(Self { width, inner })
    }

    pub fn transform_matrix(&self, x: &DenseMatrix<f64>) -> Result<DenseMatrix<f64>> {
        let (_, width) = x.shape();
        if width != self.width {
            return Err(RiskError::ShapeMismatch {
                expected: self.width,
                actual: width,
            });
        }
        Ok(self.inner.transform(x)?)
    }
}

impl Scaler for FittedScaler {
    fn input_width(&self) -> usize {
        self.width
    }

    fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        let scaled = self.transform_matrix(&row_matrix(row))?;
        Ok((0..self.width).map(|c| *scaled.get((0, c))).collect())
    }
}

/// Random forest over scaled survey features.
#[derive(Serialize, Deserialize)]
pub struct ForestClassifier {
    inner: Forest,
}

impl ForestClassifier {
    pub fn fit(
        x: &DenseMatrix<f64>,
        y: &Vec<i32>,
        parameters: RandomForestClassifierParameters,
    ) -> Result<Self> {
        let inner = RandomForestClassifier::fit(x, y, parameters)?;
        Ok(Self { inner })
    }

    pub fn predict_matrix(&self, x: &DenseMatrix<f64>) -> Result<Vec<i32>> {
        Ok(self.inner.predict(x)?)
    }
}

impl Classifier for ForestClassifier {
    fn predict_row(&self, row: &[f64]) -> Result<RiskLabel> {
        let predictions = self.predict_matrix(&row_matrix(row))?;
        let class = predictions
            .first()
            .copied()
            .ok_or_else(|| RiskError::Model("classifier returned no prediction".to_string()))?;
        RiskLabel::from_class(class)
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::{ConstantClassifier, IdentityScaler};
    use super::*;
    use crate::aligner::align;
    use crate::records::RawRecord;
    use crate::schema::FeatureSchema;

    fn gender_schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            "Age".to_string(),
            "Gender_Male".to_string(),
            "Gender_Female".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_identity_and_constant_pass_label_through() {
        let record = RawRecord::new().with("Gender", "Male").with("Age", 22);
        let vector = align(&record, &gender_schema()).unwrap();

        for label in [RiskLabel::Low, RiskLabel::High] {
            let service = ScoringService::new(
                Box::new(IdentityScaler(3)),
                Box::new(ConstantClassifier(label)),
            );
            let scaled = service.transform(&vector).unwrap();
            assert_eq!(scaled, vec![22.0, 1.0, 0.0]);
            assert_eq!(service.predict(&scaled).unwrap(), label);
        }
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let record = RawRecord::new().with("Age", 22);
        let vector = align(&record, &gender_schema()).unwrap();
        let service = ScoringService::new(
            Box::new(IdentityScaler(5)),
            Box::new(ConstantClassifier(RiskLabel::Low)),
        );

        match service.transform(&vector) {
            Err(RiskError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_risk_label_classes() {
        assert_eq!(RiskLabel::from_class(0).unwrap(), RiskLabel::Low);
        assert_eq!(RiskLabel::from_class(1).unwrap(), RiskLabel::High);
        assert!(RiskLabel::from_class(2).is_err());
        assert_eq!(RiskLabel::High.class(), 1);
        assert_eq!(RiskLabel::Low.to_string(), "low");
    }

    #[test]
    fn test_fitted_scaler_centres_columns() {
        let x = DenseMatrix::from_2d_array(&[&[1.0, 10.0], &[3.0, 30.0], &[5.0, 50.0]]);
        let scaler = FittedScaler::fit(&x).unwrap();
        assert_eq!(scaler.input_width(), 2);

        let middle = scaler.transform_row(&[3.0, 30.0]).unwrap();
        assert!(middle.iter().all(|v| v.abs() < 1e-9));

        let high = scaler.transform_row(&[5.0, 50.0]).unwrap();
        assert!(high.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_forest_learns_separable_rows() {
        let x = DenseMatrix::from_2d_array(&[
            &[0.0, 0.1],
            &[0.1, 0.0],
            &[0.2, 0.1],
            &[0.1, 0.2],
            &[5.0, 5.1],
            &[5.1, 5.0],
            &[5.2, 5.1],
            &[5.1, 5.2],
        ]);
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let params = RandomForestClassifierParameters::default()
            .with_n_trees(10)
            .with_seed(7);
        let forest = ForestClassifier::fit(&x, &y, params).unwrap();

        assert_eq!(forest.predict_row(&[0.05, 0.05]).unwrap(), RiskLabel::Low);
        assert_eq!(forest.predict_row(&[5.05, 5.05]).unwrap(), RiskLabel::High);
    }
}
