//! Training pipeline: survey CSV in, fitted scaler, classifier and feature
//! names out.
//!
//! Stages follow the raw / silver / gold layout: the raw CSV is loaded with
//! column names cleaned up, the target is derived and the target contributors
//! dropped, then categoricals are one-hot encoded (first category dropped) and
//! gaps mean-imputed before the frame becomes a smartcore matrix.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use log::{debug, info, warn};
use polars::prelude::*;
use polars_io::parquet::ParquetWriter;
use smartcore::api::SupervisedEstimator;
use smartcore::ensemble::random_forest_classifier::RandomForestClassifierParameters;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::accuracy;
use smartcore::model_selection::{cross_validate, train_test_split, KFold};

use crate::artifacts::{save_artifacts, TrainedArtifacts};
use crate::config::{ArtifactPaths, TrainingConfig};
use crate::error::{Result, RiskError};
use crate::metrics::ClassificationReport;
use crate::records::{render_category, FieldCatalog, SURVEY_FIELDS, TARGET_CONTRIBUTORS};
use crate::schema::{column_name, FeatureSchema};
use crate::scoring::{FittedScaler, Forest, ForestClassifier};

/// Columns the pipeline would create itself; never treated as features.
const DERIVED_COLUMNS: [&str; 2] = ["Risk", "Risk_Score"];

pub async fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| RiskError::Dataset(format!("cannot open {}: {}", path.display(), e)))?;

    Ok(CsvReader::new(file).has_header(true).finish()?)
}

pub async fn write_parquet<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut file = File::create(path)?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub fn strip_column_names(df: &mut DataFrame) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    df.set_column_names(&names)?;
    Ok(())
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let present = df.get_column_names();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !present.contains(name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RiskError::Dataset(format!("missing columns: {}", missing.join(", "))))
    }
}

fn float_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(values)
}

fn category_labels(series: &Series) -> Result<Vec<Option<String>>> {
    let labels = match series.dtype() {
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
            .collect(),
        _ => float_values(series)?
            .into_iter()
            .map(|v| v.map(render_category))
            .collect(),
    };
    Ok(labels)
}

/// Risk label per row: 1 when the mean of the present target contributors is
/// at least `threshold`, otherwise 0 (including rows with none present).
pub fn derive_target(df: &DataFrame, threshold: f64) -> Result<Vec<i32>> {
    require_columns(df, &TARGET_CONTRIBUTORS)?;

    let mut columns = Vec::with_capacity(TARGET_CONTRIBUTORS.len());
    for name in TARGET_CONTRIBUTORS {
        columns.push(float_values(df.column(name)?)?);
    }

    let labels = (0..df.height())
        .map(|row| {
            let present: Vec<f64> = columns.iter().filter_map(|col| col[row]).collect();
            if present.is_empty() {
                return 0;
            }
            let score = present.iter().sum::<f64>() / present.len() as f64;
            if score >= threshold {
                1
            } else {
                0
            }
        })
        .collect();

    Ok(labels)
}

/// Drops the target contributors, derived columns and any configured extras.
pub fn select_features(df: &DataFrame, drop_columns: &[String]) -> Result<DataFrame> {
    let keep: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| !TARGET_CONTRIBUTORS.contains(name))
        .filter(|name| !DERIVED_COLUMNS.contains(name))
        .filter(|name| !drop_columns.iter().any(|d| d == *name))
        .map(|name| name.to_string())
        .collect();

    if keep.is_empty() {
        return Err(RiskError::Dataset("no feature columns remain".to_string()));
    }

    Ok(df.select(keep)?)
}

/// Encoded feature frame (all Float64) and its column order.
pub struct EncodedFeatures {
    pub frame: DataFrame,
    pub schema: FeatureSchema,
}

/// One-hot encodes categorical columns, dropping the first category in
/// sorted order, and passes numeric columns through as Float64. Numeric
/// columns come first, indicator columns after, each in frame order. Nulls
/// in numeric columns are replaced by the column mean.
///
/// A column is categorical when `catalog` declares it so, or when the catalog
/// does not know it and it holds text. Catalog numeric columns are always
/// numeric; cells that do not parse become null and are imputed.
pub fn encode_features(df: &DataFrame, catalog: &FieldCatalog) -> Result<EncodedFeatures> {
    let mut numeric: Vec<Series> = Vec::new();
    let mut indicators: Vec<Series> = Vec::new();

    for series in df.get_columns() {
        let field = series.name();
        let categorical = catalog.is_categorical(field)
            || (!catalog.is_numeric(field) && matches!(series.dtype(), DataType::Utf8));

        if !categorical {
            numeric.push(Series::new(field, float_values(series)?));
            continue;
        }

        let labels = category_labels(series)?;
        let categories: BTreeSet<&str> = labels.iter().flatten().map(String::as_str).collect();
        if categories.len() < 2 {
            warn!(
                "Column {} has {} distinct categories, no indicator columns kept",
                field,
                categories.len()
            );
        }

        for category in categories.iter().skip(1) {
            let values: Vec<f64> = labels
                .iter()
                .map(|label| {
                    if label.as_deref() == Some(*category) {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            indicators.push(Series::new(&column_name(field, category), values));
        }
        debug!("Encoded {} into {} indicator columns", field, categories.len().saturating_sub(1));
    }

    let columns: Vec<Series> = numeric.into_iter().chain(indicators).collect();
    if columns.is_empty() {
        return Err(RiskError::Dataset("encoding produced no columns".to_string()));
    }

    let names: Vec<String> = columns.iter().map(|s| s.name().to_string()).collect();
    let schema = FeatureSchema::new(names)?;
    let frame = DataFrame::new(columns)?.fill_null(FillNullStrategy::Mean)?;

    Ok(EncodedFeatures { frame, schema })
}

/// Column-major copy of a Float64 frame into a smartcore matrix. Values that
/// are still null (an all-null column) become 0.
pub fn convert_features_to_matrix(df: &DataFrame) -> Result<DenseMatrix<f64>> {
    let nrows = df.height();
    let ncols = df.width();
    let mut values: Vec<f64> = Vec::with_capacity(nrows * ncols);

    for series in df.get_columns() {
        let cast = series.cast(&DataType::Float64)?;
        values.extend(cast.f64()?.into_iter().map(|v| v.unwrap_or(0.0)));
    }

    Ok(DenseMatrix::new(nrows, ncols, values, true))
}

fn forest_parameters(config: &TrainingConfig) -> RandomForestClassifierParameters {
    RandomForestClassifierParameters::default()
        .with_n_trees(config.n_trees)
        .with_seed(config.seed)
}

pub struct TrainingOutcome {
    pub artifacts: TrainedArtifacts,
    pub report: ClassificationReport,
    pub cv_accuracy: Option<f64>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Splits, scales, fits and evaluates on the held-out rows.
pub fn fit_and_evaluate(
    x: &DenseMatrix<f64>,
    y: &Vec<i32>,
    schema: FeatureSchema,
    config: &TrainingConfig,
) -> Result<TrainingOutcome> {
    if !(config.test_size > 0.0 && config.test_size < 1.0) {
        return Err(RiskError::Training(format!(
            "test_size must be between 0 and 1, got {}",
            config.test_size
        )));
    }
    let n_test = (y.len() as f32 * config.test_size) as usize;
    if n_test == 0 || n_test >= y.len() {
        return Err(RiskError::Training(format!(
            "test_size {} over {} rows leaves an empty train or test set",
            config.test_size,
            y.len()
        )));
    }
    let (x_train, x_test, y_train, y_test) =
        train_test_split(x, y, config.test_size, true, Some(config.seed));
    info!(
        "Split {} rows into {} train / {} test",
        y.len(),
        y_train.len(),
        y_test.len()
    );

    let scaler = FittedScaler::fit(&x_train)?;
    let x_train_scaled = scaler.transform_matrix(&x_train)?;
    let x_test_scaled = scaler.transform_matrix(&x_test)?;

    let parameters = forest_parameters(config);
    let classifier = ForestClassifier::fit(&x_train_scaled, &y_train, parameters.clone())?;
    let y_pred = classifier.predict_matrix(&x_test_scaled)?;
    let report = ClassificationReport::new(&y_test, &y_pred);

    if config.cv_folds > y_train.len() {
        return Err(RiskError::Training(format!(
            "{} folds requested but only {} training rows",
            config.cv_folds,
            y_train.len()
        )));
    }
    let cv_accuracy = if config.cv_folds >= 2 {
        let cv = KFold::default().with_n_splits(config.cv_folds);
        let results = cross_validate(
            Forest::new(),
            &x_train_scaled,
            &y_train,
            parameters,
            &cv,
            &accuracy,
        )?;
        info!(
            "{}-fold cross-validation: train accuracy {:.3}, test accuracy {:.3}",
            config.cv_folds,
            results.mean_train_score(),
            results.mean_test_score()
        );
        Some(results.mean_test_score())
    } else {
        None
    };

    Ok(TrainingOutcome {
        artifacts: TrainedArtifacts {
            classifier,
            scaler,
            schema,
        },
        report,
        cv_accuracy,
        train_rows: y_train.len(),
        test_rows: y_test.len(),
    })
}

/// Runs the whole pipeline and persists the artifacts.
pub async fn train(config: &TrainingConfig, paths: &ArtifactPaths) -> Result<TrainingOutcome> {
    let mut df = read_csv(&config.data_path).await?;
    strip_column_names(&mut df)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        config.data_path
    );
    if df.height() < 2 {
        return Err(RiskError::Dataset(format!(
            "need at least 2 rows to train, got {}",
            df.height()
        )));
    }

    let y = derive_target(&df, config.risk_threshold)?;
    let high = y.iter().filter(|&&label| label == 1).count();
    info!("Target derived: {} high risk, {} low risk", high, y.len() - high);

    let features = select_features(&df, &config.drop_columns)?;
    let mut encoded = encode_features(&features, &SURVEY_FIELDS)?;
    info!("Encoded {} feature columns", encoded.schema.len());

    if let Some(gold_path) = &config.gold_path {
        write_parquet(gold_path, &mut encoded.frame).await?;
        info!("Wrote encoded features to {}", gold_path);
    }

    let x = convert_features_to_matrix(&encoded.frame)?;
    let outcome = fit_and_evaluate(&x, &y, encoded.schema, config)?;
    save_artifacts(&outcome.artifacts, paths).await?;

    Ok(outcome)
}
