//! End-to-end run for one outcome mode

use crate::config::{OutcomeMode, PipelineConfig};
use crate::dataset::{ComplaintRecord, DatasetBuilder, CATEGORICAL_COLUMNS, LABEL_COLUMN};
use crate::error::Result;
use crate::preprocessing::{FeatureMatrix, RareCategoryEncoder};
use crate::report::OutcomeReport;
use crate::synthetic::oversample;
use crate::training::{cross_val_score, rank_features, train_test_split, Logit, RandomForest};
use std::time::Instant;
use tracing::{debug, info};

/// Forest with the configured size, depth and seed
fn make_forest(config: &PipelineConfig) -> RandomForest {
    RandomForest::new_classifier(config.n_estimators)
        .with_max_depth(config.max_depth)
        .with_random_state(config.forest_seed)
}

/// Build, encode, balance and model the records for `mode`
pub fn run_outcome(
    records: &[ComplaintRecord],
    mode: OutcomeMode,
    config: &PipelineConfig,
) -> Result<OutcomeReport> {
    config.validate()?;
    let start = Instant::now();
    info!(outcome = %mode, records = records.len(), "Running outcome pipeline");

    let table = DatasetBuilder::new(mode).build(records)?;

    let mut encoder =
        RareCategoryEncoder::new(&CATEGORICAL_COLUMNS[..]).with_threshold(config.category_threshold);
    let encoded = encoder.fit_transform(&table, LABEL_COLUMN)?;
    let features = FeatureMatrix::from_frame(&encoded, LABEL_COLUMN)?;
    info!(
        rows = features.n_samples(),
        features = features.n_features(),
        "Encoded feature matrix"
    );

    let balanced = oversample(&features, config)?.balanced;
    let y = balanced.y_f64();

    // Held-out partition of the balanced set; only its sizes are reported
    let split = train_test_split(balanced.n_samples(), config.report_test_size, config.split_seed)?;
    debug!(
        train = split.train_indices.len(),
        test = split.test_indices.len(),
        "Split balanced set"
    );

    let logit = Logit::new()
        .with_max_iter(config.logit_max_iter)
        .with_tol(config.logit_tol)
        .fit(&balanced.x, &y)?;
    let logit = logit.summary(LABEL_COLUMN, &balanced.feature_names)?;

    let mut forest = make_forest(config);
    forest.fit(&balanced.x, &y)?;
    let importances = forest
        .feature_importances()
        .cloned()
        .unwrap_or_else(|| ndarray::Array1::zeros(balanced.n_features()));
    let feature_importances = rank_features(&balanced.feature_names, &importances)?;

    let cv = cross_val_score(|| make_forest(config), &balanced.x, &balanced.y, config.cv_folds)?;

    info!(
        outcome = %mode,
        balanced = balanced.n_samples(),
        cv_mean = cv.mean_score,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Outcome pipeline complete"
    );

    Ok(OutcomeReport {
        outcome: mode,
        n_balanced_rows: balanced.n_samples(),
        n_balanced_labels: balanced.y.len(),
        logit,
        feature_importances,
        cv,
    })
}
