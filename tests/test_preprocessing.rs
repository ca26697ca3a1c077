//! Integration test: categorical encoding and feature matrix extraction

use complaint_outcomes::preprocessing::{FeatureMatrix, RareCategoryEncoder, OTHER_SUFFIX};
use polars::prelude::*;

fn sample_df() -> DataFrame {
    // 12 positive rows; "white" appears 11 times among them, "black" 1 time
    let mut labels = vec![1i64; 12];
    labels.extend(vec![0i64; 6]);
    let mut race = vec!["white"; 11];
    race.extend(["black", "black", "black", "white", "black", "[unknown]", "black"]);
    let mut sex = vec!["M"; 12];
    sex.extend(["F"; 6]);
    let age: Vec<f64> = (0..18).map(|i| 20.0 + i as f64).collect();
    let month: Vec<i64> = (0..18).map(|i| (i % 12) + 1).collect();

    df!(
        "investigative_outcome" => labels,
        "complainant_race" => race,
        "complainant_age" => age,
        "po_sex" => sex,
        "month_of_year" => month
    )
    .unwrap()
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns().iter().map(|c| c.name().to_string()).collect()
}

#[test]
fn test_encode_keeps_frequent_positive_categories() {
    let df = sample_df();
    let mut encoder = RareCategoryEncoder::new(&["complainant_race", "po_sex"]);
    let encoded = encoder.fit_transform(&df, "investigative_outcome").unwrap();

    assert_eq!(
        column_names(&encoded),
        vec![
            "investigative_outcome",
            "complainant_age",
            "month_of_year",
            "complainant_race_white",
            "po_sex_M",
        ]
    );
    assert_eq!(encoded.height(), 18);
}

#[test]
fn test_no_other_columns_after_encoding() {
    let df = sample_df();
    for threshold in [0, 5, 10, 20] {
        let encoded = RareCategoryEncoder::new(&["complainant_race", "po_sex"])
            .with_threshold(threshold)
            .fit_transform(&df, "investigative_outcome")
            .unwrap();
        assert!(column_names(&encoded).iter().all(|n| !n.contains(OTHER_SUFFIX)));
    }
}

#[test]
fn test_feature_matrix_from_encoded_frame() {
    let df = sample_df();
    let encoded = RareCategoryEncoder::new(&["complainant_race", "po_sex"])
        .fit_transform(&df, "investigative_outcome")
        .unwrap();
    let features = FeatureMatrix::from_frame(&encoded, "investigative_outcome").unwrap();

    assert_eq!(features.n_samples(), 18);
    assert_eq!(
        features.feature_names,
        vec!["complainant_age", "month_of_year", "complainant_race_white", "po_sex_M"]
    );
    assert_eq!(features.y.iter().filter(|&&v| v == 1).count(), 12);

    // Row 11 is the positive "black" complainant: collapsed to other
    assert_eq!(features.x[[11, 2]], 0.0);
    assert_eq!(features.x[[0, 2]], 1.0);
    assert_eq!(features.x[[0, 0]], 20.0);
    assert_eq!(features.x[[0, 1]], 1.0);
}
