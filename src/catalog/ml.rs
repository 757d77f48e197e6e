//! Feature views and rule-based rating prediction.
//!
//! The "prediction" is a fixed deterministic formula over the request inputs
//! and the current snapshot's category set. There is no trained model and no
//! model-loading machinery; the feature/training-data views exist so external
//! tooling can consume the catalog in a tabular form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::price::parse_price;
use crate::catalog::query::categories;
use crate::models::BookRecord;

/// Feature row for one book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookFeatures {
    pub id: u32,
    pub price: f64,
    pub rating: u8,
    pub category_index: usize,
    pub category: String,
    pub in_stock: bool,
    pub title_length: usize,
}

/// Feature rows plus the category encoding used to build them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    pub total_records: usize,
    pub features: Vec<BookFeatures>,
    pub category_mapping: BTreeMap<String, usize>,
}

/// Catalog flattened into a design matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingData {
    #[serde(rename = "X")]
    pub x: Vec<Vec<f64>>,
    pub y: Vec<u8>,
    pub feature_names: Vec<String>,
    pub total_samples: usize,
}

/// Inputs echoed back by a prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFeatures {
    pub price: f64,
    pub category_index: f64,
    pub title_length: f64,
}

/// Result of a rating prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_rating: u8,
    pub confidence: f64,
    pub features_used: PredictionFeatures,
    pub timestamp: DateTime<Utc>,
}

/// Category name -> index, over the snapshot's sorted distinct categories.
pub fn category_mapping(records: &[BookRecord]) -> BTreeMap<String, usize> {
    categories(records)
        .into_iter()
        .enumerate()
        .map(|(index, category)| (category, index))
        .collect()
}

/// Per-book feature rows.
pub fn features(records: &[BookRecord]) -> FeatureSet {
    let mapping = category_mapping(records);
    let features = records
        .iter()
        .map(|record| BookFeatures {
            id: record.id,
            price: parse_price(&record.price),
            rating: record.rating,
            category_index: mapping.get(&record.category).copied().unwrap_or(0),
            category: record.category.clone(),
            in_stock: record.in_stock(),
            title_length: record.title.chars().count(),
        })
        .collect::<Vec<_>>();

    FeatureSet {
        total_records: features.len(),
        features,
        category_mapping: mapping,
    }
}

/// Catalog as a design matrix with the rating as target.
pub fn training_data(records: &[BookRecord]) -> TrainingData {
    let mapping = category_mapping(records);
    let mut x = Vec::with_capacity(records.len());
    let mut y = Vec::with_capacity(records.len());

    for record in records {
        x.push(vec![
            parse_price(&record.price),
            mapping.get(&record.category).copied().unwrap_or(0) as f64,
            if record.in_stock() { 1.0 } else { 0.0 },
            record.title.chars().count() as f64,
        ]);
        y.push(record.rating);
    }

    TrainingData {
        total_samples: x.len(),
        x,
        y,
        feature_names: ["price", "category_index", "in_stock", "title_length"]
            .map(String::from)
            .to_vec(),
    }
}

/// Predict a rating for a hypothetical book.
///
/// Pure function of the snapshot's category set and the inputs:
/// base 3.0, +1 above £50 / -1 below £20, +0.5 for Classics or Poetry,
/// rounded (ties away from zero) and clamped to 1..=5. Confidence is a
/// constant 0.75.
pub fn predict(records: &[BookRecord], title: &str, price: f64, category: &str) -> Prediction {
    let mapping = category_mapping(records);
    let category_index = mapping.get(category).copied().unwrap_or(0);

    let mut base = 3.0_f64;
    if price > 50.0 {
        base += 1.0;
    } else if price < 20.0 {
        base -= 1.0;
    }
    if category == "Classics" || category == "Poetry" {
        base += 0.5;
    }

    let predicted_rating = (base.round() as i64).clamp(1, 5) as u8;

    Prediction {
        predicted_rating,
        confidence: 0.75,
        features_used: PredictionFeatures {
            price,
            category_index: category_index as f64,
            title_length: title.chars().count() as f64,
        },
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, title: &str, price: &str, rating: u8, category: &str) -> BookRecord {
        BookRecord {
            id,
            title: title.to_string(),
            price: price.to_string(),
            rating,
            availability: "In stock".to_string(),
            category: category.to_string(),
            image_url: String::new(),
        }
    }

    fn sample_records() -> Vec<BookRecord> {
        vec![
            record(1, "A Light in the Attic", "£51.77", 3, "Poetry"),
            record(2, "Sharp Objects", "£47.82", 4, "Fiction"),
        ]
    }

    #[test]
    fn test_category_mapping_follows_sorted_order() {
        let mapping = category_mapping(&sample_records());
        assert_eq!(mapping.get("Fiction"), Some(&0));
        assert_eq!(mapping.get("Poetry"), Some(&1));
    }

    #[test]
    fn test_features_row_shape() {
        let set = features(&sample_records());
        assert_eq!(set.total_records, 2);

        let first = &set.features[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.price, 51.77);
        assert_eq!(first.category_index, 1);
        assert!(first.in_stock);
        assert_eq!(first.title_length, 20);
    }

    #[test]
    fn test_training_data_matrix() {
        let data = training_data(&sample_records());
        assert_eq!(data.total_samples, 2);
        assert_eq!(data.x.len(), data.y.len());
        assert_eq!(data.x[0], vec![51.77, 1.0, 1.0, 20.0]);
        assert_eq!(data.y, vec![3, 4]);
        assert_eq!(data.feature_names.len(), 4);
    }

    #[test]
    fn test_predict_expensive_poetry_rounds_up_to_five() {
        // base 3 + 1 (price > 50) + 0.5 (Poetry) = 4.5 -> 5
        let prediction = predict(&sample_records(), "X", 60.0, "Poetry");
        assert_eq!(prediction.predicted_rating, 5);
        assert_eq!(prediction.confidence, 0.75);
        assert_eq!(prediction.features_used.price, 60.0);
        assert_eq!(prediction.features_used.category_index, 1.0);
        assert_eq!(prediction.features_used.title_length, 1.0);
    }

    #[test]
    fn test_predict_cheap_book_drops_to_two() {
        let prediction = predict(&sample_records(), "Budget", 10.0, "Fiction");
        assert_eq!(prediction.predicted_rating, 2);
    }

    #[test]
    fn test_predict_mid_price_stays_at_base() {
        let prediction = predict(&sample_records(), "Plain", 30.0, "Fiction");
        assert_eq!(prediction.predicted_rating, 3);
    }

    #[test]
    fn test_predict_unknown_category_maps_to_index_zero() {
        let prediction = predict(&sample_records(), "X", 30.0, "Mystery");
        assert_eq!(prediction.features_used.category_index, 0.0);
    }

    #[test]
    fn test_predict_stays_within_star_bounds() {
        for price in [0.0, 5.0, 19.99, 20.0, 49.99, 50.01, 500.0] {
            for category in ["Classics", "Poetry", "Fiction", "Nope"] {
                let prediction = predict(&sample_records(), "Any", price, category);
                assert!((1..=5).contains(&prediction.predicted_rating));
                assert_eq!(prediction.confidence, 0.75);
            }
        }
    }

    #[test]
    fn test_predict_works_on_empty_snapshot() {
        let prediction = predict(&[], "X", 60.0, "Poetry");
        assert_eq!(prediction.predicted_rating, 5);
        assert_eq!(prediction.features_used.category_index, 0.0);
    }
}
