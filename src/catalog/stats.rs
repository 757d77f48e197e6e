//! Aggregated catalog statistics.
//!
//! Derived per request from the current snapshot, never persisted. Prices
//! that fail to parse (the 0.0 sentinel) are excluded from price aggregates;
//! ratings count every record, zero included.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::price::{parse_price, round2};
use crate::catalog::query::categories;
use crate::models::BookRecord;

/// Collection-wide statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewStats {
    pub total_books: usize,
    pub mean_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Book count per stringified star rating ("0".."5")
    pub rating_distribution: BTreeMap<String, usize>,
    pub total_categories: usize,
}

/// Statistics for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub total_books: usize,
    pub mean_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub mean_rating: f64,
}

/// (mean, min, max) over the valid prices, all zeros when none remain.
fn price_summary(prices: &[f64]) -> (f64, f64, f64) {
    if prices.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let sum: f64 = prices.iter().sum();
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (
        round2(sum / prices.len() as f64),
        round2(min),
        round2(max),
    )
}

fn valid_prices<'a>(records: impl Iterator<Item = &'a BookRecord>) -> Vec<f64> {
    records
        .map(|record| parse_price(&record.price))
        .filter(|price| *price > 0.0)
        .collect()
}

/// Collection-wide statistics over a snapshot.
pub fn overview(records: &[BookRecord]) -> OverviewStats {
    let mut rating_distribution = BTreeMap::new();
    for record in records {
        *rating_distribution
            .entry(record.rating.to_string())
            .or_insert(0) += 1;
    }

    let (mean_price, min_price, max_price) = price_summary(&valid_prices(records.iter()));

    OverviewStats {
        total_books: records.len(),
        mean_price,
        min_price,
        max_price,
        rating_distribution,
        total_categories: categories(records).len(),
    }
}

/// Per-category statistics, sorted by book count descending.
///
/// The sort is stable, so categories with equal counts keep the ascending
/// name order of the category enumeration.
pub fn category_stats(records: &[BookRecord]) -> Vec<CategoryStats> {
    let mut stats: Vec<CategoryStats> = categories(records)
        .into_iter()
        .map(|category| {
            let members: Vec<&BookRecord> = records
                .iter()
                .filter(|record| record.category == category)
                .collect();
            let (mean_price, min_price, max_price) =
                price_summary(&valid_prices(members.iter().copied()));
            let rating_sum: f64 = members.iter().map(|record| record.rating as f64).sum();
            let mean_rating = round2(rating_sum / members.len() as f64);

            CategoryStats {
                category,
                total_books: members.len(),
                mean_price,
                min_price,
                max_price,
                mean_rating,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.total_books.cmp(&a.total_books));
    stats
}
