//! Query and filter operations over a catalog snapshot.
//!
//! Every function here is a pure view over an already-obtained snapshot's
//! records; none of them reload or mutate anything.

use std::collections::BTreeSet;

use crate::catalog::price::parse_price;
use crate::models::BookRecord;

/// Optional conjunctive search filters. Every provided filter must match.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Case-insensitive substring match on the title
    pub title: Option<String>,
    /// Case-insensitive substring match on the category
    pub category: Option<String>,
    /// Keep records rated at least this high
    pub min_rating: Option<u8>,
    /// Keep records whose parsed price is at most this; unparseable prices
    /// parse to 0.0 and therefore always pass
    pub max_price: Option<f64>,
}

/// Page of records in snapshot (source) order.
///
/// Range validation (limit in 1..=1000, offset >= 0) happens at the boundary.
pub fn paginate(records: &[BookRecord], limit: usize, offset: usize) -> Vec<BookRecord> {
    records.iter().skip(offset).take(limit).cloned().collect()
}

/// First record with the given id.
///
/// Linear scan; fine for catalog-sized datasets, no index needed.
pub fn find_by_id(records: &[BookRecord], id: u32) -> Option<&BookRecord> {
    records.iter().find(|record| record.id == id)
}

/// All records matching every provided filter.
pub fn search(records: &[BookRecord], filter: &SearchFilter) -> Vec<BookRecord> {
    let title = filter.title.as_deref().map(str::to_lowercase);
    let category = filter.category.as_deref().map(str::to_lowercase);

    records
        .iter()
        .filter(|record| {
            title
                .as_deref()
                .map_or(true, |t| record.title.to_lowercase().contains(t))
                && category
                    .as_deref()
                    .map_or(true, |c| record.category.to_lowercase().contains(c))
                && filter
                    .min_rating
                    .map_or(true, |min| record.rating >= min)
                && filter
                    .max_price
                    .map_or(true, |max| parse_price(&record.price) <= max)
        })
        .cloned()
        .collect()
}

/// Highest-rated records, ties broken by title ascending.
pub fn top_rated(records: &[BookRecord], limit: usize) -> Vec<BookRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.title.cmp(&b.title)));
    sorted.truncate(limit);
    sorted
}

/// Records whose parsed price falls in `[min, max]`, sorted ascending by
/// parsed price. Callers validate `min <= max` before invoking.
pub fn by_price_range(records: &[BookRecord], min: f64, max: f64) -> Vec<BookRecord> {
    let mut matched: Vec<(f64, BookRecord)> = records
        .iter()
        .filter_map(|record| {
            let price = parse_price(&record.price);
            (min <= price && price <= max).then(|| (price, record.clone()))
        })
        .collect();
    matched.sort_by(|a, b| a.0.total_cmp(&b.0));
    matched.into_iter().map(|(_, record)| record).collect()
}

/// Distinct non-empty category names, sorted ascending (case-sensitive).
pub fn categories(records: &[BookRecord]) -> Vec<String> {
    let set: BTreeSet<&str> = records
        .iter()
        .map(|record| record.category.as_str())
        .filter(|category| !category.is_empty())
        .collect();
    set.into_iter().map(String::from).collect()
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
            record(3, "Sapiens", "£54.23", 5, "History"),
            record(4, "The Requiem Red", "£22.65", 1, "Fiction"),
            record(5, "Olio", "N/A", 1, "Poetry"),
            record(6, "Mesaerion", "£37.59", 1, ""),
        ]
    }

    #[test]
    fn test_paginate_window_and_bounds() {
        let records = sample_records();
        assert_eq!(paginate(&records, 2, 0).len(), 2);
        assert_eq!(paginate(&records, 2, 5).len(), 1);
        assert_eq!(paginate(&records, 2, 6).len(), 0);
        assert_eq!(paginate(&records, 100, 0).len(), 6);
    }

    #[test]
    fn test_paginate_pages_reconstruct_snapshot() {
        let records = sample_records();
        let mut pages = Vec::new();
        for offset in (0..records.len()).step_by(2) {
            pages.extend(paginate(&records, 2, offset));
        }
        assert_eq!(pages, records);
    }

    #[test]
    fn test_find_by_id() {
        let records = sample_records();
        assert_eq!(find_by_id(&records, 3).map(|r| r.title.as_str()), Some("Sapiens"));
        assert!(find_by_id(&records, 99).is_none());
    }

    #[test]
    fn test_search_title_is_case_insensitive_substring() {
        let records = sample_records();
        let filter = SearchFilter {
            title: Some("sharp".into()),
            ..SearchFilter::default()
        };
        let hits = search(&records, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_search_combines_filters_conjunctively() {
        let records = sample_records();
        let filter = SearchFilter {
            category: Some("fiction".into()),
            min_rating: Some(2),
            ..SearchFilter::default()
        };
        let hits = search(&records, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_search_result_is_subset_of_each_single_filter() {
        let records = sample_records();
        let combined = SearchFilter {
            category: Some("poetry".into()),
            max_price: Some(60.0),
            min_rating: Some(1),
            ..SearchFilter::default()
        };
        let hits = search(&records, &combined);

        for single in [
            SearchFilter {
                category: combined.category.clone(),
                ..SearchFilter::default()
            },
            SearchFilter {
                max_price: combined.max_price,
                ..SearchFilter::default()
            },
            SearchFilter {
                min_rating: combined.min_rating,
                ..SearchFilter::default()
            },
        ] {
            let alone = search(&records, &single);
            for hit in &hits {
                assert!(alone.contains(hit));
            }
        }
    }

    #[test]
    fn test_search_max_price_passes_unparseable_prices() {
        let records = sample_records();
        let filter = SearchFilter {
            max_price: Some(30.0),
            ..SearchFilter::default()
        };
        let hits = search(&records, &filter);
        let ids: Vec<u32> = hits.iter().map(|r| r.id).collect();
        // "N/A" parses to 0.0 and slips under any bound
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn test_top_rated_orders_by_rating_then_title() {
        let records = sample_records();
        let top = top_rated(&records, 10);
        for pair in top.windows(2) {
            assert!(pair[0].rating >= pair[1].rating);
            if pair[0].rating == pair[1].rating {
                assert!(pair[0].title <= pair[1].title);
            }
        }
        assert_eq!(top[0].id, 3);
        assert_eq!(top_rated(&records, 1).len(), 1);
    }

    #[test]
    fn test_price_range_bounded_and_sorted() {
        let records = sample_records();
        let hits = by_price_range(&records, 20.0, 52.0);
        let prices: Vec<f64> = hits.iter().map(|r| parse_price(&r.price)).collect();
        assert_eq!(prices, vec![22.65, 37.59, 47.82, 51.77]);
        for price in &prices {
            assert!((20.0..=52.0).contains(price));
        }
    }

    #[test]
    fn test_price_range_zero_min_includes_unparseable() {
        let records = sample_records();
        let hits = by_price_range(&records, 0.0, 30.0);
        // Olio's "N/A" price parses to 0.0 and sorts first
        assert_eq!(hits[0].id, 5);
    }

    #[test]
    fn test_categories_distinct_sorted_non_empty() {
        let records = sample_records();
        assert_eq!(categories(&records), vec!["Fiction", "History", "Poetry"]);
    }
}
