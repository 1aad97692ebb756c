use crate::model::{ProductTotal, RawTable, SalesRecord, StoreTotal};
use chrono::Days;
use rayon::prelude::*;
use std::collections::HashMap;

fn sum_by<'a, K>(rows: &'a [SalesRecord], key: K) -> HashMap<&'a str, f64>
where
    K: Fn(&'a SalesRecord) -> Option<&'a str> + Sync,
{
    rows.par_iter()
        .fold(HashMap::new, |mut acc: HashMap<&'a str, f64>, r| {
            if let Some(k) = key(r) {
                *acc.entry(k).or_insert(0.0) += r.sales;
            }
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (k, v) in b {
                *a.entry(k).or_insert(0.0) += v;
            }
            a
        })
}

/// Best-selling products over the whole table, highest total first.
/// Equal totals are ordered by product id.
pub fn top_n_products(table: &RawTable, n: usize) -> Vec<ProductTotal> {
    let totals = sum_by(table.records(), |r| Some(r.product_id.as_str()));

    let mut ranked: Vec<ProductTotal> = totals
        .into_iter()
        .map(|(product_id, total_sales)| ProductTotal {
            product_id: product_id.to_string(),
            total_sales,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.total_sales
            .total_cmp(&a.total_sales)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(n);
    ranked
}

/// Sales per store over the rows dated on or after `max(date) - window_days`.
pub fn store_sales_trailing_window(table: &RawTable, window_days: u32) -> Vec<StoreTotal> {
    let Some(latest) = table.max_date() else {
        return Vec::new();
    };
    // An underflowing window simply covers the whole table.
    let start = latest.checked_sub_days(Days::new(u64::from(window_days)));

    let totals = sum_by(table.records(), |r| match start {
        Some(start) if r.date < start => None,
        _ => Some(r.store_id.as_str()),
    });

    let mut stores: Vec<StoreTotal> = totals
        .into_iter()
        .map(|(store_id, total_sales)| StoreTotal {
            store_id: store_id.to_string(),
            total_sales,
        })
        .collect();
    stores.sort_by(|a, b| a.store_id.cmp(&b.store_id));
    stores
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn record(day: u32, store: &str, product: &str, sales: f64) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            state: "CA".to_string(),
            store_id: store.to_string(),
            product_id: product.to_string(),
            sales,
            margin: 0.0,
            out_of_stock_pct: 0.0,
        }
    }

    fn table() -> RawTable {
        RawTable::new(vec![
            record(1, "S1", "P1", 10.0),
            record(2, "S1", "P2", 40.0),
            record(2, "S2", "P3", 5.0),
            record(3, "S2", "P1", 25.0),
            record(4, "S3", "P4", 1.0),
            record(5, "S1", "P5", 2.0),
            record(6, "S2", "P6", 30.0),
            record(10, "S3", "P2", 3.0),
        ])
    }

    #[test]
    fn top_products_ranked_descending() {
        let top = top_n_products(&table(), 3);
        assert_eq!(
            top,
            vec![
                ProductTotal { product_id: "P2".to_string(), total_sales: 43.0 },
                ProductTotal { product_id: "P1".to_string(), total_sales: 35.0 },
                ProductTotal { product_id: "P6".to_string(), total_sales: 30.0 },
            ]
        );
    }

    #[rstest]
    #[case(0, 0)]
    #[case(5, 5)]
    #[case(50, 6)]
    fn top_products_returns_at_most_n(#[case] n: usize, #[case] expected: usize) {
        let top = top_n_products(&table(), n);
        assert_eq!(top.len(), expected);
        for pair in top.windows(2) {
            assert!(pair[0].total_sales >= pair[1].total_sales);
        }
    }

    #[test]
    fn top_product_totals_match_the_table() {
        let t = table();
        for entry in top_n_products(&t, 10) {
            let expected: f64 = t
                .records()
                .iter()
                .filter(|r| r.product_id == entry.product_id)
                .map(|r| r.sales)
                .sum();
            assert_eq!(entry.total_sales, expected);
        }
    }

    #[test]
    fn ties_are_ordered_by_product_id() {
        let t = RawTable::new(vec![record(1, "S1", "B", 5.0), record(1, "S1", "A", 5.0)]);
        let ids: Vec<String> = top_n_products(&t, 2).into_iter().map(|p| p.product_id).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn trailing_window_excludes_rows_before_start() {
        // Latest date is 2024-01-10, so the window starts at 2024-01-03.
        let stores = store_sales_trailing_window(&table(), 7);
        assert_eq!(
            stores,
            vec![
                StoreTotal { store_id: "S1".to_string(), total_sales: 2.0 },
                StoreTotal { store_id: "S2".to_string(), total_sales: 55.0 },
                StoreTotal { store_id: "S3".to_string(), total_sales: 4.0 },
            ]
        );
    }

    #[test]
    fn window_larger_than_history_covers_everything() {
        let stores = store_sales_trailing_window(&table(), 365);
        let total: f64 = stores.iter().map(|s| s.total_sales).sum();
        assert_eq!(total, 116.0);
    }

    #[test]
    fn empty_table_gives_empty_views() {
        let t = RawTable::default();
        assert!(top_n_products(&t, 5).is_empty());
        assert!(store_sales_trailing_window(&t, 7).is_empty());
    }
}
