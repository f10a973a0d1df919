use std::collections::BTreeMap;

use super::model::{Record, SnapshotRow};
use super::month::parse_month_label;

// ---------------------------------------------------------------------------
// Derived views over the filtered rows
// ---------------------------------------------------------------------------

/// Sums for one month label.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub month: String,
    pub net_revenue: f64,
    pub gross_margin: f64,
    pub kitchen_ebitda: f64,
}

/// Row count for one EBITDA category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Summed net revenue for one store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreTotal {
    pub store: String,
    pub net_revenue: f64,
}

/// Group by MONTH and sum the three measures; null measures count as zero,
/// null months are dropped.
///
/// Rows come out in label order ("Apr 2024" before "Jan 2024"), the way a
/// sorted group-by orders string keys.  Use [`sort_chronologically`] for a
/// calendar axis.
pub fn monthly_trend<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<&str, (f64, f64, f64)> = BTreeMap::new();
    for r in records {
        let Some(month) = r.month.as_deref() else {
            continue;
        };
        let entry = by_month.entry(month).or_default();
        entry.0 += r.net_revenue.unwrap_or(0.0);
        entry.1 += r.gross_margin.unwrap_or(0.0);
        entry.2 += r.kitchen_ebitda.unwrap_or(0.0);
    }
    by_month
        .into_iter()
        .map(|(month, (net_revenue, gross_margin, kitchen_ebitda))| MonthlyTotal {
            month: month.to_string(),
            net_revenue,
            gross_margin,
            kitchen_ebitda,
        })
        .collect()
}

/// Reorder a monthly trend by calendar date.  Labels that do not parse sort
/// last, keeping their relative order.
pub fn sort_chronologically(trend: &mut [MonthlyTotal]) {
    trend.sort_by_key(|t| match parse_month_label(&t.month) {
        Some(d) => (0, Some(d)),
        None => (1, None),
    });
}

/// Count rows per EBITDA category, first-observed order.
pub fn category_distribution<'a>(
    records: impl IntoIterator<Item = &'a Record>,
) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    for r in records {
        let Some(category) = r.ebitda_category.as_deref() else {
            continue;
        };
        match counts.iter_mut().find(|c| c.category == category) {
            Some(c) => c.count += 1,
            None => counts.push(CategoryCount {
                category: category.to_string(),
                count: 1,
            }),
        }
    }
    counts
}

/// Fraction of all counted rows falling in each category (for pie slices).
pub fn shares(counts: &[CategoryCount]) -> Vec<f64> {
    let total: usize = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    counts
        .iter()
        .map(|c| c.count as f64 / total as f64)
        .collect()
}

/// Group by STORE and sum NET_REVENUE, ascending store order.
pub fn store_performance<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<StoreTotal> {
    let mut by_store: BTreeMap<&str, f64> = BTreeMap::new();
    for r in records {
        if let Some(store) = r.store.as_deref() {
            *by_store.entry(store).or_insert(0.0) += r.net_revenue.unwrap_or(0.0);
        }
    }
    by_store
        .into_iter()
        .map(|(store, net_revenue)| StoreTotal {
            store: store.to_string(),
            net_revenue,
        })
        .collect()
}

/// Project each row onto STORE, MONTH, NET_REVENUE, GROSS_MARGIN,
/// KITCHEN_EBITDA, preserving order.
pub fn snapshot<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<SnapshotRow> {
    records
        .into_iter()
        .map(|r| SnapshotRow {
            store: r.store.clone(),
            month: r.month.clone(),
            net_revenue: r.net_revenue,
            gross_margin: r.gross_margin,
            kitchen_ebitda: r.kitchen_ebitda,
        })
        .collect()
}

/// Header of the exported snapshot; matches the `SnapshotRow` field names.
pub const SNAPSHOT_COLUMNS: [&str; 5] =
    ["STORE", "MONTH", "NET_REVENUE", "GROSS_MARGIN", "KITCHEN_EBITDA"];

/// Write the snapshot as CSV with the source column names as header.  An
/// empty snapshot still gets the header line.
pub fn write_snapshot_csv<W: std::io::Write>(rows: &[SnapshotRow], out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    if rows.is_empty() {
        writer.write_record(SNAPSHOT_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// All views for one recomputation
// ---------------------------------------------------------------------------

/// Everything the charts and the table render, recomputed on each filter
/// change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardViews {
    pub monthly: Vec<MonthlyTotal>,
    pub categories: Vec<CategoryCount>,
    pub stores: Vec<StoreTotal>,
    pub snapshot: Vec<SnapshotRow>,
}

impl DashboardViews {
    pub fn compute<'a, I>(records: I, chronological: bool) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
        I::IntoIter: Clone,
    {
        let records = records.into_iter();
        let mut monthly = monthly_trend(records.clone());
        if chronological {
            sort_chronologically(&mut monthly);
        }
        Self {
            monthly,
            categories: category_distribution(records.clone()),
            stores: store_performance(records.clone()),
            snapshot: snapshot(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::data::filter::tests::{record, table};
    use crate::data::filter::{FilterOptions, FilterSelection, apply};

    /// (A,Jan)=100, (A,Feb)=200, (B,Jan)=300, (B,Feb)=400
    fn two_store_table() -> crate::data::model::Table {
        table(vec![
            record("A", "Jan 2024", 100.0),
            record("A", "Feb 2024", 200.0),
            record("B", "Jan 2024", 300.0),
            record("B", "Feb 2024", 400.0),
        ])
    }

    fn monthly_net(trend: &[MonthlyTotal], month: &str) -> Option<f64> {
        trend.iter().find(|t| t.month == month).map(|t| t.net_revenue)
    }

    #[test]
    fn unfiltered_totals() {
        let t = two_store_table();
        let selection = FilterSelection::from_options(&FilterOptions::from_table(&t));
        let view = apply(&t, &selection);

        let stores = store_performance(view.records());
        assert_eq!(
            stores,
            vec![
                StoreTotal { store: "A".into(), net_revenue: 300.0 },
                StoreTotal { store: "B".into(), net_revenue: 700.0 },
            ]
        );

        let trend = monthly_trend(view.records());
        assert_eq!(trend.len(), 2);
        assert_eq!(monthly_net(&trend, "Jan 2024"), Some(400.0));
        assert_eq!(monthly_net(&trend, "Feb 2024"), Some(600.0));
    }

    #[test]
    fn single_store_selection() {
        let t = two_store_table();
        let mut selection = FilterSelection::from_options(&FilterOptions::from_table(&t));
        selection.store = BTreeSet::from(["A".to_string()]);
        let view = apply(&t, &selection);

        assert_eq!(
            store_performance(view.records()),
            vec![StoreTotal { store: "A".into(), net_revenue: 300.0 }]
        );
        let trend = monthly_trend(view.records());
        assert_eq!(monthly_net(&trend, "Jan 2024"), Some(100.0));
        assert_eq!(monthly_net(&trend, "Feb 2024"), Some(200.0));
    }

    #[test]
    fn monthly_sums_cover_all_three_measures() {
        let t = two_store_table();
        let trend = monthly_trend(&t.records);
        let jan = trend.iter().find(|m| m.month == "Jan 2024").unwrap();
        // gross margin = revenue / 2, ebitda = revenue / 10
        assert_eq!(jan.gross_margin, 200.0);
        assert_eq!(jan.kitchen_ebitda, 40.0);
    }

    #[test]
    fn monthly_trend_uses_label_order_until_sorted() {
        let t = table(vec![
            record("A", "Mar 2024", 1.0),
            record("A", "Jan 2024", 1.0),
            record("A", "Feb 2024", 1.0),
            record("A", "Dec 2023", 1.0),
        ]);
        let mut trend = monthly_trend(&t.records);
        let labels: Vec<&str> = trend.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["Dec 2023", "Feb 2024", "Jan 2024", "Mar 2024"]);

        sort_chronologically(&mut trend);
        let labels: Vec<&str> = trend.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["Dec 2023", "Jan 2024", "Feb 2024", "Mar 2024"]);
    }

    #[test]
    fn null_keys_are_dropped_and_null_measures_skipped() {
        let mut no_month = record("A", "Jan 2024", 10.0);
        no_month.month = None;
        let mut no_ebitda = record("B", "Jan 2024", 20.0);
        no_ebitda.kitchen_ebitda = None;
        no_ebitda.ebitda_category = None;
        let t = table(vec![no_month, no_ebitda]);

        let trend = monthly_trend(&t.records);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].net_revenue, 20.0);
        assert_eq!(trend[0].kitchen_ebitda, 0.0);

        let categories = category_distribution(&t.records);
        assert_eq!(
            categories,
            vec![CategoryCount { category: "Positive".into(), count: 1 }]
        );
    }

    #[test]
    fn category_counts_and_shares() {
        let mut a = record("A", "Jan 2024", 1.0);
        a.ebitda_category = Some("Negative".into());
        let t = table(vec![
            a,
            record("B", "Jan 2024", 1.0),
            record("C", "Jan 2024", 1.0),
            record("D", "Jan 2024", 1.0),
        ]);
        let counts = category_distribution(&t.records);
        assert_eq!(counts[0], CategoryCount { category: "Negative".into(), count: 1 });
        assert_eq!(counts[1], CategoryCount { category: "Positive".into(), count: 3 });
        assert_eq!(shares(&counts), vec![0.25, 0.75]);
    }

    #[test]
    fn empty_input_yields_empty_views() {
        let views = DashboardViews::compute(&Vec::<Record>::new(), true);
        assert_eq!(views, DashboardViews::default());
        assert!(shares(&[]).is_empty());
    }

    #[test]
    fn snapshot_projects_and_exports() {
        let t = table(vec![record("B", "Feb 2024", 10.0), record("A", "Jan 2024", 20.0)]);
        let rows = snapshot(&t.records);
        assert_eq!(rows[0].store.as_deref(), Some("B"));
        assert_eq!(rows[1].net_revenue, Some(20.0));

        let mut out = Vec::new();
        write_snapshot_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("STORE,MONTH,NET_REVENUE,GROSS_MARGIN,KITCHEN_EBITDA")
        );
        assert_eq!(lines.next(), Some("B,Feb 2024,10.0,5.0,1.0"));
    }

    #[test]
    fn empty_snapshot_exports_header_only() {
        let mut out = Vec::new();
        write_snapshot_csv(&[], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, format!("{}\n", SNAPSHOT_COLUMNS.join(",")));
    }
}
