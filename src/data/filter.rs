use std::collections::{BTreeMap, BTreeSet};

use super::model::{CategoricalField, NumericField, Record, Table};

// ---------------------------------------------------------------------------
// Filter options: what the selectors can offer
// ---------------------------------------------------------------------------

/// Distinct non-null values of a categorical field.  STORE is sorted
/// ascending; every other field keeps first-observed order.
pub fn options_for(table: &Table, field: CategoricalField) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut values: Vec<String> = table
        .records
        .iter()
        .filter_map(|r| r.label(field))
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect();
    if field == CategoricalField::Store {
        values.sort();
    }
    values
}

/// `(min, max)` over the non-null values of a numeric field, `None` when the
/// column holds no numbers at all.
pub fn range_for(table: &Table, field: NumericField) -> Option<(f64, f64)> {
    table
        .records
        .iter()
        .filter_map(|r| r.measure(field))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Everything the filter widgets need, derived once per loaded table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub categorical: BTreeMap<CategoricalField, Vec<String>>,
    pub gross_margin: Option<(f64, f64)>,
    pub net_revenue: Option<(f64, f64)>,
    pub kitchen_ebitda: Option<(f64, f64)>,
}

impl FilterOptions {
    pub fn from_table(table: &Table) -> Self {
        Self {
            categorical: CategoricalField::ALL
                .iter()
                .map(|&f| (f, options_for(table, f)))
                .collect(),
            gross_margin: range_for(table, NumericField::GrossMargin),
            net_revenue: range_for(table, NumericField::NetRevenue),
            kitchen_ebitda: range_for(table, NumericField::KitchenEbitda),
        }
    }

    /// Choices for one selector (empty when the field has no values).
    pub fn values(&self, field: CategoricalField) -> &[String] {
        self.categorical
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn range(&self, field: NumericField) -> Option<(f64, f64)> {
        match field {
            NumericField::GrossMargin => self.gross_margin,
            NumericField::NetRevenue => self.net_revenue,
            NumericField::KitchenEbitda => self.kitchen_ebitda,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter selection: what the user picked
// ---------------------------------------------------------------------------

/// A closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub lo: f64,
    pub hi: f64,
}

impl NumericRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// The full observed span, or everything when nothing was observed.
    pub fn from_bounds(bounds: Option<(f64, f64)>) -> Self {
        bounds.map_or(Self::new(f64::NEG_INFINITY, f64::INFINITY), |(lo, hi)| {
            Self::new(lo, hi)
        })
    }

    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

/// The user's current filter choices.  Built with every option selected and
/// full ranges, mutated only by UI events, passed by reference to [`apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSelection {
    pub store: BTreeSet<String>,
    pub cm_cohort: BTreeSet<String>,
    pub ebitda_category: BTreeSet<String>,
    pub ebitda_cohort: BTreeSet<String>,
    pub revenue_cohort: BTreeSet<String>,
    pub month: BTreeSet<String>,
    pub gross_margin: NumericRange,
    pub net_revenue: NumericRange,
    /// Shown as a slider but never consulted by [`apply`].
    pub kitchen_ebitda: NumericRange,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self::from_options(&FilterOptions::default())
    }
}

impl FilterSelection {
    /// Everything selected: the "no filtering" state.
    pub fn from_options(options: &FilterOptions) -> Self {
        let all = |f: CategoricalField| options.values(f).iter().cloned().collect();
        Self {
            store: all(CategoricalField::Store),
            cm_cohort: all(CategoricalField::CmCohort),
            ebitda_category: all(CategoricalField::EbitdaCategory),
            ebitda_cohort: all(CategoricalField::EbitdaCohort),
            revenue_cohort: all(CategoricalField::RevenueCohort),
            month: all(CategoricalField::Month),
            gross_margin: NumericRange::from_bounds(options.gross_margin),
            net_revenue: NumericRange::from_bounds(options.net_revenue),
            kitchen_ebitda: NumericRange::from_bounds(options.kitchen_ebitda),
        }
    }

    pub fn values(&self, field: CategoricalField) -> &BTreeSet<String> {
        match field {
            CategoricalField::Store => &self.store,
            CategoricalField::CmCohort => &self.cm_cohort,
            CategoricalField::EbitdaCategory => &self.ebitda_category,
            CategoricalField::EbitdaCohort => &self.ebitda_cohort,
            CategoricalField::RevenueCohort => &self.revenue_cohort,
            CategoricalField::Month => &self.month,
        }
    }

    pub fn values_mut(&mut self, field: CategoricalField) -> &mut BTreeSet<String> {
        match field {
            CategoricalField::Store => &mut self.store,
            CategoricalField::CmCohort => &mut self.cm_cohort,
            CategoricalField::EbitdaCategory => &mut self.ebitda_category,
            CategoricalField::EbitdaCohort => &mut self.ebitda_cohort,
            CategoricalField::RevenueCohort => &mut self.revenue_cohort,
            CategoricalField::Month => &mut self.month,
        }
    }

    pub fn range(&self, field: NumericField) -> NumericRange {
        match field {
            NumericField::GrossMargin => self.gross_margin,
            NumericField::NetRevenue => self.net_revenue,
            NumericField::KitchenEbitda => self.kitchen_ebitda,
        }
    }

    pub fn range_mut(&mut self, field: NumericField) -> &mut NumericRange {
        match field {
            NumericField::GrossMargin => &mut self.gross_margin,
            NumericField::NetRevenue => &mut self.net_revenue,
            NumericField::KitchenEbitda => &mut self.kitchen_ebitda,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

/// Whether a record passes every predicate of `selection`.
///
/// * each categorical value must be in its selected set (an empty set
///   therefore rejects everything; a null value never matches)
/// * GROSS_MARGIN and NET_REVENUE must lie in their closed ranges (a null
///   measure never matches)
pub fn matches(record: &Record, selection: &FilterSelection) -> bool {
    let in_set = |field: CategoricalField| {
        record
            .label(field)
            .is_some_and(|v| selection.values(field).contains(v))
    };
    let in_range = |field: NumericField| {
        record
            .measure(field)
            .is_some_and(|v| selection.range(field).contains(v))
    };

    in_set(CategoricalField::Store)
        && in_range(NumericField::GrossMargin)
        && in_range(NumericField::NetRevenue)
        && in_set(CategoricalField::Month)
        && in_set(CategoricalField::RevenueCohort)
        && in_set(CategoricalField::CmCohort)
        && in_set(CategoricalField::EbitdaCategory)
        && in_set(CategoricalField::EbitdaCohort)
}

/// Return indices of records that pass all filters, in table order.
pub fn filtered_indices(table: &Table, selection: &FilterSelection) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| matches(r, selection))
        .map(|(i, _)| i)
        .collect()
}

/// A filtered view over a table.  Never outlives or mutates the table.
#[derive(Debug, Clone)]
pub struct FilteredTable<'a> {
    table: &'a Table,
    indices: Vec<usize>,
}

impl<'a> FilteredTable<'a> {
    /// Wrap indices previously produced by [`filtered_indices`].
    pub fn from_indices(table: &'a Table, indices: Vec<usize>) -> Self {
        Self { table, indices }
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + Clone + '_ {
        let table = self.table;
        self.indices.iter().map(move |&i| &table.records[i])
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Restrict `table` to the records satisfying `selection`.
pub fn apply<'a>(table: &'a Table, selection: &FilterSelection) -> FilteredTable<'a> {
    FilteredTable::from_indices(table, filtered_indices(table, selection))
}
