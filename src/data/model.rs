use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// RawCell – a single cell as read from the source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, before the schema is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Native date/time cell (spreadsheet date, parquet timestamp).
    Date(NaiveDateTime),
    Empty,
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Text(s) => write!(f, "{s}"),
            RawCell::Number(v) => write!(f, "{v}"),
            RawCell::Bool(b) => write!(f, "{b}"),
            RawCell::Date(d) => write!(f, "{d}"),
            RawCell::Empty => Ok(()),
        }
    }
}

impl RawCell {
    /// Interpret the cell as an identifier / label.  Blank text is null.
    pub fn as_label(&self) -> Option<String> {
        match self {
            RawCell::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            RawCell::Number(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(format!("{}", *v as i64))
            }
            RawCell::Number(v) if v.is_nan() => None,
            RawCell::Number(v) => Some(v.to_string()),
            RawCell::Bool(b) => Some(b.to_string()),
            RawCell::Date(d) => Some(d.to_string()),
            RawCell::Empty => None,
        }
    }

    /// Interpret the cell as a numeric measure.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawCell::Number(v) if !v.is_nan() => Some(*v),
            RawCell::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                cleaned.parse::<f64>().ok().filter(|v| !v.is_nan())
            }
            _ => None,
        }
    }
}

/// A raw sheet: header cells plus the data rows below them.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

// ---------------------------------------------------------------------------
// Record – one row of the P&L table
// ---------------------------------------------------------------------------

/// A single kitchen P&L row.  Every field is nullable; nulls never match a
/// filter predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub store: Option<String>,
    pub cm_cohort: Option<String>,
    pub ebitda_category: Option<String>,
    pub ebitda_cohort: Option<String>,
    pub revenue_cohort: Option<String>,
    /// "Mon YYYY" label, null when the source cell was not a date.
    pub month: Option<String>,
    pub net_revenue: Option<f64>,
    pub gross_margin: Option<f64>,
    pub kitchen_ebitda: Option<f64>,
}

impl Record {
    /// Value of a categorical field.
    pub fn label(&self, field: CategoricalField) -> Option<&str> {
        let v = match field {
            CategoricalField::Store => &self.store,
            CategoricalField::CmCohort => &self.cm_cohort,
            CategoricalField::EbitdaCategory => &self.ebitda_category,
            CategoricalField::EbitdaCohort => &self.ebitda_cohort,
            CategoricalField::RevenueCohort => &self.revenue_cohort,
            CategoricalField::Month => &self.month,
        };
        v.as_deref()
    }

    /// Value of a numeric field.
    pub fn measure(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::GrossMargin => self.gross_margin,
            NumericField::NetRevenue => self.net_revenue,
            NumericField::KitchenEbitda => self.kitchen_ebitda,
        }
    }
}

// ---------------------------------------------------------------------------
// Field identifiers
// ---------------------------------------------------------------------------

/// Categorical fields exposed as multi-select filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoricalField {
    Store,
    CmCohort,
    EbitdaCategory,
    EbitdaCohort,
    RevenueCohort,
    Month,
}

impl CategoricalField {
    /// Display order of the selectors.
    pub const ALL: [CategoricalField; 6] = [
        CategoricalField::Store,
        CategoricalField::CmCohort,
        CategoricalField::EbitdaCategory,
        CategoricalField::EbitdaCohort,
        CategoricalField::RevenueCohort,
        CategoricalField::Month,
    ];

    /// Normalised column name in the source file.
    pub fn column(self) -> &'static str {
        match self {
            CategoricalField::Store => "STORE",
            CategoricalField::CmCohort => "CM_COHORT",
            CategoricalField::EbitdaCategory => "EBITDA_CATEGORY",
            CategoricalField::EbitdaCohort => "EBITDA_COHORT",
            CategoricalField::RevenueCohort => "REVENUE_COHORT",
            CategoricalField::Month => "MONTH",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoricalField::Store => "Store",
            CategoricalField::CmCohort => "CM Cohort",
            CategoricalField::EbitdaCategory => "EBITDA Category",
            CategoricalField::EbitdaCohort => "EBITDA Cohort",
            CategoricalField::RevenueCohort => "Revenue Cohort",
            CategoricalField::Month => "Month",
        }
    }
}

/// Numeric measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    GrossMargin,
    NetRevenue,
    KitchenEbitda,
}

impl NumericField {
    pub fn column(self) -> &'static str {
        match self {
            NumericField::GrossMargin => "GROSS_MARGIN",
            NumericField::NetRevenue => "NET_REVENUE",
            NumericField::KitchenEbitda => "KITCHEN_EBITDA",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NumericField::GrossMargin => "Gross Margin",
            NumericField::NetRevenue => "Net Revenue",
            NumericField::KitchenEbitda => "Kitchen EBITDA",
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The parsed P&L table.  Built once per load and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Normalised column names in file order (including unused columns).
    pub columns: Vec<String>,
    /// All records (rows) in file order.
    pub records: Vec<Record>,
}

impl Table {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One row of the snapshot table shown (and exported) to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    #[serde(rename = "STORE")]
    pub store: Option<String>,
    #[serde(rename = "MONTH")]
    pub month: Option<String>,
    #[serde(rename = "NET_REVENUE")]
    pub net_revenue: Option<f64>,
    #[serde(rename = "GROSS_MARGIN")]
    pub gross_margin: Option<f64>,
    #[serde(rename = "KITCHEN_EBITDA")]
    pub kitchen_ebitda: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_render_integral_numbers_without_fraction() {
        assert_eq!(RawCell::Number(101.0).as_label().as_deref(), Some("101"));
        assert_eq!(RawCell::Number(1.5).as_label().as_deref(), Some("1.5"));
        assert_eq!(RawCell::Text("  North  ".into()).as_label().as_deref(), Some("North"));
        assert_eq!(RawCell::Text("   ".into()).as_label(), None);
        assert_eq!(RawCell::Empty.as_label(), None);
    }

    #[test]
    fn numbers_parse_from_text_with_thousands_separators() {
        assert_eq!(RawCell::Text(" 1,234.5 ".into()).as_f64(), Some(1234.5));
        assert_eq!(RawCell::Text("n/a".into()).as_f64(), None);
        assert_eq!(RawCell::Number(f64::NAN).as_f64(), None);
        assert_eq!(RawCell::Bool(true).as_f64(), None);
    }
}
