use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::color::ColorMap;
use crate::config::LoadConfig;
use crate::data::aggregate::{DashboardViews, write_snapshot_csv};
use crate::data::cache::TableCache;
use crate::data::filter::{FilterOptions, FilterSelection, NumericRange, apply};
use crate::data::loader::SchemaError;
use crate::data::model::{CategoricalField, NumericField, Table};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Source of the current table.
    pub config: LoadConfig,

    /// Tables already read, keyed by load parameters.
    cache: TableCache,

    /// Loaded table (None until a load succeeds).
    pub table: Option<Arc<Table>>,

    /// Selector choices and slider bounds for the current table.
    pub options: FilterOptions,

    /// Current filter choices.
    pub selection: FilterSelection,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Chart and table data for the visible rows (cached).
    pub views: DashboardViews,

    /// Pie slice colours, stable across filter changes.
    pub category_colors: ColorMap,

    /// Order the monthly trend by calendar date instead of label.
    pub chronological_months: bool,

    /// Fatal schema problem: no dashboard is shown while set.
    pub schema_error: Option<SchemaError>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: LoadConfig) -> Self {
        Self {
            config,
            cache: TableCache::new(),
            table: None,
            options: FilterOptions::default(),
            selection: FilterSelection::default(),
            visible_indices: Vec::new(),
            views: DashboardViews::default(),
            category_colors: ColorMap::default(),
            chronological_months: false,
            schema_error: None,
            status_message: None,
        }
    }

    /// Load (or fetch from cache) the table described by `config` and make
    /// it current.  A schema error replaces the dashboard; any other error
    /// keeps the previous table and is reported in the status line.
    pub fn load(&mut self, config: LoadConfig) {
        match self.cache.get_or_load(&config) {
            Ok(table) => {
                self.config = config;
                self.set_table(table);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", config.path.display());
                if let Some(schema) = e.downcast_ref::<SchemaError>() {
                    self.config = config;
                    self.clear_table();
                    self.schema_error = Some(schema.clone());
                } else {
                    self.status_message = Some(format!("Error: {e:#}"));
                }
            }
        }
    }

    /// Re-read the current source from disk.
    pub fn reload(&mut self) {
        self.cache.invalidate(&self.config);
        self.load(self.config.clone());
    }

    /// Read the current source again with a different header row.
    pub fn set_header_row(&mut self, header_row: usize) {
        self.load(self.config.with_header_row(header_row));
    }

    /// Ingest a table, reset filters to "everything selected".
    pub fn set_table(&mut self, table: Arc<Table>) {
        self.options = FilterOptions::from_table(&table);
        self.selection = FilterSelection::from_options(&self.options);
        self.category_colors = ColorMap::new(self.options.values(CategoricalField::EbitdaCategory));
        self.table = Some(table);
        self.schema_error = None;
        self.status_message = None;
        self.refilter();
    }

    fn clear_table(&mut self) {
        self.table = None;
        self.options = FilterOptions::default();
        self.selection = FilterSelection::default();
        self.visible_indices.clear();
        self.views = DashboardViews::default();
    }

    /// Recompute visible rows and every derived view after a filter change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            let filtered = apply(table, &self.selection);
            self.views = DashboardViews::compute(filtered.records(), self.chronological_months);
            self.visible_indices = filtered.indices().to_vec();
        }
    }

    /// Toggle a single value in a categorical filter.
    pub fn toggle_value(&mut self, field: CategoricalField, value: &str) {
        let selected = self.selection.values_mut(field);
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Select all values of a field.
    pub fn select_all(&mut self, field: CategoricalField) {
        *self.selection.values_mut(field) = self.options.values(field).iter().cloned().collect();
        self.refilter();
    }

    /// Deselect all values of a field (hides every row).
    pub fn select_none(&mut self, field: CategoricalField) {
        self.selection.values_mut(field).clear();
        self.refilter();
    }

    pub fn set_range(&mut self, field: NumericField, range: NumericRange) {
        *self.selection.range_mut(field) = range;
        self.refilter();
    }

    pub fn set_chronological_months(&mut self, on: bool) {
        self.chronological_months = on;
        self.refilter();
    }

    /// Write the current snapshot to a CSV file.
    pub fn export_snapshot(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_snapshot_csv(&self.views.snapshot, file)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!(
            "Exported {} snapshot rows to {}",
            self.views.snapshot.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    const CSV: &str = "\
Store,Month,CM Cohort,EBITDA Category,EBITDA Cohort,Revenue Cohort,Gross Margin,Net Revenue,Kitchen EBITDA
A,2024-01-01,c1,Positive,e1,r1,50,100,10
A,2024-02-01,c1,Positive,e1,r1,100,200,20
B,2024-01-01,c2,Negative,e2,r2,150,300,-30
B,2024-02-01,c2,Negative,e2,r2,200,400,-40
";

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn loaded(dir: &TempDir) -> AppState {
        let path = write_csv(dir, "pnl.csv", CSV);
        let mut state = AppState::new(LoadConfig {
            path,
            header_row: 0,
            sheet: None,
        });
        state.load(state.config.clone());
        state
    }

    fn store_totals(state: &AppState) -> Vec<(String, f64)> {
        state
            .views
            .stores
            .iter()
            .map(|s| (s.store.clone(), s.net_revenue))
            .collect()
    }

    #[test]
    fn load_builds_default_views() {
        let dir = TempDir::new().unwrap();
        let state = loaded(&dir);
        assert!(state.schema_error.is_none());
        assert_eq!(state.visible_indices, vec![0, 1, 2, 3]);
        assert_eq!(
            store_totals(&state),
            vec![("A".to_string(), 300.0), ("B".to_string(), 700.0)]
        );
        assert_eq!(state.views.snapshot.len(), 4);
        assert_eq!(state.options.values(CategoricalField::Store), ["A", "B"]);
    }

    #[test]
    fn toggling_and_select_none_all() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);

        state.toggle_value(CategoricalField::Store, "B");
        assert_eq!(store_totals(&state), vec![("A".to_string(), 300.0)]);

        state.select_none(CategoricalField::Month);
        assert!(state.visible_indices.is_empty());
        assert!(state.views.monthly.is_empty());
        assert!(state.views.snapshot.is_empty());

        state.select_all(CategoricalField::Month);
        state.toggle_value(CategoricalField::Store, "B");
        assert_eq!(state.visible_indices.len(), 4);
    }

    #[test]
    fn ranges_filter_but_kitchen_ebitda_does_not() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);

        state.set_range(NumericField::KitchenEbitda, NumericRange::new(0.0, 0.0));
        assert_eq!(state.visible_indices.len(), 4);

        state.set_range(NumericField::NetRevenue, NumericRange::new(200.0, 300.0));
        assert_eq!(state.visible_indices, vec![1, 2]);
    }

    #[test]
    fn chronological_toggle_reorders_trend() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);
        let months = |s: &AppState| -> Vec<String> {
            s.views.monthly.iter().map(|m| m.month.clone()).collect()
        };
        assert_eq!(months(&state), vec!["Feb 2024", "Jan 2024"]);
        state.set_chronological_months(true);
        assert_eq!(months(&state), vec!["Jan 2024", "Feb 2024"]);
    }

    #[test]
    fn schema_error_hides_dashboard() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);
        let bad = write_csv(&dir, "bad.csv", "Store,Period,Net Revenue\nA,Jan,1\n");

        state.load(LoadConfig {
            path: bad,
            header_row: 0,
            sheet: None,
        });
        assert!(state.table.is_none());
        let err = state.schema_error.as_ref().expect("schema error");
        assert_eq!(err.columns(), ["STORE", "PERIOD", "NET_REVENUE"]);
        assert!(state.views.snapshot.is_empty());
    }

    #[test]
    fn io_error_keeps_previous_table() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);
        state.load(LoadConfig {
            path: dir.path().join("missing.csv"),
            header_row: 0,
            sheet: None,
        });
        assert!(state.table.is_some());
        assert!(state.status_message.is_some());
        assert_eq!(state.config.path.file_name().unwrap(), "pnl.csv");
    }

    #[test]
    fn reload_rereads_the_file() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);
        let extra = format!("{CSV}C,2024-03-01,c3,Positive,e3,r3,1,2,3\n");
        write_csv(&dir, "pnl.csv", &extra);

        // Cached: same parameters do not touch the file.
        state.load(state.config.clone());
        assert_eq!(state.table.as_ref().unwrap().len(), 4);

        state.reload();
        assert_eq!(state.table.as_ref().unwrap().len(), 5);
    }

    #[test]
    fn export_writes_visible_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);
        state.toggle_value(CategoricalField::Store, "A");
        let out = dir.path().join("snapshot.csv");
        state.export_snapshot(&out).unwrap();

        let text = std::fs::read_to_string(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("B,Jan 2024,300.0"));
    }

    #[test]
    fn export_of_empty_selection_keeps_header() {
        let dir = TempDir::new().unwrap();
        let mut state = loaded(&dir);
        state.select_none(CategoricalField::Store);
        assert!(state.views.snapshot.is_empty());

        let out = dir.path().join("empty.csv");
        state.export_snapshot(&out).unwrap();
        let text = std::fs::read_to_string(out).unwrap();
        assert_eq!(text.trim_end(), "STORE,MONTH,NET_REVENUE,GROSS_MARGIN,KITCHEN_EBITDA");
    }
}
