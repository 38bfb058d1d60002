use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::cache::{is_cached, load_cached};
use crate::data::charts::{build_charts, ChartSet};
use crate::data::filter::{apply, init_selection, options, DateRange, Selection};
use crate::data::model::{CellValue, Table};
use crate::data::schema::Schema;
use crate::data::stats::{summarize, Statistic, Summary};
use crate::error::{DataFormatError, ExportError};
use crate::report;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
///
/// Everything below `selection` is derived: [`AppState::refilter`]
/// rebuilds it from the loaded table after every interaction.
pub struct AppState {
    pub config: DashboardConfig,
    pub schema: &'static Schema,

    /// Loaded table (None until a file has been loaded successfully).
    pub table: Option<Arc<Table>>,

    /// Current filter selections.
    pub selection: Selection,

    /// Statistics chosen for display and for the PDF report.
    pub selected_stats: BTreeSet<Statistic>,

    /// Rows passing the current filters.
    pub view: Table,

    /// Indices into `view`, newest date first, for the detail table.
    pub display_order: Vec<usize>,

    pub summary: Summary,
    pub charts: ChartSet,

    /// Colours for the line chart groups.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let schema = config.schema();
        let selected_stats = config.default_stats.iter().copied().collect();
        let mut state = AppState {
            config,
            schema,
            table: None,
            selection: Selection::default(),
            selected_stats,
            view: Table::default(),
            display_order: Vec::new(),
            summary: Summary::default(),
            charts: ChartSet::default(),
            color_map: None,
            status_message: None,
        };
        state.refilter();
        state
    }

    /// Load (or fetch from cache) the configured source file.
    pub fn load_configured(&mut self) {
        let path = self.config.data_path.clone();
        self.load(&path);
    }

    /// Load a source file. On failure the previous table stays in place
    /// and the error is shown.
    pub fn load(&mut self, path: &Path) {
        match self.try_load(path) {
            Ok(()) => {
                self.config.data_path = path.to_path_buf();
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    fn try_load(&mut self, path: &Path) -> Result<(), DataFormatError> {
        if is_cached(path, self.schema.kind) {
            log::info!("Reusing already loaded {}", path.display());
        }
        let table = load_cached(path, self.schema)?;
        self.set_table(table);
        Ok(())
    }

    /// Ingest a newly loaded table, initialise filters and colours.
    pub fn set_table(&mut self, table: Arc<Table>) {
        self.selection = init_selection(&table, self.schema);
        let group_col = self.schema.line_group_column;
        self.color_map = Some(ColorMap::new(group_col, &options(&table, group_col)));
        self.table = Some(table);
        self.refilter();
    }

    /// Recompute the view and everything derived from it.
    pub fn refilter(&mut self) {
        self.view = match &self.table {
            Some(table) => apply(table, self.schema, &self.selection),
            None => Table::default(),
        };
        self.display_order = self.view.sorted_indices(self.schema.date_column, true);
        let stats: Vec<Statistic> = self.selected_stats.iter().copied().collect();
        self.summary = summarize(&self.view, self.schema, &stats);
        self.charts = build_charts(&self.view, self.schema);
    }

    /// Number of selected values in a column's filter; read-only, a
    /// missing column is not turned into an empty (match-nothing) set.
    pub fn selected_count(&self, column: &str) -> usize {
        self.selection.categories.get(column).map_or(0, BTreeSet::len)
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &CellValue) {
        let selected = self.selection.categories.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(table) = &self.table {
            self.selection
                .categories
                .insert(column.to_string(), options(table, column));
            self.refilter();
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.selection
            .categories
            .insert(column.to_string(), BTreeSet::new());
        self.refilter();
    }

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.selection.dates = Some(DateRange { start, end });
        self.refilter();
    }

    pub fn toggle_statistic(&mut self, stat: Statistic) {
        if !self.selected_stats.remove(&stat) {
            self.selected_stats.insert(stat);
        }
        self.refilter();
    }

    /// PDF of the current view; the view is not modified.
    pub fn export_pdf(&self) -> Result<Vec<u8>, ExportError> {
        report::pdf::export_pdf(
            self.schema,
            &self.summary.kpis,
            &self.summary.statistics,
            &self.view,
            self.config.row_limit,
        )
    }

    /// CSV of the current view.
    pub fn export_csv(&self) -> Result<Vec<u8>, ExportError> {
        report::csv::export_csv(&self.view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_csv_reader;
    use crate::data::schema::{DashboardKind, CLAIMS};
    use std::path::PathBuf;

    fn state() -> AppState {
        let config = DashboardConfig {
            kind: DashboardKind::Claims,
            data_path: PathBuf::from("unused.csv"),
            row_limit: 30,
            default_stats: Statistic::DEFAULT_SELECTION.to_vec(),
        };
        let csv = "Date,Region,Policy Type,Vehicle Type,Gender,Claim Status,Claim Amount,Customer Age,Previous Claims\n\
                   2024-01-01,North,Basic,Car,F,Approved,100,30,0\n\
                   2024-01-02,South,Basic,Car,M,Approved,200,40,1\n\
                   2024-01-03,North,Premium,Truck,F,Denied,300,50,2\n";
        let mut state = AppState::new(config);
        state.set_table(Arc::new(load_csv_reader(csv.as_bytes(), &CLAIMS).unwrap()));
        state
    }

    #[test]
    fn starts_with_everything_visible() {
        let s = state();
        assert_eq!(s.view.len(), 3);
        assert_eq!(s.summary.kpis.total, 600.0);
        assert_eq!(s.summary.kpis.average, 200.0);
        assert_eq!(s.summary.kpis.approved_total, Some(300.0));
        // newest first
        assert_eq!(s.display_order, vec![2, 1, 0]);
    }

    #[test]
    fn toggling_values_refilters() {
        let mut s = state();
        s.toggle_filter_value("Region", &CellValue::String("North".into()));
        assert_eq!(s.view.len(), 1);
        assert_eq!(s.summary.kpis.total, 200.0);

        s.select_none("Gender");
        assert!(s.view.is_empty());
        assert_eq!(s.summary.kpis.average, 0.0);

        s.select_all("Gender");
        s.select_all("Region");
        assert_eq!(s.view.len(), 3);
    }

    #[test]
    fn reversed_date_range_empties_view_but_exports_still_work() {
        let mut s = state();
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        s.set_date_range(d(3), d(1));
        assert!(s.view.is_empty());
        assert!(s.export_pdf().unwrap().starts_with(b"%PDF"));
        let csv = String::from_utf8(s.export_csv().unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn statistics_follow_selection() {
        let mut s = state();
        s.toggle_statistic(Statistic::Std);
        s.toggle_statistic(Statistic::Count);
        let chosen: Vec<Statistic> = s.summary.statistics.iter().map(|l| l.statistic).collect();
        assert_eq!(
            chosen,
            vec![Statistic::Mean, Statistic::Std, Statistic::Min, Statistic::Max]
        );
    }

    #[test]
    fn reloading_a_file_reuses_the_cached_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("claims.csv");
        std::fs::write(
            &path,
            "Date,Region,Policy Type,Vehicle Type,Gender,Claim Status,Claim Amount,Customer Age,Previous Claims\n\
             2024-01-01,North,Basic,Car,F,Approved,100,30,0\n",
        )
        .unwrap();

        let mut s = state();
        s.load(&path);
        assert!(is_cached(&path, DashboardKind::Claims));
        let first = s.table.clone().unwrap();

        std::fs::remove_file(&path).unwrap();
        s.load(&path);
        assert!(s.status_message.is_none());
        assert!(Arc::ptr_eq(&first, s.table.as_ref().unwrap()));
        assert_eq!(s.config.data_path, path);
    }

    #[test]
    fn filter_counts_do_not_touch_the_selection() {
        let mut s = state();
        s.selection.categories.remove("Gender");
        let before = s.selection.clone();

        assert_eq!(s.selected_count("Gender"), 0);
        assert_eq!(s.selected_count("Region"), 2);
        assert_eq!(s.selection, before);

        s.refilter();
        assert_eq!(s.view.len(), 3);
    }

    #[test]
    fn failed_load_keeps_previous_table() {
        let mut s = state();
        s.load(Path::new("/nonexistent/claims.csv"));
        assert!(s.status_message.as_deref().unwrap_or("").starts_with("Error"));
        assert_eq!(s.view.len(), 3);
    }
}
