use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::model::{CellValue, Table};
use super::schema::{BarChartSpec, BoxPlotSpec, Schema};
use super::stats::{correlation_matrix, count_by, quantile, CorrelationMatrix};

// ---------------------------------------------------------------------------
// Chart specifications derived from the filtered view
// ---------------------------------------------------------------------------

/// Dates are plotted as days since 0001-01-01.
pub fn date_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: CellValue,
    /// `[date_x, amount]`, sorted by date.
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineChart {
    pub title: String,
    pub series: Vec<LineSeries>,
}

/// One bar per (category, group); `values[g][c]` is the summed amount.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedBars {
    pub title: String,
    pub categories: Vec<String>,
    pub groups: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub category: String,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxChart {
    pub title: String,
    pub boxes: Vec<BoxStats>,
}

/// Everything the chart area draws for one filtered view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSet {
    pub line: LineChart,
    pub bars: Vec<GroupedBars>,
    pub boxes: Option<BoxChart>,
    pub status_counts: Option<GroupedBars>,
    pub correlation: CorrelationMatrix,
}

pub fn build_charts(table: &Table, schema: &Schema) -> ChartSet {
    ChartSet {
        line: line_chart(table, schema),
        bars: schema
            .bar_charts
            .iter()
            .map(|spec| grouped_bars(table, schema, spec))
            .collect(),
        boxes: schema.box_plot.map(|spec| box_chart(table, schema, spec)),
        status_counts: schema.status.map(|status| status_counts(table, status.column)),
        correlation: correlation_matrix(table),
    }
}

fn line_chart(table: &Table, schema: &Schema) -> LineChart {
    let mut series: BTreeMap<CellValue, Vec<[f64; 2]>> = BTreeMap::new();
    if let (Some(d), Some(a), Some(g)) = (
        table.column_index(schema.date_column),
        table.column_index(schema.amount_column),
        table.column_index(schema.line_group_column),
    ) {
        for row in &table.rows {
            if let (Some(date), Some(amount)) = (row.cells[d].as_date(), row.cells[a].as_f64()) {
                series
                    .entry(row.cells[g].clone())
                    .or_default()
                    .push([date_to_x(date), amount]);
            }
        }
    }

    LineChart {
        title: schema.line_title.to_string(),
        series: series
            .into_iter()
            .map(|(name, mut points)| {
                points.sort_by(|p, q| p[0].total_cmp(&q[0]));
                LineSeries { name, points }
            })
            .collect(),
    }
}

fn grouped_bars(table: &Table, schema: &Schema, spec: &BarChartSpec) -> GroupedBars {
    let x_idx = table.column_index(spec.x_column);
    let g_idx = spec.group_column.and_then(|g| table.column_index(g));
    let a_idx = table.column_index(schema.amount_column);

    let mut sums: BTreeMap<(CellValue, CellValue), f64> = BTreeMap::new();
    if let (Some(x), Some(a)) = (x_idx, a_idx) {
        for row in &table.rows {
            let group = g_idx.map_or(CellValue::Null, |g| row.cells[g].clone());
            let amount = row.cells[a].as_f64().unwrap_or(0.0);
            *sums.entry((row.cells[x].clone(), group)).or_default() += amount;
        }
    }

    let categories: Vec<CellValue> = unique_sorted(sums.keys().map(|(c, _)| c));
    let groups: Vec<CellValue> = unique_sorted(sums.keys().map(|(_, g)| g));
    let values = groups
        .iter()
        .map(|g| {
            categories
                .iter()
                .map(|c| sums.get(&(c.clone(), g.clone())).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    GroupedBars {
        title: spec.title.to_string(),
        categories: categories.iter().map(ToString::to_string).collect(),
        groups: match spec.group_column {
            Some(_) => groups.iter().map(ToString::to_string).collect(),
            None => vec![schema.amount_column.to_string(); groups.len()],
        },
        values,
    }
}

fn unique_sorted<'a>(values: impl Iterator<Item = &'a CellValue>) -> Vec<CellValue> {
    let mut out: Vec<CellValue> = values.cloned().collect();
    out.sort();
    out.dedup();
    out
}

fn box_chart(table: &Table, schema: &Schema, spec: BoxPlotSpec) -> BoxChart {
    let mut by_category: BTreeMap<CellValue, Vec<f64>> = BTreeMap::new();
    if let (Some(c), Some(a)) = (table.column_index(spec.column), table.column_index(schema.amount_column)) {
        for row in &table.rows {
            if let Some(v) = row.cells[a].as_f64() {
                by_category.entry(row.cells[c].clone()).or_default().push(v);
            }
        }
    }

    BoxChart {
        title: spec.title.to_string(),
        boxes: by_category
            .into_iter()
            .filter_map(|(category, values)| box_stats(category.to_string(), values))
            .collect(),
    }
}

/// Quartiles with whiskers at the furthest points within 1.5 IQR.
fn box_stats(category: String, mut values: Vec<f64>) -> Option<BoxStats> {
    values.sort_by(f64::total_cmp);
    let q1 = quantile(&values, 0.25)?;
    let median = quantile(&values, 0.5)?;
    let q3 = quantile(&values, 0.75)?;
    let reach = 1.5 * (q3 - q1);
    let lower_whisker = values.iter().copied().find(|v| *v >= q1 - reach).unwrap_or(q1);
    let upper_whisker = values.iter().rev().copied().find(|v| *v <= q3 + reach).unwrap_or(q3);
    Some(BoxStats {
        category,
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
    })
}

fn status_counts(table: &Table, column: &str) -> GroupedBars {
    let counts = count_by(table, column);
    GroupedBars {
        title: format!("{column} count"),
        categories: counts.iter().map(|(v, _)| v.to_string()).collect(),
        groups: vec!["count".to_string()],
        values: vec![counts.iter().map(|(_, n)| *n as f64).collect()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;
    use crate::data::schema::CLAIMS;

    fn row(date: &str, region: &str, policy: &str, vehicle: &str, status: &str, amount: f64) -> Row {
        Row {
            cells: vec![
                CellValue::Date(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
                CellValue::String(region.into()),
                CellValue::String(policy.into()),
                CellValue::String(vehicle.into()),
                CellValue::String(status.into()),
                CellValue::Float(amount),
            ],
        }
    }

    fn table() -> Table {
        Table::from_rows(
            ["Date", "Region", "Policy Type", "Vehicle Type", "Claim Status", "Claim Amount"]
                .map(String::from)
                .to_vec(),
            vec![
                row("2024-02-01", "North", "Basic", "Car", "Approved", 100.0),
                row("2024-01-01", "North", "Basic", "Car", "Denied", 50.0),
                row("2024-01-15", "South", "Premium", "Truck", "Approved", 300.0),
                row("2024-01-20", "North", "Premium", "Car", "Approved", 25.0),
                row("2024-03-01", "North", "Basic", "Car", "Approved", 1000.0),
            ],
        )
    }

    #[test]
    fn date_axis_round_trips() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(x_to_date(date_to_x(d)), Some(d));
    }

    #[test]
    fn line_series_per_group_sorted_by_date() {
        let charts = build_charts(&table(), &CLAIMS);
        assert_eq!(charts.line.series.len(), 2);
        let basic = &charts.line.series[0];
        assert_eq!(basic.name, CellValue::String("Basic".into()));
        let xs: Vec<f64> = basic.points.iter().map(|p| p[0]).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(basic.points[0][1], 50.0);
    }

    #[test]
    fn grouped_bars_sum_amounts_per_category_and_group() {
        let charts = build_charts(&table(), &CLAIMS);
        let by_region = &charts.bars[0];
        assert_eq!(by_region.categories, vec!["North", "South"]);
        assert_eq!(by_region.groups, vec!["Approved", "Denied"]);
        assert_eq!(by_region.values[0], vec![1125.0, 300.0]);
        assert_eq!(by_region.values[1], vec![50.0, 0.0]);
    }

    #[test]
    fn box_whiskers_exclude_outliers() {
        let charts = build_charts(&table(), &CLAIMS);
        let boxes = charts.boxes.unwrap().boxes;
        let car = boxes.iter().find(|b| b.category == "Car").unwrap();
        assert_eq!(car.median, 75.0);
        assert_eq!(car.upper_whisker, 100.0);
        assert_eq!(car.lower_whisker, 25.0);
    }

    #[test]
    fn empty_view_gives_empty_charts() {
        let empty = table().select(&[]);
        let charts = build_charts(&empty, &CLAIMS);
        assert!(charts.line.series.is_empty());
        assert!(charts.bars.iter().all(|b| b.categories.is_empty()));
        assert!(charts.boxes.unwrap().boxes.is_empty());
        assert!(charts.status_counts.unwrap().categories.is_empty());
    }
}
