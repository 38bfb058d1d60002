use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::model::{CellValue, Table};
use super::schema::Schema;
use crate::error::ParseStatisticError;

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// One row of `describe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Statistic {
    Count,
    Mean,
    Std,
    Min,
    P25,
    P50,
    P75,
    Max,
}

impl Statistic {
    pub const ALL: [Statistic; 8] = [
        Statistic::Count,
        Statistic::Mean,
        Statistic::Std,
        Statistic::Min,
        Statistic::P25,
        Statistic::P50,
        Statistic::P75,
        Statistic::Max,
    ];

    pub const DEFAULT_SELECTION: [Statistic; 4] = [
        Statistic::Count,
        Statistic::Mean,
        Statistic::Min,
        Statistic::Max,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Mean => "mean",
            Statistic::Std => "std",
            Statistic::Min => "min",
            Statistic::P25 => "25%",
            Statistic::P50 => "50%",
            Statistic::P75 => "75%",
            Statistic::Max => "max",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Statistic {
    type Err = ParseStatisticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(Statistic::Count),
            "mean" => Ok(Statistic::Mean),
            "std" => Ok(Statistic::Std),
            "min" => Ok(Statistic::Min),
            "25%" | "p25" => Ok(Statistic::P25),
            "50%" | "p50" | "median" => Ok(Statistic::P50),
            "75%" | "p75" => Ok(Statistic::P75),
            "max" => Ok(Statistic::Max),
            _ => Err(ParseStatisticError(s.to_string())),
        }
    }
}

/// `describe()` of a numeric column. Every field except `count` is `None`
/// when undefined for the input (empty column, `std` of one value).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl Describe {
    pub fn of(values: &[f64]) -> Describe {
        let count = values.len();
        if count == 0 {
            return Describe::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });

        Describe {
            count,
            mean: Some(mean),
            std,
            min: sorted.first().copied(),
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }

    pub fn get(&self, stat: Statistic) -> Option<f64> {
        match stat {
            Statistic::Count => Some(self.count as f64),
            Statistic::Mean => self.mean,
            Statistic::Std => self.std,
            Statistic::Min => self.min,
            Statistic::P25 => self.p25,
            Statistic::P50 => self.p50,
            Statistic::P75 => self.p75,
            Statistic::Max => self.max,
        }
    }
}

/// Quantile of sorted data, interpolating linearly between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

// ---------------------------------------------------------------------------
// KPIs and summary
// ---------------------------------------------------------------------------

/// Headline figures of the filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Kpis {
    pub total: f64,
    /// `0` for an empty view.
    pub average: f64,
    /// `None` for dashboards without a status column.
    pub approved_total: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatLine {
    pub statistic: Statistic,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub kpis: Kpis,
    pub statistics: Vec<StatLine>,
    /// Count per status, largest first. Empty without a status column.
    pub status_counts: Vec<(String, usize)>,
}

pub fn kpis(table: &Table, schema: &Schema) -> Kpis {
    let amounts = table.numeric_values(schema.amount_column);
    let total: f64 = amounts.iter().sum();
    let average = if amounts.is_empty() {
        0.0
    } else {
        total / amounts.len() as f64
    };

    let approved_total = schema.status.map(|status| {
        let (Some(s), Some(a)) = (
            table.column_index(status.column),
            table.column_index(schema.amount_column),
        ) else {
            return 0.0;
        };
        table
            .rows
            .iter()
            .filter(|r| matches!(&r.cells[s], CellValue::String(v) if v == status.approved))
            .filter_map(|r| r.cells[a].as_f64())
            .sum()
    });

    Kpis {
        total,
        average,
        approved_total,
    }
}

/// KPIs, the requested statistics of the amount column (in canonical
/// order, duplicates removed) and the status counts of `table`.
pub fn summarize(table: &Table, schema: &Schema, stats: &[Statistic]) -> Summary {
    let describe = Describe::of(&table.numeric_values(schema.amount_column));
    let statistics = Statistic::ALL
        .iter()
        .filter(|s| stats.contains(*s))
        .map(|&statistic| StatLine {
            statistic,
            value: describe.get(statistic),
        })
        .collect();

    let status_counts = schema
        .status
        .map(|status| {
            count_by(table, status.column)
                .into_iter()
                .map(|(v, n)| (v.to_string(), n))
                .collect()
        })
        .unwrap_or_default();

    Summary {
        rows: table.len(),
        kpis: kpis(table, schema),
        statistics,
        status_counts,
    }
}

/// Row count per distinct value of `column`, largest first, ties by value.
/// Values with no rows do not appear.
pub fn count_by(table: &Table, column: &str) -> Vec<(CellValue, usize)> {
    let Some(idx) = table.column_index(column) else {
        return Vec::new();
    };
    let mut counts: HashMap<&CellValue, usize> = HashMap::new();
    for row in &table.rows {
        *counts.entry(&row.cells[idx]).or_default() += 1;
    }
    let mut counts: Vec<(CellValue, usize)> =
        counts.into_iter().map(|(v, n)| (v.clone(), n)).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pairwise Pearson correlation of the numeric columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]`; `None` where the coefficient is undefined.
    pub values: Vec<Vec<Option<f64>>>,
}

/// Correlation over integer and float columns, each pair using the rows
/// where both cells are present. Fewer than two such rows or a constant
/// column leaves the cell undefined.
pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let numeric: Vec<usize> = (0..table.columns.len())
        .filter(|&i| table.kinds[i].is_numeric())
        .collect();
    let columns = numeric.iter().map(|&i| table.columns[i].clone()).collect();

    let values = numeric
        .iter()
        .map(|&a| {
            numeric
                .iter()
                .map(|&b| {
                    let (xs, ys): (Vec<f64>, Vec<f64>) = table
                        .rows
                        .iter()
                        .filter_map(|r| Some((r.cells[a].as_f64()?, r.cells[b].as_f64()?)))
                        .unzip();
                    pearson(&xs, &ys)
                })
                .collect()
        })
        .collect();

    CorrelationMatrix { columns, values }
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;
    use crate::data::schema::{CLAIMS, SALES};

    fn claims(rows: &[(f64, &str)]) -> Table {
        Table::from_rows(
            vec!["Claim Amount".into(), "Claim Status".into()],
            rows.iter()
                .map(|(amount, status)| Row {
                    cells: vec![CellValue::Float(*amount), CellValue::String(status.to_string())],
                })
                .collect(),
        )
    }

    #[test]
    fn three_claim_scenario() {
        let t = claims(&[(100.0, "Approved"), (200.0, "Approved"), (300.0, "Denied")]);
        let k = kpis(&t, &CLAIMS);
        assert_eq!(k.total, 600.0);
        assert_eq!(k.average, 200.0);
        assert_eq!(k.approved_total, Some(300.0));
    }

    #[test]
    fn empty_table_has_zero_kpis_and_undefined_stats() {
        let t = claims(&[]);
        let summary = summarize(&t, &CLAIMS, &Statistic::ALL);
        assert_eq!(summary.kpis.total, 0.0);
        assert_eq!(summary.kpis.average, 0.0);
        assert_eq!(summary.kpis.approved_total, Some(0.0));
        assert_eq!(summary.statistics[0].value, Some(0.0));
        assert!(summary.statistics[1..].iter().all(|l| l.value.is_none()));
        assert!(summary.status_counts.is_empty());
    }

    #[test]
    fn approved_and_other_partition_total() {
        let t = claims(&[
            (12.5, "Approved"),
            (7.25, "Denied"),
            (100.0, "Pending"),
            (0.25, "Approved"),
        ]);
        let k = kpis(&t, &CLAIMS);
        let rest: f64 = t
            .rows
            .iter()
            .filter(|r| r.cells[1] != CellValue::String("Approved".into()))
            .filter_map(|r| r.cells[0].as_f64())
            .sum();
        assert_eq!(k.total, k.approved_total.unwrap() + rest);
    }

    #[test]
    fn sales_has_no_approved_total() {
        let t = Table::from_rows(
            vec!["Sales Amount".into()],
            vec![Row {
                cells: vec![CellValue::Float(5.0)],
            }],
        );
        assert_eq!(kpis(&t, &SALES).approved_total, None);
    }

    #[test]
    fn describe_matches_pandas() {
        let d = Describe::of(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(d.count, 4);
        assert_eq!(d.mean, Some(2.5));
        assert_eq!(d.p25, Some(1.75));
        assert_eq!(d.p50, Some(2.5));
        assert_eq!(d.p75, Some(3.25));
        assert!((d.std.unwrap() - 1.2909944487).abs() < 1e-9);
    }

    #[test]
    fn std_of_single_value_is_undefined() {
        let d = Describe::of(&[42.0]);
        assert_eq!(d.std, None);
        assert_eq!(d.min, Some(42.0));
        assert_eq!(d.p75, Some(42.0));
    }

    #[test]
    fn summarize_keeps_canonical_order() {
        let t = claims(&[(1.0, "Approved")]);
        let s = summarize(&t, &CLAIMS, &[Statistic::Max, Statistic::Count, Statistic::Max]);
        let order: Vec<Statistic> = s.statistics.iter().map(|l| l.statistic).collect();
        assert_eq!(order, vec![Statistic::Count, Statistic::Max]);
    }

    #[test]
    fn statistic_parses_labels_and_aliases() {
        assert_eq!("25%".parse::<Statistic>(), Ok(Statistic::P25));
        assert_eq!("p75".parse::<Statistic>(), Ok(Statistic::P75));
        assert_eq!("Median".parse::<Statistic>(), Ok(Statistic::P50));
        assert!("mode".parse::<Statistic>().is_err());
    }

    #[test]
    fn count_by_orders_by_count_then_value() {
        let t = claims(&[
            (1.0, "Denied"),
            (1.0, "Approved"),
            (1.0, "Denied"),
            (1.0, "Pending"),
        ]);
        let counts: Vec<(String, usize)> = count_by(&t, "Claim Status")
            .into_iter()
            .map(|(v, n)| (v.to_string(), n))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("Denied".to_string(), 2),
                ("Approved".to_string(), 1),
                ("Pending".to_string(), 1)
            ]
        );
    }

    #[test]
    fn correlation_keeps_undefined_cells() {
        let t = Table::from_rows(
            vec!["a".into(), "b".into(), "flat".into(), "label".into()],
            (0..4)
                .map(|i| Row {
                    cells: vec![
                        CellValue::Integer(i),
                        CellValue::Float(10.0 - 2.0 * i as f64),
                        CellValue::Float(7.0),
                        CellValue::String("x".into()),
                    ],
                })
                .collect(),
        );
        let m = correlation_matrix(&t);
        assert_eq!(m.columns, vec!["a", "b", "flat"]);
        assert!((m.values[0][0].unwrap() - 1.0).abs() < 1e-12);
        assert!((m.values[0][1].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(m.values[0][2], None);
        assert_eq!(m.values[2][2], None);
    }
}
