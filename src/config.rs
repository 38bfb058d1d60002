//! Command-line and environment configuration.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::data::schema::{DashboardKind, Schema};
use crate::data::stats::Statistic;

/// Insurance claims and sales analytics dashboards
#[derive(Parser, Debug)]
#[command(name = "claims-dashboard")]
#[command(version)]
#[command(about = "Filter, summarize, chart and export claims or sales data", long_about = None)]
pub struct Cli {
    /// Which dashboard to run
    #[arg(short, long, value_enum, default_value_t = DashboardKind::Claims, env = "DASHBOARD_KIND")]
    pub dashboard: DashboardKind,

    /// Source file (.csv, .json or .parquet); defaults to the dashboard's data file
    #[arg(long, env = "DASHBOARD_DATA")]
    pub data: Option<PathBuf>,

    /// Maximum number of table rows in the PDF report
    #[arg(long, default_value_t = 30, env = "DASHBOARD_ROW_LIMIT")]
    pub row_limit: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply filters and write the report without opening a window
    Export {
        /// Write the PDF report here
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Write the filtered rows here
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Restrict a column to values, e.g. `--filter "Region=North,South"`
        #[arg(long = "filter", value_name = "COLUMN=VALUES", value_parser = parse_filter)]
        filters: Vec<(String, Vec<String>)>,

        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Statistics to report, e.g. `count,mean,std,25%`
        #[arg(long, value_delimiter = ',')]
        stats: Option<Vec<Statistic>>,

        /// Print the summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

/// Parse `COLUMN=a,b,c` into the column and its values.
pub fn parse_filter(s: &str) -> Result<(String, Vec<String>), String> {
    let (column, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUES, got '{s}'"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in '{s}'"));
    }
    let values = values
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    Ok((column.to_string(), values))
}

/// Resolved settings shared by the GUI and the headless export.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub kind: DashboardKind,
    pub data_path: PathBuf,
    pub row_limit: usize,
    pub default_stats: Vec<Statistic>,
}

impl DashboardConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let schema = cli.dashboard.schema();
        DashboardConfig {
            kind: cli.dashboard,
            data_path: cli
                .data
                .clone()
                .unwrap_or_else(|| PathBuf::from(schema.default_source)),
            row_limit: cli.row_limit,
            default_stats: Statistic::DEFAULT_SELECTION.to_vec(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.kind.schema()
    }
}
