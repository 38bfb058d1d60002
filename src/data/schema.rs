use serde::Serialize;

use super::model::ColumnKind;

// ---------------------------------------------------------------------------
// Dashboard schemas: column roles, labels, charts and report layout
// ---------------------------------------------------------------------------

/// Which dashboard to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    Claims,
    Sales,
}

impl DashboardKind {
    pub fn schema(self) -> &'static Schema {
        match self {
            DashboardKind::Claims => &CLAIMS,
            DashboardKind::Sales => &SALES,
        }
    }
}

/// Grouped bar chart: summed amount per `x_column`, one bar per `group_column` value.
#[derive(Debug, Clone, Copy)]
pub struct BarChartSpec {
    pub title: &'static str,
    pub x_column: &'static str,
    pub group_column: Option<&'static str>,
}

/// Status column and the value counted towards the approved KPI.
#[derive(Debug, Clone, Copy)]
pub struct StatusSpec {
    pub column: &'static str,
    pub approved: &'static str,
    pub approved_label: &'static str,
}

/// Box plot of the amount per category of `column`.
#[derive(Debug, Clone, Copy)]
pub struct BoxPlotSpec {
    pub title: &'static str,
    pub column: &'static str,
}

/// Static description of one dashboard.
#[derive(Debug)]
pub struct Schema {
    pub kind: DashboardKind,
    pub title: &'static str,
    pub filter_heading: &'static str,

    /// Synthesized as `1..=n` when absent from the source.
    pub id_column: &'static str,
    pub date_column: &'static str,
    pub amount_column: &'static str,
    /// Absent for dashboards without an approval workflow.
    pub status: Option<StatusSpec>,
    /// Numeric columns typed as integers even when a view has no values.
    pub integer_columns: &'static [&'static str],

    /// Columns that must be present in the source.
    pub required_columns: &'static [&'static str],
    /// Categorical columns offered as inclusion-list filters.
    pub filter_columns: &'static [&'static str],
    /// Drop rows with any null before parsing dates (pandas `dropna`).
    pub drop_incomplete_rows: bool,

    pub total_label: &'static str,
    pub average_label: &'static str,

    pub line_title: &'static str,
    pub line_group_column: &'static str,
    pub bar_charts: &'static [BarChartSpec],
    pub box_plot: Option<BoxPlotSpec>,

    /// Columns of the detail table, in display order.
    pub detail_columns: &'static [&'static str],

    pub report_title: &'static str,
    pub report_columns: &'static [&'static str],
    pub pdf_file_name: &'static str,
    pub csv_file_name: &'static str,
    pub default_source: &'static str,
}

impl Schema {
    /// Whether a column holds currency amounts (formatted `$#,##0.00`).
    pub fn is_amount(&self, column: &str) -> bool {
        column == self.amount_column
    }

    /// Kind a column always has in this dashboard, whatever its values.
    ///
    /// Categories stay text (so `"007"` is not read as `7`), the amount is
    /// float and the date is a date; ids and `integer_columns` are integers
    /// but widen with their data.
    pub fn column_kind(&self, column: &str) -> Option<ColumnKind> {
        if column == self.date_column {
            Some(ColumnKind::Date)
        } else if column == self.amount_column {
            Some(ColumnKind::Float)
        } else if self.filter_columns.iter().any(|c| *c == column)
            || self.status.is_some_and(|s| s.column == column)
        {
            Some(ColumnKind::Text)
        } else if column == self.id_column || self.integer_columns.iter().any(|c| *c == column) {
            Some(ColumnKind::Integer)
        } else {
            None
        }
    }
}

pub static CLAIMS: Schema = Schema {
    kind: DashboardKind::Claims,
    title: "Insurance Claims Analytics Dashboard",
    filter_heading: "Filter Claims",

    id_column: "Claim ID",
    date_column: "Date",
    amount_column: "Claim Amount",
    status: Some(StatusSpec {
        column: "Claim Status",
        approved: "Approved",
        approved_label: "Approved Claims",
    }),
    integer_columns: &["Customer Age", "Previous Claims"],

    required_columns: &[
        "Date",
        "Region",
        "Policy Type",
        "Vehicle Type",
        "Gender",
        "Claim Status",
        "Claim Amount",
        "Customer Age",
        "Previous Claims",
    ],
    filter_columns: &[
        "Region",
        "Policy Type",
        "Vehicle Type",
        "Gender",
        "Claim Status",
    ],
    drop_incomplete_rows: false,

    total_label: "Total Claims",
    average_label: "Average Claim",

    line_title: "Claim Amount Over Time",
    line_group_column: "Policy Type",
    bar_charts: &[
        BarChartSpec {
            title: "Claims by Region and Status",
            x_column: "Region",
            group_column: Some("Claim Status"),
        },
        BarChartSpec {
            title: "Claims by Policy Type",
            x_column: "Policy Type",
            group_column: Some("Claim Status"),
        },
    ],
    box_plot: Some(BoxPlotSpec {
        title: "Distribution of Claim Amounts by Vehicle Type",
        column: "Vehicle Type",
    }),

    detail_columns: &[
        "Claim ID",
        "Date",
        "Region",
        "Policy Type",
        "Claim Amount",
        "Claim Status",
        "Customer Age",
        "Gender",
        "Vehicle Type",
        "Previous Claims",
    ],

    report_title: "Insurance Claims Report",
    report_columns: &[
        "Claim ID",
        "Date",
        "Region",
        "Policy Type",
        "Claim Amount",
        "Claim Status",
    ],
    pdf_file_name: "insurance_claims_report.pdf",
    csv_file_name: "filtered_claims.csv",
    default_source: "insurance_claims_data.csv",
};

pub static SALES: Schema = Schema {
    kind: DashboardKind::Sales,
    title: "Sales Analytics Dashboard",
    filter_heading: "Filter Sales",

    id_column: "Sale ID",
    date_column: "Date",
    amount_column: "Sales Amount",
    status: None,
    integer_columns: &[],

    required_columns: &["Date", "Region", "Sales Amount"],
    filter_columns: &["Region"],
    drop_incomplete_rows: true,

    total_label: "Total Sales",
    average_label: "Average Sales",

    line_title: "Sales Amount Over Time",
    line_group_column: "Region",
    bar_charts: &[BarChartSpec {
        title: "Sales by Region",
        x_column: "Region",
        group_column: None,
    }],
    box_plot: None,

    detail_columns: &["Sale ID", "Date", "Region", "Sales Amount"],

    report_title: "Sales Report",
    report_columns: &["Sale ID", "Date", "Region", "Sales Amount"],
    pdf_file_name: "sales_report.pdf",
    csv_file_name: "filtered_sales.csv",
    default_source: "sales_data.csv",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_has_no_status_or_box_plot() {
        assert!(SALES.status.is_none());
        assert!(SALES.box_plot.is_none());
        assert_eq!(SALES.column_kind("Region"), Some(ColumnKind::Text));
        assert_eq!(SALES.column_kind("Claim Status"), None);

        let status = CLAIMS.status.unwrap();
        assert_eq!(status.approved, "Approved");
        assert_eq!(status.approved_label, "Approved Claims");
        assert_eq!(CLAIMS.box_plot.unwrap().column, "Vehicle Type");
    }

    #[test]
    fn claims_column_kinds() {
        assert_eq!(CLAIMS.column_kind("Date"), Some(ColumnKind::Date));
        assert_eq!(CLAIMS.column_kind("Claim Amount"), Some(ColumnKind::Float));
        assert_eq!(CLAIMS.column_kind("Claim Status"), Some(ColumnKind::Text));
        assert_eq!(CLAIMS.column_kind("Customer Age"), Some(ColumnKind::Integer));
        assert_eq!(CLAIMS.column_kind("Claim ID"), Some(ColumnKind::Integer));
        assert_eq!(CLAIMS.column_kind("Notes"), None);
    }
}
