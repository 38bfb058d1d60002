use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use eframe::egui;

use claims_dashboard::app::DashboardApp;
use claims_dashboard::config::{Cli, Command, DashboardConfig};
use claims_dashboard::data::cache::load_cached;
use claims_dashboard::data::filter::{apply, init_selection, DateRange};
use claims_dashboard::data::stats::{summarize, Statistic};
use claims_dashboard::report;
use claims_dashboard::state::AppState;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = DashboardConfig::from_cli(&cli);

    match cli.command {
        None => run_gui(config),
        Some(Command::Export {
            pdf,
            csv,
            filters,
            from,
            to,
            stats,
            json,
        }) => run_export(
            &config,
            ExportRequest {
                pdf,
                csv,
                filters,
                from,
                to,
                stats: stats.unwrap_or_else(|| config.default_stats.clone()),
                json,
            },
        ),
    }
}

fn run_gui(config: DashboardConfig) -> Result<()> {
    let title = config.schema().title;
    let mut state = AppState::new(config);
    state.load_configured();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        title,
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {e}"))
}

struct ExportRequest {
    pdf: Option<PathBuf>,
    csv: Option<PathBuf>,
    filters: Vec<(String, Vec<String>)>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    stats: Vec<Statistic>,
    json: bool,
}

/// Same pipeline as the GUI, without a window.
fn run_export(config: &DashboardConfig, request: ExportRequest) -> Result<()> {
    let schema = config.schema();
    let table = load_cached(&config.data_path, schema)
        .with_context(|| format!("loading {}", config.data_path.display()))?;

    let mut selection = init_selection(&table, schema);
    for (column, values) in &request.filters {
        if table.column_index(column).is_none() {
            bail!("unknown filter column '{column}'");
        }
        selection.restrict(&table, column, values);
    }
    if request.from.is_some() || request.to.is_some() {
        let (span_start, span_end) = table
            .date_span(schema.date_column)
            .unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        selection.dates = Some(DateRange {
            start: request.from.unwrap_or(span_start),
            end: request.to.unwrap_or(span_end),
        });
    }

    let view = apply(&table, schema, &selection);
    let summary = summarize(&view, schema, &request.stats);
    log::info!("{} of {} rows selected", view.len(), table.len());

    if let Some(path) = &request.pdf {
        let bytes = report::pdf::export_pdf(
            schema,
            &summary.kpis,
            &summary.statistics,
            &view,
            config.row_limit,
        )
        .context("building PDF report")?;
        write_file(path, &bytes)?;
    }
    if let Some(path) = &request.csv {
        let bytes = report::csv::export_csv(&view).context("building CSV export")?;
        write_file(path, &bytes)?;
    }

    if request.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
