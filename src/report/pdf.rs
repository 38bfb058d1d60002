use printpdf::{BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb};

use super::format::{format_currency, format_statistic};
use crate::data::model::{CellValue, Table};
use crate::data::schema::Schema;
use crate::data::stats::{Kpis, StatLine};
use crate::error::ExportError;

// ---------------------------------------------------------------------------
// Page geometry (A4 portrait, millimetres measured from the top-left)
// ---------------------------------------------------------------------------

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
/// Content may not extend below `PAGE_HEIGHT - BREAK_MARGIN`.
const BREAK_MARGIN: f32 = 20.0;
const CELL_WIDTH: f32 = 32.0;
const ROW_HEIGHT: f32 = 8.0;
const PT_TO_MM: f32 = 0.3528;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// A single text cell placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub size: f32,
    pub style: FontStyle,
    pub align: Align,
    pub border: bool,
    /// Text grey level, 0 = black.
    pub grey: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: usize,
    pub cells: Vec<Cell>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.text.as_str())
    }
}

/// The laid-out report, before it is drawn to PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub pages: Vec<Page>,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

struct LayoutWriter {
    title: String,
    pages: Vec<Page>,
    y: f32,
}

impl LayoutWriter {
    fn new(title: &str) -> Self {
        let mut writer = LayoutWriter {
            title: title.to_string(),
            pages: Vec::new(),
            y: MARGIN,
        };
        writer.add_page();
        writer
    }

    /// Start a page with its header and footer already placed.
    fn add_page(&mut self) {
        let number = self.pages.len() + 1;
        let full = PAGE_WIDTH - 2.0 * MARGIN;
        let header = Cell {
            text: self.title.clone(),
            x: MARGIN,
            y: MARGIN,
            width: full,
            height: 10.0,
            size: 16.0,
            style: FontStyle::Bold,
            align: Align::Center,
            border: false,
            grey: 40,
        };
        let footer = Cell {
            text: format!("Page {number}"),
            x: MARGIN,
            y: PAGE_HEIGHT - 15.0,
            width: full,
            height: 10.0,
            size: 8.0,
            style: FontStyle::Italic,
            align: Align::Center,
            border: false,
            grey: 100,
        };
        self.pages.push(Page {
            number,
            cells: vec![header, footer],
        });
        self.y = MARGIN + 10.0 + 5.0;
    }

    /// Break the page if `height` does not fit; true when a page was added.
    fn ensure_space(&mut self, height: f32) -> bool {
        if self.y + height > PAGE_HEIGHT - BREAK_MARGIN {
            self.add_page();
            true
        } else {
            false
        }
    }

    fn push(&mut self, cell: Cell) {
        if let Some(page) = self.pages.last_mut() {
            page.cells.push(cell);
        }
    }

    fn line(&mut self, text: String, size: f32, height: f32) {
        self.ensure_space(height);
        self.push(Cell {
            text,
            x: MARGIN,
            y: self.y,
            width: PAGE_WIDTH - 2.0 * MARGIN,
            height,
            size,
            style: FontStyle::Regular,
            align: Align::Left,
            border: false,
            grey: 30,
        });
        self.y += height;
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    fn table_row(&mut self, texts: &[String], size: f32, style: FontStyle) {
        for (i, text) in texts.iter().enumerate() {
            self.push(Cell {
                text: fit(text, CELL_WIDTH, size),
                x: MARGIN + i as f32 * CELL_WIDTH,
                y: self.y,
                width: CELL_WIDTH,
                height: ROW_HEIGHT,
                size,
                style,
                align: Align::Left,
                border: true,
                grey: 20,
            });
        }
        self.y += ROW_HEIGHT;
    }

    fn finish(self) -> ReportLayout {
        ReportLayout {
            title: self.title,
            pages: self.pages,
        }
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * 0.5
}

/// Truncate `text` so it fits a cell of `width`.
fn fit(text: &str, width: f32, size: f32) -> String {
    let max_chars = ((width - 2.0) / (size * PT_TO_MM * 0.5)).floor() as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn cell_text(schema: &Schema, column: &str, value: Option<&CellValue>) -> String {
    match value {
        None | Some(CellValue::Null) => String::new(),
        Some(v) if schema.is_amount(column) => v.as_f64().map_or_else(|| v.to_string(), format_currency),
        Some(v) => v.to_string(),
    }
}

/// Lay out the report: summary block, statistics block, then the first
/// `row_limit` rows of `rows` in their current order.
pub fn layout_report(
    schema: &Schema,
    kpis: &Kpis,
    stats: &[StatLine],
    rows: &Table,
    row_limit: usize,
) -> ReportLayout {
    let mut w = LayoutWriter::new(schema.report_title);

    w.line(format!("{}: {}", schema.total_label, format_currency(kpis.total)), 12.0, 10.0);
    w.line(format!("{}: {}", schema.average_label, format_currency(kpis.average)), 12.0, 10.0);
    if let (Some(approved), Some(status)) = (kpis.approved_total, schema.status) {
        w.line(format!("{}: {}", status.approved_label, format_currency(approved)), 12.0, 10.0);
    }
    w.gap(5.0);

    for line in stats {
        w.line(statistic_line(line), 10.0, 8.0);
    }
    w.gap(5.0);

    let header: Vec<String> = schema.report_columns.iter().map(|c| c.to_string()).collect();
    w.ensure_space(ROW_HEIGHT * 2.0);
    w.table_row(&header, 10.0, FontStyle::Bold);

    let indices: Vec<Option<usize>> = schema
        .report_columns
        .iter()
        .map(|c| rows.column_index(c))
        .collect();
    for row in rows.rows.iter().take(row_limit) {
        if w.ensure_space(ROW_HEIGHT) {
            w.table_row(&header, 10.0, FontStyle::Bold);
        }
        let texts: Vec<String> = schema
            .report_columns
            .iter()
            .zip(&indices)
            .map(|(col, idx)| cell_text(schema, col, idx.and_then(|i| row.cells.get(i))))
            .collect();
        w.table_row(&texts, 9.0, FontStyle::Regular);
    }

    w.finish()
}

// ---------------------------------------------------------------------------
// PDF rendering
// ---------------------------------------------------------------------------

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

fn pdf_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// Draw a layout with the built-in Helvetica family.
pub fn render_layout(layout: &ReportLayout) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(&layout.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_error)?,
    };

    for (i, page) in layout.pages.iter().enumerate() {
        let (page_idx, layer_idx) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1")
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        for cell in &page.cells {
            draw_cell(&layer, &fonts, cell);
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn draw_cell(layer: &PdfLayerReference, fonts: &Fonts, cell: &Cell) {
    let grey = cell.grey as f32 / 255.0;
    layer.set_fill_color(Color::Rgb(Rgb::new(grey, grey, grey, None)));

    let x = match cell.align {
        Align::Left => cell.x + 1.0,
        Align::Center => cell.x + ((cell.width - text_width(&cell.text, cell.size)) / 2.0).max(0.0),
    };
    let baseline = cell.y + cell.height / 2.0 + 0.3 * cell.size * PT_TO_MM;
    layer.use_text(
        cell.text.clone(),
        cell.size,
        Mm(x),
        Mm(PAGE_HEIGHT - baseline),
        fonts.get(cell.style),
    );

    if cell.border {
        let top = PAGE_HEIGHT - cell.y;
        let bottom = top - cell.height;
        let right = cell.x + cell.width;
        layer.set_outline_thickness(0.2);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(cell.x), Mm(top)), false),
                (Point::new(Mm(right), Mm(top)), false),
                (Point::new(Mm(right), Mm(bottom)), false),
                (Point::new(Mm(cell.x), Mm(bottom)), false),
            ],
            is_closed: true,
        });
    }
}

/// Build the PDF report for the current view.
pub fn export_pdf(
    schema: &Schema,
    kpis: &Kpis,
    stats: &[StatLine],
    rows: &Table,
    row_limit: usize,
) -> Result<Vec<u8>, ExportError> {
    let layout = layout_report(schema, kpis, stats, rows, row_limit);
    let bytes = render_layout(&layout)?;
    log::info!(
        "Exported PDF report: {} pages, {} of {} rows, {} bytes",
        layout.pages.len(),
        rows.len().min(row_limit),
        rows.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// `label: value` as printed in the statistics block.
pub fn statistic_line(line: &StatLine) -> String {
    format!("{}: {}", line.statistic.label(), format_statistic(line.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;
    use crate::data::schema::{CLAIMS, SALES};
    use crate::data::stats::{summarize, Statistic};
    use chrono::NaiveDate;

    fn claims(n: usize) -> Table {
        Table::from_rows(
            CLAIMS.report_columns.iter().map(|c| c.to_string()).collect(),
            (0..n)
                .map(|i| Row {
                    cells: vec![
                        CellValue::Integer(i as i64 + 1),
                        CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                        CellValue::String("North".into()),
                        CellValue::String("Comprehensive".into()),
                        CellValue::Float(1234.5),
                        CellValue::String("Approved".into()),
                    ],
                })
                .collect(),
        )
    }

    fn layout(table: &Table, row_limit: usize) -> ReportLayout {
        let summary = summarize(table, &CLAIMS, &Statistic::ALL);
        layout_report(&CLAIMS, &summary.kpis, &summary.statistics, table, row_limit)
    }

    #[test]
    fn empty_view_renders_header_footer_and_zeroed_summary() {
        let layout = layout(&claims(0), 30);
        assert_eq!(layout.pages.len(), 1);
        let texts: Vec<&str> = layout.pages[0].texts().collect();
        assert!(texts.contains(&"Insurance Claims Report"));
        assert!(texts.contains(&"Page 1"));
        assert!(texts.contains(&"Total Claims: $0.00"));
        assert!(texts.contains(&"Average Claim: $0.00"));
        assert!(texts.contains(&"Approved Claims: $0.00"));
        assert!(texts.contains(&"count: 0.00"));
        assert!(texts.contains(&"mean: n/a"));

        let bytes = render_layout(&layout).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn table_rows_are_capped_and_formatted() {
        let layout = layout(&claims(50), 30);
        let amounts = layout
            .pages
            .iter()
            .flat_map(|p| p.texts())
            .filter(|t| *t == "$1,234.50")
            .count();
        assert_eq!(amounts, 30);
        let all: Vec<&str> = layout.pages.iter().flat_map(|p| p.texts()).collect();
        assert!(all.contains(&"2024-01-01"));
        assert!(all.contains(&"30"));
        assert!(!all.contains(&"31"));
    }

    #[test]
    fn every_page_has_header_and_numbered_footer() {
        let layout = layout(&claims(80), 80);
        assert!(layout.pages.len() >= 3);
        for page in &layout.pages {
            let texts: Vec<&str> = page.texts().collect();
            assert!(texts.contains(&"Insurance Claims Report"));
            assert!(texts.contains(&format!("Page {}", page.number).as_str()));
            assert!(page
                .cells
                .iter()
                .all(|c| c.y + c.height <= PAGE_HEIGHT - 5.0));
        }
    }

    #[test]
    fn sales_report_has_two_kpi_lines() {
        let table = Table::from_rows(vec!["Sales Amount".into()], Vec::new());
        let summary = summarize(&table, &SALES, &[]);
        let layout = layout_report(&SALES, &summary.kpis, &summary.statistics, &table, 30);
        let texts: Vec<&str> = layout.pages[0].texts().collect();
        assert!(texts.contains(&"Sales Report"));
        assert!(texts.contains(&"Total Sales: $0.00"));
        assert!(!texts.iter().any(|t| t.starts_with("Approved")));
    }

    #[test]
    fn long_cells_are_truncated() {
        let text = fit("A very long region name that will not fit", CELL_WIDTH, 9.0);
        assert!(text.ends_with("..."));
        assert!(text_width(&text, 9.0) <= CELL_WIDTH);
    }
}
