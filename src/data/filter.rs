use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{CellValue, Table};
use super::schema::Schema;

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per column, plus a date range
// ---------------------------------------------------------------------------

/// Per-column inclusion sets: maps column_name → set of selected values.
/// A column absent from the map places no constraint; an empty set
/// matches nothing.
pub type CategoryFilters = BTreeMap<String, BTreeSet<CellValue>>;

/// Inclusive date interval. `start > end` matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Everything the user has chosen in the filter controls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub categories: CategoryFilters,
    pub dates: Option<DateRange>,
}

impl Selection {
    /// Replace a column's inclusion set with the table values whose text
    /// is one of `labels`. Labels matching no value are dropped.
    pub fn restrict(&mut self, table: &Table, column: &str, labels: &[String]) {
        let selected = options(table, column)
            .into_iter()
            .filter(|v| labels.iter().any(|l| *l == v.to_field()))
            .collect();
        self.categories.insert(column.to_string(), selected);
    }
}

/// Selectable values for a filter column.
pub fn options(table: &Table, column: &str) -> BTreeSet<CellValue> {
    table.distinct(column)
}

/// Initialise a [`Selection`] with everything selected and the date range
/// spanning the whole table. Filter columns the table lacks are skipped.
pub fn init_selection(table: &Table, schema: &Schema) -> Selection {
    let categories = schema
        .filter_columns
        .iter()
        .filter(|col| table.column_index(col).is_some())
        .map(|col| (col.to_string(), options(table, col)))
        .collect();
    let dates = table
        .date_span(schema.date_column)
        .map(|(start, end)| DateRange { start, end });
    Selection { categories, dates }
}

/// Return indices of rows that pass all predicates, in table order.
///
/// A row passes a column filter when:
/// * The column is not present in `selection` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * The row's value for that column is in the selected set → passes
///
/// A row passes the date filter when its date lies in the range; rows with
/// no date never pass an active date filter.
pub fn filtered_indices(table: &Table, schema: &Schema, selection: &Selection) -> Vec<usize> {
    let predicates: Vec<(Option<usize>, &BTreeSet<CellValue>)> = selection
        .categories
        .iter()
        .map(|(col, selected)| (table.column_index(col), selected))
        .collect();
    let date_idx = table.column_index(schema.date_column);

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            for (idx, selected) in &predicates {
                if selected.is_empty() {
                    // Nothing selected for this column → hide everything
                    return false;
                }
                match idx.and_then(|i| row.cells.get(i)) {
                    Some(val) => {
                        if !selected.contains(val) {
                            return false;
                        }
                    }
                    None => {
                        // table doesn't have this column → include only if Null is selected
                        if !selected.contains(&CellValue::Null) {
                            return false;
                        }
                    }
                }
            }
            match (&selection.dates, date_idx) {
                (None, _) => true,
                (Some(range), Some(i)) => row.cells[i].as_date().is_some_and(|d| range.contains(d)),
                (Some(_), None) => false,
            }
        })
        .map(|(i, _)| i)
        .collect()
}

/// The filtered view: a new table holding the passing rows. `table` is
/// left untouched.
pub fn apply(table: &Table, schema: &Schema, selection: &Selection) -> Table {
    table.select(&filtered_indices(table, schema, selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;
    use crate::data::schema::CLAIMS;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table() -> Table {
        let row = |d: &str, region: &str, status: &str, amount: f64| Row {
            cells: vec![
                CellValue::Date(date(d)),
                CellValue::String(region.into()),
                CellValue::String(status.into()),
                CellValue::Float(amount),
            ],
        };
        Table::from_rows(
            vec![
                "Date".into(),
                "Region".into(),
                "Claim Status".into(),
                "Claim Amount".into(),
            ],
            vec![
                row("2024-01-01", "North", "Approved", 100.0),
                row("2024-01-15", "South", "Denied", 200.0),
                row("2024-02-01", "North", "Pending", 300.0),
                row("2024-03-01", "East", "Approved", 400.0),
            ],
        )
    }

    fn strings(values: &[&str]) -> BTreeSet<CellValue> {
        values.iter().map(|v| CellValue::String(v.to_string())).collect()
    }

    #[test]
    fn init_selection_matches_everything() {
        let t = table();
        let sel = init_selection(&t, &CLAIMS);
        assert_eq!(sel.categories["Region"].len(), 3);
        assert_eq!(
            sel.dates,
            Some(DateRange {
                start: date("2024-01-01"),
                end: date("2024-03-01")
            })
        );
        assert_eq!(filtered_indices(&t, &CLAIMS, &sel), vec![0, 1, 2, 3]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let t = table();
        let mut sel = init_selection(&t, &CLAIMS);
        sel.categories.insert("Region".into(), strings(&["North", "East"]));
        sel.categories
            .insert("Claim Status".into(), strings(&["Approved", "Pending"]));
        sel.dates = Some(DateRange {
            start: date("2024-01-01"),
            end: date("2024-02-01"),
        });
        assert_eq!(filtered_indices(&t, &CLAIMS, &sel), vec![0, 2]);
    }

    #[test]
    fn empty_inclusion_set_matches_nothing() {
        let t = table();
        let mut sel = init_selection(&t, &CLAIMS);
        sel.categories.insert("Region".into(), BTreeSet::new());
        assert!(apply(&t, &CLAIMS, &sel).is_empty());
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let t = table();
        let sel = Selection {
            categories: CategoryFilters::new(),
            dates: Some(DateRange {
                start: date("2024-01-15"),
                end: date("2024-02-01"),
            }),
        };
        assert_eq!(filtered_indices(&t, &CLAIMS, &sel), vec![1, 2]);
    }

    #[test]
    fn reversed_date_range_yields_empty_table() {
        let t = table();
        let mut sel = init_selection(&t, &CLAIMS);
        sel.dates = Some(DateRange {
            start: date("2024-03-01"),
            end: date("2024-01-01"),
        });
        let view = apply(&t, &CLAIMS, &sel);
        assert_eq!(view.len(), 0);
        assert_eq!(view.columns, t.columns);
    }

    #[test]
    fn stale_values_are_never_matched() {
        let t = table();
        let mut sel = init_selection(&t, &CLAIMS);
        sel.categories.insert("Region".into(), strings(&["West"]));
        assert!(filtered_indices(&t, &CLAIMS, &sel).is_empty());
    }

    #[test]
    fn apply_returns_subset_satisfying_every_predicate() {
        let t = table();
        let mut sel = init_selection(&t, &CLAIMS);
        sel.categories.insert("Region".into(), strings(&["North"]));
        let view = apply(&t, &CLAIMS, &sel);

        assert_eq!(t.len(), 4);
        for row in &view.rows {
            assert!(t.rows.contains(row));
            assert_eq!(row.cells[1], CellValue::String("North".into()));
            assert!(sel.dates.unwrap().contains(row.cells[0].as_date().unwrap()));
        }
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn restrict_selects_values_by_label() {
        let t = table();
        let mut sel = init_selection(&t, &CLAIMS);
        sel.restrict(&t, "Region", &["South".to_string(), "Nowhere".to_string()]);
        assert_eq!(sel.categories["Region"], strings(&["South"]));
        assert_eq!(filtered_indices(&t, &CLAIMS, &sel), vec![1]);
    }
}
