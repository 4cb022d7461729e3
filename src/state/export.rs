use serde::{Deserialize, Serialize};

use crate::state::columns::ColumnLayout;
use crate::state::grouping::DisplayRow;

/// Displayed rows × visible columns, formatted, ready for an encoder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTable {
    pub fields: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Group rows are skipped; only data rows are exported, in display order.
pub fn export_rows(rows: &[DisplayRow], layout: &ColumnLayout) -> ExportTable {
    let fields = layout.columns.iter().map(|c| c.def.field.clone()).collect();
    let headers = layout
        .columns
        .iter()
        .map(|c| c.def.header_label().to_string())
        .collect();
    let rows = rows
        .iter()
        .filter_map(DisplayRow::as_data)
        .map(|row| {
            layout
                .columns
                .iter()
                .map(|column| column.def.format(row.value(&column.def.field)))
                .collect()
        })
        .collect();

    ExportTable {
        fields,
        headers,
        rows,
    }
}
