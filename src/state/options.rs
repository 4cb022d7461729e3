use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::columns::ColumnDef;
use crate::state::data_model::RowIdSource;
use crate::state::grouping::Aggregation;
use crate::state::selection::SelectionMode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridOptions {
    pub row_height: f64,
    pub overscan: usize,
    pub pagination: bool,
    pub page_size: usize,
    pub selection_mode: SelectionMode,
    pub group_by: Vec<String>,
    pub aggregations: BTreeMap<String, Aggregation>,
    pub split_by_field: Option<String>,
    pub id_field: Option<String>,
    pub scroll_sample_ms: u64,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            row_height: 32.0,
            overscan: 5,
            pagination: false,
            page_size: 100,
            selection_mode: SelectionMode::Multiple,
            group_by: Vec::new(),
            aggregations: BTreeMap::new(),
            split_by_field: None,
            id_field: None,
            scroll_sample_ms: 16,
        }
    }
}

impl GridOptions {
    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_sample_ms)
    }

    pub fn id_source(&self) -> RowIdSource {
        match &self.id_field {
            Some(field) => RowIdSource::Field(field.clone()),
            None => RowIdSource::Positional,
        }
    }
}

/// Options plus column definitions, as stored in the config sidecar.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    #[serde(flatten)]
    pub options: GridOptions,
    pub columns: Vec<ColumnDef>,
}
