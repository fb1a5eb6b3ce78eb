//! Named time-series columns collected once per period
//!
//! The only side channel the engine exposes: per-species biomass, catches
//! and recruits, one sample per simulated year, serializable to JSON.

use serde::Serialize;

/// One named series of yearly samples
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Collector for all report columns of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reporter {
    columns: Vec<Column>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to a column, creating the column on first use
    pub fn record(&mut self, name: &str, value: f64) {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values.push(value),
            None => self.columns.push(Column {
                name: name.to_string(),
                values: vec![value],
            }),
        }
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn to_json(&self) -> crate::core::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
