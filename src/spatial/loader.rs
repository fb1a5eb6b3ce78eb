//! Load allocation grids from their tabular file format
//!
//! The file is comma-separated with one weight per row:
//!
//! ```text
//! day,key,x,y,weight
//! 0,Skipjack:small,0,0,0.25
//! 0,Skipjack:small,1,0,0.75
//! ```
//!
//! `key` is a species name (matched case-insensitively), optionally suffixed
//! with `:group` for size-group grids. Rows are grouped by (day, key) and
//! each resulting grid is normalized at construction time.

use crate::biology::species::SpeciesRegistry;
use crate::core::error::Result;
use crate::core::types::{CellIndex, GridKey};
use crate::spatial::allocation::{AllocationGrids, GridSlice, WeightGrid};
use crate::spatial::map::MapExtent;
use ahash::AHashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading a grid file
#[derive(Debug, Error)]
pub enum GridFileError {
    #[error("line {line}: expected day,key,x,y,weight but got {found} fields")]
    WrongFieldCount { line: usize, found: usize },

    #[error("line {line}: could not parse {field}: {value:?}")]
    BadField { line: usize, field: &'static str, value: String },

    #[error("line {line}: unknown species {name:?}")]
    UnknownSpecies { line: usize, name: String },

    #[error("line {line}: cell ({x}, {y}) is outside the {width}x{height} map")]
    OutOfExtent { line: usize, x: u32, y: u32, width: u32, height: u32 },

    #[error("line {line}: negative weight {weight}")]
    NegativeWeight { line: usize, weight: f64 },

    #[error("grid file has no data rows")]
    Empty,
}

/// Parse a grid file from disk and build the normalized allocation grids
pub fn load_from_file(
    path: &Path,
    registry: &SpeciesRegistry,
    extent: MapExtent,
    water_cells: &[CellIndex],
    cycle_length: u32,
) -> Result<AllocationGrids> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content, registry, extent, water_cells, cycle_length)
}

/// Parse grid file text and build the normalized allocation grids
pub fn load_from_str(
    text: &str,
    registry: &SpeciesRegistry,
    extent: MapExtent,
    water_cells: &[CellIndex],
    cycle_length: u32,
) -> Result<AllocationGrids> {
    let mut accumulated: AHashMap<u32, GridSlice> = AHashMap::new();
    let mut rows = 0usize;

    for (line_idx, raw_line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Tolerate a header row
        if line_idx == 0 && line.to_ascii_lowercase().starts_with("day,") {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 5 {
            return Err(GridFileError::WrongFieldCount { line: line_no, found: fields.len() }.into());
        }

        let day = parse_field::<u32>(fields[0], "day", line_no)?;
        let key = parse_key(fields[1], registry, line_no)?;
        let x = parse_field::<u32>(fields[2], "x", line_no)?;
        let y = parse_field::<u32>(fields[3], "y", line_no)?;
        let weight = parse_field::<f64>(fields[4], "weight", line_no)?;

        let cell = CellIndex::new(x, y);
        if !extent.contains(cell) {
            return Err(GridFileError::OutOfExtent {
                line: line_no,
                x,
                y,
                width: extent.width,
                height: extent.height,
            }
            .into());
        }
        if weight < 0.0 {
            return Err(GridFileError::NegativeWeight { line: line_no, weight }.into());
        }

        let slice = accumulated.entry(day).or_default();
        let grid = slice.entry(key).or_insert_with(|| WeightGrid::zeros(extent));
        grid.set(cell, grid.get(cell) + weight);
        rows += 1;
    }

    if rows == 0 {
        return Err(GridFileError::Empty.into());
    }

    AllocationGrids::new(accumulated.into_iter().collect(), cycle_length, extent, water_cells)
}

fn parse_field<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
    line: usize,
) -> std::result::Result<T, GridFileError> {
    value.parse().map_err(|_| GridFileError::BadField {
        line,
        field,
        value: value.to_string(),
    })
}

fn parse_key(
    raw: &str,
    registry: &SpeciesRegistry,
    line: usize,
) -> std::result::Result<GridKey, GridFileError> {
    let (name, group) = match raw.split_once(':') {
        Some((name, group)) => (name.trim(), Some(group.trim())),
        None => (raw, None),
    };
    let species = registry
        .by_name(name)
        .ok_or_else(|| GridFileError::UnknownSpecies { line, name: name.to_string() })?;
    Ok(match group {
        Some(g) if !g.is_empty() => GridKey::grouped(species.id, g.to_ascii_lowercase()),
        _ => GridKey::whole(species.id),
    })
}
