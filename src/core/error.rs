use thiserror::Error;

#[derive(Error, Debug)]
pub enum PelagosError {
    #[error("Allocation grid for {key} at day {day} is {grid_width}x{grid_height} but the map is {map_width}x{map_height}")]
    GridDimensionMismatch {
        key: String,
        day: u32,
        grid_width: u32,
        grid_height: u32,
        map_width: u32,
        map_height: u32,
    },

    #[error("Allocation grid for {key} at day {day} sums to zero and cannot be normalized")]
    ZeroSumGrid { key: String, day: u32 },

    #[error("Allocation grid for {key} at day {day} puts weight on non-water cell ({x}, {y})")]
    WeightOnLand { key: String, day: u32, x: u32, y: u32 },

    #[error("Allocation grid for {key} is present at day 0 but missing at day {day}")]
    MissingGridSlice { key: String, day: u32 },

    #[error("No allocation grid for {key} at step {step}")]
    MissingGridKey { key: String, step: u64 },

    #[error("Mortality for species {species} exceeds 1 at period {period}, subdivision {subdivision}, bin {bin}: combined proportion {combined}")]
    OverSpecifiedMortality {
        species: String,
        period: usize,
        subdivision: usize,
        bin: usize,
        combined: f64,
    },

    #[error("Malformed meristics for {species}: {reason}")]
    MalformedMeristics { species: String, reason: String },

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Grid file error: {0}")]
    GridFile(#[from] crate::spatial::loader::GridFileError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PelagosError>;
