//! Scenario setup, the daily driver, and run reporting

pub mod reporting;
pub mod scenario;
pub mod schedule;

pub use reporting::Reporter;
pub use scenario::ScenarioFile;
pub use schedule::Simulation;
