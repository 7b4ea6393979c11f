/// ENSO monitoring and publishing service.
///
/// Fetches the NOAA CPC Niño 3.4 anomaly table, derives El Niño / La Niña
/// phase and event labels, and publishes the enriched table to HDX as one
/// dataset with one CSV resource.

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod publish;
pub mod verify;
