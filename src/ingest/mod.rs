/// Data ingestion for the ENSO publishing service.
///
/// Submodules:
/// - `noaa` — NOAA CPC detrended Niño 3.4 anomaly table (HTTP + text parse).

pub mod noaa;
