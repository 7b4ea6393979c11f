/// Series analysis for the ENSO publishing service.
///
/// The only analysis this service performs is phase classification of the
/// smoothed anomaly series. Anything heavier (regressions, teleconnection
/// studies) belongs to the consumers of the published dataset.
///
/// Submodules:
/// - `phases` — trimester smoothing, threshold classification, event runs.

pub mod phases;
