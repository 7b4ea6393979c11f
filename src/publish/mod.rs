/// Publication of the labeled series to the open-data catalog.
///
/// Submodules:
/// - `hdx` — CSV resource generation and the HDX (CKAN) action API calls.

pub mod hdx;
