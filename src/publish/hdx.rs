/// HDX (Humanitarian Data Exchange) catalog publisher.
///
/// Turns the labeled series into one CSV resource file and registers it on
/// HDX as one dataset with one attached resource, using the CKAN action API
/// (`package_create`, `resource_create`). Dataset metadata comes from the
/// `[dataset]` section of the configuration; the date range comes from the
/// series itself.
///
/// API documentation: https://docs.ckan.org/en/latest/api/

use std::path::Path;
use std::time::Duration;

use crate::config::{Credentials, DatasetConfig};
use crate::model::{EnsoError, LabeledObservation};

/// Output column order of the published resource: passthrough columns
/// first, derived columns appended.
pub const RESOURCE_HEADERS: [&str; 8] = [
    "date",
    "TOTAL",
    "ClimAdjust",
    "ANOM",
    "ANOM_trimester",
    "ANOM_trimester_round",
    "phase_trimester",
    "phase_event",
];

/// A successfully created dataset + resource pair.
#[derive(Debug, Clone)]
pub struct PublishedDataset {
    pub name: String,
    pub dataset_id: String,
    pub resource_id: String,
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Slug used as the CKAN dataset name and the resource filename stem.
///
/// Lowercases, folds the Latin diacritics that occur in ENSO titles
/// (Niño → nino), and collapses every other non-alphanumeric run into a
/// single hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen

    for c in title.chars() {
        let folded = match c {
            'á' | 'à' | 'â' | 'ä' | 'Á' | 'À' | 'Â' | 'Ä' => Some('a'),
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => Some('e'),
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => Some('i'),
            'ó' | 'ò' | 'ô' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Ö' => Some('o'),
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => Some('u'),
            'ñ' | 'Ñ' => Some('n'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            _ => None,
        };

        match folded {
            Some(c) => {
                slug.push(c);
                last_was_hyphen = false;
            }
            None if !last_was_hyphen => {
                slug.push('-');
                last_was_hyphen = true;
            }
            None => {}
        }
    }

    slug.trim_end_matches('-').to_string()
}

// ---------------------------------------------------------------------------
// Resource CSV
// ---------------------------------------------------------------------------

/// Write the labeled series as the resource CSV: header row, HXL hashtag
/// row, then one row per month. Undefined trimester values become empty
/// cells.
pub fn write_resource_csv(
    path: &Path,
    dataset: &DatasetConfig,
    rows: &[LabeledObservation],
) -> Result<(), EnsoError> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(RESOURCE_HEADERS)?;

    let hxl_row: Vec<&str> = RESOURCE_HEADERS
        .iter()
        .map(|header| dataset.hxl_tags.get(*header).map(String::as_str).unwrap_or(""))
        .collect();
    writer.write_record(&hxl_row)?;

    for row in rows {
        writer.write_record(&[
            row.date.format("%Y-%m-%d").to_string(),
            row.total.to_string(),
            row.climate_adjustment.to_string(),
            row.anomaly.to_string(),
            row.trimester_average.map(|v| v.to_string()).unwrap_or_default(),
            row.trimester_average_rounded
                .map(|v| v.to_string())
                .unwrap_or_default(),
            row.trimester_phase.to_string(),
            row.event_phase.to_string(),
        ])?;
    }

    writer.flush().map_err(|e| EnsoError::IoError(e.to_string()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Dataset metadata
// ---------------------------------------------------------------------------

/// CKAN time-period string derived from the series bounds:
/// `[<first month>T00:00:00 TO <last month>T23:59:59]`.
pub fn dataset_date_range(rows: &[LabeledObservation]) -> Option<String> {
    let first = rows.first()?;
    let last = rows.last()?;
    Some(format!(
        "[{}T00:00:00 TO {}T23:59:59]",
        first.date.format("%Y-%m-%d"),
        last.date.format("%Y-%m-%d")
    ))
}

/// Build the `package_create` request body from configuration plus the
/// series-derived date range.
pub fn build_package_body(
    dataset: &DatasetConfig,
    rows: &[LabeledObservation],
) -> Result<serde_json::Value, EnsoError> {
    let dataset_date = dataset_date_range(rows).ok_or_else(|| {
        EnsoError::PublishError("refusing to publish an empty series".to_string())
    })?;

    let tags: Vec<serde_json::Value> = dataset
        .tags
        .iter()
        .map(|name| serde_json::json!({ "name": name }))
        .collect();

    Ok(serde_json::json!({
        "name": slugify(&dataset.title),
        "title": dataset.title,
        "notes": dataset.notes,
        "methodology": dataset.methodology,
        "caveats": dataset.caveats,
        "dataset_source": dataset.dataset_source,
        "license_id": dataset.license_id,
        "maintainer": dataset.maintainer,
        "owner_org": dataset.owner_org,
        "private": false,
        "data_update_frequency": dataset.data_update_frequency,
        "dataset_date": dataset_date,
        "groups": [{ "name": "world" }],
        "tags": tags,
    }))
}

// ---------------------------------------------------------------------------
// CKAN action API
// ---------------------------------------------------------------------------

/// Shared client setup for catalog calls. HDX requires a user agent.
pub fn build_client() -> Result<reqwest::blocking::Client, EnsoError> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("enso_service/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| EnsoError::PublishError(format!("client build failed: {}", e)))
}

/// POST a JSON action and unwrap the CKAN `{success, result}` envelope.
fn post_action(
    client: &reqwest::blocking::Client,
    credentials: &Credentials,
    action: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, EnsoError> {
    let api_key = credentials.api_key.as_deref().ok_or_else(|| {
        EnsoError::PublishError("HDX_API_KEY is not set; cannot publish".to_string())
    })?;

    let url = format!("{}/api/3/action/{}", credentials.site, action);
    let response = client
        .post(&url)
        .header("Authorization", api_key)
        .json(body)
        .send()
        .map_err(|e| EnsoError::PublishError(format!("{} request failed: {}", action, e)))?;

    let status = response.status();
    let envelope: serde_json::Value = response
        .json()
        .map_err(|e| EnsoError::PublishError(format!("{}: unreadable response: {}", action, e)))?;

    unwrap_envelope(action, status.as_u16(), envelope)
}

/// Check status + `success` and extract `result`.
fn unwrap_envelope(
    action: &str,
    status: u16,
    envelope: serde_json::Value,
) -> Result<serde_json::Value, EnsoError> {
    if !(200..300).contains(&status) {
        // CKAN puts the reason under error.message on failures.
        let detail = envelope
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("no detail");
        return Err(EnsoError::PublishError(format!(
            "{}: HTTP {}: {}",
            action, status, detail
        )));
    }

    let succeeded = envelope
        .get("success")
        .and_then(|s| s.as_bool())
        .unwrap_or(false);
    if !succeeded {
        return Err(EnsoError::PublishError(format!(
            "{}: API reported failure: {}",
            action, envelope
        )));
    }

    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| EnsoError::PublishError(format!("{}: envelope has no result", action)))
}

/// Create the dataset record and attach the CSV resource.
///
/// The resource file must already exist at `resource_path` (see
/// `write_resource_csv`).
pub fn publish_dataset(
    client: &reqwest::blocking::Client,
    credentials: &Credentials,
    dataset: &DatasetConfig,
    rows: &[LabeledObservation],
    resource_path: &Path,
) -> Result<PublishedDataset, EnsoError> {
    let name = slugify(&dataset.title);

    // Step 1: dataset record.
    let package_body = build_package_body(dataset, rows)?;
    let package = post_action(client, credentials, "package_create", &package_body)?;
    let dataset_id = package
        .get("id")
        .and_then(|id| id.as_str())
        .ok_or_else(|| EnsoError::PublishError("package_create: result has no id".to_string()))?
        .to_string();

    // Step 2: resource with file upload.
    let api_key = credentials.api_key.as_deref().ok_or_else(|| {
        EnsoError::PublishError("HDX_API_KEY is not set; cannot publish".to_string())
    })?;

    let form = reqwest::blocking::multipart::Form::new()
        .text("package_id", dataset_id.clone())
        .text("name", format!("{}.csv", name))
        .text("description", dataset.resource_description.clone())
        .text("format", "csv")
        .file("upload", resource_path)
        .map_err(|e| EnsoError::IoError(format!("resource file: {}", e)))?;

    let url = format!("{}/api/3/action/resource_create", credentials.site);
    let response = client
        .post(&url)
        .header("Authorization", api_key)
        .multipart(form)
        .send()
        .map_err(|e| EnsoError::PublishError(format!("resource_create request failed: {}", e)))?;

    let status = response.status();
    let envelope: serde_json::Value = response.json().map_err(|e| {
        EnsoError::PublishError(format!("resource_create: unreadable response: {}", e))
    })?;
    let resource = unwrap_envelope("resource_create", status.as_u16(), envelope)?;

    let resource_id = resource
        .get("id")
        .and_then(|id| id.as_str())
        .ok_or_else(|| EnsoError::PublishError("resource_create: result has no id".to_string()))?
        .to_string();

    Ok(PublishedDataset {
        name,
        dataset_id,
        resource_id,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
