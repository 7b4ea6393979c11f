//! Data Source Verification Module
//!
//! Framework for testing the configured endpoints against the live services
//! to determine whether a publish run can succeed: is the NOAA table
//! reachable and parseable, and is the HDX site responding.
//!
//! Use this (or `--verify`) before a scheduled run or after changing the
//! configuration.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Config, Credentials};
use crate::model::EnsoError;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub noaa: NoaaVerification,
    pub hdx: HdxVerification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoaaVerification {
    pub url: String,
    pub status: VerificationStatus,
    pub reachable: bool,
    pub row_count: usize,
    pub first_month: Option<String>,
    pub last_month: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HdxVerification {
    pub site: String,
    pub status: VerificationStatus,
    pub api_responsive: bool,
    pub api_key_present: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// NOAA Verification
// ============================================================================

pub fn verify_noaa_source(client: &reqwest::blocking::Client, base_url: &str) -> NoaaVerification {
    let mut result = NoaaVerification {
        url: base_url.to_string(),
        status: VerificationStatus::Failed,
        reachable: false,
        row_count: 0,
        first_month: None,
        last_month: None,
        error_message: None,
    };

    match crate::ingest::noaa::fetch_series(client, base_url) {
        Ok(series) => {
            result.reachable = true;
            result.row_count = series.len();
            result.first_month = series.first().map(|o| o.date.format("%Y-%m").to_string());
            result.last_month = series.last().map(|o| o.date.format("%Y-%m").to_string());

            if series.len() >= 3 {
                result.status = VerificationStatus::Success;
            } else {
                // Reachable but too short to produce any defined trimester.
                result.status = VerificationStatus::PartialSuccess;
            }
        }
        Err(EnsoError::HttpError(code)) => {
            result.error_message = Some(format!("HTTP {}", code));
        }
        Err(e) => {
            // The endpoint may have answered but with an unparseable body.
            result.reachable = matches!(e, EnsoError::ParseError(_) | EnsoError::InvalidSeries(_));
            result.error_message = Some(e.to_string());
        }
    }

    result
}

// ============================================================================
// HDX Verification
// ============================================================================

pub fn verify_hdx_site(
    client: &reqwest::blocking::Client,
    credentials: &Credentials,
) -> HdxVerification {
    let mut result = HdxVerification {
        site: credentials.site.clone(),
        status: VerificationStatus::Failed,
        api_responsive: false,
        api_key_present: credentials.api_key.is_some(),
        error_message: None,
    };

    let url = format!("{}/api/3/action/site_read", credentials.site);
    match client.get(&url).timeout(Duration::from_secs(10)).send() {
        Ok(response) => {
            if response.status().is_success() {
                match response.json::<serde_json::Value>() {
                    Ok(json) => {
                        result.api_responsive =
                            json.get("success").and_then(|s| s.as_bool()).unwrap_or(false);
                        if !result.api_responsive {
                            result.error_message =
                                Some("site_read returned success=false".to_string());
                        }
                    }
                    Err(e) => {
                        result.error_message = Some(format!("Parse error: {}", e));
                    }
                }
            } else {
                result.error_message = Some(format!("HTTP {}", response.status()));
            }
        }
        Err(e) => {
            result.error_message = Some(format!("Request failed: {}", e));
        }
    }

    if result.api_responsive {
        if result.api_key_present {
            result.status = VerificationStatus::Success;
        } else {
            // Site is up but this environment can only run read-only.
            result.status = VerificationStatus::PartialSuccess;
        }
    }

    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_full_verification(
    config: &Config,
    credentials: &Credentials,
) -> Result<VerificationReport, EnsoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("enso_service/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| EnsoError::ConfigError(format!("client build failed: {}", e)))?;

    println!("🔍 Verifying NOAA source...");
    let noaa = verify_noaa_source(&client, &config.source.base_url);
    match noaa.status {
        VerificationStatus::Success => {
            println!(
                "  ✓ OK ({} rows, {} to {})",
                noaa.row_count,
                noaa.first_month.as_deref().unwrap_or("?"),
                noaa.last_month.as_deref().unwrap_or("?")
            );
        }
        VerificationStatus::PartialSuccess => {
            println!("  ⚠ Reachable but only {} rows", noaa.row_count);
        }
        VerificationStatus::Failed => {
            println!(
                "  ✗ FAILED: {}",
                noaa.error_message.as_deref().unwrap_or("Unknown")
            );
        }
    }

    println!("\n🔍 Verifying HDX site...");
    let hdx = verify_hdx_site(&client, credentials);
    match hdx.status {
        VerificationStatus::Success => println!("  ✓ OK (API key present)"),
        VerificationStatus::PartialSuccess => {
            println!("  ⚠ Site responsive but no API key — read-only")
        }
        VerificationStatus::Failed => {
            println!(
                "  ✗ FAILED: {}",
                hdx.error_message.as_deref().unwrap_or("Unknown")
            );
        }
    }

    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        noaa,
        hdx,
    })
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "NOAA source:   {:?} ({} rows)",
        report.noaa.status, report.noaa.row_count
    );
    println!(
        "HDX site:      {:?} ({})",
        report.hdx.status,
        if report.hdx.api_key_present {
            "API key present"
        } else {
            "no API key"
        }
    );
    println!("═══════════════════════════════════════════════════════════");
}
