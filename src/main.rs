/// Pipeline driver: fetch → label → write CSV → publish.
///
/// Usage:
///   enso_service [--config FILE] [--output FILE] [--log-file FILE]
///                [--skip-publish] [--verify]
///
/// `--verify` probes the NOAA source and the HDX site and exits without
/// fetching or publishing. `--skip-publish` runs everything up to and
/// including the local CSV, useful for inspecting output before a real run.
/// Credentials come from the environment: HDX_API_KEY and optionally
/// HDX_SITE (defaults to the production site).

use std::path::PathBuf;
use std::process::ExitCode;

use enso_service::analysis::phases;
use enso_service::config::{Config, Credentials};
use enso_service::ingest::noaa;
use enso_service::logging::{self, DataSource, LogLevel};
use enso_service::model::{EnsoError, Phase};
use enso_service::publish::hdx;
use enso_service::verify;

struct Options {
    config_path: String,
    output_path: Option<PathBuf>,
    log_file: Option<String>,
    skip_publish: bool,
    verify_only: bool,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        config_path: "./enso.toml".to_string(),
        output_path: None,
        log_file: None,
        skip_publish: false,
        verify_only: false,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                options.config_path = args.next().ok_or("--config requires a path")?;
            }
            "--output" => {
                options.output_path = Some(PathBuf::from(
                    args.next().ok_or("--output requires a path")?,
                ));
            }
            "--log-file" => {
                options.log_file = Some(args.next().ok_or("--log-file requires a path")?);
            }
            "--skip-publish" => options.skip_publish = true,
            "--verify" => options.verify_only = true,
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(options)
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let options = match parse_args() {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("error: {}", msg);
            return ExitCode::from(2);
        }
    };

    logging::init_logger(LogLevel::Info, options.log_file.as_deref(), false);

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(options: &Options) -> Result<(), EnsoError> {
    let config = Config::load(&options.config_path)?;
    let credentials = Credentials::from_env();

    if options.verify_only {
        let report = verify::run_full_verification(&config, &credentials)?;
        verify::print_summary(&report);
        return Ok(());
    }

    let client = hdx::build_client()?;

    println!("🌊 Fetching NOAA anomaly table...");
    let series = match noaa::fetch_series(&client, &config.source.base_url) {
        Ok(series) => series,
        Err(e) => {
            logging::log_noaa_failure("fetch", &e);
            return Err(e);
        }
    };
    logging::info(
        DataSource::Noaa,
        None,
        &format!("loaded {} monthly observations", series.len()),
    );

    let labeled = phases::label_phases(&series, &config.phases)?;
    let event_months = labeled
        .iter()
        .filter(|r| r.event_phase != Phase::Neutral)
        .count();
    logging::info(
        DataSource::System,
        None,
        &format!(
            "labeled {} rows, {} inside El Niño/La Niña events",
            labeled.len(),
            event_months
        ),
    );

    let dataset_name = hdx::slugify(&config.dataset.title);
    let output_path = options
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.csv", dataset_name)));

    hdx::write_resource_csv(&output_path, &config.dataset, &labeled)?;
    logging::info(
        DataSource::System,
        None,
        &format!("wrote resource CSV to {}", output_path.display()),
    );

    if options.skip_publish {
        println!("⏭ Publish step skipped (--skip-publish)");
        return Ok(());
    }

    println!("📤 Publishing to {}...", credentials.site);
    match hdx::publish_dataset(&client, &credentials, &config.dataset, &labeled, &output_path) {
        Ok(published) => {
            logging::info(
                DataSource::Hdx,
                Some(&published.name),
                &format!(
                    "created dataset {} with resource {}",
                    published.dataset_id, published.resource_id
                ),
            );
            println!("✓ Published dataset '{}'", published.name);
            Ok(())
        }
        Err(e) => {
            logging::log_hdx_failure(&dataset_name, "publish", &e);
            Err(e)
        }
    }
}
