mod settings;

use anyhow::Context;
use settings::Settings;
use std::process::ExitCode;
use track_frame_lib::{CsvDirectorySink, Pipeline, ReferenceCatalog, TrackStore};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    setup_logging(settings.verbose);
    tracing::info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match run(&settings) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, honouring RUST_LOG when set
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(settings: &Settings) -> anyhow::Result<ExitCode> {
    profiling::scope!("track-frame::run");

    let catalog = ReferenceCatalog::from_geojson_file(&settings.refs).with_context(|| {
        format!(
            "failed to read reference axes from {}",
            settings.refs.display()
        )
    })?;
    for rejected in catalog.rejected() {
        tracing::warn!("Rejected axis '{}': {}", rejected.axis(), rejected);
    }
    if catalog.is_empty() {
        tracing::warn!("No usable reference axis in {}", settings.refs.display());
    }

    let store = TrackStore::load_dir(&settings.gpx_dir).with_context(|| {
        format!(
            "failed to load GPX tracks from {}",
            settings.gpx_dir.display()
        )
    })?;

    let sink = CsvDirectorySink::new(&settings.out_dir);
    let summary = Pipeline::new(settings.pipeline_config(), &catalog, &store)
        .run(&sink)
        .context("failed to start processing")?;

    for failure in &summary.failures {
        tracing::error!(
            "{} / {} / {}: {}",
            failure.segment,
            failure.axis,
            failure.event,
            failure.message
        );
    }
    tracing::info!(
        "{} tables written to {}, {} combinations without data, {} failed",
        summary.succeeded,
        settings.out_dir.display(),
        summary.empty,
        summary.failed
    );

    if settings.strict && (!summary.is_clean() || !catalog.rejected().is_empty()) {
        tracing::error!("Strict mode: finished with rejected axes or failed combinations");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
