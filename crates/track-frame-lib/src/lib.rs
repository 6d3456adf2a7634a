//! Track Frame Library - Event-relative local frames for GPS tracks
//!
//! This library converts raw GPS track recordings into a local Cartesian frame anchored on a
//! reference axis (a start/finish line, a corridor centerline) and restricted to named time
//! windows. Every (track segment, axis, event) combination with overlapping data becomes a
//! sequence of `(x, y, t)` samples: meters along/across the axis and seconds since the event
//! start.
//!
//! # Architecture
//!
//! - **[`ReferenceCatalog`]**: Validated reference axes with their named event intervals
//! - **[`TrackStore`]**: Deterministically ordered GPX track segments with sanitized identities
//! - **[`slicer`]**: Inclusive time-window filtering with interval-relative timestamps
//! - **[`AxisFrame`]**: Geodesic azimuth, degenerate-case policy and oblique Mercator reprojection
//! - **[`Pipeline`]**: Runs every (segment, axis, event) triple in isolation, optionally in
//!   parallel
//! - **[`ArtifactSink`]**: Output boundary, with a CSV directory implementation
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use track_frame_lib::{Config, CsvDirectorySink, Pipeline, ReferenceCatalog, TrackStore};
//!
//! # fn main() -> track_frame_lib::Result<()> {
//! let catalog = ReferenceCatalog::from_geojson_file("refs.geojson")?;
//! let store = TrackStore::load_dir("gpx/")?;
//! let sink = CsvDirectorySink::new("out/");
//!
//! let summary = Pipeline::new(Config::default(), &catalog, &store).run(&sink)?;
//! println!("{} written, {} empty, {} failed", summary.succeeded, summary.empty, summary.failed);
//! # Ok(())
//! # }
//! ```

mod catalog;
pub mod geodesic;
pub mod interval;
pub mod omerc;
mod output;
mod pipeline;
mod point;
mod reproject;
pub mod slicer;
mod track;
pub mod utils;

// Public API exports
pub use catalog::{ConfigError, ReferenceAxis, ReferenceCatalog};
pub use interval::{EventInterval, IntervalError};
pub use output::{ArtifactSink, CollectingSink, CsvDirectorySink};
pub use pipeline::{Artifact, Config, Pipeline, RunSummary, Triple, TripleFailure};
pub use point::{GeoPoint, LocalSample, Sample};
pub use reproject::{AxisFrame, AzimuthCase, UnsupportedGeometry, reproject};
pub use slicer::TimeSlice;
pub use track::{StoreError, TrackSegment, TrackStore};

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Track store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid interval {0}")]
    Interval(#[from] IntervalError),

    #[error("Unsupported geometry for axis '{axis}': {reason}")]
    UnsupportedGeometry {
        axis: String,
        reason: UnsupportedGeometry,
    },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
