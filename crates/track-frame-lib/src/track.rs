//! Track segments parsed from GPX files
//!
//! Every `<trkseg>` of every `<trk>` becomes one [`TrackSegment`] identified as
//! `{source}-{track}-segment{j}`. The [`TrackStore`] keeps segments sorted by identity so the
//! processing order never depends on filesystem enumeration.

use crate::{GeoPoint, Result, Sample, utils};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Errors raised while assembling a track store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate segment identity '{0}'")]
    DuplicateIdentity(String),
}

/// An ordered run of timestamped samples with a stable identity
#[derive(Clone, Debug, PartialEq)]
pub struct TrackSegment {
    identity: String,
    samples: Vec<Sample>,
}

impl TrackSegment {
    pub fn new(identity: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            identity: identity.into(),
            samples,
        }
    }

    /// Sanitized `{source}-{track}-segment{j}` name
    #[inline]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Samples in recording order
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when timestamps never decrease
    pub fn is_monotonic(&self) -> bool {
        self.samples
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}

/// Read-only collection of track segments, sorted by identity
#[derive(Clone, Debug, Default)]
pub struct TrackStore {
    segments: Vec<TrackSegment>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TrackStore {
    /// Build a store, rejecting duplicate identities
    pub fn new(mut segments: Vec<TrackSegment>) -> Result<Self> {
        segments.sort_by(|a, b| a.identity.cmp(&b.identity));
        if let Some(pair) = segments
            .windows(2)
            .find(|pair| pair[0].identity == pair[1].identity)
        {
            return Err(StoreError::DuplicateIdentity(pair[0].identity.clone()).into());
        }
        Ok(Self { segments })
    }

    /// Build a store from a single parsed GPX document
    pub fn from_gpx(source: &str, gpx: &gpx::Gpx) -> Result<Self> {
        Self::new(segments_from_gpx(source, gpx))
    }

    /// Load GPX files in parallel
    ///
    /// The source name of each file is its sanitized stem. Identities that still collide across
    /// files get a numeric suffix, the first file in path order keeping the plain name. A file
    /// that cannot be opened or parsed aborts the whole load.
    pub fn load_files<P: AsRef<Path> + Send + Sync>(paths: Vec<P>) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("track::load_files");

        let per_file: Result<Vec<Vec<TrackSegment>>> = paths
            .into_par_iter()
            .map(|path| {
                let path = path.as_ref();
                let file = std::fs::File::open(path).map_err(|err| {
                    tracing::error!("Cannot open {}: {}", path.display(), err);
                    err
                })?;
                let reader = std::io::BufReader::new(file);
                let gpx = gpx::read(reader).map_err(|err| {
                    tracing::error!("Cannot parse {}: {}", path.display(), err);
                    err
                })?;
                let source = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(segments_from_gpx(&source, &gpx))
            })
            .collect();

        let mut segments: Vec<TrackSegment> = per_file?.into_iter().flatten().collect();
        disambiguate(&mut segments);
        let store = Self::new(segments)?;
        tracing::info!(
            "Loaded {} track segments with {} samples",
            store.segments.len(),
            store.total_samples()
        );
        Ok(store)
    }

    /// Load every `.gpx` file directly inside `dir`
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let paths = discover_gpx_files(dir.as_ref())?;
        tracing::info!(
            "Found {} GPX files in {}",
            paths.len(),
            dir.as_ref().display()
        );
        Self::load_files(paths)
    }

    #[inline]
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// Look up a segment by identity
    pub fn get(&self, identity: &str) -> Option<&TrackSegment> {
        self.segments
            .binary_search_by(|segment| segment.identity.as_str().cmp(identity))
            .ok()
            .map(|index| &self.segments[index])
    }

    pub fn total_samples(&self) -> usize {
        self.segments.iter().map(TrackSegment::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Rename repeated identities to `{identity}-{n}`, keeping the first occurrence
fn disambiguate(segments: &mut [TrackSegment]) {
    let mut taken: HashSet<String> = segments.iter().map(|s| s.identity.clone()).collect();
    let mut seen = HashSet::new();
    for segment in segments.iter_mut() {
        if seen.insert(segment.identity.clone()) {
            continue;
        }
        let mut n = 1;
        let renamed = loop {
            let candidate = format!("{}-{n}", segment.identity);
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        tracing::warn!(
            "Segment identity '{}' is used by several files, renaming to '{}'",
            segment.identity,
            renamed
        );
        taken.insert(renamed.clone());
        seen.insert(renamed.clone());
        segment.identity = renamed;
    }
}

/// Regular `.gpx` files directly inside `dir`, sorted by path
pub fn discover_gpx_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_gpx = path.extension().is_some_and(|ext| ext == "gpx");
        if is_gpx && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Split a GPX document into segments named after `source`
pub fn segments_from_gpx(source: &str, gpx: &gpx::Gpx) -> Vec<TrackSegment> {
    let source = utils::sanitize(source);
    let mut labels = HashSet::new();
    let mut segments = Vec::new();

    for (i, track) in gpx.tracks.iter().enumerate() {
        let mut label = match track.name.as_deref() {
            Some(name) if !name.is_empty() => utils::sanitize(name),
            _ => format!("track{i}"),
        };
        if !labels.insert(label.clone()) {
            label = format!("{label}-{i}");
            labels.insert(label.clone());
        }

        for (j, segment) in track.segments.iter().enumerate() {
            let identity = format!("{source}-{label}-segment{j}");
            let samples = samples_from_points(&identity, &segment.points);
            let segment = TrackSegment::new(identity, samples);
            if !segment.is_monotonic() {
                tracing::debug!(
                    "Segment '{}' has non-monotonic timestamps",
                    segment.identity
                );
            }
            segments.push(segment);
        }
    }

    segments
}

fn samples_from_points(identity: &str, points: &[gpx::Waypoint]) -> Vec<Sample> {
    let mut untimed = 0usize;
    let samples: Vec<Sample> = points
        .iter()
        .enumerate()
        .filter_map(|(index, waypoint)| {
            let Some(timestamp) = waypoint_time(waypoint) else {
                untimed += 1;
                return None;
            };
            Some(Sample::new(
                GeoPoint::from(waypoint.point()),
                utils::to_epoch_seconds(&timestamp),
                index,
            ))
        })
        .collect();

    if untimed > 0 {
        tracing::warn!(
            "Segment '{}': skipped {} of {} points without a usable timestamp",
            identity,
            untimed,
            points.len()
        );
    }
    samples
}

fn waypoint_time(waypoint: &gpx::Waypoint) -> Option<DateTime<Utc>> {
    let text = waypoint.time.as_ref()?.format().ok()?;
    DateTime::parse_from_rfc3339(&text)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}
