//! Pipeline - Runs every (segment, axis, event) combination through slicing and reprojection
//!
//! Each combination is an isolated unit of work: an unsupported axis or a failing sink only
//! fails the combinations it touches, and the [`RunSummary`] reports them alongside the
//! successful and empty ones.

use crate::{
    ArtifactSink, AxisFrame, EventInterval, LocalSample, ReferenceAxis, ReferenceCatalog, Result,
    TrackSegment, TrackStore, slicer,
};
use rayon::prelude::*;

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct Config {
    /// Process combinations on the rayon thread pool (default: true)
    pub parallel: bool,
    /// Size of a dedicated thread pool. `None` uses the global pool.
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Local samples of one segment during one event, ready for output
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub event: String,
    pub axis: String,
    pub segment: String,
    pub samples: Vec<LocalSample>,
}

/// A combination that could not be processed
#[derive(Debug, Clone, PartialEq)]
pub struct TripleFailure {
    pub segment: String,
    pub axis: String,
    pub event: String,
    pub message: String,
}

/// Outcome counts of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Combinations that produced an artifact
    pub succeeded: usize,
    /// Combinations without samples in the event window
    pub empty: usize,
    /// Combinations that failed
    pub failed: usize,
    /// Details of the failures, in processing order
    pub failures: Vec<TripleFailure>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.empty + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// One unit of work
#[derive(Debug, Clone, Copy)]
pub struct Triple<'a> {
    pub segment: &'a TrackSegment,
    pub axis: &'a ReferenceAxis,
    pub event: &'a str,
    pub interval: &'a EventInterval,
    frame: &'a AxisFrame,
}

enum Outcome {
    Written,
    Empty,
    Failed(TripleFailure),
}

/// Slices and reprojects a track store against a reference catalog
pub struct Pipeline<'a> {
    config: Config,
    catalog: &'a ReferenceCatalog,
    store: &'a TrackStore,
    /// One frame per catalog axis, same order
    frames: Vec<AxisFrame>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> Pipeline<'a> {
    /// Create a pipeline, computing each axis frame once
    pub fn new(config: Config, catalog: &'a ReferenceCatalog, store: &'a TrackStore) -> Self {
        let frames = catalog.axes().iter().map(AxisFrame::new).collect();
        Self {
            config,
            catalog,
            store,
            frames,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Frames in catalog order
    #[inline]
    pub fn frames(&self) -> &[AxisFrame] {
        &self.frames
    }

    /// All combinations, segments outermost, then axes in catalog order, then events by name
    pub fn triples(&self) -> Vec<Triple<'_>> {
        let capacity = self.store.segments().len() * self.catalog.event_count();
        let mut triples = Vec::with_capacity(capacity);
        for segment in self.store.segments() {
            for (axis, frame) in self.catalog.axes().iter().zip(&self.frames) {
                for (event, interval) in axis.events() {
                    triples.push(Triple {
                        segment,
                        axis,
                        event,
                        interval,
                        frame,
                    });
                }
            }
        }
        triples
    }

    /// Slice and reproject one combination
    ///
    /// Returns `Ok(None)` when no sample falls inside the event window.
    pub fn process(&self, triple: &Triple<'_>) -> Result<Option<Artifact>> {
        let slice = slicer::slice_event(triple.segment, triple.interval);
        if slice.is_empty() {
            return Ok(None);
        }

        let (xs, ys) = triple.frame.reproject(&slice.points)?;
        let samples = xs
            .into_iter()
            .zip(ys)
            .zip(slice.times)
            .map(|((x, y), t)| LocalSample { x, y, t })
            .collect();

        Ok(Some(Artifact {
            event: triple.event.to_string(),
            axis: triple.axis.name().to_string(),
            segment: triple.segment.identity().to_string(),
            samples,
        }))
    }

    /// Process every combination and hand the artifacts to `sink`
    ///
    /// Only a failure to set up the thread pool is returned as an error; per-combination
    /// failures are collected in the summary.
    pub fn run(&self, sink: &dyn ArtifactSink) -> Result<RunSummary> {
        #[cfg(feature = "profiling")]
        profiling::scope!("pipeline::run");

        let triples = self.triples();
        tracing::info!(
            "Processing {} combinations ({} segments, {} events)",
            triples.len(),
            self.store.segments().len(),
            self.catalog.event_count()
        );

        let outcomes: Vec<Outcome> = if self.config.parallel {
            match self.config.threads {
                Some(threads) => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()?;
                    pool.install(|| {
                        triples
                            .par_iter()
                            .map(|triple| self.execute(triple, sink))
                            .collect()
                    })
                }
                None => triples
                    .par_iter()
                    .map(|triple| self.execute(triple, sink))
                    .collect(),
            }
        } else {
            triples
                .iter()
                .map(|triple| self.execute(triple, sink))
                .collect()
        };

        let mut summary = RunSummary::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Written => summary.succeeded += 1,
                Outcome::Empty => summary.empty += 1,
                Outcome::Failed(failure) => {
                    summary.failed += 1;
                    summary.failures.push(failure);
                }
            }
        }

        tracing::info!(
            "Run finished: {} written, {} empty, {} failed",
            summary.succeeded,
            summary.empty,
            summary.failed
        );
        Ok(summary)
    }

    fn execute(&self, triple: &Triple<'_>, sink: &dyn ArtifactSink) -> Outcome {
        let result = self.process(triple).and_then(|artifact| match artifact {
            Some(artifact) => sink.write(&artifact).map(|()| true),
            None => Ok(false),
        });

        match result {
            Ok(true) => Outcome::Written,
            Ok(false) => {
                tracing::debug!(
                    "No samples of '{}' during '{}'",
                    triple.segment.identity(),
                    triple.event
                );
                Outcome::Empty
            }
            Err(err) => {
                tracing::warn!(
                    "Failed '{}' on axis '{}' during '{}': {}",
                    triple.segment.identity(),
                    triple.axis.name(),
                    triple.event,
                    err
                );
                Outcome::Failed(TripleFailure {
                    segment: triple.segment.identity().to_string(),
                    axis: triple.axis.name().to_string(),
                    event: triple.event.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }
}
