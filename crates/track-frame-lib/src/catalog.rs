//! Reference axes and their named event intervals
//!
//! A [`ReferenceCatalog`] is built either from explicit [`ReferenceAxis`] values, which are
//! validated strictly, or from a GeoJSON FeatureCollection, which is read leniently: entries that
//! do not describe an axis are skipped and invalid axes are set aside in
//! [`ReferenceCatalog::rejected`].

use crate::{EventInterval, GeoPoint, Result, interval, utils};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

/// Configuration errors, always naming the offending axis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("axis '{axis}' has identical endpoints")]
    DegenerateAxis { axis: String },

    #[error("axis '{axis}': event '{event}' ends before it starts")]
    InvertedInterval { axis: String, event: String },

    #[error("axis '{axis}': coordinate ({latitude}, {longitude}) is out of range")]
    InvalidCoordinate {
        axis: String,
        latitude: f64,
        longitude: f64,
    },

    #[error("axis '{axis}': event '{event}' is already defined by axis '{existing}'")]
    DuplicateEvent {
        axis: String,
        event: String,
        existing: String,
    },
}

impl ConfigError {
    /// Name of the axis the error refers to
    pub fn axis(&self) -> &str {
        match self {
            Self::DegenerateAxis { axis }
            | Self::InvertedInterval { axis, .. }
            | Self::InvalidCoordinate { axis, .. }
            | Self::DuplicateEvent { axis, .. } => axis,
        }
    }
}

/// A two-point reference axis with its named time windows
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceAxis {
    name: String,
    endpoint_a: GeoPoint,
    endpoint_b: GeoPoint,
    events: BTreeMap<String, EventInterval>,
}

impl ReferenceAxis {
    /// Create an axis from `endpoint_a` towards `endpoint_b`, without events
    pub fn new(name: impl Into<String>, endpoint_a: GeoPoint, endpoint_b: GeoPoint) -> Self {
        Self {
            name: name.into(),
            endpoint_a,
            endpoint_b,
            events: BTreeMap::new(),
        }
    }

    /// Add (or replace) a named event
    pub fn with_event(mut self, name: impl Into<String>, interval: EventInterval) -> Self {
        self.events.insert(name.into(), interval);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Origin of the local frame
    #[inline]
    pub fn endpoint_a(&self) -> GeoPoint {
        self.endpoint_a
    }

    /// Point giving the direction of the y axis
    #[inline]
    pub fn endpoint_b(&self) -> GeoPoint {
        self.endpoint_b
    }

    /// Events sorted by name
    #[inline]
    pub fn events(&self) -> &BTreeMap<String, EventInterval> {
        &self.events
    }

    /// Check the axis invariants, returning the first violation
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for endpoint in [self.endpoint_a, self.endpoint_b] {
            if !endpoint.is_valid() {
                return Err(ConfigError::InvalidCoordinate {
                    axis: self.name.clone(),
                    latitude: endpoint.latitude,
                    longitude: endpoint.longitude,
                });
            }
        }
        if self.endpoint_a == self.endpoint_b {
            return Err(ConfigError::DegenerateAxis {
                axis: self.name.clone(),
            });
        }
        if let Some((event, _)) = self.events.iter().find(|(_, interval)| !interval.is_ordered()) {
            return Err(ConfigError::InvertedInterval {
                axis: self.name.clone(),
                event: event.clone(),
            });
        }
        Ok(())
    }
}

/// Validated set of reference axes
#[derive(Clone, Debug, Default)]
pub struct ReferenceCatalog {
    axes: Vec<ReferenceAxis>,
    rejected: Vec<ConfigError>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Value>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ReferenceCatalog {
    /// Build a catalog, failing on the first invalid axis
    ///
    /// Event names must be unique across the whole catalog since they name the output groups.
    pub fn new(axes: Vec<ReferenceAxis>) -> std::result::Result<Self, ConfigError> {
        let mut owners: HashMap<String, String> = HashMap::new();
        for axis in &axes {
            Self::check_axis(axis, &owners)?;
            Self::claim_events(axis, &mut owners);
        }
        Ok(Self {
            axes,
            rejected: Vec::new(),
        })
    }

    /// Parse a GeoJSON FeatureCollection
    ///
    /// Each `Feature` with a `LineString` geometry becomes an axis from its first to its last
    /// position, named after the feature `id` (or `feature{index}`). Each property holding an
    /// ISO 8601 interval becomes an event. Only a document that is not a FeatureCollection is an
    /// error; everything else is skipped or rejected per axis.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(text)?;
        Ok(Self::from_features(collection.features))
    }

    pub fn from_geojson_reader<R: Read>(reader: R) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_reader(reader)?;
        Ok(Self::from_features(collection.features))
    }

    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("catalog::from_geojson_file");

        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let catalog = Self::from_geojson_reader(std::io::BufReader::new(file))?;
        tracing::info!(
            "Loaded {} reference axes with {} events from {}",
            catalog.axes.len(),
            catalog.event_count(),
            path.display()
        );
        Ok(catalog)
    }

    fn from_features(features: Vec<Value>) -> Self {
        let mut catalog = Self::default();
        let mut owners: HashMap<String, String> = HashMap::new();

        for (index, value) in features.into_iter().enumerate() {
            let Some(axis) = Self::axis_from_feature(index, value) else {
                continue;
            };
            match Self::check_axis(&axis, &owners) {
                Ok(()) => {
                    Self::claim_events(&axis, &mut owners);
                    catalog.axes.push(axis);
                }
                Err(err) => {
                    tracing::error!("Rejecting reference axis: {}", err);
                    catalog.rejected.push(err);
                }
            }
        }

        catalog
    }

    /// Read one feature, `None` if it does not describe an axis with events
    fn axis_from_feature(index: usize, value: Value) -> Option<ReferenceAxis> {
        let feature: Feature = match serde_json::from_value(value) {
            Ok(feature) => feature,
            Err(err) => {
                tracing::debug!("Skipping entry {}: {}", index, err);
                return None;
            }
        };
        if feature.kind != "Feature" {
            tracing::debug!("Skipping entry {} of type '{}'", index, feature.kind);
            return None;
        }

        let name = match &feature.id {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => format!("feature{index}"),
        };

        let Some(geometry) = feature.geometry else {
            tracing::debug!("Skipping feature '{}' without geometry", name);
            return None;
        };
        if geometry.kind != "LineString" {
            tracing::debug!(
                "Skipping feature '{}' with {} geometry",
                name,
                geometry.kind
            );
            return None;
        }
        let Some((endpoint_a, endpoint_b)) = line_endpoints(&geometry.coordinates) else {
            tracing::debug!("Skipping feature '{}': LineString needs two positions", name);
            return None;
        };

        let Some(properties) = feature.properties else {
            tracing::debug!("Skipping feature '{}' without properties", name);
            return None;
        };

        let mut axis = ReferenceAxis::new(name, endpoint_a, endpoint_b);
        for (key, value) in properties {
            let Value::String(text) = value else {
                tracing::debug!(
                    "Axis '{}': property '{}' is not an interval",
                    axis.name,
                    key
                );
                continue;
            };
            match interval::parse_interval(&text) {
                Ok(interval) => axis = axis.with_event(key, interval),
                Err(err) => {
                    tracing::warn!("Axis '{}': skipping property '{}': {}", axis.name, key, err)
                }
            }
        }

        if axis.events.is_empty() {
            tracing::debug!("Skipping axis '{}' without events", axis.name);
            return None;
        }
        Some(axis)
    }

    /// Event names must stay distinct once sanitized, since they become output directory names
    fn check_axis(
        axis: &ReferenceAxis,
        owners: &HashMap<String, String>,
    ) -> std::result::Result<(), ConfigError> {
        axis.validate()?;
        let mut local = HashMap::new();
        for event in axis.events.keys() {
            let key = utils::sanitize(event);
            if let Some(existing) = owners.get(&key) {
                return Err(ConfigError::DuplicateEvent {
                    axis: axis.name.clone(),
                    event: event.clone(),
                    existing: existing.clone(),
                });
            }
            if local.insert(key, event).is_some() {
                return Err(ConfigError::DuplicateEvent {
                    axis: axis.name.clone(),
                    event: event.clone(),
                    existing: axis.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn claim_events(axis: &ReferenceAxis, owners: &mut HashMap<String, String>) {
        for event in axis.events.keys() {
            owners.insert(utils::sanitize(event), axis.name.clone());
        }
    }

    /// Valid axes in source order
    #[inline]
    pub fn axes(&self) -> &[ReferenceAxis] {
        &self.axes
    }

    /// Axes dropped while reading a GeoJSON document
    #[inline]
    pub fn rejected(&self) -> &[ConfigError] {
        &self.rejected
    }

    /// Iterate `(axis, event name, interval)` in catalog order
    pub fn events(&self) -> impl Iterator<Item = (&ReferenceAxis, &str, &EventInterval)> {
        self.axes.iter().flat_map(|axis| {
            axis.events
                .iter()
                .map(move |(name, interval)| (axis, name.as_str(), interval))
        })
    }

    pub fn event_count(&self) -> usize {
        self.axes.iter().map(|axis| axis.events.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

/// First and last positions of a LineString (GeoJSON positions are `[longitude, latitude, ..]`)
fn line_endpoints(coordinates: &Value) -> Option<(GeoPoint, GeoPoint)> {
    let positions = coordinates.as_array()?;
    if positions.len() < 2 {
        return None;
    }
    let position = |value: &Value| -> Option<GeoPoint> {
        let pair = value.as_array()?;
        let longitude = pair.first()?.as_f64()?;
        let latitude = pair.get(1)?.as_f64()?;
        Some(GeoPoint::new(latitude, longitude))
    };
    Some((position(positions.first()?)?, position(positions.last()?)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameError;
    use chrono::{TimeZone, Utc};

    fn create_test_interval(start_hour: u32, end_hour: u32) -> EventInterval {
        EventInterval::new(
            Utc.with_ymd_and_hms(2020, 6, 1, start_hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 6, 1, end_hour, 0, 0).unwrap(),
        )
    }

    fn create_test_axis(name: &str) -> ReferenceAxis {
        ReferenceAxis::new(name, GeoPoint::new(45.0, 10.0), GeoPoint::new(45.01, 10.0141))
    }

    const TEST_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "finish",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[10.0, 45.0], [10.005, 45.005], [10.0141, 45.01]]
                },
                "properties": {
                    "race": "2020-06-01T10:00:00Z/2020-06-01T11:00:00Z",
                    "warmup": "2020-06-01T09:00:00Z/PT30M",
                    "note": "not an interval",
                    "laps": 3
                }
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [10.0, 45.0]},
                "properties": {"other": "2020-06-01T10:00:00Z/2020-06-01T11:00:00Z"}
            },
            {
                "type": "Feature",
                "id": 7,
                "geometry": {"type": "LineString", "coordinates": [[11.0, 46.0], [11.0, 46.0]]},
                "properties": {"zero": "2020-06-01T10:00:00Z/2020-06-01T11:00:00Z"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[12.0, 47.0], [12.01, 47.01]]}
            },
            {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[12.0, 47.0], [12.01, 47.01]]},
                "properties": {"sprint": "P1D/2020-06-03"}
            },
            {"type": "Something"}
        ]
    }"#;

    #[test]
    fn test_new_accepts_valid_axes() {
        let catalog = ReferenceCatalog::new(vec![
            create_test_axis("a").with_event("race", create_test_interval(10, 11)),
            create_test_axis("b").with_event("practice", create_test_interval(8, 9)),
        ])
        .unwrap();
        assert_eq!(catalog.axes().len(), 2);
        assert_eq!(catalog.event_count(), 2);
        assert!(catalog.rejected().is_empty());
    }

    #[test]
    fn test_new_rejects_degenerate_axis() {
        let point = GeoPoint::new(45.0, 10.0);
        let err =
            ReferenceCatalog::new(vec![ReferenceAxis::new("zero", point, point)]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DegenerateAxis {
                axis: "zero".to_string()
            }
        );
        assert_eq!(err.axis(), "zero");
    }

    #[test]
    fn test_new_rejects_inverted_interval() {
        let axis = create_test_axis("finish").with_event("race", create_test_interval(11, 10));
        let err = ReferenceCatalog::new(vec![axis]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvertedInterval {
                axis: "finish".to_string(),
                event: "race".to_string()
            }
        );
    }

    #[test]
    fn test_new_rejects_invalid_coordinate() {
        let axis = ReferenceAxis::new("bad", GeoPoint::new(95.0, 10.0), GeoPoint::new(45.0, 10.0));
        let err = ReferenceCatalog::new(vec![axis]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCoordinate { .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_new_rejects_duplicate_event_names() {
        let err = ReferenceCatalog::new(vec![
            create_test_axis("a").with_event("race", create_test_interval(10, 11)),
            create_test_axis("b").with_event("race", create_test_interval(12, 13)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateEvent {
                axis: "b".to_string(),
                event: "race".to_string(),
                existing: "a".to_string()
            }
        );
    }

    #[test]
    fn test_single_point_interval_is_valid() {
        let axis = create_test_axis("a").with_event("instant", create_test_interval(10, 10));
        assert!(ReferenceCatalog::new(vec![axis]).is_ok());
    }

    #[test]
    fn test_from_geojson() {
        let catalog = ReferenceCatalog::from_geojson_str(TEST_GEOJSON).unwrap();

        let names: Vec<&str> = catalog.axes().iter().map(|axis| axis.name()).collect();
        assert_eq!(names, vec!["finish", "feature4"]);

        let finish = &catalog.axes()[0];
        assert_eq!(finish.endpoint_a(), GeoPoint::new(45.0, 10.0));
        assert_eq!(finish.endpoint_b(), GeoPoint::new(45.01, 10.0141));
        let events: Vec<&str> = finish.events().keys().map(String::as_str).collect();
        assert_eq!(events, vec!["race", "warmup"]);
        assert_eq!(
            finish.events()["warmup"].end(),
            Utc.with_ymd_and_hms(2020, 6, 1, 9, 30, 0).unwrap()
        );

        let sprint = &catalog.axes()[1].events()["sprint"];
        assert_eq!(
            sprint.start(),
            Utc.with_ymd_and_hms(2020, 6, 2, 0, 0, 0).unwrap()
        );

        // The zero-length axis with numeric id is rejected, not fatal
        assert_eq!(catalog.rejected().len(), 1);
        assert_eq!(catalog.rejected()[0].axis(), "7");
    }

    #[test]
    fn test_new_rejects_events_colliding_after_sanitizing() {
        let err = ReferenceCatalog::new(vec![
            create_test_axis("a").with_event("heat 1", create_test_interval(10, 11)),
            create_test_axis("b").with_event("heat.1", create_test_interval(12, 13)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateEvent {
                axis: "b".to_string(),
                event: "heat.1".to_string(),
                existing: "a".to_string()
            }
        );

        // Same clash inside a single axis
        let err = ReferenceCatalog::new(vec![
            create_test_axis("a")
                .with_event("heat/1", create_test_interval(10, 11))
                .with_event("heat 1", create_test_interval(12, 13)),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEvent { ref existing, .. } if existing == "a"));

        let catalog = ReferenceCatalog::new(vec![
            create_test_axis("a").with_event("heat 1", create_test_interval(10, 11)),
            create_test_axis("b").with_event("heat 2", create_test_interval(12, 13)),
        ])
        .unwrap();
        assert_eq!(catalog.event_count(), 2);
    }

    #[test]
    fn test_from_geojson_duplicate_event_rejects_later_axis() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "id": "a",
             "geometry": {"type": "LineString", "coordinates": [[10.0, 45.0], [10.01, 45.01]]},
             "properties": {"race": "2020-06-01T10:00:00Z/2020-06-01T11:00:00Z"}},
            {"type": "Feature", "id": "b",
             "geometry": {"type": "LineString", "coordinates": [[11.0, 46.0], [11.01, 46.01]]},
             "properties": {"race": "2020-06-01T12:00:00Z/2020-06-01T13:00:00Z"}}
        ]}"#;
        let catalog = ReferenceCatalog::from_geojson_str(text).unwrap();
        assert_eq!(catalog.axes().len(), 1);
        assert_eq!(catalog.axes()[0].name(), "a");
        assert!(matches!(
            catalog.rejected()[0],
            ConfigError::DuplicateEvent { .. }
        ));
    }

    #[test]
    fn test_from_geojson_structural_errors() {
        assert!(matches!(
            ReferenceCatalog::from_geojson_str("not json"),
            Err(FrameError::Json(_))
        ));
        assert!(matches!(
            ReferenceCatalog::from_geojson_str(r#"{"type": "FeatureCollection"}"#),
            Err(FrameError::Json(_))
        ));
        assert!(matches!(
            ReferenceCatalog::from_geojson_file("/nonexistent/refs.geojson"),
            Err(FrameError::Io(_))
        ));
    }

    #[test]
    fn test_from_geojson_empty_collection() {
        let catalog =
            ReferenceCatalog::from_geojson_str(r#"{"type": "FeatureCollection", "features": []}"#)
                .unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.events().count(), 0);
    }

    #[test]
    fn test_events_iteration_order() {
        let catalog = ReferenceCatalog::new(vec![
            create_test_axis("b")
                .with_event("z-final", create_test_interval(10, 11))
                .with_event("a-heat", create_test_interval(8, 9)),
            create_test_axis("a").with_event("m-practice", create_test_interval(6, 7)),
        ])
        .unwrap();
        let order: Vec<(&str, &str)> = catalog
            .events()
            .map(|(axis, event, _)| (axis.name(), event))
            .collect();
        assert_eq!(
            order,
            vec![("b", "a-heat"), ("b", "z-final"), ("a", "m-practice")]
        );
    }
}
