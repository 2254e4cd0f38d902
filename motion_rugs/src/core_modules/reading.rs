// THEORY:
// The `reading` module defines the "dumb" data containers that flow into the
// motion rug core. A `Reading` is one mover's state at one instant; a `Frame` is
// every tracked mover at one instant, tagged with its sequence number.
//
// Key architectural principles:
// 1.  **Immutable Snapshots**: Once a Reading is admitted it is never modified. The
//     ordering and rendering stages only reorder it and annotate copies of it.
// 2.  **Typed Features**: Producers send loosely-typed records. At the boundary every
//     feature value is coerced to an `f64`: numbers pass through, numeric strings are
//     parsed, and anything else becomes NaN, which later falls into the fallback
//     color bucket instead of aborting the stream.
// 3.  **Validated at Ingestion**: `Frame::validate` is the single gate that checks a
//     frame carries every configured feature, finite positions, and the same number
//     of movers as the rest of the stream, so downstream stages never need to guard
//     against ragged data.

use crate::error::IngestError;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named scalar motion features of a single reading (e.g. `Velocity`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureMap(BTreeMap<String, f64>);

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.0.get(feature).copied()
    }

    pub fn insert(&mut self, feature: impl Into<String>, value: f64) {
        self.0.insert(feature.into(), value);
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.0.contains_key(feature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whatever a producer put in a feature slot.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFeature {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<RawFeature> for f64 {
    fn from(raw: RawFeature) -> Self {
        match raw {
            RawFeature::Number(value) => value,
            RawFeature::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
            RawFeature::Other(_) => f64::NAN,
        }
    }
}

impl<'de> Deserialize<'de> for FeatureMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawFeature>::deserialize(deserializer)?;
        Ok(FeatureMap(raw.into_iter().map(|(name, value)| (name, value.into())).collect()))
    }
}

/// One mover's state at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Latitude in degrees.
    #[serde(rename = "LatitudeGPS")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(rename = "LongitudeGPS")]
    pub longitude: f64,
    /// Every other field of the record, coerced to a number.
    #[serde(flatten)]
    pub features: FeatureMap,
}

impl Reading {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            features: FeatureMap::new(),
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>, value: f64) -> Self {
        self.features.insert(feature, value);
        self
    }

    /// The value of `feature`, or NaN when the reading does not carry it.
    pub fn feature(&self, feature: &str) -> f64 {
        self.features.get(feature).unwrap_or(f64::NAN)
    }
}

/// Every tracked mover's reading at one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The producer's sequence number for this time step.
    pub number: u64,
    pub readings: Vec<Reading>,
}

impl Frame {
    pub fn new(number: u64, readings: Vec<Reading>) -> Self {
        Self { number, readings }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Checks the frame against the configured features and, once known, the
    /// number of movers the stream tracks.
    pub fn validate(&self, features: &[String], expected_objects: Option<usize>) -> Result<(), IngestError> {
        if self.readings.is_empty() {
            return Err(IngestError::EmptyFrame { frame: self.number });
        }
        if let Some(expected) = expected_objects {
            if expected != self.readings.len() {
                return Err(IngestError::ObjectCountMismatch {
                    frame: self.number,
                    expected,
                    actual: self.readings.len(),
                });
            }
        }
        for (index, reading) in self.readings.iter().enumerate() {
            if !reading.latitude.is_finite() || !reading.longitude.is_finite() {
                return Err(IngestError::InvalidPosition { frame: self.number, index });
            }
            if let Some(missing) = features.iter().find(|f| !reading.features.contains(f)) {
                return Err(IngestError::MissingFeature {
                    frame: self.number,
                    index,
                    feature: missing.clone(),
                });
            }
        }
        Ok(())
    }
}
