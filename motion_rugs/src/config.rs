// THEORY:
// `RugConfig` is the static configuration read once at startup: which curves to
// order by, which features to paint, how often to redraw, how wide the window
// starts, and which ten colors the decile buckets map to. Every field has the
// default the host application ships with, so an empty JSON object is a valid
// configuration.
//
// The window width is the only parameter that also changes at runtime; inbound
// messages carry a target width that overrides it (see `RugProcessor::handle`).

use crate::core_modules::curve::Strategy;
use crate::core_modules::quantizer::{ColorPalette, DEFAULT_PALETTE};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// How far ahead of the expected frame an early arrival may be buffered by default.
pub const DEFAULT_MAX_PENDING_AHEAD: u64 = 4096;

/// Configuration for the RugProcessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RugConfig {
    /// Curves to order movers by. Results are emitted in this order.
    pub strategies: Vec<Strategy>,
    /// Features to quantize and paint. Results are emitted in this order within a strategy.
    pub features: Vec<String>,
    /// Number of released frames between redraws.
    pub redraw_interval: usize,
    /// Initial window width in columns (frames).
    pub pixel_max_width: usize,
    /// Ten `#RRGGBB` colors, lowest bucket first.
    pub palette: Vec<String>,
    /// How far ahead of the expected frame number an early frame may be buffered.
    /// `null` disables the bound.
    pub max_pending_ahead: Option<u64>,
}

impl Default for RugConfig {
    fn default() -> Self {
        Self {
            strategies: vec![Strategy::Hilbert],
            features: vec!["Velocity".to_string()],
            redraw_interval: 1,
            pixel_max_width: 2000,
            palette: DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect(),
            max_pending_ahead: Some(DEFAULT_MAX_PENDING_AHEAD),
        }
    }
}

impl RugConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RugConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        if self.features.is_empty() {
            return Err(ConfigError::NoFeatures);
        }
        let mut seen = HashSet::new();
        if let Some(strategy) = self.strategies.iter().find(|s| !seen.insert(**s)) {
            return Err(ConfigError::Duplicate(strategy.to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(feature) = self.features.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(ConfigError::Duplicate(feature.clone()));
        }
        if self.redraw_interval == 0 {
            return Err(ConfigError::ZeroRedrawInterval);
        }
        if self.pixel_max_width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        self.color_palette().map(|_| ())
    }

    /// The parsed palette.
    pub fn color_palette(&self) -> Result<ColorPalette, ConfigError> {
        ColorPalette::from_hex(self.palette.as_slice())
    }
}
