// THEORY:
// The `quantizer` turns raw feature values into one of ten color buckets. It is a
// two-step process that runs on every redraw:
//
// 1.  **Decile Computation**: every value of a feature across the whole window is
//     pooled, sorted, and sampled at the 10th, 20th, ..., 90th percentile. The
//     sample index is `floor(i / 10 * len)` in floating point, exactly as the
//     producing system computes it, so `0.7 * 350` lands on 244, not 245. These
//     nine thresholds are recomputed from scratch on every redraw so a rug is always
//     colored against the data it actually shows.
// 2.  **Classification**: a value is placed in bucket `i` when it lies in
//     `(decile[i], decile[i + 1]]` for `i` in 1..=8. Everything else, values at or
//     below the first decile, above the ninth, or NaN, falls through to the last
//     bucket. The lowest bucket is therefore never produced; the producing system
//     behaves this way and rugs rendered here must match its colors.

use crate::core_modules::orderer::OrderedWindow;
use crate::error::ConfigError;
use image::Rgb;
use serde::Serialize;

/// Number of color buckets, and so the number of palette entries.
pub const BUCKETS: usize = 10;

/// Diverging blue-to-red palette the host application ships with.
pub const DEFAULT_PALETTE: [&str; BUCKETS] = [
    "#313695", "#4575B4", "#74ADD1", "#ABD9E9", "#E0F3F8",
    "#FEE090", "#FDAE61", "#F46D43", "#D73027", "#A50026",
];

/// Nine ascending thresholds splitting a feature's pooled values into ten buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deciles {
    /// `thresholds[k]` is decile `k + 1`, i.e. the `(k + 1) * 10`th percentile.
    thresholds: [f64; BUCKETS - 1],
}

impl Deciles {
    /// Computes the deciles of `values`. With no values every threshold is NaN and
    /// every classification falls through to the last bucket.
    pub fn from_values(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        let mut thresholds = [f64::NAN; BUCKETS - 1];
        if let Some(&last) = values.last() {
            for (k, threshold) in thresholds.iter_mut().enumerate() {
                let index = ((k + 1) as f64 / 10.0 * values.len() as f64).floor() as usize;
                *threshold = values.get(index).copied().unwrap_or(last);
            }
        }
        Self { thresholds }
    }

    /// Decile `i` for `i` in 1..=9.
    pub fn decile(&self, i: usize) -> Option<f64> {
        i.checked_sub(1).and_then(|k| self.thresholds.get(k)).copied()
    }

    pub fn thresholds(&self) -> &[f64; BUCKETS - 1] {
        &self.thresholds
    }

    /// Bucket index of `value`, always in `0..BUCKETS`.
    pub fn classify(&self, value: f64) -> usize {
        self.thresholds
            .windows(2)
            .position(|range| value > range[0] && value <= range[1])
            .map(|k| k + 1)
            .unwrap_or(BUCKETS - 1)
    }
}

/// Every value of `feature` across the given ordered windows.
///
/// Pooling every strategy's window repeats each reading once per strategy. The
/// repetition scales every count equally, so the deciles do not depend on how
/// many strategies are configured.
pub fn pool_feature_values<'a>(windows: impl IntoIterator<Item = &'a OrderedWindow>, feature: &str) -> Vec<f64> {
    windows
        .into_iter()
        .flatten()
        .flat_map(|frame| frame.readings.iter())
        .map(|ranked| ranked.reading.feature(feature))
        .collect()
}

/// The fixed, ordered set of colors the buckets map onto.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    colors: [Rgb<u8>; BUCKETS],
}

impl ColorPalette {
    /// Builds a palette from ten `#RRGGBB` strings.
    pub fn from_hex<S: AsRef<str>>(entries: &[S]) -> Result<Self, ConfigError> {
        if entries.len() != BUCKETS {
            return Err(ConfigError::PaletteLength {
                expected: BUCKETS,
                actual: entries.len(),
            });
        }
        let mut colors = [Rgb([0, 0, 0]); BUCKETS];
        for (color, entry) in colors.iter_mut().zip(entries) {
            *color = parse_hex(entry.as_ref())?;
        }
        Ok(Self { colors })
    }

    /// Color of `bucket`; out-of-range buckets use the last color.
    pub fn color(&self, bucket: usize) -> Rgb<u8> {
        self.colors[bucket.min(BUCKETS - 1)]
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::from_hex(&DEFAULT_PALETTE).unwrap_or(Self {
            colors: [Rgb([0, 0, 0]); BUCKETS],
        })
    }
}

fn parse_hex(entry: &str) -> Result<Rgb<u8>, ConfigError> {
    let bad = || ConfigError::BadColor(entry.to_string());
    let digits = entry.strip_prefix('#').ok_or_else(bad)?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| bad());
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
