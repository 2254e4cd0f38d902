// THEORY:
// The `synthesizer` is the last stage of a redraw. It takes one strategy's ordered
// window and one feature's deciles and paints the rug: column `x` is the `x`-th
// frame of the window, row `y` is the mover ranked `y`-th along the curve in that
// frame, and the pixel color is the decile bucket of the mover's feature value.
//
// Alongside the pixels it hands back its own copy of the ordered window with every
// reading annotated with the bucket it was painted in, so consumers can map a
// pixel back to the reading behind it. Each rug owns its annotations; painting a
// second feature never overwrites the first one's.

use crate::core_modules::curve::Strategy;
use crate::core_modules::orderer::OrderedWindow;
use crate::core_modules::quantizer::{ColorPalette, Deciles};
use crate::error::RenderError;
use image::RgbaImage;
use serde::{Serialize, Serializer};

const CHANNELS: usize = 4;

/// One rendered motion rug for a (strategy, feature) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RugImage {
    pub strategy: Strategy,
    pub feature: String,
    /// `width` = frames in the window, `height` = movers per frame.
    #[serde(serialize_with = "serialize_pixels")]
    pub pixels: RgbaImage,
    /// The ordered window behind the pixels, annotated with color buckets.
    pub ordered: OrderedWindow,
}

impl RugImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

#[derive(Serialize)]
struct RawPixels<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

fn serialize_pixels<S: Serializer>(pixels: &RgbaImage, serializer: S) -> Result<S::Ok, S::Error> {
    RawPixels {
        width: pixels.width(),
        height: pixels.height(),
        data: pixels.as_raw(),
    }
    .serialize(serializer)
}

/// Paints the rug for `feature` over `ordered`.
///
/// Every column must hold the same number of movers; a ragged window is a
/// contract violation and is refused rather than painted partially.
pub fn synthesize(
    strategy: Strategy,
    feature: &str,
    ordered: &OrderedWindow,
    deciles: &Deciles,
    palette: &ColorPalette,
) -> Result<RugImage, RenderError> {
    let width = ordered.len();
    let height = ordered.first().map_or(0, |frame| frame.len());

    if let Some((column, frame)) = ordered.iter().enumerate().find(|(_, frame)| frame.len() != height) {
        return Err(RenderError::RaggedWindow {
            column,
            expected: height,
            actual: frame.len(),
        });
    }

    let oversized = || RenderError::Oversized { width, height };
    let image_width = u32::try_from(width).map_err(|_| oversized())?;
    let image_height = u32::try_from(height).map_err(|_| oversized())?;
    let buffer_len = width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .ok_or_else(oversized)?;

    let mut annotated = ordered.clone();
    let mut buffer = vec![0u8; buffer_len];

    for (x, frame) in annotated.iter_mut().enumerate() {
        for (y, ranked) in frame.readings.iter_mut().enumerate() {
            let bucket = deciles.classify(ranked.reading.feature(feature));
            ranked.color_index = Some(bucket);

            let [red, green, blue] = palette.color(bucket).0;
            let offset = CHANNELS * (x + y * width);
            buffer[offset..offset + CHANNELS].copy_from_slice(&[red, green, blue, u8::MAX]);
        }
    }

    let pixels = RgbaImage::from_raw(image_width, image_height, buffer).ok_or_else(oversized)?;

    Ok(RugImage {
        strategy,
        feature: feature.to_string(),
        pixels,
        ordered: annotated,
    })
}
