// THEORY:
// The `curve` module holds the space-filling curves that linearize a 2D position
// into a single sort key. It is the foundation of the whole rug: the vertical
// axis of the image is nothing more than "rank along the curve", so the curve
// decides which movers end up in neighbouring rows.
//
// Key architectural principles:
// 1.  **Locality Preservation**: A Hilbert or Z-order curve visits every cell of a
//     square grid exactly once and tends to keep spatially close cells close on
//     the curve. Sorting by curve index therefore groups nearby movers together,
//     which raw object ids never would.
// 2.  **Local, Not Global, Position**: Movers are mapped through
//     `curve_coordinates`, which throws away whole degrees and the first decimal
//     digit and magnifies the next three digits into [0, 1000]. The rug visualizes
//     local clustering, so only sub-degree position matters.
// 3.  **Pure Functions**: Every encoder is a stateless, deterministic function of
//     its inputs. The lookup table used by the Z-order encoder is built at compile
//     time, so there is no lazily initialised global state either.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Magnification applied to the sub-degree fraction of a GPS coordinate.
pub const COORD_SCALE: f64 = 1000.0;

/// Exclusive upper bound of the coordinates produced by `curve_coordinates`.
/// Rounding can lift a fraction of 0.9995 up to exactly `COORD_SCALE`.
pub const COORD_BOUND: u32 = COORD_SCALE as u32 + 1;

/// Maps a GPS position onto the integer grid consumed by both curve encoders.
pub fn curve_coordinates(latitude: f64, longitude: f64) -> (u32, u32) {
    (fraction_coordinate(latitude), fraction_coordinate(longitude))
}

fn fraction_coordinate(degrees: f64) -> u32 {
    let scaled = degrees * 10.0;
    let fraction = scaled - scaled.floor();
    (COORD_SCALE * fraction).round() as u32
}

pub mod hilbert {
    /// Hilbert curve index of `(x, y)`.
    ///
    /// `bound` is the largest coordinate magnitude the caller expects, not a bit
    /// count. The curve order is the number of bits needed to hold
    /// `max(bound - 1, x, y)`, so any non-power-of-two bound works and coordinates
    /// beyond it still land on a valid (larger) curve. Callers that sort by this
    /// index must use one bound for the whole set and keep coordinates under it so
    /// every point is placed on the same curve.
    ///
    /// The result is in `[0, 4^order)`.
    pub fn hilbert_index(x: u32, y: u32, bound: u32) -> u64 {
        let order = effective_order(x, y, bound);
        let side: u64 = 1 << order;
        let (mut x, mut y) = (u64::from(x), u64::from(y));
        let mut index = 0u64;

        // Walk from the coarsest quadrant down, rotating the frame at every level
        // so the sub-curve enters and leaves where its parent expects.
        let mut s = side / 2;
        while s > 0 {
            let rx = u64::from((x & s) > 0);
            let ry = u64::from((y & s) > 0);
            index += s * s * ((3 * rx) ^ ry);
            if ry == 0 {
                if rx == 1 {
                    x = side - 1 - x;
                    y = side - 1 - y;
                }
                std::mem::swap(&mut x, &mut y);
            }
            s /= 2;
        }
        index
    }

    /// Number of bits per axis the curve needs for these inputs. Never zero.
    pub fn effective_order(x: u32, y: u32, bound: u32) -> u32 {
        let magnitude = bound.saturating_sub(1).max(x).max(y);
        (u32::BITS - magnitude.leading_zeros()).max(1)
    }
}

pub mod morton {
    /// Spreads the 8 bits of a byte into the even bit positions of a u32.
    pub static MORTON_TABLE_256: [u32; 256] = build_table();

    const fn build_table() -> [u32; 256] {
        let mut table = [0u32; 256];
        let mut byte = 0;
        while byte < 256 {
            let mut spread = 0u32;
            let mut bit = 0;
            while bit < 8 {
                if byte & (1 << bit) != 0 {
                    spread |= 1 << (2 * bit);
                }
                bit += 1;
            }
            table[byte] = spread;
            byte += 1;
        }
        table
    }

    /// Z-order (Morton) index of `(x, y)`: x occupies the even bits, y the odd bits.
    pub fn morton_index(x: u16, y: u16) -> u32 {
        let (x, y) = (usize::from(x), usize::from(y));
        (MORTON_TABLE_256[y >> 8] << 17)
            | (MORTON_TABLE_256[x >> 8] << 16)
            | (MORTON_TABLE_256[y & 0xff] << 1)
            | MORTON_TABLE_256[x & 0xff]
    }
}

/// A choice of space-filling curve used to linearize mover positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "HilbertOrder")]
    Hilbert,
    #[serde(rename = "zOrder")]
    ZOrder,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Hilbert, Strategy::ZOrder];

    /// The strategy's wire name, as used in configuration and emitted results.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Hilbert => "HilbertOrder",
            Strategy::ZOrder => "zOrder",
        }
    }

    /// Curve index of a GPS position under this strategy.
    pub fn curve_index(&self, latitude: f64, longitude: f64) -> u64 {
        let (cx, cy) = curve_coordinates(latitude, longitude);
        match self {
            Strategy::Hilbert => hilbert::hilbert_index(cx, cy, COORD_BOUND),
            // Coordinates never exceed COORD_BOUND, well inside 16 bits.
            Strategy::ZOrder => u64::from(morton::morton_index(cx as u16, cy as u16)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}
