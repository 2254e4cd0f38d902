// THEORY:
// The `orderer` decides the vertical layout of the rug. For one strategy it walks
// every frame in the window, places each mover on the strategy's space-filling
// curve, and sorts the movers by curve index. Row `y` of a column is then the
// mover ranked `y`-th along the curve in that frame.
//
// Every call orders the whole window from scratch; there is no incremental state.
// Movers with the same curve index keep their producer order (the sort is
// stable), which makes the permutation fully deterministic.

use crate::core_modules::curve::Strategy;
use crate::core_modules::reading::{Frame, Reading};
use serde::Serialize;

/// A reading placed on the curve, plus the color bucket it was painted with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedReading {
    #[serde(flatten)]
    pub reading: Reading,
    /// Position of the reading along the strategy's curve.
    pub curve_index: u64,
    /// Color bucket chosen during rendering, `None` until a rug is drawn from it.
    pub color_index: Option<usize>,
}

/// One frame's readings sorted by ascending curve index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedFrame {
    pub number: u64,
    pub readings: Vec<RankedReading>,
}

impl OrderedFrame {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// A whole window ordered under one strategy, oldest frame first.
pub type OrderedWindow = Vec<OrderedFrame>;

/// The permutation that sorts `frame` by curve index under `strategy`.
pub fn curve_permutation(frame: &Frame, strategy: Strategy) -> (Vec<usize>, Vec<u64>) {
    let keys: Vec<u64> = frame
        .readings
        .iter()
        .map(|reading| strategy.curve_index(reading.latitude, reading.longitude))
        .collect();
    let mut permutation: Vec<usize> = (0..keys.len()).collect();
    permutation.sort_by_key(|&i| keys[i]);
    (permutation, keys)
}

pub fn order_frame(frame: &Frame, strategy: Strategy) -> OrderedFrame {
    let (permutation, keys) = curve_permutation(frame, strategy);
    OrderedFrame {
        number: frame.number,
        readings: permutation
            .into_iter()
            .map(|i| RankedReading {
                reading: frame.readings[i].clone(),
                curve_index: keys[i],
                color_index: None,
            })
            .collect(),
    }
}

pub fn order_window<'a>(frames: impl IntoIterator<Item = &'a Frame>, strategy: Strategy) -> OrderedWindow {
    frames.into_iter().map(|frame| order_frame(frame, strategy)).collect()
}
