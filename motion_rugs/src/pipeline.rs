// THEORY:
// The `pipeline` module is the top-level API of the motion rug core. `RugProcessor`
// owns every piece of mutable state (the sequencer and its window, the latest
// ordered windows, the latest deciles) and is the only thing that mutates them.
// A host creates one processor at startup, feeds it inbound messages one at a
// time, and publishes whatever rugs it returns.
//
// A redraw runs three stages to completion before the next message is accepted:
// 1.  **Ordering**: every configured strategy orders the whole window from scratch.
// 2.  **Quantization**: every configured feature's deciles are recomputed from the
//     freshly ordered windows, so no rug is ever colored with stale thresholds.
// 3.  **Synthesis**: one rug per (strategy, feature) pair, strategy-major, in
//     configuration order.

use crate::config::RugConfig;
use crate::core_modules::curve::Strategy;
use crate::core_modules::orderer::{order_window, OrderedWindow};
use crate::core_modules::quantizer::{pool_feature_values, ColorPalette, Deciles};
use crate::core_modules::reading::{Frame, Reading};
use crate::core_modules::sequencer::FrameSequencer;
use crate::core_modules::synthesizer::synthesize;
use crate::error::{RenderError, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

// Re-export key data structures for the public API.
pub use crate::core_modules::orderer::{OrderedFrame, RankedReading};
pub use crate::core_modules::synthesizer::RugImage;

/// Each rug column is drawn this many canvas pixels wide by the consumer.
pub const CANVAS_PIXELS_PER_COLUMN: u32 = 4;

/// One inbound message from the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMessage {
    /// Every tracked mover's reading at this time step.
    #[serde(alias = "fData")]
    pub frame_data: Vec<Reading>,
    /// The producer's sequence number for this time step.
    #[serde(alias = "fNum")]
    pub frame_number: u64,
    /// Width of the consumer's canvas in pixels; sets the window to a quarter of it.
    #[serde(alias = "width")]
    pub target_width: u32,
}

impl FrameMessage {
    pub fn new(frame_number: u64, frame_data: Vec<Reading>, target_width: u32) -> Self {
        Self {
            frame_data,
            frame_number,
            target_width,
        }
    }
}

/// Window capacity, in columns, for a consumer canvas of `target_width` pixels.
/// Never zero, so a redraw always has a column to paint.
pub fn columns_for_width(target_width: u32) -> usize {
    (target_width / CANVAS_PIXELS_PER_COLUMN).max(1) as usize
}

/// The processing core: resequences frames and renders motion rugs on cadence.
pub struct RugProcessor {
    config: RugConfig,
    palette: ColorPalette,
    sequencer: FrameSequencer,
    /// Frames released into the window since the last redraw.
    frames_since_redraw: usize,
    ordered: HashMap<Strategy, OrderedWindow>,
    deciles: HashMap<String, Deciles>,
}

impl RugProcessor {
    pub fn new(config: RugConfig) -> Result<Self> {
        config.validate()?;
        let palette = config.color_palette()?;
        let sequencer = FrameSequencer::new(config.pixel_max_width, config.max_pending_ahead);
        Ok(Self {
            config,
            palette,
            sequencer,
            frames_since_redraw: 0,
            ordered: HashMap::new(),
            deciles: HashMap::new(),
        })
    }

    /// Handles one inbound message. Returns the rugs of a redraw when this message
    /// completed a cadence interval, and nothing otherwise.
    ///
    /// A frame refused at ingestion is skipped, so the frames behind it keep
    /// flowing. Frames its skip releases count toward the cadence, and the redraw
    /// they complete is drawn with the next released frame.
    pub fn handle(&mut self, message: FrameMessage) -> Result<Vec<RugImage>> {
        // --- 1. Live Reconfiguration ---
        // Applies even when the frame itself is refused below.
        self.set_target_width(message.target_width);

        // --- 2. Ingestion Validation ---
        let frame = Frame::new(message.frame_number, message.frame_data);
        if let Err(err) = frame.validate(&self.config.features, self.sequencer.object_count()) {
            self.frames_since_redraw += self.sequencer.skip(frame.number);
            return Err(err.into());
        }

        // --- 3. Resequencing ---
        let released = self.sequencer.submit(frame)?;
        if released == 0 {
            trace!("frame {} buffered, waiting for {}", message.frame_number, self.sequencer.next_expected());
            return Ok(Vec::new());
        }

        // --- 4. Cadence ---
        self.frames_since_redraw += released;
        if self.frames_since_redraw < self.config.redraw_interval {
            return Ok(Vec::new());
        }
        self.frames_since_redraw %= self.config.redraw_interval;
        self.recompute()
    }

    /// Re-orders, re-quantizes and re-renders the current window.
    ///
    /// Deterministic: calling it twice on an unchanged window yields identical rugs.
    pub fn recompute(&mut self) -> Result<Vec<RugImage>> {
        if self.sequencer.window().is_empty() {
            return Ok(Vec::new());
        }

        // --- Stage 1: Ordering ---
        for &strategy in &self.config.strategies {
            let ordered = order_window(self.sequencer.window(), strategy);
            self.ordered.insert(strategy, ordered);
        }

        // --- Stage 2: Quantization ---
        for feature in &self.config.features {
            let windows = self.config.strategies.iter().filter_map(|s| self.ordered.get(s));
            let deciles = Deciles::from_values(pool_feature_values(windows, feature));
            trace!("deciles for {}: {:?}", feature, deciles.thresholds());
            self.deciles.insert(feature.clone(), deciles);
        }

        // --- Stage 3: Synthesis ---
        let mut rugs = Vec::with_capacity(self.config.strategies.len() * self.config.features.len());
        for &strategy in &self.config.strategies {
            let Some(ordered) = self.ordered.get(&strategy) else {
                continue;
            };
            for feature in &self.config.features {
                let deciles = self
                    .deciles
                    .get(feature)
                    .ok_or_else(|| RenderError::MissingDeciles(feature.clone()))?;
                let rug = synthesize(strategy, feature, ordered, deciles, &self.palette)?;
                debug!("rendered {} / {} rug: {}x{}", strategy, feature, rug.width(), rug.height());
                rugs.push(rug);
            }
        }
        Ok(rugs)
    }

    /// Resizes the window for a consumer canvas of `target_width` pixels.
    pub fn set_target_width(&mut self, target_width: u32) {
        let columns = columns_for_width(target_width);
        if columns != self.sequencer.capacity() {
            debug!("window capacity {} -> {} columns", self.sequencer.capacity(), columns);
            self.sequencer.set_capacity(columns);
        }
    }

    pub fn config(&self) -> &RugConfig {
        &self.config
    }

    /// Frames currently in the window, oldest first.
    pub fn window(&self) -> &VecDeque<Frame> {
        self.sequencer.window()
    }

    pub fn sequencer(&self) -> &FrameSequencer {
        &self.sequencer
    }

    /// Deciles of `feature` from the latest redraw.
    pub fn deciles(&self, feature: &str) -> Option<&Deciles> {
        self.deciles.get(feature)
    }

    /// The window as ordered by `strategy` at the latest redraw.
    pub fn ordered_window(&self, strategy: Strategy) -> Option<&OrderedWindow> {
        self.ordered.get(&strategy)
    }

    /// Movers per frame, once the first frame has been released into the window.
    pub fn object_count(&self) -> Option<usize> {
        self.sequencer.object_count()
    }
}
