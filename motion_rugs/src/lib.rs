// THEORY:
// This file is the main entry point for the `motion_rugs` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (a renderer, a recorder, or the
// `rug_tester` harness).
//
// A motion rug is a compact picture of many movers over time: one column per
// frame, one row per mover, rows ordered along a space-filling curve so that
// movers close together on the ground sit close together in the picture, and each
// pixel colored by the decile of a motion feature such as velocity.
//
// The primary exports are `RugProcessor` (the synchronous core), `RugWorker` (the
// same core behind tokio channels) and their configuration and message types.
// The stage-by-stage building blocks live in `core_modules`.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod worker;

pub use config::RugConfig;
pub use core_modules::curve::{curve_coordinates, hilbert::hilbert_index, morton::morton_index, Strategy};
pub use core_modules::quantizer::{ColorPalette, Deciles};
pub use core_modules::reading::{Frame, Reading};
pub use error::{Result, RugError};
pub use pipeline::{FrameMessage, OrderedFrame, RankedReading, RugImage, RugProcessor};
pub use worker::{RugWorker, WorkerClosed, WorkerHandle, WorkerMessage, WorkerStats};
